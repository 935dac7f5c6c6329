//! Flattening hierarchical symbol trees into method records.
//!
//! The server reports each file's symbols as a tree: types containing
//! methods containing whatever nested declarations the language allows.
//! The collector walks that tree depth-first, carrying the nearest
//! enclosing type name as an explicit parameter, and flattens every
//! method node into a [`FlatMethod`] plus a partial [`Chunk`] whose call
//! edges are filled in by the reference pass later.
//!
//! This is pure data transformation: no I/O, deterministic for a given
//! tree and source text.

use lsp_types::{DocumentSymbol, Range, SymbolKind, Uri};
use tracing::warn;

use crate::types::Chunk;

/// Return type used when a symbol's detail carries none.
const VOID_RETURN: &str = "void";

/// A method symbol flattened out of the tree, with enough context to
/// anchor call edges: which file it lives in, which type encloses it, and
/// its source text.
#[derive(Debug, Clone)]
pub struct FlatMethod {
    /// URI of the file the method was found in.
    pub uri: Uri,
    /// Name of the nearest enclosing class, interface, or enum.
    pub class_name: String,
    /// The method's symbol node, ranges included.
    pub symbol: DocumentSymbol,
    /// The method's source text, sliced line-inclusively from its range.
    pub method_code: String,
}

impl FlatMethod {
    /// The `Class::method` identifier used for call edges.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.class_name, self.symbol.name)
    }
}

/// Flatten one file's symbol tree into method records and partial chunks.
///
/// Both outputs are in traversal order and parallel to each other. Method
/// nodes with no enclosing type are skipped with a diagnostic: without a
/// container there is nothing to anchor the chunk to.
#[must_use]
pub fn collect_methods(
    uri: &Uri,
    symbols: &[DocumentSymbol],
    source: &str,
) -> (Vec<FlatMethod>, Vec<Chunk>) {
    let lines: Vec<&str> = source.lines().collect();
    let mut methods = Vec::new();
    let mut chunks = Vec::new();
    walk(uri, symbols, None, &lines, &mut methods, &mut chunks);
    (methods, chunks)
}

fn walk(
    uri: &Uri,
    symbols: &[DocumentSymbol],
    enclosing_type: Option<&str>,
    lines: &[&str],
    methods: &mut Vec<FlatMethod>,
    chunks: &mut Vec<Chunk>,
) {
    for symbol in symbols {
        let context = match symbol.kind {
            k if k == SymbolKind::CLASS || k == SymbolKind::INTERFACE || k == SymbolKind::ENUM => {
                Some(symbol.name.as_str())
            }
            _ => enclosing_type,
        };

        if symbol.kind == SymbolKind::METHOD {
            if let Some(class_name) = context {
                let method_code = slice_lines(lines, symbol.range);
                let (return_type, parameters) = parse_signature(symbol.detail.as_deref());

                methods.push(FlatMethod {
                    uri: uri.clone(),
                    class_name: class_name.to_string(),
                    symbol: symbol.clone(),
                    method_code: method_code.clone(),
                });
                chunks.push(Chunk {
                    class_name: class_name.to_string(),
                    method_name: symbol.name.clone(),
                    return_type,
                    parameters,
                    called_by: Vec::new(),
                    method_code,
                });
            } else {
                warn!(
                    method = %symbol.name,
                    uri = %uri.as_str(),
                    "method has no enclosing type, skipping"
                );
            }
        }

        if let Some(children) = &symbol.children {
            walk(uri, children, context, lines, methods, chunks);
        }
    }
}

/// Slice a source text by line range, inclusive on both ends.
fn slice_lines(lines: &[&str], range: Range) -> String {
    let start = range.start.line as usize;
    let end = (range.end.line as usize).min(lines.len().saturating_sub(1));
    if start >= lines.len() || start > end {
        return String::new();
    }
    lines[start..=end].join("\n")
}

/// Parse return type and parameters out of a detail string shaped like
/// `"(T1 a, T2 b) : R"`.
///
/// Without the ` : ` separator the whole parenthesized segment is the
/// parameter list (constructors look like this) and the return type
/// defaults to `void`.
fn parse_signature(detail: Option<&str>) -> (String, Vec<String>) {
    let Some(detail) = detail else {
        return (VOID_RETURN.to_string(), Vec::new());
    };

    let parts: Vec<&str> = detail.split(" : ").collect();
    match parts.as_slice() {
        [params, return_type] => ((*return_type).trim().to_string(), split_parameters(params)),
        [single] if single.starts_with('(') && single.ends_with(')') => {
            (VOID_RETURN.to_string(), split_parameters(single))
        }
        _ => (VOID_RETURN.to_string(), Vec::new()),
    }
}

fn split_parameters(params: &str) -> Vec<String> {
    let inner = params.strip_prefix('(').unwrap_or(params);
    let inner = inner.strip_suffix(')').unwrap_or(inner);
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(',').map(|p| p.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;
    use rstest::rstest;

    fn test_uri() -> Uri {
        "file:///src/Foo.java".parse().expect("valid URI")
    }

    fn line_range(start: u32, end: u32) -> Range {
        Range::new(Position::new(start, 0), Position::new(end, 1))
    }

    #[allow(deprecated)]
    fn symbol(
        name: &str,
        kind: SymbolKind,
        range: Range,
        detail: Option<&str>,
        children: Vec<DocumentSymbol>,
    ) -> DocumentSymbol {
        DocumentSymbol {
            name: name.to_string(),
            detail: detail.map(String::from),
            kind,
            tags: None,
            deprecated: None,
            range,
            selection_range: Range::new(range.start, range.start),
            children: (!children.is_empty()).then_some(children),
        }
    }

    #[rstest]
    #[case(Some("(String name, int age) : boolean"), "boolean", vec!["String name", "int age"])]
    #[case(Some("() : void"), "void", vec![])]
    #[case(Some("(int x)"), "void", vec!["int x"])]
    #[case(Some("()"), "void", vec![])]
    #[case(Some("something odd"), "void", vec![])]
    #[case(None, "void", vec![])]
    fn parses_signature_details(
        #[case] detail: Option<&str>,
        #[case] expected_return: &str,
        #[case] expected_params: Vec<&str>,
    ) {
        let (return_type, parameters) = parse_signature(detail);
        assert_eq!(return_type, expected_return);
        assert_eq!(parameters, expected_params);
    }

    #[test]
    fn collects_methods_with_their_enclosing_class() {
        let source = "public class Foo {\n    void bar() {\n    }\n}\n";
        let tree = vec![symbol(
            "Foo",
            SymbolKind::CLASS,
            line_range(0, 3),
            None,
            vec![symbol(
                "bar",
                SymbolKind::METHOD,
                line_range(1, 2),
                Some("() : void"),
                vec![],
            )],
        )];

        let (methods, chunks) = collect_methods(&test_uri(), &tree, source);

        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].class_name, "Foo");
        assert_eq!(methods[0].qualified_name(), "Foo::bar");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].method_name, "bar");
        assert_eq!(chunks[0].method_code, "    void bar() {\n    }");
        assert!(chunks[0].called_by.is_empty());
    }

    #[test]
    fn nested_types_rebind_the_class_context() {
        let source = "class Outer {\n  class Inner {\n    void deep() {}\n  }\n  void shallow() {}\n}\n";
        let tree = vec![symbol(
            "Outer",
            SymbolKind::CLASS,
            line_range(0, 5),
            None,
            vec![
                symbol(
                    "Inner",
                    SymbolKind::CLASS,
                    line_range(1, 3),
                    None,
                    vec![symbol(
                        "deep",
                        SymbolKind::METHOD,
                        line_range(2, 2),
                        Some("() : void"),
                        vec![],
                    )],
                ),
                symbol(
                    "shallow",
                    SymbolKind::METHOD,
                    line_range(4, 4),
                    Some("() : void"),
                    vec![],
                ),
            ],
        )];

        let (methods, _) = collect_methods(&test_uri(), &tree, source);

        let names: Vec<_> = methods.iter().map(FlatMethod::qualified_name).collect();
        assert_eq!(names, vec!["Inner::deep", "Outer::shallow"]);
    }

    #[test]
    fn interface_and_enum_provide_context_too() {
        let source = "interface Api {\n  void call();\n}\n";
        let tree = vec![symbol(
            "Api",
            SymbolKind::INTERFACE,
            line_range(0, 2),
            None,
            vec![symbol(
                "call",
                SymbolKind::METHOD,
                line_range(1, 1),
                Some("() : void"),
                vec![],
            )],
        )];

        let (methods, _) = collect_methods(&test_uri(), &tree, source);
        assert_eq!(methods[0].class_name, "Api");
    }

    #[test]
    fn method_without_enclosing_type_is_skipped() {
        let source = "void orphan() {}\n";
        let tree = vec![symbol(
            "orphan",
            SymbolKind::METHOD,
            line_range(0, 0),
            Some("() : void"),
            vec![],
        )];

        let (methods, chunks) = collect_methods(&test_uri(), &tree, source);
        assert!(methods.is_empty());
        assert!(chunks.is_empty());
    }

    #[test]
    fn non_type_intermediate_nodes_keep_the_outer_context() {
        // A field holding an anonymous class whose method should still be
        // attributed to the outer class.
        let source = "class Foo {\n  Runnable r;\n  void run() {}\n}\n";
        let tree = vec![symbol(
            "Foo",
            SymbolKind::CLASS,
            line_range(0, 3),
            None,
            vec![symbol(
                "r",
                SymbolKind::FIELD,
                line_range(1, 2),
                None,
                vec![symbol(
                    "run",
                    SymbolKind::METHOD,
                    line_range(2, 2),
                    Some("() : void"),
                    vec![],
                )],
            )],
        )];

        let (methods, _) = collect_methods(&test_uri(), &tree, source);
        assert_eq!(methods[0].class_name, "Foo");
    }

    #[test]
    fn ranges_past_the_end_of_source_are_clamped() {
        let source = "class Foo {\n  void bar() {}\n}\n";
        let tree = vec![symbol(
            "Foo",
            SymbolKind::CLASS,
            line_range(0, 2),
            None,
            vec![symbol(
                "bar",
                SymbolKind::METHOD,
                line_range(1, 99),
                Some("() : void"),
                vec![],
            )],
        )];

        let (_, chunks) = collect_methods(&test_uri(), &tree, source);
        assert_eq!(chunks[0].method_code, "  void bar() {}\n}");
    }
}
