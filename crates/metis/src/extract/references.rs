//! Resolving references into inbound call edges.
//!
//! For every flattened method the server is asked where that method's
//! name is referenced, declaration excluded. Each returned location is
//! then attributed to whichever known method's body range contains it:
//! that containing method is the caller.
//!
//! Containment is lexical and line-inclusive. When ranges nest (a lambda
//! or local class inside a method) the first containing method in
//! traversal order wins; a reference sitting outside every known method
//! body, e.g. in a field initializer or static block, contributes no edge
//! and is dropped silently.

use std::collections::BTreeSet;

use lsp_types::{
    Location, PartialResultParams, ReferenceContext, ReferenceParams, SymbolKind,
    TextDocumentIdentifier, TextDocumentPositionParams, WorkDoneProgressParams,
};

use crate::lsp::{Connection, LspError, Result};

use super::symbols::FlatMethod;

/// Ask the server for every reference to a method, anchored at the
/// method's name token. The declaration itself is excluded.
///
/// # Errors
///
/// Returns an error when the request cannot be sent or the server answers
/// with an error envelope; callers treat this as a per-method failure,
/// not a fatal one.
pub fn find_references(connection: &Connection, method: &FlatMethod) -> Result<Vec<Location>> {
    let params = ReferenceParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier {
                uri: method.uri.clone(),
            },
            position: method.symbol.selection_range.start,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: ReferenceContext {
            include_declaration: false,
        },
    };

    let result = connection.request(
        "textDocument/references",
        serde_json::to_value(params).map_err(LspError::Serialize)?,
    )?;
    let locations: Option<Vec<Location>> =
        serde_json::from_value(result).map_err(LspError::Deserialize)?;
    Ok(locations.unwrap_or_default())
}

/// Attribute each reference location to the known method whose body
/// contains it, producing the target method's `called_by` set.
///
/// Rules, in order:
/// - a location equal to the target's own name token is a declaration
///   echo and is skipped (servers occasionally return it even when asked
///   not to);
/// - the caller is the first method in `all_methods` order whose file
///   matches and whose body range contains the location, line-inclusive
///   on both ends;
/// - the target itself is never a caller, so self-calls produce no edge;
/// - a location contained by no known method contributes nothing.
#[must_use]
pub fn attribute_callers(
    target: &FlatMethod,
    references: &[Location],
    all_methods: &[FlatMethod],
) -> BTreeSet<String> {
    let mut callers = BTreeSet::new();

    for reference in references {
        if is_declaration_echo(reference, target) {
            continue;
        }

        for candidate in all_methods {
            if candidate.uri == reference.uri
                && reference.range.start.line >= candidate.symbol.range.start.line
                && reference.range.end.line <= candidate.symbol.range.end.line
                && candidate.symbol.kind == SymbolKind::METHOD
                && !(candidate.class_name == target.class_name
                    && candidate.symbol.name == target.symbol.name)
            {
                callers.insert(candidate.qualified_name());
                break;
            }
        }
    }

    callers
}

fn is_declaration_echo(reference: &Location, target: &FlatMethod) -> bool {
    reference.uri == target.uri
        && reference.range.start == target.symbol.selection_range.start
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{DocumentSymbol, Position, Range, Uri};

    fn test_uri(name: &str) -> Uri {
        format!("file:///src/{name}").parse().expect("valid URI")
    }

    #[allow(deprecated)]
    fn method(
        uri: &Uri,
        class_name: &str,
        name: &str,
        body: Range,
        selection: Range,
    ) -> FlatMethod {
        FlatMethod {
            uri: uri.clone(),
            class_name: class_name.to_string(),
            symbol: DocumentSymbol {
                name: name.to_string(),
                detail: Some("() : void".to_string()),
                kind: SymbolKind::METHOD,
                tags: None,
                deprecated: None,
                range: body,
                selection_range: selection,
                children: None,
            },
            method_code: format!("void {name}() {{}}"),
        }
    }

    fn range(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Range {
        Range::new(
            Position::new(start_line, start_col),
            Position::new(end_line, end_col),
        )
    }

    fn location(uri: &Uri, r: Range) -> Location {
        Location {
            uri: uri.clone(),
            range: r,
        }
    }

    /// Two methods in one class: `bar` (lines 1-3) and `baz` (lines 4-5).
    fn foo_methods(uri: &Uri) -> Vec<FlatMethod> {
        vec![
            method(uri, "Foo", "bar", range(1, 4, 3, 5), range(1, 16, 1, 19)),
            method(uri, "Foo", "baz", range(4, 4, 5, 5), range(4, 16, 4, 19)),
        ]
    }

    #[test]
    fn reference_inside_another_method_becomes_an_edge() {
        let uri = test_uri("Foo.java");
        let methods = foo_methods(&uri);
        let baz = &methods[1];

        // baz referenced on line 2, inside bar's body.
        let refs = vec![location(&uri, range(2, 8, 2, 11))];
        let callers = attribute_callers(baz, &refs, &methods);

        assert_eq!(callers.into_iter().collect::<Vec<_>>(), vec!["Foo::bar"]);
    }

    #[test]
    fn self_calls_never_appear_in_called_by() {
        let uri = test_uri("Foo.java");
        let methods = foo_methods(&uri);
        let bar = &methods[0];

        // bar calling itself recursively on line 2, inside its own body.
        let refs = vec![location(&uri, range(2, 8, 2, 11))];
        let callers = attribute_callers(bar, &refs, &methods);

        assert!(callers.is_empty());
    }

    #[test]
    fn declaration_echo_is_skipped() {
        let uri = test_uri("Foo.java");
        let methods = foo_methods(&uri);
        let baz = &methods[1];

        // Exactly the name token of baz itself.
        let refs = vec![location(&uri, range(4, 16, 4, 19))];
        let callers = attribute_callers(baz, &refs, &methods);

        assert!(callers.is_empty());
    }

    #[test]
    fn references_on_boundary_lines_are_contained() {
        let uri = test_uri("Foo.java");
        let methods = foo_methods(&uri);
        let baz = &methods[1];

        // bar's body spans lines 1..=3; first and last line both count.
        let on_first_line = vec![location(&uri, range(1, 30, 1, 33))];
        let on_last_line = vec![location(&uri, range(3, 0, 3, 3))];

        assert!(!attribute_callers(baz, &on_first_line, &methods).is_empty());
        assert!(!attribute_callers(baz, &on_last_line, &methods).is_empty());
    }

    #[test]
    fn reference_outside_every_method_contributes_nothing() {
        let uri = test_uri("Foo.java");
        let methods = foo_methods(&uri);
        let baz = &methods[1];

        // Line 0 is the class header / field initializer territory.
        let refs = vec![location(&uri, range(0, 10, 0, 13))];
        let callers = attribute_callers(baz, &refs, &methods);

        assert!(callers.is_empty());
    }

    #[test]
    fn references_in_other_files_only_match_methods_of_that_file() {
        let uri = test_uri("Foo.java");
        let other_uri = test_uri("Main.java");
        let mut methods = foo_methods(&uri);
        methods.push(method(
            &other_uri,
            "Main",
            "run",
            range(2, 4, 6, 5),
            range(2, 16, 2, 19),
        ));
        let baz = &methods[1];

        // A call site in Main.java at line 4 sits in Main::run, not in
        // the same-lined bar over in Foo.java.
        let refs = vec![location(&other_uri, range(4, 8, 4, 11))];
        let callers = attribute_callers(baz, &refs, &methods);

        assert_eq!(callers.into_iter().collect::<Vec<_>>(), vec!["Main::run"]);
    }

    #[test]
    fn nested_ranges_attribute_to_the_first_method_in_traversal_order() {
        let uri = test_uri("Foo.java");
        // outer spans lines 1-10, inner (a local helper) spans 3-5; both
        // contain line 4. Traversal order puts outer first, so outer wins.
        let methods = vec![
            method(&uri, "Foo", "outer", range(1, 4, 10, 5), range(1, 16, 1, 21)),
            method(&uri, "Foo", "inner", range(3, 8, 5, 9), range(3, 20, 3, 25)),
            method(&uri, "Foo", "target", range(11, 4, 12, 5), range(11, 16, 11, 22)),
        ];
        let target = &methods[2];

        let refs = vec![location(&uri, range(4, 12, 4, 18))];
        let callers = attribute_callers(target, &refs, &methods);

        assert_eq!(callers.into_iter().collect::<Vec<_>>(), vec!["Foo::outer"]);
    }

    #[test]
    fn duplicate_call_sites_collapse_into_one_edge() {
        let uri = test_uri("Foo.java");
        let methods = foo_methods(&uri);
        let baz = &methods[1];

        // baz called twice from bar's body.
        let refs = vec![
            location(&uri, range(2, 8, 2, 11)),
            location(&uri, range(3, 0, 3, 3)),
        ];
        let callers = attribute_callers(baz, &refs, &methods);

        assert_eq!(callers.len(), 1);
    }
}
