//! Terminal output formatting for scan results.

use colored::Colorize;

use metis::ScanReport;

/// Print a per-class summary of the extracted chunks.
pub fn print_summary(report: &ScanReport) {
    if report.chunks.is_empty() {
        println!("No method chunks found.");
    } else {
        let mut current_class: Option<&str> = None;
        for chunk in &report.chunks {
            if current_class != Some(chunk.class_name.as_str()) {
                if current_class.is_some() {
                    println!();
                }
                println!("{}", chunk.class_name.cyan().bold());
                current_class = Some(&chunk.class_name);
            }

            println!(
                "  {}({}) : {}",
                chunk.method_name.bold(),
                chunk.parameters.join(", "),
                chunk.return_type
            );
            if !chunk.called_by.is_empty() {
                println!(
                    "    {} {}",
                    "called by".dimmed(),
                    chunk.called_by.join(", ").yellow()
                );
            }
        }
        println!();
    }

    println!(
        "{}: {} chunks across {} files in {:.1?}",
        "Total".dimmed(),
        report.chunks.len().to_string().green(),
        report.files_scanned,
        report.duration
    );

    if !report.errors.is_empty() {
        println!(
            "{}: {} non-fatal failures",
            "Skipped".dimmed(),
            report.errors.len().to_string().yellow()
        );
        for error in &report.errors {
            eprintln!("  {}: {error}", "warning".yellow().bold());
        }
    }
}
