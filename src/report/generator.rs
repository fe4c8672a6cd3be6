//! Markdown and JSON report generation.
//!
//! Rendering is pure: these functions build strings and leave emission
//! to the caller.

use crate::models::{DisplayEntry, OrderedReport, Report};
use anyhow::Result;

/// Table header, one column per displayed field.
const TABLE_HEADER: &str = "| Title | Organization | First Event | Pages |";
const TABLE_SEPARATOR: &str = "| -- | -- | -- | -- |";

/// The count line printed once the listing is known.
pub fn count_line(total: usize) -> String {
    format!("All Books: {}", total)
}

/// Render the report as a Markdown table.
pub fn render_markdown_table(report: &OrderedReport) -> String {
    let mut output = String::new();

    output.push_str(TABLE_HEADER);
    output.push('\n');
    output.push_str(TABLE_SEPARATOR);
    output.push('\n');

    for entry in report.iter() {
        output.push_str(&render_row(entry));
        output.push('\n');
    }

    output
}

fn render_row(entry: &DisplayEntry) -> String {
    format!(
        "| [{}]({}) | {} | {} | {} |",
        escape_cell(&entry.name),
        entry.url,
        escape_cell(&entry.organization),
        escape_cell(&entry.event_name),
        entry.pages
    )
}

/// Keep a literal pipe from splitting the cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::config::Config;
    use crate::models::ReportMetadata;
    use chrono::Utc;

    fn entry(key: &str, name: &str, org: &str, event: &str, pages: u32) -> DisplayEntry {
        DisplayEntry {
            product_key: key.to_string(),
            name: name.to_string(),
            url: format!("https://techbookfest.org/product/{}", key),
            organization: org.to_string(),
            price: 0,
            event_name: event.to_string(),
            pages,
            shipping_required: false,
        }
    }

    #[test]
    fn test_count_line() {
        assert_eq!(count_line(1234), "All Books: 1234");
    }

    #[test]
    fn test_render_markdown_table() {
        let report = OrderedReport::from_entries(vec![
            entry("2", "Zig Notes", "Beta", "TBF15", 80),
            entry("1", "Rust Notes", "Alpha", "TBF14", 42),
        ]);

        let expected = "\
| Title | Organization | First Event | Pages |
| -- | -- | -- | -- |
| [Rust Notes](https://techbookfest.org/product/1) | Alpha | TBF14 | 42 |
| [Zig Notes](https://techbookfest.org/product/2) | Beta | TBF15 | 80 |
";
        assert_eq!(render_markdown_table(&report), expected);
    }

    #[test]
    fn test_render_empty_table() {
        let table = render_markdown_table(&OrderedReport::default());
        assert_eq!(table.lines().count(), 2);
    }

    #[test]
    fn test_pipes_are_escaped() {
        let report = OrderedReport::from_entries(vec![entry("9", "A|B", "C|D", "E", 1)]);
        let table = render_markdown_table(&report);
        assert!(table.contains("| [A\\|B](https://techbookfest.org/product/9) | C\\|D | E | 1 |"));
    }

    #[test]
    fn test_generate_json_report() {
        let mut config = Config::default();
        config.fetch.concurrency = 8;
        config.output.format = OutputFormat::Json;

        let report = Report {
            metadata: ReportMetadata {
                base_url: "https://techbookfest.org".to_string(),
                generated_at: Utc::now(),
                total_candidates: 3,
                free_products: 1,
                config,
                duration_seconds: 1.5,
            },
            books: OrderedReport::from_entries(vec![entry("1", "Rust Notes", "Alpha", "TBF14", 42)]),
        };

        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["total_candidates"], 3);
        assert_eq!(value["metadata"]["config"]["fetch"]["concurrency"], 8);
        assert_eq!(value["metadata"]["config"]["fetch"]["page_size"], 2000);
        assert_eq!(
            value["metadata"]["config"]["endpoint"]["base_url"],
            "https://techbookfest.org"
        );
        assert_eq!(value["metadata"]["config"]["output"]["format"], "json");

        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.metadata.config.fetch.concurrency, 8);
        assert_eq!(parsed.books, report.books);
        assert_eq!(value["books"]["entries"][0]["product_key"], "1");
        assert_eq!(value["books"]["entries"][0]["shipping_required"], false);
    }
}
