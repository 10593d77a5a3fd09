pub mod report;

use colored::Colorize;
use serde::Serialize;

use crate::model::{BatchSummary, ValidationResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Xml,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".xml") {
        return Some(OutputFormat::Xml);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Valid,
    Invalid,
}

impl Status {
    pub fn from_valid(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
        }
    }

    /// Style class carried by the status cell.
    pub fn class(self) -> &'static str {
        match self {
            Self::Valid => "status-valid",
            Self::Invalid => "status-invalid",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub id: String,
    pub status: Status,
    pub error: String,
}

impl From<&ValidationResult> for TableRow {
    fn from(result: &ValidationResult) -> Self {
        Self {
            id: result.display_id().to_string(),
            status: Status::from_valid(result.valid),
            error: result.error_text().to_string(),
        }
    }
}

/// The results table. Only its body is ever rewritten.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultsTable {
    body: Vec<TableRow>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Replaces the table body with one row per record, in input order.
pub fn render<'a, I>(table: &mut ResultsTable, results: I)
where
    I: IntoIterator<Item = &'a ValidationResult>,
{
    table.body.clear();
    table.body.extend(results.into_iter().map(TableRow::from));
}

const HEADERS: [&str; 3] = ["ID", "STATUS", "ERROR"];

/// Widths of the id and status columns, headers included.
fn column_widths(rows: &[TableRow]) -> (usize, usize) {
    let id_width = rows
        .iter()
        .map(|r| r.id.chars().count())
        .chain(std::iter::once(HEADERS[0].len()))
        .max()
        .unwrap_or_default();
    (id_width, Status::Invalid.label().len())
}

pub fn render_text(rows: &[TableRow]) -> Vec<u8> {
    let (id_width, status_width) = column_widths(rows);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<id_width$}  {:<status_width$}  {}\n",
        HEADERS[0], HEADERS[1], HEADERS[2]
    ));
    for r in rows {
        out.push_str(
            format!(
                "{:<id_width$}  {:<status_width$}  {}",
                r.id,
                r.status.label(),
                r.error
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out.into_bytes()
}

/// Terminal rendition of the table, status words coloured.
pub fn print_table(rows: &[TableRow]) {
    let (id_width, status_width) = column_widths(rows);

    println!(
        "{}",
        format!(
            "{:<id_width$}  {:<status_width$}  {}",
            HEADERS[0], HEADERS[1], HEADERS[2]
        )
        .bold()
    );
    for r in rows {
        let padded = format!("{:<status_width$}", r.status.label());
        let status = match r.status {
            Status::Valid => padded.green(),
            Status::Invalid => padded.red().bold(),
        };
        let line = format!("{:<id_width$}  {}  {}", r.id, status, r.error);
        println!("{}", line.trim_end());
    }
}

pub fn print_summary(summary: &BatchSummary) {
    println!();
    println!(":: {:<10}: {}", "Total", summary.total);
    println!(":: {:<10}: {}", "Valid", summary.valid.to_string().green());
    let invalid = if summary.invalid > 0 {
        summary.invalid.to_string().red().bold()
    } else {
        summary.invalid.to_string().normal()
    };
    println!(":: {:<10}: {}", "Invalid", invalid);
    if !summary.top_errors.is_empty() {
        println!();
        println!("Top error types:");
        for e in &summary.top_errors {
            println!("  {}: {}", e.message, e.count);
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a BatchSummary,
    rows: &'a [TableRow],
}

pub fn render_json(rows: &[TableRow], summary: &BatchSummary) -> Vec<u8> {
    serde_json::to_vec_pretty(&JsonReport { summary, rows }).unwrap_or_else(|_| b"{}\n".to_vec())
}

/// Entity-escapes markup characters. XML and HTML only disagree on the
/// apostrophe entity.
pub(crate) fn escape_markup(value: &str, apostrophe: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', apostrophe)
}

fn escape_xml(value: &str) -> String {
    escape_markup(value, "&apos;")
}

pub fn render_xml(rows: &[TableRow], summary: &BatchSummary) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!(
        "<results total=\"{}\" valid=\"{}\" invalid=\"{}\">\n",
        summary.total, summary.valid, summary.invalid
    ));
    for r in rows {
        out.push_str(&format!("  <result class=\"{}\">\n", r.status.class()));
        out.push_str(&format!("    <id>{}</id>\n", escape_xml(&r.id)));
        out.push_str(&format!("    <status>{}</status>\n", r.status.label()));
        if r.error.is_empty() {
            out.push_str("    <error/>\n");
        } else {
            out.push_str(&format!("    <error>{}</error>\n", escape_xml(&r.error)));
        }
        out.push_str("  </result>\n");
    }
    out.push_str("</results>\n");
    out.into_bytes()
}

pub fn render_html(rows: &[TableRow], summary: &BatchSummary, invalid_only: bool) -> Vec<u8> {
    report::render_html(rows, summary, invalid_only)
}

pub fn render_as(
    format: OutputFormat,
    rows: &[TableRow],
    summary: &BatchSummary,
    invalid_only: bool,
) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(rows),
        OutputFormat::Json => render_json(rows, summary),
        OutputFormat::Xml => render_xml(rows, summary),
        OutputFormat::Html => render_html(rows, summary, invalid_only),
    }
}
