//! Renders export records as csv, json, txt, html or markdown.
//!
//! Records are rows: objects contribute their keys as columns, any other
//! value is shown under a single `value` column.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Result, workflow::template::stringify};

const VALUE_COLUMN: &str = "value";
const DEFAULT_FILE_NAME: &str = "export";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Txt,
    Html,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Txt => "text/plain",
            ExportFormat::Html => "text/html",
            ExportFormat::Markdown => "text/markdown",
        }
    }
}

/// File name with the format's extension, `export` when none is configured.
pub fn file_name(
    name: &str,
    format: ExportFormat,
) -> String {
    let name = name.trim();
    let name = if name.is_empty() { DEFAULT_FILE_NAME } else { name };
    let extension = format!(".{}", format.extension());
    if name.to_lowercase().ends_with(&extension) {
        name.to_string()
    } else {
        format!("{}{}", name, extension)
    }
}

/// Render `records` in `format`.
pub fn render(
    records: &[Value],
    format: ExportFormat,
) -> Result<String> {
    Ok(match format {
        ExportFormat::Json => serde_json::to_string_pretty(records)?,
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Txt => to_txt(records),
        ExportFormat::Html => to_html(records),
        ExportFormat::Markdown => to_markdown(records),
    })
}

/// Column names in first-seen order.
fn columns(records: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        match record {
            Value::Object(obj) => {
                for key in obj.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            _ => {
                if !columns.iter().any(|c| c == VALUE_COLUMN) {
                    columns.push(VALUE_COLUMN.to_string());
                }
            }
        }
    }
    columns
}

fn cell(
    record: &Value,
    column: &str,
) -> String {
    let value = match record {
        Value::Object(obj) => obj.get(column),
        other if column == VALUE_COLUMN => Some(other),
        _ => None,
    };
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => stringify(value),
    }
}

fn rows(records: &[Value]) -> (Vec<String>, Vec<Vec<String>>) {
    let columns = columns(records);
    let rows = records.iter().map(|record| columns.iter().map(|column| cell(record, column)).collect()).collect();
    (columns, rows)
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn to_csv(records: &[Value]) -> String {
    let (columns, rows) = rows(records);
    if columns.is_empty() {
        return String::new();
    }

    let mut lines = vec![columns.iter().map(|c| escape_csv(c)).collect::<Vec<_>>().join(",")];
    lines.extend(rows.iter().map(|row| row.iter().map(|f| escape_csv(f)).collect::<Vec<_>>().join(",")));
    lines.join("\n")
}

fn to_txt(records: &[Value]) -> String {
    records
        .iter()
        .map(|record| match record {
            Value::Object(obj) => txt_object(obj),
            other => stringify(other),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn txt_object(obj: &Map<String, Value>) -> String {
    obj.iter().map(|(key, value)| format!("{}: {}", key, stringify(value))).collect::<Vec<_>>().join("\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn to_html(records: &[Value]) -> String {
    let (columns, rows) = rows(records);

    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Export</title>\n</head>\n<body>\n<table>\n<thead>\n<tr>");
    for column in &columns {
        html.push_str(&format!("<th>{}</th>", escape_html(column)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in &rows {
        html.push_str("<tr>");
        for field in row {
            html.push_str(&format!("<td>{}</td>", escape_html(field)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace("\r\n", "<br>").replace('\n', "<br>")
}

fn to_markdown(records: &[Value]) -> String {
    let (columns, rows) = rows(records);
    if columns.is_empty() {
        return String::new();
    }

    let line = |fields: &[String]| format!("| {} |", fields.iter().map(|f| escape_markdown(f)).collect::<Vec<_>>().join(" | "));
    let mut lines = vec![line(&columns), format!("|{}", " --- |".repeat(columns.len()))];
    lines.extend(rows.iter().map(|row| line(row)));
    lines.join("\n")
}
