use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

const SCHEMA_BASE: &str = "https://schemas.3leaps.dev/xframe/cli/v1";

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Schema id stamped on JSON output records.
pub fn schema_id(record: &str) -> String {
    format!("{SCHEMA_BASE}/{record}.schema.json")
}

/// One JSON document per line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// A two-column FIELD/VALUE table.
pub fn print_fields(fields: &[(&str, String)]) {
    let rows = fields
        .iter()
        .map(|(name, value)| vec![name.to_uppercase(), value.clone()])
        .collect();
    print_table(&["FIELD", "VALUE"], rows);
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// `key=value` pairs on one line.
pub fn print_pretty(fields: &[(&str, String)]) {
    let line = fields
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{line}");
}

pub fn print_raw(text: &str) {
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Compact single-line rendering of a JSON value for tables.
pub fn preview(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render an optional field, using `-` for absent values.
pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn schema_ids_are_versioned() {
        assert_eq!(
            schema_id("envelope"),
            "https://schemas.3leaps.dev/xframe/cli/v1/envelope.schema.json"
        );
    }

    #[test]
    fn preview_unquotes_strings() {
        assert_eq!(preview(&json!("foo.com")), "foo.com");
        assert_eq!(preview(&json!({ "a": 1 })), r#"{"a":1}"#);
        assert_eq!(or_dash(None), "-");
    }
}
