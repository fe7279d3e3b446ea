//! Output rendering

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render `value` as pretty JSON or through `text`
pub fn render<T, F>(format: OutputFormat, value: &T, text: F) -> Result<String>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .with_context(|| "Failed to serialize output to JSON"),
        OutputFormat::Text => Ok(text(value)),
    }
}

pub fn table_row(columns: &[&str]) -> String {
    let mut row = String::new();
    for (i, column) in columns.iter().enumerate() {
        if i + 1 == columns.len() {
            row.push_str(column);
        } else {
            row.push_str(&format!("{:<20} ", column));
        }
    }
    row
}

pub fn table(header: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut lines = vec![table_row(header), "-".repeat(80)];
    for row in rows {
        let columns: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(table_row(&columns));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_layout() {
        let rendered = table(
            &["ID", "VLAN"],
            vec![vec!["net-a".to_string(), "1".to_string()]],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID "));
        assert!(lines[2].ends_with(" 1"));
    }

    #[test]
    fn test_json_render() {
        let out = render(OutputFormat::Json, &vec![1, 2], |_| unreachable!()).unwrap();
        assert_eq!(
            serde_json::from_str::<Vec<u8>>(&out).unwrap(),
            vec![1, 2]
        );
    }
}
