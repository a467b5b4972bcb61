use std::fmt::Write;

use crate::cli::Format;
use crate::db::{ColumnInfo, ForeignKeyInfo, SchemaSnapshot, TableInfo};

pub const NO_SCHEMA_MESSAGE: &str = "Could not retrieve schema information.";

/// Renders the snapshot as a plain-text report, in snapshot order.
pub fn render(snapshot: Option<&SchemaSnapshot>) -> String {
    let Some(snapshot) = snapshot else {
        return NO_SCHEMA_MESSAGE.to_string();
    };
    if snapshot.is_empty() {
        return format!("No tables found in schema '{}'.", snapshot.namespace);
    }

    let mut out = String::new();
    for (name, table) in &snapshot.tables {
        render_table(&mut out, name, table);
    }
    out
}

/// Everything written to stdout for one run, trailing newline included.
///
/// The comparison note follows only a non-empty text report. A missing
/// snapshot still renders, so a failed fetch ends the run normally.
pub fn render_output(
    snapshot: Option<&SchemaSnapshot>,
    format: Format,
    compare_with: &str,
) -> serde_json::Result<String> {
    let mut out = match (snapshot, format) {
        (Some(snapshot), Format::Json) => render_json(snapshot)?,
        (Some(snapshot), Format::Text) if !snapshot.is_empty() => {
            let mut out = render(Some(snapshot));
            let _ = write!(
                out,
                "\n\nComparison with Drizzle schema in '{}' can now be performed.",
                compare_with
            );
            out
        }
        (snapshot, _) => render(snapshot),
    };
    out.push('\n');
    Ok(out)
}

pub fn render_json(snapshot: &SchemaSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

fn render_table(out: &mut String, name: &str, table: &TableInfo) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "\n--- Table: {} ---", name);

    let _ = writeln!(out, "\n  Columns:");
    for column in &table.columns {
        let _ = writeln!(out, "    - {}", column_line(column));
    }

    if !table.primary_keys.is_empty() {
        let _ = writeln!(out, "\n  Primary Key(s): {}", table.primary_keys.join(", "));
    }

    if !table.foreign_keys.is_empty() {
        let _ = writeln!(out, "\n  Foreign Keys:");
        for fk in &table.foreign_keys {
            let _ = writeln!(out, "    - {}", foreign_key_line(fk));
        }
    }
    let _ = writeln!(out, "--- End of Table ---");
}

fn column_line(column: &ColumnInfo) -> String {
    let nullable = if column.is_nullable { "NULL" } else { "NOT NULL" };
    let default = column
        .default
        .as_ref()
        .map(|d| format!(" (Default: {})", d))
        .unwrap_or_default();
    format!("{}: {} {}{}", column.name, column.data_type, nullable, default)
}

fn foreign_key_line(fk: &ForeignKeyInfo) -> String {
    format!(
        "{} -> {}({})",
        fk.column, fk.references_table, fk.references_column
    )
}
