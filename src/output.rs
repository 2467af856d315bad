//! Output pipeline
//!
//! Sorting and rendering of resolved rows as a table or a JSON array.

use crate::error::{OstackError, Result};
use crate::resource::formatter::display_text;
use crate::resource::Resolved;
use clap::ValueEnum;
use comfy_table::{Cell, Color, Table};
use serde_json::Value;
use std::cmp::Ordering;

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Stable sort by one of the output columns
pub fn sort_rows(resolved: &mut Resolved, field: &str) -> Result<()> {
    if !resolved.columns.iter().any(|c| c == field) {
        return Err(OstackError::UnknownColumn {
            column: field.to_string(),
            valid: resolved.columns.clone(),
        });
    }

    resolved
        .rows
        .sort_by(|a, b| compare_values(a.get(field), b.get(field)));
    Ok(())
}

/// Numbers compare numerically, everything else by display text; nulls last
///
/// Values are ranked by type first so mixed columns still sort totally.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(x), Some(y)) if type_rank(a) == 2 && type_rank(b) == 2 => {
            display_text(x).cmp(&display_text(y))
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Number(_)) => 1,
        None | Some(Value::Null) => 3,
        Some(_) => 2,
    }
}

pub fn render(resolved: &Resolved, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(resolved)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&resolved.rows)?),
    }
}

fn render_table(resolved: &Resolved) -> String {
    let mut table = Table::new();
    table.set_header(resolved.columns.iter().map(String::as_str));

    for row in &resolved.rows {
        table.add_row(resolved.columns.iter().map(|column| {
            let value = row.get(column).unwrap_or(&Value::Null);
            status_cell(column, display_text(value))
        }));
    }

    table.to_string()
}

fn status_cell(column: &str, text: String) -> Cell {
    let color = match column {
        "status" | "power_state" | "provision_state" => status_color(&text),
        _ => None,
    };
    match color {
        Some(color) => Cell::new(text).fg(color),
        None => Cell::new(text),
    }
}

fn status_color(status: &str) -> Option<Color> {
    match status.to_ascii_uppercase().as_str() {
        "ACTIVE" | "AVAILABLE" | "IN-USE" | "POWER ON" => Some(Color::Green),
        "BUILD" | "DOWN" | "SHUTOFF" | "QUEUED" | "SAVING" | "POWER OFF" | "DEPLOYING"
        | "CLEANING" => Some(Color::Yellow),
        "ERROR" | "DEPLOY FAILED" | "CLEAN FAILED" | "ERROR_DELETING" => Some(Color::Red),
        _ => None,
    }
}
