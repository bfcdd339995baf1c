//! List command implementation.

use super::{OrDiagnostic, OutputFormat, report, short_id};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::model::LifecycleState;
use crate::ui::stdout_supports_color;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use uuid::Uuid;

/// Check if stdout supports colors (delegates to centralized ui module)
fn use_colors() -> bool {
    stdout_supports_color()
}

/// Create an ID cell (cyan, bold when colors enabled)
fn id_cell(text: &str) -> Cell {
    if use_colors() {
        Cell::new(text)
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(text)
    }
}

/// Create a state cell with semantic color
fn state_cell(state: &str) -> Cell {
    if use_colors() {
        let color = match state {
            "draft" | "in_progress" => Color::Yellow,
            "in_use" => Color::Blue,
            "published" | "completed" | "allowed" => Color::Green,
            "archived" | "abandoned" | "blocked" => Color::DarkGrey,
            _ => Color::White,
        };
        Cell::new(state).fg(color)
    } else {
        Cell::new(state)
    }
}

/// Create a header cell (bold when colors enabled)
fn header_cell(text: &str) -> Cell {
    if use_colors() {
        Cell::new(text).add_attribute(Attribute::Bold)
    } else {
        Cell::new(text)
    }
}

/// Output a list of items in the specified format.
///
/// The first column is treated as an id; columns headed "State" or "Status"
/// get semantic colors.
pub(crate) fn output_list<T: Serialize>(
    items: &[T],
    headers: &[&str],
    format: OutputFormat,
    to_row: impl Fn(&T) -> Vec<String>,
) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Plain => {
            for item in items {
                println!("{}", to_row(item).join("\t"));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(headers.iter().map(|h| header_cell(h)).collect::<Vec<_>>());

            for item in items {
                let row = to_row(item);
                table.add_row(
                    row.iter()
                        .enumerate()
                        .map(|(i, v)| {
                            if i == 0 {
                                id_cell(v)
                            } else if headers
                                .get(i)
                                .is_some_and(|h| *h == "State" || *h == "Status")
                            {
                                state_cell(v)
                            } else {
                                Cell::new(v)
                            }
                        })
                        .collect::<Vec<_>>(),
                );
            }
            println!("{table}");
        }
    }
}

/// Serializable wizard summary for list output
#[derive(Serialize)]
struct WizardSummary {
    id: Uuid,
    name: String,
    version: u32,
    state: String,
    steps: usize,
    options: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    archived: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    published: bool,
}

/// List wizards, optionally filtered by cached lifecycle state
pub fn list_wizards(
    config: &Config,
    state: Option<LifecycleState>,
    include_archived: bool,
    limit: Option<usize>,
    output: OutputFormat,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let mut wizards = service
            .list_wizards()
            .or_diagnostic(config.data_root().display())?;
        wizards.retain(|w| include_archived || !w.is_archived);
        if let Some(state) = state {
            wizards.retain(|w| w.lifecycle_state == state);
        }
        if let Some(n) = limit {
            wizards.truncate(n);
        }

        let summaries: Vec<WizardSummary> = wizards
            .iter()
            .map(|w| {
                let counts = w.counts();
                WizardSummary {
                    id: w.id,
                    name: w.name.clone(),
                    version: w.version_number,
                    state: if w.is_archived {
                        "archived".to_string()
                    } else {
                        w.lifecycle_state.to_string()
                    },
                    steps: counts.steps,
                    options: counts.options,
                    archived: w.is_archived,
                    published: w.is_published,
                }
            })
            .collect();

        output_list(
            &summaries,
            &["ID", "Name", "Version", "State", "Steps", "Options"],
            output,
            |s| {
                vec![
                    short_id(s.id),
                    s.name.clone(),
                    format!("v{}", s.version),
                    s.state.clone(),
                    s.steps.to_string(),
                    s.options.to_string(),
                ]
            },
        );
        Ok(())
    }))
}
