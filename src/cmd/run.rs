//! Run recording commands.

use super::list::output_list;
use super::{OrDiagnostic, OutputFormat, report, resolve_run, resolve_wizard, short_id};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::store::RunFilter;
use crate::ui;

/// Start a run of a wizard
pub fn start(config: &Config, wizard: &str, name: Option<&str>) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let wizard_id = resolve_wizard(&service, wizard)?;
        let run = service
            .start_run(wizard_id, name.map(str::to_string))
            .or_diagnostic(wizard_id)?;
        ui::created("run", short_id(run.id), &format!("wizard {}", short_id(wizard_id)));
        println!("{}", run.id);
        Ok(())
    }))
}

/// Complete a run, optionally storing its data
pub fn complete(config: &Config, run: &str, store: bool) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let run_id = resolve_run(&service, run)?;
        let run = service.complete_run(run_id, store).or_diagnostic(run_id)?;
        let target = if run.is_stored { "completed (stored)" } else { "completed" };
        ui::transitioned(short_id(run_id), "Run", target);
        Ok(())
    }))
}

/// Abandon an in-progress run
pub fn abandon(config: &Config, run: &str) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let run_id = resolve_run(&service, run)?;
        service.abandon_run(run_id).or_diagnostic(run_id)?;
        ui::transitioned(short_id(run_id), "Run", "abandoned");
        Ok(())
    }))
}

/// List the runs of a wizard
pub fn list(
    config: &Config,
    wizard: &str,
    filter: RunFilter,
    output: OutputFormat,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let wizard_id = resolve_wizard(&service, wizard)?;
        let runs = service.runs_of(wizard_id, filter).or_diagnostic(wizard_id)?;
        if runs.is_empty() && output == OutputFormat::Table {
            ui::not_found("run", short_id(wizard_id));
            return Ok(());
        }
        output_list(
            &runs,
            &["ID", "Name", "Status", "Stored", "Started"],
            output,
            |r| {
                vec![
                    short_id(r.id),
                    r.run_name.clone().unwrap_or_default(),
                    r.status.as_ref().to_string(),
                    if r.is_stored { "yes" } else { "no" }.to_string(),
                    r.started_at.format("%Y-%m-%d %H:%M").to_string(),
                ]
            },
        );
        Ok(())
    }))
}
