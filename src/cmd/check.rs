//! Check/lint command implementation.

use super::{OrDiagnostic, report};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::ui;

/// Validate every wizard in the data root
pub fn check_all(config: &Config) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    let mut found = vec![];
    let mut failed = report(|| {
        let result = service
            .validate()
            .or_diagnostic(config.data_root().display())?;

        ui::check_header();
        ui::check_count(result.wizard_count, "wizards");
        ui::check_count(result.step_count, "steps");
        ui::check_count(result.option_count, "options");
        ui::check_count(result.dependency_count, "dependencies");
        ui::check_count(result.flow_rule_count, "flow rules");
        eprintln!();

        if result.diagnostics.is_empty() {
            ui::success("All checks passed");
        }
        found = result.diagnostics;
        Ok(())
    });
    failed.append(&mut found);
    Ok(failed)
}
