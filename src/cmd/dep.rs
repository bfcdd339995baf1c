//! Option dependency commands.

use super::list::output_list;
use super::{OrDiagnostic, OutputFormat, report, resolve_dependency, resolve_option, short_id};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::guard::Confirmation;
use crate::model::DependencyType;
use crate::ui;

/// Add an edge `option -> depends_on`
pub fn add(
    config: &Config,
    option: &str,
    depends_on: &str,
    dependency_type: DependencyType,
    confirm: Confirmation,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let option_id = resolve_option(&service, option)?;
        let depends_on_id = resolve_option(&service, depends_on)?;
        let dep = service
            .create_dependency(option_id, depends_on_id, dependency_type, confirm)
            .or_diagnostic(option_id)?;
        ui::success(format!(
            "Added {} dependency {}: {} -> {}",
            dependency_type.as_ref(),
            short_id(dep.id),
            short_id(option_id),
            short_id(depends_on_id)
        ));
        println!("{}", dep.id);
        Ok(())
    }))
}

/// List the outgoing edges of an option
pub fn list(config: &Config, option: &str, output: OutputFormat) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let option_id = resolve_option(&service, option)?;
        let deps = service.dependencies_of(option_id).or_diagnostic(option_id)?;
        if deps.is_empty() && output == OutputFormat::Table {
            ui::not_found("dependency", short_id(option_id));
            return Ok(());
        }
        output_list(&deps, &["ID", "Type", "Depends on"], output, |d| {
            vec![
                short_id(d.id),
                d.dependency_type.as_ref().to_string(),
                d.depends_on_option_id.to_string(),
            ]
        });
        Ok(())
    }))
}

/// Remove one dependency edge
pub fn remove(config: &Config, id: &str, confirm: Confirmation) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let dep_id = resolve_dependency(&service, id)?;
        service
            .delete_dependency(dep_id, confirm)
            .or_diagnostic(dep_id)?;
        ui::removed("dependency", short_id(dep_id));
        Ok(())
    }))
}
