//! Wizard commands: authoring, protection queries, clone/version, archive.

use super::list::output_list;
use super::{OrDiagnostic, OutputFormat, report, resolve_wizard, short_id};
use crate::authoring::parse_steps;
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::fingerprint::{short, structural_fingerprint};
use crate::guard::{Confirmation, Permission};
use crate::model::Wizard;
use crate::ui;
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Read a JSON document from a file, or from stdin for `-`
fn read_json_input(path: &Path) -> super::Outcome<Value> {
    let subject = path.display();
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .or_diagnostic("stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).or_diagnostic(&subject)?
    };
    serde_json::from_str(&content).or_diagnostic(&subject)
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
    );
}

/// Create a wizard from a JSON definition file
pub fn new(config: &Config, definition: &Path) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let definition_json = read_json_input(definition)?;
        let wizard = service
            .create_wizard(&definition_json, &config.project.default_creator)
            .or_diagnostic(definition.display())?;
        ui::created("wizard", wizard.id, &wizard.name);
        println!("{}", wizard.id);
        Ok(())
    }))
}

/// Serializable step row for `wizard show`
#[derive(Serialize)]
struct StepRow {
    order: i32,
    name: String,
    option_sets: usize,
    options: usize,
}

/// Show one wizard with its structure
pub fn show(config: &Config, id: &str, output: OutputFormat) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let wizard = service.get_wizard(id).or_diagnostic(id)?;
        if output == OutputFormat::Json {
            print_json(&wizard);
            return Ok(());
        }

        let fingerprint = structural_fingerprint(&wizard).or_diagnostic(id)?;
        println!("{} ({})", wizard.name, wizard.id);
        if let Some(description) = &wizard.description {
            println!("  {description}");
        }
        println!("  Version:     v{}", wizard.version_number);
        if let Some(parent) = wizard.parent_wizard_id {
            println!("  Parent:      {parent}");
        }
        println!("  State:       {}", wizard.lifecycle_state);
        println!("  Published:   {}", wizard.is_published);
        println!("  Active:      {}", wizard.is_active);
        if wizard.is_archived {
            println!("  Archived:    yes");
        }
        println!("  Created by:  {}", wizard.created_by);
        println!("  Structure:   {}", wizard.counts());
        println!("  Fingerprint: {}", short(&fingerprint));
        println!();

        let rows: Vec<StepRow> = wizard
            .ordered_steps()
            .into_iter()
            .map(|step| StepRow {
                order: step.step_order,
                name: step.name.clone(),
                option_sets: step.option_sets.len(),
                options: step.option_sets.iter().map(|s| s.options.len()).sum(),
            })
            .collect();
        output_list(&rows, &["Order", "Step", "Option sets", "Options"], output, |r| {
            vec![
                r.order.to_string(),
                r.name.clone(),
                r.option_sets.to_string(),
                r.options.to_string(),
            ]
        });
        Ok(())
    }))
}

/// Show the protection status of a wizard
pub fn protection(
    config: &Config,
    id: &str,
    output: OutputFormat,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let status = service.get_protection_status(id).or_diagnostic(id)?;
        match output {
            OutputFormat::Json => print_json(&status),
            OutputFormat::Plain | OutputFormat::Table => {
                println!("State:       {}", status.state);
                println!("Can edit:    {}", status.can_edit);
                println!("Can delete:  {}", status.can_delete);
                println!(
                    "Runs:        {} total, {} in progress, {} completed, {} stored",
                    status.total_runs,
                    status.in_progress_runs,
                    status.completed_runs,
                    status.stored_runs
                );
                if status.is_archived {
                    println!("Archived:    yes");
                }
                let actions: Vec<&str> = status.actions.iter().map(|a| a.as_ref()).collect();
                println!("Actions:     {}", actions.join(", "));
                println!("{}", status.message);
            }
        }
        Ok(())
    }))
}

fn print_permission(permission: &Permission, output: OutputFormat) {
    if output == OutputFormat::Json {
        print_json(permission);
        return;
    }
    match permission {
        Permission::Allowed => println!("allowed"),
        Permission::AllowedWithWarning(reason) => println!("allowed_with_warning: {reason}"),
        Permission::Blocked(reason) => println!("blocked: {reason}"),
    }
}

/// Ask whether a wizard may be modified
pub fn can_modify(
    config: &Config,
    id: &str,
    output: OutputFormat,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let permission = service.can_modify_wizard(id).or_diagnostic(id)?;
        print_permission(&permission, output);
        Ok(())
    }))
}

/// Ask whether a wizard may be deleted
pub fn can_delete(
    config: &Config,
    id: &str,
    output: OutputFormat,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let permission = service.can_delete_wizard(id).or_diagnostic(id)?;
        print_permission(&permission, output);
        Ok(())
    }))
}

/// Set a top-level field
pub fn set_field(
    config: &Config,
    id: &str,
    field: &str,
    value: &str,
    confirm: Confirmation,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        service
            .set_field(id, field, value, confirm)
            .or_diagnostic(id)?;
        ui::field_set(short_id(id), field, value);
        Ok(())
    }))
}

/// Replace the step tree from a JSON array file
pub fn replace_steps(
    config: &Config,
    id: &str,
    steps: &Path,
    confirm: Confirmation,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let before = service.get_wizard(id).or_diagnostic(id)?;
        let steps = parse_steps(&read_json_input(steps)?).or_diagnostic(steps.display())?;
        let wizard = service.replace_steps(id, steps, confirm).or_diagnostic(id)?;

        let dropped = before
            .flow_rules
            .len()
            .saturating_sub(wizard.flow_rules.len());
        if dropped > 0 {
            ui::warn(format!("Dropped {dropped} flow rule(s) that no longer resolve"));
        }
        ui::updated("wizard", short_id(id));
        ui::info(format!("  {}", wizard.counts()));
        Ok(())
    }))
}

/// Publish or unpublish a wizard
pub fn publish(
    config: &Config,
    id: &str,
    published: bool,
    confirm: Confirmation,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        service
            .set_published(id, published, confirm)
            .or_diagnostic(id)?;
        let action = if published { "Published" } else { "Unpublished" };
        ui::success(format!("{action} wizard {}", short_id(id)));
        Ok(())
    }))
}

/// Soft-delete a wizard
pub fn delete(config: &Config, id: &str, confirm: Confirmation) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        service.delete_wizard(id, confirm).or_diagnostic(id)?;
        ui::removed("wizard", short_id(id));
        Ok(())
    }))
}

/// Deep-copy a wizard into a new draft
pub fn clone(
    config: &Config,
    id: &str,
    name: &str,
    creator: Option<&str>,
    description: Option<&str>,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let creator = creator.unwrap_or(&config.project.default_creator);
        let copy = service
            .clone_wizard(id, name, creator, description)
            .or_diagnostic(id)?;
        ui::created("wizard", copy.id, &copy.name);
        ui::info(format!("  {}", copy.counts()));
        println!("{}", copy.id);
        Ok(())
    }))
}

/// Create the next version of a wizard
pub fn version(config: &Config, id: &str, name: Option<&str>) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let version = service.create_wizard_version(id, name).or_diagnostic(id)?;
        ui::created(
            &format!("version v{}", version.version_number),
            version.id,
            &version.name,
        );
        println!("{}", version.id);
        Ok(())
    }))
}

#[derive(Serialize)]
struct LineageRow {
    id: uuid::Uuid,
    version: u32,
    name: String,
    state: String,
    parent: Option<uuid::Uuid>,
}

/// List every version linked to a wizard
pub fn lineage(config: &Config, id: &str, output: OutputFormat) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let family = service.lineage(id).or_diagnostic(id)?;
        let rows: Vec<LineageRow> = family
            .iter()
            .map(|w: &Wizard| LineageRow {
                id: w.id,
                version: w.version_number,
                name: w.name.clone(),
                state: w.lifecycle_state.to_string(),
                parent: w.parent_wizard_id,
            })
            .collect();
        output_list(&rows, &["ID", "Version", "Name", "State", "Parent"], output, |r| {
            vec![
                short_id(r.id),
                format!("v{}", r.version),
                r.name.clone(),
                r.state.clone(),
                r.parent.map(short_id).unwrap_or_else(|| "-".to_string()),
            ]
        });
        Ok(())
    }))
}

/// Archive or unarchive a wizard
pub fn archive(config: &Config, id: &str, archived: bool) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let found = if archived {
            service.archive_wizard(id)
        } else {
            service.unarchive_wizard(id)
        }
        .or_diagnostic(id)?;
        if !found {
            return service.get_wizard(id).map(|_| ()).or_diagnostic(id);
        }
        let action = if archived { "Archived" } else { "Unarchived" };
        ui::transitioned(short_id(id), action, if archived { "archived" } else { "active" });
        Ok(())
    }))
}

/// Recompute and persist the cached lifecycle state
pub fn refresh(config: &Config, id: &str) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let state = service.refresh_lifecycle(id).or_diagnostic(id)?;
        ui::transitioned(short_id(id), "Refreshed", state.as_ref());
        Ok(())
    }))
}

/// Delete all runs of a wizard and return it to draft
pub fn purge_runs(
    config: &Config,
    id: &str,
    confirm: Confirmation,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let id = resolve_wizard(&service, id)?;
        let removed = service
            .delete_all_runs_for_wizard(id, confirm)
            .or_diagnostic(id)?;
        ui::success(format!(
            "Deleted {removed} run(s); wizard {} is a draft again",
            short_id(id)
        ));
        Ok(())
    }))
}
