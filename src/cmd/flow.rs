//! Flow rule commands.

use super::list::output_list;
use super::{
    OrDiagnostic, OutputFormat, report, resolve_flow_rule, resolve_step, resolve_wizard, short_id,
};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::flow::{FlowRulePatch, NewFlowRule};
use crate::guard::Confirmation;
use crate::ui;
use serde_json::Value;

/// Options shared by `flow add` and `flow update`
#[derive(Debug, Clone, Default)]
pub struct RuleArgs {
    pub condition: Option<String>,
    pub priority: Option<i32>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub inactive: bool,
}

fn parse_condition(text: Option<&str>) -> super::Outcome<Option<Value>> {
    text.map(|t| serde_json::from_str(t).or_diagnostic("--condition"))
        .transpose()
}

/// Add a rule routing `from` to `to` within a wizard
pub fn add(
    config: &Config,
    wizard: &str,
    from: &str,
    to: &str,
    args: RuleArgs,
    confirm: Confirmation,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let wizard_id = resolve_wizard(&service, wizard)?;
        let from_id = resolve_step(&service, from)?;
        let to_id = resolve_step(&service, to)?;
        let condition = parse_condition(args.condition.as_deref())?
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let mut input = NewFlowRule::new(from_id, to_id, condition, args.priority.unwrap_or(0));
        input.name = args.name;
        input.description = args.description;
        input.is_active = !args.inactive;

        let rule = service
            .create_flow_rule(wizard_id, input, confirm)
            .or_diagnostic(wizard_id)?;
        ui::success(format!(
            "Added flow rule {}: {} -> {} (priority {})",
            short_id(rule.id),
            short_id(from_id),
            short_id(to_id),
            rule.priority
        ));
        println!("{}", rule.id);
        Ok(())
    }))
}

/// Patch an existing rule
pub fn update(
    config: &Config,
    rule: &str,
    args: RuleArgs,
    active: Option<bool>,
    confirm: Confirmation,
) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let rule_id = resolve_flow_rule(&service, rule)?;
        let patch = FlowRulePatch {
            condition: parse_condition(args.condition.as_deref())?,
            priority: args.priority,
            name: args.name,
            description: args.description,
            is_active: active,
            ..FlowRulePatch::default()
        };
        service
            .update_flow_rule(rule_id, patch, confirm)
            .or_diagnostic(rule_id)?;
        ui::updated("flow rule", short_id(rule_id));
        Ok(())
    }))
}

/// List the rules of a wizard, highest priority first
pub fn list(config: &Config, wizard: &str, output: OutputFormat) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let wizard_id = resolve_wizard(&service, wizard)?;
        let rules = service.rules_of(wizard_id).or_diagnostic(wizard_id)?;
        if rules.is_empty() && output == OutputFormat::Table {
            ui::not_found("flow rule", short_id(wizard_id));
            return Ok(());
        }
        output_list(
            &rules,
            &["ID", "Priority", "From", "To", "Status", "Condition"],
            output,
            |r| {
                vec![
                    short_id(r.id),
                    r.priority.to_string(),
                    short_id(r.from_step_id),
                    short_id(r.to_step_id),
                    if r.is_active { "active" } else { "inactive" }.to_string(),
                    r.condition.to_string(),
                ]
            },
        );
        Ok(())
    }))
}

/// Remove a rule
pub fn remove(config: &Config, rule: &str, confirm: Confirmation) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let rule_id = resolve_flow_rule(&service, rule)?;
        service
            .delete_flow_rule(rule_id, confirm)
            .or_diagnostic(rule_id)?;
        ui::removed("flow rule", short_id(rule_id));
        Ok(())
    }))
}
