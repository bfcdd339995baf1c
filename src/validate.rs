//! Structural validation of wizards and of the whole catalog.

use crate::condition::Condition;
use crate::dependency::cycles;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::lifecycle::classify;
use crate::model::{LifecycleState, Wizard};
use crate::store::RunStats;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Validation result with counts
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub wizard_count: usize,
    pub step_count: usize,
    pub option_count: usize,
    pub dependency_count: usize,
    pub flow_rule_count: usize,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.level == crate::diagnostic::DiagnosticLevel::Error)
    }
}

/// Check the internal structure of one wizard.
///
/// `option_owners` maps option ids of the whole catalog to their wizard and
/// lets a foreign dependency target be reported as cross-wizard rather than
/// dangling.
pub fn check_wizard(
    wizard: &Wizard,
    option_owners: Option<&HashMap<Uuid, Uuid>>,
) -> Vec<Diagnostic> {
    let mut diags = vec![];
    let file = wizard.id.to_string();

    // Steps
    let mut orders = HashSet::new();
    for step in &wizard.steps {
        if !orders.insert(step.step_order) {
            diags.push(Diagnostic::new(
                DiagnosticCode::E0203StepOrderDuplicate,
                format!(
                    "Step '{}' reuses step_order {}",
                    step.name, step.step_order
                ),
                &file,
            ));
        }
    }

    // Option sets
    for (step, set) in wizard.iter_option_sets() {
        if let Some(max) = set.max_selections {
            if max < set.min_selections {
                diags.push(Diagnostic::new(
                    DiagnosticCode::E0204OptionSetBoundsInvalid,
                    format!(
                        "Option set '{}' in step '{}' has max_selections {} below min_selections {}",
                        set.name, step.name, max, set.min_selections
                    ),
                    &file,
                ));
            }
        }
        if let (Some(min), Some(max)) = (set.min_value, set.max_value) {
            if min > max {
                diags.push(Diagnostic::new(
                    DiagnosticCode::E0204OptionSetBoundsInvalid,
                    format!(
                        "Option set '{}' in step '{}' has min_value {} above max_value {}",
                        set.name, step.name, min, max
                    ),
                    &file,
                ));
            }
        }
        if let Some(pattern) = &set.regex_pattern {
            if let Err(e) = Regex::new(pattern) {
                diags.push(Diagnostic::new(
                    DiagnosticCode::E0205OptionSetPatternInvalid,
                    format!("Option set '{}' has an invalid regex_pattern: {e}", set.name),
                    &file,
                ));
            }
        }
    }

    // Dependencies
    for (_, _, opt) in wizard.iter_options() {
        for dep in &opt.dependencies {
            if dep.option_id != opt.id {
                diags.push(Diagnostic::new(
                    DiagnosticCode::E0308DependencyDangling,
                    format!(
                        "Dependency {} is stored on option '{}' but starts at {}",
                        dep.id, opt.label, dep.option_id
                    ),
                    &file,
                ));
            }
            if dep.depends_on_option_id == dep.option_id {
                diags.push(Diagnostic::new(
                    DiagnosticCode::E0303DependencySelfLoop,
                    format!("Option '{}' depends on itself", opt.label),
                    &file,
                ));
                continue;
            }
            if wizard.option(dep.depends_on_option_id).is_none() {
                let foreign = option_owners
                    .and_then(|owners| owners.get(&dep.depends_on_option_id))
                    .is_some();
                let (code, what) = if foreign {
                    (DiagnosticCode::E0304DependencyCrossWizard, "another wizard")
                } else {
                    (DiagnosticCode::E0308DependencyDangling, "an unknown option")
                };
                diags.push(Diagnostic::new(
                    code,
                    format!(
                        "Option '{}' depends on {what} ({})",
                        opt.label, dep.depends_on_option_id
                    ),
                    &file,
                ));
            }
        }
    }
    for cycle in cycles(wizard) {
        if cycle.len() <= 2 {
            // Self-loops are reported above
            continue;
        }
        let labels: Vec<String> = cycle
            .iter()
            .map(|id| {
                wizard
                    .option(*id)
                    .map(|o| o.label.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect();
        diags.push(Diagnostic::new(
            DiagnosticCode::E0306DependencyCycle,
            format!("Dependency cycle: {}", labels.join(" -> ")),
            &file,
        ));
    }

    // Flow rules
    for rule in &wizard.flow_rules {
        for step_id in [rule.from_step_id, rule.to_step_id] {
            if wizard.step(step_id).is_none() {
                diags.push(Diagnostic::new(
                    DiagnosticCode::E0402FlowStepNotInWizard,
                    format!("Flow rule {} points to step {step_id} outside the wizard", rule.id),
                    &file,
                ));
            }
        }
        if rule.from_step_id == rule.to_step_id {
            diags.push(Diagnostic::new(
                DiagnosticCode::E0403FlowSelfLoop,
                format!("Flow rule {} routes a step to itself", rule.id),
                &file,
            ));
        }
        if let Err(e) = Condition::parse_for(&rule.condition, wizard) {
            diags.push(Diagnostic::new(
                DiagnosticCode::E0404FlowConditionInvalid,
                format!("Flow rule {} has an invalid condition {e}", rule.id),
                &file,
            ));
        }
    }

    diags
}

/// Validate every wizard together with its run aggregates.
pub fn validate_catalog(wizards: &[Wizard], stats: &HashMap<Uuid, RunStats>) -> ValidationResult {
    let mut diagnostics = vec![];

    let option_owners: HashMap<Uuid, Uuid> = wizards
        .iter()
        .flat_map(|w| w.iter_options().map(move |(_, _, o)| (o.id, w.id)))
        .collect();
    let known: HashSet<Uuid> = wizards.iter().map(|w| w.id).collect();

    for wizard in wizards {
        let file = wizard.id.to_string();
        diagnostics.extend(check_wizard(wizard, Some(&option_owners)));

        if wizard.version_number < 1 {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::E0107WizardVersionInvalid,
                format!("Wizard '{}' has version_number 0", wizard.name),
                &file,
            ));
        }
        if let Some(parent) = wizard.parent_wizard_id {
            if !known.contains(&parent) {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::W0102ParentMissing,
                    format!("Wizard '{}' has unknown parent {parent}", wizard.name),
                    &file,
                ));
            }
        }

        let run_stats = stats.get(&wizard.id).copied().unwrap_or_default();
        let state = classify(&run_stats);
        if state != wizard.lifecycle_state {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::W0101LifecycleStale,
                format!(
                    "Wizard '{}' is cached as {} but its runs make it {} (run `wizard refresh`)",
                    wizard.name, wizard.lifecycle_state, state
                ),
                &file,
            ));
        }
        let watermark_issue = match state {
            LifecycleState::Draft => {
                wizard.first_run_at.is_some() || wizard.first_stored_run_at.is_some()
            }
            LifecycleState::InUse => wizard.first_run_at.is_none(),
            LifecycleState::Published => {
                wizard.first_run_at.is_none() || wizard.first_stored_run_at.is_none()
            }
        };
        if watermark_issue {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::W0103WatermarkInconsistent,
                format!(
                    "Wizard '{}' has first-run timestamps that do not match its {} state",
                    wizard.name, state
                ),
                &file,
            ));
        }
    }

    let counts = wizards.iter().map(Wizard::counts).fold(
        crate::model::StructureCounts::default(),
        |mut acc, c| {
            acc.steps += c.steps;
            acc.options += c.options;
            acc.dependencies += c.dependencies;
            acc.flow_rules += c.flow_rules;
            acc
        },
    );

    ValidationResult {
        diagnostics,
        wizard_count: wizards.len(),
        step_count: counts.steps,
        option_count: counts.options,
        dependency_count: counts.dependencies,
        flow_rule_count: counts.flow_rules,
    }
}
