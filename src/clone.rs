//! Structural cloning of wizard aggregates.
//!
//! A clone is built in two passes over the source:
//!
//! 1. nodes: every step, option set and option gets a fresh id, and the
//!    old→new mapping is recorded per node kind;
//! 2. edges: every dependency edge and flow rule is re-created with both
//!    endpoints translated through those maps.
//!
//! The copy is assembled entirely in memory and committed with one insert,
//! so a failure at any point leaves the store untouched.

use crate::condition::remap_option_sets;
use crate::error::{EntityKind, Result, WizardError};
use crate::fingerprint::structural_fingerprint;
use crate::model::{
    FlowRule, LifecycleState, OptionDependency, OptionSet, Step, Wizard, WizardOption,
};
use crate::store::WizardStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Old→new id maps recorded during the node pass
#[derive(Debug, Default)]
struct IdMaps {
    steps: HashMap<Uuid, Uuid>,
    option_sets: HashMap<Uuid, Uuid>,
    options: HashMap<Uuid, Uuid>,
}

impl IdMaps {
    fn step(&self, old: Uuid) -> Result<Uuid> {
        self.steps.get(&old).copied().ok_or_else(|| {
            WizardError::Integrity(format!("flow rule references step {old} outside the source"))
        })
    }

    fn option(&self, old: Uuid) -> Result<Uuid> {
        self.options.get(&old).copied().ok_or_else(|| {
            WizardError::Integrity(format!(
                "dependency references option {old} outside the source"
            ))
        })
    }
}

/// Build a detached deep copy of `source` with fresh identities.
///
/// The copy starts as an unpublished, active draft at version 1 with no
/// parent; callers that version the wizard adjust those fields before
/// committing.
pub fn build_clone(
    source: &Wizard,
    new_name: &str,
    creator: &str,
    description: Option<&str>,
) -> Result<Wizard> {
    let now = Utc::now();
    let mut ids = IdMaps::default();

    let steps: Vec<Step> = source
        .ordered_steps()
        .into_iter()
        .map(|step| copy_step(step, &mut ids, now))
        .collect();

    let mut copy = Wizard {
        id: Uuid::new_v4(),
        name: new_name.to_string(),
        description: description
            .map(str::to_string)
            .or_else(|| source.description.clone()),
        created_by: creator.to_string(),
        settings: source.settings.clone(),
        is_published: false,
        is_active: true,
        steps,
        flow_rules: vec![],
        lifecycle_state: LifecycleState::Draft,
        is_archived: false,
        archived_at: None,
        version_number: 1,
        parent_wizard_id: None,
        first_run_at: None,
        first_stored_run_at: None,
        created_at: now,
        updated_at: now,
        published_at: None,
        revision: 0,
    };

    // Edge pass: dependencies
    for dep in source.iter_dependencies() {
        let edge = OptionDependency {
            id: Uuid::new_v4(),
            option_id: ids.option(dep.option_id)?,
            depends_on_option_id: ids.option(dep.depends_on_option_id)?,
            dependency_type: dep.dependency_type,
            created_at: now,
        };
        let owner = copy.option_mut(edge.option_id).ok_or_else(|| {
            WizardError::Integrity(format!("cloned option {} is missing", edge.option_id))
        })?;
        owner.dependencies.push(edge);
    }

    // Edge pass: flow rules
    for rule in &source.flow_rules {
        let mut condition = rule.condition.clone();
        remap_option_sets(&mut condition, &ids.option_sets).map_err(|missing| {
            WizardError::Integrity(format!(
                "flow rule {} references option set {missing} outside the source",
                rule.id
            ))
        })?;
        copy.flow_rules.push(FlowRule {
            id: Uuid::new_v4(),
            from_step_id: ids.step(rule.from_step_id)?,
            to_step_id: ids.step(rule.to_step_id)?,
            condition,
            created_at: now,
            updated_at: now,
            ..rule.clone()
        });
    }

    tracing::debug!(
        source = %source.id,
        steps = ids.steps.len(),
        option_sets = ids.option_sets.len(),
        options = ids.options.len(),
        "built clone id maps"
    );

    verify_same_shape(source, &copy)?;
    Ok(copy)
}

fn copy_step(step: &Step, ids: &mut IdMaps, now: DateTime<Utc>) -> Step {
    let id = Uuid::new_v4();
    ids.steps.insert(step.id, id);
    let option_sets = step
        .ordered_option_sets()
        .into_iter()
        .map(|set| copy_option_set(set, ids, now))
        .collect();
    Step {
        id,
        option_sets,
        created_at: now,
        updated_at: now,
        ..step.clone()
    }
}

fn copy_option_set(set: &OptionSet, ids: &mut IdMaps, now: DateTime<Utc>) -> OptionSet {
    let id = Uuid::new_v4();
    ids.option_sets.insert(set.id, id);
    let options = set
        .ordered_options()
        .into_iter()
        .map(|opt| {
            let id = Uuid::new_v4();
            ids.options.insert(opt.id, id);
            WizardOption {
                id,
                dependencies: vec![],
                created_at: now,
                updated_at: now,
                ..opt.clone()
            }
        })
        .collect();
    OptionSet {
        id,
        options,
        created_at: now,
        updated_at: now,
        ..set.clone()
    }
}

/// Abort unless the copy has exactly the source's structure
fn verify_same_shape(source: &Wizard, copy: &Wizard) -> Result<()> {
    let (expected, found) = (source.counts(), copy.counts());
    if expected != found {
        return Err(WizardError::Integrity(format!(
            "clone has {found}, source has {expected}"
        )));
    }
    let fingerprint = |w: &Wizard| {
        structural_fingerprint(w).map_err(|e| WizardError::Integrity(e.to_string()))
    };
    if fingerprint(source)? != fingerprint(copy)? {
        return Err(WizardError::Integrity(
            "clone fingerprint differs from source".to_string(),
        ));
    }
    Ok(())
}

/// Deep-copies wizards into new, independent aggregates.
pub struct StructuralCloner<'a> {
    wizards: &'a dyn WizardStore,
}

impl<'a> StructuralCloner<'a> {
    pub fn new(wizards: &'a dyn WizardStore) -> Self {
        Self { wizards }
    }

    pub fn clone_wizard(
        &self,
        source_id: Uuid,
        new_name: &str,
        creator: &str,
        description: Option<&str>,
    ) -> Result<Wizard> {
        let source = self
            .wizards
            .get(source_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Wizard, source_id))?;
        let copy = build_clone(&source, new_name, creator, description)?;
        self.wizards.insert(&copy)?;
        tracing::info!(source = %source_id, clone = %copy.id, counts = %copy.counts(), "cloned wizard");
        Ok(copy)
    }
}
