//! Creation and guarded editing of wizard definitions.
//!
//! Every edit goes through the same gate: the permission guard decides,
//! warnings need a [`Confirmation`], and the lifecycle state is checked
//! again right before the single whole-aggregate write.

use crate::condition::Condition;
use crate::diagnostic::DiagnosticLevel;
use crate::error::{EntityKind, Result, WizardError};
use crate::guard::{Confirmation, Decision, PermissionGuard};
use crate::model::{LifecycleState, Step, Wizard};
use crate::store::{RunStore, WizardStore};
use crate::validate::check_wizard;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

/// JSON schema for wizard definition files
const WIZARD_SCHEMA: &str = include_str!("../schema/wizard.schema.json");

/// Fields accepted by [`apply_field`]
pub const EDITABLE_FIELDS: &[&str] = &[
    "name",
    "description",
    "category_id",
    "icon",
    "cover_image",
    "estimated_time",
    "difficulty_level",
    "tags",
    "auto_save",
    "auto_save_interval",
    "allow_templates",
    "require_login",
    "allow_anonymous",
    "is_active",
];

fn schema_errors(instance: &Value) -> Result<Vec<String>> {
    let schema: Value = serde_json::from_str(WIZARD_SCHEMA)
        .map_err(|e| WizardError::Integrity(format!("embedded wizard schema: {e}")))?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| WizardError::Integrity(format!("embedded wizard schema: {e}")))?;
    Ok(validator
        .iter_errors(instance)
        .map(|e| e.to_string())
        .collect())
}

fn duplicate_ids(wizard: &Wizard) -> Vec<String> {
    let mut seen = HashSet::new();
    let ids = wizard
        .steps
        .iter()
        .map(|s| s.id)
        .chain(wizard.iter_option_sets().map(|(_, set)| set.id))
        .chain(wizard.iter_options().map(|(_, _, o)| o.id))
        .chain(wizard.iter_dependencies().map(|d| d.id))
        .chain(wizard.flow_rules.iter().map(|r| r.id));
    ids.filter(|id| !seen.insert(*id))
        .map(|id| format!("id {id} is used more than once"))
        .collect()
}

/// Parse and validate a wizard definition.
///
/// The definition must match the wizard schema, deserialize, and pass the
/// structural checks of [`check_wizard`]. All problems are reported together.
pub fn parse_definition(definition: &Value) -> Result<Wizard> {
    let errors = schema_errors(definition)?;
    if !errors.is_empty() {
        return Err(WizardError::InvalidDefinition(errors));
    }
    let wizard: Wizard = serde_json::from_value(definition.clone())
        .map_err(|e| WizardError::InvalidDefinition(vec![e.to_string()]))?;

    let mut errors = duplicate_ids(&wizard);
    errors.extend(
        check_wizard(&wizard, None)
            .into_iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .map(|d| d.message),
    );
    if !errors.is_empty() {
        return Err(WizardError::InvalidDefinition(errors));
    }
    Ok(wizard)
}

/// Parse a replacement step list (a JSON array of step definitions).
pub fn parse_steps(steps: &Value) -> Result<Vec<Step>> {
    let wrapper = serde_json::json!({ "name": "steps", "steps": steps });
    Ok(parse_definition(&wrapper)?.steps)
}

fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(WizardError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected true or false, got '{value}'"),
        }),
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Set one top-level field from its string form. An empty value clears
/// optional fields.
pub fn apply_field(wizard: &mut Wizard, field: &str, value: &str) -> Result<()> {
    let invalid = |reason: String| WizardError::InvalidValue {
        field: field.to_string(),
        reason,
    };
    let settings = &mut wizard.settings;
    match field {
        "name" => {
            wizard.name = optional(value).ok_or_else(|| invalid("name cannot be empty".into()))?;
        }
        "description" => wizard.description = optional(value),
        "category_id" => {
            settings.category_id = optional(value)
                .map(|v| Uuid::parse_str(&v))
                .transpose()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "icon" => settings.icon = optional(value),
        "cover_image" => settings.cover_image = optional(value),
        "estimated_time" => {
            settings.estimated_time = optional(value)
                .map(|v| v.parse::<u32>())
                .transpose()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "difficulty_level" => {
            settings.difficulty_level = optional(value)
                .map(|v| serde_json::from_value(Value::String(v)))
                .transpose()
                .map_err(|_| invalid(format!("'{value}' is not easy, medium or hard")))?;
        }
        "tags" => {
            settings.tags = value
                .split(',')
                .filter_map(optional)
                .collect();
        }
        "auto_save" => settings.auto_save = parse_flag(field, value)?,
        "auto_save_interval" => {
            let secs: u32 = value.trim().parse().map_err(|_| {
                invalid(format!("expected a positive number of seconds, got '{value}'"))
            })?;
            if secs == 0 {
                return Err(invalid("must be at least 1 second".into()));
            }
            settings.auto_save_interval = secs;
        }
        "allow_templates" => settings.allow_templates = parse_flag(field, value)?,
        "require_login" => settings.require_login = parse_flag(field, value)?,
        "allow_anonymous" => settings.allow_anonymous = parse_flag(field, value)?,
        "is_active" => wizard.is_active = parse_flag(field, value)?,
        _ => return Err(WizardError::UnknownField(field.to_string())),
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Gate {
    Modify,
    Delete,
}

/// Wizard creation plus the guarded edit operations.
pub struct Authoring<'a> {
    wizards: &'a dyn WizardStore,
    runs: &'a dyn RunStore,
}

impl<'a> Authoring<'a> {
    pub fn new(wizards: &'a dyn WizardStore, runs: &'a dyn RunStore) -> Self {
        Self { wizards, runs }
    }

    /// Validate `definition` and store it as a new draft wizard.
    ///
    /// Ids present in the definition are kept. Lifecycle fields are always
    /// reset; `created_by` falls back to `creator`.
    pub fn create_wizard(&self, definition: &Value, creator: &str) -> Result<Wizard> {
        let mut wizard = parse_definition(definition)?;
        let now = Utc::now();

        if wizard.created_by.trim().is_empty() {
            wizard.created_by = creator.to_string();
        }
        wizard.lifecycle_state = LifecycleState::Draft;
        wizard.is_archived = false;
        wizard.archived_at = None;
        wizard.version_number = 1;
        wizard.parent_wizard_id = None;
        wizard.first_run_at = None;
        wizard.first_stored_run_at = None;
        wizard.created_at = now;
        wizard.updated_at = now;
        wizard.published_at = wizard.is_published.then_some(now);
        wizard.revision = 0;

        self.wizards.insert(&wizard)?;
        tracing::info!(wizard = %wizard.id, name = %wizard.name, counts = %wizard.counts(), "created wizard");
        Ok(wizard)
    }

    fn commit<F>(
        &self,
        wizard_id: Uuid,
        gate: Gate,
        confirm: Confirmation,
        edit: F,
    ) -> Result<Wizard>
    where
        F: FnOnce(&mut Wizard) -> Result<()>,
    {
        let guard = PermissionGuard::new(self.wizards, self.runs);
        let Decision { permission, state } = match gate {
            Gate::Modify => guard.decide_modify(wizard_id)?,
            Gate::Delete => guard.decide_delete(wizard_id)?,
        };
        if state.is_none() {
            return Err(WizardError::not_found(EntityKind::Wizard, wizard_id));
        }
        permission.require(confirm)?;

        let mut wizard = self
            .wizards
            .get(wizard_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Wizard, wizard_id))?;
        edit(&mut wizard)?;
        wizard.updated_at = Utc::now();

        guard.recheck(wizard_id, state)?;
        Ok(self.wizards.update(&wizard)?)
    }

    /// Apply several field assignments in one write.
    pub fn update_fields(
        &self,
        wizard_id: Uuid,
        fields: &[(String, String)],
        confirm: Confirmation,
    ) -> Result<Wizard> {
        let wizard = self.commit(wizard_id, Gate::Modify, confirm, |wizard| {
            for (field, value) in fields {
                apply_field(wizard, field, value)?;
            }
            Ok(())
        })?;
        tracing::info!(wizard = %wizard_id, fields = fields.len(), "updated wizard fields");
        Ok(wizard)
    }

    pub fn set_field(
        &self,
        wizard_id: Uuid,
        field: &str,
        value: &str,
        confirm: Confirmation,
    ) -> Result<Wizard> {
        self.update_fields(
            wizard_id,
            &[(field.to_string(), value.to_string())],
            confirm,
        )
    }

    /// Replace the whole step tree.
    ///
    /// Flow rules that no longer resolve against the new steps are dropped.
    pub fn replace_steps(
        &self,
        wizard_id: Uuid,
        steps: Vec<Step>,
        confirm: Confirmation,
    ) -> Result<Wizard> {
        self.commit(wizard_id, Gate::Modify, confirm, |wizard| {
            wizard.steps = steps;
            let before = wizard.flow_rules.len();
            let candidate = wizard.clone();
            wizard.flow_rules.retain(|rule| {
                candidate.step(rule.from_step_id).is_some()
                    && candidate.step(rule.to_step_id).is_some()
                    && Condition::parse_for(&rule.condition, &candidate).is_ok()
            });
            let dropped = before - wizard.flow_rules.len();
            if dropped > 0 {
                tracing::warn!(wizard = %wizard.id, dropped, "dropped flow rules that no longer resolve");
            }

            let mut errors = duplicate_ids(wizard);
            errors.extend(
                check_wizard(wizard, None)
                    .into_iter()
                    .filter(|d| d.level == DiagnosticLevel::Error)
                    .map(|d| d.message),
            );
            if !errors.is_empty() {
                return Err(WizardError::InvalidDefinition(errors));
            }
            tracing::info!(wizard = %wizard.id, counts = %wizard.counts(), "replaced steps");
            Ok(())
        })
    }

    /// Toggle the published flag. Publishing stamps `published_at`.
    pub fn set_published(
        &self,
        wizard_id: Uuid,
        published: bool,
        confirm: Confirmation,
    ) -> Result<Wizard> {
        self.commit(wizard_id, Gate::Modify, confirm, |wizard| {
            if published && !wizard.is_published {
                wizard.published_at = Some(Utc::now());
            } else if !published {
                wizard.published_at = None;
            }
            wizard.is_published = published;
            Ok(())
        })
    }

    /// Soft delete: the wizard stays on record but is inactive and unpublished.
    pub fn delete_wizard(&self, wizard_id: Uuid, confirm: Confirmation) -> Result<Wizard> {
        let wizard = self.commit(wizard_id, Gate::Delete, confirm, |wizard| {
            wizard.is_active = false;
            wizard.is_published = false;
            Ok(())
        })?;
        tracing::info!(wizard = %wizard_id, "deleted wizard");
        Ok(wizard)
    }
}
