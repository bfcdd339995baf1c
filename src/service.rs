//! Boundary facade over the wizard components.
//!
//! [`WizardService`] owns the two stores and builds the short-lived
//! components (classifier, guard, cloner, ...) per call. Structural edits of
//! dependencies and flow rules go through the same modify gate as field
//! edits.

use crate::authoring::Authoring;
use crate::clone::StructuralCloner;
use crate::dependency::DependencyGraph;
use crate::error::{EntityKind, Result, WizardError};
use crate::flow::{FlowGraph, FlowRulePatch, NewFlowRule};
use crate::guard::{Confirmation, Permission, PermissionGuard};
use crate::lifecycle::{ProtectionStatus, StateClassifier};
use crate::model::{
    DependencyType, FlowRule, LifecycleState, OptionDependency, Step, Wizard, WizardRun,
};
use crate::runs::RunRecorder;
use crate::store::{
    InMemoryRunStore, InMemoryWizardStore, RunFilter, RunStats, RunStore, WizardStore,
};
use crate::validate::{ValidationResult, validate_catalog};
use crate::version::{FamilyPolicy, VersionManager};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

pub struct WizardService {
    wizards: Box<dyn WizardStore>,
    runs: Box<dyn RunStore>,
    family: FamilyPolicy,
}

impl WizardService {
    pub fn new(wizards: impl WizardStore + 'static, runs: impl RunStore + 'static) -> Self {
        Self {
            wizards: Box::new(wizards),
            runs: Box::new(runs),
            family: FamilyPolicy::default(),
        }
    }

    /// A service over fresh in-memory stores
    pub fn in_memory() -> Self {
        Self::new(InMemoryWizardStore::new(), InMemoryRunStore::new())
    }

    pub fn with_family_policy(mut self, family: FamilyPolicy) -> Self {
        self.family = family;
        self
    }

    pub fn wizards(&self) -> &dyn WizardStore {
        self.wizards.as_ref()
    }

    pub fn runs(&self) -> &dyn RunStore {
        self.runs.as_ref()
    }

    fn guard(&self) -> PermissionGuard<'_> {
        PermissionGuard::new(self.wizards(), self.runs())
    }

    fn classifier(&self) -> StateClassifier<'_> {
        StateClassifier::new(self.wizards(), self.runs())
    }

    fn authoring(&self) -> Authoring<'_> {
        Authoring::new(self.wizards(), self.runs())
    }

    fn recorder(&self) -> RunRecorder<'_> {
        RunRecorder::new(self.wizards(), self.runs())
    }

    /// Gate a structural edit of `wizard_id` on its modify permission.
    fn require_modify(&self, wizard_id: Uuid, confirm: Confirmation) -> Result<()> {
        let decision = self.guard().decide_modify(wizard_id)?;
        if decision.state.is_none() {
            return Err(WizardError::not_found(EntityKind::Wizard, wizard_id));
        }
        decision.permission.require(confirm)
    }

    fn owner_of_option(&self, option_id: Uuid) -> Result<Uuid> {
        self.wizards
            .find_option(option_id)?
            .map(|(_, loc)| loc.wizard_id)
            .ok_or_else(|| WizardError::not_found(EntityKind::Option, option_id))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn get_wizard(&self, wizard_id: Uuid) -> Result<Wizard> {
        self.wizards
            .get(wizard_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Wizard, wizard_id))
    }

    pub fn list_wizards(&self) -> Result<Vec<Wizard>> {
        Ok(self.wizards.list()?)
    }

    /// Run counts for every wizard in the catalog
    pub fn run_stats(&self) -> Result<HashMap<Uuid, RunStats>> {
        let mut stats = HashMap::new();
        for wizard in self.wizards.list()? {
            stats.insert(wizard.id, self.runs.stats(wizard.id)?);
        }
        Ok(stats)
    }

    pub fn validate(&self) -> Result<ValidationResult> {
        let wizards = self.wizards.list()?;
        let stats = self.run_stats()?;
        Ok(validate_catalog(&wizards, &stats))
    }

    // -------------------------------------------------------------------------
    // Lifecycle protection
    // -------------------------------------------------------------------------

    pub fn get_protection_status(&self, wizard_id: Uuid) -> Result<ProtectionStatus> {
        self.classifier().status(wizard_id)
    }

    pub fn can_modify_wizard(&self, wizard_id: Uuid) -> Result<Permission> {
        self.guard().can_modify(wizard_id)
    }

    pub fn can_delete_wizard(&self, wizard_id: Uuid) -> Result<Permission> {
        self.guard().can_delete(wizard_id)
    }

    pub fn refresh_lifecycle(&self, wizard_id: Uuid) -> Result<LifecycleState> {
        self.classifier().refresh(wizard_id)
    }

    /// Archive a wizard. Returns `false` if it does not exist.
    ///
    /// An archived wizard is neither published nor active.
    pub fn archive_wizard(&self, wizard_id: Uuid) -> Result<bool> {
        let Some(mut wizard) = self.wizards.get(wizard_id)? else {
            return Ok(false);
        };
        let already = wizard.is_archived && !wizard.is_published && !wizard.is_active;
        if !already {
            let now = Utc::now();
            if !wizard.is_archived {
                wizard.archived_at = Some(now);
            }
            wizard.is_archived = true;
            wizard.is_published = false;
            wizard.published_at = None;
            wizard.is_active = false;
            wizard.updated_at = now;
            self.wizards.update(&wizard)?;
            tracing::info!(wizard = %wizard_id, "archived wizard");
        }
        Ok(true)
    }

    /// Unarchive a wizard and mark it active again. Returns `false` if it
    /// does not exist. Publication is not restored.
    pub fn unarchive_wizard(&self, wizard_id: Uuid) -> Result<bool> {
        let Some(mut wizard) = self.wizards.get(wizard_id)? else {
            return Ok(false);
        };
        if wizard.is_archived || !wizard.is_active {
            wizard.is_archived = false;
            wizard.archived_at = None;
            wizard.is_active = true;
            wizard.updated_at = Utc::now();
            self.wizards.update(&wizard)?;
            tracing::info!(wizard = %wizard_id, "unarchived wizard");
        }
        Ok(true)
    }

    /// Delete every run of a wizard and return it to draft.
    ///
    /// Published wizards keep their runs; their stored data is what makes
    /// them read-only.
    pub fn delete_all_runs_for_wizard(
        &self,
        wizard_id: Uuid,
        confirm: Confirmation,
    ) -> Result<usize> {
        let mut wizard = self.get_wizard(wizard_id)?;
        if !confirm.is_confirmed() {
            return Err(WizardError::ConfirmationRequired {
                reason: format!(
                    "Deleting all runs of '{}' cannot be undone",
                    wizard.name
                ),
            });
        }
        if self.classifier().current_state(wizard_id)? == LifecycleState::Published {
            return Err(WizardError::Blocked(
                "Cannot delete runs from published wizard with stored data".to_string(),
            ));
        }

        let removed = self.runs.delete_all(wizard_id)?;
        wizard.lifecycle_state = LifecycleState::Draft;
        wizard.first_run_at = None;
        wizard.first_stored_run_at = None;
        wizard.updated_at = Utc::now();
        self.wizards.update(&wizard)?;
        tracing::info!(wizard = %wizard_id, removed, "deleted all runs");
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Clone and version
    // -------------------------------------------------------------------------

    pub fn clone_wizard(
        &self,
        source_id: Uuid,
        new_name: &str,
        creator: &str,
        description: Option<&str>,
    ) -> Result<Wizard> {
        StructuralCloner::new(self.wizards()).clone_wizard(source_id, new_name, creator, description)
    }

    pub fn create_wizard_version(&self, wizard_id: Uuid, new_name: Option<&str>) -> Result<Wizard> {
        VersionManager::new(self.wizards(), self.family).create_version(wizard_id, new_name)
    }

    pub fn lineage(&self, wizard_id: Uuid) -> Result<Vec<Wizard>> {
        VersionManager::new(self.wizards(), self.family).lineage(wizard_id)
    }

    // -------------------------------------------------------------------------
    // Authoring
    // -------------------------------------------------------------------------

    pub fn create_wizard(&self, definition: &Value, creator: &str) -> Result<Wizard> {
        self.authoring().create_wizard(definition, creator)
    }

    pub fn update_fields(
        &self,
        wizard_id: Uuid,
        fields: &[(String, String)],
        confirm: Confirmation,
    ) -> Result<Wizard> {
        self.authoring().update_fields(wizard_id, fields, confirm)
    }

    pub fn set_field(
        &self,
        wizard_id: Uuid,
        field: &str,
        value: &str,
        confirm: Confirmation,
    ) -> Result<Wizard> {
        self.authoring().set_field(wizard_id, field, value, confirm)
    }

    pub fn replace_steps(
        &self,
        wizard_id: Uuid,
        steps: Vec<Step>,
        confirm: Confirmation,
    ) -> Result<Wizard> {
        self.authoring().replace_steps(wizard_id, steps, confirm)
    }

    pub fn set_published(
        &self,
        wizard_id: Uuid,
        published: bool,
        confirm: Confirmation,
    ) -> Result<Wizard> {
        self.authoring().set_published(wizard_id, published, confirm)
    }

    pub fn delete_wizard(&self, wizard_id: Uuid, confirm: Confirmation) -> Result<Wizard> {
        self.authoring().delete_wizard(wizard_id, confirm)
    }

    // -------------------------------------------------------------------------
    // Dependencies
    // -------------------------------------------------------------------------

    pub fn create_dependency(
        &self,
        option_id: Uuid,
        depends_on_option_id: Uuid,
        dependency_type: DependencyType,
        confirm: Confirmation,
    ) -> Result<OptionDependency> {
        self.require_modify(self.owner_of_option(option_id)?, confirm)?;
        DependencyGraph::new(self.wizards()).create_dependency(
            option_id,
            depends_on_option_id,
            dependency_type,
        )
    }

    pub fn dependencies_of(&self, option_id: Uuid) -> Result<Vec<OptionDependency>> {
        DependencyGraph::new(self.wizards()).dependencies_of(option_id)
    }

    pub fn delete_dependency(
        &self,
        dependency_id: Uuid,
        confirm: Confirmation,
    ) -> Result<OptionDependency> {
        let (wizard, _) = self
            .wizards
            .find_dependency(dependency_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Dependency, dependency_id))?;
        self.require_modify(wizard.id, confirm)?;
        DependencyGraph::new(self.wizards()).delete_dependency(dependency_id)
    }

    // -------------------------------------------------------------------------
    // Flow rules
    // -------------------------------------------------------------------------

    pub fn create_flow_rule(
        &self,
        wizard_id: Uuid,
        rule: NewFlowRule,
        confirm: Confirmation,
    ) -> Result<FlowRule> {
        self.require_modify(wizard_id, confirm)?;
        FlowGraph::new(self.wizards()).create_flow_rule(wizard_id, rule)
    }

    pub fn rules_of(&self, wizard_id: Uuid) -> Result<Vec<FlowRule>> {
        FlowGraph::new(self.wizards()).rules_of(wizard_id)
    }

    pub fn get_flow_rule(&self, rule_id: Uuid) -> Result<FlowRule> {
        FlowGraph::new(self.wizards()).get_rule(rule_id)
    }

    fn owner_of_rule(&self, rule_id: Uuid) -> Result<Uuid> {
        self.wizards
            .find_flow_rule(rule_id)?
            .map(|(w, _)| w.id)
            .ok_or_else(|| WizardError::not_found(EntityKind::FlowRule, rule_id))
    }

    pub fn update_flow_rule(
        &self,
        rule_id: Uuid,
        patch: FlowRulePatch,
        confirm: Confirmation,
    ) -> Result<FlowRule> {
        self.require_modify(self.owner_of_rule(rule_id)?, confirm)?;
        FlowGraph::new(self.wizards()).update_flow_rule(rule_id, patch)
    }

    pub fn delete_flow_rule(&self, rule_id: Uuid, confirm: Confirmation) -> Result<FlowRule> {
        self.require_modify(self.owner_of_rule(rule_id)?, confirm)?;
        FlowGraph::new(self.wizards()).delete_flow_rule(rule_id)
    }

    // -------------------------------------------------------------------------
    // Runs
    // -------------------------------------------------------------------------

    pub fn start_run(&self, wizard_id: Uuid, run_name: Option<String>) -> Result<WizardRun> {
        self.recorder().start_run(wizard_id, run_name)
    }

    pub fn complete_run(&self, run_id: Uuid, store: bool) -> Result<WizardRun> {
        self.recorder().complete_run(run_id, store)
    }

    pub fn abandon_run(&self, run_id: Uuid) -> Result<WizardRun> {
        self.recorder().abandon_run(run_id)
    }

    pub fn runs_of(&self, wizard_id: Uuid, filter: RunFilter) -> Result<Vec<WizardRun>> {
        self.recorder().list(wizard_id, filter)
    }
}
