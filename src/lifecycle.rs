//! Lifecycle classification of wizards from their run history.
//!
//! The persisted `lifecycle_state` is only a cache. The authoritative state
//! is always recomputed from run aggregates:
//!
//! | runs                      | state       |
//! |---------------------------|-------------|
//! | none                      | `draft`     |
//! | at least one stored       | `published` |
//! | some, none stored         | `in_use`    |

use crate::error::{EntityKind, Result, WizardError};
use crate::model::{LifecycleState, Wizard};
use crate::store::{RunStats, RunStore, WizardStore};
use serde::Serialize;
use strum::AsRefStr;
use uuid::Uuid;

/// Operations a client may offer for a wizard in its current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Edit,
    Delete,
    Publish,
    Test,
    View,
    Clone,
    CreateVersion,
    Archive,
    Export,
    EditWithWarning,
    DeleteWithWarning,
}

/// Protection summary returned to callers before an edit or delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionStatus {
    pub wizard_id: Uuid,
    pub state: LifecycleState,
    pub can_edit: bool,
    pub can_delete: bool,
    pub total_runs: usize,
    pub stored_runs: usize,
    pub in_progress_runs: usize,
    pub completed_runs: usize,
    pub message: String,
    pub actions: Vec<Action>,
    pub is_archived: bool,
}

/// Derive the lifecycle state from run aggregates.
///
/// Stored runs take precedence over everything else.
pub fn classify(stats: &RunStats) -> LifecycleState {
    if stats.total == 0 {
        LifecycleState::Draft
    } else if stats.stored > 0 {
        LifecycleState::Published
    } else {
        LifecycleState::InUse
    }
}

/// Build the full protection summary for a wizard.
pub fn protection_status(wizard: &Wizard, stats: RunStats) -> ProtectionStatus {
    let state = classify(&stats);
    let (can_edit, can_delete, message, actions) = match state {
        LifecycleState::Draft => (
            true,
            true,
            "This wizard has never been run. All modifications and deletions are allowed."
                .to_string(),
            vec![Action::Edit, Action::Delete, Action::Publish, Action::Test],
        ),
        LifecycleState::Published => (
            false,
            false,
            format!(
                "This wizard has {} stored run(s) and is read-only to protect user data. \
                 You can create a clone or new version to make changes.",
                stats.stored
            ),
            vec![
                Action::View,
                Action::Clone,
                Action::CreateVersion,
                Action::Archive,
                Action::Export,
            ],
        ),
        LifecycleState::InUse => (
            true,
            true,
            format!(
                "This wizard has {} active run(s) but no stored data. \
                 Modifications will affect existing runs. \
                 Consider warning users or cloning the wizard.",
                stats.total
            ),
            vec![
                Action::EditWithWarning,
                Action::DeleteWithWarning,
                Action::Clone,
                Action::View,
            ],
        ),
    };

    ProtectionStatus {
        wizard_id: wizard.id,
        state,
        can_edit,
        can_delete,
        total_runs: stats.total,
        stored_runs: stats.stored,
        in_progress_runs: stats.in_progress,
        completed_runs: stats.completed,
        message,
        actions,
        is_archived: wizard.is_archived,
    }
}

/// Classifies wizards against the run store and keeps the cached state fresh.
pub struct StateClassifier<'a> {
    wizards: &'a dyn WizardStore,
    runs: &'a dyn RunStore,
}

impl<'a> StateClassifier<'a> {
    pub fn new(wizards: &'a dyn WizardStore, runs: &'a dyn RunStore) -> Self {
        Self { wizards, runs }
    }

    fn load(&self, wizard_id: Uuid) -> Result<Wizard> {
        self.wizards
            .get(wizard_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Wizard, wizard_id))
    }

    pub fn status(&self, wizard_id: Uuid) -> Result<ProtectionStatus> {
        let wizard = self.load(wizard_id)?;
        let stats = self.runs.stats(wizard_id)?;
        tracing::debug!(
            wizard = %wizard_id,
            total = stats.total,
            stored = stats.stored,
            "classifying wizard"
        );
        Ok(protection_status(&wizard, stats))
    }

    /// Current state computed from runs, without touching the cache.
    pub fn current_state(&self, wizard_id: Uuid) -> Result<LifecycleState> {
        Ok(classify(&self.runs.stats(wizard_id)?))
    }

    /// Recompute the state and persist it (with first-run watermarks) if the
    /// cache is out of date. Calling it twice in a row writes at most once.
    pub fn refresh(&self, wizard_id: Uuid) -> Result<LifecycleState> {
        let mut wizard = self.load(wizard_id)?;
        let state = self.current_state(wizard_id)?;
        let mut dirty = false;

        if wizard.lifecycle_state != state {
            tracing::info!(
                wizard = %wizard_id,
                from = %wizard.lifecycle_state,
                to = %state,
                "lifecycle state changed"
            );
            wizard.lifecycle_state = state;
            dirty = true;
        }

        if state != LifecycleState::Draft && wizard.first_run_at.is_none() {
            if let Some(run) = self.runs.earliest(wizard_id)? {
                wizard.first_run_at = Some(run.started_at);
                dirty = true;
            }
        }

        if state == LifecycleState::Published && wizard.first_stored_run_at.is_none() {
            if let Some(run) = self.runs.earliest_stored(wizard_id)? {
                wizard.first_stored_run_at = Some(run.completed_at.unwrap_or(run.started_at));
                dirty = true;
            }
        }

        if dirty {
            self.wizards.update(&wizard)?;
        }
        Ok(state)
    }
}
