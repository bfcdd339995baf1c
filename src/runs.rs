//! Run recording hooks.
//!
//! Runs are owned by the run subsystem; these hooks exist so that every
//! change to a wizard's run history is followed by a lifecycle refresh.

use crate::error::{EntityKind, Result, WizardError};
use crate::lifecycle::StateClassifier;
use crate::model::{RunStatus, WizardRun};
use crate::store::{RunFilter, RunStore, WizardStore};
use chrono::Utc;
use uuid::Uuid;

pub struct RunRecorder<'a> {
    wizards: &'a dyn WizardStore,
    runs: &'a dyn RunStore,
}

impl<'a> RunRecorder<'a> {
    pub fn new(wizards: &'a dyn WizardStore, runs: &'a dyn RunStore) -> Self {
        Self { wizards, runs }
    }

    fn refresh(&self, wizard_id: Uuid) -> Result<()> {
        StateClassifier::new(self.wizards, self.runs).refresh(wizard_id)?;
        Ok(())
    }

    fn load_in_progress(&self, run_id: Uuid) -> Result<WizardRun> {
        let run = self
            .runs
            .get(run_id)?
            .ok_or_else(|| WizardError::not_found(EntityKind::Run, run_id))?;
        if run.status != RunStatus::InProgress {
            return Err(WizardError::RunNotInProgress {
                id: run_id,
                status: run.status,
            });
        }
        Ok(run)
    }

    pub fn start_run(&self, wizard_id: Uuid, run_name: Option<String>) -> Result<WizardRun> {
        if self.wizards.get(wizard_id)?.is_none() {
            return Err(WizardError::not_found(EntityKind::Wizard, wizard_id));
        }
        let run = WizardRun::start(wizard_id, run_name);
        self.runs.insert(&run)?;
        tracing::info!(wizard = %wizard_id, run = %run.id, "run started");
        self.refresh(wizard_id)?;
        Ok(run)
    }

    /// Finish a run. A stored run makes its wizard published.
    pub fn complete_run(&self, run_id: Uuid, store: bool) -> Result<WizardRun> {
        let mut run = self.load_in_progress(run_id)?;
        run.status = RunStatus::Completed;
        run.is_stored = store;
        run.completed_at = Some(Utc::now());
        self.runs.update(&run)?;
        tracing::info!(wizard = %run.wizard_id, run = %run_id, stored = store, "run completed");
        self.refresh(run.wizard_id)?;
        Ok(run)
    }

    pub fn abandon_run(&self, run_id: Uuid) -> Result<WizardRun> {
        let mut run = self.load_in_progress(run_id)?;
        run.status = RunStatus::Abandoned;
        self.runs.update(&run)?;
        tracing::info!(wizard = %run.wizard_id, run = %run_id, "run abandoned");
        self.refresh(run.wizard_id)?;
        Ok(run)
    }

    pub fn list(&self, wizard_id: Uuid, filter: RunFilter) -> Result<Vec<WizardRun>> {
        if self.wizards.get(wizard_id)?.is_none() {
            return Err(WizardError::not_found(EntityKind::Wizard, wizard_id));
        }
        Ok(self
            .runs
            .runs_for(wizard_id)?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LifecycleState, Wizard};
    use crate::store::{InMemoryRunStore, InMemoryWizardStore};

    fn setup() -> (InMemoryWizardStore, InMemoryRunStore, Uuid) {
        let wizards = InMemoryWizardStore::new();
        let w: Wizard =
            serde_json::from_value(serde_json::json!({ "name": "Survey" })).expect("wizard");
        wizards.insert(&w).expect("insert");
        (wizards, InMemoryRunStore::new(), w.id)
    }

    #[test]
    fn test_runs_drive_lifecycle() {
        let (wizards, runs, id) = setup();
        let recorder = RunRecorder::new(&wizards, &runs);

        let run = recorder.start_run(id, Some("first".into())).expect("start");
        let w = wizards.get(id).expect("get").expect("exists");
        assert_eq!(w.lifecycle_state, LifecycleState::InUse);
        assert_eq!(w.first_run_at, Some(run.started_at));

        let done = recorder.complete_run(run.id, true).expect("complete");
        let w = wizards.get(id).expect("get").expect("exists");
        assert_eq!(w.lifecycle_state, LifecycleState::Published);
        assert_eq!(w.first_stored_run_at, done.completed_at);
    }

    #[test]
    fn test_finished_run_cannot_be_finished_again() {
        let (wizards, runs, id) = setup();
        let recorder = RunRecorder::new(&wizards, &runs);
        let run = recorder.start_run(id, None).expect("start");
        recorder.abandon_run(run.id).expect("abandon");

        assert!(matches!(
            recorder.complete_run(run.id, false),
            Err(WizardError::RunNotInProgress {
                status: RunStatus::Abandoned,
                ..
            })
        ));
    }

    #[test]
    fn test_list_filters() {
        let (wizards, runs, id) = setup();
        let recorder = RunRecorder::new(&wizards, &runs);
        let a = recorder.start_run(id, None).expect("start");
        recorder.start_run(id, None).expect("start");
        recorder.complete_run(a.id, true).expect("complete");

        assert_eq!(recorder.list(id, RunFilter::All).expect("list").len(), 2);
        assert_eq!(recorder.list(id, RunFilter::Stored).expect("list").len(), 1);
        assert_eq!(
            recorder.list(id, RunFilter::InProgress).expect("list").len(),
            1
        );
    }
}
