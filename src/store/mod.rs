//! Repository traits for wizard aggregates and their runs.
//!
//! Services never touch storage directly; they are handed a [`WizardStore`]
//! and a [`RunStore`]. Two backends ship with the crate:
//!
//! - [`InMemoryWizardStore`] / [`InMemoryRunStore`] for tests and embedding
//! - [`FileWizardStore`] / [`FileRunStore`] for the JSON tree used by the CLI
//!
//! A wizard is always written as a whole aggregate, so readers observe either
//! the previous or the next version of it, never a partial copy.

mod error;
mod file;
mod memory;

pub use error::{Result, StoreError};
pub use file::{FileRunStore, FileWizardStore};
pub use memory::{InMemoryRunStore, InMemoryWizardStore};

use crate::model::{FlowRule, OptionDependency, OptionLocation, RunStatus, Wizard, WizardRun};
use clap::ValueEnum;
use serde::Serialize;
use uuid::Uuid;

/// Persistence of wizard aggregates.
pub trait WizardStore: Send + Sync {
    fn get(&self, id: Uuid) -> Result<Option<Wizard>>;

    /// All wizards, ordered by creation time.
    fn list(&self) -> Result<Vec<Wizard>>;

    /// Insert a new aggregate. Fails with [`StoreError::AlreadyExists`] on id reuse.
    fn insert(&self, wizard: &Wizard) -> Result<()>;

    /// Replace a stored aggregate.
    ///
    /// The write is accepted only if `wizard.revision` equals the stored
    /// revision; the stored copy is returned with its revision bumped.
    fn update(&self, wizard: &Wizard) -> Result<Wizard>;

    /// Remove an aggregate. Returns `false` if it did not exist.
    fn remove(&self, id: Uuid) -> Result<bool>;

    /// Find the wizard owning an option.
    fn find_option(&self, option_id: Uuid) -> Result<Option<(Wizard, OptionLocation)>> {
        Ok(self.list()?.into_iter().find_map(|w| {
            let location = w.locate_option(option_id)?;
            Some((w, location))
        }))
    }

    /// Find the wizard owning a step.
    fn find_step(&self, step_id: Uuid) -> Result<Option<Wizard>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|w| w.step(step_id).is_some()))
    }

    fn find_dependency(&self, dependency_id: Uuid) -> Result<Option<(Wizard, OptionDependency)>> {
        Ok(self.list()?.into_iter().find_map(|w| {
            let dep = w
                .iter_dependencies()
                .find(|d| d.id == dependency_id)
                .cloned()?;
            Some((w, dep))
        }))
    }

    fn find_flow_rule(&self, rule_id: Uuid) -> Result<Option<(Wizard, FlowRule)>> {
        Ok(self.list()?.into_iter().find_map(|w| {
            let rule = w.flow_rule(rule_id).cloned()?;
            Some((w, rule))
        }))
    }
}

/// Which runs a count covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RunFilter {
    #[default]
    All,
    Stored,
    InProgress,
    Completed,
}

impl RunFilter {
    pub fn matches(&self, run: &WizardRun) -> bool {
        match self {
            Self::All => true,
            Self::Stored => run.is_stored,
            Self::InProgress => run.status == RunStatus::InProgress,
            Self::Completed => run.status == RunStatus::Completed,
        }
    }
}

/// Run aggregates for one wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub stored: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl RunStats {
    pub fn from_runs(runs: &[WizardRun]) -> Self {
        let count = |filter: RunFilter| runs.iter().filter(|r| filter.matches(r)).count();
        Self {
            total: runs.len(),
            stored: count(RunFilter::Stored),
            in_progress: count(RunFilter::InProgress),
            completed: count(RunFilter::Completed),
        }
    }
}

/// Persistence of wizard runs, owned by the run subsystem.
pub trait RunStore: Send + Sync {
    fn insert(&self, run: &WizardRun) -> Result<()>;

    fn get(&self, run_id: Uuid) -> Result<Option<WizardRun>>;

    /// Replace a stored run. Fails with [`StoreError::NotFound`] if it is missing.
    fn update(&self, run: &WizardRun) -> Result<()>;

    /// All runs of a wizard, ordered by `started_at`.
    fn runs_for(&self, wizard_id: Uuid) -> Result<Vec<WizardRun>>;

    /// Delete every run of a wizard, returning how many were removed.
    fn delete_all(&self, wizard_id: Uuid) -> Result<usize>;

    fn count(&self, wizard_id: Uuid, filter: RunFilter) -> Result<usize> {
        Ok(self
            .runs_for(wizard_id)?
            .iter()
            .filter(|r| filter.matches(r))
            .count())
    }

    fn stats(&self, wizard_id: Uuid) -> Result<RunStats> {
        Ok(RunStats::from_runs(&self.runs_for(wizard_id)?))
    }

    /// The run with the smallest `started_at`.
    fn earliest(&self, wizard_id: Uuid) -> Result<Option<WizardRun>> {
        Ok(self
            .runs_for(wizard_id)?
            .into_iter()
            .min_by_key(|r| r.started_at))
    }

    /// The stored run with the smallest `completed_at`.
    fn earliest_stored(&self, wizard_id: Uuid) -> Result<Option<WizardRun>> {
        Ok(self
            .runs_for(wizard_id)?
            .into_iter()
            .filter(|r| r.is_stored)
            .min_by_key(|r| r.completed_at.unwrap_or(r.started_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_stats_counts_each_bucket() {
        let wizard_id = Uuid::new_v4();
        let mut completed = WizardRun::start(wizard_id, None);
        completed.status = RunStatus::Completed;
        completed.is_stored = true;
        let mut abandoned = WizardRun::start(wizard_id, None);
        abandoned.status = RunStatus::Abandoned;
        let running = WizardRun::start(wizard_id, None);

        let stats = RunStats::from_runs(&[completed, abandoned, running]);
        assert_eq!(
            stats,
            RunStats {
                total: 3,
                stored: 1,
                in_progress: 1,
                completed: 1,
            }
        );
    }
}
