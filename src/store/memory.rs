use super::error::{Result, StoreError};
use super::{RunStore, WizardStore};
use crate::model::{Wizard, WizardRun};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

/// In-memory wizard store.
///
/// Every write replaces the whole aggregate under a single write lock.
#[derive(Debug, Default)]
pub struct InMemoryWizardStore {
    wizards: RwLock<HashMap<Uuid, Wizard>>,
}

impl InMemoryWizardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WizardStore for InMemoryWizardStore {
    fn get(&self, id: Uuid) -> Result<Option<Wizard>> {
        Ok(read(&self.wizards)?.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Wizard>> {
        let mut all: Vec<Wizard> = read(&self.wizards)?.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    fn insert(&self, wizard: &Wizard) -> Result<()> {
        let mut map = write(&self.wizards)?;
        if map.contains_key(&wizard.id) {
            return Err(StoreError::AlreadyExists {
                kind: "wizard",
                id: wizard.id,
            });
        }
        map.insert(wizard.id, wizard.clone());
        Ok(())
    }

    fn update(&self, wizard: &Wizard) -> Result<Wizard> {
        let mut map = write(&self.wizards)?;
        let stored = map.get_mut(&wizard.id).ok_or(StoreError::NotFound {
            kind: "wizard",
            id: wizard.id,
        })?;
        if stored.revision != wizard.revision {
            return Err(StoreError::Conflict {
                id: wizard.id,
                expected: wizard.revision,
                found: stored.revision,
            });
        }
        let mut next = wizard.clone();
        next.revision += 1;
        *stored = next.clone();
        Ok(next)
    }

    fn remove(&self, id: Uuid) -> Result<bool> {
        Ok(write(&self.wizards)?.remove(&id).is_some())
    }
}

/// In-memory run store.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<Vec<WizardRun>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStore for InMemoryRunStore {
    fn insert(&self, run: &WizardRun) -> Result<()> {
        let mut runs = write(&self.runs)?;
        if runs.iter().any(|r| r.id == run.id) {
            return Err(StoreError::AlreadyExists {
                kind: "run",
                id: run.id,
            });
        }
        runs.push(run.clone());
        Ok(())
    }

    fn get(&self, run_id: Uuid) -> Result<Option<WizardRun>> {
        Ok(read(&self.runs)?.iter().find(|r| r.id == run_id).cloned())
    }

    fn update(&self, run: &WizardRun) -> Result<()> {
        let mut runs = write(&self.runs)?;
        let slot = runs
            .iter_mut()
            .find(|r| r.id == run.id)
            .ok_or(StoreError::NotFound {
                kind: "run",
                id: run.id,
            })?;
        *slot = run.clone();
        Ok(())
    }

    fn runs_for(&self, wizard_id: Uuid) -> Result<Vec<WizardRun>> {
        let mut runs: Vec<WizardRun> = read(&self.runs)?
            .iter()
            .filter(|r| r.wizard_id == wizard_id)
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.started_at);
        Ok(runs)
    }

    fn delete_all(&self, wizard_id: Uuid) -> Result<usize> {
        let mut runs = write(&self.runs)?;
        let before = runs.len();
        runs.retain(|r| r.wizard_id != wizard_id);
        Ok(before - runs.len())
    }
}
