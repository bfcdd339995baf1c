use super::error::{Result, StoreError};
use super::{RunStore, WizardStore};
use crate::model::{Wizard, WizardRun};
use crate::write::atomic_write;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::json(path, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).map_err(|e| StoreError::json(path, e))?;
    content.push('\n');
    atomic_write(path, content.as_bytes()).map_err(|e| StoreError::io(path, e))
}

/// JSON files directly under `dir`, sorted by name
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    let mut files = vec![];
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Wizard aggregates stored as `<root>/wizards/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileWizardStore {
    dir: PathBuf,
}

impl FileWizardStore {
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        Self {
            dir: data_root.as_ref().join("wizards"),
        }
    }

    pub fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl WizardStore for FileWizardStore {
    fn get(&self, id: Uuid) -> Result<Option<Wizard>> {
        read_json(&self.path_for(id))
    }

    fn list(&self) -> Result<Vec<Wizard>> {
        let mut all = vec![];
        for path in json_files(&self.dir)? {
            if let Some(w) = read_json::<Wizard>(&path)? {
                all.push(w);
            }
        }
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    fn insert(&self, wizard: &Wizard) -> Result<()> {
        let path = self.path_for(wizard.id);
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                kind: "wizard",
                id: wizard.id,
            });
        }
        write_json(&path, wizard)
    }

    fn update(&self, wizard: &Wizard) -> Result<Wizard> {
        let path = self.path_for(wizard.id);
        let stored: Wizard = read_json(&path)?.ok_or(StoreError::NotFound {
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
        write_json(&path, &next)?;
        Ok(next)
    }

    fn remove(&self, id: Uuid) -> Result<bool> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

/// Runs stored per wizard as `<root>/runs/<wizard-id>.json`.
#[derive(Debug, Clone)]
pub struct FileRunStore {
    dir: PathBuf,
}

impl FileRunStore {
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        Self {
            dir: data_root.as_ref().join("runs"),
        }
    }

    fn path_for(&self, wizard_id: Uuid) -> PathBuf {
        self.dir.join(format!("{wizard_id}.json"))
    }

    fn load(&self, wizard_id: Uuid) -> Result<Vec<WizardRun>> {
        Ok(read_json(&self.path_for(wizard_id))?.unwrap_or_default())
    }

    fn save(&self, wizard_id: Uuid, runs: &[WizardRun]) -> Result<()> {
        write_json(&self.path_for(wizard_id), &runs)
    }
}

impl RunStore for FileRunStore {
    fn insert(&self, run: &WizardRun) -> Result<()> {
        let mut runs = self.load(run.wizard_id)?;
        if runs.iter().any(|r| r.id == run.id) {
            return Err(StoreError::AlreadyExists {
                kind: "run",
                id: run.id,
            });
        }
        runs.push(run.clone());
        self.save(run.wizard_id, &runs)
    }

    fn get(&self, run_id: Uuid) -> Result<Option<WizardRun>> {
        for path in json_files(&self.dir)? {
            let runs: Vec<WizardRun> = read_json(&path)?.unwrap_or_default();
            if let Some(run) = runs.into_iter().find(|r| r.id == run_id) {
                return Ok(Some(run));
            }
        }
        Ok(None)
    }

    fn update(&self, run: &WizardRun) -> Result<()> {
        let mut runs = self.load(run.wizard_id)?;
        let slot = runs
            .iter_mut()
            .find(|r| r.id == run.id)
            .ok_or(StoreError::NotFound {
                kind: "run",
                id: run.id,
            })?;
        *slot = run.clone();
        self.save(run.wizard_id, &runs)
    }

    fn runs_for(&self, wizard_id: Uuid) -> Result<Vec<WizardRun>> {
        let mut runs = self.load(wizard_id)?;
        runs.sort_by_key(|r| r.started_at);
        Ok(runs)
    }

    fn delete_all(&self, wizard_id: Uuid) -> Result<usize> {
        let runs = self.load(wizard_id)?;
        if runs.is_empty() {
            return Ok(0);
        }
        let path = self.path_for(wizard_id);
        std::fs::remove_file(&path).map_err(|e| StoreError::io(path, e))?;
        Ok(runs.len())
    }
}
