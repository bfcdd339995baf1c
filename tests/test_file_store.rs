//! The JSON file backend used by the CLI.

mod common;

use common::{CONFIRMED, definition};
use tempfile::TempDir;
use wizctl::store::{FileRunStore, FileWizardStore, RunFilter, StoreError, WizardStore};
use wizctl::{LifecycleState, WizardError, WizardService};

fn file_service(dir: &TempDir) -> WizardService {
    WizardService::new(
        FileWizardStore::new(dir.path()),
        FileRunStore::new(dir.path()),
    )
}

#[test]
fn test_wizard_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let created = file_service(&dir)
        .create_wizard(&definition("Onboarding"), "ana")
        .unwrap();

    let path = dir.path().join(format!("wizards/{}.json", created.id));
    assert!(path.exists());

    let reopened = file_service(&dir).get_wizard(created.id).unwrap();
    assert_eq!(reopened, created);
    assert_eq!(reopened.counts(), created.counts());
}

#[test]
fn test_runs_and_state_survive_reopening() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir);
    let wizard = service.create_wizard(&definition("Onboarding"), "ana").unwrap();
    let run = service.start_run(wizard.id, None).unwrap();
    service.complete_run(run.id, true).unwrap();
    drop(service);

    let service = file_service(&dir);
    assert_eq!(
        service.get_wizard(wizard.id).unwrap().lifecycle_state,
        LifecycleState::Published
    );
    let stored = service.runs_of(wizard.id, RunFilter::Stored).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, run.id);
}

#[test]
fn test_stale_revision_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir);
    let wizard = service.create_wizard(&definition("Onboarding"), "ana").unwrap();

    // Someone else saves first
    let stale = service.get_wizard(wizard.id).unwrap();
    service
        .set_field(wizard.id, "description", "newer", CONFIRMED)
        .unwrap();

    let store = FileWizardStore::new(dir.path());
    let err = store.update(&stale).unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    assert_eq!(
        service.get_wizard(wizard.id).unwrap().description.as_deref(),
        Some("newer")
    );
}

#[test]
fn test_update_bumps_revision() {
    let dir = TempDir::new().unwrap();
    let store = FileWizardStore::new(dir.path());
    let service = file_service(&dir);
    let wizard = service.create_wizard(&definition("Onboarding"), "ana").unwrap();

    let saved = store.update(&wizard).unwrap();
    assert_eq!(saved.revision, wizard.revision + 1);
    assert_eq!(store.get(wizard.id).unwrap().unwrap().revision, saved.revision);
}

#[test]
fn test_corrupt_file_is_reported_with_path() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir);
    let wizard = service.create_wizard(&definition("Onboarding"), "ana").unwrap();
    let path = dir.path().join(format!("wizards/{}.json", wizard.id));
    std::fs::write(&path, "{ not json").unwrap();

    let err = service.get_wizard(wizard.id).unwrap_err();
    let WizardError::Store(StoreError::Json { path: reported, .. }) = &err else {
        unreachable!("expected a JSON store error, got {err:?}");
    };
    assert_eq!(reported, &path);
}

#[test]
fn test_clone_is_written_as_its_own_file() {
    let dir = TempDir::new().unwrap();
    let service = file_service(&dir);
    let wizard = service.create_wizard(&definition("Onboarding"), "ana").unwrap();
    let copy = service.clone_wizard(wizard.id, "Copy", "bo", None).unwrap();

    let files = std::fs::read_dir(dir.path().join("wizards"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
        .count();
    assert_eq!(files, 2);
    assert_eq!(
        file_service(&dir).get_wizard(copy.id).unwrap().counts(),
        wizard.counts()
    );
}
