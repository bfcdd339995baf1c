//! Lifecycle classification and the modify/delete guard.

mod common;

use common::{CONFIRMED, UNCONFIRMED, seeded_service, start_one_run, store_one_run};
use wizctl::lifecycle::Action;
use wizctl::{LifecycleState, Permission, WizardError};

#[test]
fn test_draft_wizard_is_fully_editable() {
    let (service, wizard) = seeded_service();

    let status = service.get_protection_status(wizard.id).unwrap();
    assert_eq!(status.state, LifecycleState::Draft);
    assert!(status.can_edit && status.can_delete);
    assert_eq!(status.total_runs, 0);
    assert_eq!(
        status.actions,
        vec![Action::Edit, Action::Delete, Action::Publish, Action::Test]
    );

    assert_eq!(service.can_modify_wizard(wizard.id).unwrap(), Permission::Allowed);
    assert_eq!(service.can_delete_wizard(wizard.id).unwrap(), Permission::Allowed);
    service
        .set_field(wizard.id, "name", "Renamed", UNCONFIRMED)
        .expect("drafts need no confirmation");
}

#[test]
fn test_in_use_wizard_needs_confirmation() {
    let (service, wizard) = seeded_service();
    start_one_run(&service, wizard.id);

    let status = service.get_protection_status(wizard.id).unwrap();
    assert_eq!(status.state, LifecycleState::InUse);
    assert_eq!(status.in_progress_runs, 1);
    assert!(status.actions.contains(&Action::EditWithWarning));

    let permission = service.can_modify_wizard(wizard.id).unwrap();
    assert_eq!(
        permission,
        Permission::AllowedWithWarning(
            "Warning: Wizard has 1 active runs that will be affected".to_string()
        )
    );

    let err = service
        .set_field(wizard.id, "name", "Renamed", UNCONFIRMED)
        .unwrap_err();
    assert!(matches!(err, WizardError::ConfirmationRequired { .. }));
    assert_eq!(service.get_wizard(wizard.id).unwrap().name, "Onboarding");

    let updated = service
        .set_field(wizard.id, "name", "Renamed", CONFIRMED)
        .unwrap();
    assert_eq!(updated.name, "Renamed");
}

#[test]
fn test_stored_run_makes_wizard_read_only() {
    let (service, wizard) = seeded_service();
    store_one_run(&service, wizard.id);

    let status = service.get_protection_status(wizard.id).unwrap();
    assert_eq!(status.state, LifecycleState::Published);
    assert!(!status.can_edit && !status.can_delete);
    assert!(status.actions.contains(&Action::CreateVersion));

    assert_eq!(
        service.can_modify_wizard(wizard.id).unwrap(),
        Permission::Blocked("Wizard has 1 stored runs and is read-only".to_string())
    );
    assert_eq!(
        service.can_delete_wizard(wizard.id).unwrap(),
        Permission::Blocked("Cannot delete wizard with 1 stored runs. Archive instead.".to_string())
    );

    // Confirmation does not unlock a published wizard
    let err = service
        .set_field(wizard.id, "name", "Renamed", CONFIRMED)
        .unwrap_err();
    assert!(matches!(err, WizardError::Blocked(_)));
    let err = service.delete_wizard(wizard.id, CONFIRMED).unwrap_err();
    assert!(matches!(err, WizardError::Blocked(_)));
}

#[test]
fn test_stored_runs_take_precedence_over_in_progress() {
    let (service, wizard) = seeded_service();
    start_one_run(&service, wizard.id);
    start_one_run(&service, wizard.id);
    store_one_run(&service, wizard.id);

    let status = service.get_protection_status(wizard.id).unwrap();
    assert_eq!(status.state, LifecycleState::Published);
    assert_eq!(status.total_runs, 3);
    assert_eq!(status.stored_runs, 1);
    assert_eq!(status.in_progress_runs, 2);
}

#[test]
fn test_cached_state_follows_runs() {
    let (service, wizard) = seeded_service();
    assert_eq!(
        service.get_wizard(wizard.id).unwrap().lifecycle_state,
        LifecycleState::Draft
    );

    let run = start_one_run(&service, wizard.id);
    let cached = service.get_wizard(wizard.id).unwrap();
    assert_eq!(cached.lifecycle_state, LifecycleState::InUse);
    assert!(cached.first_run_at.is_some());
    assert!(cached.first_stored_run_at.is_none());

    service.complete_run(run, true).unwrap();
    let cached = service.get_wizard(wizard.id).unwrap();
    assert_eq!(cached.lifecycle_state, LifecycleState::Published);
    assert!(cached.first_stored_run_at.is_some());
}

#[test]
fn test_archived_wizard_is_blocked() {
    let (service, wizard) = seeded_service();
    service.set_published(wizard.id, true, UNCONFIRMED).unwrap();
    assert!(service.archive_wizard(wizard.id).unwrap());

    let archived = service.get_wizard(wizard.id).unwrap();
    assert!(archived.is_archived);
    assert!(archived.archived_at.is_some());
    assert!(!archived.is_published && !archived.is_active);
    assert!(archived.published_at.is_none());
    assert!(!service.can_modify_wizard(wizard.id).unwrap().is_allowed());
    assert!(!service.can_delete_wizard(wizard.id).unwrap().is_allowed());

    assert!(service.unarchive_wizard(wizard.id).unwrap());
    let restored = service.get_wizard(wizard.id).unwrap();
    assert!(!restored.is_archived);
    assert!(restored.archived_at.is_none());
    assert!(restored.is_active);
    assert!(!restored.is_published);
    assert!(service.can_modify_wizard(wizard.id).unwrap().is_allowed());
}

#[test]
fn test_archive_missing_wizard_reports_false() {
    let (service, _) = seeded_service();
    let missing = uuid::Uuid::new_v4();
    assert!(!service.archive_wizard(missing).unwrap());
    assert!(!service.unarchive_wizard(missing).unwrap());
    assert!(!service.can_modify_wizard(missing).unwrap().is_allowed());
}

#[test]
fn test_purge_runs_returns_wizard_to_draft() {
    let (service, wizard) = seeded_service();
    start_one_run(&service, wizard.id);
    start_one_run(&service, wizard.id);

    let err = service
        .delete_all_runs_for_wizard(wizard.id, UNCONFIRMED)
        .unwrap_err();
    assert!(matches!(err, WizardError::ConfirmationRequired { .. }));

    let removed = service
        .delete_all_runs_for_wizard(wizard.id, CONFIRMED)
        .unwrap();
    assert_eq!(removed, 2);

    let reset = service.get_wizard(wizard.id).unwrap();
    assert_eq!(reset.lifecycle_state, LifecycleState::Draft);
    assert!(reset.first_run_at.is_none());
    assert_eq!(
        service.get_protection_status(wizard.id).unwrap().state,
        LifecycleState::Draft
    );
}

#[test]
fn test_purge_runs_refuses_published_wizard() {
    let (service, wizard) = seeded_service();
    store_one_run(&service, wizard.id);

    let err = service
        .delete_all_runs_for_wizard(wizard.id, CONFIRMED)
        .unwrap_err();
    assert!(matches!(err, WizardError::Blocked(_)));
    assert_eq!(service.get_protection_status(wizard.id).unwrap().total_runs, 1);
}

#[test]
fn test_soft_delete_keeps_the_record() {
    let (service, wizard) = seeded_service();
    let deleted = service.delete_wizard(wizard.id, UNCONFIRMED).unwrap();
    assert!(!deleted.is_active);
    assert!(!deleted.is_published);
    assert!(service.get_wizard(wizard.id).is_ok());
}

#[test]
fn test_runs_cannot_finish_twice() {
    let (service, wizard) = seeded_service();
    let run = start_one_run(&service, wizard.id);
    service.abandon_run(run).unwrap();

    let err = service.complete_run(run, true).unwrap_err();
    assert!(matches!(err, WizardError::RunNotInProgress { .. }));
}
