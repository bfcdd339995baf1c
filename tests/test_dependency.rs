//! Option dependency graph: same-wizard edges, no self-loops, no cycles.

mod common;

use common::{CONFIRMED, UNCONFIRMED, option_id, seeded_service, start_one_run, store_one_run};
use wizctl::WizardError;
use wizctl::model::DependencyType;

#[test]
fn test_add_and_list_dependency() {
    let (service, _) = seeded_service();
    let dep = service
        .create_dependency(
            option_id(2, 1, 2),
            option_id(2, 0, 0),
            DependencyType::HideIf,
            UNCONFIRMED,
        )
        .unwrap();

    let listed = service.dependencies_of(option_id(2, 1, 2)).unwrap();
    assert_eq!(listed, vec![dep.clone()]);
    assert_eq!(listed[0].depends_on_option_id, option_id(2, 0, 0));
    assert!(service.dependencies_of(option_id(2, 0, 0)).unwrap().is_empty());
}

#[test]
fn test_self_dependency_is_rejected() {
    let (service, _) = seeded_service();
    let err = service
        .create_dependency(
            option_id(1, 1, 1),
            option_id(1, 1, 1),
            DependencyType::ShowIf,
            UNCONFIRMED,
        )
        .unwrap_err();
    assert!(matches!(err, WizardError::SelfDependency(_)));
}

#[test]
fn test_closing_a_cycle_is_rejected_and_reports_path() {
    let (service, wizard) = seeded_service();
    // Fixture already has 0.0.0 -> 0.0.1; add 0.0.1 -> 0.0.2, then try 0.0.2 -> 0.0.0
    service
        .create_dependency(
            option_id(0, 0, 1),
            option_id(0, 0, 2),
            DependencyType::ShowIf,
            UNCONFIRMED,
        )
        .unwrap();

    let err = service
        .create_dependency(
            option_id(0, 0, 2),
            option_id(0, 0, 0),
            DependencyType::DisableIf,
            UNCONFIRMED,
        )
        .unwrap_err();
    let expected = vec![
        option_id(0, 0, 2),
        option_id(0, 0, 0),
        option_id(0, 0, 1),
        option_id(0, 0, 2),
    ];
    assert!(
        matches!(&err, WizardError::DependencyCycle { path } if *path == expected),
        "unexpected error: {err:?}"
    );
    // Nothing was written
    assert_eq!(service.get_wizard(wizard.id).unwrap().counts().dependencies, 3);
}

#[test]
fn test_cross_wizard_dependency_is_rejected() {
    let (service, source) = seeded_service();
    let copy = service.clone_wizard(source.id, "Copy", "bo", None).unwrap();
    let foreign = copy.iter_options().next().unwrap().2.id;

    let err = service
        .create_dependency(
            option_id(2, 0, 0),
            foreign,
            DependencyType::ShowIf,
            UNCONFIRMED,
        )
        .unwrap_err();
    assert!(matches!(err, WizardError::CrossWizardDependency { .. }));
}

#[test]
fn test_duplicate_edge_is_rejected_but_other_type_is_allowed() {
    let (service, _) = seeded_service();
    let err = service
        .create_dependency(
            option_id(0, 0, 0),
            option_id(0, 0, 1),
            DependencyType::ShowIf,
            UNCONFIRMED,
        )
        .unwrap_err();
    assert!(matches!(err, WizardError::DuplicateDependency { .. }));

    service
        .create_dependency(
            option_id(0, 0, 0),
            option_id(0, 0, 1),
            DependencyType::RequireIf,
            UNCONFIRMED,
        )
        .expect("same pair with a different type is a separate rule");
}

#[test]
fn test_unknown_option_is_not_found() {
    let (service, _) = seeded_service();
    let err = service
        .create_dependency(
            uuid::Uuid::new_v4(),
            option_id(0, 0, 0),
            DependencyType::ShowIf,
            UNCONFIRMED,
        )
        .unwrap_err();
    assert!(matches!(err, WizardError::NotFound { .. }));
}

#[test]
fn test_dependency_edits_respect_protection() {
    let (service, wizard) = seeded_service();
    start_one_run(&service, wizard.id);

    let add = |confirm| {
        service.create_dependency(
            option_id(2, 1, 0),
            option_id(2, 1, 1),
            DependencyType::ShowIf,
            confirm,
        )
    };
    assert!(matches!(
        add(UNCONFIRMED).unwrap_err(),
        WizardError::ConfirmationRequired { .. }
    ));
    let dep = add(CONFIRMED).unwrap();

    store_one_run(&service, wizard.id);
    let err = service.delete_dependency(dep.id, CONFIRMED).unwrap_err();
    assert!(matches!(err, WizardError::Blocked(_)));
}

#[test]
fn test_remove_dependency() {
    let (service, wizard) = seeded_service();
    let dep = service.dependencies_of(option_id(0, 0, 0)).unwrap()[0].clone();

    let removed = service.delete_dependency(dep.id, UNCONFIRMED).unwrap();
    assert_eq!(removed.id, dep.id);
    assert!(service.dependencies_of(option_id(0, 0, 0)).unwrap().is_empty());
    assert_eq!(service.get_wizard(wizard.id).unwrap().counts().dependencies, 1);

    let err = service.delete_dependency(dep.id, UNCONFIRMED).unwrap_err();
    assert!(matches!(err, WizardError::NotFound { .. }));
}
