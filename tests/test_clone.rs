//! Structural cloning: fresh identities, same shape, remapped edges.

mod common;

use common::{CONFIRMED, option_id, seeded_service, step_id, store_one_run};
use std::collections::HashSet;
use uuid::Uuid;
use wizctl::LifecycleState;
use wizctl::fingerprint::structural_fingerprint;
use wizctl::model::{DependencyType, StructureCounts, Wizard};

fn all_ids(wizard: &Wizard) -> HashSet<Uuid> {
    std::iter::once(wizard.id)
        .chain(wizard.steps.iter().map(|s| s.id))
        .chain(wizard.iter_option_sets().map(|(_, set)| set.id))
        .chain(wizard.iter_options().map(|(_, _, o)| o.id))
        .chain(wizard.iter_dependencies().map(|d| d.id))
        .chain(wizard.flow_rules.iter().map(|r| r.id))
        .collect()
}

#[test]
fn test_clone_copies_full_structure() {
    let (service, source) = seeded_service();
    let copy = service
        .clone_wizard(source.id, "Onboarding (copy)", "bo", None)
        .unwrap();

    assert_eq!(
        copy.counts(),
        StructureCounts {
            steps: 3,
            option_sets: 6,
            options: 18,
            dependencies: 2,
            flow_rules: 1,
        }
    );
    assert_eq!(copy.counts(), source.counts());
    assert_eq!(
        structural_fingerprint(&copy).unwrap(),
        structural_fingerprint(&source).unwrap()
    );
}

#[test]
fn test_clone_shares_no_ids_with_source() {
    let (service, source) = seeded_service();
    let copy = service.clone_wizard(source.id, "Copy", "bo", None).unwrap();

    let source_ids = all_ids(&source);
    let copy_ids = all_ids(&copy);
    assert!(source_ids.is_disjoint(&copy_ids));
}

#[test]
fn test_clone_remaps_dependency_endpoints_inside_copy() {
    let (service, source) = seeded_service();
    let copy = service.clone_wizard(source.id, "Copy", "bo", None).unwrap();

    for dep in copy.iter_dependencies() {
        assert!(copy.option(dep.option_id).is_some());
        assert!(copy.option(dep.depends_on_option_id).is_some());
    }

    // The require_if edge crosses steps: 2nd step's first option -> 1st step's 2nd set
    let (step, set, option) = copy
        .iter_options()
        .find(|(_, _, o)| {
            o.dependencies
                .iter()
                .any(|d| d.dependency_type == DependencyType::RequireIf)
        })
        .unwrap();
    assert_eq!(step.name, "Step 2");
    assert_eq!(set.name, "Question 1.0");
    assert_eq!(option.label, "Choice 1.0.0");
    let target = copy.option(option.dependencies[0].depends_on_option_id).unwrap();
    assert_eq!(target.label, "Choice 0.1.0");
}

#[test]
fn test_clone_remaps_flow_rule_steps() {
    let (service, source) = seeded_service();
    let copy = service.clone_wizard(source.id, "Copy", "bo", None).unwrap();

    let rule = &copy.flow_rules[0];
    assert_ne!(rule.from_step_id, step_id(0));
    assert_eq!(copy.step(rule.from_step_id).unwrap().name, "Step 1");
    assert_eq!(copy.step(rule.to_step_id).unwrap().name, "Step 2");
    assert_eq!(rule.priority, 10);
}

#[test]
fn test_clone_starts_as_unlinked_draft() {
    let (service, source) = seeded_service();
    service.set_published(source.id, true, CONFIRMED).unwrap();
    store_one_run(&service, source.id);

    let copy = service
        .clone_wizard(source.id, "Fresh start", "bo", Some("Reworked"))
        .unwrap();
    assert_eq!(copy.name, "Fresh start");
    assert_eq!(copy.description.as_deref(), Some("Reworked"));
    assert_eq!(copy.created_by, "bo");
    assert_eq!(copy.lifecycle_state, LifecycleState::Draft);
    assert!(!copy.is_published);
    assert!(copy.published_at.is_none());
    assert_eq!(copy.version_number, 1);
    assert!(copy.parent_wizard_id.is_none());
    assert_eq!(copy.settings, source.settings);

    // The copy is editable even though the source is read-only
    assert!(service.can_modify_wizard(copy.id).unwrap().is_allowed());
    assert!(!service.can_modify_wizard(source.id).unwrap().is_allowed());
}

#[test]
fn test_clone_keeps_source_description_by_default() {
    let (service, source) = seeded_service();
    let copy = service.clone_wizard(source.id, "Copy", "bo", None).unwrap();
    assert_eq!(copy.description, source.description);
}

#[test]
fn test_editing_clone_leaves_source_untouched() {
    let (service, source) = seeded_service();
    let copy = service.clone_wizard(source.id, "Copy", "bo", None).unwrap();

    let dep = copy.iter_dependencies().next().unwrap().id;
    service.delete_dependency(dep, CONFIRMED).unwrap();

    let source_now = service.get_wizard(source.id).unwrap();
    assert_eq!(source_now.counts().dependencies, 2);
    assert_eq!(service.get_wizard(copy.id).unwrap().counts().dependencies, 1);
    assert!(source_now.option(option_id(0, 0, 0)).is_some());
}

#[test]
fn test_clone_of_missing_wizard_fails_cleanly() {
    let (service, _) = seeded_service();
    let before = service.list_wizards().unwrap().len();
    assert!(service
        .clone_wizard(Uuid::new_v4(), "Ghost", "bo", None)
        .is_err());
    assert_eq!(service.list_wizards().unwrap().len(), before);
}
