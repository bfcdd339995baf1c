//! End-to-end CLI tests against a fresh project directory.

mod common;

use common::{
    init_project, normalize_output, option_id, run_commands, stdout_of, write_definition,
};
use std::fs;
use tempfile::TempDir;

/// A project holding the fixture wizard; returns the wizard id
fn project_with_wizard() -> (TempDir, String) {
    let dir = init_project();
    let definition = write_definition(dir.path(), "Onboarding");
    let id = stdout_of(
        dir.path(),
        &["wizard", "new", definition.to_str().unwrap()],
    );
    (dir, id)
}

#[test]
fn test_init_creates_store_layout() {
    let dir = TempDir::new().unwrap();
    let output = run_commands(dir.path(), &[&["init"]]);
    assert!(output.contains("Initialized wizctl project"), "{output}");
    assert!(output.contains("exit: 0"));

    assert!(dir.path().join("wiz/config.toml").exists());
    assert!(dir.path().join("wiz/wizards").is_dir());
    assert!(dir.path().join("wiz/runs").is_dir());
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let dir = init_project();
    let output = run_commands(dir.path(), &[&["init"], &["init", "-f"]]);
    let normalized = normalize_output(&output, dir.path());
    insta::assert_snapshot!(normalized, @r"
    $ wizctl init
    Error: <TEMPDIR>/wiz/config.toml already exists (use -f to overwrite)
    exit: 1

    $ wizctl init -f
    Created: <TEMPDIR>/wiz
    Created: <TEMPDIR>/wiz/wizards
    Created: <TEMPDIR>/wiz/runs
    Created: <TEMPDIR>/wiz/config.toml
    ✓ Initialized wizctl project
    exit: 0
    ");
}

#[test]
fn test_init_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = run_commands(dir.path(), &[&["init", "--dry-run"]]);
    assert!(output.contains("Would write:"), "{output}");
    assert!(!dir.path().join("wiz").exists());
}

#[test]
fn test_draft_protection_report() {
    let (dir, id) = project_with_wizard();
    let output = run_commands(
        dir.path(),
        &[
            &["wizard", "protection", &id],
            &["wizard", "can-modify", &id],
        ],
    );
    insta::assert_snapshot!(normalize_output(&output, dir.path()), @r"
    $ wizctl wizard protection <ID>
    State:       draft
    Can edit:    true
    Can delete:  true
    Runs:        0 total, 0 in progress, 0 completed, 0 stored
    Actions:     edit, delete, publish, test
    This wizard has never been run. All modifications and deletions are allowed.
    exit: 0

    $ wizctl wizard can-modify <ID>
    allowed
    exit: 0
    ");
}

#[test]
fn test_in_use_edit_needs_force() {
    let (dir, id) = project_with_wizard();
    stdout_of(dir.path(), &["run", "start", &id]);

    let output = run_commands(
        dir.path(),
        &[
            &["wizard", "can-modify", &id],
            &["wizard", "set", &id, "name", "Renamed"],
        ],
    );
    let normalized = normalize_output(&output, dir.path());
    assert!(normalized.contains("allowed_with_warning: Warning: Wizard has 1 active runs"));
    assert!(normalized.contains("error[E0103]"), "{normalized}");
    assert!(normalized.ends_with("exit: 1\n\n"));

    let output = run_commands(dir.path(), &[&["wizard", "set", &id, "name", "Renamed", "-f"]]);
    assert!(output.contains("exit: 0"), "{output}");
    let shown = stdout_of(dir.path(), &["wizard", "show", &id]);
    assert!(shown.starts_with("Renamed ("));
}

#[test]
fn test_stored_run_blocks_edits_and_versioning_unblocks() {
    let (dir, id) = project_with_wizard();
    let run = stdout_of(dir.path(), &["run", "start", &id]);
    stdout_of(dir.path(), &["run", "complete", &run, "--store"]);

    let output = run_commands(dir.path(), &[&["wizard", "delete", &id, "-f"]]);
    assert!(output.contains("error[E0102]"), "{output}");
    assert!(output.contains("Archive instead"));

    let v2 = stdout_of(dir.path(), &["wizard", "version", &id]);
    let output = run_commands(dir.path(), &[&["wizard", "can-modify", &v2]]);
    assert!(output.contains("allowed\n"), "{output}");

    let lineage = stdout_of(dir.path(), &["-o", "json", "wizard", "lineage", &v2]);
    let rows: serde_json::Value = serde_json::from_str(&lineage).unwrap();
    let versions: Vec<u64> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["version"].as_u64().unwrap())
        .collect();
    assert_eq!(versions, vec![1, 2]);
}

#[test]
fn test_clone_via_short_id_prefix() {
    let (dir, id) = project_with_wizard();
    let prefix = &id[..8];
    let copy = stdout_of(dir.path(), &["wizard", "clone", prefix, "Copy", "--creator", "bo"]);
    assert_ne!(copy, id);

    let shown = stdout_of(dir.path(), &["-o", "json", "wizard", "show", &copy]);
    let wizard: serde_json::Value = serde_json::from_str(&shown).unwrap();
    assert_eq!(wizard["name"], "Copy");
    assert_eq!(wizard["created_by"], "bo");
    assert_eq!(wizard["steps"].as_array().unwrap().len(), 3);
}

#[test]
fn test_dependency_cycle_is_reported() {
    let (dir, _) = project_with_wizard();
    let a = option_id(0, 0, 0).to_string();
    let b = option_id(0, 0, 1).to_string();

    // Fixture already has a -> b
    let output = run_commands(dir.path(), &[&["dep", "add", &b, &a]]);
    assert!(output.contains("error[E0306]"), "{output}");
    assert!(output.contains("exit: 1"));

    let output = run_commands(dir.path(), &[&["-o", "plain", "dep", "list", &a]]);
    assert!(output.contains("show_if"), "{output}");
}

#[test]
fn test_flow_rule_round_trip() {
    let (dir, id) = project_with_wizard();
    let from = common::step_id(1).to_string();
    let to = common::step_id(2).to_string();

    let rule = stdout_of(
        dir.path(),
        &["flow", "add", &id, &from, &to, "--priority", "7"],
    );
    let output = run_commands(dir.path(), &[&["-o", "plain", "flow", "list", &id]]);
    assert!(output.contains(&rule[..8]), "{output}");

    let output = run_commands(dir.path(), &[&["flow", "add", &id, &from, &from]]);
    assert!(output.contains("error[E0403]"), "{output}");

    stdout_of(dir.path(), &["flow", "remove", &rule]);
}

#[test]
fn test_unknown_id_prefix() {
    let (dir, _) = project_with_wizard();
    let output = run_commands(dir.path(), &[&["wizard", "show", "ffffffff"], &["wizard", "show", "ab"]]);
    assert!(output.contains("error[E0101]"), "{output}");
    assert!(output.contains("error[E0808]"), "{output}");
}

#[test]
fn test_check_and_status() {
    let (dir, id) = project_with_wizard();
    stdout_of(dir.path(), &["run", "start", &id]);

    let output = run_commands(dir.path(), &[&["check"]]);
    assert!(output.contains("Checked:"), "{output}");
    assert!(output.contains("exit: 0"));

    let status = stdout_of(dir.path(), &["status"]);
    assert!(status.contains("in_use"), "{status}");
    assert!(status.contains("in_progress : 1"), "{status}");
}

#[test]
fn test_check_flags_broken_files() {
    let (dir, id) = project_with_wizard();
    let path = dir.path().join(format!("wiz/wizards/{id}.json"));
    let mut wizard: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    wizard["flow_rules"][0]["to_step_id"] = wizard["flow_rules"][0]["from_step_id"].clone();
    fs::write(&path, serde_json::to_string(&wizard).unwrap()).unwrap();

    let output = run_commands(dir.path(), &[&["check"]]);
    assert!(output.contains("error[E0403]"), "{output}");
    assert!(output.contains("exit: 1"));
}
