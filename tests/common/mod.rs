//! Shared fixtures for library and CLI tests.

#![allow(dead_code)] // Functions used across different test binaries

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use uuid::Uuid;
use wizctl::WizardService;
use wizctl::guard::Confirmation;
use wizctl::model::Wizard;

pub const STEPS: usize = 3;
pub const SETS_PER_STEP: usize = 2;
pub const OPTIONS_PER_SET: usize = 3;

/// Deterministic id so fixtures can refer to entities before they exist
pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0000 | n)
}

pub fn step_id(step: usize) -> Uuid {
    id(0x100 + step as u128)
}

pub fn set_id(step: usize, set: usize) -> Uuid {
    id(0x200 + (step * 10 + set) as u128)
}

pub fn option_id(step: usize, set: usize, option: usize) -> Uuid {
    id(0x1000 + (step * 100 + set * 10 + option) as u128)
}

pub const RULE_ID: u128 = 0x501;

/// "Onboarding": 3 steps x 2 option sets x 3 options, two dependencies
/// and one unconditional flow rule from the first to the second step.
pub fn definition(name: &str) -> Value {
    let steps: Vec<Value> = (0..STEPS)
        .map(|s| {
            let sets: Vec<Value> = (0..SETS_PER_STEP)
                .map(|o| {
                    let options: Vec<Value> = (0..OPTIONS_PER_SET)
                        .map(|k| {
                            let mut option = json!({
                                "id": option_id(s, o, k),
                                "label": format!("Choice {s}.{o}.{k}"),
                                "value": format!("c{s}{o}{k}"),
                                "display_order": k,
                            });
                            if let Some(dep) = fixture_dependency(s, o, k) {
                                option["dependencies"] = json!([dep]);
                            }
                            option
                        })
                        .collect();
                    json!({
                        "id": set_id(s, o),
                        "name": format!("Question {s}.{o}"),
                        "selection_type": if o == 0 { "single_select" } else { "multiple_select" },
                        "display_order": o,
                        "options": options,
                    })
                })
                .collect();
            json!({
                "id": step_id(s),
                "name": format!("Step {}", s + 1),
                "step_order": s + 1,
                "option_sets": sets,
            })
        })
        .collect();

    json!({
        "name": name,
        "description": "Collects account preferences",
        "tags": ["onboarding"],
        "steps": steps,
        "flow_rules": [{
            "id": id(RULE_ID),
            "from_step_id": step_id(0),
            "to_step_id": step_id(1),
            "condition": {},
            "priority": 10,
        }],
    })
}

fn fixture_dependency(step: usize, set: usize, option: usize) -> Option<Value> {
    match (step, set, option) {
        (0, 0, 0) => Some(json!({
            "id": id(0x401),
            "option_id": option_id(0, 0, 0),
            "depends_on_option_id": option_id(0, 0, 1),
            "dependency_type": "show_if",
        })),
        (1, 0, 0) => Some(json!({
            "id": id(0x402),
            "option_id": option_id(1, 0, 0),
            "depends_on_option_id": option_id(0, 1, 0),
            "dependency_type": "require_if",
        })),
        _ => None,
    }
}

/// A service over in-memory stores holding the fixture wizard
pub fn seeded_service() -> (WizardService, Wizard) {
    let service = WizardService::in_memory();
    let wizard = service
        .create_wizard(&definition("Onboarding"), "ana")
        .expect("fixture definition is valid");
    (service, wizard)
}

/// Put the wizard into `in_use` with one in-progress run
pub fn start_one_run(service: &WizardService, wizard_id: Uuid) -> Uuid {
    service
        .start_run(wizard_id, Some("trial".to_string()))
        .expect("start run")
        .id
}

/// Put the wizard into `published` with one stored run
pub fn store_one_run(service: &WizardService, wizard_id: Uuid) -> Uuid {
    let run = start_one_run(service, wizard_id);
    service.complete_run(run, true).expect("complete run");
    run
}

pub const CONFIRMED: Confirmation = Confirmation::Confirmed;
pub const UNCONFIRMED: Confirmation = Confirmation::Unconfirmed;

// =============================================================================
// CLI helpers
// =============================================================================

/// Normalize output for stable snapshots:
/// - Replace temp directory paths with `<TEMPDIR>`
/// - Replace UUIDs and their 8-character short forms with `<ID>`
pub fn normalize_output(output: &str, dir: &Path) -> String {
    let dir_str = dir.display().to_string();
    let normalized = output.replace(&dir_str, "<TEMPDIR>");

    let uuid = regex::Regex::new(
        r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .unwrap();
    let normalized = uuid.replace_all(&normalized, "<ID>").to_string();

    let short = regex::Regex::new(r"\b[0-9a-f]{8}\b").unwrap();
    short.replace_all(&normalized, "<ID>").to_string()
}

fn run_one(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_wizctl"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("WIZCTL_LOG")
        .output()
        .expect("failed to run wizctl")
}

/// Run wizctl commands in a directory and capture output.
pub fn run_commands(dir: &Path, commands: &[&[&str]]) -> String {
    let mut output = String::new();

    for args in commands {
        output.push_str(&format!("$ wizctl {}\n", args.join(" ")));

        let result = run_one(dir, args);
        let stdout = String::from_utf8_lossy(&result.stdout);
        let stderr = String::from_utf8_lossy(&result.stderr);

        if !stdout.is_empty() {
            output.push_str(&stdout);
            if !stdout.ends_with('\n') {
                output.push('\n');
            }
        }
        if !stderr.is_empty() {
            output.push_str(&stderr);
            if !stderr.ends_with('\n') {
                output.push('\n');
            }
        }

        output.push_str(&format!("exit: {}\n\n", result.status.code().unwrap_or(-1)));
    }

    output
}

/// Run one command and return its trimmed stdout (ids printed by create commands)
pub fn stdout_of(dir: &Path, args: &[&str]) -> String {
    let result = run_one(dir, args);
    assert!(
        result.status.success(),
        "wizctl {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&result.stderr)
    );
    String::from_utf8_lossy(&result.stdout).trim().to_string()
}

/// Initialize a wizctl project in a temp directory
pub fn init_project() -> TempDir {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let result = run_one(temp_dir.path(), &["init"]);
    assert!(result.status.success(), "wizctl init failed");
    temp_dir
}

/// Write the fixture definition next to the project and return its path
pub fn write_definition(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(format!("{}.json", name.to_lowercase()));
    let text = serde_json::to_string_pretty(&definition(name)).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}
