//! Status command implementation.

use super::{OrDiagnostic, report};
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::lifecycle::classify;
use crate::model::LifecycleState;
use std::collections::HashMap;

/// Show summary counts across the catalog
pub fn show_status(config: &Config) -> anyhow::Result<Vec<Diagnostic>> {
    let service = super::open_service(config);
    Ok(report(|| {
        let subject = config.data_root().display();
        let wizards = service.list_wizards().or_diagnostic(&subject)?;
        let stats = service.run_stats().or_diagnostic(&subject)?;

        println!("=== Wizards ===\n");

        let mut by_state: HashMap<LifecycleState, usize> = HashMap::new();
        let mut archived = 0;
        let mut stale = 0;
        for wizard in &wizards {
            if wizard.is_archived {
                archived += 1;
                continue;
            }
            let state = classify(&stats.get(&wizard.id).copied().unwrap_or_default());
            if state != wizard.lifecycle_state {
                stale += 1;
            }
            *by_state.entry(state).or_insert(0) += 1;
        }

        println!("  By State:");
        for state in [
            LifecycleState::Draft,
            LifecycleState::InUse,
            LifecycleState::Published,
        ] {
            let count = by_state.get(&state).copied().unwrap_or(0);
            if count > 0 {
                println!("    {:12}: {}", state.as_ref(), count);
            }
        }
        if archived > 0 {
            println!("    {:12}: {}", "archived", archived);
        }
        println!("  ----------");
        println!("  Total:        {}\n", wizards.len());

        println!("=== Runs ===\n");
        let totals = stats.values().fold([0usize; 4], |mut acc, s| {
            acc[0] += s.total;
            acc[1] += s.in_progress;
            acc[2] += s.completed;
            acc[3] += s.stored;
            acc
        });
        println!("    {:12}: {}", "in_progress", totals[1]);
        println!("    {:12}: {}", "completed", totals[2]);
        println!("    {:12}: {}", "stored", totals[3]);
        println!("  ----------");
        println!("  Total:        {}", totals[0]);

        if stale > 0 {
            println!(
                "\n{stale} wizard(s) have a stale lifecycle cache (run `wizctl wizard refresh`)"
            );
        }
        Ok(())
    }))
}
