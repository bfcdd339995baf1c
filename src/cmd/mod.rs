//! Command implementations.
//!
//! Commands return `anyhow::Result<Vec<Diagnostic>>`: `Err` for failures of
//! the tool itself (config, lock), diagnostics for problems with the data or
//! the request.

pub mod check;
pub mod dep;
pub mod flow;
pub mod list;
pub mod new;
pub mod run;
pub mod status;
pub mod wizard;

use crate::config::Config;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::error::{EntityKind, WizardError};
use crate::service::WizardService;
use crate::store::{FileRunStore, FileWizardStore};
use clap::ValueEnum;
use std::fmt::Display;
use uuid::Uuid;

/// Output format for read commands
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Plain,
}

/// Result of one command step: a value, or diagnostics to show the user
pub(crate) type Outcome<T> = std::result::Result<T, Vec<Diagnostic>>;

/// Run a command body and collect whatever diagnostics it ended with
pub(crate) fn report(body: impl FnOnce() -> Outcome<()>) -> Vec<Diagnostic> {
    body().err().unwrap_or_default()
}

pub(crate) trait OrDiagnostic<T> {
    fn or_diagnostic(self, subject: impl Display) -> Outcome<T>;
}

impl<T> OrDiagnostic<T> for crate::error::Result<T> {
    fn or_diagnostic(self, subject: impl Display) -> Outcome<T> {
        self.map_err(|e| vec![e.to_diagnostic(subject.to_string())])
    }
}

impl<T> OrDiagnostic<T> for std::io::Result<T> {
    fn or_diagnostic(self, subject: impl Display) -> Outcome<T> {
        self.map_err(|e| {
            vec![Diagnostic::new(
                DiagnosticCode::E0901IoError,
                e.to_string(),
                subject.to_string(),
            )]
        })
    }
}

impl<T> OrDiagnostic<T> for serde_json::Result<T> {
    fn or_diagnostic(self, subject: impl Display) -> Outcome<T> {
        self.map_err(|e| {
            vec![Diagnostic::new(
                DiagnosticCode::E0902JsonParseError,
                e.to_string(),
                subject.to_string(),
            )]
        })
    }
}

/// Service over the file-backed stores of the configured data root
pub fn open_service(config: &Config) -> WizardService {
    WizardService::new(
        FileWizardStore::new(config.data_root()),
        FileRunStore::new(config.data_root()),
    )
    .with_family_policy(config.versioning.family)
}

/// Minimum length of an id prefix
const MIN_PREFIX_LEN: usize = 4;

/// Resolve a full UUID or a unique prefix of one among `candidates`.
///
/// A full UUID is returned as-is so the service reports a precise NotFound.
pub(crate) fn resolve_id(
    kind: EntityKind,
    input: &str,
    candidates: impl IntoIterator<Item = Uuid>,
) -> Outcome<Uuid> {
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    let prefix = input.to_ascii_lowercase();
    if prefix.len() < MIN_PREFIX_LEN || !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
    {
        return Err(vec![Diagnostic::new(
            DiagnosticCode::E0808InvalidPrefix,
            format!(
                "Invalid {} id '{input}': use a full UUID or a prefix of at least {MIN_PREFIX_LEN} characters",
                kind.to_string().to_lowercase()
            ),
            input,
        )]);
    }

    let mut matches: Vec<Uuid> = candidates
        .into_iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    matches.sort();
    matches.dedup();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(vec![Diagnostic::new(
            kind.not_found_code(),
            format!("{kind} not found: {input}"),
            input,
        )]),
        many => Err(vec![Diagnostic::new(
            DiagnosticCode::E0807AmbiguousMatch,
            format!(
                "'{input}' matches {} {}s: {}",
                many.len(),
                kind.to_string().to_lowercase(),
                many.iter()
                    .map(Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            input,
        )]),
    }
}

pub(crate) fn resolve_wizard(service: &WizardService, input: &str) -> Outcome<Uuid> {
    let all = service.list_wizards().or_diagnostic(input)?;
    resolve_id(EntityKind::Wizard, input, all.iter().map(|w| w.id))
}

pub(crate) fn resolve_option(service: &WizardService, input: &str) -> Outcome<Uuid> {
    let all = service.list_wizards().or_diagnostic(input)?;
    resolve_id(
        EntityKind::Option,
        input,
        all.iter()
            .flat_map(|w| w.iter_options().map(|(_, _, o)| o.id).collect::<Vec<_>>()),
    )
}

pub(crate) fn resolve_step(service: &WizardService, input: &str) -> Outcome<Uuid> {
    let all = service.list_wizards().or_diagnostic(input)?;
    resolve_id(
        EntityKind::Step,
        input,
        all.iter().flat_map(|w| w.steps.iter().map(|s| s.id)),
    )
}

pub(crate) fn resolve_dependency(service: &WizardService, input: &str) -> Outcome<Uuid> {
    let all = service.list_wizards().or_diagnostic(input)?;
    resolve_id(
        EntityKind::Dependency,
        input,
        all.iter()
            .flat_map(|w| w.iter_dependencies().map(|d| d.id).collect::<Vec<_>>()),
    )
}

pub(crate) fn resolve_flow_rule(service: &WizardService, input: &str) -> Outcome<Uuid> {
    let all = service.list_wizards().or_diagnostic(input)?;
    resolve_id(
        EntityKind::FlowRule,
        input,
        all.iter().flat_map(|w| w.flow_rules.iter().map(|r| r.id)),
    )
}

pub(crate) fn resolve_run(service: &WizardService, input: &str) -> Outcome<Uuid> {
    let mut ids = vec![];
    for wizard in service.list_wizards().or_diagnostic(input)? {
        let runs = service
            .runs()
            .runs_for(wizard.id)
            .map_err(WizardError::from)
            .or_diagnostic(input)?;
        ids.extend(runs.iter().map(|r| r.id));
    }
    resolve_id(EntityKind::Run, input, ids)
}

/// Short form of an id for tables
pub(crate) fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<Uuid> {
        vec![
            Uuid::parse_str("abcd1234-0000-0000-0000-000000000001").expect("uuid"),
            Uuid::parse_str("abcd5678-0000-0000-0000-000000000002").expect("uuid"),
        ]
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let id = resolve_id(EntityKind::Wizard, "ABCD12", ids()).expect("unique");
        assert_eq!(id, ids()[0]);
    }

    #[test]
    fn test_ambiguous_and_short_prefixes() {
        let err = resolve_id(EntityKind::Wizard, "abcd", ids()).expect_err("ambiguous");
        assert_eq!(err[0].code, DiagnosticCode::E0807AmbiguousMatch);

        let err = resolve_id(EntityKind::Wizard, "abc", ids()).expect_err("too short");
        assert_eq!(err[0].code, DiagnosticCode::E0808InvalidPrefix);

        let err = resolve_id(EntityKind::FlowRule, "ffff", ids()).expect_err("missing");
        assert_eq!(err[0].code, DiagnosticCode::E0401FlowRuleNotFound);
    }
}
