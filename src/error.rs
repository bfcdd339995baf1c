//! Domain errors raised by the wizard services.

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::model::{LifecycleState, RunStatus};
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Wizard,
    Step,
    OptionSet,
    Option,
    Dependency,
    FlowRule,
    Run,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wizard => "Wizard",
            Self::Step => "Step",
            Self::OptionSet => "Option set",
            Self::Option => "Option",
            Self::Dependency => "Dependency",
            Self::FlowRule => "Flow rule",
            Self::Run => "Run",
        };
        f.write_str(s)
    }
}

impl EntityKind {
    /// Diagnostic code reported when an entity of this kind cannot be found
    pub fn not_found_code(&self) -> DiagnosticCode {
        match self {
            Self::Wizard => DiagnosticCode::E0101WizardNotFound,
            Self::Step => DiagnosticCode::E0201StepNotFound,
            Self::OptionSet => DiagnosticCode::E0202OptionSetNotFound,
            Self::Option => DiagnosticCode::E0301OptionNotFound,
            Self::Dependency => DiagnosticCode::E0302DependencyNotFound,
            Self::FlowRule => DiagnosticCode::E0401FlowRuleNotFound,
            Self::Run => DiagnosticCode::E0601RunNotFound,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WizardError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },

    /// The permission guard refused the operation.
    #[error("{0}")]
    Blocked(String),

    /// The operation affects active runs and was not confirmed.
    #[error("{reason}. Re-run with confirmation to proceed")]
    ConfirmationRequired { reason: String },

    /// The lifecycle state moved between the permission check and the commit.
    #[error("Wizard {id} changed from {expected} to {found} while the operation was running")]
    StateChanged {
        id: Uuid,
        expected: LifecycleState,
        found: LifecycleState,
    },

    #[error("Option {0} cannot depend on itself")]
    SelfDependency(Uuid),

    #[error("Options {option_id} and {depends_on} belong to different wizards")]
    CrossWizardDependency { option_id: Uuid, depends_on: Uuid },

    #[error("Dependency {option_id} -> {depends_on} already exists")]
    DuplicateDependency { option_id: Uuid, depends_on: Uuid },

    #[error("Dependency would create a cycle: {}", format_path(.path))]
    DependencyCycle { path: Vec<Uuid> },

    #[error(
        "Invalid dependency type '{0}' (expected show_if, hide_if, require_if or disable_if)"
    )]
    InvalidDependencyType(String),

    #[error("Step {step_id} does not belong to wizard {wizard_id}")]
    StepNotInWizard { step_id: Uuid, wizard_id: Uuid },

    #[error("Flow rule cannot route step {0} to itself")]
    FlowSelfLoop(Uuid),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid wizard definition: {}", .0.join("; "))]
    InvalidDefinition(Vec<String>),

    #[error("Unknown or read-only field '{0}'")]
    UnknownField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Run {id} is already {status}", status = .status.as_ref())]
    RunNotInProgress { id: Uuid, status: RunStatus },

    /// A structural invariant was violated while building an aggregate.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_path(path: &[Uuid]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, WizardError>;

impl WizardError {
    pub(crate) fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::NotFound { kind, .. } => kind.not_found_code(),
            Self::Blocked(_) => DiagnosticCode::E0102WizardReadOnly,
            Self::ConfirmationRequired { .. } => DiagnosticCode::E0103WizardConfirmationRequired,
            Self::StateChanged { .. } => DiagnosticCode::E0104WizardStateChanged,
            Self::SelfDependency(_) => DiagnosticCode::E0303DependencySelfLoop,
            Self::CrossWizardDependency { .. } => DiagnosticCode::E0304DependencyCrossWizard,
            Self::DuplicateDependency { .. } => DiagnosticCode::E0305DependencyDuplicate,
            Self::DependencyCycle { .. } => DiagnosticCode::E0306DependencyCycle,
            Self::InvalidDependencyType(_) => DiagnosticCode::E0307DependencyTypeInvalid,
            Self::StepNotInWizard { .. } => DiagnosticCode::E0402FlowStepNotInWizard,
            Self::FlowSelfLoop(_) => DiagnosticCode::E0403FlowSelfLoop,
            Self::InvalidCondition(_) => DiagnosticCode::E0404FlowConditionInvalid,
            Self::InvalidDefinition(_) => DiagnosticCode::E0105WizardDefinitionInvalid,
            Self::UnknownField(_) => DiagnosticCode::E0803UnknownField,
            Self::InvalidValue { .. } => DiagnosticCode::E0805InvalidValue,
            Self::RunNotInProgress { .. } => DiagnosticCode::E0602RunNotInProgress,
            Self::Integrity(_) => DiagnosticCode::E0109WizardCloneIntegrity,
            Self::Store(StoreError::Conflict { .. }) => DiagnosticCode::E0106WizardRevisionConflict,
            Self::Store(StoreError::Io { .. }) => DiagnosticCode::E0901IoError,
            Self::Store(StoreError::Json { .. }) => DiagnosticCode::E0902JsonParseError,
            Self::Store(_) => DiagnosticCode::E0903StoreError,
        }
    }

    /// Convert into a CLI diagnostic attributed to `subject`
    pub fn to_diagnostic(&self, subject: impl Into<String>) -> Diagnostic {
        let message = match self {
            // Keep the underlying cause visible for storage failures
            Self::Store(StoreError::Io { source, .. }) => format!("{self}: {source}"),
            Self::Store(StoreError::Json { source, .. }) => format!("{self}: {source}"),
            _ => self.to_string(),
        };
        Diagnostic::new(self.code(), message, subject)
    }
}
