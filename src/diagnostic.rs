//! Diagnostic codes and error reporting.

use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// Diagnostic error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    // Wizard errors (E01xx)
    E0101WizardNotFound,
    E0102WizardReadOnly,
    E0103WizardConfirmationRequired,
    E0104WizardStateChanged,
    E0105WizardDefinitionInvalid,
    E0106WizardRevisionConflict,
    E0107WizardVersionInvalid,
    E0109WizardCloneIntegrity,

    // Step / option set errors (E02xx)
    E0201StepNotFound,
    E0202OptionSetNotFound,
    E0203StepOrderDuplicate,
    E0204OptionSetBoundsInvalid,
    E0205OptionSetPatternInvalid,

    // Option / dependency errors (E03xx)
    E0301OptionNotFound,
    E0302DependencyNotFound,
    E0303DependencySelfLoop,
    E0304DependencyCrossWizard,
    E0305DependencyDuplicate,
    E0306DependencyCycle,
    E0307DependencyTypeInvalid,
    E0308DependencyDangling,

    // Flow rule errors (E04xx)
    E0401FlowRuleNotFound,
    E0402FlowStepNotInWizard,
    E0403FlowSelfLoop,
    E0404FlowConditionInvalid,

    // Run errors (E06xx)
    E0601RunNotFound,
    E0602RunNotInProgress,

    // CLI/Command errors (E08xx)
    E0803UnknownField,
    E0805InvalidValue,
    E0807AmbiguousMatch,
    E0808InvalidPrefix,

    // General errors (E09xx)
    E0901IoError,
    E0902JsonParseError,
    E0903StoreError,

    // Warnings (W01xx)
    W0101LifecycleStale,
    W0102ParentMissing,
    W0103WatermarkInconsistent,
}

impl DiagnosticCode {
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            Self::W0101LifecycleStale
            | Self::W0102ParentMissing
            | Self::W0103WatermarkInconsistent => DiagnosticLevel::Warning,
            _ => DiagnosticLevel::Error,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            // E01xx - Wizard
            Self::E0101WizardNotFound => "E0101",
            Self::E0102WizardReadOnly => "E0102",
            Self::E0103WizardConfirmationRequired => "E0103",
            Self::E0104WizardStateChanged => "E0104",
            Self::E0105WizardDefinitionInvalid => "E0105",
            Self::E0106WizardRevisionConflict => "E0106",
            Self::E0107WizardVersionInvalid => "E0107",
            Self::E0109WizardCloneIntegrity => "E0109",
            // E02xx - Step / option set
            Self::E0201StepNotFound => "E0201",
            Self::E0202OptionSetNotFound => "E0202",
            Self::E0203StepOrderDuplicate => "E0203",
            Self::E0204OptionSetBoundsInvalid => "E0204",
            Self::E0205OptionSetPatternInvalid => "E0205",
            // E03xx - Option / dependency
            Self::E0301OptionNotFound => "E0301",
            Self::E0302DependencyNotFound => "E0302",
            Self::E0303DependencySelfLoop => "E0303",
            Self::E0304DependencyCrossWizard => "E0304",
            Self::E0305DependencyDuplicate => "E0305",
            Self::E0306DependencyCycle => "E0306",
            Self::E0307DependencyTypeInvalid => "E0307",
            Self::E0308DependencyDangling => "E0308",
            // E04xx - Flow rule
            Self::E0401FlowRuleNotFound => "E0401",
            Self::E0402FlowStepNotInWizard => "E0402",
            Self::E0403FlowSelfLoop => "E0403",
            Self::E0404FlowConditionInvalid => "E0404",
            // E06xx - Run
            Self::E0601RunNotFound => "E0601",
            Self::E0602RunNotInProgress => "E0602",
            // E08xx - CLI/Command
            Self::E0803UnknownField => "E0803",
            Self::E0805InvalidValue => "E0805",
            Self::E0807AmbiguousMatch => "E0807",
            Self::E0808InvalidPrefix => "E0808",
            // E09xx - General
            Self::E0901IoError => "E0901",
            Self::E0902JsonParseError => "E0902",
            Self::E0903StoreError => "E0903",
            // W01xx - Warnings
            Self::W0101LifecycleStale => "W0101",
            Self::W0102ParentMissing => "W0102",
            Self::W0103WatermarkInconsistent => "W0103",
        }
    }
}

/// A diagnostic message
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub file: String,
    pub level: DiagnosticLevel,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            level: code.level(),
            code,
            message: message.into(),
            file: file.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level_str = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        write!(
            f,
            "{}[{}]: {} ({})",
            level_str,
            self.code.code(),
            self.message,
            self.file
        )
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_codes_have_warning_level() {
        assert_eq!(
            DiagnosticCode::W0101LifecycleStale.level(),
            DiagnosticLevel::Warning
        );
        assert_eq!(
            DiagnosticCode::E0306DependencyCycle.level(),
            DiagnosticLevel::Error
        );
    }

    #[test]
    fn test_display_format() {
        let diag = Diagnostic::new(
            DiagnosticCode::E0101WizardNotFound,
            "Wizard not found",
            "wizards/abc.json",
        );
        assert_eq!(
            diag.to_string(),
            "error[E0101]: Wizard not found (wizards/abc.json)"
        );
    }
}
