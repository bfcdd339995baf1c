//! Modify/delete permission decisions.

use crate::error::{Result, WizardError};
use crate::lifecycle::classify;
use crate::model::LifecycleState;
use crate::store::{RunStore, WizardStore};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of a permission check.
///
/// A warning does not block the operation, but callers must obtain an
/// explicit confirmation before acting on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Permission {
    Allowed,
    AllowedWithWarning(String),
    Blocked(String),
}

impl Permission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Blocked(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::AllowedWithWarning(r) | Self::Blocked(r) => Some(r),
        }
    }

    /// The `(allowed, reason)` pair used by older callers
    pub fn into_pair(self) -> (bool, Option<String>) {
        match self {
            Self::Allowed => (true, None),
            Self::AllowedWithWarning(r) => (true, Some(r)),
            Self::Blocked(r) => (false, Some(r)),
        }
    }

    /// Turn the decision into a gate: blocked is an error, a warning needs `confirm`.
    pub fn require(self, confirm: Confirmation) -> Result<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::AllowedWithWarning(_) if confirm.is_confirmed() => Ok(()),
            Self::AllowedWithWarning(reason) => Err(WizardError::ConfirmationRequired { reason }),
            Self::Blocked(reason) => Err(WizardError::Blocked(reason)),
        }
    }
}

/// Explicit caller acknowledgement for operations that carry a warning
/// or destroy data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Unconfirmed,
    Confirmed,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Unconfirmed
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// A checked permission together with the state it was decided in.
///
/// Mutations re-classify right before committing and abort if the state
/// moved in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub permission: Permission,
    pub state: Option<LifecycleState>,
}

pub struct PermissionGuard<'a> {
    wizards: &'a dyn WizardStore,
    runs: &'a dyn RunStore,
}

impl<'a> PermissionGuard<'a> {
    pub fn new(wizards: &'a dyn WizardStore, runs: &'a dyn RunStore) -> Self {
        Self { wizards, runs }
    }

    pub fn can_modify(&self, wizard_id: Uuid) -> Result<Permission> {
        Ok(self.decide_modify(wizard_id)?.permission)
    }

    pub fn can_delete(&self, wizard_id: Uuid) -> Result<Permission> {
        Ok(self.decide_delete(wizard_id)?.permission)
    }

    pub fn decide_modify(&self, wizard_id: Uuid) -> Result<Decision> {
        let Some(wizard) = self.wizards.get(wizard_id)? else {
            return Ok(Decision {
                permission: Permission::Blocked("Wizard not found".to_string()),
                state: None,
            });
        };
        let stats = self.runs.stats(wizard_id)?;
        let state = classify(&stats);

        let permission = if wizard.is_archived {
            Permission::Blocked("Cannot modify archived wizard".to_string())
        } else {
            match state {
                LifecycleState::Published => Permission::Blocked(format!(
                    "Wizard has {} stored runs and is read-only",
                    stats.stored
                )),
                LifecycleState::InUse => Permission::AllowedWithWarning(format!(
                    "Warning: Wizard has {} active runs that will be affected",
                    stats.total
                )),
                LifecycleState::Draft => Permission::Allowed,
            }
        };
        Ok(Decision {
            permission,
            state: Some(state),
        })
    }

    pub fn decide_delete(&self, wizard_id: Uuid) -> Result<Decision> {
        let Some(wizard) = self.wizards.get(wizard_id)? else {
            return Ok(Decision {
                permission: Permission::Blocked("Wizard not found".to_string()),
                state: None,
            });
        };
        let stats = self.runs.stats(wizard_id)?;
        let state = classify(&stats);

        let permission = if wizard.is_archived {
            Permission::Blocked("Cannot delete archived wizard".to_string())
        } else {
            match state {
                LifecycleState::Published => Permission::Blocked(format!(
                    "Cannot delete wizard with {} stored runs. Archive instead.",
                    stats.stored
                )),
                LifecycleState::InUse => Permission::AllowedWithWarning(format!(
                    "Warning: Deleting will remove {} active runs",
                    stats.total
                )),
                LifecycleState::Draft => Permission::Allowed,
            }
        };
        Ok(Decision {
            permission,
            state: Some(state),
        })
    }

    /// Fail with `StateChanged` if the wizard is no longer in `expected`.
    pub fn recheck(&self, wizard_id: Uuid, expected: Option<LifecycleState>) -> Result<()> {
        let Some(expected) = expected else {
            return Ok(());
        };
        let found = classify(&self.runs.stats(wizard_id)?);
        if found != expected {
            tracing::warn!(wizard = %wizard_id, %expected, %found, "state moved before commit");
            return Err(WizardError::StateChanged {
                id: wizard_id,
                expected,
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_pair_matches_legacy_shape() {
        assert_eq!(Permission::Allowed.into_pair(), (true, None));
        assert_eq!(
            Permission::AllowedWithWarning("w".into()).into_pair(),
            (true, Some("w".to_string()))
        );
        assert_eq!(
            Permission::Blocked("b".into()).into_pair(),
            (false, Some("b".to_string()))
        );
    }

    #[test]
    fn test_require_needs_confirmation_for_warnings() {
        let warn = Permission::AllowedWithWarning("careful".into());
        assert!(matches!(
            warn.clone().require(Confirmation::Unconfirmed),
            Err(WizardError::ConfirmationRequired { .. })
        ));
        assert!(warn.require(Confirmation::Confirmed).is_ok());
        assert!(matches!(
            Permission::Blocked("no".into()).require(Confirmation::Confirmed),
            Err(WizardError::Blocked(_))
        ));
    }
}
