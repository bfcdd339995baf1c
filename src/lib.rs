//! wizctl: lifecycle protection, structural cloning and versioning for
//! wizard definitions.
//!
//! A wizard is classified from its run history into `draft`, `in_use` or
//! `published`; that state decides whether it may still be edited or
//! deleted. Wizards can be deep-copied into independent clones or linked,
//! numbered versions, and their option dependencies and step flow rules are
//! validated on every write.
//!
//! The library is storage-agnostic: [`WizardService`] and the components
//! behind it take a [`store::WizardStore`] and a [`store::RunStore`].

pub mod authoring;
pub mod clone;
pub mod cmd;
pub mod condition;
pub mod config;
pub mod dependency;
pub mod diagnostic;
pub mod error;
pub mod fingerprint;
pub mod flow;
pub mod guard;
pub mod lifecycle;
pub mod lock;
pub mod model;
pub mod runs;
pub mod service;
pub mod store;
pub mod ui;
pub mod validate;
pub mod version;
pub mod write;

pub use error::{EntityKind, Result, WizardError};
pub use guard::{Confirmation, Permission};
pub use lifecycle::ProtectionStatus;
pub use model::{LifecycleState, Wizard};
pub use service::WizardService;
