use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Repository error type shared by the in-memory and file-backed stores.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Reading or writing a store file failed.
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store file does not contain valid JSON for its record type.
    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: Uuid },

    /// The record was written by someone else since it was read.
    #[error("wizard {id} was modified concurrently (expected revision {expected}, found {found})")]
    Conflict { id: Uuid, expected: u64, found: u64 },

    /// An in-memory store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
