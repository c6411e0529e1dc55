//! Persisted state stores.
//!
//! # Responsibility
//! - Own the in-memory task collection and theme mode.
//! - Mirror every committed change to a `PersistenceGateway`.
//! - Notify subscribers synchronously after each committed change.
//!
//! # Invariants
//! - Mutations on one store are serialized; a persist never overtakes an
//!   earlier mutation's persist.
//! - Reads never wait on persistence.
//! - Validation failures never reach the gateway.

use crate::gateway::GatewayError;
use crate::model::task::TaskValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod subscription;
pub mod task_store;
pub mod theme_store;

pub use subscription::Subscription;
pub use task_store::{TaskListQuery, TaskStore};
pub use theme_store::ThemeStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Ordering between the in-memory commit and the gateway write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Commit in memory and notify first, then persist. A failed persist is
    /// reported but the in-memory change stays.
    #[default]
    Optimistic,
    /// Persist first; commit and notify only after the gateway succeeded.
    WriteAhead,
}

/// Store-level failure.
#[derive(Debug)]
pub enum StoreError {
    /// User input rejected before any mutation.
    Validation(TaskValidationError),
    /// Gateway call for `key` failed.
    Persistence {
        key: &'static str,
        source: GatewayError,
    },
    /// Stored value under `key` could not be decoded or violates invariants.
    InvalidData { key: &'static str, message: String },
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence { key, source } => {
                write!(f, "failed to persist `{key}`: {source}")
            }
            Self::InvalidData { key, message } => {
                write!(f, "invalid stored data under `{key}`: {message}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence { source, .. } => Some(source),
            Self::InvalidData { .. } => None,
        }
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}
