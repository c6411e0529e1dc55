//! Persistence gateway contract and implementations.
//!
//! # Responsibility
//! - Define the async key-value boundary every store persists through.
//! - Provide an in-memory gateway and a SQLite-backed device gateway.
//!
//! # Invariants
//! - Values are opaque strings; gateways never interpret them.
//! - `remove` of an absent key succeeds.
//! - A gateway call that fails leaves the stored value unchanged.

use crate::db::DbError;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryGateway;
pub use sqlite::SqliteGateway;

/// Storage key for the serialized task collection.
pub const TASKS_KEY: &str = "tasks";
/// Storage key for the theme literal (`"dark"` / `"light"`).
pub const THEME_KEY: &str = "theme";

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure of a single gateway call.
#[derive(Debug)]
pub enum GatewayError {
    Db(DbError),
    /// Backend refused or could not serve the call.
    Unavailable(String),
    /// Blocking worker panicked or was cancelled.
    Worker(String),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::Worker(message) => write!(f, "storage worker failed: {message}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) | Self::Worker(_) => None,
        }
    }
}

impl From<DbError> for GatewayError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Async key-value store used by every state store.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn get(&self, key: &str) -> GatewayResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> GatewayResult<()>;
    async fn remove(&self, key: &str) -> GatewayResult<()>;
}
