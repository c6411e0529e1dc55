//! Core domain logic for Taskmate.
//! This crate is the single source of truth for task and theme invariants.

pub mod app;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod store;

pub use app::{AppError, LoadReport, TaskmateApp};
pub use config::{AppConfig, ConfigError};
pub use gateway::{
    GatewayError, GatewayResult, InMemoryGateway, PersistenceGateway, SqliteGateway,
};
pub use logging::{default_log_level, init_logging, init_logging_for, logging_status};
pub use model::task::{Category, Task, TaskId, TaskValidationError, UnknownCategory};
pub use model::theme::{ColorPalette, ThemeMode, ThemeState};
pub use store::{
    PersistPolicy, StoreError, StoreResult, Subscription, TaskListQuery, TaskStore, ThemeStore,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
