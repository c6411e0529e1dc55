//! Application facade over both stores.
//!
//! # Responsibility
//! - Build the task and theme stores over one shared gateway.
//! - Load persisted state at startup, degrading to defaults on failure.
//! - Expose the command surface consumed by presentation layers.
//!
//! # Invariants
//! - One `TaskmateApp` owns the `tasks` and `theme` keys of its gateway.
//! - Startup load failures are logged and never abort construction.

use crate::config::{AppConfig, ConfigError};
use crate::gateway::{GatewayError, PersistenceGateway, SqliteGateway};
use crate::model::task::{Category, Task};
use crate::model::theme::{ColorPalette, ThemeMode, ThemeState};
use crate::store::{
    PersistPolicy, StoreError, StoreResult, Subscription, TaskListQuery, TaskStore, ThemeStore,
};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Failure while constructing an app instance.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Gateway(GatewayError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Gateway(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Gateway(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<GatewayError> for AppError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

/// Outcome of the startup load.
#[derive(Debug)]
pub struct LoadReport {
    pub tasks_loaded: usize,
    pub theme: ThemeMode,
    /// Store errors swallowed during load; state stayed at defaults.
    pub failures: Vec<StoreError>,
}

impl LoadReport {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Task list + theme state for one process.
pub struct TaskmateApp {
    tasks: TaskStore,
    theme: ThemeStore,
}

impl TaskmateApp {
    /// Builds unloaded stores over `gateway`.
    pub fn new(gateway: Arc<dyn PersistenceGateway>, policy: PersistPolicy) -> Self {
        Self {
            tasks: TaskStore::new(Arc::clone(&gateway), policy),
            theme: ThemeStore::new(gateway, policy),
        }
    }

    /// Opens `<data_dir>/taskmate.sqlite3` with default settings and loads state.
    ///
    /// # Errors
    /// - `Config` when `data_dir` is empty or relative.
    /// - `Gateway` when the database cannot be opened.
    pub async fn open_at(data_dir: impl AsRef<Path>) -> Result<(Self, LoadReport), AppError> {
        let config = AppConfig::new(data_dir)?;
        Self::open(&config).await
    }

    /// Opens the on-device database described by `config` and loads state.
    pub async fn open(config: &AppConfig) -> Result<(Self, LoadReport), AppError> {
        let db_path = config.db_path();
        let gateway = tokio::task::spawn_blocking(move || SqliteGateway::open(db_path))
            .await
            .map_err(|err| GatewayError::Worker(err.to_string()))??;

        let app = Self::new(Arc::new(gateway), config.persist_policy());
        let report = app.load().await;
        Ok((app, report))
    }

    /// Loads both stores. Failures leave defaults in place and are reported.
    pub async fn load(&self) -> LoadReport {
        let started_at = Instant::now();
        let mut failures = Vec::new();

        let tasks_loaded = self.tasks.load().await.unwrap_or_else(|err| {
            failures.push(err);
            0
        });
        let theme = match self.theme.load().await {
            Ok(mode) => mode,
            Err(err) => {
                failures.push(err);
                self.theme.mode()
            }
        };

        if failures.is_empty() {
            info!(
                "event=app_load module=app status=ok tasks={} theme={} duration_ms={}",
                tasks_loaded,
                theme.as_str(),
                started_at.elapsed().as_millis()
            );
        } else {
            warn!(
                "event=app_load module=app status=degraded failures={} duration_ms={}",
                failures.len(),
                started_at.elapsed().as_millis()
            );
        }

        LoadReport {
            tasks_loaded,
            theme,
            failures,
        }
    }

    pub async fn create_task(&self, title: &str, category: Category) -> StoreResult<Task> {
        self.tasks.create(title, category).await
    }

    pub async fn toggle_task(&self, id: &str) -> StoreResult<Option<Task>> {
        self.tasks.toggle_completion(id).await
    }

    pub async fn edit_task(&self, id: &str, title: &str) -> StoreResult<Option<Task>> {
        self.tasks.edit(id, title).await
    }

    /// Caller is responsible for confirming with the user first.
    pub async fn delete_task(&self, id: &str) -> StoreResult<Option<Task>> {
        self.tasks.delete(id).await
    }

    /// Caller is responsible for confirming with the user first.
    pub async fn clear_all_tasks(&self) -> StoreResult<usize> {
        self.tasks.clear_all().await
    }

    pub async fn toggle_theme(&self) -> StoreResult<ThemeMode> {
        self.theme.toggle().await
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.list()
    }

    pub fn query_tasks(&self, query: &TaskListQuery) -> Vec<Task> {
        self.tasks.query(query)
    }

    pub fn is_dark_mode(&self) -> bool {
        self.theme.is_dark_mode()
    }

    pub fn colors(&self) -> &'static ColorPalette {
        self.theme.colors()
    }

    pub fn theme_state(&self) -> ThemeState {
        self.theme.state()
    }

    pub fn subscribe_tasks<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Task]) + Send + Sync + 'static,
    {
        self.tasks.subscribe(callback)
    }

    pub fn subscribe_theme<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ThemeState) + Send + Sync + 'static,
    {
        self.theme.subscribe(callback)
    }

    pub fn task_store(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn theme_store(&self) -> &ThemeStore {
        &self.theme
    }
}
