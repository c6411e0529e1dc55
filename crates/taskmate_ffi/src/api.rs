//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Hold the single process-scoped app context behind `app_init`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every task/theme call fails softly until `app_init` succeeded.
//! - The context is bound to one data directory for the process lifetime.

use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use taskmate_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Category, ColorPalette, StoreError, Task, TaskmateApp, ThemeState,
};
use tokio::runtime::Runtime;

static CONTEXT: OnceCell<FfiContext> = OnceCell::new();

struct FfiContext {
    runtime: Runtime,
    app: TaskmateApp,
    data_dir: PathBuf,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One task as seen by Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    /// Category display name (`Work|Personal|Shopping|Health|Other`).
    pub category: String,
    pub completed: bool,
    /// ISO-8601 UTC creation time.
    pub created_at: String,
}

impl From<Task> for TaskItem {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            category: task.category.as_str().to_string(),
            completed: task.completed,
            created_at: task.created_at,
        }
    }
}

/// Startup envelope returned by `app_init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInitResponse {
    pub ok: bool,
    /// Tasks restored from storage (0 on failure or degraded load).
    pub tasks_loaded: u32,
    /// True when stored state could not be read. Task edits are then refused
    /// until `tasks_clear_all` succeeds.
    pub degraded: bool,
    pub message: String,
}

/// Task list snapshot envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Generic action response envelope for task commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether the command was applied and persisted.
    pub ok: bool,
    /// Affected task, when one exists.
    pub task: Option<TaskItem>,
    /// Number of tasks affected by the command.
    pub affected: u32,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task: Option<Task>, affected: usize) -> Self {
        Self {
            ok: true,
            task: task.map(TaskItem::from),
            affected: clamp_count(affected),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task: None,
            affected: 0,
            message: message.into(),
        }
    }
}

/// Color slots for the active theme, as `#RRGGBB` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteItem {
    pub background: String,
    pub surface: String,
    pub text: String,
    pub text_secondary: String,
    pub border: String,
    pub primary: String,
    pub success: String,
    pub error: String,
    pub warning: String,
}

impl From<&ColorPalette> for PaletteItem {
    fn from(palette: &ColorPalette) -> Self {
        Self {
            background: palette.background.to_string(),
            surface: palette.surface.to_string(),
            text: palette.text.to_string(),
            text_secondary: palette.text_secondary.to_string(),
            border: palette.border.to_string(),
            primary: palette.primary.to_string(),
            success: palette.success.to_string(),
            error: palette.error.to_string(),
            warning: palette.warning.to_string(),
        }
    }
}

/// Theme envelope for `theme_state` and `theme_toggle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeResponse {
    pub ok: bool,
    pub is_dark_mode: bool,
    /// `light` or `dark`.
    pub mode: String,
    pub colors: PaletteItem,
    pub message: String,
}

impl ThemeResponse {
    fn from_state(ok: bool, state: ThemeState, message: impl Into<String>) -> Self {
        Self {
            ok,
            is_dark_mode: state.is_dark_mode(),
            mode: state.mode.as_str().to_string(),
            colors: PaletteItem::from(state.colors),
            message: message.into(),
        }
    }
}

/// Opens the on-device store under `data_dir` and loads persisted state.
///
/// # FFI contract
/// - Sync call; opens the database and reads both keys.
/// - Idempotent for the same `data_dir`; a different directory is rejected.
/// - Unreadable stored state degrades to defaults (`degraded=true`) and keeps
///   the stored tasks untouched until `tasks_clear_all`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn app_init(data_dir: String) -> AppInitResponse {
    let data_dir = PathBuf::from(data_dir.trim());
    if let Some(context) = CONTEXT.get() {
        return already_initialized(context, &data_dir);
    }

    let mut loaded = None;
    let result = CONTEXT.get_or_try_init(|| {
        let (context, tasks_loaded, degraded) = open_context(&data_dir)?;
        loaded = Some((tasks_loaded, degraded));
        Ok::<_, String>(context)
    });

    match (result, loaded) {
        (Ok(_), Some((tasks_loaded, degraded))) => AppInitResponse {
            ok: true,
            tasks_loaded: clamp_count(tasks_loaded),
            degraded,
            message: if degraded {
                "Stored data could not be read; clear all tasks to start over.".to_string()
            } else {
                format!("Loaded {tasks_loaded} task(s).")
            },
        },
        // Another caller won the race.
        (Ok(context), None) => already_initialized(context, &data_dir),
        (Err(err), _) => AppInitResponse {
            ok: false,
            tasks_loaded: 0,
            degraded: false,
            message: format!("app_init failed: {err}"),
        },
    }
}

/// Category names accepted by `task_create`, in display order.
#[flutter_rust_bridge::frb(sync)]
pub fn task_categories() -> Vec<String> {
    Category::ALL
        .iter()
        .map(|category| category.as_str().to_string())
        .collect()
}

/// Returns all tasks in insertion order.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list() -> TaskListResponse {
    match with_context(|context| context.app.tasks()) {
        Ok(tasks) => {
            let items = tasks.into_iter().map(TaskItem::from).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No tasks.".to_string()
            } else {
                format!("{} task(s).", items.len())
            };
            TaskListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("tasks_list failed: {err}"),
        },
    }
}

/// Creates an open task.
///
/// # FFI contract
/// - `category=None` or a blank name (no selection) selects `Personal`.
/// - Blank titles and unknown category names are rejected without mutation.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(title: String, category: Option<String>) -> TaskActionResponse {
    let category = match category
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::parse::<Category>)
    {
        None => Category::default(),
        Some(Ok(category)) => category,
        Some(Err(err)) => return TaskActionResponse::failure(format!("task_create failed: {err}")),
    };

    match with_context(|context| {
        context
            .runtime
            .block_on(context.app.create_task(&title, category))
    }) {
        Ok(Ok(task)) => TaskActionResponse::success("Task created.", Some(task), 1),
        Ok(Err(err)) => store_failure("task_create", err),
        Err(err) => TaskActionResponse::failure(format!("task_create failed: {err}")),
    }
}

/// Flips completion of the task with `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle(id: String) -> TaskActionResponse {
    let result = with_context(|context| context.runtime.block_on(context.app.toggle_task(&id)));
    single_task_response("task_toggle", "Task updated.", result)
}

/// Replaces the title of the task with `id`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_edit(id: String, title: String) -> TaskActionResponse {
    let result = with_context(|context| {
        context
            .runtime
            .block_on(context.app.edit_task(&id, &title))
    });
    single_task_response("task_edit", "Task updated.", result)
}

/// Deletes the task with `id`. Dart must confirm with the user first.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: String) -> TaskActionResponse {
    let result = with_context(|context| context.runtime.block_on(context.app.delete_task(&id)));
    single_task_response("task_delete", "Task deleted.", result)
}

/// Deletes every task. Dart must confirm with the user first.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_clear_all() -> TaskActionResponse {
    match with_context(|context| context.runtime.block_on(context.app.clear_all_tasks())) {
        Ok(Ok(removed)) => {
            TaskActionResponse::success(format!("Cleared {removed} task(s)."), None, removed)
        }
        Ok(Err(err)) => store_failure("tasks_clear_all", err),
        Err(err) => TaskActionResponse::failure(format!("tasks_clear_all failed: {err}")),
    }
}

/// Current theme mode and palette.
#[flutter_rust_bridge::frb(sync)]
pub fn theme_state() -> ThemeResponse {
    match with_context(|context| context.app.theme_state()) {
        Ok(state) => ThemeResponse::from_state(true, state, "ok"),
        Err(err) => ThemeResponse::from_state(
            false,
            ThemeState::default(),
            format!("theme_state failed: {err}"),
        ),
    }
}

/// Flips light/dark mode and persists the choice.
#[flutter_rust_bridge::frb(sync)]
pub fn theme_toggle() -> ThemeResponse {
    match with_context(|context| {
        let outcome = context.runtime.block_on(context.app.toggle_theme());
        (outcome, context.app.theme_state())
    }) {
        Ok((Ok(_), state)) => ThemeResponse::from_state(true, state, "Theme updated."),
        Ok((Err(err), state)) => {
            ThemeResponse::from_state(false, state, format!("theme_toggle failed: {err}"))
        }
        Err(err) => ThemeResponse::from_state(
            false,
            ThemeState::default(),
            format!("theme_toggle failed: {err}"),
        ),
    }
}

fn open_context(data_dir: &Path) -> Result<(FfiContext, usize, bool), String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("taskmate-ffi")
        .enable_all()
        .build()
        .map_err(|err| format!("runtime start failed: {err}"))?;

    let (app, report) = runtime
        .block_on(TaskmateApp::open_at(data_dir))
        .map_err(|err| {
            error!("event=app_init module=ffi status=error error={err}");
            err.to_string()
        })?;

    info!(
        "event=app_init module=ffi status=ok tasks={} degraded={}",
        report.tasks_loaded,
        report.is_degraded()
    );
    Ok((
        FfiContext {
            runtime,
            app,
            data_dir: data_dir.to_path_buf(),
        },
        report.tasks_loaded,
        report.is_degraded(),
    ))
}

fn already_initialized(context: &FfiContext, data_dir: &Path) -> AppInitResponse {
    if context.data_dir == data_dir {
        AppInitResponse {
            ok: true,
            tasks_loaded: clamp_count(context.app.tasks().len()),
            degraded: false,
            message: "Already initialized.".to_string(),
        }
    } else {
        AppInitResponse {
            ok: false,
            tasks_loaded: 0,
            degraded: false,
            message: format!(
                "app_init failed: already initialized at `{}`",
                context.data_dir.display()
            ),
        }
    }
}

fn with_context<T>(f: impl FnOnce(&FfiContext) -> T) -> Result<T, String> {
    CONTEXT
        .get()
        .map(f)
        .ok_or_else(|| "app_init has not been called".to_string())
}

fn single_task_response(
    op: &'static str,
    success_message: &'static str,
    result: Result<Result<Option<Task>, StoreError>, String>,
) -> TaskActionResponse {
    match result {
        Ok(Ok(Some(task))) => TaskActionResponse::success(success_message, Some(task), 1),
        Ok(Ok(None)) => TaskActionResponse::failure(format!("{op} failed: task not found")),
        Ok(Err(err)) => store_failure(op, err),
        Err(err) => TaskActionResponse::failure(format!("{op} failed: {err}")),
    }
}

fn store_failure(op: &'static str, err: StoreError) -> TaskActionResponse {
    // Optimistic writes keep the in-memory change even when persistence fails.
    let message = if err.is_persistence() {
        format!("{op} applied but not saved: {err}")
    } else {
        format!("{op} failed: {err}")
    };
    TaskActionResponse::failure(message)
}

fn clamp_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        app_init, core_version, init_logging, ping, task_categories, task_create, task_delete,
        task_edit, task_toggle, tasks_list, theme_state, theme_toggle,
    };
    use once_cell::sync::Lazy;
    use tempfile::TempDir;

    static DATA_DIR: Lazy<TempDir> = Lazy::new(|| tempfile::tempdir().expect("temp dir"));

    fn init() {
        let response = app_init(DATA_DIR.path().to_string_lossy().to_string());
        assert!(response.ok, "{}", response.message);
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn categories_are_listed_in_display_order() {
        assert_eq!(
            task_categories(),
            vec!["Work", "Personal", "Shopping", "Health", "Other"]
        );
    }

    #[test]
    fn app_init_is_idempotent_and_pins_data_dir() {
        init();
        init();

        let other = tempfile::tempdir().expect("temp dir");
        let response = app_init(other.path().to_string_lossy().to_string());
        assert!(!response.ok);
        assert!(response.message.contains("already initialized"));
    }

    #[test]
    fn task_lifecycle_through_ffi() {
        init();

        let created = task_create("Buy milk".to_string(), Some("shopping".to_string()));
        assert!(created.ok, "{}", created.message);
        let task = created.task.expect("created task");
        assert_eq!(task.category, "Shopping");
        assert!(!task.completed);

        let toggled = task_toggle(task.id.clone());
        assert!(toggled.ok, "{}", toggled.message);
        assert!(toggled.task.expect("toggled task").completed);

        let edited = task_edit(task.id.clone(), "Buy oat milk".to_string());
        assert!(edited.ok, "{}", edited.message);
        assert!(tasks_list()
            .items
            .iter()
            .any(|item| item.id == task.id && item.title == "Buy oat milk"));

        let deleted = task_delete(task.id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert_eq!(deleted.affected, 1);
        assert!(tasks_list().items.iter().all(|item| item.id != task.id));

        let missing = task_delete(task.id);
        assert!(!missing.ok);
        assert!(missing.message.contains("not found"));
    }

    #[test]
    fn task_create_rejects_blank_title_and_unknown_category() {
        init();

        let blank = task_create("   ".to_string(), None);
        assert!(!blank.ok);
        assert!(blank.task.is_none());

        let unknown = task_create("Plan trip".to_string(), Some("Errands".to_string()));
        assert!(!unknown.ok);
        assert!(unknown.message.contains("Errands"));
    }

    #[test]
    fn task_create_treats_blank_category_as_default() {
        init();

        for category in [Some(String::new()), Some("  ".to_string()), None] {
            let created = task_create("Water plants".to_string(), category);
            assert!(created.ok, "{}", created.message);
            let task = created.task.expect("created task");
            assert_eq!(task.category, "Personal");
            assert!(task_delete(task.id).ok);
        }
    }

    #[test]
    fn theme_toggle_flips_mode_and_palette() {
        init();

        let before = theme_state();
        assert!(before.ok);
        let after = theme_toggle();
        assert!(after.ok, "{}", after.message);
        assert_ne!(before.is_dark_mode, after.is_dark_mode);
        assert_ne!(before.colors.background, after.colors.background);

        let restored = theme_toggle();
        assert_eq!(restored.mode, before.mode);
    }
}
