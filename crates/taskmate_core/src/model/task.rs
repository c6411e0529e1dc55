//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task record and its closed category set.
//! - Normalize and validate user-entered titles before they reach a store.
//!
//! # Invariants
//! - `id` is assigned once and never changes.
//! - `title` is stored trimmed and is never empty.
//! - The serialized shape is `{id, title, category, completed, createdAt}`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identity key of a task.
///
/// Kept as a plain string because persisted collections may carry ids minted
/// by older clients (for example millisecond timestamps).
pub type TaskId = String;

/// Fixed set of task categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    #[default]
    Personal,
    Shopping,
    Health,
    Other,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Health,
        Category::Other,
    ];

    /// Display and wire name, e.g. `"Shopping"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Shopping => "Shopping",
            Self::Health => "Health",
            Self::Other => "Other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category parse failure for user-provided input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown category `{}`; expected one of Work|Personal|Shopping|Health|Other",
            self.0
        )
    }
}

impl Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| UnknownCategory(normalized.to_string()))
    }
}

/// Validation errors for task records and collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is empty after trimming.
    EmptyTitle,
    /// Task id is empty after trimming.
    EmptyId,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title cannot be empty"),
            Self::EmptyId => write!(f, "task id cannot be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// One to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub category: Category,
    pub completed: bool,
    /// ISO-8601 UTC with millisecond precision.
    pub created_at: String,
}

impl Task {
    /// Creates a new open task with a fresh time-ordered id.
    ///
    /// # Errors
    /// - `EmptyTitle` when `title` is blank.
    pub fn new(title: &str, category: Category) -> Result<Self, TaskValidationError> {
        let title = normalize_title(title)?;
        Ok(Self {
            id: new_task_id(),
            title,
            category,
            completed: false,
            created_at: now_iso8601(),
        })
    }

    /// Checks record-level invariants for data coming from storage.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.trim().is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        Ok(())
    }
}

/// Mints a fresh time-ordered task id.
pub fn new_task_id() -> TaskId {
    Uuid::now_v7().to_string()
}

/// Trims a user-entered title and rejects blank input.
pub fn normalize_title(title: &str) -> Result<String, TaskValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Gives blank and repeated ids a fresh id; the first occurrence of an id
/// keeps it. Returns how many ids were reassigned.
///
/// # Errors
/// - `EmptyTitle` when any record has a blank title; nothing is changed.
pub fn repair_collection(tasks: &mut [Task]) -> Result<usize, TaskValidationError> {
    if tasks.iter().any(|task| task.title.trim().is_empty()) {
        return Err(TaskValidationError::EmptyTitle);
    }

    let stored: HashSet<TaskId> = tasks.iter().map(|task| task.id.clone()).collect();
    let mut seen = HashSet::with_capacity(tasks.len());
    let mut repaired = 0;
    for task in tasks.iter_mut() {
        if task.id.trim().is_empty() || seen.contains(&task.id) {
            let mut id = new_task_id();
            while stored.contains(&id) || seen.contains(&id) {
                id = new_task_id();
            }
            task.id = id;
            repaired += 1;
        }
        seen.insert(task.id.clone());
    }
    Ok(repaired)
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
