//! Task collection store.
//!
//! # Responsibility
//! - Own the ordered task collection and its CRUD commands.
//! - Persist the full collection as one JSON blob under `tasks`.
//!
//! # Invariants
//! - Task ids are unique; insertion order is preserved.
//! - Mutations targeting an unknown id neither persist nor notify.
//! - After a failed load only `load` and `clear_all` may write, so the stored
//!   blob is never replaced by a collection that did not come from it.
//! - Blank titles are rejected before any state or storage access.
//! - Task titles never appear in log lines.

use super::subscription::{Subscribers, Subscription};
use super::{PersistPolicy, StoreError, StoreResult};
use crate::gateway::{PersistenceGateway, TASKS_KEY};
use crate::model::task::{new_task_id, normalize_title, repair_collection, Category, Task};
use log::{error, info, warn};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

/// Filter for `TaskStore::query`. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub category: Option<Category>,
    pub completed: Option<bool>,
}

impl TaskListQuery {
    pub fn matches(&self, task: &Task) -> bool {
        self.category.map_or(true, |category| task.category == category)
            && self.completed.map_or(true, |completed| task.completed == completed)
    }
}

/// Gateway write that follows a committed change.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Write {
    Snapshot,
    Remove,
}

/// In-memory task collection mirrored to a `PersistenceGateway`.
pub struct TaskStore {
    gateway: Arc<dyn PersistenceGateway>,
    policy: PersistPolicy,
    tasks: RwLock<Vec<Task>>,
    /// Reason of the last failed load; blocks snapshot writes while set.
    load_failure: RwLock<Option<String>>,
    write_gate: Mutex<()>,
    subscribers: Arc<Subscribers<[Task]>>,
}

impl TaskStore {
    /// Creates an empty store. Call `load` to read persisted tasks.
    pub fn new(gateway: Arc<dyn PersistenceGateway>, policy: PersistPolicy) -> Self {
        Self {
            gateway,
            policy,
            tasks: RwLock::new(Vec::new()),
            load_failure: RwLock::new(None),
            write_gate: Mutex::new(()),
            subscribers: Subscribers::new(),
        }
    }

    pub fn policy(&self) -> PersistPolicy {
        self.policy
    }

    /// Replaces in-memory state with the persisted collection.
    ///
    /// Absent key loads an empty collection. Blank or repeated ids are
    /// reassigned and the repaired collection is written back.
    ///
    /// # Errors
    /// On gateway failure or an unreadable blob the in-memory state is left
    /// unchanged, the error is returned, and create/toggle/edit/delete fail
    /// with `InvalidData` until a later `load` or `clear_all` succeeds.
    pub async fn load(&self) -> StoreResult<usize> {
        let _gate = self.write_gate.lock().await;
        let started_at = Instant::now();

        let raw = match self.gateway.get(TASKS_KEY).await {
            Ok(raw) => raw,
            Err(source) => {
                error!(
                    "event=tasks_load module=store status=error error_code=gateway_failed error={}",
                    source
                );
                self.set_load_failure(Some(source.to_string()));
                return Err(StoreError::Persistence {
                    key: TASKS_KEY,
                    source,
                });
            }
        };

        let (tasks, repaired) = match raw.as_deref().map(decode_tasks).transpose() {
            Ok(decoded) => decoded.unwrap_or_default(),
            Err(message) => {
                error!(
                    "event=tasks_load module=store status=error error_code=invalid_data error={}",
                    message
                );
                self.set_load_failure(Some(message.clone()));
                return Err(StoreError::InvalidData {
                    key: TASKS_KEY,
                    message,
                });
            }
        };

        if repaired > 0 {
            warn!(
                "event=tasks_load module=store status=repaired repaired={}",
                repaired
            );
            self.write_back(&tasks).await;
        }

        let count = tasks.len();
        self.set_load_failure(None);
        self.commit(tasks);
        info!(
            "event=tasks_load module=store status=ok count={} duration_ms={}",
            count,
            started_at.elapsed().as_millis()
        );
        Ok(count)
    }

    /// Appends a new open task.
    ///
    /// # Errors
    /// - `Validation` when `title` is blank; nothing is mutated or persisted.
    /// - `Persistence` when the gateway write fails (see `PersistPolicy`).
    pub async fn create(&self, title: &str, category: Category) -> StoreResult<Task> {
        let mut task = Task::new(title, category).map_err(|err| {
            warn!("event=task_create module=store status=rejected reason={err}");
            StoreError::from(err)
        })?;

        self.apply("task_create", move |tasks| {
            while tasks.iter().any(|existing| existing.id == task.id) {
                task.id = new_task_id();
            }
            tasks.push(task.clone());
            (task, true)
        })
        .await
    }

    /// Flips `completed` on the matching task. Unknown id returns `Ok(None)`.
    pub async fn toggle_completion(&self, id: &str) -> StoreResult<Option<Task>> {
        self.apply("task_toggle", |tasks| {
            match tasks.iter_mut().find(|task| task.id == id) {
                Some(task) => {
                    task.completed = !task.completed;
                    (Some(task.clone()), true)
                }
                None => (None, false),
            }
        })
        .await
    }

    /// Replaces the title of the matching task. Unknown id returns `Ok(None)`.
    ///
    /// # Errors
    /// - `Validation` when `new_title` is blank, regardless of `id`.
    pub async fn edit(&self, id: &str, new_title: &str) -> StoreResult<Option<Task>> {
        let title = normalize_title(new_title).map_err(|err| {
            warn!("event=task_edit module=store status=rejected reason={err}");
            StoreError::from(err)
        })?;

        self.apply("task_edit", move |tasks| {
            match tasks.iter_mut().find(|task| task.id == id) {
                Some(task) => {
                    task.title = title;
                    (Some(task.clone()), true)
                }
                None => (None, false),
            }
        })
        .await
    }

    /// Removes the matching task, keeping the order of the rest.
    pub async fn delete(&self, id: &str) -> StoreResult<Option<Task>> {
        self.apply("task_delete", |tasks| {
            match tasks.iter().position(|task| task.id == id) {
                Some(index) => (Some(tasks.remove(index)), true),
                None => (None, false),
            }
        })
        .await
    }

    /// Empties the collection and removes the `tasks` key.
    ///
    /// Allowed after a failed load; a successful removal lifts the write block.
    /// Returns how many tasks were dropped from memory.
    pub async fn clear_all(&self) -> StoreResult<usize> {
        self.apply_with("tasks_clear", Write::Remove, |tasks| {
            let removed = tasks.len();
            tasks.clear();
            (removed, true)
        })
        .await
    }

    /// Snapshot of the collection in insertion order.
    pub fn list(&self) -> Vec<Task> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.read().iter().find(|task| task.id == id).cloned()
    }

    /// Tasks matching `query`, insertion order preserved.
    pub fn query(&self, query: &TaskListQuery) -> Vec<Task> {
        self.read()
            .iter()
            .filter(|task| query.matches(task))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Why the last load failed, while that failure still blocks writes.
    pub fn load_failure(&self) -> Option<String> {
        self.load_failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registers `callback` to receive the full collection after each
    /// committed change (load, create, toggle, edit, delete, clear).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Task]) + Send + Sync + 'static,
    {
        Subscribers::subscribe(&self.subscribers, callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    async fn apply<R>(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut Vec<Task>) -> (R, bool),
    ) -> StoreResult<R> {
        self.apply_with(op, Write::Snapshot, mutate).await
    }

    /// Runs one serialized mutation: mutate a copy, then commit and persist in
    /// the order the policy dictates. `mutate` reports whether anything changed.
    async fn apply_with<R>(
        &self,
        op: &'static str,
        write: Write,
        mutate: impl FnOnce(&mut Vec<Task>) -> (R, bool),
    ) -> StoreResult<R> {
        let _gate = self.write_gate.lock().await;
        let started_at = Instant::now();

        if write == Write::Snapshot {
            if let Some(reason) = self.load_failure() {
                warn!("event={op} module=store status=rejected reason=load_failed");
                return Err(StoreError::InvalidData {
                    key: TASKS_KEY,
                    message: format!(
                        "stored tasks were not loaded ({reason}); load again or clear all first"
                    ),
                });
            }
        }

        let mut next = self.list();
        let (outcome, changed) = mutate(&mut next);
        if !changed {
            info!("event={op} module=store status=noop");
            return Ok(outcome);
        }

        let payload = match write {
            Write::Snapshot => Some(serde_json::to_string(&next).map_err(|err| {
                StoreError::InvalidData {
                    key: TASKS_KEY,
                    message: err.to_string(),
                }
            })?),
            Write::Remove => None,
        };
        let count = next.len();

        match self.policy {
            PersistPolicy::Optimistic => {
                self.commit(next);
                self.persist(op, payload.as_deref()).await?;
            }
            PersistPolicy::WriteAhead => {
                self.persist(op, payload.as_deref()).await?;
                self.commit(next);
            }
        }
        if write == Write::Remove {
            self.set_load_failure(None);
        }

        info!(
            "event={} module=store status=ok count={} duration_ms={}",
            op,
            count,
            started_at.elapsed().as_millis()
        );
        Ok(outcome)
    }

    async fn persist(&self, op: &'static str, payload: Option<&str>) -> StoreResult<()> {
        let result = match payload {
            Some(json) => self.gateway.set(TASKS_KEY, json).await,
            None => self.gateway.remove(TASKS_KEY).await,
        };
        result.map_err(|source| {
            error!(
                "event={} module=store status=error stage=persist policy={:?} error={}",
                op, self.policy, source
            );
            StoreError::Persistence {
                key: TASKS_KEY,
                source,
            }
        })
    }

    /// Best-effort write of a repaired collection; a failure only delays it
    /// until the next mutation.
    async fn write_back(&self, tasks: &[Task]) {
        let result = match serde_json::to_string(tasks) {
            Ok(json) => self
                .gateway
                .set(TASKS_KEY, &json)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        if let Err(err) = result {
            warn!("event=tasks_repair module=store status=error stage=persist error={err}");
        }
    }

    fn set_load_failure(&self, reason: Option<String>) {
        *self
            .load_failure
            .write()
            .unwrap_or_else(PoisonError::into_inner) = reason;
    }

    fn commit(&self, next: Vec<Task>) {
        let snapshot = next.clone();
        *self.tasks.write().unwrap_or_else(PoisonError::into_inner) = next;
        self.subscribers.notify(&snapshot);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Task>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parses the stored blob; returns the collection and how many ids were
/// reassigned.
fn decode_tasks(raw: &str) -> Result<(Vec<Task>, usize), String> {
    let mut tasks: Vec<Task> = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let repaired = repair_collection(&mut tasks).map_err(|err| err.to_string())?;
    Ok((tasks, repaired))
}
