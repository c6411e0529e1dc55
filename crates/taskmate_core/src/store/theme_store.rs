//! Theme mode store.
//!
//! # Invariants
//! - Persisted value is exactly `"dark"` or `"light"`.
//! - Anything but a stored `"dark"` loads as light mode.

use super::subscription::{Subscribers, Subscription};
use super::{PersistPolicy, StoreError, StoreResult};
use crate::gateway::{PersistenceGateway, THEME_KEY};
use crate::model::theme::{ColorPalette, ThemeMode, ThemeState};
use log::{error, info};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// Light/dark preference mirrored to a `PersistenceGateway`.
pub struct ThemeStore {
    gateway: Arc<dyn PersistenceGateway>,
    policy: PersistPolicy,
    mode: RwLock<ThemeMode>,
    write_gate: Mutex<()>,
    subscribers: Arc<Subscribers<ThemeState>>,
}

impl ThemeStore {
    /// Creates a store in light mode. Call `load` to read the stored mode.
    pub fn new(gateway: Arc<dyn PersistenceGateway>, policy: PersistPolicy) -> Self {
        Self {
            gateway,
            policy,
            mode: RwLock::new(ThemeMode::Light),
            write_gate: Mutex::new(()),
            subscribers: Subscribers::new(),
        }
    }

    /// Reads the stored mode. Gateway failure keeps the current mode.
    pub async fn load(&self) -> StoreResult<ThemeMode> {
        let _gate = self.write_gate.lock().await;
        let stored = self.gateway.get(THEME_KEY).await.map_err(|source| {
            error!(
                "event=theme_load module=store status=error error_code=gateway_failed error={}",
                source
            );
            StoreError::Persistence {
                key: THEME_KEY,
                source,
            }
        })?;

        let mode = ThemeMode::from_stored(stored.as_deref());
        self.commit(mode);
        info!(
            "event=theme_load module=store status=ok mode={}",
            mode.as_str()
        );
        Ok(mode)
    }

    /// Flips the mode and persists it.
    ///
    /// Under `Optimistic` a failed write is reported but the flip stays.
    pub async fn toggle(&self) -> StoreResult<ThemeMode> {
        let _gate = self.write_gate.lock().await;
        let next = self.mode().toggled();

        if self.policy == PersistPolicy::Optimistic {
            self.commit(next);
        }
        if let Err(source) = self.gateway.set(THEME_KEY, next.as_str()).await {
            error!(
                "event=theme_toggle module=store status=error stage=persist policy={:?} error={}",
                self.policy, source
            );
            return Err(StoreError::Persistence {
                key: THEME_KEY,
                source,
            });
        }
        if self.policy == PersistPolicy::WriteAhead {
            self.commit(next);
        }

        info!(
            "event=theme_toggle module=store status=ok mode={}",
            next.as_str()
        );
        Ok(next)
    }

    pub fn mode(&self) -> ThemeMode {
        *self.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_dark_mode(&self) -> bool {
        self.mode().is_dark()
    }

    /// Palette for the current mode.
    pub fn colors(&self) -> &'static ColorPalette {
        self.mode().colors()
    }

    pub fn state(&self) -> ThemeState {
        ThemeState::new(self.mode())
    }

    /// Registers `callback` to receive the theme after each committed change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ThemeState) + Send + Sync + 'static,
    {
        Subscribers::subscribe(&self.subscribers, callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn commit(&self, mode: ThemeMode) {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
        self.subscribers.notify(&ThemeState::new(mode));
    }
}
