//! Map-backed gateway for tests and previews.

use super::{GatewayError, GatewayResult, PersistenceGateway};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-process gateway with optional injected failures.
///
/// `set_failing(true)` makes every subsequent call fail with
/// `GatewayError::Unavailable` without touching stored values.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    entries: Mutex<BTreeMap<String, String>>,
    failing: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway pre-populated with `entries`.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            entries: Mutex::new(map),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Synchronous peek at a stored value, bypassing failure injection.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of successful `set`/`remove` calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self, op: &str, key: &str) -> GatewayResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable(format!(
                "injected failure on {op} `{key}`"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn get(&self, key: &str) -> GatewayResult<Option<String>> {
        self.check_available("get", key)?;
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &str) -> GatewayResult<()> {
        self.check_available("set", key)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> GatewayResult<()> {
        self.check_available("remove", key)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryGateway;
    use crate::gateway::{GatewayError, PersistenceGateway};

    #[tokio::test]
    async fn set_get_remove_roundtrip() {
        let gateway = InMemoryGateway::new();
        assert_eq!(gateway.get("k").await.unwrap(), None);

        gateway.set("k", "v1").await.unwrap();
        gateway.set("k", "v2").await.unwrap();
        assert_eq!(gateway.get("k").await.unwrap().as_deref(), Some("v2"));

        gateway.remove("k").await.unwrap();
        gateway.remove("k").await.unwrap();
        assert_eq!(gateway.get("k").await.unwrap(), None);
        assert_eq!(gateway.write_count(), 4);
    }

    #[tokio::test]
    async fn injected_failure_leaves_values_untouched() {
        let gateway = InMemoryGateway::with_entries([("theme", "dark")]);
        gateway.set_failing(true);

        let err = gateway.set("theme", "light").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
        assert!(gateway.remove("theme").await.is_err());
        assert!(gateway.get("theme").await.is_err());

        gateway.set_failing(false);
        assert_eq!(gateway.get("theme").await.unwrap().as_deref(), Some("dark"));
        assert_eq!(gateway.write_count(), 0);
    }
}
