use super::KvStore;
use crate::core::{StoreError, StoreResult};
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Slot {
    value: Option<Value>,
    expires_at: Option<Instant>,
    /// Set once the slot has been unlinked from the key map.
    removed: bool,
}

impl Slot {
    fn live_mut(&mut self) -> Option<&mut Value> {
        if self.expires_at.is_some_and(|at| at <= Instant::now()) {
            self.value = None;
            self.expires_at = None;
        }
        self.value.as_mut()
    }

    fn store(&mut self, value: Value, expires_at: Option<Instant>) {
        self.value = Some(value);
        self.expires_at = expires_at;
    }
}

/// In-process implementation of [`KvStore`].
///
/// Each key has its own lock; the map lock only guards key membership and is
/// never held while waiting on a key, so operations on different keys do not
/// serialize behind each other.
pub struct InMemoryKvStore {
    name: String,
    slots: RwLock<HashMap<String, Arc<Mutex<Slot>>>>,
}

impl InMemoryKvStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of keys currently tracked (expired keys count until purged).
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired key. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut slots = self.slots.write().await;
        let mut expired = Vec::new();
        for (key, slot) in slots.iter() {
            let mut guard = slot.lock().await;
            if guard.live_mut().is_none() {
                guard.removed = true;
                expired.push(key.clone());
            }
        }
        for key in &expired {
            slots.remove(key);
        }
        if !expired.is_empty() {
            debug!("store '{}': purged {} expired keys", self.name, expired.len());
        }
        expired.len()
    }

    async fn lock_slot(&self, key: &str, create: bool) -> StoreResult<OwnedMutexGuard<Slot>> {
        loop {
            let existing = self.slots.read().await.get(key).cloned();
            let slot = match existing {
                Some(slot) => slot,
                None if create => self
                    .slots
                    .write()
                    .await
                    .entry(key.to_string())
                    .or_default()
                    .clone(),
                None => return Err(StoreError::KeyNotFound(key.to_string())),
            };

            let guard = slot.lock_owned().await;
            // A concurrent delete unlinked this slot; look the key up again.
            if !guard.removed {
                return Ok(guard);
            }
        }
    }

    fn live_object<'a>(
        guard: &'a mut OwnedMutexGuard<Slot>,
        key: &str,
    ) -> StoreResult<&'a mut Map<String, Value>> {
        match guard.live_mut() {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(StoreError::NotStructured(key.to_string())),
            None => Err(StoreError::KeyNotFound(key.to_string())),
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Value> {
        let mut slot = self.lock_slot(key, false).await?;
        slot.live_mut()
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut slot = self.lock_slot(key, true).await?;
        slot.store(value, None);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;
        let mut guard = slot.lock().await;
        let was_live = guard.live_mut().is_some();
        guard.removed = true;
        slots.remove(key);

        if was_live {
            Ok(())
        } else {
            Err(StoreError::KeyNotFound(key.to_string()))
        }
    }

    async fn update(&self, key: &str, subkey: &str, value: Value) -> StoreResult<()> {
        let mut slot = self.lock_slot(key, true).await?;
        match slot.live_mut() {
            Some(Value::Object(map)) => {
                map.insert(subkey.to_string(), value);
                Ok(())
            }
            Some(_) => Err(StoreError::NotStructured(key.to_string())),
            None => {
                let mut map = Map::new();
                map.insert(subkey.to_string(), value);
                slot.store(Value::Object(map), None);
                Ok(())
            }
        }
    }

    async fn update_subfield(
        &self,
        key: &str,
        subkey: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        let mut slot = self.lock_slot(key, false).await?;
        let map = Self::live_object(&mut slot, key)?;
        match map.get_mut(subkey) {
            Some(Value::Object(element)) => {
                element.insert(field.to_string(), value);
                Ok(())
            }
            Some(_) => Err(StoreError::NotStructured(format!("{key}.{subkey}"))),
            None => Err(StoreError::SubkeyNotFound {
                key: key.to_string(),
                subkey: subkey.to_string(),
            }),
        }
    }

    async fn pop_field(&self, key: &str, subkey: &str) -> StoreResult<Value> {
        let mut slot = self.lock_slot(key, false).await?;
        let map = Self::live_object(&mut slot, key)?;
        map.shift_remove(subkey)
            .ok_or_else(|| StoreError::SubkeyNotFound {
                key: key.to_string(),
                subkey: subkey.to_string(),
            })
    }

    async fn set_with_expiry(&self, key: &str, value: Value, ttl: Duration) -> StoreResult<()> {
        let mut slot = self.lock_slot(key, true).await?;
        slot.store(value, Some(Instant::now() + ttl));
        Ok(())
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut slot = self.lock_slot(key, false).await?;
        if slot.live_mut().is_none() {
            return Err(StoreError::KeyNotFound(key.to_string()));
        }
        Ok(slot
            .expires_at
            .map(|at| at.saturating_duration_since(Instant::now())))
    }

    async fn scan(&self) -> StoreResult<Vec<(String, Value)>> {
        let handles: Vec<(String, Arc<Mutex<Slot>>)> = self
            .slots
            .read()
            .await
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();

        let mut entries = Vec::with_capacity(handles.len());
        for (key, slot) in handles {
            let mut guard = slot.lock().await;
            if guard.removed {
                continue;
            }
            if let Some(value) = guard.live_mut() {
                entries.push((key, value.clone()));
            }
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = InMemoryKvStore::new("test");
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryKvStore::new("test");
        store.set("k", json!({"a": 1})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), json!({"a": 1}));

        store.delete("k").await.unwrap();
        assert!(store.get("k").await.is_err());
        assert!(matches!(
            store.delete("k").await.unwrap_err(),
            StoreError::KeyNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_creates_outer_structure() {
        let store = InMemoryKvStore::new("test");
        store.update("actor", "e1", json!({"cpu": 1})).await.unwrap();
        store.update("actor", "e2", json!({"cpu": 2})).await.unwrap();

        let value = store.get("actor").await.unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["e1", "e2"]);
    }

    #[tokio::test]
    async fn test_update_rejects_scalar_value() {
        let store = InMemoryKvStore::new("test");
        store.set("k", json!("plain")).await.unwrap();
        let err = store.update("k", "sub", json!(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotStructured(_)));
    }

    #[tokio::test]
    async fn test_update_subfield_requires_key_and_subkey() {
        let store = InMemoryKvStore::new("test");
        let err = store
            .update_subfield("nope", "w1", "status", json!("READY"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::KeyNotFound(_)));

        store.update("actor", "w1", json!({"status": "REQUESTED"})).await.unwrap();
        let err = store
            .update_subfield("actor", "w2", "status", json!("READY"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SubkeyNotFound { .. }));

        store
            .update_subfield("actor", "w1", "status", json!("READY"))
            .await
            .unwrap();
        assert_eq!(
            store.get("actor").await.unwrap()["w1"]["status"],
            json!("READY")
        );
    }

    #[tokio::test]
    async fn test_pop_field_keeps_remaining_order() {
        let store = InMemoryKvStore::new("test");
        for name in ["a", "b", "c"] {
            store.update("k", name, json!({})).await.unwrap();
        }
        store.pop_field("k", "a").await.unwrap();
        let value = store.get("k").await.unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "c"]);

        let err = store.pop_field("k", "a").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_expiry() {
        let store = InMemoryKvStore::new("logs");
        store
            .set_with_expiry("short", json!("x"), Duration::from_millis(20))
            .await
            .unwrap();
        store
            .set_with_expiry("long", json!("y"), Duration::from_secs(3600))
            .await
            .unwrap();
        store.set("forever", json!("z")).await.unwrap();

        assert!(store.ttl("long").await.unwrap().is_some());
        assert_eq!(store.ttl("forever").await.unwrap(), None);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(store.get("short").await.is_err());
        assert_eq!(store.get("long").await.unwrap(), json!("y"));
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_set_clears_expiry() {
        let store = InMemoryKvStore::new("logs");
        store
            .set_with_expiry("k", json!(1), Duration::from_secs(10))
            .await
            .unwrap();
        store.set("k", json!(2)).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_is_sorted_and_skips_deleted() {
        let store = InMemoryKvStore::new("test");
        store.set("b", json!(2)).await.unwrap();
        store.set("a", json!(1)).await.unwrap();
        store.set("c", json!(3)).await.unwrap();
        store.delete("c").await.unwrap();

        let entries = store.scan().await.unwrap();
        assert_eq!(
            entries,
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
        );
    }

    #[tokio::test]
    async fn test_concurrent_updates_on_distinct_subkeys() {
        let store = Arc::new(InMemoryKvStore::new("workers"));
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update("actor", &format!("w{i}"), json!({"n": i}))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let value = store.get("actor").await.unwrap();
        assert_eq!(value.as_object().unwrap().len(), 20);
    }
}
