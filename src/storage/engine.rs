use crate::core::StoreResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Key-value engine backing the registries.
///
/// Every operation is linearizable per key. Values are JSON documents; the
/// structured operations (`update`, `update_subfield`, `pop_field`) treat the
/// value at a key as an object whose entries can be changed one at a time,
/// so writers touching different entries of the same key never clobber each
/// other.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the whole value at `key`.
    async fn get(&self, key: &str) -> StoreResult<Value>;

    /// Whole-value upsert. Clears any expiry.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Remove `key`; fails with `KeyNotFound` if absent.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Upsert one entry of the object at `key`, creating the object if absent.
    async fn update(&self, key: &str, subkey: &str, value: Value) -> StoreResult<()>;

    /// Set one field of one entry; the key and the entry must both exist.
    async fn update_subfield(
        &self,
        key: &str,
        subkey: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()>;

    /// Remove one entry of the object at `key` and return it.
    async fn pop_field(&self, key: &str, subkey: &str) -> StoreResult<Value>;

    /// Whole-value upsert that expires after `ttl`.
    async fn set_with_expiry(&self, key: &str, value: Value, ttl: Duration) -> StoreResult<()>;

    /// Remaining time to live, `None` when the key never expires.
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// All live entries.
    async fn scan(&self) -> StoreResult<Vec<(String, Value)>>;
}
