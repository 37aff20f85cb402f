use crate::core::{PermissionLevel, Result, StoreResultExt};
use crate::record::PermissionEntry;
use crate::storage::{KvStore, StoreSet};
use std::sync::Arc;
use tracing::{Level, event};

/// Per-actor permission lists, stored as a whole list under the actor's db-key.
#[derive(Clone)]
pub struct PermissionRegistry {
    permissions: Arc<dyn KvStore>,
}

impl PermissionRegistry {
    pub fn new(stores: &StoreSet) -> Self {
        Self {
            permissions: stores.permissions(),
        }
    }

    pub async fn get_permissions(&self, db_key: &str) -> Result<Vec<PermissionEntry>> {
        let value = self
            .permissions
            .get(db_key)
            .await
            .or_not_found("Permissions", db_key)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Grant `level` to `user`. A pair that is already present is left alone.
    ///
    /// Reads and rewrites the whole list; concurrent adds may lose one another.
    pub async fn add_permission(
        &self,
        user: &str,
        db_key: &str,
        level: PermissionLevel,
    ) -> Result<()> {
        let mut permissions = match self.get_permissions(db_key).await {
            Ok(permissions) => permissions,
            Err(err) if err.is_not_found() => Vec::new(),
            Err(err) => return Err(err),
        };

        let entry = PermissionEntry::new(user, level);
        if permissions.contains(&entry) {
            return Ok(());
        }
        permissions.push(entry);
        self.permissions
            .set(db_key, serde_json::to_value(&permissions)?)
            .await?;
        event!(Level::DEBUG, db_key = %db_key, user = %user, level = %level, "permission added");
        Ok(())
    }

    /// Drop the actor's permission list. Missing lists are fine.
    pub async fn delete_permissions(&self, db_key: &str) -> Result<()> {
        match self.permissions.delete(db_key).await {
            Err(err) if !err.is_not_found() => Err(err.into()),
            _ => {
                event!(Level::DEBUG, db_key = %db_key, "permissions deleted");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_list_is_not_found() {
        let registry = PermissionRegistry::new(&StoreSet::in_memory());
        assert!(registry.get_permissions("t1_a1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_same_user_different_levels_are_distinct() {
        let registry = PermissionRegistry::new(&StoreSet::in_memory());
        registry
            .add_permission("bob", "t1_a1", PermissionLevel::Read)
            .await
            .unwrap();
        registry
            .add_permission("bob", "t1_a1", PermissionLevel::Update)
            .await
            .unwrap();
        let permissions = registry.get_permissions("t1_a1").await.unwrap();
        assert_eq!(permissions.len(), 2);

        registry.delete_permissions("t1_a1").await.unwrap();
        registry.delete_permissions("t1_a1").await.unwrap();
        assert!(registry.get_permissions("t1_a1").await.is_err());
    }
}
