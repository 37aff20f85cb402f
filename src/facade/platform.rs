use crate::connection::StoreConfig;
use crate::core::Result;
use crate::registry::{
    ActorRegistry, ExecutionLedger, PermissionRegistry, SubscriptionRegistry, WorkerRegistry,
};
use crate::storage::{SnapshotManager, SnapshotMetadata, StoreSet};
use tracing::{Instrument, Level, event, info_span};

/// Every registry wired over one shared [`StoreSet`].
///
/// This is what a process entry point constructs once and hands to its
/// request handlers and lifecycle tasks. Cloning is cheap; clones share the
/// same stores.
///
/// # Examples
///
/// ```
/// use actorstore::{ActorDraft, ActorPlatform, ExecutionDraft};
///
/// # tokio_test::block_on(async {
/// let platform = ActorPlatform::in_memory();
/// let actor = platform
///     .actors()
///     .create(
///         ActorDraft::new("echo", "abaco/echo")
///             .tenant("t1")
///             .owner("alice")
///             .api_server("https://api.example.org"),
///     )
///     .await
///     .unwrap();
///
/// platform
///     .executions()
///     .add_execution(&actor.db_id, ExecutionDraft::with_usage(120, 30, 5))
///     .await
///     .unwrap();
/// let summary = platform.executions().summarize(&actor.db_id).await.unwrap();
/// assert_eq!(summary.total_executions, 1);
/// # });
/// ```
#[derive(Clone)]
pub struct ActorPlatform {
    stores: StoreSet,
    config: StoreConfig,
    actors: ActorRegistry,
    executions: ExecutionLedger,
    workers: WorkerRegistry,
    subscriptions: SubscriptionRegistry,
    permissions: PermissionRegistry,
}

impl ActorPlatform {
    pub fn new(stores: StoreSet, config: StoreConfig) -> Self {
        Self {
            actors: ActorRegistry::new(&stores),
            executions: ExecutionLedger::new(&stores).with_log_expiry(config.log_expiry),
            workers: WorkerRegistry::new(&stores),
            subscriptions: SubscriptionRegistry::new(&stores),
            permissions: PermissionRegistry::new(&stores),
            stores,
            config,
        }
    }

    /// Fresh in-memory stores with the default configuration.
    pub fn in_memory() -> Self {
        Self::new(StoreSet::in_memory(), StoreConfig::default())
    }

    /// In-memory stores, restored from the configured snapshot when one exists.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let platform = Self::new(StoreSet::in_memory(), config);
        if let Some(manager) = platform.snapshot_manager() {
            if let Some(restored) = manager.recover(&platform.stores).await? {
                event!(
                    Level::INFO,
                    path = %manager.path().display(),
                    keys = restored,
                    "stores restored from snapshot"
                );
            }
        }
        Ok(platform)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }

    pub fn executions(&self) -> &ExecutionLedger {
        &self.executions
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub fn permissions(&self) -> &PermissionRegistry {
        &self.permissions
    }

    fn snapshot_manager(&self) -> Option<SnapshotManager> {
        self.config.snapshot_path.as_ref().map(SnapshotManager::new)
    }

    /// Write every namespace to the configured snapshot file.
    /// Returns `None` when no snapshot path is configured.
    pub async fn checkpoint(&self) -> Result<Option<SnapshotMetadata>> {
        let Some(manager) = self.snapshot_manager() else {
            return Ok(None);
        };
        let metadata = manager.checkpoint(&self.stores).await?;
        event!(
            Level::INFO,
            path = %manager.path().display(),
            keys = metadata.key_count,
            "checkpoint written"
        );
        Ok(Some(metadata))
    }

    /// Delete an actor together with its executions, workers and
    /// permissions. Sub-collections that do not exist are skipped; the actor
    /// itself must exist.
    pub async fn delete_actor_cascade(&self, db_key: &str) -> Result<()> {
        let span = info_span!("actor.delete_cascade", db_key = %db_key);
        async {
            self.actors.get(db_key).await?;

            futures::try_join!(
                self.executions.purge(db_key),
                self.workers.purge(db_key),
                self.permissions.delete_permissions(db_key),
            )?;

            self.actors.delete(db_key).await?;
            event!(Level::DEBUG, "actor and dependents deleted");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
