// ============================================================================
// actorstore Library
// ============================================================================

pub mod connection;
pub mod core;
pub mod facade;
pub mod record;
pub mod registry;
pub mod storage;

// Re-export main types for convenience
pub use crate::connection::StoreConfig;
pub use crate::core::{
    ActorStatus, ExecutionStatus, IdKind, PermissionLevel, RegistryError, Result, StoreError,
    StoreResult, TaggedId, WorkerStatus, db_key, display_id,
};
pub use crate::facade::ActorPlatform;
pub use crate::record::{
    Actor, ActorDraft, Execution, ExecutionDraft, ExecutionStats, ExecutionsSummary,
    PermissionEntry, Record, Subscription, SubscriptionEvent, Worker, WorkerDraft,
};
pub use crate::registry::{
    ActorRegistry, ActorUpdate, ExecutionLedger, PermissionRegistry, SubscriptionRegistry,
    WorkerRegistry,
};
pub use crate::storage::{InMemoryKvStore, KvStore, Namespace, SnapshotManager, StoreSet};
