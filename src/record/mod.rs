pub mod actor;
pub mod execution;
pub mod permission;
pub mod schema;
pub mod subscription;
pub mod summary;
pub mod worker;

pub use actor::{Actor, ActorDraft};
pub use execution::{CompleteStats, Execution, ExecutionDraft, ExecutionStats};
pub use permission::{PermissionDraft, PermissionEntry};
pub use schema::{Derived, FieldSource, FieldSpec, Record, parse_draft, require};
pub use subscription::{
    EventPattern, Subscription, SubscriptionDraft, SubscriptionEvent, next_subscription_id,
};
pub use summary::{ExecutionsSummary, SummaryDraft};
pub use worker::{Worker, WorkerDraft};
