pub mod actors;
pub mod executions;
pub mod permissions;
pub mod subscriptions;
pub mod workers;

pub use actors::{ActorRegistry, ActorUpdate};
pub use executions::ExecutionLedger;
pub use permissions::PermissionRegistry;
pub use subscriptions::SubscriptionRegistry;
pub use workers::WorkerRegistry;
