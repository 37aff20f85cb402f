pub mod error;
pub mod ids;
pub mod types;

pub use error::{RegistryError, Result, StoreError, StoreResult};
pub(crate) use error::StoreResultExt;
pub use ids::{IdKind, KEY_SEPARATOR, TaggedId, db_key, display_id};
pub use types::{ActorStatus, ExecutionStatus, PermissionLevel, WorkerStatus};
