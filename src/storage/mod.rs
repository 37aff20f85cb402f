pub mod engine;
pub mod memory;
pub mod persistence;
pub mod stores;

pub use engine::KvStore;
pub use memory::InMemoryKvStore;
pub use persistence::{SnapshotManager, SnapshotMetadata, StoreSnapshot};
pub use stores::{Namespace, StoreSet};
