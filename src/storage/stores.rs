use super::{InMemoryKvStore, KvStore};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Logical stores the registries write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Actor records keyed by db-key.
    Actors,
    /// Per-actor execution sub-collections keyed by db-key.
    Executions,
    /// Per-actor worker sub-collections keyed by db-key.
    Workers,
    /// Execution logs keyed by execution id.
    Logs,
    /// Per-actor permission lists keyed by db-key.
    Permissions,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Self::Actors,
        Self::Executions,
        Self::Workers,
        Self::Logs,
        Self::Permissions,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actors => "actors",
            Self::Executions => "executions",
            Self::Workers => "workers",
            Self::Logs => "logs",
            Self::Permissions => "permissions",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| format!("unknown namespace '{s}'"))
    }
}

/// One store client per namespace, shared by every registry.
///
/// Cloning is cheap; clones talk to the same stores.
#[derive(Clone)]
pub struct StoreSet {
    actors: Arc<dyn KvStore>,
    executions: Arc<dyn KvStore>,
    workers: Arc<dyn KvStore>,
    logs: Arc<dyn KvStore>,
    permissions: Arc<dyn KvStore>,
}

impl StoreSet {
    pub fn new(
        actors: Arc<dyn KvStore>,
        executions: Arc<dyn KvStore>,
        workers: Arc<dyn KvStore>,
        logs: Arc<dyn KvStore>,
        permissions: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            actors,
            executions,
            workers,
            logs,
            permissions,
        }
    }

    /// Fresh in-process stores for every namespace.
    pub fn in_memory() -> Self {
        let store = |ns: Namespace| -> Arc<dyn KvStore> { Arc::new(InMemoryKvStore::new(ns.as_str())) };
        Self::new(
            store(Namespace::Actors),
            store(Namespace::Executions),
            store(Namespace::Workers),
            store(Namespace::Logs),
            store(Namespace::Permissions),
        )
    }

    pub fn get(&self, namespace: Namespace) -> &Arc<dyn KvStore> {
        match namespace {
            Namespace::Actors => &self.actors,
            Namespace::Executions => &self.executions,
            Namespace::Workers => &self.workers,
            Namespace::Logs => &self.logs,
            Namespace::Permissions => &self.permissions,
        }
    }

    pub fn actors(&self) -> Arc<dyn KvStore> {
        self.actors.clone()
    }

    pub fn executions(&self) -> Arc<dyn KvStore> {
        self.executions.clone()
    }

    pub fn workers(&self) -> Arc<dyn KvStore> {
        self.workers.clone()
    }

    pub fn logs(&self) -> Arc<dyn KvStore> {
        self.logs.clone()
    }

    pub fn permissions(&self) -> Arc<dyn KvStore> {
        self.permissions.clone()
    }
}
