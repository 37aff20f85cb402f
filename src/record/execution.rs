use super::schema::{FieldSource, FieldSpec, Record, counter, parse_draft, require};
use crate::core::{ExecutionStatus, IdKind, RegistryError, Result, TaggedId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One run of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    /// db-key of the owning actor.
    pub actor_id: String,
    pub tenant: String,
    pub api_server: String,
    #[serde(default)]
    pub executor: Option<String>,
    /// Runtime in milliseconds.
    #[serde(deserialize_with = "counter::deserialize")]
    pub runtime: u64,
    /// CPU usage in user jiffies.
    #[serde(deserialize_with = "counter::deserialize")]
    pub cpu: u64,
    /// Block I/O in 512-byte sectors read and written.
    #[serde(deserialize_with = "counter::deserialize")]
    pub io: u64,
    #[serde(default)]
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionDraft {
    pub tenant: Option<String>,
    pub api_server: Option<String>,
    pub actor_id: Option<String>,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(default, deserialize_with = "counter::option::deserialize")]
    pub runtime: Option<u64>,
    #[serde(default, deserialize_with = "counter::option::deserialize")]
    pub cpu: Option<u64>,
    #[serde(default, deserialize_with = "counter::option::deserialize")]
    pub io: Option<u64>,
    #[serde(default)]
    pub status: ExecutionStatus,
    pub id: Option<String>,
}

impl ExecutionDraft {
    /// Usage counters as recorded when the execution is submitted.
    pub fn with_usage(runtime: u64, cpu: u64, io: u64) -> Self {
        Self {
            runtime: Some(runtime),
            cpu: Some(cpu),
            io: Some(io),
            ..Self::default()
        }
    }

    pub fn executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    /// Decode partial caller input; mandatory fields are checked later by
    /// [`Execution::from_draft`], after the ledger stamps the actor context.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| RegistryError::validation(format!("Invalid execution fields: {e}")))
    }

    /// New executions start non-terminal and always get a ledger-assigned id.
    /// Only finalize moves an execution to a terminal status.
    pub fn check_new(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(RegistryError::validation(format!(
                "A new execution cannot start in terminal status {}",
                self.status
            )));
        }
        if self.id.as_deref().is_some_and(|id| !id.is_empty()) {
            return Err(RegistryError::validation(
                "Execution ids are assigned by the ledger",
            ));
        }
        Ok(())
    }
}

impl Execution {
    pub fn from_draft(draft: ExecutionDraft) -> Result<Self> {
        draft.check_new()?;
        let tenant = require(draft.tenant, "tenant")?;
        let api_server = require(draft.api_server, "api_server")?;
        let actor_id = require(draft.actor_id, "actor_id")?;
        let runtime = require(draft.runtime, "runtime")?;
        let cpu = require(draft.cpu, "cpu")?;
        let io = require(draft.io, "io")?;

        Ok(Self {
            id: TaggedId::generate(IdKind::Execution).to_string(),
            actor_id,
            tenant,
            api_server,
            executor: draft.executor,
            runtime,
            cpu,
            io,
            status: draft.status,
        })
    }

    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        Self::from_draft(parse_draft::<Self>(fields)?)
    }
}

impl Record for Execution {
    const KIND: &'static str = "execution";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("tenant", FieldSource::Provided, "The tenant that this execution belongs to."),
        FieldSpec::new("api_server", FieldSource::Provided, "Base URL for the tenant of the actor."),
        FieldSpec::new("actor_id", FieldSource::Provided, "db-key of the actor associated with this execution."),
        FieldSpec::new("executor", FieldSource::Optional, "The user who triggered this execution."),
        FieldSpec::new("runtime", FieldSource::Required, "Runtime, in milliseconds, of the execution."),
        FieldSpec::new("cpu", FieldSource::Required, "CPU usage, in user jiffies, of the execution."),
        FieldSpec::new("io", FieldSource::Required, "Block I/O usage, in 512-byte sectors, of the execution."),
        FieldSpec::new("status", FieldSource::Optional, "Status of the execution."),
        FieldSpec::new("id", FieldSource::Derived, "Human readable id for this execution."),
    ];
    type Draft = ExecutionDraft;
}

/// Final usage figures written by `finalize_execution`.
///
/// All three counters are mandatory; the `Option`s exist so that input from
/// untyped callers can be checked before anything is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionStats {
    #[serde(default, deserialize_with = "counter::option::deserialize")]
    pub io: Option<u64>,
    #[serde(default, deserialize_with = "counter::option::deserialize")]
    pub cpu: Option<u64>,
    #[serde(default, deserialize_with = "counter::option::deserialize")]
    pub runtime: Option<u64>,
}

/// [`ExecutionStats`] with every counter present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteStats {
    pub io: u64,
    pub cpu: u64,
    pub runtime: u64,
}

impl ExecutionStats {
    pub fn new(io: u64, cpu: u64, runtime: u64) -> Self {
        Self {
            io: Some(io),
            cpu: Some(cpu),
            runtime: Some(runtime),
        }
    }

    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| RegistryError::validation(format!("Invalid execution stats: {e}")))
    }

    pub fn complete(self) -> Result<CompleteStats> {
        let missing = |name: &str| {
            RegistryError::validation(format!("'{name}' parameter required to finalize execution."))
        };
        Ok(CompleteStats {
            io: self.io.ok_or_else(|| missing("io"))?,
            cpu: self.cpu.ok_or_else(|| missing("cpu"))?,
            runtime: self.runtime.ok_or_else(|| missing("runtime"))?,
        })
    }
}
