use super::actor::Actor;
use super::schema::{Derived, FieldSource, FieldSpec, Record, counter, require};
use crate::core::{Result, display_id};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Aggregate usage over an actor's execution history. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionsSummary {
    pub db_id: String,
    pub actor_id: String,
    pub api_server: String,
    pub owner: String,
    /// Execution ids in collection order.
    pub ids: Vec<String>,
    pub total_executions: u64,
    pub total_io: u64,
    pub total_runtime: u64,
    pub total_cpu: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryDraft {
    pub db_id: Option<String>,
}

impl SummaryDraft {
    pub fn new(db_id: impl Into<String>) -> Self {
        Self {
            db_id: Some(db_id.into()),
        }
    }
}

#[derive(Deserialize)]
struct Usage {
    #[serde(deserialize_with = "counter::deserialize")]
    runtime: u64,
    #[serde(deserialize_with = "counter::deserialize")]
    cpu: u64,
    #[serde(deserialize_with = "counter::deserialize")]
    io: u64,
}

/// Every summary field that needs the execution scan, derived in one pass.
#[derive(Debug, Clone, Default)]
struct SummaryTotals {
    ids: Vec<String>,
    executions: u64,
    io: u64,
    runtime: u64,
    cpu: u64,
}

impl SummaryTotals {
    fn scan(executions: &Map<String, Value>) -> Result<Self> {
        let mut totals = Self::default();
        for (id, value) in executions {
            let usage = Usage::deserialize(value)?;
            totals.ids.push(id.clone());
            totals.executions += 1;
            totals.cpu = totals.cpu.saturating_add(usage.cpu);
            totals.io = totals.io.saturating_add(usage.io);
            totals.runtime = totals.runtime.saturating_add(usage.runtime);
        }
        Ok(totals)
    }
}

impl ExecutionsSummary {
    /// Build the summary for `actor` from its execution sub-collection.
    pub fn from_draft(
        draft: SummaryDraft,
        actor: &Actor,
        executions: &Map<String, Value>,
    ) -> Result<Self> {
        let db_id = require(draft.db_id, "db_id")?;

        let mut totals = Derived::new();
        let SummaryTotals {
            ids,
            executions: total_executions,
            io,
            runtime,
            cpu,
        } = totals.resolve(None, || SummaryTotals::scan(executions))?;

        Ok(Self {
            actor_id: display_id(&actor.tenant, &db_id).to_string(),
            db_id,
            api_server: actor.api_server.clone(),
            owner: actor.owner.clone(),
            ids,
            total_executions,
            total_io: io,
            total_runtime: runtime,
            total_cpu: cpu,
        })
    }
}

impl Record for ExecutionsSummary {
    const KIND: &'static str = "executions summary";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("db_id", FieldSource::Required, "Primary key in the database for the associated actor."),
        FieldSpec::new("api_server", FieldSource::Derived, "Base URL for the tenant of the associated actor."),
        FieldSpec::new("actor_id", FieldSource::Derived, "Human readable id of the actor."),
        FieldSpec::new("owner", FieldSource::Derived, "The user who created the associated actor."),
        FieldSpec::new("ids", FieldSource::Derived, "List of all execution ids."),
        FieldSpec::new("total_executions", FieldSource::Derived, "Total number of executions."),
        FieldSpec::new("total_io", FieldSource::Derived, "Block I/O usage of all executions."),
        FieldSpec::new("total_runtime", FieldSource::Derived, "Runtime, in milliseconds, of all executions."),
        FieldSpec::new("total_cpu", FieldSource::Derived, "CPU usage, in user jiffies, of all executions."),
    ];
    type Draft = SummaryDraft;
}
