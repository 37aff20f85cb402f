use crate::core::{
    ExecutionStatus, IdKind, RegistryError, Result, StoreError, StoreResultExt, TaggedId,
};
use crate::record::{
    Actor, Execution, ExecutionDraft, ExecutionStats, ExecutionsSummary, Record, SummaryDraft,
};
use crate::storage::{KvStore, StoreSet};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, event};

/// Execution history per actor plus the execution logs.
///
/// Executions live in a sub-collection under the actor's db-key, one entry
/// per execution id. Logs live in their own namespace keyed by execution id
/// alone, which is safe because execution ids are globally unique.
#[derive(Clone)]
pub struct ExecutionLedger {
    actors: Arc<dyn KvStore>,
    executions: Arc<dyn KvStore>,
    logs: Arc<dyn KvStore>,
    log_expiry: Option<Duration>,
}

impl ExecutionLedger {
    pub fn new(stores: &StoreSet) -> Self {
        Self {
            actors: stores.actors(),
            executions: stores.executions(),
            logs: stores.logs(),
            log_expiry: None,
        }
    }

    /// Default time to live for logs written without an explicit expiry.
    pub fn with_log_expiry(mut self, log_expiry: Option<Duration>) -> Self {
        self.log_expiry = log_expiry.filter(|ttl| !ttl.is_zero());
        self
    }

    pub fn log_expiry(&self) -> Option<Duration> {
        self.log_expiry
    }

    async fn actor(&self, db_key: &str) -> Result<Actor> {
        let value = self.actors.get(db_key).await.or_not_found("Actor", db_key)?;
        Ok(Actor::from_stored(value)?)
    }

    /// Record a new execution for the actor at `db_key` and return its id.
    ///
    /// The actor's tenant and api_server are stamped onto the input. The
    /// actor's execution collection is created on first use. Drafts with a
    /// terminal status or a caller-chosen id are rejected before any read.
    pub async fn add_execution(&self, db_key: &str, draft: ExecutionDraft) -> Result<String> {
        draft.check_new()?;
        let actor = self.actor(db_key).await?;
        let execution = Execution::from_draft(ExecutionDraft {
            tenant: Some(actor.tenant),
            api_server: Some(actor.api_server),
            actor_id: Some(db_key.to_string()),
            ..draft
        })?;

        self.executions
            .update(db_key, &execution.id, execution.to_stored()?)
            .await?;
        event!(Level::DEBUG, db_key = %db_key, execution_id = %execution.id, "execution added");
        Ok(execution.id)
    }

    /// [`add_execution`](Self::add_execution) for untyped caller input.
    pub async fn add_execution_fields(
        &self,
        db_key: &str,
        fields: Map<String, Value>,
    ) -> Result<String> {
        self.add_execution(db_key, ExecutionDraft::from_fields(fields)?)
            .await
    }

    /// Move an execution to its terminal status and write its final usage.
    ///
    /// Input is checked before anything is written. The four fields are
    /// written one at a time; a store failure midway leaves the status
    /// written without the stats.
    pub async fn finalize_execution(
        &self,
        db_key: &str,
        exec_id: &str,
        status: ExecutionStatus,
        stats: ExecutionStats,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(RegistryError::validation(format!(
                "Cannot finalize execution with non-terminal status {status}"
            )));
        }
        let stats = stats.complete()?;

        let writes = [
            ("status", serde_json::to_value(status)?),
            ("io", Value::from(stats.io)),
            ("cpu", Value::from(stats.cpu)),
            ("runtime", Value::from(stats.runtime)),
        ];
        for (field, value) in writes {
            self.executions
                .update_subfield(db_key, exec_id, field, value)
                .await
                .or_not_found("Execution", exec_id)?;
        }
        event!(
            Level::DEBUG,
            db_key = %db_key,
            execution_id = %exec_id,
            status = %status,
            "execution finalized"
        );
        Ok(())
    }

    /// Aggregate usage over the actor's executions. Read-only.
    pub async fn summarize(&self, db_key: &str) -> Result<ExecutionsSummary> {
        let actor = self.actor(db_key).await?;
        let executions = self.collection(db_key).await?;
        ExecutionsSummary::from_draft(SummaryDraft::new(db_key), &actor, &executions)
    }

    pub async fn get_execution(&self, db_key: &str, exec_id: &str) -> Result<Execution> {
        let mut executions = self.collection(db_key).await?;
        let value = executions
            .remove(exec_id)
            .ok_or_else(|| RegistryError::not_found("Execution", exec_id))?;
        Ok(Execution::from_stored(value)?)
    }

    /// Every execution of the actor, in the order they were added.
    pub async fn list_executions(&self, db_key: &str) -> Result<Vec<Execution>> {
        self.collection(db_key)
            .await?
            .into_iter()
            .map(|(_, value)| Execution::from_stored(value).map_err(RegistryError::from))
            .collect()
    }

    /// Store the logs of one execution.
    ///
    /// `expiry_seconds` overrides the configured log expiry; a non-positive
    /// value, or none at all, stores the logs without expiry.
    pub async fn set_logs(
        &self,
        exec_id: &str,
        logs: impl Into<String>,
        expiry_seconds: Option<i64>,
    ) -> Result<()> {
        check_log_key(exec_id)?;
        let ttl = match expiry_seconds {
            Some(seconds) => u64::try_from(seconds)
                .ok()
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            None => self.log_expiry,
        };

        let logs = Value::String(logs.into());
        match ttl {
            Some(ttl) => self.logs.set_with_expiry(exec_id, logs, ttl).await?,
            None => self.logs.set(exec_id, logs).await?,
        }
        event!(Level::DEBUG, execution_id = %exec_id, ttl = ?ttl, "execution logs stored");
        Ok(())
    }

    pub async fn get_logs(&self, exec_id: &str) -> Result<String> {
        match self.logs.get(exec_id).await.or_not_found("Logs", exec_id)? {
            Value::String(logs) => Ok(logs),
            other => Ok(other.to_string()),
        }
    }

    /// Remove the actor's whole execution collection. Missing collections are fine.
    pub(crate) async fn purge(&self, db_key: &str) -> Result<()> {
        match self.executions.delete(db_key).await {
            Err(err) if !err.is_not_found() => Err(err.into()),
            _ => Ok(()),
        }
    }

    async fn collection(&self, db_key: &str) -> Result<Map<String, Value>> {
        match self.executions.get(db_key).await {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) => Err(StoreError::NotStructured(db_key.to_string()).into()),
            Err(err) if err.is_not_found() => Ok(Map::new()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Log keys share one namespace across kinds; refuse ids that are clearly
/// some other record's.
fn check_log_key(exec_id: &str) -> Result<()> {
    if exec_id.is_empty() {
        return Err(RegistryError::validation("Required field exec_id missing"));
    }
    match TaggedId::kind_of(exec_id) {
        Some(kind) if kind != IdKind::Execution => Err(RegistryError::validation(format!(
            "'{exec_id}' is a {kind} id, not an execution id"
        ))),
        _ => Ok(()),
    }
}
