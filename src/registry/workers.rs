use crate::core::{RegistryError, Result, StoreError, StoreResultExt, WorkerStatus};
use crate::record::{Record, Worker};
use crate::storage::{KvStore, StoreSet};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{Level, event};

/// Workers per actor, one sub-collection entry per `ch_name`.
///
/// Every mutation touches exactly one entry (or one field of one entry)
/// through the store's atomic primitives, so lifecycle processes working on
/// different workers of the same actor never overwrite each other.
#[derive(Clone)]
pub struct WorkerRegistry {
    workers: Arc<dyn KvStore>,
}

impl WorkerRegistry {
    pub fn new(stores: &StoreSet) -> Self {
        Self {
            workers: stores.workers(),
        }
    }

    /// All workers of the actor keyed by ch_name; empty when it has none.
    pub async fn get_workers(&self, db_key: &str) -> Result<BTreeMap<String, Worker>> {
        let entries = match self.workers.get(db_key).await {
            Ok(Value::Object(entries)) => entries,
            Ok(_) => return Err(StoreError::NotStructured(db_key.to_string()).into()),
            Err(err) if err.is_not_found() => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        entries
            .into_iter()
            .map(|(ch_name, value)| {
                Worker::from_stored(value)
                    .map(|worker| (ch_name, worker))
                    .map_err(RegistryError::from)
            })
            .collect()
    }

    pub async fn get_worker(&self, db_key: &str, ch_name: &str) -> Result<Worker> {
        let mut workers = self.get_workers(db_key).await?;
        workers
            .remove(ch_name)
            .ok_or_else(|| RegistryError::WorkerNotFound(ch_name.to_string()))
    }

    /// Insert or replace one worker.
    pub async fn add_worker(&self, db_key: &str, worker: &Worker) -> Result<()> {
        self.workers
            .update(db_key, &worker.ch_name, worker.to_stored()?)
            .await?;
        event!(Level::DEBUG, db_key = %db_key, ch_name = %worker.ch_name, "worker added");
        Ok(())
    }

    pub async fn delete_worker(&self, db_key: &str, ch_name: &str) -> Result<()> {
        self.workers
            .pop_field(db_key, ch_name)
            .await
            .or_worker_not_found(ch_name)?;
        event!(Level::DEBUG, db_key = %db_key, ch_name = %ch_name, "worker deleted");
        Ok(())
    }

    /// Stamp `last_execution` and `last_update` with the current time.
    pub async fn update_worker_execution_time(&self, db_key: &str, ch_name: &str) -> Result<()> {
        let now = serde_json::to_value(Utc::now())?;
        for field in ["last_execution", "last_update"] {
            self.workers
                .update_subfield(db_key, ch_name, field, now.clone())
                .await
                .or_worker_not_found(ch_name)?;
        }
        event!(Level::TRACE, db_key = %db_key, ch_name = %ch_name, "worker execution time updated");
        Ok(())
    }

    /// Blind write of the status field; see [`WorkerStatus::can_transition_to`]
    /// for callers that want to enforce the lifecycle.
    pub async fn update_worker_status(
        &self,
        db_key: &str,
        ch_name: &str,
        status: WorkerStatus,
    ) -> Result<()> {
        self.workers
            .update_subfield(db_key, ch_name, "status", serde_json::to_value(status)?)
            .await
            .or_worker_not_found(ch_name)?;
        event!(Level::DEBUG, db_key = %db_key, ch_name = %ch_name, status = %status, "worker status updated");
        Ok(())
    }

    /// Remove the actor's whole worker collection. Missing collections are fine.
    pub(crate) async fn purge(&self, db_key: &str) -> Result<()> {
        match self.workers.delete(db_key).await {
            Err(err) if !err.is_not_found() => Err(err.into()),
            _ => Ok(()),
        }
    }
}
