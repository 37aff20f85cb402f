use super::schema::{FieldSource, FieldSpec, Record, require};
use crate::core::{IdKind, Result, TaggedId, WorkerStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A worker serving one actor, stored under the actor's worker collection
/// keyed by `ch_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub ch_name: String,
    pub tenant: String,
    pub image: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub status: WorkerStatus,
    #[serde(default)]
    pub host_id: String,
    #[serde(default)]
    pub host_ip: String,
    #[serde(default)]
    pub last_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerDraft {
    pub tenant: Option<String>,
    pub image: Option<Vec<String>>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub status: WorkerStatus,
    #[serde(default)]
    pub host_id: String,
    #[serde(default)]
    pub host_ip: String,
    #[serde(default)]
    pub last_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ch_name: Option<String>,
}

impl WorkerDraft {
    pub fn new(tenant: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            image: Some(vec![image.into()]),
            ..Self::default()
        }
    }

    pub fn ch_name(mut self, ch_name: impl Into<String>) -> Self {
        self.ch_name = Some(ch_name.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn cid(mut self, cid: impl Into<String>) -> Self {
        self.cid = cid.into();
        self
    }

    pub fn status(mut self, status: WorkerStatus) -> Self {
        self.status = status;
        self
    }

    pub fn host(mut self, host_id: impl Into<String>, host_ip: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self.host_ip = host_ip.into();
        self
    }
}

impl Worker {
    pub fn from_draft(draft: WorkerDraft) -> Result<Self> {
        let tenant = require(draft.tenant, "tenant")?;
        let image = require(draft.image, "image")?;

        let ch_name = draft
            .ch_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| TaggedId::generate(IdKind::Worker).to_string());

        Ok(Self {
            ch_name,
            tenant,
            image,
            location: draft.location,
            cid: draft.cid,
            status: draft.status,
            host_id: draft.host_id,
            host_ip: draft.host_ip,
            last_execution: draft.last_execution,
            last_update: draft.last_update,
        })
    }
}

impl Record for Worker {
    const KIND: &'static str = "worker";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("tenant", FieldSource::Provided, "The tenant that this worker belongs to."),
        FieldSpec::new("image", FieldSource::Required, "The list of images associated with this worker."),
        FieldSpec::new("location", FieldSource::Optional, "The location of the container daemon used by this worker."),
        FieldSpec::new("cid", FieldSource::Optional, "The container id of this worker."),
        FieldSpec::new("status", FieldSource::Optional, "Status of the worker."),
        FieldSpec::new("host_id", FieldSource::Optional, "Id of the host where the worker is running."),
        FieldSpec::new("host_ip", FieldSource::Optional, "Ip of the host where the worker is running."),
        FieldSpec::new("last_execution", FieldSource::Optional, "Last time the worker ran an execution."),
        FieldSpec::new("last_update", FieldSource::Optional, "Last time the worker reported in."),
        FieldSpec::new("ch_name", FieldSource::Derived, "The worker id and the name of its channel."),
    ];
    type Draft = WorkerDraft;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RegistryError;
    use serde_json::json;

    #[test]
    fn test_generated_ch_name_is_worker_kind() {
        let worker = Worker::from_draft(WorkerDraft::new("t1", "abaco/echo")).unwrap();
        assert_eq!(TaggedId::kind_of(&worker.ch_name), Some(IdKind::Worker));
        assert_eq!(worker.status, WorkerStatus::Requested);
        assert!(worker.last_execution.is_none());
    }

    #[test]
    fn test_supplied_ch_name_is_kept() {
        let worker = Worker::from_draft(
            WorkerDraft::new("t1", "abaco/echo")
                .ch_name("w1")
                .location("unix:///var/run/docker.sock")
                .cid("c0ffee"),
        )
        .unwrap();
        assert_eq!(worker.ch_name, "w1");
        assert_eq!(worker.cid, "c0ffee");
    }

    #[test]
    fn test_image_is_required() {
        let draft = WorkerDraft {
            tenant: Some("t1".into()),
            ..WorkerDraft::default()
        };
        assert!(matches!(
            Worker::from_draft(draft),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_stored_timestamps_decode() {
        let worker = Worker::from_stored(json!({
            "ch_name": "w1",
            "tenant": "t1",
            "image": ["abaco/echo"],
            "status": "BUSY",
            "last_execution": "2024-05-01T12:00:00Z",
        }))
        .unwrap();
        assert_eq!(worker.status, WorkerStatus::Busy);
        assert!(worker.last_execution.is_some());
        assert!(worker.last_update.is_none());
    }
}
