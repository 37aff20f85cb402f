//! Point-in-time snapshots of a [`StoreSet`]

use super::{Namespace, StoreSet};
use crate::core::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Snapshot Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: Value,
    /// Remaining time to live in milliseconds, if the key expires.
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub key_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub namespaces: BTreeMap<String, Vec<SnapshotEntry>>,
    pub metadata: SnapshotMetadata,
}

impl StoreSnapshot {
    /// Capture every live key of every namespace.
    pub async fn capture(stores: &StoreSet) -> StoreResult<Self> {
        let mut namespaces = BTreeMap::new();
        let mut key_count = 0;

        for ns in Namespace::ALL {
            let store = stores.get(ns);
            let mut entries = Vec::new();
            for (key, value) in store.scan().await? {
                // A key may expire between the scan and the ttl lookup.
                let ttl = match store.ttl(&key).await {
                    Ok(ttl) => ttl,
                    Err(err) if err.is_not_found() => continue,
                    Err(err) => return Err(err),
                };
                entries.push(SnapshotEntry {
                    key,
                    value,
                    ttl_ms: ttl.map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64),
                });
            }
            key_count += entries.len();
            namespaces.insert(ns.as_str().to_string(), entries);
        }

        Ok(Self {
            version: SNAPSHOT_FORMAT_VERSION,
            namespaces,
            metadata: SnapshotMetadata {
                created_at: Utc::now(),
                key_count,
            },
        })
    }

    /// Write every captured entry back into `stores`.
    pub async fn restore_into(&self, stores: &StoreSet) -> StoreResult<usize> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::Serialization(format!(
                "Unsupported snapshot version {}",
                self.version
            )));
        }

        let mut restored = 0;
        for (name, entries) in &self.namespaces {
            let ns = match name.parse::<Namespace>() {
                Ok(ns) => ns,
                Err(err) => {
                    warn!("skipping snapshot namespace: {err}");
                    continue;
                }
            };
            let store = stores.get(ns);
            for entry in entries {
                match entry.ttl_ms {
                    Some(ms) => {
                        store
                            .set_with_expiry(&entry.key, entry.value.clone(), Duration::from_millis(ms))
                            .await?
                    }
                    None => store.set(&entry.key, entry.value.clone()).await?,
                }
                restored += 1;
            }
        }
        Ok(restored)
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Write the snapshot through a temp file in the same directory, then
    /// rename it over the target so readers never see a partial file.
    pub fn save(&self, snapshot: &StoreSnapshot) -> StoreResult<()> {
        let parent = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let serialized = rmp_serde::to_vec_named(snapshot)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize snapshot: {e}")))?;

        let temp_file = NamedTempFile::new_in(&parent)?;
        let mut writer = BufWriter::new(temp_file);
        writer.write_all(&serialized)?;
        writer.flush()?;
        let temp_file = writer
            .into_inner()
            .map_err(|e| StoreError::IoError(format!("Failed to flush snapshot: {e}")))?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(&self.snapshot_path)
            .map_err(|e| StoreError::IoError(format!("Failed to persist snapshot: {e}")))?;

        debug!(
            "snapshot with {} keys written to {}",
            snapshot.metadata.key_count,
            self.snapshot_path.display()
        );
        Ok(())
    }

    pub fn load(&self) -> StoreResult<Option<StoreSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.snapshot_path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| StoreError::Serialization(format!("Failed to deserialize snapshot: {e}")))?;
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }

    pub fn delete(&self) -> StoreResult<()> {
        if self.snapshot_path.exists() {
            fs::remove_file(&self.snapshot_path)?;
        }
        Ok(())
    }

    /// Capture `stores` and write the result.
    pub async fn checkpoint(&self, stores: &StoreSet) -> StoreResult<SnapshotMetadata> {
        let snapshot = StoreSnapshot::capture(stores).await?;
        self.save(&snapshot)?;
        Ok(snapshot.metadata)
    }

    /// Load the file, if any, into `stores`. Returns the number of keys restored.
    pub async fn recover(&self, stores: &StoreSet) -> StoreResult<Option<usize>> {
        match self.load()? {
            Some(snapshot) => Ok(Some(snapshot.restore_into(stores).await?)),
            None => Ok(None),
        }
    }
}
