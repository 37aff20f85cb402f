use crate::core::{ActorStatus, RegistryError, Result, StoreResultExt, display_id};
use crate::record::{Actor, ActorDraft, Record, parse_draft};
use crate::storage::{KvStore, StoreSet};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{Level, event};

const KIND: &str = "Actor";

/// Profile fields a caller may change after creation.
///
/// Status and state have their own single-field operations and are not
/// part of a profile update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub stateless: Option<bool>,
    pub privileged: Option<bool>,
    pub default_environment: Option<BTreeMap<String, String>>,
}

impl ActorUpdate {
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| RegistryError::validation(format!("Invalid actor update: {e}")))
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn apply(self, actor: &mut Actor) -> Result<()> {
        if let Some(name) = self.name {
            if name.is_empty() {
                return Err(RegistryError::validation("Required field name missing"));
            }
            actor.name = name;
        }
        if let Some(image) = self.image {
            if image.is_empty() {
                return Err(RegistryError::validation("Required field image missing"));
            }
            actor.image = image;
        }
        if let Some(description) = self.description {
            actor.description = description;
        }
        if let Some(stateless) = self.stateless {
            actor.stateless = stateless;
        }
        if let Some(privileged) = self.privileged {
            actor.privileged = privileged;
        }
        if let Some(env) = self.default_environment {
            actor.default_environment = env;
        }
        Ok(())
    }
}

/// Actor records, keyed by db-key in the actors namespace.
#[derive(Clone)]
pub struct ActorRegistry {
    actors: Arc<dyn KvStore>,
}

impl ActorRegistry {
    pub fn new(stores: &StoreSet) -> Self {
        Self {
            actors: stores.actors(),
        }
    }

    /// Register a new actor. Fails with `Conflict` when a caller-supplied id
    /// is already taken within the tenant. The check is a read before the
    /// write, so two concurrent creates with the same id may both succeed and
    /// the last write wins.
    pub async fn create(&self, draft: ActorDraft) -> Result<Actor> {
        let id_supplied = draft.id.is_some();
        let actor = Actor::from_draft(draft)?;

        if id_supplied {
            match self.actors.get(&actor.db_id).await {
                Ok(_) => {
                    return Err(RegistryError::Conflict(format!(
                        "Actor id '{}' already exists in tenant '{}'",
                        actor.id, actor.tenant
                    )));
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }

        self.actors.set(&actor.db_id, actor.to_stored()?).await?;
        event!(Level::DEBUG, db_key = %actor.db_id, tenant = %actor.tenant, "actor created");
        Ok(actor)
    }

    pub async fn create_from_fields(&self, fields: Map<String, Value>) -> Result<Actor> {
        let draft = parse_draft::<Actor>(fields)?;
        self.create(draft).await
    }

    pub async fn get(&self, db_key: &str) -> Result<Actor> {
        let value = self.actors.get(db_key).await.or_not_found(KIND, db_key)?;
        Ok(Actor::from_stored(value)?)
    }

    /// Whole-record read-modify-write. Concurrent updates may lose one another.
    pub async fn update(&self, db_key: &str, changes: ActorUpdate) -> Result<Actor> {
        let mut actor = self.get(db_key).await?;
        changes.apply(&mut actor)?;
        self.actors.set(db_key, actor.to_stored()?).await?;
        event!(Level::DEBUG, db_key = %db_key, "actor updated");
        Ok(actor)
    }

    pub async fn set_status(&self, db_key: &str, status: ActorStatus) -> Result<()> {
        self.write_field(db_key, "status", serde_json::to_value(status)?)
            .await?;
        event!(Level::DEBUG, db_key = %db_key, status = %status, "actor status set");
        Ok(())
    }

    /// Removes the actor record only. Executions, workers and permissions
    /// are left for the caller to clean up.
    pub async fn delete(&self, db_key: &str) -> Result<()> {
        self.actors.delete(db_key).await.or_not_found(KIND, db_key)?;
        event!(Level::DEBUG, db_key = %db_key, "actor deleted");
        Ok(())
    }

    pub fn recover_display_id<'a>(&self, tenant: &str, db_key: &'a str) -> &'a str {
        display_id(tenant, db_key)
    }

    /// All actors, optionally restricted to one tenant, ordered by db-key.
    pub async fn list(&self, tenant: Option<&str>) -> Result<Vec<Actor>> {
        let mut actors = Vec::new();
        for (key, value) in self.actors.scan().await? {
            let actor = match Actor::from_stored(value) {
                Ok(actor) => actor,
                Err(err) => {
                    event!(Level::WARN, db_key = %key, error = %err, "skipping undecodable actor");
                    continue;
                }
            };
            if tenant.is_none_or(|t| t == actor.tenant) {
                actors.push(actor);
            }
        }
        Ok(actors)
    }

    pub async fn get_state(&self, db_key: &str) -> Result<Option<Value>> {
        Ok(self.get(db_key).await?.state)
    }

    /// Replace a stateful actor's private state.
    pub async fn set_state(&self, db_key: &str, state: Value) -> Result<()> {
        let actor = self.get(db_key).await?;
        if actor.stateless {
            return Err(RegistryError::validation(format!(
                "Actor {} is stateless and cannot hold state",
                actor.id
            )));
        }
        self.write_field(db_key, "state", state).await?;
        event!(Level::DEBUG, db_key = %db_key, "actor state set");
        Ok(())
    }

    /// Atomic write of one top-level field of an existing actor record.
    async fn write_field(&self, db_key: &str, field: &str, value: Value) -> Result<()> {
        // `update` would create a stub record for an unknown key.
        self.actors.get(db_key).await.or_not_found(KIND, db_key)?;
        Ok(self.actors.update(db_key, field, value).await?)
    }
}
