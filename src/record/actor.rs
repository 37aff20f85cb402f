use super::schema::{Derived, FieldSource, FieldSpec, Record, parse_draft, require};
use super::subscription::Subscription;
use crate::core::{ActorStatus, IdKind, RegistryError, Result, TaggedId, db_key};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A registered actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub stateless: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub default_environment: BTreeMap<String, String>,
    #[serde(default)]
    pub status: ActorStatus,
    #[serde(default)]
    pub subscriptions: BTreeMap<String, Subscription>,
    #[serde(default)]
    pub state: Option<Value>,
    pub tenant: String,
    pub api_server: String,
    pub owner: String,
    /// Primary key: tenant + separator + id.
    pub db_id: String,
    /// Human-readable id, unique within the tenant.
    pub id: String,
}

/// Caller input for [`Actor`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorDraft {
    pub name: Option<String>,
    pub image: Option<String>,

    #[serde(default)]
    pub stateless: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub default_environment: BTreeMap<String, String>,
    #[serde(default)]
    pub status: ActorStatus,
    #[serde(default)]
    pub subscriptions: BTreeMap<String, Subscription>,
    #[serde(default)]
    pub state: Option<Value>,

    pub tenant: Option<String>,
    pub api_server: Option<String>,
    pub owner: Option<String>,

    pub db_id: Option<String>,
    pub id: Option<String>,
}

impl ActorDraft {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            image: Some(image.into()),
            ..Self::default()
        }
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn api_server(mut self, api_server: impl Into<String>) -> Self {
        self.api_server = Some(api_server.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_environment.insert(name.into(), value.into());
        self
    }
}

/// The id and db-key are derived together so they can never disagree.
#[derive(Debug, Default)]
struct ActorIdentity {
    id: Derived<String>,
    db_id: Derived<String>,
}

impl ActorIdentity {
    fn derive(
        &mut self,
        tenant: &str,
        supplied_id: Option<String>,
        supplied_db_id: Option<String>,
    ) -> Result<(String, String)> {
        let id = self.id.resolve(supplied_id, || {
            let generated = TaggedId::generate(IdKind::Actor).to_string();
            self.db_id.materialize(db_key(tenant, &generated));
            Ok(generated)
        })?;
        let expected = db_key(tenant, &id);
        let db_id = self.db_id.resolve(supplied_db_id, || Ok(expected.clone()))?;
        if db_id != expected {
            return Err(RegistryError::validation(format!(
                "db_id '{db_id}' does not match tenant '{tenant}' and id '{id}'"
            )));
        }
        Ok((id, db_id))
    }
}

impl Actor {
    pub fn from_draft(draft: ActorDraft) -> Result<Self> {
        let name = require(draft.name, "name")?;
        let image = require(draft.image, "image")?;
        let tenant = require(draft.tenant, "tenant")?;
        let api_server = require(draft.api_server, "api_server")?;
        let owner = require(draft.owner, "owner")?;

        let mut identity = ActorIdentity::default();
        let (id, db_id) = identity.derive(&tenant, draft.id, draft.db_id)?;

        Ok(Self {
            name,
            image,
            stateless: draft.stateless,
            description: draft.description,
            privileged: draft.privileged,
            default_environment: draft.default_environment,
            status: draft.status,
            subscriptions: draft.subscriptions,
            state: draft.state,
            tenant,
            api_server,
            owner,
            db_id,
            id,
        })
    }

    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        Self::from_draft(parse_draft::<Self>(fields)?)
    }
}

impl Record for Actor {
    const KIND: &'static str = "actor";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("name", FieldSource::Required, "User defined name for this actor."),
        FieldSpec::new("image", FieldSource::Required, "Reference to the image for this actor."),
        FieldSpec::new("stateless", FieldSource::Optional, "Whether the actor stores private state."),
        FieldSpec::new("description", FieldSource::Optional, "Description of this actor."),
        FieldSpec::new("privileged", FieldSource::Optional, "Whether this actor runs in privileged mode."),
        FieldSpec::new("default_environment", FieldSource::Optional, "Default environment variables and values."),
        FieldSpec::new("status", FieldSource::Optional, "Current status of the actor."),
        FieldSpec::new("subscriptions", FieldSource::Optional, "Event subscriptions keyed by subscription id."),
        FieldSpec::new("state", FieldSource::Optional, "Private state of a stateful actor."),
        FieldSpec::new("tenant", FieldSource::Provided, "The tenant that this actor belongs to."),
        FieldSpec::new("api_server", FieldSource::Provided, "Base URL for the tenant of this actor."),
        FieldSpec::new("owner", FieldSource::Provided, "The user who created this actor."),
        FieldSpec::new("db_id", FieldSource::Derived, "Primary key in the database for this actor."),
        FieldSpec::new("id", FieldSource::Derived, "Human readable id for this actor."),
    ];
    type Draft = ActorDraft;
}
