use super::schema::{FieldSource, FieldSpec, Record, require};
use crate::core::{RegistryError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A compiled `event_pattern`. Stored as its source text.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventPattern(Regex);

impl EventPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern).map(Self).map_err(|e| {
            RegistryError::validation(format!("Invalid event_pattern '{pattern}': {e}"))
        })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, event: &str) -> bool {
        self.0.is_match(event)
    }
}

impl TryFrom<String> for EventPattern {
    type Error = RegistryError;

    fn try_from(pattern: String) -> Result<Self> {
        Self::new(&pattern)
    }
}

impl From<EventPattern> for String {
    fn from(pattern: EventPattern) -> Self {
        pattern.as_str().to_string()
    }
}

impl PartialEq for EventPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for EventPattern {}

impl fmt::Debug for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventPattern").field(&self.as_str()).finish()
    }
}

/// What a subscription listens for. Exactly one of the two, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEvent {
    EventId(String),
    EventPattern(EventPattern),
}

impl SubscriptionEvent {
    pub fn pattern(pattern: &str) -> Result<Self> {
        EventPattern::new(pattern).map(Self::EventPattern)
    }
}

/// An actor's event subscription, stored inside the actor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(flatten)]
    pub event: SubscriptionEvent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionDraft {
    pub actor_id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_pattern: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl SubscriptionDraft {
    pub fn event_id(actor_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            actor_id: Some(actor_id.into()),
            event_id: Some(event_id.into()),
            ..Self::default()
        }
    }

    pub fn event_pattern(actor_id: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            actor_id: Some(actor_id.into()),
            event_pattern: Some(pattern.into()),
            ..Self::default()
        }
    }
}

/// First `"{actor_id}_sub_{n}"` that is not already a key of `existing`.
pub fn next_subscription_id(actor_id: &str, existing: &BTreeMap<String, Subscription>) -> String {
    (0u64..)
        .map(|n| format!("{actor_id}_sub_{n}"))
        .find(|candidate| !existing.contains_key(candidate))
        .unwrap_or_else(|| format!("{actor_id}_sub_{}", existing.len()))
}

impl Subscription {
    /// Build a subscription whose id does not collide with `existing`.
    pub fn from_draft(
        draft: SubscriptionDraft,
        existing: &BTreeMap<String, Subscription>,
    ) -> Result<Self> {
        let actor_id = require(draft.actor_id, "actor_id")?;
        let event = match (draft.event_id, draft.event_pattern) {
            (Some(event_id), None) => SubscriptionEvent::EventId(event_id),
            (None, Some(pattern)) => SubscriptionEvent::pattern(&pattern)?,
            (Some(_), Some(_)) => {
                return Err(RegistryError::validation(
                    "A subscription takes either event_id or event_pattern, not both",
                ));
            }
            (None, None) => {
                return Err(RegistryError::validation(
                    "A subscription requires event_id or event_pattern",
                ));
            }
        };

        let id = draft
            .id
            .unwrap_or_else(|| next_subscription_id(&actor_id, existing));
        Ok(Self { id, event })
    }

    pub fn matches(&self, event: &str) -> bool {
        match &self.event {
            SubscriptionEvent::EventId(id) => id == event,
            SubscriptionEvent::EventPattern(pattern) => pattern.is_match(event),
        }
    }
}

impl Record for Subscription {
    const KIND: &'static str = "subscription";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("actor_id", FieldSource::Provided, "Human readable id of the subscribing actor."),
        FieldSpec::new("event_id", FieldSource::Optional, "Exact event id to subscribe to."),
        FieldSpec::new("event_pattern", FieldSource::Optional, "Regular expression matched against event ids."),
        FieldSpec::new("id", FieldSource::Derived, "Id of this subscription, unique within the actor."),
    ];
    type Draft = SubscriptionDraft;
}
