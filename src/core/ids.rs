use super::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Separator between the tenant and the human-readable id in a db-key.
pub const KEY_SEPARATOR: &str = "_";

/// Record kinds that carry generated identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdKind {
    Actor,
    Execution,
    Worker,
}

impl IdKind {
    /// Fixed type code appended to generated ids.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Actor => "059",
            Self::Execution => "053",
            Self::Worker => "058",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "059" => Some(Self::Actor),
            "053" => Some(Self::Execution),
            "058" => Some(Self::Worker),
            _ => None,
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Actor => "actor",
            Self::Execution => "execution",
            Self::Worker => "worker",
        };
        write!(f, "{label}")
    }
}

/// Generated identifier: a time-ordered random payload plus a kind tag.
///
/// Rendered as `"{uuid}-{code}"`, so ids of different kinds never collide
/// even when they share one namespace (the logs store, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaggedId {
    kind: IdKind,
    payload: Uuid,
}

impl TaggedId {
    pub fn generate(kind: IdKind) -> Self {
        Self {
            kind,
            payload: Uuid::now_v7(),
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn payload(&self) -> Uuid {
        self.payload
    }

    /// Kind of a rendered id, or `None` for ids that were not generated here.
    pub fn kind_of(id: &str) -> Option<IdKind> {
        id.parse::<Self>().ok().map(|tagged| tagged.kind)
    }
}

impl fmt::Display for TaggedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.payload, self.kind.code())
    }
}

impl FromStr for TaggedId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let (payload, code) = s
            .rsplit_once('-')
            .ok_or_else(|| RegistryError::validation(format!("'{s}' is not a tagged id")))?;
        let kind = IdKind::from_code(code)
            .ok_or_else(|| RegistryError::validation(format!("Unknown id type code '{code}'")))?;
        let payload = Uuid::parse_str(payload)
            .map_err(|e| RegistryError::validation(format!("Invalid id payload: {e}")))?;
        Ok(Self { kind, payload })
    }
}

impl TryFrom<String> for TaggedId {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TaggedId> for String {
    fn from(value: TaggedId) -> Self {
        value.to_string()
    }
}

/// Composite storage key for an actor: tenant + separator + human id.
pub fn db_key(tenant: &str, id: &str) -> String {
    format!("{tenant}{KEY_SEPARATOR}{id}")
}

/// Recovers the human-readable id from a db-key.
///
/// Keys that do not carry the tenant prefix are returned unchanged.
pub fn display_id<'a>(tenant: &str, db_key: &'a str) -> &'a str {
    db_key
        .strip_prefix(tenant)
        .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
        .unwrap_or(db_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_id_renders_kind_code() {
        let id = TaggedId::generate(IdKind::Execution);
        let rendered = id.to_string();
        assert!(rendered.ends_with("-053"));
        assert_eq!(rendered.parse::<TaggedId>().unwrap(), id);
    }

    #[test]
    fn test_kind_of_distinguishes_kinds() {
        let actor = TaggedId::generate(IdKind::Actor).to_string();
        let worker = TaggedId::generate(IdKind::Worker).to_string();
        assert_eq!(TaggedId::kind_of(&actor), Some(IdKind::Actor));
        assert_eq!(TaggedId::kind_of(&worker), Some(IdKind::Worker));
        assert_eq!(TaggedId::kind_of("a1"), None);
        assert_eq!(TaggedId::kind_of("not-a-uuid-053"), None);
    }

    #[test]
    fn test_generated_ids_are_time_ordered() {
        let first = TaggedId::generate(IdKind::Actor);
        let second = TaggedId::generate(IdKind::Actor);
        assert_eq!(first.payload().get_version_num(), 7);
        assert_ne!(first, second);
    }

    #[test]
    fn test_tagged_id_serde_as_string() {
        let id = TaggedId::generate(IdKind::Worker);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
        let back: TaggedId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_db_key_and_display_id() {
        assert_eq!(db_key("t1", "a1"), "t1_a1");
        assert_eq!(display_id("t1", "t1_a1"), "a1");
        assert_eq!(display_id("t2", "t1_a1"), "t1_a1");
        assert_eq!(display_id("t1", "t1a1"), "t1a1");
    }

    #[test]
    fn test_tenants_sharing_human_id_get_distinct_keys() {
        assert_ne!(db_key("t1", "a1"), db_key("t2", "a1"));
    }
}
