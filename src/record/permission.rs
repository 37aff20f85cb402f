use super::schema::{FieldSource, FieldSpec, Record, require};
use crate::core::{PermissionLevel, Result};
use serde::{Deserialize, Serialize};

/// One `(user, level)` grant on an actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub user: String,
    pub level: PermissionLevel,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionDraft {
    pub user: Option<String>,
    pub level: Option<PermissionLevel>,
}

impl PermissionEntry {
    pub fn new(user: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            user: user.into(),
            level,
        }
    }

    pub fn from_draft(draft: PermissionDraft) -> Result<Self> {
        Ok(Self {
            user: require(draft.user, "user")?,
            level: require(draft.level, "level")?,
        })
    }
}

impl Record for PermissionEntry {
    const KIND: &'static str = "permission";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("user", FieldSource::Required, "The user being granted access."),
        FieldSpec::new("level", FieldSource::Required, "Access level: READ, EXECUTE or UPDATE."),
    ];
    type Draft = PermissionDraft;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::schema::parse_draft;
    use serde_json::json;

    #[test]
    fn test_parse_permission() {
        let fields = json!({"user": "bob", "level": "EXECUTE"});
        let draft = parse_draft::<PermissionEntry>(fields.as_object().unwrap().clone()).unwrap();
        let entry = PermissionEntry::from_draft(draft).unwrap();
        assert_eq!(entry, PermissionEntry::new("bob", PermissionLevel::Execute));
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let fields = json!({"user": "bob", "level": "ADMIN"});
        assert!(parse_draft::<PermissionEntry>(fields.as_object().unwrap().clone()).is_err());
    }
}
