//! Field classification shared by every record kind.
//!
//! Each kind declares its fields once in [`Record::FIELDS`]. Caller input
//! arrives as a typed draft whose mandatory fields are `Option`s, so a missing
//! field is a validation failure rather than a panic or a silent default.
//! Derived fields go through [`Derived`], which resolves in a fixed order:
//! an already-materialized value wins, then a caller-supplied value, and only
//! then the kind's derivation routine runs.

use crate::core::{RegistryError, Result, StoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Supplied by the end user; construction fails without it.
    Required,
    /// Supplied by the end user or defaulted.
    Optional,
    /// Supplied by trusted platform code rather than the user; still mandatory.
    Provided,
    /// Computed by the record kind itself.
    Derived,
}

impl FieldSource {
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::Required | Self::Provided)
    }

    pub const fn is_caller_supplied(self) -> bool {
        !matches!(self, Self::Derived)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub source: FieldSource,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn new(name: &'static str, source: FieldSource, description: &'static str) -> Self {
        Self {
            name,
            source,
            description,
        }
    }
}

/// A record kind with a declared field schema.
pub trait Record: Serialize + DeserializeOwned + Sized {
    /// Human-facing kind name, used in error messages.
    const KIND: &'static str;
    const FIELDS: &'static [FieldSpec];

    /// Typed caller input for this kind.
    type Draft: DeserializeOwned;

    /// Fields a caller may pass in, i.e. everything except derived ones.
    fn input_fields() -> impl Iterator<Item = &'static FieldSpec> {
        Self::FIELDS
            .iter()
            .filter(|spec| spec.source.is_caller_supplied())
    }

    fn field(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|spec| spec.name == name)
    }

    /// Decode a value read back from the store.
    fn from_stored(value: Value) -> StoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    fn to_stored(&self) -> StoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Fail with a validation error if a mandatory field is absent.
pub fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| RegistryError::validation(format!("Required field {field} missing")))
}

/// Validate an untyped field map against `R::FIELDS` and decode it into `R::Draft`.
///
/// Mandatory fields must be present and non-null; fields the schema does not
/// declare are rejected.
pub fn parse_draft<R: Record>(fields: Map<String, Value>) -> Result<R::Draft> {
    for spec in R::FIELDS.iter().filter(|spec| spec.source.is_mandatory()) {
        if fields.get(spec.name).is_none_or(Value::is_null) {
            return Err(RegistryError::validation(format!(
                "Required field {} missing",
                spec.name
            )));
        }
    }
    if let Some(unknown) = fields.keys().find(|name| R::field(name).is_none()) {
        return Err(RegistryError::validation(format!(
            "Unknown field {unknown} for {}",
            R::KIND
        )));
    }

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| RegistryError::validation(format!("Invalid {} fields: {e}", R::KIND)))
}

/// A derived field slot that memoizes its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived<T> {
    value: Option<T>,
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Clone> Derived<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_materialized(&self) -> bool {
        self.value.is_some()
    }

    /// Fix the value; used by routines that derive several fields at once.
    pub fn materialize(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Resolve: materialized value, else `supplied`, else `derive()`.
    pub fn resolve<F>(&mut self, supplied: Option<T>, derive: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = &self.value {
            return Ok(value.clone());
        }
        let value = match supplied {
            Some(value) => value,
            None => derive()?,
        };
        self.value = Some(value.clone());
        Ok(value)
    }

    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

/// Serde helpers for usage counters that callers send either as integers or
/// as decimal strings.
pub mod counter {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    struct CounterVisitor;

    impl Visitor<'_> for CounterVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("counter must be non-negative, got {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("'{v}' is not a non-negative integer")))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(CounterVisitor)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer};

        #[derive(Deserialize)]
        struct Wrapped(#[serde(deserialize_with = "super::deserialize")] u64);

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            Option::<Wrapped>::deserialize(deserializer).map(|w| w.map(|Wrapped(v)| v))
        }
    }
}
