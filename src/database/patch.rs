use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::database::entity::{Entity, SYSTEM_FIELDS};

/// Errors that can occur while building or applying a [`Patch`]
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("System field '{0}' cannot be changed")]
    SystemFieldNotAllowed(String),
    #[error("Unknown field '{field}' for {entity}")]
    UnknownField { entity: &'static str, field: String },
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Invalid value for {entity}: {message}")]
    InvalidValue { entity: &'static str, message: String },
}

/// The set of columns a partial update touches, keyed by column name.
///
/// A key that is absent is left alone; a key mapped to `null` clears the column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch from API input, rejecting system fields.
    pub fn from_json(json: Value) -> Result<Self, PatchError> {
        match json {
            Value::Object(map) => {
                let mut patch = Self::new();
                for (key, value) in map {
                    patch.set(key, value)?;
                }
                Ok(patch)
            }
            _ => Err(PatchError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    /// Build a patch from a typed change set. Fields skipped during
    /// serialization (unset `Option`s) do not appear in the patch.
    pub fn from_changes(changes: &impl Serialize) -> Result<Self, PatchError> {
        let value =
            serde_json::to_value(changes).map_err(|e| PatchError::InvalidJson(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self, PatchError> {
        let key = key.into();
        if SYSTEM_FIELDS.contains(&key.as_str()) {
            return Err(PatchError::SystemFieldNotAllowed(key));
        }
        self.fields.insert(key, value.into());
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Every key must be a writable column of `T`.
    pub fn validate_for<T: Entity>(&self) -> Result<(), PatchError> {
        for key in self.keys() {
            if !T::is_writable(key) {
                return Err(PatchError::UnknownField { entity: T::NAME, field: key.to_string() });
            }
        }
        Ok(())
    }

    /// Returns a copy of `record` with the patched keys overwritten.
    pub fn apply_to<T: Entity>(&self, record: &T) -> Result<T, PatchError> {
        self.validate_for::<T>()?;
        let mut value = serde_json::to_value(record)
            .map_err(|e| PatchError::InvalidJson(e.to_string()))?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| PatchError::InvalidJson("Entity must serialize to an object".to_string()))?;
        for (key, v) in &self.fields {
            object.insert(key.clone(), v.clone());
        }
        serde_json::from_value(value).map_err(|e| PatchError::InvalidValue {
            entity: T::NAME,
            message: e.to_string(),
        })
    }
}

/// Deserializes a field that distinguishes "absent" from "null":
/// absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
///
/// Use together with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
