//! Dynamically keyed entity state.
//!
//! An [`EntityRecord`] represents one logical row's field values as an
//! opaque, property-named map. The same type serves the proposed entity
//! state (which may nest related-entity references) and the database
//! snapshot (scalars only, keyed by property name for plain columns and
//! by physical foreign-key column name for owning relations).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A single property slot on an [`EntityRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// A scalar column value.
    Value(Value),
    /// A nested related-entity reference.
    Reference(EntityRecord),
}

impl PropertyValue {
    /// Get the scalar value, if this slot holds one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            PropertyValue::Value(v) => Some(v),
            PropertyValue::Reference(_) => None,
        }
    }

    /// Get the nested record, if this slot holds a reference.
    pub fn as_reference(&self) -> Option<&EntityRecord> {
        match self {
            PropertyValue::Reference(r) => Some(r),
            PropertyValue::Value(_) => None,
        }
    }

    /// Is this slot an explicit scalar null?
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Value(Value::Null))
    }
}

impl From<Value> for PropertyValue {
    fn from(v: Value) -> Self {
        PropertyValue::Value(v)
    }
}

impl From<EntityRecord> for PropertyValue {
    fn from(r: EntityRecord) -> Self {
        PropertyValue::Reference(r)
    }
}

/// An opaque, dynamically-keyed record of one row's state.
///
/// A property absent from the map is *undefined*, which the diff engines
/// treat differently from an explicit `Value::Null`: an untouched property
/// is never an intentional null. Iteration order is the sorted property
/// name order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    properties: BTreeMap<String, PropertyValue>,
}

impl EntityRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a scalar property, consuming and returning the record.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::Value(value.into()));
        self
    }

    /// Set a related-entity reference, consuming and returning the record.
    #[must_use]
    pub fn with_reference(mut self, name: impl Into<String>, reference: EntityRecord) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::Reference(reference));
        self
    }

    /// Set a scalar property in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties
            .insert(name.into(), PropertyValue::Value(value.into()));
    }

    /// Get the raw property slot, or `None` if the property is undefined.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Get the scalar value of a property.
    ///
    /// `None` when the property is undefined or holds a reference.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(PropertyValue::as_value)
    }

    /// Get the nested record of a reference property.
    pub fn reference(&self, name: &str) -> Option<&EntityRecord> {
        self.get(name).and_then(PropertyValue::as_reference)
    }

    /// Does the record define this property at all?
    ///
    /// `true` for an explicit null; `false` only for undefined.
    pub fn defines(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Iterate over defined property names.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of defined properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no properties are defined.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
