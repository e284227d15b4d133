//! Pending-operation records attached to a subject.
//!
//! These are storage only: the flush orchestrator computes them and
//! appends them to a [`Subject`](crate::Subject); nothing here decides
//! what to insert or remove.

use dirtycheck_core::identity::Identifier;
use dirtycheck_core::metadata::RelationMetadata;
use dirtycheck_core::record::{EntityRecord, PropertyValue};

/// A pending inverse-side relation assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationUpdate {
    /// The relation being updated.
    pub relation: RelationMetadata,
    /// The value to assign.
    pub value: PropertyValue,
}

impl RelationUpdate {
    /// Create a relation update.
    pub fn new(relation: RelationMetadata, value: impl Into<PropertyValue>) -> Self {
        Self {
            relation,
            value: value.into(),
        }
    }
}

/// Pending junction-table rows to insert for a many-to-many relation.
#[derive(Debug, Clone, PartialEq)]
pub struct JunctionInsert {
    /// The many-to-many relation.
    pub relation: RelationMetadata,
    /// Related records to link.
    pub junction_records: Vec<EntityRecord>,
}

impl JunctionInsert {
    /// Create a junction insert.
    pub fn new(relation: RelationMetadata, junction_records: Vec<EntityRecord>) -> Self {
        Self {
            relation,
            junction_records,
        }
    }
}

/// Pending junction-table rows to remove for a many-to-many relation.
#[derive(Debug, Clone, PartialEq)]
pub struct JunctionRemove {
    /// The many-to-many relation.
    pub relation: RelationMetadata,
    /// Identifiers of related records to unlink.
    pub junction_identifiers: Vec<Identifier>,
}

impl JunctionRemove {
    /// Create a junction remove.
    pub fn new(relation: RelationMetadata, junction_identifiers: Vec<Identifier>) -> Self {
        Self {
            relation,
            junction_identifiers,
        }
    }
}
