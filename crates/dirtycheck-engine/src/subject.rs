//! The persistence subject: per-entity change tracking for one flush.

use std::sync::Arc;

use dirtycheck_core::identity::{Identifier, IdentifierMap};
use dirtycheck_core::metadata::{ColumnMetadata, EntityMetadata, RelationMetadata};
use dirtycheck_core::record::EntityRecord;

use crate::diff::{diff_columns, diff_relations};
use crate::ops::{JunctionInsert, JunctionRemove, RelationUpdate};

/// The stateful unit of change-tracking for one entity in one flush.
///
/// A subject owns the proposed entity state and, optionally, the
/// previously loaded database snapshot of the same logical row.
/// Whenever a snapshot is present, the diff sets are exactly the output
/// of the diff engines over the current pair; the snapshot can only
/// change through [`attach_database_snapshot`], which recomputes both
/// sets in one step, so a half-updated pair is never observable.
///
/// Subjects are short-lived, single-owner values: constructed once per
/// entity per flush, mutated in place as intent is discovered, and
/// discarded after the flush completes.
///
/// [`attach_database_snapshot`]: Self::attach_database_snapshot
#[derive(Debug)]
pub struct Subject {
    metadata: Arc<EntityMetadata>,
    entity: EntityRecord,
    database_snapshot: Option<EntityRecord>,

    /// May this subject be inserted? Assigned by the orchestrator.
    pub can_be_inserted: bool,
    /// May this subject be updated? Assigned by the orchestrator.
    pub can_be_updated: bool,
    /// Must this subject's row be removed? Assigned by the orchestrator.
    pub must_be_removed: bool,

    diff_columns: Vec<ColumnMetadata>,
    diff_relations: Vec<RelationMetadata>,

    relation_updates: Vec<RelationUpdate>,
    junction_inserts: Vec<JunctionInsert>,
    junction_removes: Vec<JunctionRemove>,

    generated_id: Option<Identifier>,
}

impl Subject {
    /// Create a subject with no database snapshot (a new row).
    pub fn new(metadata: Arc<EntityMetadata>, entity: EntityRecord) -> Self {
        Self {
            metadata,
            entity,
            database_snapshot: None,
            can_be_inserted: false,
            can_be_updated: false,
            must_be_removed: false,
            diff_columns: Vec::new(),
            diff_relations: Vec::new(),
            relation_updates: Vec::new(),
            junction_inserts: Vec::new(),
            junction_removes: Vec::new(),
            generated_id: None,
        }
    }

    /// Create a subject for an existing row; both diff sets are
    /// computed during construction.
    pub fn with_database_snapshot(
        metadata: Arc<EntityMetadata>,
        entity: EntityRecord,
        snapshot: EntityRecord,
    ) -> Self {
        let mut subject = Self::new(metadata, entity);
        subject.attach_database_snapshot(snapshot);
        subject
    }

    /// Replace the database snapshot and recompute both diff sets.
    ///
    /// The sets are computed against the incoming snapshot before
    /// anything is installed, then all three fields are assigned
    /// together.
    pub fn attach_database_snapshot(&mut self, snapshot: EntityRecord) {
        let columns = diff_columns(&self.metadata, &self.entity, &snapshot);
        let relations = diff_relations(&self.metadata, &self.entity, &snapshot);
        tracing::debug!(
            entity = self.metadata.name(),
            diff_columns = columns.len(),
            diff_relations = relations.len(),
            "Attached database snapshot"
        );
        self.database_snapshot = Some(snapshot);
        self.diff_columns = columns;
        self.diff_relations = relations;
    }

    /// The entity metadata this subject was built against.
    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    /// The proposed entity state.
    pub fn entity(&self) -> &EntityRecord {
        &self.entity
    }

    /// The attached database snapshot, if any.
    pub fn database_snapshot(&self) -> Option<&EntityRecord> {
        self.database_snapshot.as_ref()
    }

    /// Is a database snapshot attached?
    pub fn has_database_snapshot(&self) -> bool {
        self.database_snapshot.is_some()
    }

    /// Columns currently differing, in declaration order.
    pub fn diff_columns(&self) -> &[ColumnMetadata] {
        &self.diff_columns
    }

    /// Owning single-valued relations currently differing.
    pub fn diff_relations(&self) -> &[RelationMetadata] {
        &self.diff_relations
    }

    /// Must this subject be inserted? True when insertion is allowed
    /// and no snapshot exists for the row.
    pub fn must_be_inserted(&self) -> bool {
        self.can_be_inserted && self.database_snapshot.is_none()
    }

    /// Must this subject be updated? True when updating is allowed and
    /// at least one column or relation differs.
    pub fn must_be_updated(&self) -> bool {
        self.can_be_updated && (!self.diff_columns.is_empty() || !self.diff_relations.is_empty())
    }

    /// Are any inverse-side relation assignments pending?
    pub fn has_relation_updates(&self) -> bool {
        !self.relation_updates.is_empty()
    }

    /// The entity's full identifier map, if resolvable.
    pub fn identifier(&self) -> Option<IdentifierMap> {
        self.metadata.identity().full_identifier_map(&self.entity)
    }

    /// The entity's simplified identifier: bare value for single-column
    /// identities, map for composite ones.
    pub fn simplified_identifier(&self) -> Option<Identifier> {
        self.metadata.identity().simplified_identifier(&self.entity)
    }

    /// The identifier of the persisted row.
    ///
    /// The entity's own identifier when present, otherwise the canonical
    /// map synthesized from the generated id. Used immediately after an
    /// insert, before any requery.
    pub fn resolved_identifier(&self) -> Option<IdentifierMap> {
        if let Some(map) = self.identifier() {
            return Some(map);
        }
        self.generated_id
            .as_ref()
            .map(|id| self.metadata.identity().canonical_map(id))
    }

    /// Composite-aware comparison of this subject's resolved identifier
    /// against a candidate map. `false` when unresolved.
    pub fn identifiers_match(&self, candidate: &IdentifierMap) -> bool {
        self.resolved_identifier()
            .is_some_and(|mine| self.metadata.identity().identifiers_equal(&mine, candidate))
    }

    /// Record the identifier generated by a physical insert.
    pub fn set_generated_id(&mut self, id: Identifier) {
        self.generated_id = Some(id);
    }

    /// The identifier generated by a physical insert, if any.
    pub fn generated_id(&self) -> Option<&Identifier> {
        self.generated_id.as_ref()
    }

    /// Append a pending inverse-side relation assignment.
    pub fn add_relation_update(&mut self, update: RelationUpdate) {
        self.relation_updates.push(update);
    }

    /// Pending inverse-side relation assignments, in append order.
    pub fn relation_updates(&self) -> &[RelationUpdate] {
        &self.relation_updates
    }

    /// Append pending junction rows to insert.
    pub fn add_junction_insert(&mut self, insert: JunctionInsert) {
        self.junction_inserts.push(insert);
    }

    /// Pending junction inserts, in append order.
    pub fn junction_inserts(&self) -> &[JunctionInsert] {
        &self.junction_inserts
    }

    /// Append pending junction rows to remove.
    pub fn add_junction_remove(&mut self, remove: JunctionRemove) {
        self.junction_removes.push(remove);
    }

    /// Pending junction removes, in append order.
    pub fn junction_removes(&self) -> &[JunctionRemove] {
        &self.junction_removes
    }
}
