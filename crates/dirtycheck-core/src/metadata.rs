//! Entity, column, and relation metadata.
//!
//! Metadata is built at runtime by the schema collaborator and handed to
//! the diff engines read-only. Value access is dependency-injected: each
//! column and relation can carry an accessor function, with a default
//! that reads the record by property name.

use std::any::TypeId;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{MetadataError, MetadataErrorKind, Result};
use crate::identity::IdentityResolver;
use crate::record::{EntityRecord, PropertyValue};
use crate::value::Value;

/// A tagged entity-type handle.
///
/// Entity types are identified either by a Rust type or by a bare name
/// string; [`name`](Self::name) produces the canonical display name for
/// both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityTarget {
    /// Identified by a Rust type.
    ByType {
        /// The type's `TypeId`.
        type_id: TypeId,
        /// The type's fully qualified name.
        type_name: &'static str,
    },
    /// Identified by a bare name string.
    ByName(String),
}

impl EntityTarget {
    /// Create a type-backed target.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        EntityTarget::ByType {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The readable / loggable name of this target.
    ///
    /// For a type-backed target this is the last path segment of the
    /// type name.
    pub fn name(&self) -> &str {
        match self {
            EntityTarget::ByType { type_name, .. } => {
                type_name.rsplit("::").next().unwrap_or(type_name)
            }
            EntityTarget::ByName(name) => name,
        }
    }
}

/// Logical type tag of a column, selecting its normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnKind {
    /// No normalization.
    #[default]
    Plain,
    /// Calendar date, compared as a date-only string.
    Date,
    /// Time of day, compared as a time-only string.
    Time,
    /// Timestamp, compared as a datetime string under the column's
    /// timezone policy.
    DateTime,
    /// JSON blob, compared by canonical serialized form.
    Json,
    /// Delimited string array, compared as an ordered sequence.
    SimpleArray,
}

/// Rendering timezone for datetime normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimezonePolicy {
    /// Render in UTC.
    #[default]
    Utc,
    /// Render in the process-local timezone.
    Local,
}

/// Injected value accessor for a column.
pub type ColumnAccessor = fn(&EntityRecord, &ColumnMetadata) -> Option<Value>;

/// Metadata describing one scalar column.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// Property name on the entity record.
    pub property_name: String,
    /// Physical database column name.
    pub column_name: String,
    /// Logical type tag.
    pub kind: ColumnKind,
    /// Timezone policy for `DateTime` columns.
    pub timezone: TimezonePolicy,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
    /// Whether this column is nullable.
    pub nullable: bool,
    /// Virtual column, never persisted.
    pub virtual_column: bool,
    /// Parent link of a tree table.
    pub parent_link: bool,
    /// Single-table-inheritance discriminator.
    pub discriminator: bool,
    /// Creation timestamp, maintained by the orchestrator.
    pub create_date: bool,
    /// Update timestamp, maintained by the orchestrator.
    pub update_date: bool,
    /// Optimistic-lock version counter.
    pub version: bool,
    /// Member of an embedded object.
    pub embedded: bool,
    /// Injected accessor; the default reads the property by name.
    pub accessor: Option<ColumnAccessor>,
}

impl ColumnMetadata {
    /// Create a plain column whose column name equals its property name.
    pub fn new(property_name: impl Into<String>) -> Self {
        let property_name = property_name.into();
        Self {
            column_name: property_name.clone(),
            property_name,
            kind: ColumnKind::Plain,
            timezone: TimezonePolicy::Utc,
            primary_key: false,
            nullable: false,
            virtual_column: false,
            parent_link: false,
            discriminator: false,
            create_date: false,
            update_date: false,
            version: false,
            embedded: false,
            accessor: None,
        }
    }

    /// Set the physical column name.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column_name = name.into();
        self
    }

    /// Set the logical type tag.
    #[must_use]
    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the timezone policy for datetime normalization.
    #[must_use]
    pub fn timezone(mut self, policy: TimezonePolicy) -> Self {
        self.timezone = policy;
        self
    }

    /// Set the primary-key flag.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set the nullable flag.
    #[must_use]
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set the virtual-column flag.
    #[must_use]
    pub fn virtual_column(mut self, value: bool) -> Self {
        self.virtual_column = value;
        self
    }

    /// Set the tree parent-link flag.
    #[must_use]
    pub fn parent_link(mut self, value: bool) -> Self {
        self.parent_link = value;
        self
    }

    /// Set the discriminator flag.
    #[must_use]
    pub fn discriminator(mut self, value: bool) -> Self {
        self.discriminator = value;
        self
    }

    /// Set the create-timestamp flag.
    #[must_use]
    pub fn create_date(mut self, value: bool) -> Self {
        self.create_date = value;
        self
    }

    /// Set the update-timestamp flag.
    #[must_use]
    pub fn update_date(mut self, value: bool) -> Self {
        self.update_date = value;
        self
    }

    /// Set the version flag.
    #[must_use]
    pub fn version(mut self, value: bool) -> Self {
        self.version = value;
        self
    }

    /// Set the embedded-member flag.
    #[must_use]
    pub fn embedded(mut self, value: bool) -> Self {
        self.embedded = value;
        self
    }

    /// Set an injected value accessor.
    #[must_use]
    pub fn accessor(mut self, accessor: ColumnAccessor) -> Self {
        self.accessor = Some(accessor);
        self
    }

    /// Extract this column's value from a record.
    ///
    /// `None` when the property is undefined or holds a reference.
    pub fn value_of(&self, record: &EntityRecord) -> Option<Value> {
        match self.accessor {
            Some(accessor) => accessor(record, self),
            None => record.value(&self.property_name).cloned(),
        }
    }

    /// Is this column excluded from diffing regardless of its value?
    pub fn excluded_from_diff(&self) -> bool {
        self.virtual_column
            || self.parent_link
            || self.discriminator
            || self.create_date
            || self.update_date
            || self.version
    }
}

// The accessor is a function pointer and carries no identity worth
// comparing; equality covers the descriptive fields only.
impl PartialEq for ColumnMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.property_name == other.property_name
            && self.column_name == other.column_name
            && self.kind == other.kind
            && self.timezone == other.timezone
            && self.primary_key == other.primary_key
            && self.nullable == other.nullable
            && self.virtual_column == other.virtual_column
            && self.parent_link == other.parent_link
            && self.discriminator == other.discriminator
            && self.create_date == other.create_date
            && self.update_date == other.update_date
            && self.version == other.version
            && self.embedded == other.embedded
    }
}

/// Multiplicity of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationKind {
    /// One row on each side; the owning side stores the foreign key.
    OneToOne,
    /// Many rows reference one; always owning.
    #[default]
    ManyToOne,
    /// Inverse collection of a many-to-one.
    OneToMany,
    /// Linked through a junction table.
    ManyToMany,
}

/// Injected value accessor for a relation property.
pub type RelationAccessor = fn(&EntityRecord, &RelationMetadata) -> Option<PropertyValue>;

/// Metadata describing one relation endpoint.
#[derive(Debug, Clone)]
pub struct RelationMetadata {
    /// Property name on the entity record.
    pub property_name: String,
    /// Multiplicity.
    pub kind: RelationKind,
    /// Whether this endpoint physically stores the foreign key.
    pub owning: bool,
    /// Physical foreign-key column name, used to read database
    /// snapshots (which materialize relation identifiers under this
    /// name, not under the property name).
    pub fk_column_name: String,
    /// The relation target's own primary-key resolver, used to resolve
    /// identifiers of related-object references.
    pub target_identity: IdentityResolver,
    /// Injected accessor; the default reads the property by name.
    pub accessor: Option<RelationAccessor>,
}

impl RelationMetadata {
    /// Create a many-to-one owning relation with an empty foreign-key
    /// column name and no target identity; both must be filled before
    /// [`EntityMetadata::validate`] passes.
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            kind: RelationKind::ManyToOne,
            owning: true,
            fk_column_name: String::new(),
            target_identity: IdentityResolver::default(),
            accessor: None,
        }
    }

    /// Set the multiplicity.
    #[must_use]
    pub fn kind(mut self, kind: RelationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the ownership flag.
    #[must_use]
    pub fn owning(mut self, value: bool) -> Self {
        self.owning = value;
        self
    }

    /// Set the physical foreign-key column name.
    #[must_use]
    pub fn fk_column(mut self, name: impl Into<String>) -> Self {
        self.fk_column_name = name.into();
        self
    }

    /// Set the relation target's primary-key resolver.
    #[must_use]
    pub fn target_identity(mut self, identity: IdentityResolver) -> Self {
        self.target_identity = identity;
        self
    }

    /// Set an injected relation-property accessor.
    #[must_use]
    pub fn accessor(mut self, accessor: RelationAccessor) -> Self {
        self.accessor = Some(accessor);
        self
    }

    /// Extract this relation's property slot from a record.
    pub fn property_of(&self, record: &EntityRecord) -> Option<PropertyValue> {
        match self.accessor {
            Some(accessor) => accessor(record, self),
            None => record.get(&self.property_name).cloned(),
        }
    }

    /// Is this a single-valued relation on the owning side?
    ///
    /// Only these carry a foreign key the diff engine can compare:
    /// many-to-one, or one-to-one on the owning side.
    pub fn single_valued_owning(&self) -> bool {
        match self.kind {
            RelationKind::ManyToOne => true,
            RelationKind::OneToOne => self.owning,
            RelationKind::OneToMany | RelationKind::ManyToMany => false,
        }
    }
}

impl PartialEq for RelationMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.property_name == other.property_name
            && self.kind == other.kind
            && self.owning == other.owning
            && self.fk_column_name == other.fk_column_name
            && self.target_identity == other.target_identity
    }
}

/// Static description of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    /// The entity-type handle.
    pub target: EntityTarget,
    /// Columns, in declaration order.
    pub columns: Vec<ColumnMetadata>,
    /// Relations, in declaration order.
    pub relations: Vec<RelationMetadata>,
}

impl EntityMetadata {
    /// Create metadata for a name-identified entity type.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: EntityTarget::ByName(name.into()),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Create metadata for a Rust-type-identified entity type.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            target: EntityTarget::of::<T>(),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Append a column.
    #[must_use]
    pub fn column(mut self, column: ColumnMetadata) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a relation.
    #[must_use]
    pub fn relation(mut self, relation: RelationMetadata) -> Self {
        self.relations.push(relation);
        self
    }

    /// The canonical display name of the entity type.
    pub fn name(&self) -> &str {
        self.target.name()
    }

    /// Find a column by its property name.
    pub fn find_column(&self, property_name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|column| column.property_name == property_name)
    }

    /// Find a relation by its property name.
    pub fn find_relation(&self, property_name: &str) -> Option<&RelationMetadata> {
        self.relations
            .iter()
            .find(|relation| relation.property_name == property_name)
    }

    /// Find the relation whose physical foreign-key column matches.
    pub fn relation_with_fk_column(&self, column_name: &str) -> Option<&RelationMetadata> {
        self.relations
            .iter()
            .find(|relation| relation.fk_column_name == column_name)
    }

    /// Build the identity resolver over the primary-key columns, in
    /// declaration order.
    pub fn identity(&self) -> IdentityResolver {
        IdentityResolver::new(
            self.columns
                .iter()
                .filter(|column| column.primary_key)
                .map(|column| (column.property_name.clone(), column.column_name.clone())),
        )
    }

    /// Check this metadata against the construction-time contract.
    ///
    /// Surfaces malformed definitions before a flush ever runs: names
    /// must have identifier shape, property names must be unique, every
    /// relation needs a foreign-key column name, and every single-valued
    /// owning relation needs its target's primary key.
    pub fn validate(&self) -> Result<()> {
        let mut seen_columns = std::collections::HashSet::new();
        for column in &self.columns {
            check_identifier(self.name(), &column.property_name)?;
            check_identifier(self.name(), &column.column_name)?;
            if !seen_columns.insert(column.property_name.as_str()) {
                return Err(MetadataError {
                    entity: self.name().to_string(),
                    kind: MetadataErrorKind::DuplicateColumn(column.property_name.clone()),
                }
                .into());
            }
        }

        let mut seen_relations = std::collections::HashSet::new();
        for relation in &self.relations {
            check_identifier(self.name(), &relation.property_name)?;
            if !seen_relations.insert(relation.property_name.as_str()) {
                return Err(MetadataError {
                    entity: self.name().to_string(),
                    kind: MetadataErrorKind::DuplicateRelation(relation.property_name.clone()),
                }
                .into());
            }
            if relation.fk_column_name.is_empty() {
                return Err(MetadataError {
                    entity: self.name().to_string(),
                    kind: MetadataErrorKind::MissingForeignKeyColumn(
                        relation.property_name.clone(),
                    ),
                }
                .into());
            }
            check_identifier(self.name(), &relation.fk_column_name)?;
            if relation.single_valued_owning() && relation.target_identity.is_empty() {
                return Err(MetadataError {
                    entity: self.name().to_string(),
                    kind: MetadataErrorKind::MissingTargetIdentity(relation.property_name.clone()),
                }
                .into());
            }
        }

        tracing::debug!(
            entity = self.name(),
            columns = self.columns.len(),
            relations = self.relations.len(),
            "Validated entity metadata"
        );
        Ok(())
    }
}

fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

fn check_identifier(entity: &str, name: &str) -> Result<()> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(MetadataError {
            entity: entity.to_string(),
            kind: MetadataErrorKind::InvalidIdentifier(name.to_string()),
        }
        .into())
    }
}
