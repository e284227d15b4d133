//! Core types for dirtycheck.
//!
//! This crate provides the foundational abstractions for entity change
//! tracking:
//!
//! - `Value` for dynamically-typed column values
//! - `EntityRecord` for dynamically-keyed entity state and snapshots
//! - `EntityMetadata` / `ColumnMetadata` / `RelationMetadata` descriptors
//! - `IdentityResolver` for composite-aware identifier handling
//! - `normalize` for type-aware value canonicalization

pub mod error;
pub mod identity;
pub mod metadata;
pub mod normalize;
pub mod record;
pub mod value;

pub use error::{Error, MetadataError, MetadataErrorKind, Result, TypeError};
pub use identity::{Identifier, IdentifierMap, IdentityColumn, IdentityResolver};
pub use metadata::{
    ColumnAccessor, ColumnKind, ColumnMetadata, EntityMetadata, EntityTarget, RelationAccessor,
    RelationKind, RelationMetadata, TimezonePolicy,
};
pub use record::{EntityRecord, PropertyValue};
pub use value::Value;
