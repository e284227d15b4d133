//! Error types for dirtycheck operations.
//!
//! Diffing itself is a total computation and raises no errors. Failures
//! surface only at the boundaries: typed extraction out of a [`Value`]
//! and metadata construction.
//!
//! [`Value`]: crate::Value

use std::fmt;

/// The primary error type for all dirtycheck operations.
#[derive(Debug)]
pub enum Error {
    /// Type conversion errors when extracting native values
    Type(TypeError),
    /// Metadata contract violations caught at construction time
    Metadata(MetadataError),
}

/// A failed conversion from a dynamic value to a native type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: &'static str,
    pub property: Option<String>,
}

/// A malformed entity-metadata definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataError {
    /// Display name of the entity whose metadata is malformed.
    pub entity: String,
    pub kind: MetadataErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataErrorKind {
    /// A property or column name does not have identifier shape
    InvalidIdentifier(String),
    /// Two columns share one property name
    DuplicateColumn(String),
    /// Two relations share one property name
    DuplicateRelation(String),
    /// A relation has an empty foreign-key column name
    MissingForeignKeyColumn(String),
    /// A single-valued owning relation has no target primary key
    MissingTargetIdentity(String),
}

impl Error {
    /// Is this a type conversion error?
    pub fn is_type(&self) -> bool {
        matches!(self, Error::Type(_))
    }

    /// Is this a metadata contract violation?
    pub fn is_metadata(&self) -> bool {
        matches!(self, Error::Metadata(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Metadata(e) => write!(f, "Metadata error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(property) = &self.property {
            write!(
                f,
                "expected {} for property '{}', found {}",
                self.expected, property, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity '{}': {}", self.entity, self.kind)
    }
}

impl fmt::Display for MetadataErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataErrorKind::InvalidIdentifier(name) => {
                write!(f, "name '{}' is not a valid identifier", name)
            }
            MetadataErrorKind::DuplicateColumn(name) => {
                write!(f, "duplicate column property '{}'", name)
            }
            MetadataErrorKind::DuplicateRelation(name) => {
                write!(f, "duplicate relation property '{}'", name)
            }
            MetadataErrorKind::MissingForeignKeyColumn(name) => {
                write!(f, "relation '{}' has no foreign-key column name", name)
            }
            MetadataErrorKind::MissingTargetIdentity(name) => {
                write!(f, "owning relation '{}' has no target primary key", name)
            }
        }
    }
}

impl From<TypeError> for Error {
    fn from(e: TypeError) -> Self {
        Error::Type(e)
    }
}

impl From<MetadataError> for Error {
    fn from(e: MetadataError) -> Self {
        Error::Metadata(e)
    }
}

/// Convenience result type for dirtycheck operations.
pub type Result<T> = std::result::Result<T, Error>;
