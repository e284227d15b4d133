//! Identifier extraction and comparison.
//!
//! An [`IdentityResolver`] is bound to one entity type's primary key and
//! knows how to read a full or simplified identifier off an
//! [`EntityRecord`], compare composite identifiers, and wrap a freshly
//! generated single value into the canonical map shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::EntityRecord;
use crate::value::Value;

/// A mapping from physical primary-key column name to value.
///
/// Supports composite keys. This is the one canonical identifier map
/// shape; record lookups go by property name, map keys are always the
/// physical column names.
pub type IdentifierMap = HashMap<String, Value>;

/// A resolved identifier value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Identifier {
    /// The simplified single-column form, also the shape of a freshly
    /// generated key.
    Value(Value),
    /// The composite form.
    Map(IdentifierMap),
}

impl Identifier {
    /// Is this the single-value form?
    pub fn is_value(&self) -> bool {
        matches!(self, Identifier::Value(_))
    }

    /// Is this the composite map form?
    pub fn is_map(&self) -> bool {
        matches!(self, Identifier::Map(_))
    }
}

/// One primary-key column of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityColumn {
    /// Property name on the entity record.
    pub property_name: String,
    /// Physical column name, used as the map key.
    pub column_name: String,
}

/// Resolves identifiers for one entity type.
///
/// Holds the entity's primary-key columns in declaration order. All map
/// shapes produced here are keyed by physical column name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdentityResolver {
    columns: Vec<IdentityColumn>,
}

impl IdentityResolver {
    /// Create a resolver over the given primary-key pairs, in order.
    pub fn new<P, C>(columns: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(property, column)| IdentityColumn {
                    property_name: property.into(),
                    column_name: column.into(),
                })
                .collect(),
        }
    }

    /// Convenience constructor for a single-column identity.
    pub fn single(property: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new([(property.into(), column.into())])
    }

    /// The primary-key columns, in declaration order.
    pub fn columns(&self) -> &[IdentityColumn] {
        &self.columns
    }

    /// Does this resolver describe no primary key at all?
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Extract the full identifier map from a record.
    ///
    /// `None` unless every primary column is defined and non-null.
    pub fn full_identifier_map(&self, record: &EntityRecord) -> Option<IdentifierMap> {
        if self.columns.is_empty() {
            return None;
        }
        let mut map = IdentifierMap::new();
        for column in &self.columns {
            let value = record.value(&column.property_name)?;
            if value.is_null() {
                return None;
            }
            map.insert(column.column_name.clone(), value.clone());
        }
        Some(map)
    }

    /// Extract the simplified identifier from a record.
    ///
    /// A single-column identity yields the bare value, a composite one
    /// yields the map. `None` under the same condition as
    /// [`full_identifier_map`](Self::full_identifier_map).
    pub fn simplified_identifier(&self, record: &EntityRecord) -> Option<Identifier> {
        let map = self.full_identifier_map(record)?;
        if let [only] = self.columns.as_slice() {
            let value = map.get(&only.column_name).cloned()?;
            return Some(Identifier::Value(value));
        }
        Some(Identifier::Map(map))
    }

    /// Composite-aware identifier-map equality: same key set, equal
    /// values per key.
    pub fn identifiers_equal(&self, a: &IdentifierMap, b: &IdentifierMap) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.iter().all(|(key, value)| b.get(key) == Some(value))
    }

    /// Wrap a single generated value into the canonical map shape, keyed
    /// by the first primary column's name.
    ///
    /// A generated key only ever exists for single-column identities, so
    /// the first column is the whole key. Empty map if the resolver has
    /// no columns.
    pub fn synthetic_identifier_map(&self, value: Value) -> IdentifierMap {
        let mut map = IdentifierMap::new();
        if let Some(first) = self.columns.first() {
            map.insert(first.column_name.clone(), value);
        }
        map
    }

    /// Convert any [`Identifier`] to the canonical map shape.
    pub fn canonical_map(&self, identifier: &Identifier) -> IdentifierMap {
        match identifier {
            Identifier::Map(map) => map.clone(),
            Identifier::Value(value) => self.synthetic_identifier_map(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_identity() -> IdentityResolver {
        IdentityResolver::single("id", "id")
    }

    fn composite_identity() -> IdentityResolver {
        IdentityResolver::new([("orderId", "order_id"), ("lineNo", "line_no")])
    }

    #[test]
    fn test_full_map_requires_all_columns_non_null() {
        let identity = composite_identity();

        let full = EntityRecord::new().with("orderId", 1i64).with("lineNo", 2i64);
        let map = identity.full_identifier_map(&full).unwrap();
        assert_eq!(map.get("order_id"), Some(&Value::Int(1)));
        assert_eq!(map.get("line_no"), Some(&Value::Int(2)));

        let partial = EntityRecord::new().with("orderId", 1i64);
        assert!(identity.full_identifier_map(&partial).is_none());

        let with_null = EntityRecord::new().with("orderId", 1i64).with("lineNo", Value::Null);
        assert!(identity.full_identifier_map(&with_null).is_none());
    }

    #[test]
    fn test_simplified_identifier_shapes() {
        let record = EntityRecord::new().with("id", 5i64);
        assert_eq!(
            post_identity().simplified_identifier(&record),
            Some(Identifier::Value(Value::Int(5)))
        );

        let record = EntityRecord::new().with("orderId", 1i64).with("lineNo", 2i64);
        match composite_identity().simplified_identifier(&record) {
            Some(Identifier::Map(map)) => assert_eq!(map.len(), 2),
            other => panic!("expected composite map, got {other:?}"),
        }
    }

    #[test]
    fn test_identifiers_equal_is_symmetric() {
        let identity = composite_identity();
        let a: IdentifierMap = [
            ("order_id".to_string(), Value::Int(1)),
            ("line_no".to_string(), Value::Int(2)),
        ]
        .into_iter()
        .collect();
        let b = a.clone();

        assert!(identity.identifiers_equal(&a, &b));
        assert!(identity.identifiers_equal(&b, &a));
    }

    #[test]
    fn test_subset_maps_are_not_equal() {
        let identity = composite_identity();
        let full: IdentifierMap = [
            ("order_id".to_string(), Value::Int(1)),
            ("line_no".to_string(), Value::Int(2)),
        ]
        .into_iter()
        .collect();
        let subset: IdentifierMap =
            [("order_id".to_string(), Value::Int(1))].into_iter().collect();

        assert!(!identity.identifiers_equal(&full, &subset));
        assert!(!identity.identifiers_equal(&subset, &full));
    }

    #[test]
    fn test_synthetic_map_uses_first_primary_column() {
        let map = post_identity().synthetic_identifier_map(Value::Int(42));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("id"), Some(&Value::Int(42)));

        let map = composite_identity().synthetic_identifier_map(Value::Int(42));
        assert_eq!(map.get("order_id"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_canonical_map_passes_maps_through() {
        let identity = post_identity();
        let map: IdentifierMap = [("id".to_string(), Value::Int(7))].into_iter().collect();
        assert_eq!(identity.canonical_map(&Identifier::Map(map.clone())), map);
        assert_eq!(identity.canonical_map(&Identifier::Value(Value::Int(7))), map);
    }
}
