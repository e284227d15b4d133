//! Column and relation diff engines.
//!
//! Both engines are total functions over well-formed metadata and
//! snapshots: they compute which columns and which owning single-valued
//! relations differ between a proposed entity state and its database
//! snapshot, and never fail. Returned sets preserve metadata declaration
//! order and contain no duplicates.

use dirtycheck_core::identity::Identifier;
use dirtycheck_core::metadata::{ColumnKind, ColumnMetadata, EntityMetadata, RelationMetadata};
use dirtycheck_core::normalize;
use dirtycheck_core::record::{EntityRecord, PropertyValue};
use dirtycheck_core::value::Value;

/// Compute the set of scalar columns whose normalized value differs
/// between the entity and the database snapshot.
///
/// A column is skipped when any exclusion holds:
///
/// 1. it is virtual, a tree parent link, a discriminator, a
///    create/update timestamp, or a version column;
/// 2. the entity does not define the property at all (an untouched
///    property is never an intentional null);
/// 3. the normalized entity value equals the normalized database value;
/// 4. it is not an embedded member, it physically backs a relation's
///    foreign key, and the entity provides a non-null value under that
///    relation's property name (the relation engine owns the change;
///    one foreign key must never produce two diff entries).
#[tracing::instrument(level = "trace", skip_all, fields(entity = metadata.name()))]
pub fn diff_columns(
    metadata: &EntityMetadata,
    entity: &EntityRecord,
    snapshot: &EntityRecord,
) -> Vec<ColumnMetadata> {
    let changed: Vec<ColumnMetadata> = metadata
        .columns
        .iter()
        .filter(|column| {
            let differs = column_differs(metadata, column, entity, snapshot);
            tracing::trace!(
                column = %column.property_name,
                differs = differs,
                "Column diff candidate"
            );
            differs
        })
        .cloned()
        .collect();

    tracing::debug!(
        entity = metadata.name(),
        changed_count = changed.len(),
        "Computed column diff"
    );
    changed
}

fn column_differs(
    metadata: &EntityMetadata,
    column: &ColumnMetadata,
    entity: &EntityRecord,
    snapshot: &EntityRecord,
) -> bool {
    let mut entity_value = column.value_of(entity);
    let mut database_value = column.value_of(snapshot);

    // Normalization applies only when the entity side is present and
    // non-null; which sides it touches is kind-specific.
    if let Some(value) = &entity_value {
        if !value.is_null() {
            match column.kind {
                ColumnKind::Date => entity_value = Some(normalize::date_string(value)),
                ColumnKind::Time => entity_value = Some(normalize::time_string(value)),
                ColumnKind::DateTime => {
                    entity_value = Some(normalize::datetime_string(value, column.timezone));
                    database_value = database_value
                        .map(|db| normalize::datetime_string(&db, column.timezone));
                }
                ColumnKind::Json => {
                    entity_value = Some(normalize::json_string(value));
                    database_value = match database_value {
                        Some(db) if !db.is_null() => Some(normalize::json_string(&db)),
                        other => other,
                    };
                }
                ColumnKind::SimpleArray => {
                    entity_value = Some(normalize::simple_array(value));
                    database_value = database_value.map(|db| normalize::simple_array(&db));
                }
                ColumnKind::Plain => {}
            }
        }
    }

    if column.excluded_from_diff()
        || !entity.defines(&column.property_name)
        || entity_value == database_value
    {
        return false;
    }

    // A column backing a relation's foreign key defers to the relation
    // engine whenever the entity also sets the relation's own property
    // (object reference or raw identifier alike).
    if !column.embedded {
        if let Some(relation) = metadata.relation_with_fk_column(&column.property_name) {
            match relation.property_of(entity) {
                Some(slot) if !slot.is_null() => return false,
                _ => {}
            }
        }
    }

    true
}

/// Compute the set of owning single-valued relations whose foreign-key
/// value differs between the entity and the database snapshot.
///
/// Only many-to-one relations and owning one-to-one relations are
/// candidates. The database side is read under the relation's physical
/// foreign-key column name; snapshots materialize relation identifiers
/// there, not under the property name.
#[tracing::instrument(level = "trace", skip_all, fields(entity = metadata.name()))]
pub fn diff_relations(
    metadata: &EntityMetadata,
    entity: &EntityRecord,
    snapshot: &EntityRecord,
) -> Vec<RelationMetadata> {
    let changed: Vec<RelationMetadata> = metadata
        .relations
        .iter()
        .filter(|relation| {
            let differs = relation_differs(relation, entity, snapshot);
            tracing::trace!(
                relation = %relation.property_name,
                differs = differs,
                "Relation diff candidate"
            );
            differs
        })
        .cloned()
        .collect();

    tracing::debug!(
        entity = metadata.name(),
        changed_count = changed.len(),
        "Computed relation diff"
    );
    changed
}

fn relation_differs(
    relation: &RelationMetadata,
    entity: &EntityRecord,
    snapshot: &EntityRecord,
) -> bool {
    if !relation.single_valued_owning() {
        return false;
    }

    // An untouched property is never a change.
    let Some(updated_id) = updated_relation_identifier(relation, entity) else {
        return false;
    };

    let db_id = snapshot.value(&relation.fk_column_name);

    // Both sides empty: nothing to do.
    let updated_is_null = matches!(&updated_id, Identifier::Value(Value::Null));
    let db_is_null = db_id.is_none() || db_id.is_some_and(Value::is_null);
    if updated_is_null && db_is_null {
        return false;
    }

    // Plain value inequality, deliberately not the composite-aware
    // comparison: a composite identifier map never equals the scalar
    // snapshot value, so composite-key targets always register as
    // changed here.
    match &updated_id {
        Identifier::Map(_) => true,
        Identifier::Value(value) => db_id != Some(value),
    }
}

/// Resolve the updated foreign-key identifier the entity expresses for a
/// relation, or `None` when the property is untouched.
///
/// Two shapes are supported: a related-entity reference, resolved
/// through the relation target's own primary key, and a bare scalar
/// assigned in place of an object reference.
pub fn updated_relation_identifier(
    relation: &RelationMetadata,
    entity: &EntityRecord,
) -> Option<Identifier> {
    match relation.property_of(entity)? {
        PropertyValue::Reference(record) => relation.target_identity.simplified_identifier(&record),
        PropertyValue::Value(value) => Some(Identifier::Value(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dirtycheck_core::identity::IdentityResolver;
    use dirtycheck_core::metadata::TimezonePolicy;

    fn author_relation() -> RelationMetadata {
        RelationMetadata::new("author")
            .fk_column("author_id")
            .target_identity(IdentityResolver::single("id", "id"))
    }

    fn post_metadata() -> EntityMetadata {
        EntityMetadata::named("Post")
            .column(ColumnMetadata::new("id").primary_key(true))
            .column(ColumnMetadata::new("title"))
            .column(ColumnMetadata::new("author_id"))
            .relation(author_relation())
    }

    fn changed_columns(
        metadata: &EntityMetadata,
        entity: &EntityRecord,
        snapshot: &EntityRecord,
    ) -> Vec<String> {
        diff_columns(metadata, entity, snapshot)
            .into_iter()
            .map(|c| c.property_name)
            .collect()
    }

    fn changed_relations(
        metadata: &EntityMetadata,
        entity: &EntityRecord,
        snapshot: &EntityRecord,
    ) -> Vec<String> {
        diff_relations(metadata, entity, snapshot)
            .into_iter()
            .map(|r| r.property_name)
            .collect()
    }

    #[test]
    fn test_equal_values_never_diff() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64).with("title", "hello");
        let snapshot = EntityRecord::new().with("id", 1i64).with("title", "hello");
        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_changed_value_diffs() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64).with("title", "new");
        let snapshot = EntityRecord::new().with("id", 1i64).with("title", "old");
        assert_eq!(changed_columns(&metadata, &entity, &snapshot), vec!["title"]);
    }

    #[test]
    fn test_undefined_property_never_diffs() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64);
        let snapshot = EntityRecord::new().with("id", 1i64).with("title", "old");
        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_explicit_null_diffs_against_value() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64).with("title", Value::Null);
        let snapshot = EntityRecord::new().with("id", 1i64).with("title", "old");
        assert_eq!(changed_columns(&metadata, &entity, &snapshot), vec!["title"]);
    }

    #[test]
    fn test_excluded_flag_columns_never_diff() {
        let metadata = EntityMetadata::named("Node")
            .column(ColumnMetadata::new("computed").virtual_column(true))
            .column(ColumnMetadata::new("parent_id").parent_link(true))
            .column(ColumnMetadata::new("kind").discriminator(true))
            .column(ColumnMetadata::new("created_at").create_date(true))
            .column(ColumnMetadata::new("updated_at").update_date(true))
            .column(ColumnMetadata::new("revision").version(true));
        let entity = EntityRecord::new()
            .with("computed", 1i64)
            .with("parent_id", 1i64)
            .with("kind", "a")
            .with("created_at", "2024-01-01")
            .with("updated_at", "2024-01-01")
            .with("revision", 1i64);
        let snapshot = EntityRecord::new()
            .with("computed", 2i64)
            .with("parent_id", 2i64)
            .with("kind", "b")
            .with("created_at", "2023-01-01")
            .with("updated_at", "2023-01-01")
            .with("revision", 2i64);
        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_json_column_compares_canonical_form() {
        let metadata = EntityMetadata::named("Doc")
            .column(ColumnMetadata::new("payload").kind(ColumnKind::Json));

        let entity = EntityRecord::new().with("payload", serde_json::json!({"a": 1}));
        let same = EntityRecord::new().with("payload", serde_json::json!({"a": 1}));
        assert!(changed_columns(&metadata, &entity, &same).is_empty());

        let different = EntityRecord::new().with("payload", serde_json::json!({"a": 2}));
        assert_eq!(
            changed_columns(&metadata, &entity, &different),
            vec!["payload"]
        );
    }

    #[test]
    fn test_json_column_matches_serialized_snapshot() {
        // Snapshots may hold the already-serialized text form.
        let metadata = EntityMetadata::named("Doc")
            .column(ColumnMetadata::new("payload").kind(ColumnKind::Json));
        let entity = EntityRecord::new().with("payload", serde_json::json!({"a": 1, "b": 2}));
        let snapshot = EntityRecord::new().with("payload", r#"{"b":2,"a":1}"#);
        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_date_column_discards_time_of_day() {
        let metadata = EntityMetadata::named("Event")
            .column(ColumnMetadata::new("day").kind(ColumnKind::Date));
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 15, 30, 0).unwrap();
        let entity = EntityRecord::new().with("day", ts);
        let snapshot = EntityRecord::new().with("day", "2024-01-01");
        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());

        let other_day = EntityRecord::new().with("day", "2024-01-02");
        assert_eq!(changed_columns(&metadata, &entity, &other_day), vec!["day"]);
    }

    #[test]
    fn test_datetime_column_normalizes_both_sides() {
        let metadata = EntityMetadata::named("Event").column(
            ColumnMetadata::new("at")
                .kind(ColumnKind::DateTime)
                .timezone(TimezonePolicy::Utc),
        );
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 15, 30, 0).unwrap();
        let entity = EntityRecord::new().with("at", ts);
        let snapshot = EntityRecord::new().with("at", ts);
        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());

        let later = Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap();
        let snapshot = EntityRecord::new().with("at", later);
        assert_eq!(changed_columns(&metadata, &entity, &snapshot), vec!["at"]);
    }

    #[test]
    fn test_simple_array_text_equals_array() {
        let metadata = EntityMetadata::named("Post")
            .column(ColumnMetadata::new("tags").kind(ColumnKind::SimpleArray));
        let entity = EntityRecord::new().with("tags", "a,b");
        let snapshot = EntityRecord::new().with(
            "tags",
            Value::Array(vec![Value::Text("a".into()), Value::Text("b".into())]),
        );
        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());

        let reordered = EntityRecord::new().with("tags", "b,a");
        assert_eq!(changed_columns(&metadata, &entity, &reordered), vec!["tags"]);
    }

    #[test]
    fn test_fk_backing_column_defers_to_relation_object() {
        // Entity sets both the relation object and its backing column:
        // only the relation diffs, never the column.
        let metadata = post_metadata();
        let entity = EntityRecord::new()
            .with("id", 1i64)
            .with("author_id", 6i64)
            .with_reference("author", EntityRecord::new().with("id", 6i64));
        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", 5i64);

        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());
        assert_eq!(changed_relations(&metadata, &entity, &snapshot), vec!["author"]);
    }

    #[test]
    fn test_fk_backing_column_defers_to_raw_identifier_too() {
        let metadata = post_metadata();
        let entity = EntityRecord::new()
            .with("id", 1i64)
            .with("author_id", 6i64)
            .with("author", 6i64);
        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", 5i64);

        assert!(changed_columns(&metadata, &entity, &snapshot).is_empty());
        assert_eq!(changed_relations(&metadata, &entity, &snapshot), vec!["author"]);
    }

    #[test]
    fn test_fk_backing_column_diffs_when_relation_property_null() {
        let metadata = post_metadata();
        let entity = EntityRecord::new()
            .with("id", 1i64)
            .with("author_id", 6i64)
            .with("author", Value::Null);
        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", 5i64);
        assert_eq!(
            changed_columns(&metadata, &entity, &snapshot),
            vec!["author_id"]
        );
    }

    #[test]
    fn test_relation_object_equal_to_snapshot_fk_excluded() {
        let metadata = post_metadata();
        let entity = EntityRecord::new()
            .with("id", 1i64)
            .with_reference("author", EntityRecord::new().with("id", 5i64));
        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", 5i64);
        assert!(changed_relations(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_relation_raw_id_differs() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64).with("author", 6i64);
        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", 5i64);

        assert_eq!(changed_relations(&metadata, &entity, &snapshot), vec!["author"]);
        assert_eq!(
            updated_relation_identifier(metadata.find_relation("author").unwrap(), &entity),
            Some(Identifier::Value(Value::Int(6)))
        );
    }

    #[test]
    fn test_relation_untouched_property_skipped() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64);
        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", 5i64);
        assert!(changed_relations(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_relation_both_sides_empty_skipped() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64).with("author", Value::Null);

        let snapshot = EntityRecord::new().with("id", 1i64);
        assert!(changed_relations(&metadata, &entity, &snapshot).is_empty());

        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", Value::Null);
        assert!(changed_relations(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_relation_null_against_value_diffs() {
        let metadata = post_metadata();
        let entity = EntityRecord::new().with("id", 1i64).with("author", Value::Null);
        let snapshot = EntityRecord::new().with("id", 1i64).with("author_id", 5i64);
        assert_eq!(changed_relations(&metadata, &entity, &snapshot), vec!["author"]);
    }

    #[test]
    fn test_inverse_and_collection_relations_ignored() {
        use dirtycheck_core::metadata::RelationKind;
        let metadata = EntityMetadata::named("Author")
            .relation(
                RelationMetadata::new("posts")
                    .kind(RelationKind::OneToMany)
                    .owning(false)
                    .fk_column("author_id"),
            )
            .relation(
                RelationMetadata::new("profile")
                    .kind(RelationKind::OneToOne)
                    .owning(false)
                    .fk_column("profile_id"),
            );
        let entity = EntityRecord::new().with("posts", 1i64).with("profile", 1i64);
        let snapshot = EntityRecord::new()
            .with("author_id", 2i64)
            .with("profile_id", 2i64);
        assert!(changed_relations(&metadata, &entity, &snapshot).is_empty());
    }

    #[test]
    fn test_composite_target_always_registers_as_changed() {
        // The relation engine compares with plain value inequality, not
        // the composite-aware comparison; a composite identifier map
        // never equals the scalar snapshot value. Known limitation,
        // kept deliberately.
        let metadata = EntityMetadata::named("Shipment").relation(
            RelationMetadata::new("line")
                .fk_column("line_id")
                .target_identity(IdentityResolver::new([
                    ("orderId", "order_id"),
                    ("lineNo", "line_no"),
                ])),
        );
        let entity = EntityRecord::new().with_reference(
            "line",
            EntityRecord::new().with("orderId", 1i64).with("lineNo", 2i64),
        );
        let snapshot = EntityRecord::new().with("line_id", 1i64);
        assert_eq!(changed_relations(&metadata, &entity, &snapshot), vec!["line"]);
    }

    #[test]
    fn test_diff_preserves_declaration_order() {
        let metadata = EntityMetadata::named("Post")
            .column(ColumnMetadata::new("title"))
            .column(ColumnMetadata::new("body"))
            .column(ColumnMetadata::new("slug"));
        let entity = EntityRecord::new()
            .with("slug", "s2")
            .with("title", "t2")
            .with("body", "b2");
        let snapshot = EntityRecord::new()
            .with("slug", "s1")
            .with("title", "t1")
            .with("body", "b1");
        assert_eq!(
            changed_columns(&metadata, &entity, &snapshot),
            vec!["title", "body", "slug"]
        );
    }
}
