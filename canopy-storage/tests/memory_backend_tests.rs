use canopy_storage::{
    columns, AnnotationAggregate, AnnotationQuery, BackendOp, EntityBackend, EntityUpdate,
    MemoryBackend, NewAnnotation, NewEntityRow, NewMetadata, RelationshipQuery, SortOrder,
};
use canopy_types::{EntityType, Guid, Scalar, ValueType};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn new_row(entity_type: EntityType, subtype: &str, owner: Option<Guid>) -> NewEntityRow {
    NewEntityRow {
        entity_type,
        subtype: subtype.to_string(),
        owner_guid: owner,
        access_id: 2,
        site_guid: Guid::new(1),
        container_guid: owner,
    }
}

fn meta(guid: Guid, name: &str, value: &str, allow_multiple: bool) -> NewMetadata {
    NewMetadata {
        entity_guid: guid,
        name: name.to_string(),
        value: Scalar::from(value),
        value_type: ValueType::Auto,
        owner_guid: None,
        access_id: 2,
        allow_multiple,
    }
}

fn annotation(guid: Guid, name: &str, value: i64) -> NewAnnotation {
    NewAnnotation {
        entity_guid: guid,
        name: name.to_string(),
        value: Scalar::Int(value),
        value_type: ValueType::Integer,
        owner_guid: None,
        access_id: 2,
    }
}

// ── Entity rows ──────────────────────────────────────────────────

#[test]
fn create_assigns_increasing_guids() {
    let backend = MemoryBackend::new();
    let a = backend.create_entity_row(&new_row(EntityType::Object, "blog", None)).unwrap();
    let b = backend.create_entity_row(&new_row(EntityType::Object, "blog", None)).unwrap();
    assert_eq!(a.get(), 1);
    assert_eq!(b.get(), 2);
    assert_eq!(backend.entity_count(), 2);
}

#[test]
fn created_row_carries_core_columns() {
    let backend = MemoryBackend::new();
    let owner = Guid::new(77);
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "blog", owner)).unwrap();
    let row = backend.fetch_entity_row(guid, false).unwrap().unwrap();

    assert_eq!(row.entity_type(), Some(EntityType::Object));
    assert_eq!(row.owner_guid(), owner);
    assert_eq!(row.get(columns::ACCESS_ID), Some(&Scalar::Int(2)));
    assert!(row.is_enabled());
    assert!(row.get(columns::TIME_CREATED).is_some());
}

#[test]
fn subtypes_are_registered_once() {
    let backend = MemoryBackend::new();
    let id = backend.resolve_subtype_id(EntityType::Object, "blog").unwrap();
    assert_eq!(backend.resolve_subtype_id(EntityType::Object, "blog").unwrap(), id);
    assert_ne!(backend.resolve_subtype_id(EntityType::Object, "page").unwrap(), id);
    assert_eq!(backend.resolve_subtype_id(EntityType::Object, "").unwrap(), 0);
    assert_eq!(backend.resolve_subtype_name(id).unwrap().as_deref(), Some("blog"));
    assert_eq!(backend.resolve_subtype_name(999).unwrap(), None);
}

#[test]
fn update_changes_mutable_columns_only() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "blog", None)).unwrap();
    let before = backend.fetch_entity_row(guid, false).unwrap().unwrap();

    let updated = backend
        .update_entity_row(&EntityUpdate {
            guid,
            owner_guid: Guid::new(5),
            access_id: 1,
            container_guid: Guid::new(6),
        })
        .unwrap();
    assert!(updated);

    let after = backend.fetch_entity_row(guid, false).unwrap().unwrap();
    assert_eq!(after.owner_guid(), Guid::new(5));
    assert_eq!(after.container_guid(), Guid::new(6));
    assert_eq!(after.get(columns::TYPE), before.get(columns::TYPE));
    assert_eq!(after.get(columns::TIME_CREATED), before.get(columns::TIME_CREATED));
}

#[test]
fn update_of_unknown_guid_reports_false() {
    let backend = MemoryBackend::new();
    let update = EntityUpdate {
        guid: Guid::new(40).unwrap(),
        owner_guid: None,
        access_id: 0,
        container_guid: None,
    };
    assert!(!backend.update_entity_row(&update).unwrap());
}

#[test]
fn fragments_roundtrip_per_table() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    let mut cols = BTreeMap::new();
    cols.insert("title".to_string(), Scalar::from("Hello"));

    assert!(backend.upsert_fragment_row(guid, "objects_entity", &cols).unwrap());
    let row = backend.fetch_fragment_row(guid, "objects_entity").unwrap().unwrap();
    assert_eq!(row.get("title"), Some(&Scalar::from("Hello")));
    assert!(backend.fetch_fragment_row(guid, "users_entity").unwrap().is_none());
}

#[test]
fn delete_removes_attached_rows() {
    let backend = MemoryBackend::new();
    let a = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    let b = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    backend.create_metadata(&meta(a, "color", "red", false)).unwrap();
    backend.add_relationship(b, "likes", a).unwrap();

    assert!(backend.delete_entity_row(a).unwrap());
    assert!(backend.fetch_entity_row(a, true).unwrap().is_none());
    assert_eq!(backend.metadata_count(), 0);
    let likes = RelationshipQuery::new(b, "likes");
    assert_eq!(backend.count_related_entities(&likes).unwrap(), 0);
    assert!(!backend.delete_entity_row(a).unwrap());
}

// ── Disable / enable ─────────────────────────────────────────────

#[test]
fn disabled_rows_are_hidden_unless_requested() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    assert!(backend.disable_entity(guid, "spam", false).unwrap());

    assert!(backend.fetch_entity_row(guid, false).unwrap().is_none());
    assert!(backend.fetch_entity_row(guid, true).unwrap().is_some());
    assert_eq!(
        backend.get_private_setting(guid, "disable_reason").unwrap().as_deref(),
        Some("spam")
    );

    assert!(backend.enable_entity(guid).unwrap());
    assert!(backend.fetch_entity_row(guid, false).unwrap().is_some());
    assert!(backend.get_private_setting(guid, "disable_reason").unwrap().is_none());
}

#[test]
fn recursive_disable_cascades_to_owned_and_contained() {
    let backend = MemoryBackend::new();
    let user = backend.create_entity_row(&new_row(EntityType::User, "", None)).unwrap();
    let post = backend.create_entity_row(&new_row(EntityType::Object, "blog", Some(user))).unwrap();
    let comment = backend
        .create_entity_row(&new_row(EntityType::Object, "comment", Some(post)))
        .unwrap();
    let stranger = backend.create_entity_row(&new_row(EntityType::Object, "blog", None)).unwrap();

    assert!(backend.disable_entity(user, "", true).unwrap());
    for guid in [user, post, comment] {
        assert!(backend.fetch_entity_row(guid, false).unwrap().is_none());
    }
    assert!(backend.fetch_entity_row(stranger, false).unwrap().is_some());
}

#[test]
fn recursive_disable_terminates_on_cyclic_containment() {
    let backend = MemoryBackend::new();
    let a = backend.create_entity_row(&new_row(EntityType::Group, "", None)).unwrap();
    let b = backend.create_entity_row(&new_row(EntityType::Group, "", Some(a))).unwrap();
    // Point a back at b to close the cycle.
    backend
        .update_entity_row(&EntityUpdate {
            guid: a,
            owner_guid: Some(b),
            access_id: 2,
            container_guid: Some(b),
        })
        .unwrap();

    assert!(backend.disable_entity(a, "", true).unwrap());
    assert!(backend.fetch_entity_row(a, false).unwrap().is_none());
    assert!(backend.fetch_entity_row(b, false).unwrap().is_none());
}

#[test]
fn non_recursive_disable_leaves_children() {
    let backend = MemoryBackend::new();
    let user = backend.create_entity_row(&new_row(EntityType::User, "", None)).unwrap();
    let post = backend.create_entity_row(&new_row(EntityType::Object, "", Some(user))).unwrap();

    backend.disable_entity(user, "", false).unwrap();
    assert!(backend.fetch_entity_row(post, false).unwrap().is_some());
}

// ── Metadata ─────────────────────────────────────────────────────

#[test]
fn single_valued_metadata_replaces() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    backend.create_metadata(&meta(guid, "color", "red", false)).unwrap();
    backend.create_metadata(&meta(guid, "color", "blue", false)).unwrap();

    let rows = backend.get_metadata(guid, "color").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, Scalar::from("blue"));
    assert_eq!(rows[0].value_type, ValueType::Text);
}

#[test]
fn multi_valued_metadata_appends_in_order() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    for tag in ["a", "b", "c"] {
        backend.create_metadata(&meta(guid, "tags", tag, true)).unwrap();
    }
    let values: Vec<Scalar> = backend
        .get_metadata(guid, "tags")
        .unwrap()
        .into_iter()
        .map(|m| m.value)
        .collect();
    assert_eq!(values, vec![Scalar::from("a"), Scalar::from("b"), Scalar::from("c")]);
}

#[test]
fn metadata_on_unknown_entity_is_an_error() {
    let backend = MemoryBackend::new();
    let err = backend
        .create_metadata(&meta(Guid::new(9).unwrap(), "x", "y", false))
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn remove_metadata_by_name_or_all() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    backend.create_metadata(&meta(guid, "a", "1", false)).unwrap();
    backend.create_metadata(&meta(guid, "b", "2", false)).unwrap();

    assert!(backend.remove_metadata(guid, Some("a")).unwrap());
    assert!(!backend.remove_metadata(guid, Some("a")).unwrap());
    assert_eq!(backend.all_metadata(guid).unwrap().len(), 1);
    assert!(backend.remove_metadata(guid, None).unwrap());
    assert!(backend.all_metadata(guid).unwrap().is_empty());
}

// ── Annotations ──────────────────────────────────────────────────

#[test]
fn annotations_list_count_and_order() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    for v in [3, 1, 2] {
        backend.create_annotation(&annotation(guid, "rating", v)).unwrap();
    }
    backend.create_annotation(&annotation(guid, "views", 10)).unwrap();

    assert_eq!(backend.count_annotations(guid, Some("rating")).unwrap(), 3);
    assert_eq!(backend.count_annotations(guid, None).unwrap(), 4);

    let mut query = AnnotationQuery::new(guid);
    query.name = Some("rating".into());
    query.order = SortOrder::Descending;
    query.limit = Some(2);
    let values: Vec<Scalar> = backend
        .get_annotations(&query)
        .unwrap()
        .into_iter()
        .map(|a| a.value)
        .collect();
    assert_eq!(values, vec![Scalar::Int(2), Scalar::Int(1)]);
}

#[test]
fn annotation_aggregates() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    for v in [4, 8, 6] {
        backend.create_annotation(&annotation(guid, "rating", v)).unwrap();
    }

    let agg = |a| backend.aggregate_annotations(guid, "rating", a).unwrap();
    assert_eq!(agg(AnnotationAggregate::Sum), Some(18.0));
    assert_eq!(agg(AnnotationAggregate::Average), Some(6.0));
    assert_eq!(agg(AnnotationAggregate::Min), Some(4.0));
    assert_eq!(agg(AnnotationAggregate::Max), Some(8.0));

    let empty = |a| backend.aggregate_annotations(guid, "none", a).unwrap();
    assert_eq!(empty(AnnotationAggregate::Sum), Some(0.0));
    assert_eq!(empty(AnnotationAggregate::Max), None);
}

#[test]
fn clear_annotations_by_name() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    backend.create_annotation(&annotation(guid, "a", 1)).unwrap();
    backend.create_annotation(&annotation(guid, "b", 1)).unwrap();

    assert!(backend.clear_annotations(guid, Some("a")).unwrap());
    assert_eq!(backend.count_annotations(guid, None).unwrap(), 1);
}

// ── Relationships ────────────────────────────────────────────────

#[test]
fn relationships_forward_inverse_and_filters() {
    let backend = MemoryBackend::new();
    let user = backend.create_entity_row(&new_row(EntityType::User, "", None)).unwrap();
    let group = backend.create_entity_row(&new_row(EntityType::Group, "", None)).unwrap();
    let blog = backend.create_entity_row(&new_row(EntityType::Object, "blog", None)).unwrap();

    assert!(backend.add_relationship(user, "member", group).unwrap());
    assert!(!backend.add_relationship(user, "member", group).unwrap());
    backend.add_relationship(user, "member", blog).unwrap();

    let mut query = RelationshipQuery::new(user, "member");
    assert_eq!(backend.count_related_entities(&query).unwrap(), 2);

    query.entity_type = Some(EntityType::Object);
    query.subtype = Some("blog".into());
    let rows = backend.get_related_entities(&query).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].guid, blog);

    let mut inverse = RelationshipQuery::new(group, "member");
    inverse.inverse = true;
    let rows = backend.get_related_entities(&inverse).unwrap();
    assert_eq!(rows[0].guid, user);
}

#[test]
fn related_entities_skip_hidden_by_default() {
    let backend = MemoryBackend::new();
    let a = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    let b = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    backend.add_relationship(a, "friend", b).unwrap();
    backend.disable_entity(b, "", false).unwrap();

    let mut query = RelationshipQuery::new(a, "friend");
    assert_eq!(backend.count_related_entities(&query).unwrap(), 0);
    query.include_hidden = true;
    assert_eq!(backend.count_related_entities(&query).unwrap(), 1);
}

#[test]
fn remove_all_relationships_by_direction() {
    let backend = MemoryBackend::new();
    let a = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    let b = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    backend.add_relationship(a, "friend", b).unwrap();
    backend.add_relationship(b, "friend", a).unwrap();

    backend.remove_all_relationships(a, None, false).unwrap();
    assert_eq!(backend.count_related_entities(&RelationshipQuery::new(a, "friend")).unwrap(), 0);
    assert_eq!(backend.count_related_entities(&RelationshipQuery::new(b, "friend")).unwrap(), 1);

    backend.remove_all_relationships(a, Some("friend"), true).unwrap();
    assert_eq!(backend.count_related_entities(&RelationshipQuery::new(b, "friend")).unwrap(), 0);
}

// ── Fault injection ──────────────────────────────────────────────

#[test]
fn fail_next_fails_exactly_once() {
    let backend = MemoryBackend::new();
    backend.fail_next(BackendOp::CreateEntity);
    assert!(backend.create_entity_row(&new_row(EntityType::Object, "", None)).is_err());
    assert!(backend.create_entity_row(&new_row(EntityType::Object, "", None)).is_ok());
}

#[test]
fn fail_after_lets_calls_through_first() {
    let backend = MemoryBackend::new();
    let guid = backend.create_entity_row(&new_row(EntityType::Object, "", None)).unwrap();
    backend.fail_after(BackendOp::CreateMetadata, 2);

    assert!(backend.create_metadata(&meta(guid, "t", "a", true)).is_ok());
    assert!(backend.create_metadata(&meta(guid, "t", "b", true)).is_ok());
    assert!(backend.create_metadata(&meta(guid, "t", "c", true)).is_err());
    assert!(backend.create_metadata(&meta(guid, "t", "d", true)).is_ok());
}
