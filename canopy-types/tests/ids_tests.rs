use canopy_types::{EntityType, ExternalId, Guid};
use std::str::FromStr;
use uuid::Uuid;

// ── Guid ─────────────────────────────────────────────────────────

#[test]
fn guid_rejects_zero() {
    assert!(Guid::new(0).is_none());
    assert_eq!(Guid::new(7).map(|g| g.get()), Some(7));
}

#[test]
fn guid_from_column_ignores_non_positive() {
    assert!(Guid::from_column(0).is_none());
    assert!(Guid::from_column(-3).is_none());
    assert_eq!(Guid::from_column(42).unwrap().as_column(), 42);
}

#[test]
fn guid_parse_roundtrip() {
    let guid = Guid::new(1234).unwrap();
    let parsed: Guid = guid.to_string().parse().unwrap();
    assert_eq!(parsed, guid);
}

#[test]
fn guid_parse_rejects_garbage_and_zero() {
    assert!(Guid::from_str("abc").is_err());
    assert!(Guid::from_str("0").is_err());
    assert!(Guid::from_str("-1").is_err());
}

#[test]
fn guid_serializes_as_bare_number() {
    let guid = Guid::new(9).unwrap();
    assert_eq!(serde_json::to_string(&guid).unwrap(), "9");
}

// ── ExternalId ───────────────────────────────────────────────────

#[test]
fn external_id_is_stable_per_namespace() {
    let ns = Uuid::new_v4();
    let guid = Guid::new(5).unwrap();
    assert_eq!(ExternalId::derive(&ns, guid), ExternalId::derive(&ns, guid));
}

#[test]
fn external_id_differs_across_guids_and_namespaces() {
    let ns = Uuid::new_v4();
    let a = ExternalId::derive(&ns, Guid::new(1).unwrap());
    let b = ExternalId::derive(&ns, Guid::new(2).unwrap());
    let c = ExternalId::derive(&Uuid::new_v4(), Guid::new(1).unwrap());
    assert_ne!(a, b);
    assert_ne!(a, c);
}

#[test]
fn external_id_display_is_urn_and_parses_back() {
    let id = ExternalId::derive(&Uuid::new_v4(), Guid::new(3).unwrap());
    let text = id.to_string();
    assert!(text.starts_with("urn:uuid:"));
    assert_eq!(text.parse::<ExternalId>().unwrap(), id);
}

#[test]
fn external_id_rejects_malformed_uuid() {
    let err = "urn:uuid:not-a-uuid".parse::<ExternalId>().unwrap_err();
    assert!(matches!(err, canopy_types::Error::InvalidUuid(_)));
}

// ── EntityType ───────────────────────────────────────────────────

#[test]
fn entity_type_names_roundtrip() {
    for ty in [EntityType::Object, EntityType::User, EntityType::Group, EntityType::Site] {
        assert_eq!(ty.as_str().parse::<EntityType>().unwrap(), ty);
    }
}

#[test]
fn entity_type_rejects_unknown() {
    let err = "widget".parse::<EntityType>().unwrap_err();
    assert!(err.to_string().contains("widget"));
}
