//! In-memory reference implementation of [`EntityBackend`].
//!
//! Holds everything in one `RwLock`-guarded state value. Used by the test
//! suites of every crate and by embedders that want a throwaway store.
//! Faults can be injected per operation to exercise failure branches.

use crate::backend::EntityBackend;
use crate::error::{StorageError, StorageResult};
use crate::records::{
    columns, Annotation, AnnotationAggregate, AnnotationQuery, EntityRow, EntityUpdate,
    MetadataRow, NewAnnotation, NewEntityRow, NewMetadata, RelationshipQuery, SortOrder,
};
use canopy_types::{EntityType, ExternalId, Guid, Scalar, Timestamp};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    CreateEntity,
    UpdateEntity,
    FetchEntity,
    UpsertFragment,
    DeleteEntity,
    DisableEntity,
    EnableEntity,
    GetMetadata,
    CreateMetadata,
    RemoveMetadata,
    CreateAnnotation,
    AddRelationship,
    SetPrivateSetting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    subject: Guid,
    relationship: String,
    object: Guid,
}

#[derive(Debug, Default)]
struct State {
    next_guid: u64,
    next_row_id: u64,
    entities: BTreeMap<Guid, EntityRow>,
    fragments: HashMap<(Guid, String), BTreeMap<String, Scalar>>,
    subtypes: Vec<(EntityType, String)>,
    metadata: Vec<MetadataRow>,
    annotations: Vec<Annotation>,
    relationships: Vec<Edge>,
    private_settings: BTreeMap<(Guid, String), String>,
}

impl State {
    fn next_row_id(&mut self) -> u64 {
        self.next_row_id += 1;
        self.next_row_id
    }

    fn subtype_id(&mut self, entity_type: EntityType, subtype: &str) -> i64 {
        if subtype.is_empty() {
            return 0;
        }
        let pos = match self
            .subtypes
            .iter()
            .position(|(t, s)| *t == entity_type && s == subtype)
        {
            Some(pos) => pos,
            None => {
                self.subtypes.push((entity_type, subtype.to_string()));
                self.subtypes.len() - 1
            }
        };
        i64::try_from(pos + 1).unwrap_or(i64::MAX)
    }

    fn subtype_name(&self, id: i64) -> Option<String> {
        if id == 0 {
            return Some(String::new());
        }
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.subtypes.get(index).map(|(_, s)| s.clone())
    }

    /// Guids directly owned or contained by `guid`.
    fn children_of(&self, guid: Guid) -> Vec<Guid> {
        self.entities
            .values()
            .filter(|row| row.guid != guid)
            .filter(|row| row.owner_guid() == Some(guid) || row.container_guid() == Some(guid))
            .map(|row| row.guid)
            .collect()
    }

    fn matches(&self, row: &EntityRow, query: &RelationshipQuery) -> bool {
        if !query.include_hidden && !row.is_enabled() {
            return false;
        }
        if let Some(ty) = query.entity_type {
            if row.entity_type() != Some(ty) {
                return false;
            }
        }
        if let Some(subtype) = &query.subtype {
            let id = row.get(columns::SUBTYPE).and_then(Scalar::as_int).unwrap_or(0);
            if self.subtype_name(id).as_deref() != Some(subtype.as_str()) {
                return false;
            }
        }
        true
    }

    fn related(&self, query: &RelationshipQuery) -> Vec<EntityRow> {
        self.relationships
            .iter()
            .filter(|e| e.relationship == query.relationship)
            .filter_map(|e| match query.inverse {
                false if e.subject == query.guid => Some(e.object),
                true if e.object == query.guid => Some(e.subject),
                _ => None,
            })
            .filter_map(|guid| self.entities.get(&guid))
            .filter(|row| self.matches(row, query))
            .cloned()
            .collect()
    }
}

/// An in-memory [`EntityBackend`].
#[derive(Debug)]
pub struct MemoryBackend {
    state: RwLock<State>,
    faults: Mutex<HashMap<BackendOp, usize>>,
    namespace: Uuid,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty store exporting under the URL namespace.
    pub fn new() -> Self {
        Self::with_namespace(Uuid::NAMESPACE_URL)
    }

    /// Creates an empty store exporting under `namespace`.
    pub fn with_namespace(namespace: Uuid) -> Self {
        Self {
            state: RwLock::new(State::default()),
            faults: Mutex::new(HashMap::new()),
            namespace,
        }
    }

    /// Makes the next call of `op` fail.
    pub fn fail_next(&self, op: BackendOp) {
        self.fail_after(op, 0);
    }

    /// Lets `successes` calls of `op` through, then fails the one after.
    pub fn fail_after(&self, op: BackendOp, successes: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(op, successes);
        }
    }

    /// Number of live entity rows, disabled ones included.
    pub fn entity_count(&self) -> usize {
        self.read().map(|s| s.entities.len()).unwrap_or_default()
    }

    /// Number of metadata rows across all entities.
    pub fn metadata_count(&self) -> usize {
        self.read().map(|s| s.metadata.len()).unwrap_or_default()
    }

    fn check(&self, op: BackendOp) -> StorageResult<()> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StorageError::Backend("fault table poisoned".into()))?;
        let Some(remaining) = faults.get_mut(&op) else {
            return Ok(());
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(());
        }
        faults.remove(&op);
        debug!("injected fault for {:?}", op);
        Err(StorageError::Backend(format!("injected fault: {op:?}")))
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StorageError::Backend("state lock poisoned".into()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StorageError::Backend("state lock poisoned".into()))
    }

    fn set_enabled(row: &mut EntityRow, enabled: bool) {
        row.columns
            .insert(columns::ENABLED.to_string(), Scalar::Bool(enabled));
    }
}

fn column_guid(guid: Option<Guid>) -> Scalar {
    Scalar::Int(guid.map(|g| g.as_column()).unwrap_or(0))
}

fn numeric(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Int(i) => Some(*i as f64),
        Scalar::Text(s) => s.trim().parse().ok(),
        Scalar::Bool(_) => None,
    }
}

impl EntityBackend for MemoryBackend {
    fn create_entity_row(&self, row: &NewEntityRow) -> StorageResult<Guid> {
        self.check(BackendOp::CreateEntity)?;
        let mut state = self.write()?;
        state.next_guid += 1;
        let guid = Guid::new(state.next_guid)
            .ok_or_else(|| StorageError::Backend("guid space exhausted".into()))?;
        let subtype = state.subtype_id(row.entity_type, &row.subtype);
        let now = Timestamp::now().secs();

        let stored = EntityRow::new(guid)
            .with(columns::GUID, guid.as_column())
            .with(columns::TYPE, row.entity_type.as_str())
            .with(columns::SUBTYPE, subtype)
            .with(columns::OWNER_GUID, column_guid(row.owner_guid))
            .with(columns::CONTAINER_GUID, column_guid(row.container_guid))
            .with(columns::SITE_GUID, column_guid(row.site_guid))
            .with(columns::ACCESS_ID, row.access_id)
            .with(columns::TIME_CREATED, now)
            .with(columns::TIME_UPDATED, now)
            .with(columns::LAST_ACTION, now)
            .with(columns::ENABLED, true);
        state.entities.insert(guid, stored);
        debug!("inserted {} row {}", row.entity_type, guid);
        Ok(guid)
    }

    fn update_entity_row(&self, update: &EntityUpdate) -> StorageResult<bool> {
        self.check(BackendOp::UpdateEntity)?;
        let mut state = self.write()?;
        let Some(row) = state.entities.get_mut(&update.guid) else {
            return Ok(false);
        };
        row.columns.insert(
            columns::OWNER_GUID.to_string(),
            column_guid(update.owner_guid),
        );
        row.columns.insert(
            columns::CONTAINER_GUID.to_string(),
            column_guid(update.container_guid),
        );
        row.columns
            .insert(columns::ACCESS_ID.to_string(), Scalar::Int(update.access_id));
        row.columns.insert(
            columns::TIME_UPDATED.to_string(),
            Scalar::Int(Timestamp::now().secs()),
        );
        Ok(true)
    }

    fn fetch_entity_row(
        &self,
        guid: Guid,
        include_hidden: bool,
    ) -> StorageResult<Option<EntityRow>> {
        self.check(BackendOp::FetchEntity)?;
        let state = self.read()?;
        Ok(state
            .entities
            .get(&guid)
            .filter(|row| include_hidden || row.is_enabled())
            .cloned())
    }

    fn fetch_fragment_row(&self, guid: Guid, table: &str) -> StorageResult<Option<EntityRow>> {
        let state = self.read()?;
        Ok(state
            .fragments
            .get(&(guid, table.to_string()))
            .map(|cols| EntityRow {
                guid,
                columns: cols.clone(),
            }))
    }

    fn upsert_fragment_row(
        &self,
        guid: Guid,
        table: &str,
        values: &BTreeMap<String, Scalar>,
    ) -> StorageResult<bool> {
        self.check(BackendOp::UpsertFragment)?;
        let mut state = self.write()?;
        if !state.entities.contains_key(&guid) {
            return Ok(false);
        }
        state
            .fragments
            .insert((guid, table.to_string()), values.clone());
        Ok(true)
    }

    fn delete_entity_row(&self, guid: Guid) -> StorageResult<bool> {
        self.check(BackendOp::DeleteEntity)?;
        let mut state = self.write()?;
        if state.entities.remove(&guid).is_none() {
            return Ok(false);
        }
        state.fragments.retain(|(g, _), _| *g != guid);
        state.metadata.retain(|m| m.entity_guid != guid);
        state.annotations.retain(|a| a.entity_guid != guid);
        state
            .relationships
            .retain(|e| e.subject != guid && e.object != guid);
        state.private_settings.retain(|(g, _), _| *g != guid);
        debug!("deleted entity {}", guid);
        Ok(true)
    }

    fn disable_entity(&self, guid: Guid, reason: &str, recursive: bool) -> StorageResult<bool> {
        self.check(BackendOp::DisableEntity)?;
        let mut state = self.write()?;
        if !state.entities.contains_key(&guid) {
            return Ok(false);
        }

        // Containment may be cyclic; the visited set bounds the walk.
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([guid]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if recursive {
                queue.extend(state.children_of(current));
            }
        }

        for target in &visited {
            if let Some(row) = state.entities.get_mut(target) {
                Self::set_enabled(row, false);
            }
            if !reason.is_empty() {
                state
                    .private_settings
                    .insert((*target, "disable_reason".into()), reason.to_string());
            }
        }
        debug!("disabled {} entities starting at {}", visited.len(), guid);
        Ok(true)
    }

    fn enable_entity(&self, guid: Guid) -> StorageResult<bool> {
        self.check(BackendOp::EnableEntity)?;
        let mut state = self.write()?;
        let Some(row) = state.entities.get_mut(&guid) else {
            return Ok(false);
        };
        Self::set_enabled(row, true);
        state
            .private_settings
            .remove(&(guid, "disable_reason".to_string()));
        Ok(true)
    }

    fn get_metadata(&self, guid: Guid, name: &str) -> StorageResult<Vec<MetadataRow>> {
        self.check(BackendOp::GetMetadata)?;
        let state = self.read()?;
        Ok(state
            .metadata
            .iter()
            .filter(|m| m.entity_guid == guid && m.name == name)
            .cloned()
            .collect())
    }

    fn all_metadata(&self, guid: Guid) -> StorageResult<Vec<MetadataRow>> {
        let state = self.read()?;
        Ok(state
            .metadata
            .iter()
            .filter(|m| m.entity_guid == guid)
            .cloned()
            .collect())
    }

    fn create_metadata(&self, metadata: &NewMetadata) -> StorageResult<bool> {
        self.check(BackendOp::CreateMetadata)?;
        let mut state = self.write()?;
        if !state.entities.contains_key(&metadata.entity_guid) {
            return Err(StorageError::NotFound(metadata.entity_guid.to_string()));
        }
        if !metadata.allow_multiple {
            state
                .metadata
                .retain(|m| !(m.entity_guid == metadata.entity_guid && m.name == metadata.name));
        }
        let id = state.next_row_id();
        state.metadata.push(MetadataRow {
            id,
            entity_guid: metadata.entity_guid,
            name: metadata.name.clone(),
            value: metadata.value.clone(),
            value_type: metadata.value_type.resolve(&metadata.value),
            owner_guid: metadata.owner_guid,
            access_id: metadata.access_id,
            time_created: Timestamp::now(),
        });
        Ok(true)
    }

    fn remove_metadata(&self, guid: Guid, name: Option<&str>) -> StorageResult<bool> {
        self.check(BackendOp::RemoveMetadata)?;
        let mut state = self.write()?;
        let before = state.metadata.len();
        state
            .metadata
            .retain(|m| !(m.entity_guid == guid && name.is_none_or(|n| m.name == n)));
        Ok(state.metadata.len() < before)
    }

    fn create_annotation(&self, annotation: &NewAnnotation) -> StorageResult<u64> {
        self.check(BackendOp::CreateAnnotation)?;
        let mut state = self.write()?;
        if !state.entities.contains_key(&annotation.entity_guid) {
            return Err(StorageError::NotFound(annotation.entity_guid.to_string()));
        }
        let id = state.next_row_id();
        state.annotations.push(Annotation {
            id,
            entity_guid: annotation.entity_guid,
            name: annotation.name.clone(),
            value: annotation.value.clone(),
            value_type: annotation.value_type.resolve(&annotation.value),
            owner_guid: annotation.owner_guid,
            access_id: annotation.access_id,
            time_created: Timestamp::now(),
        });
        Ok(id)
    }

    fn get_annotations(&self, query: &AnnotationQuery) -> StorageResult<Vec<Annotation>> {
        let state = self.read()?;
        let mut found: Vec<Annotation> = state
            .annotations
            .iter()
            .filter(|a| a.entity_guid == query.entity_guid)
            .filter(|a| query.name.as_deref().is_none_or(|n| a.name == n))
            .cloned()
            .collect();
        // Row ids are monotonic, so they order ties within one second.
        found.sort_by_key(|a| (a.time_created, a.id));
        if query.order == SortOrder::Descending {
            found.reverse();
        }
        Ok(found
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn clear_annotations(&self, guid: Guid, name: Option<&str>) -> StorageResult<bool> {
        let mut state = self.write()?;
        let before = state.annotations.len();
        state
            .annotations
            .retain(|a| !(a.entity_guid == guid && name.is_none_or(|n| a.name == n)));
        Ok(state.annotations.len() < before)
    }

    fn count_annotations(&self, guid: Guid, name: Option<&str>) -> StorageResult<usize> {
        let state = self.read()?;
        Ok(state
            .annotations
            .iter()
            .filter(|a| a.entity_guid == guid && name.is_none_or(|n| a.name == n))
            .count())
    }

    fn aggregate_annotations(
        &self,
        guid: Guid,
        name: &str,
        aggregate: AnnotationAggregate,
    ) -> StorageResult<Option<f64>> {
        let state = self.read()?;
        let values: Vec<f64> = state
            .annotations
            .iter()
            .filter(|a| a.entity_guid == guid && a.name == name)
            .filter_map(|a| numeric(&a.value))
            .collect();
        if values.is_empty() {
            return Ok(match aggregate {
                AnnotationAggregate::Sum => Some(0.0),
                _ => None,
            });
        }
        let sum: f64 = values.iter().sum();
        Ok(Some(match aggregate {
            AnnotationAggregate::Sum => sum,
            AnnotationAggregate::Average => sum / values.len() as f64,
            AnnotationAggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AnnotationAggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }))
    }

    fn add_relationship(
        &self,
        guid: Guid,
        relationship: &str,
        other: Guid,
    ) -> StorageResult<bool> {
        self.check(BackendOp::AddRelationship)?;
        let mut state = self.write()?;
        let edge = Edge {
            subject: guid,
            relationship: relationship.to_string(),
            object: other,
        };
        if state.relationships.contains(&edge) {
            return Ok(false);
        }
        state.relationships.push(edge);
        Ok(true)
    }

    fn remove_relationship(
        &self,
        guid: Guid,
        relationship: &str,
        other: Guid,
    ) -> StorageResult<bool> {
        let mut state = self.write()?;
        let before = state.relationships.len();
        state.relationships.retain(|e| {
            !(e.subject == guid && e.relationship == relationship && e.object == other)
        });
        Ok(state.relationships.len() < before)
    }

    fn remove_all_relationships(
        &self,
        guid: Guid,
        relationship: Option<&str>,
        inverse: bool,
    ) -> StorageResult<bool> {
        let mut state = self.write()?;
        state.relationships.retain(|e| {
            let endpoint = if inverse { e.object } else { e.subject };
            !(endpoint == guid && relationship.is_none_or(|r| e.relationship == r))
        });
        Ok(true)
    }

    fn get_related_entities(&self, query: &RelationshipQuery) -> StorageResult<Vec<EntityRow>> {
        let state = self.read()?;
        Ok(state
            .related(query)
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn count_related_entities(&self, query: &RelationshipQuery) -> StorageResult<usize> {
        let state = self.read()?;
        Ok(state.related(query).len())
    }

    fn set_private_setting(&self, guid: Guid, name: &str, value: &str) -> StorageResult<bool> {
        self.check(BackendOp::SetPrivateSetting)?;
        let mut state = self.write()?;
        if !state.entities.contains_key(&guid) {
            return Ok(false);
        }
        state
            .private_settings
            .insert((guid, name.to_string()), value.to_string());
        Ok(true)
    }

    fn get_private_setting(&self, guid: Guid, name: &str) -> StorageResult<Option<String>> {
        let state = self.read()?;
        Ok(state.private_settings.get(&(guid, name.to_string())).cloned())
    }

    fn remove_private_setting(&self, guid: Guid, name: &str) -> StorageResult<bool> {
        let mut state = self.write()?;
        Ok(state
            .private_settings
            .remove(&(guid, name.to_string()))
            .is_some())
    }

    fn resolve_subtype_id(&self, entity_type: EntityType, subtype: &str) -> StorageResult<i64> {
        let mut state = self.write()?;
        Ok(state.subtype_id(entity_type, subtype))
    }

    fn resolve_subtype_name(&self, id: i64) -> StorageResult<Option<String>> {
        let state = self.read()?;
        Ok(state.subtype_name(id))
    }

    fn external_id(&self, guid: Guid) -> ExternalId {
        ExternalId::derive(&self.namespace, guid)
    }
}
