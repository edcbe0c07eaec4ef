//! Bounded memo of persisted entities, keyed by guid.

use crate::entity::Entity;
use canopy_types::Guid;
use std::collections::{HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<Guid, Entity>,
    order: VecDeque<Guid>,
}

/// Entity cache owned by a [`Session`](crate::Session).
///
/// Holds copies, so callers never observe each other's unsaved edits. Once
/// full, the oldest inserted entry is evicted first.
#[derive(Debug)]
pub struct EntityCache {
    capacity: usize,
    slots: RwLock<Slots>,
}

impl EntityCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: RwLock::new(Slots::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A copy of the cached entity for `guid`.
    pub fn get(&self, guid: Guid) -> Option<Entity> {
        self.read()?.entries.get(&guid).cloned()
    }

    /// Stores a copy of `entity`. Unsaved entities are ignored.
    pub fn insert(&self, entity: &Entity) {
        if self.capacity == 0 {
            return;
        }
        let Some(guid) = entity.guid() else {
            return;
        };
        let Some(mut slots) = self.write() else {
            return;
        };
        if slots.entries.insert(guid, entity.clone()).is_none() {
            slots.order.push_back(guid);
        }
        while slots.entries.len() > self.capacity {
            let Some(oldest) = slots.order.pop_front() else {
                break;
            };
            slots.entries.remove(&oldest);
            debug!("evicted {} from entity cache", oldest);
        }
    }

    /// Drops the entry for `guid`, if any.
    pub fn invalidate(&self, guid: Guid) {
        if let Some(mut slots) = self.write() {
            if slots.entries.remove(&guid).is_some() {
                slots.order.retain(|g| *g != guid);
            }
        }
    }

    pub fn clear(&self) {
        if let Some(mut slots) = self.write() {
            slots.entries.clear();
            slots.order.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|s| s.entries.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Option<RwLockReadGuard<'_, Slots>> {
        match self.slots.read() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("entity cache lock poisoned");
                None
            }
        }
    }

    fn write(&self) -> Option<RwLockWriteGuard<'_, Slots>> {
        match self.slots.write() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("entity cache lock poisoned");
                None
            }
        }
    }
}
