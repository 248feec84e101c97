//! Normalized in-memory entity store.
//!
//! A [`Collection`] is an id-keyed map plus an explicit id ordering, giving
//! O(1) lookup and a stable iteration order independent of map insertion
//! order. Every operation is pure: it takes the current collection by
//! reference and returns a new one, so callers holding the previous value
//! always observe a complete, self-consistent snapshot.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{AdoptionRequest, Listing};

/// An entity that can live in a normalized [`Collection`].
pub trait StoreEntity: Clone {
    /// Unique identifier within the collection.
    fn id(&self) -> &str;

    /// The collection's sort comparer, used to derive id ordering.
    fn order(a: &Self, b: &Self) -> Ordering;
}

impl StoreEntity for Listing {
    fn id(&self) -> &str {
        &self.id
    }

    // Newest first; id tiebreak keeps the ordering total.
    fn order(a: &Self, b: &Self) -> Ordering {
        b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
    }
}

impl StoreEntity for AdoptionRequest {
    fn id(&self) -> &str {
        &self.id
    }

    fn order(a: &Self, b: &Self) -> Ordering {
        b.submitted_at.cmp(&a.submitted_at).then_with(|| a.id.cmp(&b.id))
    }
}

/// Id-keyed entity map plus explicit id ordering.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    entities: HashMap<String, T>,
    ids: Vec<String>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            entities: HashMap::new(),
            ids: Vec::new(),
        }
    }
}

impl<T: StoreEntity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from entities, ordering derived from the comparer.
    pub fn from_entities(entities: impl IntoIterator<Item = T>) -> Self {
        Self::new().set_all(entities)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entities.get(id)
    }

    /// Ids in collection order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Entities in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }

    /// Clone out all entities in collection order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Replace the entire collection. Duplicate ids collapse to the
    /// last-provided entity; ordering is re-derived from the comparer.
    pub fn set_all(&self, entities: impl IntoIterator<Item = T>) -> Self {
        let mut next = Self::default();
        for entity in entities {
            let id = entity.id().to_string();
            if next.entities.insert(id.clone(), entity).is_none() {
                next.ids.push(id);
            }
        }
        next.resort();
        debug!(count = next.len(), "collection replaced");
        next
    }

    /// Insert if absent; a no-op when the id already exists (callers must use
    /// [`Collection::update_one`] for existing ids).
    pub fn add_one(&self, entity: T) -> Self {
        if self.contains(entity.id()) {
            return self.clone();
        }
        let mut next = self.clone();
        let id = entity.id().to_string();
        next.entities.insert(id.clone(), entity);
        next.ids.push(id);
        next.resort();
        next
    }

    /// Merge changes into the existing entity via `apply`; a no-op when the
    /// id is absent. Ordering is re-derived only when the sort key changed.
    pub fn update_one(&self, id: &str, apply: impl FnOnce(&mut T)) -> Self {
        let Some(current) = self.entities.get(id) else {
            return self.clone();
        };
        let mut updated = current.clone();
        apply(&mut updated);
        let key_changed = T::order(current, &updated) != Ordering::Equal;
        let mut next = self.clone();
        next.entities.insert(id.to_string(), updated);
        if key_changed {
            next.resort();
        }
        next
    }

    /// Delete one entity and its id from the ordering; a no-op when absent.
    pub fn remove_one(&self, id: &str) -> Self {
        if !self.contains(id) {
            return self.clone();
        }
        let mut next = self.clone();
        next.entities.remove(id);
        next.ids.retain(|existing| existing != id);
        next
    }

    /// Delete every entity.
    pub fn remove_all(&self) -> Self {
        Self::default()
    }

    /// Per-entity add-or-update, for merging a partial query result into an
    /// already-loaded collection without discarding out-of-scope entities.
    pub fn upsert_many(&self, entities: impl IntoIterator<Item = T>) -> Self {
        let mut next = self.clone();
        let mut touched = 0usize;
        for entity in entities {
            let id = entity.id().to_string();
            if next.entities.insert(id.clone(), entity).is_none() {
                next.ids.push(id);
            }
            touched += 1;
        }
        next.resort();
        debug!(touched, count = next.len(), "collection upserted");
        next
    }

    fn resort(&mut self) {
        let entities = &self.entities;
        self.ids.sort_by(|a, b| match (entities.get(a), entities.get(b)) {
            (Some(ea), Some(eb)) => T::order(ea, eb),
            _ => Ordering::Equal,
        });
    }
}

/// Aggregate counters maintained in O(1) alongside lifecycle transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCounters {
    pub total_requests: u64,
    pub pending_requests: u64,
    pub approved_requests: u64,
    pub rejected_requests: u64,
    pub cancelled_requests: u64,
    pub completed_adoptions: u64,
}

/// The single source of truth the reducers fold over. Never mutated in
/// place: each transition produces a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub listings: Collection<Listing>,
    pub requests: Collection<AdoptionRequest>,
    pub stats: StatsCounters,
}
