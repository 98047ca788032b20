//! Local mirror cache
//!
//! The last known server state for one entity type, newest first. Every
//! edit swaps in a fresh `Arc<Vec<E>>`, so readers holding an older
//! snapshot are unaffected and `Arc::ptr_eq` tells them something changed.

use std::sync::Arc;

use crate::models::Entity;

/// Ordered, immutable-snapshot collection of entities
#[derive(Debug, Clone)]
pub struct Mirror<E> {
    items: Arc<Vec<E>>,
}

impl<E> Default for Mirror<E> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<E: Entity> Mirror<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Vec<E>> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find an entity by id
    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace everything with a freshly listed sequence
    pub fn replace_all(&mut self, items: Vec<E>) {
        self.items = Arc::new(items);
    }

    /// Put a newly inserted entity at the front
    ///
    /// A stale copy with the same id is dropped so ids stay unique.
    pub fn prepend(&mut self, entity: E) {
        let mut next = Vec::with_capacity(self.items.len() + 1);
        let id = entity.id().to_string();
        next.push(entity);
        next.extend(self.items.iter().filter(|e| e.id() != id).cloned());
        self.items = Arc::new(next);
    }

    /// Swap in the server's copy of an entity
    ///
    /// Returns false, leaving the mirror untouched, when the id is unknown.
    pub fn replace(&mut self, entity: E) -> bool {
        let Some(pos) = self.items.iter().position(|e| e.id() == entity.id()) else {
            return false;
        };
        let mut next: Vec<E> = self.items.as_ref().clone();
        next[pos] = entity;
        self.items = Arc::new(next);
        true
    }

    /// Drop the entity with the given id
    ///
    /// Returns false, leaving the mirror untouched, when the id is unknown.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        let next: Vec<E> = self.items.iter().filter(|e| e.id() != id).cloned().collect();
        self.items = Arc::new(next);
        true
    }
}
