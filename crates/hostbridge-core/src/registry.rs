//! Registry of live type handles

use dashmap::DashMap;
use std::sync::Weak;

use crate::handle::{HandleId, HandleState, TypeHandle};

/// Tracks every resolved, not-yet-cleaned `TypeHandle` of a bridge.
///
/// Entries are weak back-references: the registry never keeps a handle
/// alive, it only lets [`HandleRegistry::cleanup_all`] reach handles that are
/// still owned elsewhere.
pub struct HandleRegistry {
    /// Map of handle ID to handle state
    handles: DashMap<HandleId, Weak<HandleState>>,
}

impl HandleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
        }
    }

    /// Add a handle
    pub fn add(&self, handle: &TypeHandle) {
        self.handles
            .insert(handle.id(), std::sync::Arc::downgrade(handle.state()));
    }

    /// Remove a handle (no-op if absent)
    pub fn remove(&self, handle: &TypeHandle) {
        self.handles.remove(&handle.id());
    }

    /// Is the handle registered?
    pub fn contains(&self, handle: &TypeHandle) -> bool {
        self.handles.contains_key(&handle.id())
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Names of the registered handles, in no particular order
    pub fn names(&self) -> Vec<String> {
        self.handles
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .filter_map(|state| state.name())
            .collect()
    }

    /// Release every registered handle and empty the registry.
    ///
    /// Must run from a single teardown point, not concurrently with handle
    /// resolution. Safe to call repeatedly.
    pub fn cleanup_all(&self) -> usize {
        let ids: Vec<HandleId> = self.handles.iter().map(|entry| *entry.key()).collect();

        let mut released = 0;
        for id in ids {
            let Some((_, weak)) = self.handles.remove(&id) else {
                continue;
            };
            if let Some(state) = weak.upgrade() {
                debug_assert_eq!(state.id(), id);
                if state.release() {
                    released += 1;
                }
            }
        }

        tracing::debug!(released, "cleaned up type handles");
        released
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
