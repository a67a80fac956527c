//! Cached, pinned references to managed types
//!
//! A `TypeHandle` resolves a type by name once, pins it with a global
//! reference and joins the bridge's `HandleRegistry`. Dropping the handle, or
//! calling `cleanup`, releases the reference and leaves the registry; a bulk
//! sweep of the registry does the same for every live handle at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use hostbridge_sdk::{BridgeError, BridgeResult, HostRef, HostRuntime};

use crate::error::take_pending;
use crate::registry::HandleRegistry;

/// Unique identifier for a type handle
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

impl HandleId {
    /// Generate a new unique HandleId
    pub fn new() -> Self {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between a handle and the registry's back-reference to it.
pub(crate) struct HandleState {
    id: HandleId,
    runtime: Arc<dyn HostRuntime>,
    /// Raw bits of the pinned type reference; 0 once released
    class: AtomicU64,
    name: Mutex<Option<String>>,
}

impl HandleState {
    pub(crate) fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn name(&self) -> Option<String> {
        self.name.lock().clone()
    }

    /// Drop the pinned reference and the name. Only the first call releases.
    pub(crate) fn release(&self) -> bool {
        let raw = self.class.swap(0, Ordering::AcqRel);
        let name = self.name.lock().take();
        if raw == 0 {
            return false;
        }
        self.runtime.delete_global_ref(HostRef::from_raw(raw));
        tracing::trace!(name = name.as_deref().unwrap_or(""), "released type handle");
        true
    }
}

/// A resolved, pinned reference to one managed type.
///
/// Resolution failure does not raise: the handle is simply not valid and is
/// never registered. Check [`TypeHandle::is_valid`] or use
/// [`TypeHandle::class`] before relying on it.
pub struct TypeHandle {
    state: Arc<HandleState>,
    registry: Arc<HandleRegistry>,
    requested: String,
}

impl TypeHandle {
    /// Resolve `name`, pin it and register the handle in `registry`.
    pub fn resolve(
        runtime: Arc<dyn HostRuntime>,
        registry: &Arc<HandleRegistry>,
        name: impl Into<String>,
    ) -> Self {
        let requested = name.into();

        let local = runtime.find_class(&requested);
        let pinned = if local.is_null() {
            if let Some(error) = take_pending(runtime.as_ref()) {
                tracing::warn!(name = %requested, %error, "type failed to resolve");
            } else {
                tracing::warn!(name = %requested, "type failed to resolve");
            }
            HostRef::NULL
        } else {
            let pinned = runtime.new_global_ref(local);
            runtime.delete_local_ref(local);
            pinned
        };

        let state = Arc::new(HandleState {
            id: HandleId::new(),
            runtime,
            class: AtomicU64::new(pinned.to_raw()),
            name: Mutex::new((!pinned.is_null()).then(|| requested.clone())),
        });
        let handle = Self {
            state,
            registry: registry.clone(),
            requested,
        };

        if handle.is_valid() {
            registry.add(&handle);
        }
        handle
    }

    /// Unique id of this handle
    pub fn id(&self) -> HandleId {
        self.state.id
    }

    /// Does the handle hold a live type reference?
    pub fn is_valid(&self) -> bool {
        self.state.class.load(Ordering::Acquire) != 0
    }

    /// The pinned type reference
    pub fn class(&self) -> BridgeResult<HostRef> {
        self.raw_class()
            .ok_or_else(|| BridgeError::Unresolved(self.requested.clone()))
    }

    /// The pinned type reference, `None` if unresolved or cleaned up
    pub fn raw_class(&self) -> Option<HostRef> {
        HostRef::from_raw(self.state.class.load(Ordering::Acquire)).non_null()
    }

    /// Registered name; `None` once the handle is unusable
    pub fn name(&self) -> Option<String> {
        self.state.name()
    }

    /// Name this handle was asked to resolve (kept for diagnostics)
    pub fn requested_name(&self) -> &str {
        &self.requested
    }

    /// Release the type reference and leave the registry. Idempotent.
    pub fn cleanup(&self) {
        self.state.release();
        self.registry.remove(self);
    }

    pub(crate) fn state(&self) -> &Arc<HandleState> {
        &self.state
    }
}

impl Drop for TypeHandle {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHandle")
            .field("id", &self.state.id)
            .field("name", &self.requested)
            .field("class", &self.raw_class())
            .finish()
    }
}
