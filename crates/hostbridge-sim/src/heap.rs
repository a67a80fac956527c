//! Object heap for the simulated runtime
//!
//! There is no collector; a `HostRef` is simply the object's slot id. Objects
//! stay allocated until explicitly freed, which the runtime does only for the
//! per-call temporaries it creates itself. Global and local references are
//! tracked as counts so tests can check that every reference the bridge takes
//! is eventually released.

use crate::classes::ClassId;
use dashmap::DashMap;
use hostbridge_sdk::{HostRef, MethodId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Managed-side state of a proxy instance
#[derive(Debug, Clone)]
pub struct ProxyState {
    /// Bridge type whose factory created the proxy
    pub bridge: ClassId,
    /// Native pointer passed to the factory
    pub native_ptr: i64,
    /// Interfaces the proxy implements
    pub interfaces: Vec<ClassId>,
    /// Set by `disableInterfaceProxy`
    pub disabled: bool,
}

/// Heap object
#[derive(Debug, Clone)]
pub enum SimObject {
    /// Type object
    Class(ClassId),
    /// Boxed integer
    Int(i32),
    /// Boxed boolean
    Bool(bool),
    /// String
    Str(String),
    /// Object array
    Array {
        /// Element type object
        element_class: HostRef,
        /// Elements
        items: Vec<HostRef>,
    },
    /// Reflected method
    Method(MethodId),
    /// Proxy instance
    Proxy(ProxyState),
    /// Error instance
    Throwable {
        /// Error type
        class: ClassId,
        /// Detail message
        message: String,
    },
}

/// Per-object reference counts
#[derive(Default)]
struct RefCounts(DashMap<u64, usize>);

impl RefCounts {
    fn acquire(&self, obj: HostRef) {
        *self.0.entry(obj.to_raw()).or_insert(0) += 1;
    }

    fn release(&self, obj: HostRef) -> bool {
        let raw = obj.to_raw();
        let mut released = false;
        let mut now_zero = false;
        if let Some(mut count) = self.0.get_mut(&raw) {
            if *count > 0 {
                *count -= 1;
                released = true;
            }
            now_zero = *count == 0;
        }
        if now_zero {
            self.0.remove_if(&raw, |_, count| *count == 0);
        }
        released
    }

    fn count(&self, obj: HostRef) -> usize {
        self.0.get(&obj.to_raw()).map(|c| *c).unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.0.iter().map(|entry| *entry.value()).sum()
    }
}

/// Object heap
pub struct Heap {
    next_id: AtomicU64,
    objects: DashMap<u64, SimObject>,
    pins: RefCounts,
    locals: RefCounts,
}

impl Heap {
    /// Create a new empty heap
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            objects: DashMap::new(),
            pins: RefCounts::default(),
            locals: RefCounts::default(),
        }
    }

    /// Allocate an object
    pub fn alloc(&self, object: SimObject) -> HostRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.objects.insert(id, object);
        HostRef::from_raw(id)
    }

    /// Snapshot of an object (None for null or dangling refs)
    pub fn get(&self, obj: HostRef) -> Option<SimObject> {
        if obj.is_null() {
            return None;
        }
        self.objects.get(&obj.to_raw()).map(|entry| entry.clone())
    }

    /// Mutate an object in place. Returns false if it does not exist.
    pub fn update(&self, obj: HostRef, f: impl FnOnce(&mut SimObject)) -> bool {
        match self.objects.get_mut(&obj.to_raw()) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// Free an object. Returns false if it did not exist.
    pub fn free(&self, obj: HostRef) -> bool {
        self.objects.remove(&obj.to_raw()).is_some()
    }

    /// Increment the pin count of an object
    pub fn pin(&self, obj: HostRef) {
        self.pins.acquire(obj);
    }

    /// Decrement the pin count of an object. Returns false if it was not pinned.
    pub fn unpin(&self, obj: HostRef) -> bool {
        self.pins.release(obj)
    }

    /// Current pin count of an object
    pub fn pin_count(&self, obj: HostRef) -> usize {
        self.pins.count(obj)
    }

    /// Total outstanding pins across all objects
    pub fn total_pins(&self) -> usize {
        self.pins.total()
    }

    /// Record a local reference handed to the caller
    pub fn hand_out(&self, obj: HostRef) -> HostRef {
        if !obj.is_null() {
            self.locals.acquire(obj);
        }
        obj
    }

    /// Drop a local reference. Returns false if none was outstanding.
    pub fn drop_local(&self, obj: HostRef) -> bool {
        self.locals.release(obj)
    }

    /// Total outstanding local references across all objects
    pub fn total_locals(&self) -> usize {
        self.locals.total()
    }

    /// Number of allocated objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the heap is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
