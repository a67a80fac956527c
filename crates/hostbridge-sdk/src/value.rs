//! Opaque handles into the host runtime
//!
//! `HostRef` and `MethodId` are plain integers chosen by the host. The bridge
//! never looks inside them: it hands them back to the host and compares them.

use std::num::NonZeroU64;

/// Reference to a managed object (instance, type, array, reflected method...).
///
/// The all-zero value is the null reference, mirroring how hosts represent a
/// missing object at the native boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct HostRef(u64);

impl HostRef {
    /// The null reference
    pub const NULL: HostRef = HostRef(0);

    /// Create from raw host bits
    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get raw host bits
    #[inline(always)]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Check if this is the null reference
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `None` for the null reference, `Some(self)` otherwise
    #[inline]
    pub fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl Default for HostRef {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Debug for HostRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "HostRef::Null")
        } else {
            write!(f, "HostRef({:#x})", self.0)
        }
    }
}

/// Resolved method handle.
///
/// Hosts hand out one canonical id per method of a declaring type, so two
/// ids are the same method exactly when they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MethodId(NonZeroU64);

impl MethodId {
    /// Wrap a raw host method id. Zero is never a valid id.
    #[inline]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Get the raw host id
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

/// Argument passed to a host static method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArg {
    /// 64-bit integer (`J`), used to carry native pointers
    Long(i64),
    /// Object reference (`L...;` or array)
    Object(HostRef),
}
