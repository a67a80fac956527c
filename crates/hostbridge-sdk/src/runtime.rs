//! HostRuntime trait - abstract managed-runtime operations
//!
//! Defines the interface a managed host runtime implements. The bridge core
//! programs against this trait only; it never depends on a concrete binding.
//!
//! # Pending errors
//!
//! Like most managed runtimes seen from native code, failures are reported by
//! leaving an error *pending* on the calling thread rather than by returning
//! a `Result`. Callers inspect it with [`HostRuntime::exception_check`] and
//! discard it with [`HostRuntime::exception_clear`]. Pending state is per
//! calling thread.

use crate::value::{HostArg, HostRef, MethodId};

/// Native invocation callback signature.
///
/// `(env, native_ptr, declaring_type, reflected_method, args_array) -> result`.
/// The callback must either return a value or leave an error pending.
pub type InvokeFn = fn(
    env: &dyn HostRuntime,
    native_ptr: i64,
    declaring: HostRef,
    method: HostRef,
    args: HostRef,
) -> HostRef;

/// One entry of a native-method table passed to [`HostRuntime::register_natives`].
#[derive(Clone, Copy)]
pub struct NativeMethod<'a> {
    /// Method name as declared on the managed type
    pub name: &'a str,
    /// Method descriptor, e.g. `(J)V`
    pub signature: &'a str,
    /// Native entry point bound to the method
    pub entry: InvokeFn,
}

impl std::fmt::Debug for NativeMethod<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMethod")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("entry", &(self.entry as usize as *const ()))
            .finish()
    }
}

/// Abstract managed runtime as seen from native code.
///
/// Type names use the host's internal slash form (`java/lang/Object`).
pub trait HostRuntime: Send + Sync {
    // ========================================================================
    // Types and References
    // ========================================================================

    /// Look up a type by name. Returns null and leaves an error pending if
    /// the type does not exist.
    fn find_class(&self, name: &str) -> HostRef;

    /// Pin `obj` so it stays valid across calls and threads
    fn new_global_ref(&self, obj: HostRef) -> HostRef;

    /// Release a reference obtained from [`HostRuntime::new_global_ref`]
    fn delete_global_ref(&self, obj: HostRef);

    /// Release a call-local reference returned by the runtime (from
    /// `find_class`, `new_object_array` or `call_static_method`) once it has
    /// been pinned or is no longer needed
    fn delete_local_ref(&self, obj: HostRef);

    /// Reference identity of two managed objects (null equals null)
    fn is_same_object(&self, a: HostRef, b: HostRef) -> bool;

    /// Identity hash of a managed object
    fn identity_hash_code(&self, obj: HostRef) -> i32;

    /// Textual description of an object (its `toString`)
    fn describe(&self, obj: HostRef) -> String;

    // ========================================================================
    // Native Registration
    // ========================================================================

    /// Bind native entry points to methods declared `native` on `class`.
    /// Leaves an error pending if any method cannot be bound.
    fn register_natives(&self, class: HostRef, methods: &[NativeMethod<'_>]);

    // ========================================================================
    // Pending Errors
    // ========================================================================

    /// Is an error pending on the calling thread?
    fn exception_check(&self) -> bool;

    /// The error pending on the calling thread (null if none), left pending
    fn exception_occurred(&self) -> HostRef;

    /// Discard the pending error on the calling thread, if any
    fn exception_clear(&self);

    /// Instantiate error type `class_name` with `message` and make it pending
    fn throw_new(&self, class_name: &str, message: &str);

    // ========================================================================
    // Methods
    // ========================================================================

    /// Resolve an instance method. Leaves an error pending on failure.
    fn get_method_id(&self, class: HostRef, name: &str, signature: &str) -> Option<MethodId>;

    /// Resolve a static method. Leaves an error pending on failure.
    fn get_static_method_id(
        &self,
        class: HostRef,
        name: &str,
        signature: &str,
    ) -> Option<MethodId>;

    /// Call a static method. Returns null for `void` methods or when the call
    /// leaves an error pending.
    fn call_static_method(&self, class: HostRef, method: MethodId, args: &[HostArg]) -> HostRef;

    /// Canonical method handle behind a reflected method object
    fn from_reflected_method(&self, method: HostRef) -> Option<MethodId>;

    // ========================================================================
    // Values
    // ========================================================================

    /// Allocate an object array of `element_class` holding `items`
    fn new_object_array(&self, element_class: HostRef, items: &[HostRef]) -> HostRef;

    /// Length of an object array (0 for null)
    fn array_length(&self, array: HostRef) -> usize;

    /// Element of an object array (null when out of range)
    fn array_element(&self, array: HostRef, index: usize) -> HostRef;

    /// Box a 32-bit integer
    fn box_int(&self, value: i32) -> HostRef;

    /// Box a boolean
    fn box_bool(&self, value: bool) -> HostRef;

    /// Allocate a string
    fn new_string(&self, value: &str) -> HostRef;
}
