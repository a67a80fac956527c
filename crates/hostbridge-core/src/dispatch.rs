//! Native entry point for every proxy call
//!
//! The host calls [`invoke_entry`] with the native pointer stored in the
//! proxy instance. One entry point serves every proxy of every bridge.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use hostbridge_sdk::protocol;
use hostbridge_sdk::{HostRef, HostRuntime};

use crate::proxy::ProxyObject;

/// Route a proxy call to the `ProxyObject` behind `native_ptr`.
///
/// Always returns a value or leaves an error pending: a null pointer raises
/// a null-pointer error and a panic in native code raises a runtime error.
pub fn invoke_entry(
    env: &dyn HostRuntime,
    native_ptr: i64,
    declaring: HostRef,
    method: HostRef,
    args: HostRef,
) -> HostRef {
    if native_ptr == 0 {
        tracing::warn!("proxy call with a null native pointer");
        env.throw_new(protocol::NULL_POINTER_EXCEPTION, "native proxy pointer is null");
        return HostRef::NULL;
    }

    // SAFETY: non-null pointers handed to the host are addresses of live
    // `ProxyObject`s owned by a `NativeProxy`, which disables the managed
    // instance before freeing the object.
    let object = unsafe { &*(native_ptr as usize as *const ProxyObject) };

    match panic::catch_unwind(AssertUnwindSafe(|| object.invoke(env, declaring, method, args))) {
        Ok(value) => value,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, "native proxy handler panicked");
            if !env.exception_check() {
                env.throw_new(protocol::RUNTIME_EXCEPTION, &message);
            }
            HostRef::NULL
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "native proxy handler panicked".to_string()
    }
}
