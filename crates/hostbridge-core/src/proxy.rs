//! Native proxy objects
//!
//! A `ProxyObject` is the native side of one managed proxy instance. Its heap
//! address is the opaque pointer the host stores in the instance and passes
//! back on every call; [`crate::dispatch::invoke_entry`] turns it back into a
//! `&ProxyObject`.
//!
//! `NativeProxy` is the owner: it keeps the `ProxyObject` at a fixed address
//! and pins the managed instance for as long as it lives, then disables the
//! instance before freeing the native side. A native side whose instance
//! could not be disabled is never freed.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::ptr::NonNull;

use hostbridge_sdk::{HostArg, HostRef, HostRuntime, InvokeOutcome, MethodId, ProxyHandler};

use crate::bridge::Bridge;
use crate::error::{check_pending, BridgeError, BridgeResult};
use crate::identity::IdentityMethod;

/// Native side of a managed proxy instance
pub struct ProxyObject {
    bridge: Bridge,
    handler: Box<dyn ProxyHandler>,
    /// Managed instance, bound once after the factory returns
    instance: OnceCell<HostRef>,
}

impl ProxyObject {
    /// Create an unbound proxy object
    pub fn new(bridge: Bridge, handler: Box<dyn ProxyHandler>) -> Self {
        Self {
            bridge,
            handler,
            instance: OnceCell::new(),
        }
    }

    /// Opaque pointer handed to the host; the address of this object
    pub fn native_ptr(&self) -> i64 {
        self as *const Self as usize as i64
    }

    /// Bound managed instance (null until bound)
    pub fn instance(&self) -> HostRef {
        self.instance.get().copied().unwrap_or_default()
    }

    /// Bind the managed instance. Only the first call has an effect.
    pub(crate) fn bind(&self, instance: HostRef) -> bool {
        self.instance.set(instance).is_ok()
    }

    /// The bridge this proxy belongs to
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Identity hash of the bound instance
    pub fn hash_code(&self, env: &dyn HostRuntime) -> i32 {
        env.identity_hash_code(self.instance())
    }

    /// Is `other` the bound instance itself?
    pub fn equals(&self, env: &dyn HostRuntime, other: HostRef) -> bool {
        env.is_same_object(self.instance(), other)
    }

    /// Fixed string form reported by every proxy
    pub fn string_form(&self) -> &str {
        &self.bridge.options().proxy_string
    }

    /// Answer the identity methods; everything else is unclaimed.
    pub fn try_invoke(
        &self,
        env: &dyn HostRuntime,
        declaring: HostRef,
        method: MethodId,
        args: HostRef,
    ) -> InvokeOutcome {
        let Some(identity) = self.bridge.identity() else {
            return InvokeOutcome::Unclaimed;
        };
        match identity.classify(env, declaring, method) {
            IdentityMethod::HashCode => InvokeOutcome::Claimed(env.box_int(self.hash_code(env))),
            IdentityMethod::Equals => {
                let other = env.array_element(args, 0);
                InvokeOutcome::Claimed(env.box_bool(self.equals(env, other)))
            }
            IdentityMethod::ToString => InvokeOutcome::Claimed(env.new_string(self.string_form())),
            IdentityMethod::Unrecognized => InvokeOutcome::Unclaimed,
        }
    }

    /// Handle one call from the host.
    ///
    /// Identity methods first, then the handler. A call nobody claims raises
    /// the configured "no such method" error, described by the reflected
    /// method, and returns null.
    pub fn invoke(
        &self,
        env: &dyn HostRuntime,
        declaring: HostRef,
        reflected: HostRef,
        args: HostRef,
    ) -> HostRef {
        let outcome = match env.from_reflected_method(reflected) {
            Some(method) => self
                .try_invoke(env, declaring, method, args)
                .or_else(|| self.handler.try_invoke(env, declaring, method, args)),
            None => InvokeOutcome::Unclaimed,
        };

        match outcome {
            InvokeOutcome::Claimed(value) => value,
            InvokeOutcome::Unclaimed => {
                let description = env.describe(reflected);
                tracing::debug!(method = %description, "unclaimed proxy call");
                env.throw_new(&self.bridge.options().no_such_method_error, &description);
                HostRef::NULL
            }
        }
    }

    /// Ask the host to create a proxy instance implementing `interfaces` that
    /// routes calls to `native_ptr`.
    pub fn new_instance(
        env: &dyn HostRuntime,
        bridge: &Bridge,
        native_ptr: i64,
        interfaces: &[HostRef],
    ) -> BridgeResult<HostRef> {
        let factory = bridge.factory()?;
        let class = bridge.bridge_class()?;
        let class_class = bridge.class_class()?;

        let array = env.new_object_array(class_class, interfaces);
        check_pending(env)?;

        let instance = env.call_static_method(
            class,
            factory.new_proxy,
            &[HostArg::Long(native_ptr), HostArg::Object(array)],
        );
        env.delete_local_ref(array);
        check_pending(env)?;
        instance.non_null().ok_or(BridgeError::NullProxy)
    }

    /// Ask the host to stop routing calls from `proxy` to native code
    pub fn disable_instance(env: &dyn HostRuntime, bridge: &Bridge, proxy: HostRef) -> BridgeResult<()> {
        let factory = bridge.factory()?;
        let class = bridge.bridge_class()?;
        env.call_static_method(class, factory.disable, &[HostArg::Object(proxy)]);
        check_pending(env)
    }
}

impl std::fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyObject")
            .field("native_ptr", &format_args!("{:#x}", self.native_ptr()))
            .field("instance", &self.instance())
            .finish()
    }
}

/// Owner of a native proxy and its pinned managed instance.
///
/// Dropping it disables the managed instance (if [`NativeProxy::disable`]
/// has not succeeded), releases the pin and frees the `ProxyObject`. The host
/// must not dispatch to the instance after it is disabled.
///
/// If the instance cannot be disabled, for example after
/// [`Bridge::shutdown`], the host may still call in with this proxy's native
/// pointer, so the `ProxyObject` is leaked rather than freed.
pub struct NativeProxy {
    object: NonNull<ProxyObject>,
    instance: HostRef,
    disabled: Mutex<bool>,
}

// SAFETY: `object` is uniquely owned by this guard and only handed out as a
// shared reference; `ProxyObject` is itself `Send + Sync`.
unsafe impl Send for NativeProxy {}
unsafe impl Sync for NativeProxy {}

impl NativeProxy {
    pub(crate) fn create(
        bridge: Bridge,
        handler: Box<dyn ProxyHandler>,
        interfaces: &[HostRef],
    ) -> BridgeResult<Self> {
        let object = Box::new(ProxyObject::new(bridge.clone(), handler));
        let env = bridge.runtime().as_ref();

        let local = ProxyObject::new_instance(env, &bridge, object.native_ptr(), interfaces)?;
        let instance = env.new_global_ref(local);
        env.delete_local_ref(local);
        object.bind(instance);
        bridge.proxy_created();

        tracing::debug!(
            native_ptr = object.native_ptr(),
            interfaces = interfaces.len(),
            "created native proxy"
        );
        Ok(Self {
            object: NonNull::from(Box::leak(object)),
            instance,
            disabled: Mutex::new(false),
        })
    }

    /// The native side
    pub fn object(&self) -> &ProxyObject {
        // SAFETY: `object` came from `Box::leak` and is freed only in `drop`.
        unsafe { self.object.as_ref() }
    }

    /// Pinned managed instance
    pub fn instance(&self) -> HostRef {
        self.instance
    }

    /// Opaque pointer the host dispatches with
    pub fn native_ptr(&self) -> i64 {
        self.object().native_ptr()
    }

    /// Has the managed instance been disabled?
    pub fn is_disabled(&self) -> bool {
        *self.disabled.lock()
    }

    /// Disable the managed instance.
    ///
    /// Once a disable succeeds, later calls return `Ok(())` without touching
    /// the host. A failed disable leaves the proxy active and may be retried.
    pub fn disable(&self) -> BridgeResult<()> {
        let mut disabled = self.disabled.lock();
        if *disabled {
            return Ok(());
        }
        let object = self.object();
        let env = object.bridge.runtime().as_ref();
        ProxyObject::disable_instance(env, &object.bridge, self.instance)?;
        *disabled = true;
        tracing::debug!(native_ptr = object.native_ptr(), "disabled native proxy");
        Ok(())
    }
}

impl Drop for NativeProxy {
    fn drop(&mut self) {
        let disabled = self.disable();
        let object = self.object();
        object.bridge.runtime().delete_global_ref(self.instance);

        if let Err(error) = disabled {
            // The instance still routes here; the object must outlive it
            tracing::warn!(
                %error,
                native_ptr = object.native_ptr(),
                "failed to disable native proxy, leaking it"
            );
            return;
        }

        // SAFETY: `object` came from `Box::leak` in `create`, and the host no
        // longer dispatches to it once the instance is disabled.
        let object = unsafe { Box::from_raw(self.object.as_ptr()) };
        object.bridge.proxy_released();
    }
}

impl std::fmt::Debug for NativeProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeProxy")
            .field("object", self.object())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}
