//! Bridge - process-scope state shared by every proxy
//!
//! One `Bridge` per host runtime. It owns the runtime, the options, the
//! type-handle registry and the lazily resolved pieces of the protocol
//! (proxy-generation type, identity table, factory method handles). Cloning
//! is cheap; all clones share the same state.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "proxy-counting")]
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use hostbridge_sdk::{HostRef, HostRuntime, MethodId, ProxyHandler};

use crate::binding::BindingSet;
use crate::error::{take_pending, BridgeError, BridgeResult};
use crate::handle::TypeHandle;
use crate::identity::IdentityTable;
use crate::invoker::ProxyInvoker;
use crate::options::BridgeOptions;
use crate::proxy::NativeProxy;
use crate::registry::HandleRegistry;

/// Static factory and deactivation methods of the proxy-generation type
#[derive(Debug, Clone, Copy)]
pub(crate) struct FactoryMethods {
    pub new_proxy: MethodId,
    pub disable: MethodId,
}

struct BridgeInner {
    runtime: Arc<dyn HostRuntime>,
    options: BridgeOptions,
    registry: Arc<HandleRegistry>,
    bridge_class: OnceCell<TypeHandle>,
    class_class: OnceCell<TypeHandle>,
    identity: OnceCell<Option<IdentityTable>>,
    factory: OnceCell<FactoryMethods>,
    registered: AtomicBool,
    shut_down: AtomicBool,
    #[cfg(feature = "proxy-counting")]
    live: AtomicUsize,
}

/// Handle to the bridge's shared state
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    /// Create a bridge. Makes no host calls.
    pub fn new(runtime: Arc<dyn HostRuntime>, options: BridgeOptions) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                runtime,
                options,
                registry: Arc::new(HandleRegistry::new()),
                bridge_class: OnceCell::new(),
                class_class: OnceCell::new(),
                identity: OnceCell::new(),
                factory: OnceCell::new(),
                registered: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
                #[cfg(feature = "proxy-counting")]
                live: AtomicUsize::new(0),
            }),
        }
    }

    /// Create a bridge, resolve the proxy-generation type and register the
    /// native invocation callback.
    pub fn start(runtime: Arc<dyn HostRuntime>, options: BridgeOptions) -> BridgeResult<Self> {
        let bridge = Self::new(runtime, options);
        bridge.bridge_class()?;
        ProxyInvoker::try_register(&bridge)?;
        Ok(bridge)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Host runtime
    pub fn runtime(&self) -> &Arc<dyn HostRuntime> {
        &self.inner.runtime
    }

    /// Options this bridge was created with
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    /// Registry of live type handles
    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.inner.registry
    }

    /// Resolve a type by name into a handle tracked by this bridge's registry
    pub fn type_handle(&self, name: impl Into<String>) -> TypeHandle {
        TypeHandle::resolve(self.inner.runtime.clone(), &self.inner.registry, name)
    }

    /// The proxy-generation type
    pub fn bridge_class(&self) -> BridgeResult<HostRef> {
        self.cached_class(&self.inner.bridge_class, &self.inner.options.bridge_class)
    }

    /// Has the native invocation callback been registered?
    pub fn is_registered(&self) -> bool {
        self.inner.registered.load(Ordering::Acquire)
    }

    /// Has [`Bridge::shutdown`] run?
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Number of native proxies alive on this bridge
    #[cfg(feature = "proxy-counting")]
    pub fn live_proxies(&self) -> usize {
        self.inner.live.load(Ordering::Relaxed)
    }

    /// Number of native proxies alive on this bridge (counting disabled)
    #[cfg(not(feature = "proxy-counting"))]
    pub fn live_proxies(&self) -> usize {
        0
    }

    // ========================================================================
    // Proxies
    // ========================================================================

    /// Expose `handler` as a managed object implementing `interfaces`
    pub fn new_proxy<H>(&self, handler: H, interfaces: &[&TypeHandle]) -> BridgeResult<NativeProxy>
    where
        H: ProxyHandler + 'static,
    {
        let classes = interfaces
            .iter()
            .map(|handle| handle.class())
            .collect::<BridgeResult<Vec<_>>>()?;
        NativeProxy::create(self.clone(), Box::new(handler), &classes)
    }

    /// Expose a set of interface bindings, implementing every bound interface
    pub fn new_bound_proxy(&self, bindings: BindingSet) -> BridgeResult<NativeProxy> {
        let classes = bindings
            .interfaces()
            .map(|handle| handle.class())
            .collect::<BridgeResult<Vec<_>>>()?;
        NativeProxy::create(self.clone(), Box::new(bindings), &classes)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Release every type handle resolved through this bridge, including the
    /// bridge's own. Returns the number released.
    ///
    /// Run once, from a single point, after the host stops calling in.
    pub fn cleanup_all_type_handles(&self) -> usize {
        self.inner.shut_down.store(true, Ordering::Release);
        self.inner.registry.cleanup_all()
    }

    /// Alias of [`Bridge::cleanup_all_type_handles`]
    pub fn shutdown(&self) -> usize {
        self.cleanup_all_type_handles()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn mark_registered(&self) {
        self.inner.registered.store(true, Ordering::Release);
    }

    /// Element type of the interface array handed to the factory
    pub(crate) fn class_class(&self) -> BridgeResult<HostRef> {
        self.cached_class(&self.inner.class_class, &self.inner.options.class_class)
    }

    /// Identity table, built on first use; `None` if the host lacks it or
    /// the bridge is shut down
    pub(crate) fn identity(&self) -> Option<&IdentityTable> {
        if self.is_shut_down() {
            return None;
        }
        self.inner
            .identity
            .get_or_init(|| {
                IdentityTable::build(
                    &self.inner.runtime,
                    &self.inner.registry,
                    &self.inner.options.object_class,
                )
            })
            .as_ref()
    }

    pub(crate) fn factory(&self) -> BridgeResult<FactoryMethods> {
        let class = self.bridge_class()?;
        self.inner
            .factory
            .get_or_try_init(|| -> BridgeResult<FactoryMethods> {
                let options = &self.inner.options;
                Ok(FactoryMethods {
                    new_proxy: self.static_method(
                        class,
                        &options.new_proxy_name,
                        &options.new_proxy_signature,
                    )?,
                    disable: self.static_method(
                        class,
                        &options.disable_proxy_name,
                        &options.disable_proxy_signature,
                    )?,
                })
            })
            .copied()
    }

    #[cfg(feature = "proxy-counting")]
    pub(crate) fn proxy_created(&self) {
        self.inner.live.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(not(feature = "proxy-counting"))]
    pub(crate) fn proxy_created(&self) {}

    #[cfg(feature = "proxy-counting")]
    pub(crate) fn proxy_released(&self) {
        self.inner.live.fetch_sub(1, Ordering::Relaxed);
    }

    #[cfg(not(feature = "proxy-counting"))]
    pub(crate) fn proxy_released(&self) {}

    fn cached_class(&self, cell: &OnceCell<TypeHandle>, name: &str) -> BridgeResult<HostRef> {
        let handle = cell.get_or_init(|| self.type_handle(name));
        handle.raw_class().ok_or_else(|| {
            if self.is_shut_down() {
                BridgeError::ShutDown
            } else {
                BridgeError::ClassNotFound(name.to_string())
            }
        })
    }

    fn static_method(&self, class: HostRef, name: &str, signature: &str) -> BridgeResult<MethodId> {
        let env = self.inner.runtime.as_ref();
        env.get_static_method_id(class, name, signature).ok_or_else(|| {
            let error = take_pending(env).unwrap_or_default();
            tracing::warn!(name, signature, %error, "proxy factory method missing");
            BridgeError::MethodNotFound {
                class: self.inner.options.bridge_class.clone(),
                name: name.to_string(),
                signature: signature.to_string(),
            }
        })
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("bridge_class", &self.inner.options.bridge_class)
            .field("registered", &self.is_registered())
            .field("shut_down", &self.is_shut_down())
            .field("handles", &self.inner.registry.len())
            .field("live_proxies", &self.live_proxies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_sdk::protocol;
    use hostbridge_sim::SimRuntime;

    #[test]
    fn test_new_makes_no_host_calls() {
        let rt = Arc::new(SimRuntime::new());
        let bridge = Bridge::new(rt.clone(), BridgeOptions::default());
        assert!(!bridge.is_registered());
        assert!(bridge.registry().is_empty());
        assert_eq!(rt.total_pins(), 0);
    }

    #[test]
    fn test_start_registers_invoke() {
        let rt = Arc::new(SimRuntime::new());
        let bridge = Bridge::start(rt.clone(), BridgeOptions::default()).unwrap();
        assert!(bridge.is_registered());
        assert!(rt.is_registered(
            protocol::BRIDGE_CLASS,
            protocol::INVOKE_NAME,
            protocol::INVOKE_SIGNATURE
        ));
        assert_eq!(bridge.registry().names(), vec![protocol::BRIDGE_CLASS.to_string()]);
    }

    #[test]
    fn test_start_without_bridge_class() {
        let rt = Arc::new(SimRuntime::bare());
        let err = Bridge::start(rt.clone(), BridgeOptions::default()).unwrap_err();
        assert_eq!(err, BridgeError::ClassNotFound(protocol::BRIDGE_CLASS.to_string()));
        assert!(!rt.exception_check());
    }

    #[test]
    fn test_custom_bridge_class() {
        let rt = Arc::new(SimRuntime::bare());
        rt.define_bridge_class("app/Bridge");
        let options = BridgeOptions::default().with_bridge_class("app/Bridge");
        let bridge = Bridge::start(rt.clone(), options).unwrap();
        assert!(rt.is_registered("app/Bridge", protocol::INVOKE_NAME, protocol::INVOKE_SIGNATURE));
        assert!(bridge.factory().is_ok());
    }

    #[test]
    fn test_factory_methods_missing() {
        let rt = Arc::new(SimRuntime::bare());
        rt.define_class(
            "app/Bare",
            hostbridge_sim::ClassKind::Class,
            &[hostbridge_sim::MethodSpec::static_native(
                protocol::INVOKE_NAME,
                protocol::INVOKE_SIGNATURE,
            )],
        );
        let options = BridgeOptions::default().with_bridge_class("app/Bare");
        let bridge = Bridge::start(rt.clone(), options).unwrap();

        match bridge.factory() {
            Err(BridgeError::MethodNotFound { class, name, .. }) => {
                assert_eq!(class, "app/Bare");
                assert_eq!(name, protocol::NEW_PROXY_NAME);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!rt.exception_check());
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let rt = Arc::new(SimRuntime::new());
        rt.define_interface("pkg/Widget", &[]);
        let bridge = Bridge::start(rt.clone(), BridgeOptions::default()).unwrap();
        let widget = bridge.type_handle("pkg/Widget");
        assert!(bridge.identity().is_some());
        assert_eq!(bridge.registry().len(), 3);

        assert_eq!(bridge.shutdown(), 3);
        assert!(bridge.is_shut_down());
        assert!(!widget.is_valid());
        assert_eq!(rt.total_pins(), 0);
        assert_eq!(bridge.bridge_class(), Err(BridgeError::ShutDown));
        assert_eq!(bridge.shutdown(), 0);
    }

    #[test]
    fn test_dropping_last_clone_releases_cached_handles() {
        let rt = Arc::new(SimRuntime::new());
        let bridge = Bridge::start(rt.clone(), BridgeOptions::default()).unwrap();
        let other = bridge.clone();
        drop(bridge);
        assert_eq!(rt.total_pins(), 1);
        drop(other);
        assert_eq!(rt.total_pins(), 0);
    }
}
