//! Hostbridge - native implementations of managed-runtime interfaces
//!
//! A managed host runtime generates proxy instances for a set of interfaces
//! and routes every call on them to a single registered native callback.
//! This crate provides that callback and what surrounds it:
//!
//! - [`Bridge`]: process-scope state (host runtime, options, type-handle
//!   registry, lazily resolved protocol methods, live-proxy counter)
//! - [`ProxyInvoker`]: registers [`dispatch::invoke_entry`] with the host
//! - [`ProxyObject`] / [`NativeProxy`]: the native side of one proxy instance
//!   and its owner guard
//! - [`IdentityTable`]: `hashCode`, `equals` and `toString`, answered for
//!   every proxy without reaching its handler
//! - [`TypeHandle`] / [`HandleRegistry`]: pinned type references with bulk
//!   cleanup at shutdown
//! - [`InterfaceBinding`] / [`BindingSet`]: closure-table handlers
//!
//! # Example
//!
//! ```ignore
//! use hostbridge::{Bridge, BridgeOptions, BindingSet, InterfaceBinding};
//!
//! let bridge = Bridge::start(runtime, BridgeOptions::default())?;
//! let runnable = InterfaceBinding::new(bridge.type_handle("java/lang/Runnable"))
//!     .method("run", "()V", |_env, _args| HostRef::NULL);
//! let proxy = bridge.new_bound_proxy(BindingSet::new().with(runnable))?;
//! hand_to_host(proxy.instance());
//! ```

#![warn(missing_docs)]

pub mod binding;
pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod identity;
pub mod invoker;
pub mod options;
pub mod proxy;
pub mod registry;

pub use binding::{BindingSet, BoundMethod, InterfaceBinding};
pub use bridge::Bridge;
pub use error::{BridgeError, BridgeResult};
pub use handle::{HandleId, TypeHandle};
pub use identity::{IdentityMethod, IdentityTable};
pub use invoker::ProxyInvoker;
pub use options::BridgeOptions;
pub use proxy::{NativeProxy, ProxyObject};
pub use registry::HandleRegistry;

pub use hostbridge_sdk::{
    protocol, HostArg, HostRef, HostRuntime, InvokeOutcome, MethodId, NoopProxyHandler,
    ProxyHandler,
};
