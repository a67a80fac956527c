//! Hostbridge SDK - boundary types between native code and a managed host runtime
//!
//! This crate provides the minimal types and traits shared by the bridge core
//! and by whatever managed runtime hosts the proxies, without either side
//! depending on the other's internals.
//!
//! # Example
//!
//! ```ignore
//! use hostbridge_sdk::{HostRuntime, InvokeOutcome, MethodId, HostRef};
//!
//! fn run(env: &dyn HostRuntime, _declaring: HostRef, _method: MethodId, _args: HostRef) -> InvokeOutcome {
//!     InvokeOutcome::Claimed(env.box_int(42))
//! }
//!
//! let handler: Box<dyn hostbridge_sdk::ProxyHandler> = Box::new(run);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod handler;
pub mod protocol;
pub mod runtime;
pub mod value;

pub use error::{BridgeError, BridgeResult};
pub use handler::{InvokeOutcome, NoopProxyHandler, ProxyHandler};
pub use runtime::{HostRuntime, InvokeFn, NativeMethod};
pub use value::{HostArg, HostRef, MethodId};
