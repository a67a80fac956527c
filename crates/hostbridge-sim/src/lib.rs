//! Simulated managed runtime for hostbridge
//!
//! `SimRuntime` implements `HostRuntime` entirely in process: a class table
//! with canonical method handles, an object heap with global-reference pin
//! counts, per-thread pending errors, a native-method table, and proxy
//! instances that can be disabled. It stands in for a real managed runtime in
//! tests and benchmarks, and lets embedders exercise their proxy handlers
//! without starting one.
//!
//! # Example
//!
//! ```ignore
//! use hostbridge_sim::SimRuntime;
//!
//! let rt = SimRuntime::new();
//! rt.define_interface("pkg/Runnable", &[("run", "()V")]);
//! ```

#![warn(missing_docs)]

pub mod classes;
pub mod error;
pub mod heap;
pub mod runtime;

pub use classes::{ClassId, ClassKind, ClassTable, Intrinsic, MethodSpec};
pub use error::{SimError, SimResult};
pub use heap::{Heap, ProxyState, SimObject};
pub use runtime::SimRuntime;
