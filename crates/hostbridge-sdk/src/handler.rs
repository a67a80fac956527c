//! ProxyHandler trait - type-specific proxy dispatch
//!
//! A proxy's identity methods are answered by the bridge itself. Everything
//! else is offered to the proxy's handler, which either claims the call with
//! a result or passes.

use crate::runtime::HostRuntime;
use crate::value::{HostRef, MethodId};

/// Result of offering a call to a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// Call handled; the value is returned to the host
    Claimed(HostRef),
    /// Method not recognized by this handler
    Unclaimed,
}

impl InvokeOutcome {
    /// Claimed with no meaningful value (`void` methods)
    #[inline]
    pub fn void() -> Self {
        Self::Claimed(HostRef::NULL)
    }

    /// Was the call claimed?
    #[inline]
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }

    /// The claimed value, if any
    #[inline]
    pub fn value(self) -> Option<HostRef> {
        match self {
            Self::Claimed(value) => Some(value),
            Self::Unclaimed => None,
        }
    }

    /// Keep a claimed outcome, otherwise try `next`
    #[inline]
    pub fn or_else(self, next: impl FnOnce() -> InvokeOutcome) -> Self {
        match self {
            Self::Claimed(_) => self,
            Self::Unclaimed => next(),
        }
    }
}

/// Native implementation behind a proxy's interface methods.
///
/// Handlers are called from arbitrary host threads.
///
/// - `env`: host runtime for the calling thread
/// - `declaring`: declaring type of the invoked method
/// - `method`: canonical method handle
/// - `args`: object array of boxed arguments (may be null for no arguments)
///
/// Returns `InvokeOutcome::Unclaimed` if the method is not recognized.
pub trait ProxyHandler: Send + Sync {
    /// Handle a proxy method call
    fn try_invoke(
        &self,
        env: &dyn HostRuntime,
        declaring: HostRef,
        method: MethodId,
        args: HostRef,
    ) -> InvokeOutcome;
}

impl<F> ProxyHandler for F
where
    F: Fn(&dyn HostRuntime, HostRef, MethodId, HostRef) -> InvokeOutcome + Send + Sync,
{
    fn try_invoke(
        &self,
        env: &dyn HostRuntime,
        declaring: HostRef,
        method: MethodId,
        args: HostRef,
    ) -> InvokeOutcome {
        self(env, declaring, method, args)
    }
}

/// A no-op handler that returns `Unclaimed` for all calls
pub struct NoopProxyHandler;

impl ProxyHandler for NoopProxyHandler {
    fn try_invoke(
        &self,
        _env: &dyn HostRuntime,
        _declaring: HostRef,
        _method: MethodId,
        _args: HostRef,
    ) -> InvokeOutcome {
        InvokeOutcome::Unclaimed
    }
}
