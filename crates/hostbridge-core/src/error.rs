//! Error handling at the host boundary
//!
//! Re-exports the SDK's `BridgeError` and converts host pending errors into
//! it for the few call sites that report through `Result`.

pub use hostbridge_sdk::{BridgeError, BridgeResult};

use hostbridge_sdk::HostRuntime;

/// Take the error pending on the calling thread, returning its description.
pub(crate) fn take_pending(env: &dyn HostRuntime) -> Option<String> {
    if !env.exception_check() {
        return None;
    }
    let thrown = env.exception_occurred();
    let description = env.describe(thrown);
    env.exception_clear();
    Some(description)
}

/// `Err(HostException)` if the last host call left an error pending.
pub(crate) fn check_pending(env: &dyn HostRuntime) -> BridgeResult<()> {
    match take_pending(env) {
        Some(description) => Err(BridgeError::HostException(description)),
        None => Ok(()),
    }
}
