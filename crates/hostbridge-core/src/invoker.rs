//! Registration of the native invocation callback

use hostbridge_sdk::NativeMethod;

use crate::bridge::Bridge;
use crate::dispatch;
use crate::error::{take_pending, BridgeError, BridgeResult};

/// Binds [`dispatch::invoke_entry`] to the proxy-generation type's native
/// `invoke` method.
///
/// Registration happens once per bridge, at startup, from a single thread.
pub struct ProxyInvoker;

impl ProxyInvoker {
    /// Register the invocation callback.
    ///
    /// Returns `false` on failure. If the host rejected the binding its
    /// error is left pending for the caller. Calling again after a success
    /// returns `true` without touching the host.
    #[tracing::instrument(skip_all, fields(class = %bridge.options().bridge_class))]
    pub fn register(bridge: &Bridge) -> bool {
        if bridge.is_registered() {
            return true;
        }

        let class = match bridge.bridge_class() {
            Ok(class) => class,
            Err(error) => {
                tracing::warn!(%error, "cannot register native invoke");
                return false;
            }
        };

        let options = bridge.options();
        let env = bridge.runtime().as_ref();
        env.register_natives(
            class,
            &[NativeMethod {
                name: &options.invoke_name,
                signature: &options.invoke_signature,
                entry: dispatch::invoke_entry,
            }],
        );
        if env.exception_check() {
            tracing::warn!("host rejected native invoke registration");
            return false;
        }

        bridge.mark_registered();
        tracing::debug!("registered native invoke");
        true
    }

    /// [`ProxyInvoker::register`], taking any pending host error into the
    /// returned `RegistrationFailed`
    pub fn try_register(bridge: &Bridge) -> BridgeResult<()> {
        if Self::register(bridge) {
            return Ok(());
        }
        let reason = take_pending(bridge.runtime().as_ref())
            .or_else(|| bridge.bridge_class().err().map(|error| error.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Err(BridgeError::RegistrationFailed(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BridgeOptions;
    use hostbridge_sdk::{protocol, HostRuntime};
    use hostbridge_sim::{ClassKind, SimRuntime};
    use std::sync::Arc;

    #[test]
    fn test_register_is_idempotent() {
        let rt = Arc::new(SimRuntime::new());
        let bridge = Bridge::new(rt.clone(), BridgeOptions::default());

        assert!(ProxyInvoker::register(&bridge));
        assert!(ProxyInvoker::register(&bridge));
        assert!(bridge.is_registered());
        assert!(rt.is_registered(
            protocol::BRIDGE_CLASS,
            protocol::INVOKE_NAME,
            protocol::INVOKE_SIGNATURE
        ));
    }

    #[test]
    fn test_rejected_registration_leaves_error_pending() {
        let rt = Arc::new(SimRuntime::bare());
        rt.define_class("app/NoNative", ClassKind::Class, &[]);
        let options = BridgeOptions::default().with_bridge_class("app/NoNative");
        let bridge = Bridge::new(rt.clone(), options);

        assert!(!ProxyInvoker::register(&bridge));
        assert!(!bridge.is_registered());
        assert!(rt.exception_check());
        rt.exception_clear();
    }

    #[test]
    fn test_try_register_reports_reason() {
        let rt = Arc::new(SimRuntime::bare());
        rt.define_class("app/NoNative", ClassKind::Class, &[]);
        let options = BridgeOptions::default().with_bridge_class("app/NoNative");
        let bridge = Bridge::new(rt.clone(), options);

        match ProxyInvoker::try_register(&bridge) {
            Err(BridgeError::RegistrationFailed(reason)) => {
                assert!(reason.contains("app.NoNative.invoke"), "{}", reason);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!rt.exception_check());
    }

    #[test]
    fn test_missing_class_fails_without_pending_error() {
        let rt = Arc::new(SimRuntime::bare());
        let bridge = Bridge::new(rt.clone(), BridgeOptions::default());

        assert!(!ProxyInvoker::register(&bridge));
        assert!(!rt.exception_check());
        assert_eq!(
            ProxyInvoker::try_register(&bridge),
            Err(BridgeError::RegistrationFailed(format!(
                "Class not found: {}",
                protocol::BRIDGE_CLASS
            )))
        );
    }
}
