use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hostbridge::dispatch::invoke_entry;
use hostbridge::{
    protocol, Bridge, BridgeOptions, HostRef, HostRuntime, InvokeOutcome, MethodId,
    NoopProxyHandler, ProxyHandler,
};
use hostbridge_sim::{SimError, SimRuntime};

/// Handler that counts every call that reaches it and claims nothing
#[derive(Default)]
struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

impl ProxyHandler for CountingHandler {
    fn try_invoke(
        &self,
        _env: &dyn HostRuntime,
        _declaring: HostRef,
        _method: MethodId,
        _args: HostRef,
    ) -> InvokeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        InvokeOutcome::Unclaimed
    }
}

fn setup() -> (Arc<SimRuntime>, Bridge) {
    // Log to the test output when HOSTBRIDGE_LOG is set
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_env("HOSTBRIDGE_LOG") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }

    let rt = Arc::new(SimRuntime::new());
    rt.define_interface("pkg/Widget", &[("frob", "(I)I"), ("poke", "()V")]);
    let bridge = Bridge::start(rt.clone(), BridgeOptions::default()).unwrap();
    (rt, bridge)
}

// ============================================================================
// Identity Method Tests
// ============================================================================

#[test]
fn test_identity_methods_never_reach_handler() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let handler = CountingHandler::default();
    let calls = handler.calls.clone();
    let proxy = bridge.new_proxy(handler, &[&widget]).unwrap();
    let instance = proxy.instance();

    for _ in 0..3 {
        let (name, sig) = protocol::HASH_CODE;
        rt.call_proxy(instance, name, sig, &[]).unwrap();
        let (name, sig) = protocol::EQUALS;
        rt.call_proxy(instance, name, sig, &[instance]).unwrap();
        let (name, sig) = protocol::TO_STRING;
        rt.call_proxy(instance, name, sig, &[]).unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(rt.dispatch_count(), 9);
}

#[test]
fn test_hash_is_identity_hash_of_instance() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let proxy = bridge.new_proxy(NoopProxyHandler, &[&widget]).unwrap();
    let instance = proxy.instance();

    let (name, sig) = protocol::HASH_CODE;
    let first = rt.call_proxy(instance, name, sig, &[]).unwrap();
    let second = rt.call_proxy(instance, name, sig, &[]).unwrap();

    let expected = rt.identity_hash_code(instance);
    assert_eq!(rt.int_value(first), Some(expected));
    assert_eq!(rt.int_value(second), Some(expected));
    assert_eq!(proxy.object().hash_code(rt.as_ref()), expected);
}

#[test]
fn test_equals_compares_identity() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let a = bridge.new_proxy(NoopProxyHandler, &[&widget]).unwrap();
    let b = bridge.new_proxy(NoopProxyHandler, &[&widget]).unwrap();

    let (name, sig) = protocol::EQUALS;
    let same = rt.call_proxy(a.instance(), name, sig, &[a.instance()]).unwrap();
    let other = rt.call_proxy(a.instance(), name, sig, &[b.instance()]).unwrap();

    assert_eq!(rt.bool_value(same), Some(true));
    assert_eq!(rt.bool_value(other), Some(false));
}

// ============================================================================
// Delegation Tests
// ============================================================================

#[test]
fn test_handler_claims_interface_method() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let frob = rt.method_id("pkg/Widget", "frob", "(I)I").unwrap();

    let handler = move |env: &dyn HostRuntime, _declaring: HostRef, method: MethodId, _args: HostRef| {
        if method == frob {
            InvokeOutcome::Claimed(env.box_int(99))
        } else {
            InvokeOutcome::Unclaimed
        }
    };
    let proxy = bridge.new_proxy(handler, &[&widget]).unwrap();

    let arg = rt.box_int(1);
    let result = rt.call_proxy(proxy.instance(), "frob", "(I)I", &[arg]).unwrap();
    assert_eq!(rt.int_value(result), Some(99));
}

#[test]
fn test_void_claim_returns_null_without_error() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let handler = |_env: &dyn HostRuntime, _declaring: HostRef, _method: MethodId, _args: HostRef| {
        InvokeOutcome::void()
    };
    let proxy = bridge.new_proxy(handler, &[&widget]).unwrap();

    let result = rt.call_proxy(proxy.instance(), "poke", "()V", &[]).unwrap();
    assert!(result.is_null());
}

// ============================================================================
// Unclaimed Method Tests
// ============================================================================

#[test]
fn test_unclaimed_method_raises_with_description() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let handler = CountingHandler::default();
    let calls = handler.calls.clone();
    let proxy = bridge.new_proxy(handler, &[&widget]).unwrap();

    let err = rt.call_proxy(proxy.instance(), "poke", "()V", &[]).unwrap_err();

    assert_eq!(
        err,
        SimError::Thrown {
            class: protocol::NO_SUCH_METHOD_ERROR.to_string(),
            message: "public abstract void pkg.Widget.poke()".to_string(),
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unresolvable_method_reference_raises() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let proxy = bridge.new_proxy(NoopProxyHandler, &[&widget]).unwrap();
    let not_a_method = rt.new_string("not a method");

    let result = invoke_entry(
        rt.as_ref(),
        proxy.native_ptr(),
        widget.class().unwrap(),
        not_a_method,
        HostRef::NULL,
    );

    assert!(result.is_null());
    match rt.take_exception() {
        Some(SimError::Thrown { class, message }) => {
            assert_eq!(class, protocol::NO_SUCH_METHOD_ERROR);
            assert_eq!(message, "not a method");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_identity_after_shutdown_falls_through_to_handler() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let handler = CountingHandler::default();
    let calls = handler.calls.clone();
    let proxy = bridge.new_proxy(handler, &[&widget]).unwrap();
    let instance = proxy.instance();

    bridge.shutdown();

    let (name, sig) = protocol::HASH_CODE;
    let err = rt.call_proxy(instance, name, sig, &[]).unwrap_err();
    assert!(matches!(err, SimError::Thrown { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dispatch_keeps_only_results_on_the_heap() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let proxy = bridge.new_proxy(NoopProxyHandler, &[&widget]).unwrap();
    let instance = proxy.instance();
    let (name, sig) = protocol::EQUALS;
    rt.call_proxy(instance, name, sig, &[instance]).unwrap();

    let before = rt.object_count();
    for _ in 0..10 {
        rt.call_proxy(instance, name, sig, &[instance]).unwrap();
    }
    // One boxed result per call; the reflected method and argument array are freed
    assert_eq!(rt.object_count(), before + 10);
}

// ============================================================================
// Entry Point Tests
// ============================================================================

#[test]
fn test_null_native_pointer_raises() {
    let (rt, _bridge) = setup();

    let result = invoke_entry(rt.as_ref(), 0, HostRef::NULL, HostRef::NULL, HostRef::NULL);

    assert!(result.is_null());
    match rt.take_exception() {
        Some(SimError::Thrown { class, .. }) => {
            assert_eq!(class, protocol::NULL_POINTER_EXCEPTION);
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_handler_panic_becomes_host_error() {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("pkg/Widget");
    let handler = |_env: &dyn HostRuntime, _declaring: HostRef, _method: MethodId, _args: HostRef| -> InvokeOutcome {
        panic!("widget exploded")
    };
    let proxy = bridge.new_proxy(handler, &[&widget]).unwrap();

    let err = rt.call_proxy(proxy.instance(), "poke", "()V", &[]).unwrap_err();

    assert_eq!(
        err,
        SimError::Thrown {
            class: protocol::RUNTIME_EXCEPTION.to_string(),
            message: "widget exploded".to_string(),
        }
    );
}
