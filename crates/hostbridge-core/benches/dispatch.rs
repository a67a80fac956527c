use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use hostbridge::{
    protocol, BindingSet, Bridge, BridgeOptions, HostRef, HostRuntime, InterfaceBinding,
    NoopProxyHandler,
};
use hostbridge_sim::SimRuntime;

fn setup() -> (Arc<SimRuntime>, Bridge) {
    let rt = Arc::new(SimRuntime::new());
    rt.define_interface(
        "bench/Widget",
        &[("frob", "(I)I"), ("poke", "()V"), ("name", "()Ljava/lang/String;")],
    );
    let bridge = Bridge::start(rt.clone(), BridgeOptions::default()).unwrap();
    (rt, bridge)
}

fn bench_identity(c: &mut Criterion) {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("bench/Widget");
    let proxy = bridge.new_proxy(NoopProxyHandler, &[&widget]).unwrap();
    let instance = proxy.instance();

    let mut group = c.benchmark_group("identity");
    for (name, sig) in [protocol::HASH_CODE, protocol::TO_STRING] {
        group.bench_with_input(BenchmarkId::new(name, sig), &(name, sig), |b, (name, sig)| {
            b.iter(|| rt.call_proxy(black_box(instance), name, sig, &[]).unwrap());
        });
    }

    let (name, sig) = protocol::EQUALS;
    group.bench_function("equals", |b| {
        b.iter(|| rt.call_proxy(black_box(instance), name, sig, &[instance]).unwrap());
    });
    group.finish();
}

fn bench_bound(c: &mut Criterion) {
    let (rt, bridge) = setup();
    let binding = InterfaceBinding::new(bridge.type_handle("bench/Widget"))
        .method("frob", "(I)I", |env, args| {
            let arg = args.first().copied().unwrap_or_default();
            env.box_int(env.identity_hash_code(arg))
        })
        .method("poke", "()V", |_env, _args| HostRef::NULL)
        .method("name", "()Ljava/lang/String;", |env, _args| env.new_string("widget"));
    let proxy = bridge.new_bound_proxy(BindingSet::new().with(binding)).unwrap();
    let instance = proxy.instance();
    let arg = rt.box_int(7);

    let mut group = c.benchmark_group("bound");
    group.bench_function("first_method", |b| {
        b.iter(|| rt.call_proxy(black_box(instance), "frob", "(I)I", &[arg]).unwrap());
    });
    group.bench_function("last_method", |b| {
        b.iter(|| {
            rt.call_proxy(black_box(instance), "name", "()Ljava/lang/String;", &[])
                .unwrap()
        });
    });
    group.finish();
}

fn bench_unclaimed(c: &mut Criterion) {
    let (rt, bridge) = setup();
    let widget = bridge.type_handle("bench/Widget");
    let proxy = bridge.new_proxy(NoopProxyHandler, &[&widget]).unwrap();
    let instance = proxy.instance();

    c.bench_function("unclaimed", |b| {
        b.iter(|| rt.call_proxy(black_box(instance), "poke", "()V", &[]).unwrap_err());
    });
}

fn bench_lifecycle(c: &mut Criterion) {
    let (_rt, bridge) = setup();
    let widget = bridge.type_handle("bench/Widget");

    c.bench_function("create_and_drop", |b| {
        b.iter(|| bridge.new_proxy(NoopProxyHandler, black_box(&[&widget])).unwrap());
    });
}

criterion_group!(
    benches,
    bench_identity,
    bench_bound,
    bench_unclaimed,
    bench_lifecycle
);
criterion_main!(benches);
