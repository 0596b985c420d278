use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lockbox::{Acl, Operation, Policy, PolicyStore, Request};

/// Policy with a mix of exact, glob and parameter-constrained rules
fn create_complex_policy(name: &str, rules: usize) -> Policy {
    let mut text = String::new();
    for i in 0..rules {
        text.push_str(&format!(
            r#"
            path "secret/team-{i}/*" {{
                capabilities = ["read", "list"]
            }}
            path "secret/team-{i}/config" {{
                capabilities       = ["create", "update"]
                allowed_parameters = {{ "env" = ["prod-*", "stage-*"] }}
                denied_parameters  = {{ "debug" = [] }}
            }}
            "#
        ));
    }
    text.push_str(r#"path "secret/team-0/locked*" { capabilities = ["deny"] }"#);

    let mut policy = Policy::parse(&text).unwrap();
    policy.name = name.to_string();
    policy
}

/// Benchmark request evaluation against a prebuilt ACL (hot path)
fn bench_allow_operation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allow_operation");

    for rules in [10, 100, 1_000] {
        let policy = create_complex_policy("bench", rules);
        let acl = Acl::new([&policy]).unwrap();

        let glob = Request::new(Operation::Read, format!("secret/team-{}/db/password", rules / 2));
        let params = Request::new(Operation::Update, format!("secret/team-{}/config", rules / 2))
            .with_data("env", "prod-eu")
            .with_data("replicas", 3);
        let miss = Request::new(Operation::Read, "sys/mounts");

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("glob", rules), &glob, |b, req| {
            b.iter(|| black_box(acl.allow_operation(black_box(req))))
        });
        group.bench_with_input(BenchmarkId::new("parameters", rules), &params, |b, req| {
            b.iter(|| black_box(acl.allow_operation(black_box(req))))
        });
        group.bench_with_input(BenchmarkId::new("miss", rules), &miss, |b, req| {
            b.iter(|| black_box(acl.allow_operation(black_box(req))))
        });
    }

    group.finish();
}

/// Benchmark merging many policies into one ACL
fn bench_acl_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("acl_build");

    for count in [1, 10, 50] {
        let policies: Vec<Policy> = (0..count)
            .map(|i| create_complex_policy(&format!("p{i}"), 20))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &policies, |b, policies| {
            b.iter(|| black_box(Acl::new(policies).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark policy text parsing
fn bench_parse(c: &mut Criterion) {
    let text = (0..100)
        .map(|i| format!(r#"path "kv/data/app-{i}/*" {{ capabilities = ["read", "update"] }}"#))
        .collect::<Vec<_>>()
        .join("\n");

    c.bench_function("parse_100_rules", |b| {
        b.iter(|| black_box(Policy::parse(black_box(&text)).unwrap()))
    });
}

/// Benchmark name resolution through the store cache
fn bench_store_build_acl(c: &mut Criterion) {
    let store = PolicyStore::in_memory();
    store.setup().unwrap();
    for i in 0..10 {
        store.set(create_complex_policy(&format!("team-{i}"), 10)).unwrap();
    }
    let names: Vec<String> = (0..10).map(|i| format!("team-{i}")).collect();

    c.bench_function("store_build_acl_cached", |b| {
        b.iter(|| black_box(store.build_acl(&names).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_allow_operation,
    bench_acl_build,
    bench_parse,
    bench_store_build_acl
);
criterion_main!(benches);
