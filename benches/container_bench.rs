#![allow(dead_code)]
//! 服务容器的性能基准测试

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::future;
use synckit::infrastructure::container::key::TypeIdKey;
use synckit::{Environment, ServiceContainer};
use tokio::runtime::Runtime;

/// 测试用的简单服务
struct SimpleService {
    value: i32,
}

/// 测试用的复杂服务（包含多个字段）
struct ComplexService {
    id: u64,
    name: String,
    dependencies: Vec<String>,
}

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct PlainGreeter;

impl Greeter for PlainGreeter {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

/// 基准测试：已缓存服务的解析
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("service_resolution");

    let container = ServiceContainer::new();
    container.register(|_| Arc::new(SimpleService { value: 1 }));
    container.register::<dyn Greeter, _>(|_| Arc::new(PlainGreeter));

    group.bench_function("concrete", |b| {
        b.iter(|| black_box(container.resolve::<SimpleService>().map(|s| s.value)))
    });
    group.bench_function("trait_object", |b| {
        b.iter(|| black_box(container.resolve::<dyn Greeter>().map(|g| g.greet())))
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(container.lookup::<ComplexService>().is_none()))
    });

    let by_id = ServiceContainer::with_key_strategy(Environment::Production, Arc::new(TypeIdKey));
    by_id.register(|_| Arc::new(SimpleService { value: 1 }));
    group.bench_function("type_id_key", |b| {
        b.iter(|| black_box(by_id.resolve::<SimpleService>().map(|s| s.value)))
    });

    group.finish();
}

/// 基准测试：单例缓存与每次构造的对比
fn bench_singleton_vs_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("singleton_vs_create");
    let container = ServiceContainer::new();

    group.bench_function("singleton", |b| {
        b.iter(|| {
            black_box(container.singleton(|_| {
                Arc::new(ComplexService {
                    id: 1,
                    name: "complex".to_string(),
                    dependencies: vec!["a".to_string(), "b".to_string()],
                })
            }))
        })
    });
    group.bench_function("create", |b| {
        b.iter(|| {
            black_box(container.create(|_| {
                Arc::new(ComplexService {
                    id: 1,
                    name: "complex".to_string(),
                    dependencies: vec!["a".to_string(), "b".to_string()],
                })
            }))
        })
    });

    group.finish();
}

/// 基准测试：并发解析
fn bench_concurrent_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent_resolution");

    for concurrency in [1, 10, 50].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            concurrency,
            |b, &concurrency| {
                let container = ServiceContainer::new();
                container.register(|_| Arc::new(SimpleService { value: 7 }));

                b.iter(|| {
                    runtime.block_on(async {
                        let tasks: Vec<_> = (0..concurrency)
                            .map(|_| {
                                let container = container.clone();
                                tokio::spawn(async move {
                                    container.resolve::<SimpleService>().map(|s| s.value).unwrap_or(0)
                                })
                            })
                            .collect();
                        black_box(future::join_all(tasks).await)
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_resolution,
    bench_singleton_vs_create,
    bench_concurrent_resolution
);
criterion_main!(benches);
