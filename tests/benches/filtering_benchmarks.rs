//! # Cluster-Sync Hot Path Benchmarks
//!
//! Every inbound and outbound event goes through `is_allowed` and the
//! registry, so both must stay cheap.
//!
//! | Path | Target |
//! |------|--------|
//! | `wildcard_match` | < 1µs |
//! | `FilteringEngine::is_allowed`, 100 patterns | < 10µs |
//! | `EventHandlerRegistry::dispatch`, 8 handlers | < 10µs |

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cs_01_groups::{GroupDefinition, GroupManager, ListType};
use cs_02_filtering::{wildcard_match, FilteringEngine, ResourceFilter};
use cs_03_dispatch::{EventHandler, EventHandlerRegistry};
use shared_bus::{ChangeType, ClusterEvent, EventKind};
use shared_types::{EventType, HandlerError, Node, Switch, DEFAULT_GROUP_NAME};

// ============================================================================
// Wildcard matching
// ============================================================================

fn bench_wildcard(c: &mut Criterion) {
    let mut group = c.benchmark_group("wildcard");
    let item = "org.apache.karaf.features.repos";
    for pattern in ["org.apache.karaf.features.repos", "org.apache.*", "*.features.*", "*"] {
        group.bench_with_input(BenchmarkId::new("match", pattern), &pattern, |b, pattern| {
            b.iter(|| black_box(wildcard_match(black_box(item), pattern)))
        });
    }
    group.finish();
}

// ============================================================================
// Filtering engine
// ============================================================================

fn bench_is_allowed(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_allowed");

    for size in [10usize, 100, 1000] {
        let groups = Arc::new(GroupManager::new(Node::new("bench", "localhost", 5701)));
        groups
            .apply_definition(&GroupDefinition::default_group())
            .expect("default group applies");
        let patterns: Vec<String> = (0..size).map(|i| format!("com.vendor{i}.*")).collect();
        groups
            .set_list(
                DEFAULT_GROUP_NAME,
                ListType::Blacklist,
                "config",
                EventType::Outbound,
                patterns,
            )
            .expect("default group exists");
        let engine = FilteringEngine::new(groups);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("blacklist", size), &engine, |b, engine| {
            b.iter(|| {
                black_box(engine.is_allowed(
                    DEFAULT_GROUP_NAME,
                    "config",
                    black_box("org.acme.service"),
                    EventType::Outbound,
                ))
            })
        });
    }
    group.finish();
}

// ============================================================================
// Registry dispatch
// ============================================================================

struct NoopHandler {
    name: String,
    switch: Switch,
}

impl EventHandler for NoopHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EventKind {
        EventKind::Configuration
    }

    fn switch(&self) -> &Switch {
        &self.switch
    }

    fn handle(&self, event: &ClusterEvent) -> Result<(), HandlerError> {
        black_box(event);
        Ok(())
    }
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for count in [1usize, 8, 64] {
        let registry = EventHandlerRegistry::new();
        for i in 0..count {
            let name = format!("handler-{i}");
            registry.bind(Arc::new(NoopHandler {
                switch: Switch::new(name.clone()),
                name,
            }));
        }
        let event = ClusterEvent::configuration(DEFAULT_GROUP_NAME, "org.acme", ChangeType::Updated);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("handlers", count), &registry, |b, registry| {
            b.iter(|| black_box(registry.dispatch(black_box(&event))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_wildcard, bench_is_allowed, bench_dispatch);
criterion_main!(benches);
