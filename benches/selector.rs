use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use series_select::namespace::SeriesRegistry;
use series_select::selector::{parse_selector, Evaluator, LimitConfig, MatcherConfig, PatternMatcher};
use series_select::groups::GroupStore;
use series_select::types::SeriesType;
use std::sync::Arc;

fn create_registry(count: usize) -> SeriesRegistry {
    let registry = SeriesRegistry::new();
    for i in 0..count {
        let name = match i % 4 {
            0 => format!("cpu.host{}.idle", i),
            1 => format!("cpu.host{}.user", i),
            2 => format!("mem.host{}.free", i),
            _ => format!("disk.host{}.used", i),
        };
        registry.get_or_register(&name, SeriesType::Float).unwrap();
    }
    registry
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_selector", |b| {
        b.iter(|| {
            black_box(parse_selector(black_box("/.*/ - /cpu.*/ | /mem.*/ & \"disk.host3.used\" ^ /.*free/")).unwrap())
        });
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for size in [1_000, 10_000, 100_000].iter() {
        let registry = create_registry(*size);
        let evaluator = Evaluator::default();
        let limits = LimitConfig::new(usize::MAX);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(
                    evaluator
                        .evaluate(&registry, "/.*/ - /cpu.*/ | /cpu.*idle/", None, limits)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_parallel_threshold(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_threshold");
    let registry = create_registry(100_000);
    let limits = LimitConfig::new(usize::MAX);

    for threshold in [usize::MAX, 10_000].iter() {
        let matcher = PatternMatcher::new(MatcherConfig {
            parallel_threshold: *threshold,
            ..MatcherConfig::default()
        });
        let evaluator = Evaluator::new(matcher, Arc::new(GroupStore::new()));
        let label = if *threshold == usize::MAX { "sequential" } else { "parallel" };

        group.bench_function(label, |b| {
            b.iter(|| {
                black_box(
                    evaluator
                        .evaluate(&registry, "/cpu.*/ | /mem.*/ ^ /.*host1.*/ - /.*free/", None, limits)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_parallel_threshold);
criterion_main!(benches);
