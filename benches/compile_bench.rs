use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;

use querygate::security::{DacConditionCfg, DacOperator, PropertyKey};
use querygate::{
    DacCfg, DataType, EntityCfg, InMemoryBackend, MetadataSnapshot, MetadataStore, PolicyEngine,
    PropertyCfg, QueryCompiler, QueryContext, SearchCondition, SearchRequest, SearchService,
};

fn snapshot() -> MetadataSnapshot {
    let entities = vec![
        EntityCfg::new(1, "Person")
            .aggregate_root()
            .with_property(PropertyCfg::new(1, "name", DataType::String).with_dot_path("name_keyword"))
            .with_property(PropertyCfg::new(2, "age", DataType::Int))
            .with_property(PropertyCfg::new(3, "joined", DataType::Date))
            .with_property(PropertyCfg::bridge(4, "addresses", "Address")),
        EntityCfg::new(2, "Address")
            .with_property(PropertyCfg::new(5, "country", DataType::String).with_dot_path("country_keyword"))
            .with_property(PropertyCfg::new(6, "zip", DataType::Int)),
    ];
    let rule = DacCfg::new(1, "USA Residents Only", "Person").with_condition(DacConditionCfg::new(
        PropertyKey::new("Address", "country"),
        DacOperator::Eq,
        vec!["USA".to_string()],
    ));
    MetadataSnapshot::build(entities, vec![rule]).unwrap()
}

/// `width` OR-groups, each mixing a root field and a one-hop field
fn filter(width: usize) -> Vec<SearchCondition> {
    (0..width)
        .map(|i| {
            SearchCondition::or(vec![
                SearchCondition::and(vec![
                    SearchCondition::gte("age", i as i64),
                    SearchCondition::lt("age", (i + 30) as i64),
                ]),
                SearchCondition::not(SearchCondition::eq("zip", format!("{}", 10_000 + i))),
                SearchCondition::contains("name", "an"),
            ])
        })
        .collect()
}

fn bench_compile(c: &mut Criterion) {
    let ctx = QueryContext::new(Arc::new(snapshot()), "Person");

    let mut group = c.benchmark_group("compile");
    for width in [1usize, 8, 64] {
        let conditions = filter(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &conditions, |b, conditions| {
            b.iter(|| {
                black_box(QueryCompiler::compile(conditions, &ctx).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_secure_and_compile(c: &mut Criterion) {
    let snapshot = Arc::new(snapshot());
    let ctx = QueryContext::new(Arc::clone(&snapshot), "Person");
    let conditions = filter(8);

    c.bench_function("secure_and_compile", |b| {
        b.iter(|| {
            let secured = PolicyEngine::secure(conditions.clone(), &snapshot, "Person").unwrap();
            black_box(QueryCompiler::compile_secured(&secured, &ctx).unwrap());
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let countries = ["USA", "France", "Canada", "Japan"];
    let mut group = c.benchmark_group("search");
    for count in [1_000usize, 10_000] {
        let documents = (0..count)
            .map(|i| {
                json!({
                    "id": i,
                    "name_keyword": format!("Person {}", i),
                    "age": i % 90,
                    "addresses": [ { "country_keyword": countries[i % countries.len()], "zip": 10_000 + i % 500 } ]
                })
            })
            .collect();
        let service = SearchService::new(
            Arc::new(MetadataStore::new(snapshot())),
            InMemoryBackend::from_sources(documents),
        );
        let request = SearchRequest::new()
            .with_filter(SearchCondition::gte("age", 18i64))
            .with_facet("country")
            .with_stats("zip");

        group.bench_with_input(BenchmarkId::from_parameter(count), &request, |b, request| {
            b.iter(|| {
                black_box(service.search("Person", request.clone()).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_secure_and_compile, bench_search);
criterion_main!(benches);
