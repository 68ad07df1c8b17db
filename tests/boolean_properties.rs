//! Property tests: compiled filters evaluated by the in-memory backend behave
//! like set operations over the matching documents.

use proptest::prelude::*;
use querygate::security::{DacConditionCfg, DacOperator, PropertyKey};
use querygate::{
    DacCfg, DataType, EntityCfg, InMemoryBackend, Literal, MetadataSnapshot, MetadataStore, PropertyCfg,
    QueryCompiler, QueryContext, SearchCondition, SearchRequest, SearchService,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

const COLORS: [&str; 4] = ["red", "green", "blue", "black"];

fn entities() -> Vec<EntityCfg> {
    vec![EntityCfg::new(1, "Item")
        .aggregate_root()
        .with_property(PropertyCfg::new(1, "color", DataType::String).with_dot_path("color_keyword"))
        .with_property(PropertyCfg::new(2, "size", DataType::Int))
        .with_property(PropertyCfg::new(3, "price", DataType::Double))
        .with_property(PropertyCfg::new(4, "active", DataType::Boolean))]
}

fn red_only() -> DacCfg {
    DacCfg::new(1, "Red items", "Item").with_condition(DacConditionCfg::new(
        PropertyKey::new("Item", "color"),
        DacOperator::Eq,
        vec!["red".to_string()],
    ))
}

fn service(items: &[Value], rules: Vec<DacCfg>) -> SearchService<InMemoryBackend> {
    let snapshot = MetadataSnapshot::build(entities(), rules).unwrap();
    SearchService::new(
        Arc::new(MetadataStore::new(snapshot)),
        InMemoryBackend::from_sources(items.to_vec()),
    )
}

fn matching(service: &SearchService<InMemoryBackend>, filter: Vec<SearchCondition>) -> BTreeSet<u64> {
    let request = SearchRequest {
        filter,
        size: Some(1000),
        ..Default::default()
    };
    service
        .search("Item", request)
        .unwrap()
        .results
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect()
}

fn arb_color() -> impl Strategy<Value = &'static str> {
    prop::sample::select(COLORS.to_vec())
}

fn arb_items() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec((arb_color(), 0i64..10, 0u32..200, any::<bool>()), 0..24).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(id, (color, size, cents, active))| {
                json!({
                    "id": id,
                    "color_keyword": color,
                    "size": size,
                    "price": cents as f64 / 2.0,
                    "active": active,
                })
            })
            .collect()
    })
}

fn arb_leaf() -> impl Strategy<Value = SearchCondition> {
    prop_oneof![
        arb_color().prop_map(|c| SearchCondition::eq("color", c)),
        prop::collection::vec(arb_color(), 0..3).prop_map(|colors| {
            SearchCondition::is_in("color", colors.into_iter().map(Literal::from).collect())
        }),
        (0i64..10).prop_map(|n| SearchCondition::gt("size", n)),
        (0i64..10).prop_map(|n| SearchCondition::lte("size", n)),
        (0u32..200).prop_map(|c| SearchCondition::gte("price", c as f64 / 2.0)),
        any::<bool>().prop_map(|b| SearchCondition::eq("active", b)),
        "[a-z]{0,2}".prop_map(|s| SearchCondition::starts_with("color", s)),
    ]
}

fn arb_condition() -> impl Strategy<Value = SearchCondition> {
    arb_leaf().prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(SearchCondition::and),
            prop::collection::vec(inner.clone(), 0..3).prop_map(SearchCondition::or),
            inner.prop_map(SearchCondition::not),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn and_is_intersection(items in arb_items(), a in arb_condition(), b in arb_condition()) {
        let service = service(&items, Vec::new());
        let left = matching(&service, vec![a.clone()]);
        let right = matching(&service, vec![b.clone()]);
        let both = matching(&service, vec![SearchCondition::and(vec![a.clone(), b.clone()])]);
        let listed = matching(&service, vec![a, b]);

        let expected: BTreeSet<u64> = left.intersection(&right).copied().collect();
        prop_assert_eq!(&both, &expected);
        prop_assert_eq!(&listed, &expected);
    }

    #[test]
    fn or_is_union(items in arb_items(), a in arb_condition(), b in arb_condition()) {
        let service = service(&items, Vec::new());
        let left = matching(&service, vec![a.clone()]);
        let right = matching(&service, vec![b.clone()]);
        let either = matching(&service, vec![SearchCondition::or(vec![a, b])]);

        let expected: BTreeSet<u64> = left.union(&right).copied().collect();
        prop_assert_eq!(either, expected);
    }

    #[test]
    fn not_is_complement(items in arb_items(), a in arb_condition()) {
        let service = service(&items, Vec::new());
        let all = matching(&service, Vec::new());
        let inside = matching(&service, vec![a.clone()]);
        let outside = matching(&service, vec![SearchCondition::not(a)]);

        let expected: BTreeSet<u64> = all.difference(&inside).copied().collect();
        prop_assert_eq!(outside, expected);
    }

    #[test]
    fn policy_only_narrows(items in arb_items(), a in arb_condition()) {
        let open = service(&items, Vec::new());
        let secured = service(&items, vec![red_only()]);

        let unrestricted = matching(&open, vec![a.clone()]);
        let red = matching(&open, vec![SearchCondition::eq("color", "red")]);
        let visible = matching(&secured, vec![a]);

        let expected: BTreeSet<u64> = unrestricted.intersection(&red).copied().collect();
        prop_assert_eq!(visible, expected);
    }

    #[test]
    fn compile_is_deterministic(a in arb_condition(), b in arb_condition()) {
        let snapshot = Arc::new(MetadataSnapshot::build(entities(), Vec::new()).unwrap());
        let ctx = QueryContext::new(snapshot, "Item");
        let conditions = vec![a, b];

        let first = QueryCompiler::compile(&conditions, &ctx).unwrap();
        let second = QueryCompiler::compile(&conditions, &ctx).unwrap();
        prop_assert_eq!(first, second);
    }
}
