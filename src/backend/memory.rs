//! In-memory reference backend
//!
//! Documents are JSON objects held in insertion order; a document's position
//! is its document number. Predicates are evaluated to `RoaringBitmap`s of
//! document numbers and combined with bitmap set operations.
//!
//! Path conventions:
//! - A path walks nested objects by `.`-separated segments; arrays at any
//!   level are flattened, so a multi-valued path matches if any value does.
//! - A `_text` path with no value falls back to its `_keyword` sibling, then
//!   to the bare stem, so documents need to store a string field only once.
//!
//! There is no scoring: without a sort, hits come back in insertion order.

use super::{BackendRequest, BackendResponse, Document, SearchBackend};
use crate::aggregation::{AggregationRequest, AggregationResult, Bucket};
use crate::query::{parse_date, BoolPredicate, Literal, Predicate, SortClause, SortDirection};
use crate::schema::{KEYWORD_SUFFIX, TEXT_SUFFIX};
use crate::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use roaring::RoaringBitmap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Reference `SearchBackend` over JSON documents
pub struct InMemoryBackend {
    documents: RwLock<Vec<Document>>,
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::with_documents(Vec::new())
    }

    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Create a backend from raw JSON objects
    ///
    /// A numeric `id` attribute becomes the document id; otherwise the
    /// position in `sources` is used.
    pub fn from_sources(sources: Vec<Value>) -> Self {
        let documents = sources
            .into_iter()
            .enumerate()
            .map(|(position, source)| {
                let id = source
                    .get("id")
                    .and_then(Value::as_u64)
                    .unwrap_or(position as u64);
                Document::new(id, source)
            })
            .collect();
        Self::with_documents(documents)
    }

    /// Load a JSON array of documents from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let sources: Vec<Value> = serde_json::from_str(&text)?;
        Ok(Self::from_sources(sources))
    }

    /// Add a document
    pub fn insert(&self, document: Document) {
        self.documents.write().push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBackend for InMemoryBackend {
    fn execute(&self, request: &BackendRequest) -> Result<BackendResponse> {
        let documents = self.documents.read();
        let evaluator = Evaluator::new(&documents);

        let matches = evaluator.eval(&request.predicate);
        let total_count = matches.len();
        debug!(
            predicate = request.predicate.query_type(),
            matched = total_count,
            "evaluated predicate"
        );

        let ordered = evaluator.sort(&matches, &request.sort);
        let hits = ordered
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .map(|docno| documents[docno as usize].clone())
            .collect();

        let aggregations = request
            .aggregations
            .iter()
            .map(|agg| (agg.name.clone(), evaluator.aggregate(agg, &matches)))
            .collect();

        Ok(BackendResponse {
            hits,
            total_count,
            aggregations,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Predicate evaluation over one consistent view of the documents
struct Evaluator<'a> {
    documents: &'a [Document],
    all: RoaringBitmap,
}

impl<'a> Evaluator<'a> {
    fn new(documents: &'a [Document]) -> Self {
        let all = (0..documents.len() as u32).collect();
        Self { documents, all }
    }

    fn eval(&self, predicate: &Predicate) -> RoaringBitmap {
        match predicate {
            Predicate::MatchAll => self.all.clone(),
            Predicate::Bool(query) => self.eval_bool(query),
            Predicate::Term { path, value } => {
                self.matching(path, |v| compare(v, value) == Some(Ordering::Equal))
            }
            Predicate::Terms { path, values } => self.matching(path, |v| {
                values.iter().any(|l| compare(v, l) == Some(Ordering::Equal))
            }),
            Predicate::Prefix { path, prefix } => self.matching(path, |v| {
                text_of(v).is_some_and(|s| s.to_lowercase().starts_with(prefix.as_str()))
            }),
            Predicate::Contains { path, substring } => self.matching(path, |v| {
                text_of(v).is_some_and(|s| s.to_lowercase().contains(substring.as_str()))
            }),
            Predicate::Range { path, bounds } => {
                self.matching(path, |v| bounds.contains_by(|bound| compare(v, bound)))
            }
            Predicate::FullText { fields, query } => {
                let wanted: HashSet<String> = tokens(query).collect();
                let mut result = RoaringBitmap::new();
                if wanted.is_empty() {
                    return result;
                }
                for field in fields {
                    result |= self.matching(field, |v| {
                        text_of(v).is_some_and(|s| tokens(&s).any(|t| wanted.contains(&t)))
                    });
                }
                result
            }
        }
    }

    fn eval_bool(&self, query: &BoolPredicate) -> RoaringBitmap {
        let mut result = self.all.clone();

        for clause in &query.must {
            result &= self.eval(clause);
        }

        if !query.should.is_empty() && query.minimum_should_match > 0 {
            let should: Vec<RoaringBitmap> = query.should.iter().map(|c| self.eval(c)).collect();
            let matched = if query.minimum_should_match == 1 {
                should.into_iter().fold(RoaringBitmap::new(), |acc, b| acc | b)
            } else {
                let mut counts: HashMap<u32, usize> = HashMap::new();
                for bitmap in &should {
                    for docno in bitmap {
                        *counts.entry(docno).or_insert(0) += 1;
                    }
                }
                counts
                    .into_iter()
                    .filter(|&(_, n)| n >= query.minimum_should_match)
                    .map(|(docno, _)| docno)
                    .collect()
            };
            result &= matched;
        }

        for clause in &query.must_not {
            result -= self.eval(clause);
        }

        result
    }

    fn matching<F>(&self, path: &str, accept: F) -> RoaringBitmap
    where
        F: Fn(&Value) -> bool,
    {
        self.documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| field_values(&doc.source, path).into_iter().any(&accept))
            .map(|(docno, _)| docno as u32)
            .collect()
    }

    /// Order matches by the sort clauses; documents missing a sort value go last
    fn sort(&self, matches: &RoaringBitmap, sort: &[SortClause]) -> Vec<u32> {
        let mut ordered: Vec<u32> = matches.iter().collect();
        if sort.is_empty() {
            return ordered;
        }

        ordered.sort_by(|&a, &b| {
            for clause in sort {
                let ka = self.sort_value(a, clause);
                let kb = self.sort_value(b, clause);
                let ordering = match (ka, kb) {
                    (Some(x), Some(y)) => match clause.direction {
                        SortDirection::Asc => compare_values(x, y),
                        SortDirection::Desc => compare_values(y, x),
                    },
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        ordered
    }

    /// Smallest value for ascending sorts, largest for descending
    fn sort_value(&self, docno: u32, clause: &SortClause) -> Option<&'a Value> {
        let documents: &'a [Document] = self.documents;
        let values = field_values(&documents[docno as usize].source, &clause.path)
            .into_iter()
            .filter(|v| !v.is_object());
        match clause.direction {
            SortDirection::Asc => values.min_by(|x, y| compare_values(x, y)),
            SortDirection::Desc => values.max_by(|x, y| compare_values(x, y)),
        }
    }

    /// Terms aggregation: each distinct value counts once per document
    fn aggregate(&self, request: &AggregationRequest, matches: &RoaringBitmap) -> AggregationResult {
        let mut counts: HashMap<String, (Literal, u64)> = HashMap::new();

        for docno in matches {
            let mut seen = HashSet::new();
            for value in field_values(&self.documents[docno as usize].source, &request.path) {
                let Ok(literal) = Literal::try_from(value.clone()) else {
                    continue;
                };
                let key = literal.to_plain_string();
                if seen.insert(key.clone()) {
                    counts.entry(key).or_insert((literal, 0)).1 += 1;
                }
            }
        }

        let mut buckets: Vec<(String, Literal, u64)> = counts
            .into_iter()
            .map(|(key, (literal, count))| (key, literal, count))
            .collect();
        buckets.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        let cap = request.max_buckets.min(buckets.len());
        let other_doc_count: u64 = buckets[cap..].iter().map(|b| b.2).sum();
        buckets.truncate(cap);

        AggregationResult {
            buckets: buckets
                .into_iter()
                .map(|(_, key, doc_count)| Bucket { key, doc_count })
                .collect(),
            other_doc_count,
        }
    }
}

/// All non-null values at `path`, with arrays flattened
fn values_at<'v>(source: &'v Value, path: &str) -> Vec<&'v Value> {
    let mut current = vec![source];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            if let Some(child) = value.as_object().and_then(|map| map.get(segment)) {
                flatten_into(child, &mut next);
            }
        }
        current = next;
    }
    current
}

fn flatten_into<'v>(value: &'v Value, out: &mut Vec<&'v Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        Value::Null => {}
        other => out.push(other),
    }
}

/// Values at `path`, applying the `_text` fallback
fn field_values<'v>(source: &'v Value, path: &str) -> Vec<&'v Value> {
    let values = values_at(source, path);
    if !values.is_empty() {
        return values;
    }
    match path.strip_suffix(TEXT_SUFFIX) {
        Some(stem) => {
            let keyword = values_at(source, &format!("{stem}{KEYWORD_SUFFIX}"));
            if keyword.is_empty() {
                values_at(source, stem)
            } else {
                keyword
            }
        }
        None => values,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn value_as_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Ordering of a stored value relative to a literal, if comparable
fn compare(value: &Value, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (_, Literal::Date(date)) => value_as_date(value).map(|d| d.cmp(date)),
        (Value::Number(n), lit) => n.as_f64()?.partial_cmp(&lit.as_f64()?),
        (Value::Bool(b), Literal::Bool(l)) => Some(b.cmp(l)),
        (Value::Bool(b), Literal::String(s)) => s.parse::<bool>().ok().map(|l| b.cmp(&l)),
        (Value::String(s), Literal::String(l)) => Some(s.as_str().cmp(l.as_str())),
        (Value::String(s), Literal::Bool(l)) => s.parse::<bool>().ok().map(|b| b.cmp(l)),
        (Value::String(s), lit) => s.trim().parse::<f64>().ok()?.partial_cmp(&lit.as_f64()?),
        _ => None,
    }
}

/// Total order over stored scalar values, used for sorting
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            _ => 3,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::RangeBounds;
    use serde_json::json;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::from_sources(vec![
            json!({ "id": 1, "name_keyword": "Greg", "age": 34,
                    "addresses": [ { "country_keyword": "USA" }, { "country_keyword": "Canada" } ] }),
            json!({ "id": 2, "name_keyword": "Anna", "age": 28,
                    "addresses": [ { "country_keyword": "France" } ] }),
            json!({ "id": 3, "name_keyword": "greta", "age": 51,
                    "addresses": [ { "country_keyword": "USA" } ] }),
            json!({ "id": 4, "name_keyword": "Bob" }),
        ])
    }

    fn ids(response: &BackendResponse) -> Vec<u64> {
        response.hits.iter().map(|d| d.id).collect()
    }

    fn run(predicate: Predicate) -> BackendResponse {
        backend().execute(&BackendRequest::new(predicate)).unwrap()
    }

    #[test]
    fn test_match_all() {
        let response = run(Predicate::MatchAll);
        assert_eq!(response.total_count, 4);
        assert_eq!(ids(&response), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_term_on_array_path() {
        let response = run(Predicate::term("addresses.country_keyword", Literal::from("USA")));
        assert_eq!(ids(&response), vec![1, 3]);

        let response = run(Predicate::term("addresses.country_keyword", Literal::from("Canada")));
        assert_eq!(ids(&response), vec![1]);
    }

    #[test]
    fn test_terms() {
        let response = run(Predicate::terms(
            "addresses.country_keyword",
            vec![Literal::from("France"), Literal::from("Canada")],
        ));
        assert_eq!(ids(&response), vec![1, 2]);
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        let response = run(Predicate::prefix("name_keyword", "GRE"));
        assert_eq!(ids(&response), vec![1, 3]);
    }

    #[test]
    fn test_contains_falls_back_to_keyword() {
        let response = run(Predicate::contains("name_text", "ET"));
        assert_eq!(ids(&response), vec![3]);
    }

    #[test]
    fn test_numeric_range() {
        let response = run(Predicate::range(
            "age",
            RangeBounds {
                gte: Some(Literal::Int(30)),
                lt: Some(Literal::Float(51.0)),
                ..Default::default()
            },
        ));
        assert_eq!(ids(&response), vec![1]);
    }

    #[test]
    fn test_bool_combination() {
        let predicate = BoolPredicate::new()
            .should(Predicate::term("addresses.country_keyword", Literal::from("USA")))
            .should(Predicate::term("addresses.country_keyword", Literal::from("France")))
            .with_minimum_should_match(1)
            .must_not(Predicate::prefix("name_keyword", "greg"))
            .build();
        assert_eq!(ids(&run(predicate)), vec![2, 3]);
    }

    #[test]
    fn test_minimum_should_match_two() {
        let predicate = BoolPredicate::new()
            .should(Predicate::term("addresses.country_keyword", Literal::from("USA")))
            .should(Predicate::term("addresses.country_keyword", Literal::from("Canada")))
            .should(Predicate::term("name_keyword", Literal::from("greta")))
            .with_minimum_should_match(2)
            .build();
        assert_eq!(ids(&run(predicate)), vec![1, 3]);
    }

    #[test]
    fn test_empty_bool_matches_all() {
        assert_eq!(run(BoolPredicate::new().build()).total_count, 4);
    }

    #[test]
    fn test_full_text() {
        let predicate = Predicate::FullText {
            fields: vec!["name_text".to_string(), "addresses.country_text".to_string()],
            query: "anna canada".to_string(),
        };
        assert_eq!(ids(&run(predicate)), vec![1, 2]);
    }

    #[test]
    fn test_sort_and_paging() {
        let request = BackendRequest::new(Predicate::MatchAll)
            .with_sort(vec![SortClause {
                path: "age".to_string(),
                direction: SortDirection::Desc,
            }])
            .with_page(0, 2);
        let response = backend().execute(&request).unwrap();
        assert_eq!(response.total_count, 4);
        assert_eq!(ids(&response), vec![3, 1]);

        // Missing values sort last
        let response = backend().execute(&request.clone().with_page(1, 2)).unwrap();
        assert_eq!(ids(&response), vec![2, 4]);

        let response = backend().execute(&request.with_page(5, 2)).unwrap();
        assert!(response.hits.is_empty());
    }

    #[test]
    fn test_terms_aggregation() {
        let request = BackendRequest::new(Predicate::MatchAll).with_aggregations(vec![AggregationRequest {
            name: "country".to_string(),
            key: "country".to_string(),
            path: "addresses.country_keyword".to_string(),
            data_type: None,
            max_buckets: 2,
        }]);
        let response = backend().execute(&request).unwrap();
        let result = &response.aggregations["country"];

        assert_eq!(result.buckets.len(), 2);
        assert_eq!(result.buckets[0].key, Literal::from("USA"));
        assert_eq!(result.buckets[0].doc_count, 2);
        // Canada and France tie at 1; Canada sorts first
        assert_eq!(result.buckets[1].key, Literal::from("Canada"));
        assert_eq!(result.other_doc_count, 1);
    }

    #[test]
    fn test_aggregation_counts_value_once_per_document() {
        let backend = InMemoryBackend::from_sources(vec![json!({ "tags": ["a", "a", "b"] })]);
        let request = BackendRequest::new(Predicate::MatchAll).with_aggregations(vec![AggregationRequest {
            name: "tags".to_string(),
            key: "tags".to_string(),
            path: "tags".to_string(),
            data_type: None,
            max_buckets: 10,
        }]);
        let response = backend.execute(&request).unwrap();
        let buckets = &response.aggregations["tags"].buckets;
        assert_eq!(buckets.len(), 2);
        assert!(buckets.iter().all(|b| b.doc_count == 1));
    }

    #[test]
    fn test_date_comparison() {
        let backend = InMemoryBackend::from_sources(vec![
            json!({ "released": "2023-06-01" }),
            json!({ "released": "2024-02-10T12:00:00Z" }),
        ]);
        let since = Literal::from("2024-01-01").coerce(crate::schema::DataType::Date, "released").unwrap();
        let predicate = Predicate::range(
            "released",
            RangeBounds {
                gte: Some(since),
                ..Default::default()
            },
        );
        let response = backend.execute(&BackendRequest::new(predicate)).unwrap();
        assert_eq!(ids(&response), vec![1]);
    }

    #[test]
    fn test_insert_and_load() {
        let backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        backend.insert(Document::new(7, json!({ "x": 1 })));
        assert_eq!(backend.len(), 1);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"[ { "a": 1 }, { "id": 9, "a": 2 } ]"#).unwrap();
        let loaded = InMemoryBackend::load(file.path()).unwrap();
        let response = loaded.execute(&BackendRequest::new(Predicate::MatchAll)).unwrap();
        assert_eq!(ids(&response), vec![0, 9]);
    }
}
