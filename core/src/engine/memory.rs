//! An in-process engine that understands the documents this crate compiles.
//!
//! It supports `match_all`, `term`, `bool` (`must`, `filter`, `should`,
//! `must_not`) and `more_like_this` queries together with `from`, `size`,
//! `sort`, `explain` and `highlight`. Scores are a plain tf-idf sum; they are
//! stable and good enough to order small corpora, nothing more.
//!
//! Indexed documents only become searchable after [`IndexAdmin::refresh`].

use super::bulk::BulkItem;
use super::{document_id, EngineResponse, HitsEnvelope, IndexAdmin, SearchEngine, SearchTarget, Total};
use crate::document::CompiledDocument;
use crate::error::TransportError;
use crate::results::RawHit;
use crate::tokenizer::{analyze_value, term_of};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

const DEFAULT_SIZE: usize = 10;
const DEFAULT_MIN_TERM_FREQ: u64 = 2;
const DEFAULT_MIN_DOC_FREQ: u64 = 5;
const DEFAULT_MAX_QUERY_TERMS: usize = 25;

#[derive(Debug, Clone)]
struct StoredDoc {
    index: String,
    doctype: String,
    id: String,
    source: Map<String, Value>,
    terms: HashMap<String, Vec<String>>,
}

impl StoredDoc {
    fn new(index: &str, doctype: &str, id: String, source: Map<String, Value>) -> Self {
        let terms = source.iter().map(|(field, value)| (field.clone(), analyze_value(value))).collect();
        Self { index: index.to_string(), doctype: doctype.to_string(), id, source, terms }
    }

    fn has_term(&self, field: &str, term: &str) -> bool {
        self.terms.get(field).is_some_and(|terms| terms.iter().any(|t| t == term))
    }
}

#[derive(Debug, Default)]
struct MemoryIndex {
    live: BTreeMap<String, StoredDoc>,
    pending: Vec<StoredDoc>,
}

#[derive(Debug, Default)]
pub struct MemoryEngine {
    indexes: RwLock<BTreeMap<String, MemoryIndex>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indexes.read().keys().cloned().collect()
    }

    /// Searchable documents in `index`.
    pub fn doc_count(&self, index: &str) -> Option<usize> {
        self.indexes.read().get(index).map(|idx| idx.live.len())
    }

    /// Stages decoded bulk items. Unknown indexes are created on the fly.
    pub fn apply_bulk(&self, items: Vec<BulkItem>) -> usize {
        let mut indexes = self.indexes.write();
        let mut staged = 0;
        for item in items {
            let Value::Object(source) = item.source else { continue };
            let doc = StoredDoc::new(&item.index, &item.doctype, item.id, source);
            indexes.entry(item.index).or_default().pending.push(doc);
            staged += 1;
        }
        staged
    }
}

impl IndexAdmin for MemoryEngine {
    fn create_index(&self, index: &str) -> Result<(), TransportError> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(index) {
            return Err(TransportError::Rejected(format!("index already exists: {index}")));
        }
        indexes.insert(index.to_string(), MemoryIndex::default());
        tracing::info!(index, "created index");
        Ok(())
    }

    fn index_documents(&self, index: &str, doctype: &str, docs: &[Value]) -> Result<usize, TransportError> {
        let mut staged = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = document_id(doc)
                .ok_or_else(|| TransportError::Rejected(format!("document has no usable id: {doc}")))?;
            let source = doc
                .as_object()
                .cloned()
                .ok_or_else(|| TransportError::Rejected(format!("document is not an object: {doc}")))?;
            staged.push(StoredDoc::new(index, doctype, id, source));
        }
        let count = staged.len();
        self.indexes.write().entry(index.to_string()).or_default().pending.extend(staged);
        tracing::info!(index, doctype, count, "staged documents");
        Ok(count)
    }

    fn refresh(&self, index: &str) -> Result<(), TransportError> {
        let mut indexes = self.indexes.write();
        let idx = indexes.get_mut(index).ok_or_else(|| TransportError::IndexNotFound(index.to_string()))?;
        let pending = std::mem::take(&mut idx.pending);
        for doc in pending {
            idx.live.insert(doc.id.clone(), doc);
        }
        tracing::info!(index, docs = idx.live.len(), "refreshed index");
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<(), TransportError> {
        if self.indexes.write().remove(index).is_none() {
            return Err(TransportError::IndexNotFound(index.to_string()));
        }
        tracing::info!(index, "deleted index");
        Ok(())
    }
}

impl SearchEngine for MemoryEngine {
    fn search(&self, target: &SearchTarget, document: &CompiledDocument) -> Result<EngineResponse, TransportError> {
        let started = Instant::now();
        let indexes = self.indexes.read();
        if let Some(missing) = target.indexes.iter().find(|name| !indexes.contains_key(name.as_str())) {
            return Err(TransportError::IndexNotFound(missing.clone()));
        }
        let corpus: Vec<&StoredDoc> = indexes
            .iter()
            .filter(|(name, _)| target.includes_index(name))
            .flat_map(|(_, idx)| idx.live.values())
            .filter(|doc| target.includes_doctype(&doc.doctype))
            .collect();

        let request = Request::parse(document, &corpus)?;
        let mut matched: Vec<(&StoredDoc, Explained)> = corpus
            .iter()
            .filter_map(|doc| request.query.score(doc).map(|explained| (*doc, explained)))
            .collect();
        matched.sort_by(|a, b| request.compare(a, b));

        let total = matched.len() as u64;
        let max_score = matched.iter().map(|(_, e)| e.score).reduce(f64::max);
        let mut highlight_terms = HashMap::new();
        request.query.collect_terms(&mut highlight_terms);

        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(doc, explained)| RawHit {
                id: doc.id.clone(),
                index: Some(doc.index.clone()),
                doctype: Some(doc.doctype.clone()),
                score: Some(explained.score),
                source: doc.source.clone(),
                explanation: request.explain.then(|| explained.to_value()),
                highlight: highlight(doc, &request.highlight, &highlight_terms),
            })
            .collect::<Vec<_>>();

        tracing::debug!(total, returned = hits.len(), "memory search");
        Ok(EngineResponse {
            took: started.elapsed().as_millis() as u64,
            timed_out: false,
            hits: HitsEnvelope { total: Total::Detailed { value: total, relation: "eq".into() }, max_score, hits },
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Explained {
    score: f64,
    details: Vec<(f64, String)>,
}

impl Explained {
    fn single(score: f64, description: String) -> Self {
        Self { score, details: vec![(score, description)] }
    }

    fn add(&mut self, score: f64, description: String) {
        self.score += score;
        self.details.push((score, description));
    }

    fn absorb(&mut self, other: Explained) {
        self.score += other.score;
        self.details.extend(other.details);
    }

    fn to_value(&self) -> Value {
        let details: Vec<Value> = self
            .details
            .iter()
            .map(|(value, description)| json!({ "value": value, "description": description }))
            .collect();
        json!({ "value": self.score, "description": "sum of:", "details": details })
    }
}

fn idf(doc_freq: usize, num_docs: usize) -> f64 {
    1.0 + ((num_docs as f64 + 1.0) / (doc_freq as f64 + 1.0)).ln()
}

fn doc_freq(corpus: &[&StoredDoc], field: &str, term: &str) -> usize {
    corpus.iter().filter(|doc| doc.has_term(field, term)).count()
}

#[derive(Debug)]
enum Matcher {
    All,
    Term { field: String, term: String, idf: f64 },
    Bool { must: Vec<Matcher>, filter: Vec<Matcher>, should: Vec<Matcher>, must_not: Vec<Matcher> },
    Similar { terms: Vec<(String, String, f64)>, exclude: HashSet<String> },
}

impl Matcher {
    fn parse(clause: &Value, corpus: &[&StoredDoc]) -> Result<Self, TransportError> {
        let (kind, body) = clause
            .as_object()
            .filter(|obj| obj.len() == 1)
            .and_then(|obj| obj.iter().next())
            .ok_or_else(|| TransportError::Rejected(format!("malformed query clause: {clause}")))?;
        match kind.as_str() {
            "match_all" => Ok(Matcher::All),
            "term" => Self::parse_term(body, corpus),
            "bool" => {
                let list = |key: &str| -> Result<Vec<Matcher>, TransportError> {
                    match body.get(key) {
                        None => Ok(Vec::new()),
                        Some(Value::Array(items)) => items.iter().map(|c| Matcher::parse(c, corpus)).collect(),
                        Some(single) => Ok(vec![Matcher::parse(single, corpus)?]),
                    }
                };
                Ok(Matcher::Bool {
                    must: list("must")?,
                    filter: list("filter")?,
                    should: list("should")?,
                    must_not: list("must_not")?,
                })
            }
            "more_like_this" => Similarity::parse(body)?.resolve(corpus),
            other => Err(TransportError::Rejected(format!("unsupported query clause: {other}"))),
        }
    }

    fn parse_term(body: &Value, corpus: &[&StoredDoc]) -> Result<Self, TransportError> {
        let (field, value) = body
            .as_object()
            .filter(|obj| obj.len() == 1)
            .and_then(|obj| obj.iter().next())
            .ok_or_else(|| TransportError::Rejected(format!("term clause needs exactly one field: {body}")))?;
        let value = value.get("value").unwrap_or(value);
        let term = term_of(value).ok_or_else(|| TransportError::Rejected(format!("unsupported term value: {value}")))?;
        let idf = idf(doc_freq(corpus, field, &term), corpus.len());
        Ok(Matcher::Term { field: field.clone(), term, idf })
    }

    fn score(&self, doc: &StoredDoc) -> Option<Explained> {
        match self {
            Matcher::All => Some(Explained::single(1.0, "match_all".into())),
            Matcher::Term { field, term, idf } => {
                doc.has_term(field, term).then(|| Explained::single(*idf, format!("term({field}:{term})")))
            }
            Matcher::Bool { must, filter, should, must_not } => {
                let mut out = Explained::default();
                for clause in must {
                    out.absorb(clause.score(doc)?);
                }
                for clause in filter {
                    clause.score(doc)?;
                }
                if must_not.iter().any(|clause| clause.score(doc).is_some()) {
                    return None;
                }
                let mut any_should = false;
                for clause in should {
                    if let Some(explained) = clause.score(doc) {
                        any_should = true;
                        out.absorb(explained);
                    }
                }
                if !should.is_empty() && must.is_empty() && filter.is_empty() && !any_should {
                    return None;
                }
                Some(out)
            }
            Matcher::Similar { terms, exclude } => {
                if exclude.contains(&doc.id) {
                    return None;
                }
                let mut out = Explained::default();
                for (field, term, weight) in terms {
                    if doc.has_term(field, term) {
                        out.add(*weight, format!("like({field}:{term})"));
                    }
                }
                (!out.details.is_empty()).then_some(out)
            }
        }
    }

    /// Scoring terms per field; filters and exclusions are left out.
    fn collect_terms(&self, out: &mut HashMap<String, HashSet<String>>) {
        match self {
            Matcher::All => {}
            Matcher::Term { field, term, .. } => {
                out.entry(field.clone()).or_default().insert(term.clone());
            }
            Matcher::Bool { must, should, .. } => {
                for clause in must.iter().chain(should) {
                    clause.collect_terms(out);
                }
            }
            Matcher::Similar { terms, .. } => {
                for (field, term, _) in terms {
                    out.entry(field.clone()).or_default().insert(term.clone());
                }
            }
        }
    }
}

/// Parameters of a `more_like_this` clause.
#[derive(Debug)]
struct Similarity {
    fields: Vec<String>,
    like: Vec<String>,
    min_term_freq: u64,
    min_doc_freq: u64,
    max_doc_freq: Option<u64>,
    max_query_terms: usize,
    min_word_length: usize,
    max_word_length: Option<usize>,
    stop_words: HashSet<String>,
    boost_terms: Option<f64>,
}

impl Similarity {
    fn parse(body: &Value) -> Result<Self, TransportError> {
        let strings = |key: &str| -> Vec<String> {
            body.get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default()
        };
        let number = |key: &str| body.get(key).and_then(Value::as_u64);

        let mut like = Vec::new();
        match body.get("like") {
            Some(Value::Array(items)) => {
                for item in items {
                    like.push(Self::like_id(item)?);
                }
            }
            Some(item) => like.push(Self::like_id(item)?),
            None => {}
        }
        like.extend(strings("ids"));
        if like.is_empty() {
            return Err(TransportError::Rejected("more_like_this needs at least one liked document".into()));
        }

        Ok(Self {
            fields: strings("fields"),
            like,
            min_term_freq: number("min_term_freq").unwrap_or(DEFAULT_MIN_TERM_FREQ),
            min_doc_freq: number("min_doc_freq").unwrap_or(DEFAULT_MIN_DOC_FREQ),
            max_doc_freq: number("max_doc_freq"),
            max_query_terms: number("max_query_terms").map_or(DEFAULT_MAX_QUERY_TERMS, |n| n as usize),
            min_word_length: number("min_word_length").map_or(0, |n| n as usize),
            max_word_length: number("max_word_length").filter(|n| *n > 0).map(|n| n as usize),
            stop_words: strings("stop_words").into_iter().map(|w| w.to_lowercase()).collect(),
            boost_terms: body.get("boost_terms").and_then(Value::as_f64).filter(|b| *b > 0.0),
        })
    }

    fn like_id(item: &Value) -> Result<String, TransportError> {
        match item.get("_id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(TransportError::Rejected(format!("unsupported more_like_this `like` entry: {item}"))),
        }
    }

    fn admits_word(&self, term: &str) -> bool {
        let len = term.chars().count();
        len >= self.min_word_length
            && self.max_word_length.map_or(true, |max| len <= max)
            && !self.stop_words.contains(term)
    }

    /// Picks the interesting terms of the liked documents against `corpus`.
    fn resolve(self, corpus: &[&StoredDoc]) -> Result<Matcher, TransportError> {
        let exclude: HashSet<String> = self.like.iter().cloned().collect();
        let liked: Vec<&StoredDoc> = corpus.iter().copied().filter(|doc| exclude.contains(&doc.id)).collect();

        let fields: Vec<String> = if self.fields.is_empty() {
            let mut all: Vec<String> = liked.iter().flat_map(|doc| doc.terms.keys().cloned()).collect();
            all.sort();
            all.dedup();
            all
        } else {
            self.fields.clone()
        };

        let mut candidates: Vec<(String, String, f64)> = Vec::new();
        for field in &fields {
            let mut term_freq: BTreeMap<&str, u64> = BTreeMap::new();
            for doc in &liked {
                for term in doc.terms.get(field).into_iter().flatten() {
                    *term_freq.entry(term.as_str()).or_insert(0) += 1;
                }
            }
            for (term, tf) in term_freq {
                if tf < self.min_term_freq || !self.admits_word(term) {
                    continue;
                }
                let df = doc_freq(corpus, field, term);
                if (df as u64) < self.min_doc_freq || self.max_doc_freq.is_some_and(|max| df as u64 > max) {
                    continue;
                }
                let weight = tf as f64 * idf(df, corpus.len()) * self.boost_terms.unwrap_or(1.0);
                candidates.push((field.clone(), term.to_string(), weight));
            }
        }
        candidates.sort_by(|a, b| {
            b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal).then_with(|| (&a.0, &a.1).cmp(&(&b.0, &b.1)))
        });
        candidates.truncate(self.max_query_terms);
        tracing::debug!(liked = liked.len(), terms = candidates.len(), "resolved more_like_this terms");
        Ok(Matcher::Similar { terms: candidates, exclude })
    }
}

#[derive(Debug)]
struct SortSpec {
    field: String,
    descending: bool,
}

#[derive(Debug)]
struct Request {
    query: Matcher,
    from: usize,
    size: usize,
    sort: Vec<SortSpec>,
    explain: bool,
    highlight: Vec<String>,
}

impl Request {
    fn parse(document: &CompiledDocument, corpus: &[&StoredDoc]) -> Result<Self, TransportError> {
        let query = match document.query() {
            Some(clause) => Matcher::parse(clause, corpus)?,
            None => Matcher::All,
        };
        let from = document.get("from").and_then(Value::as_u64).map_or(0, |n| n as usize);
        let size = document.get("size").and_then(Value::as_u64).map_or(DEFAULT_SIZE, |n| n as usize);
        let sort = match document.get("sort") {
            Some(Value::Array(keys)) => keys.iter().map(parse_sort_key).collect::<Result<_, _>>()?,
            Some(key) => vec![parse_sort_key(key)?],
            None => Vec::new(),
        };
        let explain = document.get("explain").and_then(Value::as_bool).unwrap_or(false);
        let highlight = document
            .get("highlight")
            .and_then(|h| h.get("fields"))
            .and_then(Value::as_object)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default();
        Ok(Self { query, from, size, sort, explain, highlight })
    }

    fn compare(&self, a: &(&StoredDoc, Explained), b: &(&StoredDoc, Explained)) -> Ordering {
        for key in &self.sort {
            let ordering = if key.field == "_score" {
                let ordering = a.1.score.partial_cmp(&b.1.score).unwrap_or(Ordering::Equal);
                if key.descending { ordering.reverse() } else { ordering }
            } else {
                compare_field(a.0.source.get(&key.field), b.0.source.get(&key.field), key.descending)
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        if self.sort.is_empty() {
            let by_score = b.1.score.partial_cmp(&a.1.score).unwrap_or(Ordering::Equal);
            if by_score != Ordering::Equal {
                return by_score;
            }
        }
        compare_ids(&a.0.id, &b.0.id)
    }
}

fn parse_sort_key(key: &Value) -> Result<SortSpec, TransportError> {
    let default_desc = |field: &str| field == "_score";
    if let Value::String(field) = key {
        return Ok(SortSpec { field: field.clone(), descending: default_desc(field) });
    }
    let (field, order) = key
        .as_object()
        .filter(|obj| obj.len() == 1)
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| TransportError::Rejected(format!("malformed sort key: {key}")))?;
    let descending = match order.get("order").unwrap_or(order).as_str() {
        Some("desc") => true,
        Some("asc") => false,
        _ => default_desc(field),
    };
    Ok(SortSpec { field: field.clone(), descending })
}

/// Missing values sort last in either direction.
fn compare_field(a: Option<&Value>, b: Option<&Value>, descending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let ordering = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    };
    if descending { ordering.reverse() } else { ordering }
}

/// Numeric ids compare numerically so "10" lands after "9".
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn highlight(
    doc: &StoredDoc,
    fields: &[String],
    terms: &HashMap<String, HashSet<String>>,
) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for field in fields {
        let Some(wanted) = terms.get(field).filter(|t| !t.is_empty()) else { continue };
        let mut sorted: Vec<&String> = wanted.iter().collect();
        sorted.sort();
        let alternation = sorted.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
        let Ok(pattern) = regex::RegexBuilder::new(&format!(r"\b(?:{alternation})\b")).case_insensitive(true).build()
        else {
            continue;
        };
        let texts: Vec<&str> = match doc.source.get(field) {
            Some(Value::String(text)) => vec![text.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        let fragments: Vec<String> = texts
            .into_iter()
            .filter(|text| pattern.is_match(text))
            .map(|text| pattern.replace_all(text, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string())
            .collect();
        if !fragments.is_empty() {
            out.insert(field.clone(), fragments);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Clause, QuerySpec, SortKey};

    fn engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.create_index("test").unwrap();
        engine
            .index_documents(
                "test",
                "item",
                &[
                    json!({"id": 1, "foo": "bar", "tag": "awesome", "width": "2"}),
                    json!({"id": 2, "foo": "bart", "tag": "boring", "width": "7"}),
                    json!({"id": 3, "foo": "car", "tag": "awesome", "width": "5"}),
                    json!({"id": 4, "foo": "duck", "tag": "boat", "width": "11"}),
                    json!({"id": 5, "foo": "train car", "tag": "awesome", "width": "7"}),
                ],
            )
            .unwrap();
        engine.refresh("test").unwrap();
        engine
    }

    fn ids(response: &EngineResponse) -> Vec<&str> {
        response.hits.hits.iter().map(|h| h.id.as_str()).collect()
    }

    fn run(engine: &MemoryEngine, spec: QuerySpec) -> EngineResponse {
        engine.search(&SearchTarget::default(), &spec.compile()).unwrap()
    }

    #[test]
    fn documents_need_a_refresh() {
        let engine = MemoryEngine::new();
        engine.index_documents("fresh", "t", &[json!({"id": 1})]).unwrap();
        assert_eq!(engine.doc_count("fresh"), Some(0));
        engine.refresh("fresh").unwrap();
        assert_eq!(engine.doc_count("fresh"), Some(1));
    }

    #[test]
    fn index_names_track_creation_and_deletion() {
        let engine = engine();
        engine.index_documents("archive", "t", &[json!({"id": 1})]).unwrap();
        assert_eq!(engine.index_names(), vec!["archive".to_string(), "test".to_string()]);
        engine.delete_index("test").unwrap();
        assert_eq!(engine.index_names(), vec!["archive".to_string()]);
    }

    #[test]
    fn term_queries_match_analyzed_tokens() {
        let engine = engine();
        let response = run(&engine, QuerySpec::new().with_queries([Clause::new("foo", "car")]));
        assert_eq!(ids(&response), vec!["3", "5"]);
        let response = run(&engine, QuerySpec::new().with_queries([Clause::new("id", 4)]));
        assert_eq!(ids(&response), vec!["4"]);
    }

    #[test]
    fn filters_narrow_without_scoring() {
        let engine = engine();
        let response = run(&engine, QuerySpec::new().with_filters([Clause::new("tag", "awesome")]));
        assert_eq!(ids(&response), vec!["1", "3", "5"]);
        assert!(response.hits.hits.iter().all(|h| h.score == Some(0.0)));
    }

    #[test]
    fn sorts_and_pages() {
        let engine = engine();
        let spec = QuerySpec::new().with_sort(vec![SortKey::parse("-id")]).with_bounds(1, Some(3));
        let response = run(&engine, spec);
        assert_eq!(response.hits.total.value(), 5);
        assert_eq!(ids(&response), vec!["4", "3"]);
    }

    #[test]
    fn explains_and_highlights_on_request() {
        let engine = engine();
        let spec = QuerySpec::new()
            .with_queries([Clause::new("foo", "car")])
            .with_explain(true)
            .with_highlight(vec!["foo".into()]);
        let response = run(&engine, spec);
        let hit = &response.hits.hits[1];
        assert_eq!(hit.id, "5");
        assert_eq!(hit.highlight["foo"], vec!["train <em>car</em>".to_string()]);
        assert!(hit.explanation.as_ref().unwrap()["value"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn unknown_indexes_and_clauses_are_errors() {
        let engine = engine();
        let target = SearchTarget::new(vec!["missing".into()], vec![]);
        let err = engine.search(&target, &QuerySpec::new().compile()).unwrap_err();
        assert!(matches!(err, TransportError::IndexNotFound(_)));
        assert!(matches!(engine.delete_index("missing"), Err(TransportError::IndexNotFound(_))));

        let mut body = Map::new();
        body.insert("query".into(), json!({"fuzzy": {"foo": "bra"}}));
        let err = engine.search(&SearchTarget::default(), &CompiledDocument::from_map(body)).unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[test]
    fn doctype_targets_filter_documents() {
        let engine = engine();
        engine.index_documents("test", "other", &[json!({"id": 9, "foo": "car"})]).unwrap();
        engine.refresh("test").unwrap();
        let doc = QuerySpec::new().with_queries([Clause::new("foo", "car")]).compile();
        let all = engine.search(&SearchTarget::default(), &doc).unwrap();
        assert_eq!(all.hits.total.value(), 3);
        let items = engine.search(&SearchTarget::new(vec![], vec!["item".into()]), &doc).unwrap();
        assert_eq!(items.hits.total.value(), 2);
    }

    #[test]
    fn compares_ids_numerically() {
        assert_eq!(compare_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_ids("a", "b"), Ordering::Less);
    }
}
