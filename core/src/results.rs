//! Result mapping: raw engine hits in, typed results out.

use crate::document::CompiledDocument;
use crate::engine::EngineResponse;
use crate::error::{Error, Result};
use crate::mapping::MappingType;
use crate::query::{FieldSelection, ResultShape};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A hit exactly as the engine returned it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
    #[serde(rename = "_explanation", default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlight: BTreeMap<String, Vec<String>>,
}

/// Engine metadata available on every result shape. Values the engine left
/// out read as `None` or empty.
pub trait HitMetadata {
    fn raw_hit(&self) -> &RawHit;

    fn id(&self) -> &str {
        &self.raw_hit().id
    }

    fn score(&self) -> Option<f64> {
        self.raw_hit().score
    }

    fn source(&self) -> &Map<String, Value> {
        &self.raw_hit().source
    }

    fn doctype(&self) -> Option<&str> {
        self.raw_hit().doctype.as_deref()
    }

    fn index(&self) -> Option<&str> {
        self.raw_hit().index.as_deref()
    }

    fn explanation(&self) -> Option<&Value> {
        self.raw_hit().explanation.as_ref()
    }

    fn highlight(&self) -> &BTreeMap<String, Vec<String>> {
        &self.raw_hit().highlight
    }
}

/// A hit mapped through a [`MappingType`].
///
/// Field reads come in two flavours: [`attr`](Self::attr) sees instance
/// attributes first and falls back to the source, [`get`](Self::get) only ever
/// reads the source. The two may disagree once an attribute is set.
pub struct MappedResult<M = Value> {
    hit: RawHit,
    mapping: Arc<MappingType<M>>,
    attributes: BTreeMap<String, Value>,
    object: OnceLock<M>,
}

impl<M> MappedResult<M> {
    pub fn new(hit: RawHit, mapping: Arc<MappingType<M>>) -> Self {
        let attributes = mapping.attributes().clone();
        Self { hit, mapping, attributes, object: OnceLock::new() }
    }

    pub fn mapping_type(&self) -> &MappingType<M> {
        &self.mapping
    }

    pub fn attr(&self, name: &str) -> Result<&Value> {
        self.attributes
            .get(name)
            .or_else(|| self.hit.source.get(name))
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Result<&Value> {
        self.hit.source.get(key).ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.hit.source.contains_key(key)
    }

    /// The backing domain object, fetched once through the mapping type's
    /// model lookup.
    pub fn object(&self) -> Result<&M> {
        let lookup = self
            .mapping
            .model()
            .ok_or_else(|| Error::NoModel { mapping: self.mapping.name().to_string() })?;
        if let Some(object) = self.object.get() {
            return Ok(object);
        }
        let mut found = lookup.lookup(std::slice::from_ref(&self.hit.id))?;
        let object = found.remove(&self.hit.id).ok_or_else(|| Error::ModelNotFound {
            mapping: self.mapping.name().to_string(),
            id: self.hit.id.clone(),
        })?;
        Ok(self.object.get_or_init(|| object))
    }

    pub fn into_hit(self) -> RawHit {
        self.hit
    }
}

impl<M> HitMetadata for MappedResult<M> {
    fn raw_hit(&self) -> &RawHit {
        &self.hit
    }
}

impl<M: Clone> Clone for MappedResult<M> {
    fn clone(&self) -> Self {
        Self {
            hit: self.hit.clone(),
            mapping: Arc::clone(&self.mapping),
            attributes: self.attributes.clone(),
            object: self.object.clone(),
        }
    }
}

impl<M> fmt::Debug for MappedResult<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedResult")
            .field("mapping", &self.mapping.name())
            .field("hit", &self.hit)
            .field("attributes", &self.attributes)
            .field("object_loaded", &self.object.get().is_some())
            .finish()
    }
}

/// A `values_dict` row.
#[derive(Debug, Clone, PartialEq)]
pub struct DictResult {
    fields: Map<String, Value>,
    hit: RawHit,
}

impl DictResult {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl HitMetadata for DictResult {
    fn raw_hit(&self) -> &RawHit {
        &self.hit
    }
}

/// A `values_list` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResult {
    values: Vec<Value>,
    hit: RawHit,
}

impl ListResult {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl HitMetadata for ListResult {
    fn raw_hit(&self) -> &RawHit {
        &self.hit
    }
}

pub enum SearchResult<M = Value> {
    Object(MappedResult<M>),
    Dict(DictResult),
    List(ListResult),
}

impl<M> SearchResult<M> {
    fn from_hit(hit: RawHit, shape: &ResultShape, mapping: &Arc<MappingType<M>>) -> Self {
        match shape {
            ResultShape::Objects => SearchResult::Object(MappedResult::new(hit, Arc::clone(mapping))),
            ResultShape::Dicts(selection) => {
                SearchResult::Dict(DictResult { fields: project_dict(&hit, selection), hit })
            }
            ResultShape::Lists(selection) => {
                SearchResult::List(ListResult { values: project_list(&hit, selection), hit })
            }
        }
    }

    pub fn as_object(&self) -> Option<&MappedResult<M>> {
        match self {
            SearchResult::Object(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&DictResult> {
        match self {
            SearchResult::Dict(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListResult> {
        match self {
            SearchResult::List(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<MappedResult<M>> {
        match self {
            SearchResult::Object(result) => Some(result),
            _ => None,
        }
    }
}

impl<M> HitMetadata for SearchResult<M> {
    fn raw_hit(&self) -> &RawHit {
        match self {
            SearchResult::Object(result) => result.raw_hit(),
            SearchResult::Dict(result) => result.raw_hit(),
            SearchResult::List(result) => result.raw_hit(),
        }
    }
}

impl<M: Clone> Clone for SearchResult<M> {
    fn clone(&self) -> Self {
        match self {
            SearchResult::Object(result) => SearchResult::Object(result.clone()),
            SearchResult::Dict(result) => SearchResult::Dict(result.clone()),
            SearchResult::List(result) => SearchResult::List(result.clone()),
        }
    }
}

impl<M> fmt::Debug for SearchResult<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchResult::Object(result) => f.debug_tuple("Object").field(result).finish(),
            SearchResult::Dict(result) => f.debug_tuple("Dict").field(result).finish(),
            SearchResult::List(result) => f.debug_tuple("List").field(result).finish(),
        }
    }
}

/// Identifier projection: the `id` source field, or the engine id when the
/// source has none.
fn project_value(hit: &RawHit, field: &str) -> Value {
    match hit.source.get(field) {
        Some(value) => value.clone(),
        None if field == "id" => Value::String(hit.id.clone()),
        None => Value::Null,
    }
}

fn project_dict(hit: &RawHit, selection: &FieldSelection) -> Map<String, Value> {
    match selection {
        FieldSelection::All => hit.source.clone(),
        FieldSelection::IdOnly => {
            let mut fields = Map::new();
            fields.insert("id".into(), project_value(hit, "id"));
            fields
        }
        FieldSelection::Named(names) => names
            .iter()
            .filter(|name| hit.source.contains_key(name.as_str()) || name.as_str() == "id")
            .map(|name| (name.clone(), project_value(hit, name)))
            .collect(),
    }
}

fn project_list(hit: &RawHit, selection: &FieldSelection) -> Vec<Value> {
    match selection {
        FieldSelection::All => hit.source.values().cloned().collect(),
        FieldSelection::IdOnly => vec![project_value(hit, "id")],
        FieldSelection::Named(names) => names.iter().map(|name| project_value(hit, name)).collect(),
    }
}

/// The materialized outcome of one engine round-trip.
pub struct SearchResults<M = Value> {
    results: Vec<SearchResult<M>>,
    mapping: Arc<MappingType<M>>,
    total: u64,
    max_score: Option<f64>,
    took_ms: u64,
    timed_out: bool,
    document: CompiledDocument,
}

impl<M> SearchResults<M> {
    pub(crate) fn from_response(
        response: EngineResponse,
        shape: &ResultShape,
        mapping: &Arc<MappingType<M>>,
        document: CompiledDocument,
    ) -> Self {
        let total = response.hits.total.value();
        let results = response
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchResult::from_hit(hit, shape, mapping))
            .collect();
        Self {
            results,
            mapping: Arc::clone(mapping),
            total,
            max_score: response.hits.max_score,
            took_ms: response.took,
            timed_out: response.timed_out,
            document,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Total matches reported by the engine, which may exceed [`len`](Self::len)
    /// when the query was paged.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn max_score(&self) -> Option<f64> {
        self.max_score
    }

    pub fn took_ms(&self) -> u64 {
        self.took_ms
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// The document that produced these results.
    pub fn document(&self) -> &CompiledDocument {
        &self.document
    }

    pub fn results(&self) -> &[SearchResult<M>] {
        &self.results
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult<M>> {
        self.results.iter()
    }

    pub fn first(&self) -> Option<&SearchResult<M>> {
        self.results.first()
    }

    pub fn to_vec(&self) -> Vec<SearchResult<M>>
    where
        M: Clone,
    {
        self.results.clone()
    }

    /// Resolves the backing objects of every mapped result with a single bulk
    /// lookup. Returns how many objects were loaded.
    pub fn load_objects(&self) -> Result<usize> {
        let lookup = self
            .mapping
            .model()
            .ok_or_else(|| Error::NoModel { mapping: self.mapping.name().to_string() })?;
        let pending: Vec<&MappedResult<M>> = self
            .results
            .iter()
            .filter_map(SearchResult::as_object)
            .filter(|result| result.object.get().is_none())
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }
        let ids: Vec<String> = pending.iter().map(|result| result.hit.id.clone()).collect();
        let mut found = lookup.lookup(&ids)?;
        let mut loaded = 0;
        for result in pending {
            if let Some(object) = found.remove(&result.hit.id) {
                if result.object.set(object).is_ok() {
                    loaded += 1;
                }
            }
        }
        tracing::debug!(mapping = self.mapping.name(), loaded, "loaded backing objects");
        Ok(loaded)
    }
}

impl<'a, M> IntoIterator for &'a SearchResults<M> {
    type Item = &'a SearchResult<M>;
    type IntoIter = std::slice::Iter<'a, SearchResult<M>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl<M> fmt::Debug for SearchResults<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResults")
            .field("total", &self.total)
            .field("took_ms", &self.took_ms)
            .field("results", &self.results)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HitsEnvelope, Total};
    use serde_json::json;
    use std::collections::HashMap;

    fn hit(id: &str, source: Value) -> RawHit {
        RawHit {
            id: id.to_string(),
            score: Some(1.0),
            source: source.as_object().cloned().unwrap_or_default(),
            ..RawHit::default()
        }
    }

    fn response(hits: Vec<RawHit>) -> EngineResponse {
        EngineResponse {
            took: 3,
            timed_out: false,
            hits: HitsEnvelope { total: Total::Count(hits.len() as u64), max_score: Some(1.0), hits },
        }
    }

    fn document() -> CompiledDocument {
        crate::query::QuerySpec::new().compile()
    }

    #[test]
    fn raw_hit_defaults_missing_metadata() {
        let hit: RawHit = serde_json::from_value(json!({"_id": "9"})).unwrap();
        assert_eq!(hit.id, "9");
        assert!(hit.score.is_none());
        assert!(hit.source.is_empty());
        assert!(hit.explanation.is_none());
        assert!(hit.highlight.is_empty());
    }

    #[test]
    fn attribute_path_and_key_path_diverge() {
        let mapping = Arc::new(
            MappingType::<Value>::builder("thing").attribute("_object", Value::Null).build().unwrap(),
        );
        let mut result = MappedResult::new(hit("1", json!({"id": 1, "_object": "foo"})), mapping);

        assert_eq!(result.attr("_object").unwrap(), &Value::Null);
        assert_eq!(result.get("_object").unwrap(), &json!("foo"));

        assert_eq!(result.attr("id").unwrap(), &json!(1));
        result.set_attr("id", "foo");
        assert_eq!(result.attr("id").unwrap(), &json!("foo"));
        assert_eq!(result.get("id").unwrap(), &json!(1));

        assert!(matches!(result.attr("doesnt_exist"), Err(Error::AttributeNotFound(_))));
        assert!(matches!(result.get("doesnt_exist"), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn object_without_lookup_is_no_model() {
        let result = MappedResult::new(hit("1", json!({})), Arc::new(MappingType::<Value>::untyped()));
        assert!(matches!(result.object(), Err(Error::NoModel { .. })));
    }

    #[test]
    fn object_is_fetched_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mapping = MappingType::<String>::builder("thing")
            .model(move |ids: &[String]| -> Result<HashMap<String, String>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ids.iter().map(|id| (id.clone(), format!("model {id}"))).collect())
            })
            .build()
            .unwrap();
        let result = MappedResult::new(hit("3", json!({})), Arc::new(mapping));
        assert_eq!(result.object().unwrap(), "model 3");
        assert_eq!(result.object().unwrap(), "model 3");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_model_is_reported() {
        let mapping = MappingType::<String>::builder("thing")
            .model(|_: &[String]| -> Result<HashMap<String, String>> { Ok(HashMap::new()) })
            .build()
            .unwrap();
        let result = MappedResult::new(hit("3", json!({})), Arc::new(mapping));
        assert!(matches!(result.object(), Err(Error::ModelNotFound { .. })));
    }

    #[test]
    fn projections_follow_field_selection() {
        let source = json!({"id": 1, "foo": "bar", "tag": "awesome", "width": "2"});
        let ids = project_list(&hit("1", source.clone()), &FieldSelection::IdOnly);
        assert_eq!(ids, vec![json!(1)]);
        let named = project_list(&hit("1", source.clone()), &FieldSelection::Named(vec!["foo".into(), "nope".into()]));
        assert_eq!(named, vec![json!("bar"), Value::Null]);
        let all = project_dict(&hit("1", source.clone()), &FieldSelection::All);
        assert_eq!(Value::Object(all), source);
        let no_id = project_list(&hit("7", json!({"foo": "x"})), &FieldSelection::IdOnly);
        assert_eq!(no_id, vec![json!("7")]);
    }

    #[test]
    fn every_shape_exposes_metadata() {
        let mapping = Arc::new(MappingType::<Value>::untyped());
        for shape in [
            ResultShape::Objects,
            ResultShape::Dicts(FieldSelection::All),
            ResultShape::Lists(FieldSelection::IdOnly),
        ] {
            let results = SearchResults::from_response(
                response(vec![hit("1", json!({"id": 1}))]),
                &shape,
                &mapping,
                document(),
            );
            let first = results.first().unwrap();
            assert_eq!(first.id(), "1");
            assert_eq!(first.score(), Some(1.0));
            assert_eq!(first.source().get("id"), Some(&json!(1)));
            assert!(first.doctype().is_none());
            assert!(first.explanation().is_none());
            assert!(first.highlight().is_empty());
        }
    }

    #[test]
    fn bulk_load_uses_one_lookup() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mapping = Arc::new(
            MappingType::<String>::builder("thing")
                .model(move |ids: &[String]| -> Result<HashMap<String, String>> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(ids.iter().filter(|id| *id != "2").map(|id| (id.clone(), id.repeat(2))).collect())
                })
                .build()
                .unwrap(),
        );
        let results = SearchResults::from_response(
            response(vec![hit("1", json!({})), hit("2", json!({})), hit("3", json!({}))]),
            &ResultShape::Objects,
            &mapping,
            document(),
        );
        assert_eq!(results.load_objects().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let objects: Vec<_> = results.iter().filter_map(SearchResult::as_object).collect();
        assert_eq!(objects[0].object().unwrap(), "11");
        assert_eq!(objects[2].object().unwrap(), "33");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(objects[1].object(), Err(Error::ModelNotFound { .. })));
    }
}
