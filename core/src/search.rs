//! The chainable search builder.

use crate::document::CompiledDocument;
use crate::engine::{SearchEngine, SearchTarget};
use crate::error::{Error, Result};
use crate::mapping::MappingType;
use crate::query::{Clause, FieldSelection, QuerySpec, ResultShape, SortKey};
use crate::results::{SearchResult, SearchResults};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::{Arc, OnceLock};

/// A lazy search.
///
/// Every chaining method returns a new `S` and leaves the receiver alone, so a
/// base builder can be specialized in several directions. Nothing reaches the
/// engine until [`execute`](Self::execute) (or `len`, `count`, `iter`) is
/// called; the response is then kept for the lifetime of this instance.
///
/// ```no_run
/// use std::sync::Arc;
/// use searchkit::{EngineConfig, HttpEngine, S};
///
/// let engine = Arc::new(HttpEngine::new(&EngineConfig::default())?);
/// let base = S::new().engine(engine).indexes(&["library"]);
/// let awesome = base.query([("foo", "bar")]).filter([("tag", "awesome")]);
/// for result in awesome.execute()? {
///     println!("{:?}", result);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct S<M = Value> {
    spec: QuerySpec,
    mapping: Arc<MappingType<M>>,
    engine: Option<Arc<dyn SearchEngine>>,
    cache: OnceLock<SearchResults<M>>,
    // Held while the engine is called so concurrent misses wait for one response.
    exec_lock: Mutex<()>,
}

impl S<Value> {
    /// An untyped search: results map through the default mapping type.
    pub fn new() -> Self {
        Self {
            spec: QuerySpec::new(),
            mapping: Arc::new(MappingType::untyped()),
            engine: None,
            cache: OnceLock::new(),
            exec_lock: Mutex::new(()),
        }
    }
}

impl Default for S<Value> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> S<M> {
    /// A search whose results map through `mapping`.
    pub fn typed(mapping: MappingType<M>) -> Self {
        Self {
            spec: QuerySpec::new().with_mapping_type(Some(mapping.name().to_string())),
            mapping: Arc::new(mapping),
            engine: None,
            cache: OnceLock::new(),
            exec_lock: Mutex::new(()),
        }
    }

    fn derive(&self, spec: QuerySpec) -> Self {
        Self {
            spec,
            mapping: Arc::clone(&self.mapping),
            engine: self.engine.clone(),
            cache: OnceLock::new(),
            exec_lock: Mutex::new(()),
        }
    }

    pub fn engine(&self, engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine: Some(engine), ..self.derive(self.spec.clone()) }
    }

    /// Adds `field == value` query terms. Repeated calls accumulate.
    pub fn query<I, K, V>(&self, terms: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.derive(self.spec.with_queries(terms.into_iter().map(|(k, v)| Clause::new(k, v))))
    }

    /// Adds `field == value` filters. Filters narrow results without scoring.
    pub fn filter<I, K, V>(&self, terms: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.derive(self.spec.with_filters(terms.into_iter().map(|(k, v)| Clause::new(k, v))))
    }

    /// Results become field maps. No fields means every field.
    pub fn values_dict(&self, fields: &[&str]) -> Result<Self> {
        let selection = selection(fields, FieldSelection::All)?;
        Ok(self.derive(self.spec.with_shape(ResultShape::Dicts(selection))))
    }

    /// Results become value tuples. No fields means the id only.
    pub fn values_list(&self, fields: &[&str]) -> Result<Self> {
        let selection = selection(fields, FieldSelection::IdOnly)?;
        Ok(self.derive(self.spec.with_shape(ResultShape::Lists(selection))))
    }

    pub fn indexes(&self, indexes: &[&str]) -> Self {
        self.derive(self.spec.with_indexes(indexes.iter().map(|s| s.to_string()).collect()))
    }

    pub fn doctypes(&self, doctypes: &[&str]) -> Self {
        self.derive(self.spec.with_doctypes(doctypes.iter().map(|s| s.to_string()).collect()))
    }

    /// Sort keys, `-field` for descending. Replaces any previous order.
    pub fn order_by(&self, keys: &[&str]) -> Self {
        self.derive(self.spec.with_sort(keys.iter().map(|k| SortKey::parse(k)).collect()))
    }

    /// Restricts results to a window, e.g. `s.slice(10..20)` or `s.slice(..5)`.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let stop = match range.end_bound() {
            Bound::Included(&e) => Some(e.saturating_add(1)),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => None,
        };
        self.derive(self.spec.with_bounds(start, stop))
    }

    pub fn explain(&self, explain: bool) -> Self {
        self.derive(self.spec.with_explain(explain))
    }

    pub fn highlight(&self, fields: &[&str]) -> Self {
        self.derive(self.spec.with_highlight(fields.iter().map(|s| s.to_string()).collect()))
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn mapping_type(&self) -> &MappingType<M> {
        &self.mapping
    }

    /// Compiles without touching the engine.
    pub fn build_query(&self) -> CompiledDocument {
        self.spec.compile()
    }

    /// Explicit indexes/doctypes, else the mapping type's, else everything.
    pub fn target(&self) -> SearchTarget {
        let pick = |explicit: &[String], declared: Option<&str>| -> Vec<String> {
            if !explicit.is_empty() {
                explicit.to_vec()
            } else {
                declared.map(|d| vec![d.to_string()]).unwrap_or_default()
            }
        };
        SearchTarget::new(
            pick(self.spec.indexes(), self.mapping.index()),
            pick(self.spec.doctypes(), self.mapping.doctype()),
        )
    }

    /// Runs the search once and caches the response on this instance.
    ///
    /// Concurrent callers block until the first call finishes. Failures are
    /// not cached, so a later call retries.
    pub fn execute(&self) -> Result<&SearchResults<M>> {
        if let Some(results) = self.cache.get() {
            return Ok(results);
        }
        let _guard = self.exec_lock.lock();
        if let Some(results) = self.cache.get() {
            return Ok(results);
        }
        let results = self.run(self.build_query())?;
        Ok(self.cache.get_or_init(|| results))
    }

    /// Sends `document` to the engine and maps the response. Not cached.
    pub(crate) fn run(&self, document: CompiledDocument) -> Result<SearchResults<M>> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| Error::Configuration("no search engine attached to this search".into()))?;
        let target = self.target();
        tracing::debug!(?target, body = %document.to_json(), mapping = self.mapping.name(), "executing search");
        let response = engine.search(&target, &document)?;
        let results = SearchResults::from_response(response, self.spec.shape(), &self.mapping, document);
        tracing::debug!(returned = results.len(), total = results.total(), took_ms = results.took_ms(), "search finished");
        Ok(results)
    }

    /// Number of results returned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.execute()?.len())
    }

    /// Total matches reported by the engine.
    pub fn count(&self) -> Result<u64> {
        Ok(self.execute()?.total())
    }

    pub fn iter(&self) -> Result<std::slice::Iter<'_, SearchResult<M>>> {
        Ok(self.execute()?.iter())
    }

    pub fn to_vec(&self) -> Result<Vec<SearchResult<M>>>
    where
        M: Clone,
    {
        Ok(self.execute()?.to_vec())
    }

    pub fn is_executed(&self) -> bool {
        self.cache.get().is_some()
    }
}

fn selection(fields: &[&str], empty: FieldSelection) -> Result<FieldSelection> {
    if let Some(bad) = fields.iter().find(|f| f.trim().is_empty()) {
        return Err(Error::Configuration(format!("invalid field name {bad:?} in field selection")));
    }
    if fields.is_empty() {
        return Ok(empty);
    }
    Ok(FieldSelection::Named(fields.iter().map(|f| f.to_string()).collect()))
}

/// Clones share the query and engine but start with an empty cache.
impl<M> Clone for S<M> {
    fn clone(&self) -> Self {
        self.derive(self.spec.clone())
    }
}

impl<M> fmt::Debug for S<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S")
            .field("spec", &self.spec)
            .field("mapping", &self.mapping.name())
            .field("engine", &self.engine.is_some())
            .field("executed", &self.is_executed())
            .finish()
    }
}
