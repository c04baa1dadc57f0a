//! More-like-this searches built on top of an existing [`S`].

use crate::document::CompiledDocument;
use crate::error::{Error, Result};
use crate::results::{SearchResult, SearchResults};
use crate::search::S;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Similarity thresholds. Unset values are left to the engine's defaults.
///
/// Engine defaults are tuned for large corpora: on a handful of short
/// documents no term reaches the default `min_term_freq`/`min_doc_freq`, so
/// nothing is similar to anything. Pass `1`/`1` for small corpora.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MltParams {
    pub min_term_freq: Option<u32>,
    pub min_doc_freq: Option<u32>,
    pub max_doc_freq: Option<u32>,
    pub max_query_terms: Option<u32>,
    pub min_word_length: Option<u32>,
    pub max_word_length: Option<u32>,
    pub stop_words: Vec<String>,
    pub boost_terms: Option<f64>,
}

impl MltParams {
    fn write_into(&self, clause: &mut Map<String, Value>) {
        let numbers = [
            ("min_term_freq", self.min_term_freq),
            ("min_doc_freq", self.min_doc_freq),
            ("max_doc_freq", self.max_doc_freq),
            ("max_query_terms", self.max_query_terms),
            ("min_word_length", self.min_word_length),
            ("max_word_length", self.max_word_length),
        ];
        for (key, value) in numbers {
            if let Some(value) = value {
                clause.insert(key.into(), json!(value));
            }
        }
        if !self.stop_words.is_empty() {
            clause.insert("stop_words".into(), json!(self.stop_words));
        }
        if let Some(boost) = self.boost_terms {
            clause.insert("boost_terms".into(), json!(boost));
        }
    }
}

/// Documents similar to one source document, compared on `fields`.
///
/// Filters, query terms, target and mapping type are inherited from the
/// search it was built from, so filtering before building narrows the
/// candidates.
pub struct Mlt<M = Value> {
    search: S<M>,
    id: String,
    fields: Vec<String>,
    params: MltParams,
    cache: OnceLock<SearchResults<M>>,
    exec_lock: Mutex<()>,
}

impl<M> Mlt<M> {
    pub fn new<I, F>(search: &S<M>, id: impl ToString, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let id = id.to_string();
        if id.trim().is_empty() {
            return Err(Error::Configuration("more-like-this needs a document id".into()));
        }
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if let Some(bad) = fields.iter().find(|f| f.trim().is_empty()) {
            return Err(Error::Configuration(format!("invalid more-like-this field {bad:?}")));
        }
        Ok(Self {
            search: search.clone(),
            id,
            fields,
            params: MltParams::default(),
            cache: OnceLock::new(),
            exec_lock: Mutex::new(()),
        })
    }

    fn with_params(self, update: impl FnOnce(&mut MltParams)) -> Self {
        let mut params = self.params;
        update(&mut params);
        Self {
            search: self.search,
            id: self.id,
            fields: self.fields,
            params,
            cache: OnceLock::new(),
            exec_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn params(self, params: MltParams) -> Self {
        self.with_params(|p| *p = params)
    }

    #[must_use]
    pub fn min_term_freq(self, n: u32) -> Self {
        self.with_params(|p| p.min_term_freq = Some(n))
    }

    #[must_use]
    pub fn min_doc_freq(self, n: u32) -> Self {
        self.with_params(|p| p.min_doc_freq = Some(n))
    }

    #[must_use]
    pub fn max_doc_freq(self, n: u32) -> Self {
        self.with_params(|p| p.max_doc_freq = Some(n))
    }

    #[must_use]
    pub fn max_query_terms(self, n: u32) -> Self {
        self.with_params(|p| p.max_query_terms = Some(n))
    }

    #[must_use]
    pub fn min_word_length(self, n: u32) -> Self {
        self.with_params(|p| p.min_word_length = Some(n))
    }

    #[must_use]
    pub fn max_word_length(self, n: u32) -> Self {
        self.with_params(|p| p.max_word_length = Some(n))
    }

    #[must_use]
    pub fn stop_words<I, W>(self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        self.with_params(|p| p.stop_words = words)
    }

    #[must_use]
    pub fn boost_terms(self, boost: f64) -> Self {
        self.with_params(|p| p.boost_terms = Some(boost))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn search(&self) -> &S<M> {
        &self.search
    }

    pub fn build_query(&self) -> CompiledDocument {
        let mut clause = Map::new();
        clause.insert("fields".into(), json!(self.fields));
        clause.insert("like".into(), json!([{ "_id": self.id }]));
        self.params.write_into(&mut clause);
        self.search.spec().compile_with(Some(json!({ "more_like_this": clause })))
    }

    /// Runs once and caches the response on this instance. Concurrent
    /// callers wait for the first call.
    pub fn execute(&self) -> Result<&SearchResults<M>> {
        if let Some(results) = self.cache.get() {
            return Ok(results);
        }
        let _guard = self.exec_lock.lock();
        if let Some(results) = self.cache.get() {
            return Ok(results);
        }
        let results = self.search.run(self.build_query())?;
        Ok(self.cache.get_or_init(|| results))
    }

    /// Number of similar documents the engine returned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.execute()?.len())
    }

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
}

impl<M> fmt::Debug for Mlt<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mlt")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("params", &self.params)
            .field("search", &self.search)
            .finish()
    }
}
