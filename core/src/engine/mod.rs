//! The execution-engine boundary and its adapters.

pub mod bulk;
pub mod http;
pub mod memory;

use crate::document::CompiledDocument;
use crate::error::TransportError;
use crate::results::RawHit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The indexes and doctypes a query runs against. Empty lists mean "all".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchTarget {
    pub indexes: Vec<String>,
    pub doctypes: Vec<String>,
}

impl SearchTarget {
    pub fn new(indexes: Vec<String>, doctypes: Vec<String>) -> Self {
        Self { indexes, doctypes }
    }

    pub fn includes_index(&self, index: &str) -> bool {
        self.indexes.is_empty() || self.indexes.iter().any(|i| i == index)
    }

    pub fn includes_doctype(&self, doctype: &str) -> bool {
        self.doctypes.is_empty() || self.doctypes.iter().any(|d| d == doctype)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Total {
    Count(u64),
    Detailed {
        value: u64,
        #[serde(default)]
        relation: String,
    },
}

impl Total {
    pub fn value(&self) -> u64 {
        match self {
            Total::Count(value) | Total::Detailed { value, .. } => *value,
        }
    }
}

impl Default for Total {
    fn default() -> Self {
        Total::Count(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: Total,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// A search response in the engine's wire shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: HitsEnvelope,
}

/// Runs compiled documents. Implementations block until the engine answers and
/// report failures as [`TransportError`] without retrying.
pub trait SearchEngine: Send + Sync {
    fn search(&self, target: &SearchTarget, document: &CompiledDocument) -> Result<EngineResponse, TransportError>;
}

/// Index management used to prepare data for searching.
pub trait IndexAdmin: Send + Sync {
    fn create_index(&self, index: &str) -> Result<(), TransportError>;

    /// Stores `docs` under `index`/`doctype`, using each document's `id` field
    /// as its engine id. Returns the number stored.
    fn index_documents(&self, index: &str, doctype: &str, docs: &[Value]) -> Result<usize, TransportError>;

    /// Makes previously indexed documents visible to searches.
    fn refresh(&self, index: &str) -> Result<(), TransportError>;

    fn delete_index(&self, index: &str) -> Result<(), TransportError>;
}

/// The engine id for a document: its `id` field rendered as a string.
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
