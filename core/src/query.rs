//! Immutable query state and its compiler.
//!
//! A [`QuerySpec`] is never changed in place: every `with_*` method returns a
//! new value, so a spec can be shared between any number of diverging
//! builders.

use crate::document::CompiledDocument;
use serde_json::{json, Map, Value};

/// A single `field == value` term.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub value: Value,
}

impl Clause {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), value: value.into() }
    }

    fn is_well_formed(&self) -> bool {
        !self.field.trim().is_empty()
    }

    fn to_term(&self) -> Value {
        let mut term = Map::new();
        term.insert(self.field.clone(), self.value.clone());
        json!({ "term": term })
    }
}

/// Which source fields a projected result keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    #[default]
    All,
    /// Only the identifier.
    IdOnly,
    Named(Vec<String>),
}

/// The shape results are materialized into.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultShape {
    /// Mapped objects carrying the builder's mapping type.
    #[default]
    Objects,
    Dicts(FieldSelection),
    Lists(FieldSelection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    /// `"-width"` sorts descending on `width`, `"width"` ascending.
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(field) => Self { field: field.to_string(), descending: true },
            None => Self { field: key.to_string(), descending: false },
        }
    }

    fn to_value(&self) -> Value {
        let order = if self.descending { "desc" } else { "asc" };
        let mut key = Map::new();
        key.insert(self.field.clone(), json!({ "order": order }));
        Value::Object(key)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    queries: Vec<Clause>,
    filters: Vec<Clause>,
    shape: ResultShape,
    mapping_type: Option<String>,
    indexes: Vec<String>,
    doctypes: Vec<String>,
    sort: Vec<SortKey>,
    start: usize,
    stop: Option<usize>,
    explain: bool,
    highlight: Vec<String>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> &[Clause] {
        &self.queries
    }

    pub fn filters(&self) -> &[Clause] {
        &self.filters
    }

    pub fn shape(&self) -> &ResultShape {
        &self.shape
    }

    pub fn mapping_type(&self) -> Option<&str> {
        self.mapping_type.as_deref()
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn doctypes(&self) -> &[String] {
        &self.doctypes
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn bounds(&self) -> (usize, Option<usize>) {
        (self.start, self.stop)
    }

    pub fn explains(&self) -> bool {
        self.explain
    }

    pub fn highlight_fields(&self) -> &[String] {
        &self.highlight
    }

    /// Appends query clauses; earlier clauses are kept (AND semantics).
    pub fn with_queries(&self, clauses: impl IntoIterator<Item = Clause>) -> Self {
        let mut next = self.clone();
        next.queries.extend(clauses);
        next
    }

    /// Appends filter clauses. Filters behave as a set: repeating an existing
    /// clause is a no-op.
    pub fn with_filters(&self, clauses: impl IntoIterator<Item = Clause>) -> Self {
        let mut next = self.clone();
        for clause in clauses {
            if !next.filters.contains(&clause) {
                next.filters.push(clause);
            }
        }
        next
    }

    pub fn with_shape(&self, shape: ResultShape) -> Self {
        Self { shape, ..self.clone() }
    }

    pub fn with_mapping_type(&self, name: Option<String>) -> Self {
        Self { mapping_type: name, ..self.clone() }
    }

    pub fn with_indexes(&self, indexes: Vec<String>) -> Self {
        Self { indexes, ..self.clone() }
    }

    pub fn with_doctypes(&self, doctypes: Vec<String>) -> Self {
        Self { doctypes, ..self.clone() }
    }

    /// Replaces the sort order.
    pub fn with_sort(&self, sort: Vec<SortKey>) -> Self {
        Self { sort, ..self.clone() }
    }

    pub fn with_bounds(&self, start: usize, stop: Option<usize>) -> Self {
        Self { start, stop, ..self.clone() }
    }

    pub fn with_explain(&self, explain: bool) -> Self {
        Self { explain, ..self.clone() }
    }

    pub fn with_highlight(&self, fields: Vec<String>) -> Self {
        Self { highlight: fields, ..self.clone() }
    }

    /// Compiles this spec into an engine request body.
    pub fn compile(&self) -> CompiledDocument {
        self.compile_with(None)
    }

    /// Compiles with `leading` placed ahead of the term clauses. Used by
    /// more-like-this to put its similarity clause in front of inherited state.
    pub(crate) fn compile_with(&self, leading: Option<Value>) -> CompiledDocument {
        let mut must: Vec<Value> = leading.into_iter().collect();
        must.extend(self.queries.iter().filter(|c| c.is_well_formed()).map(Clause::to_term));
        let filter: Vec<Value> =
            self.filters.iter().filter(|c| c.is_well_formed()).map(Clause::to_term).collect();

        let query = if filter.is_empty() && must.is_empty() {
            json!({ "match_all": {} })
        } else if filter.is_empty() && must.len() == 1 {
            must.remove(0)
        } else {
            let mut boolean = Map::new();
            if !must.is_empty() {
                boolean.insert("must".into(), Value::Array(must));
            }
            if !filter.is_empty() {
                boolean.insert("filter".into(), Value::Array(filter));
            }
            json!({ "bool": boolean })
        };

        let mut body = Map::new();
        body.insert("query".into(), query);
        if self.start > 0 {
            body.insert("from".into(), json!(self.start));
        }
        if let Some(stop) = self.stop {
            body.insert("size".into(), json!(stop.saturating_sub(self.start)));
        }
        if !self.sort.is_empty() {
            body.insert("sort".into(), self.sort.iter().map(SortKey::to_value).collect());
        }
        if self.explain {
            body.insert("explain".into(), Value::Bool(true));
        }
        let highlight: Map<String, Value> = self
            .highlight
            .iter()
            .filter(|f| !f.trim().is_empty())
            .map(|f| (f.clone(), json!({})))
            .collect();
        if !highlight.is_empty() {
            body.insert("highlight".into(), json!({ "fields": highlight }));
        }
        CompiledDocument::from_map(body)
    }
}
