//! Mapping types: descriptors that control how raw hits become results.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Name given to the descriptor used by untyped builders.
pub const DEFAULT_MAPPING_TYPE: &str = "default";

/// Metadata names every result exposes; declared attributes may not reuse them.
pub const METADATA_NAMES: [&str; 7] =
    ["_id", "_score", "_source", "_type", "_index", "_explanation", "_highlight"];

/// Resolves engine identifiers to backing domain objects in bulk.
pub trait ModelLookup<M>: Send + Sync {
    /// Ids absent from the returned map have no backing object.
    fn lookup(&self, ids: &[String]) -> Result<HashMap<String, M>>;
}

impl<M, F> ModelLookup<M> for F
where
    F: Fn(&[String]) -> Result<HashMap<String, M>> + Send + Sync,
{
    fn lookup(&self, ids: &[String]) -> Result<HashMap<String, M>> {
        self(ids)
    }
}

pub struct MappingType<M = Value> {
    name: String,
    index: Option<String>,
    doctype: Option<String>,
    attributes: BTreeMap<String, Value>,
    model: Option<Arc<dyn ModelLookup<M>>>,
}

impl<M> MappingType<M> {
    pub fn builder(name: impl Into<String>) -> MappingTypeBuilder<M> {
        MappingTypeBuilder {
            name: name.into(),
            index: None,
            doctype: None,
            attributes: Vec::new(),
            model: None,
        }
    }

    /// The descriptor untyped builders map through. It declares no attributes
    /// and no model lookup.
    pub fn untyped() -> Self {
        Self {
            name: DEFAULT_MAPPING_TYPE.to_string(),
            index: None,
            doctype: None,
            attributes: BTreeMap::new(),
            model: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Declared instance attributes with their initial values.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn model(&self) -> Option<&dyn ModelLookup<M>> {
        self.model.as_deref()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

impl<M> fmt::Debug for MappingType<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingType")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("doctype", &self.doctype)
            .field("attributes", &self.attributes)
            .field("model", &self.model.is_some())
            .finish()
    }
}

pub struct MappingTypeBuilder<M> {
    name: String,
    index: Option<String>,
    doctype: Option<String>,
    attributes: Vec<(String, Value)>,
    model: Option<Arc<dyn ModelLookup<M>>>,
}

impl<M> MappingTypeBuilder<M> {
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    #[must_use]
    pub fn doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = Some(doctype.into());
        self
    }

    /// Declares an instance attribute. It shadows a source field of the same
    /// name on the attribute path only.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, initial: impl Into<Value>) -> Self {
        self.attributes.push((name.into(), initial.into()));
        self
    }

    #[must_use]
    pub fn model<L>(mut self, lookup: L) -> Self
    where
        L: ModelLookup<M> + 'static,
    {
        self.model = Some(Arc::new(lookup));
        self
    }

    pub fn build(self) -> Result<MappingType<M>> {
        if self.name.trim().is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(Error::Configuration(format!("invalid mapping type name {:?}", self.name)));
        }
        for (label, value) in [("index", &self.index), ("doctype", &self.doctype)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::Configuration(format!(
                    "mapping type `{}` has an empty {label}",
                    self.name
                )));
            }
        }
        let mut attributes = BTreeMap::new();
        for (name, initial) in self.attributes {
            if name.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "mapping type `{}` declares an unnamed attribute",
                    self.name
                )));
            }
            if METADATA_NAMES.contains(&name.as_str()) {
                return Err(Error::Configuration(format!(
                    "attribute `{name}` collides with result metadata"
                )));
            }
            attributes.insert(name, initial);
        }
        Ok(MappingType {
            name: self.name,
            index: self.index,
            doctype: self.doctype,
            attributes,
            model: self.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untyped_has_no_model() {
        let mapping = MappingType::<Value>::untyped();
        assert_eq!(mapping.name(), DEFAULT_MAPPING_TYPE);
        assert!(!mapping.has_model());
    }

    #[test]
    fn closures_serve_as_lookups() {
        let mapping = MappingType::<String>::builder("book")
            .model(|ids: &[String]| -> Result<HashMap<String, String>> {
                Ok(ids.iter().map(|id| (id.clone(), format!("book-{id}"))).collect())
            })
            .build()
            .unwrap();
        let found = mapping.model().unwrap().lookup(&["4".to_string()]).unwrap();
        assert_eq!(found["4"], "book-4");
    }

    #[test]
    fn rejects_bad_wiring() {
        assert!(matches!(MappingType::<Value>::builder("").build(), Err(Error::Configuration(_))));
        assert!(matches!(MappingType::<Value>::builder("two words").build(), Err(Error::Configuration(_))));
        assert!(matches!(
            MappingType::<Value>::builder("book").doctype(" ").build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            MappingType::<Value>::builder("book").attribute("_id", json!(null)).build(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn keeps_declared_attributes() {
        let mapping = MappingType::<Value>::builder("book")
            .index("library")
            .doctype("book")
            .attribute("_object", Value::Null)
            .build()
            .unwrap();
        assert_eq!(mapping.index(), Some("library"));
        assert_eq!(mapping.attributes().get("_object"), Some(&Value::Null));
    }
}
