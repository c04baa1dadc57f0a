use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The request body sent to an engine. Built fresh from a query spec and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompiledDocument(Map<String, Value>);

impl CompiledDocument {
    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `query` section.
    pub fn query(&self) -> Option<&Value> {
        self.0.get("query")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

impl PartialEq<Value> for CompiledDocument {
    fn eq(&self, other: &Value) -> bool {
        other.as_object().is_some_and(|o| o == &self.0)
    }
}

impl From<CompiledDocument> for Value {
    fn from(doc: CompiledDocument) -> Self {
        Value::Object(doc.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compares_against_plain_json() {
        let mut map = Map::new();
        map.insert("query".into(), json!({"match_all": {}}));
        let doc = CompiledDocument::from_map(map);
        assert_eq!(doc, json!({"query": {"match_all": {}}}));
        assert_eq!(doc.to_json(), r#"{"query":{"match_all":{}}}"#);
    }

    #[test]
    fn exposes_the_body_as_map_and_value() {
        let mut map = Map::new();
        map.insert("size".into(), json!(3));
        let doc = CompiledDocument::from_map(map);
        assert_eq!(doc.as_map().get("size"), Some(&json!(3)));
        assert_eq!(doc.to_value(), json!({"size": 3}));
        assert_eq!(Value::from(doc.clone()), doc.to_value());
    }
}
