//! Newline-delimited bulk indexing bodies: an action line followed by the
//! document source, one pair per document.

use super::document_id;
use crate::error::TransportError;
use serde_json::{json, Value};

pub const DEFAULT_DOCTYPE: &str = "_doc";

#[derive(Debug, Clone, PartialEq)]
pub struct BulkItem {
    pub index: String,
    pub doctype: String,
    pub id: String,
    pub source: Value,
}

pub fn encode(index: &str, doctype: &str, docs: &[Value]) -> Result<String, TransportError> {
    let mut body = String::new();
    for doc in docs {
        let id = document_id(doc)
            .ok_or_else(|| TransportError::Rejected(format!("document has no usable id: {doc}")))?;
        let action = json!({ "index": { "_index": index, "_type": doctype, "_id": id } });
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

pub fn decode(body: &str) -> Result<Vec<BulkItem>, TransportError> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());
    let mut items = Vec::new();
    while let Some(line) = lines.next() {
        let action: Value = serde_json::from_str(line)?;
        let meta = action
            .get("index")
            .or_else(|| action.get("create"))
            .ok_or_else(|| TransportError::Rejected(format!("unsupported bulk action: {line}")))?;
        let source_line = lines
            .next()
            .ok_or_else(|| TransportError::Rejected("bulk body ends after an action".into()))?;
        let source: Value = serde_json::from_str(source_line)?;
        if !source.is_object() {
            return Err(TransportError::Rejected(format!("bulk source is not an object: {source_line}")));
        }
        let index = meta
            .get("_index")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Rejected(format!("bulk action has no _index: {line}")))?;
        let doctype = meta.get("_type").and_then(Value::as_str).unwrap_or(DEFAULT_DOCTYPE);
        let id = match meta.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => document_id(&source)
                .ok_or_else(|| TransportError::Rejected(format!("bulk action has no _id: {line}")))?,
        };
        items.push(BulkItem { index: index.to_string(), doctype: doctype.to_string(), id, source });
    }
    Ok(items)
}
