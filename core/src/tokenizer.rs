use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
}

/// Split text into terms using NFKC normalization and lowercasing. No stemming
/// and no stopwords, so `term` queries see the words as written.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

/// Terms for a source field value. Strings are tokenized, numbers and booleans
/// index as a single term, arrays contribute all of their elements.
pub fn analyze_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => tokenize(text),
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(analyze_value).collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

/// The single term a `term` query looks for. Query values are not analyzed.
pub fn term_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
