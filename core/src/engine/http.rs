//! Blocking HTTP adapter for Elasticsearch-compatible endpoints.

use super::{bulk, EngineResponse, IndexAdmin, SearchEngine, SearchTarget};
use crate::config::EngineConfig;
use crate::document::CompiledDocument;
use crate::error::TransportError;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{header, Url};
use serde_json::Value;
use std::time::Duration;

pub struct HttpEngine {
    client: Client,
    base: Url,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("searchkit/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| TransportError::Rejected(format!("invalid engine url {}: {e}", config.url)))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Rejected(format!("engine url cannot take a path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments.iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn search_url(&self, target: &SearchTarget) -> Result<Url, TransportError> {
        let indexes = target.indexes.join(",");
        let doctypes = target.doctypes.join(",");
        match (indexes.is_empty(), doctypes.is_empty()) {
            (true, true) => self.url(&["_search"]),
            (true, false) => self.url(&["_all", &doctypes, "_search"]),
            (false, true) => self.url(&[&indexes, "_search"]),
            (false, false) => self.url(&[&indexes, &doctypes, "_search"]),
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<String, TransportError> {
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if status == reqwest::StatusCode::NOT_FOUND && body.contains("index_not_found") {
            return Err(TransportError::IndexNotFound(body));
        }
        if !status.is_success() {
            return Err(TransportError::Status { status: status.as_u16(), body });
        }
        Ok(body)
    }
}

impl SearchEngine for HttpEngine {
    fn search(&self, target: &SearchTarget, document: &CompiledDocument) -> Result<EngineResponse, TransportError> {
        let url = self.search_url(target)?;
        tracing::debug!(%url, body = %document.to_json(), "sending search");
        let body = self.send(self.client.post(url).json(document))?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl IndexAdmin for HttpEngine {
    fn create_index(&self, index: &str) -> Result<(), TransportError> {
        self.send(self.client.put(self.url(&[index])?))?;
        tracing::info!(index, "created index");
        Ok(())
    }

    fn index_documents(&self, index: &str, doctype: &str, docs: &[Value]) -> Result<usize, TransportError> {
        if docs.is_empty() {
            return Ok(0);
        }
        let body = bulk::encode(index, doctype, docs)?;
        let request = self
            .client
            .post(self.url(&["_bulk"])?)
            .header(header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let response: Value = serde_json::from_str(&self.send(request)?)?;
        if response.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            return Err(TransportError::Rejected(format!("bulk indexing reported errors: {response}")));
        }
        tracing::info!(index, doctype, count = docs.len(), "indexed documents");
        Ok(docs.len())
    }

    fn refresh(&self, index: &str) -> Result<(), TransportError> {
        self.send(self.client.post(self.url(&[index, "_refresh"])?))?;
        tracing::info!(index, "refreshed index");
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<(), TransportError> {
        self.send(self.client.delete(self.url(&[index])?))?;
        tracing::info!(index, "deleted index");
        Ok(())
    }
}
