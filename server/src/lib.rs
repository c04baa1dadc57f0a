use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use searchkit::engine::bulk;
use searchkit::{CompiledDocument, EngineResponse, IndexAdmin, MemoryEngine, SearchEngine, SearchTarget, TransportError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub type AppState = Arc<MemoryEngine>;

/// Serves `engine` behind the subset of the Elasticsearch REST API that
/// [`searchkit::HttpEngine`] speaks.
pub fn build_app(engine: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/_bulk", post(bulk_handler))
        .route("/_search", get(search_all).post(search_all))
        .route("/:index", put(create_index).delete(delete_index))
        .route("/:index/_refresh", post(refresh_index))
        .route("/:index/_search", get(search_indexes).post(search_indexes))
        .route("/:index/:doctype/_search", get(search_typed).post(search_typed))
        .with_state(engine)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Engine failures rendered the way Elasticsearch reports them.
pub struct ApiError(TransportError);

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self(TransportError::Decode(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            TransportError::IndexNotFound(_) => (StatusCode::NOT_FOUND, "index_not_found_exception"),
            TransportError::Rejected(_) => (StatusCode::BAD_REQUEST, "illegal_argument_exception"),
            TransportError::Decode(_) => (StatusCode::BAD_REQUEST, "parsing_exception"),
            TransportError::Status { .. } | TransportError::Request(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error")
            }
        };
        tracing::warn!(%status, error = %self.0, "request failed");
        let body = json!({ "error": { "type": kind, "reason": self.0.to_string() }, "status": status.as_u16() });
        (status, Json(body)).into_response()
    }
}

/// Comma-separated names; `_all` and blanks mean no restriction.
fn names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "_all")
        .map(str::to_string)
        .collect()
}

fn run_search(engine: &MemoryEngine, target: SearchTarget, body: &Bytes) -> Result<Json<EngineResponse>, ApiError> {
    let document: CompiledDocument = if body.iter().all(u8::is_ascii_whitespace) {
        CompiledDocument::default()
    } else {
        serde_json::from_slice(body)?
    };
    Ok(Json(engine.search(&target, &document)?))
}

async fn search_all(State(engine): State<AppState>, body: Bytes) -> Result<Json<EngineResponse>, ApiError> {
    run_search(&engine, SearchTarget::default(), &body)
}

async fn search_indexes(
    State(engine): State<AppState>,
    Path(index): Path<String>,
    body: Bytes,
) -> Result<Json<EngineResponse>, ApiError> {
    run_search(&engine, SearchTarget::new(names(&index), Vec::new()), &body)
}

async fn search_typed(
    State(engine): State<AppState>,
    Path((index, doctype)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<EngineResponse>, ApiError> {
    run_search(&engine, SearchTarget::new(names(&index), names(&doctype)), &body)
}

async fn create_index(State(engine): State<AppState>, Path(index): Path<String>) -> Result<Json<Value>, ApiError> {
    engine.create_index(&index)?;
    Ok(Json(json!({ "acknowledged": true, "index": index })))
}

async fn delete_index(State(engine): State<AppState>, Path(index): Path<String>) -> Result<Json<Value>, ApiError> {
    engine.delete_index(&index)?;
    Ok(Json(json!({ "acknowledged": true })))
}

async fn refresh_index(State(engine): State<AppState>, Path(index): Path<String>) -> Result<Json<Value>, ApiError> {
    engine.refresh(&index)?;
    Ok(Json(json!({ "_shards": { "failed": 0 } })))
}

async fn bulk_handler(State(engine): State<AppState>, body: String) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();
    let items = bulk::decode(&body)?;
    let report: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({ "index": { "_index": item.index, "_type": item.doctype, "_id": item.id, "status": 201 } })
        })
        .collect();
    let staged = engine.apply_bulk(items);
    tracing::info!(staged, "bulk request applied");
    Ok(Json(json!({ "took": start.elapsed().as_millis() as u64, "errors": false, "items": report })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_and_blanks_mean_everything() {
        assert!(names("_all").is_empty());
        assert_eq!(names("a, b,,"), vec!["a".to_string(), "b".to_string()]);
    }
}
