use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use searchkit::MemoryEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, body: impl Into<Bytes>) -> (StatusCode, Value) {
    let req = Request::builder().method(method).uri(uri).body(Body::from(body.into())).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, json)
}

async fn seeded() -> Router {
    let app = searchkit_server::build_app(Arc::new(MemoryEngine::new()));
    let (status, _) = call(&app, Method::PUT, "/test", "").await;
    assert_eq!(status, StatusCode::OK);
    let bulk = [
        r#"{"index":{"_index":"test","_type":"item","_id":"1"}}"#,
        r#"{"id":1,"foo":"bar","tag":"awesome"}"#,
        r#"{"index":{"_index":"test","_type":"item","_id":"2"}}"#,
        r#"{"id":2,"foo":"bar","tag":"boring"}"#,
        r#"{"index":{"_index":"test","_type":"other","_id":"3"}}"#,
        r#"{"id":3,"foo":"car","tag":"awesome"}"#,
    ]
    .join("\n")
        + "\n";
    let (status, body) = call(&app, Method::POST, "/_bulk", bulk).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"], json!(false));
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    let (status, _) = call(&app, Method::POST, "/test/_refresh", "").await;
    assert_eq!(status, StatusCode::OK);
    app
}

#[tokio::test]
async fn health_is_ok() {
    let app = searchkit_server::build_app(Arc::new(MemoryEngine::new()));
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn term_search_returns_hits() {
    let app = seeded().await;
    let query = json!({"query": {"term": {"foo": "bar"}}}).to_string();
    let (status, body) = call(&app, Method::POST, "/test/_search", query).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"]["total"]["value"], json!(2));
    let ids: Vec<&str> = body["hits"]["hits"].as_array().unwrap().iter().map(|h| h["_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn empty_body_matches_everything() {
    let app = seeded().await;
    let (status, body) = call(&app, Method::POST, "/_search", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hits"]["total"]["value"], json!(3));
}

#[tokio::test]
async fn doctype_paths_narrow_the_search() {
    let app = seeded().await;
    let (_, typed) = call(&app, Method::POST, "/test/other/_search", "{}").await;
    assert_eq!(typed["hits"]["total"]["value"], json!(1));
    let (_, all) = call(&app, Method::POST, "/_all/item,other/_search", "{}").await;
    assert_eq!(all["hits"]["total"]["value"], json!(3));
}

#[tokio::test]
async fn missing_index_is_not_found() {
    let app = seeded().await;
    let (status, body) = call(&app, Method::POST, "/nope/_search", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], json!("index_not_found_exception"));
    let (status, _) = call(&app, Method::DELETE, "/nope", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_requests_are_rejected() {
    let app = seeded().await;
    let (status, _) = call(&app, Method::POST, "/test/_search", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fuzzy = json!({"query": {"fuzzy": {"foo": "baz"}}}).to_string();
    let (status, body) = call(&app, Method::POST, "/test/_search", fuzzy).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], json!("illegal_argument_exception"));
    let (status, _) = call(&app, Method::PUT, "/test", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_indexes_disappear() {
    let app = seeded().await;
    let (status, _) = call(&app, Method::DELETE, "/test", "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::POST, "/test/_search", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
