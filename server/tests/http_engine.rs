//! Drives the blocking `HttpEngine` against a live server on a background
//! runtime.

use searchkit::{EngineConfig, Error, HitMetadata, HttpEngine, IndexAdmin, MemoryEngine, Mlt, TransportError, S};
use serde_json::json;
use std::sync::Arc;

fn spawn_server() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let app = searchkit_server::build_app(Arc::new(MemoryEngine::new()));
            axum::serve(listener, app).await.unwrap();
        });
    });
    format!("http://{addr}")
}

fn seeded_engine() -> Arc<HttpEngine> {
    let config = EngineConfig { url: spawn_server(), ..EngineConfig::default() };
    let engine = HttpEngine::new(&config).unwrap();
    engine.create_index("test").unwrap();
    let docs = [
        json!({"id": 1, "foo": "bar", "tag": "awesome"}),
        json!({"id": 2, "foo": "bar", "tag": "boring"}),
        json!({"id": 3, "foo": "bar", "tag": "awesome"}),
        json!({"id": 4, "foo": "bar", "tag": "boring"}),
        json!({"id": 5, "foo": "bar", "tag": "elite"}),
        json!({"id": 6, "foo": "notbar", "tag": "gross"}),
        json!({"id": 7, "foo": "notbar", "tag": "awesome"}),
    ];
    assert_eq!(engine.index_documents("test", "item", &docs).unwrap(), 7);
    engine.refresh("test").unwrap();
    Arc::new(engine)
}

#[test]
fn searches_and_similar_documents_over_http() {
    let engine = seeded_engine();
    let s = S::new().engine(engine.clone()).indexes(&["test"]);

    let awesome = s.filter([("tag", "awesome")]);
    let ids: Vec<String> = awesome.iter().unwrap().map(|r| r.id().to_string()).collect();
    assert_eq!(ids, vec!["1", "3", "7"]);

    let similar = |s: &S, fields: &[&str]| {
        Mlt::new(s, 1, fields.iter().copied()).unwrap().min_term_freq(1).min_doc_freq(1).len().unwrap()
    };
    assert_eq!(similar(&s, &["foo"]), 4);
    assert_eq!(similar(&s, &["tag"]), 2);
    assert_eq!(similar(&s, &["tag", "foo"]), 5);
    assert_eq!(similar(&s.filter([("tag", "boring")]), &["foo"]), 2);
    assert_eq!(similar(&s.filter([("tag", "gross")]), &["foo"]), 0);

    let typed = s.doctypes(&["item"]).values_list(&["tag"]).unwrap();
    assert_eq!(typed.len().unwrap(), 7);

    engine.delete_index("test").unwrap();
}

#[test]
fn missing_indexes_surface_as_transport_errors() {
    let engine = seeded_engine();
    let s = S::new().engine(engine).indexes(&["missing"]);
    assert!(matches!(s.execute(), Err(Error::Transport(TransportError::IndexNotFound(_)))));
}

#[test]
fn unreachable_engines_fail_without_retrying() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let engine = HttpEngine::new(&EngineConfig { url, timeout_secs: 1, ..EngineConfig::default() }).unwrap();
    let s = S::new().engine(Arc::new(engine));
    assert!(matches!(s.execute(), Err(Error::Transport(TransportError::Request(_)))));
}
