use criterion::{criterion_group, criterion_main, Criterion};
use searchkit::{IndexAdmin, MemoryEngine, Mlt, S};
use serde_json::json;
use std::sync::Arc;

fn bench_compile(c: &mut Criterion) {
    let s = S::new()
        .query([("title", "rust"), ("body", "search")])
        .filter([("tag", "awesome"), ("lang", "en")])
        .order_by(&["-published", "title"])
        .slice(20..40)
        .highlight(&["body"]);
    c.bench_function("compile_bool_query", |b| b.iter(|| s.build_query()));
}

fn bench_memory_mlt(c: &mut Criterion) {
    let engine = MemoryEngine::new();
    let docs: Vec<_> = (0..500)
        .map(|i| json!({"id": i, "title": format!("document {i} about topic {}", i % 17), "tag": format!("t{}", i % 5)}))
        .collect();
    engine.index_documents("bench", "doc", &docs).unwrap();
    engine.refresh("bench").unwrap();
    let s = S::new().engine(Arc::new(engine)).indexes(&["bench"]);
    c.bench_function("memory_mlt_500_docs", |b| {
        b.iter(|| Mlt::new(&s, 3, ["title", "tag"]).unwrap().min_term_freq(1).min_doc_freq(1).len().unwrap())
    });
}

criterion_group!(benches, bench_compile, bench_memory_mlt);
criterion_main!(benches);
