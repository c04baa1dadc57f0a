//! Lazy, chainable query building on top of an Elasticsearch-compatible
//! engine, with typed mapping of the hits that come back.

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod mlt;
pub mod query;
pub mod results;
pub mod search;
pub mod tokenizer;

pub use config::EngineConfig;
pub use document::CompiledDocument;
pub use engine::http::HttpEngine;
pub use engine::memory::MemoryEngine;
pub use engine::{EngineResponse, IndexAdmin, SearchEngine, SearchTarget};
pub use error::{Error, Result, TransportError};
pub use mapping::{MappingType, MappingTypeBuilder, ModelLookup, DEFAULT_MAPPING_TYPE};
pub use mlt::{Mlt, MltParams};
pub use query::{Clause, FieldSelection, QuerySpec, ResultShape, SortKey};
pub use results::{DictResult, HitMetadata, ListResult, MappedResult, RawHit, SearchResult, SearchResults};
pub use search::S;
