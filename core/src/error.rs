use thiserror::Error;

/// Failures raised while talking to an execution engine. These are produced by
/// the engine adapters and handed to callers as-is.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed engine payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("engine rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("mapping type `{mapping}` declares no model lookup")]
    NoModel { mapping: String },

    #[error("mapping type `{mapping}` has no model for id {id}")]
    ModelNotFound { mapping: String, id: String },

    #[error("model lookup failed: {0}")]
    Model(String),

    #[error("no attribute named `{0}`")]
    AttributeNotFound(String),

    #[error("no key named `{0}`")]
    KeyNotFound(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
