use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_URL: &str = "http://localhost:9200";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Where the engine lives and what to target by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub index: Option<String>,
    pub doctype: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { url: DEFAULT_URL.to_string(), timeout_secs: DEFAULT_TIMEOUT_SECS, index: None, doctype: None }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SEARCHKIT_URL`, `SEARCHKIT_TIMEOUT_SECS`,
    /// `SEARCHKIT_INDEX` and `SEARCHKIT_DOCTYPE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads a JSON file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Configuration(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("SEARCHKIT_URL") {
            config.url = url;
        }
        if let Some(timeout) = lookup("SEARCHKIT_TIMEOUT_SECS") {
            config.timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|_| Error::Configuration(format!("SEARCHKIT_TIMEOUT_SECS is not a number: {timeout}")))?;
        }
        config.index = lookup("SEARCHKIT_INDEX").filter(|s| !s.is_empty()).or(config.index);
        config.doctype = lookup("SEARCHKIT_DOCTYPE").filter(|s| !s.is_empty()).or(config.doctype);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::Configuration("engine url is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration("timeout must be at least one second".into()));
        }
        Ok(())
    }
}
