//! Local Cache
//!
//! Small JSON key/value file standing in for browser storage. Holds
//! favorites, the last fetched advice and the last daily article. Nothing
//! here is authoritative; losing the file only loses convenience.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FAVORITES_KEY: &str = "favorites";
pub const ADVICE_KEY: &str = "advice";
pub const DAILY_ARTICLE_KEY: &str = "dailyArticle";

const CACHE_FILE: &str = "cache.json";

/// Errors that can occur while persisting the cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-backed key/value store
#[derive(Debug)]
pub struct LocalCache {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl LocalCache {
    /// Open the cache in `dir`. A missing or unreadable file yields an
    /// empty cache.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(CACHE_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Map<String, Value>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Ignoring corrupt cache file");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read cache file");
                Map::new()
            }
        };

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
