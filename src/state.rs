//! Persisted per-resource state.
//!
//! Each resource id owns a flat JSON object of keys. Values written by a
//! build survive until the next build overwrites them or the resource is torn
//! down with [`StateStore::remove`].

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde_json::{Map, Value};

use crate::error::StateError;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Whether any state was recorded for `id`.
    async fn contains(&self, id: &str) -> Result<bool, StateError>;

    async fn get(&self, id: &str, key: &str) -> Result<Option<Value>, StateError>;

    async fn set(&self, id: &str, key: &str, value: Value) -> Result<(), StateError>;

    /// Drop all state recorded for `id`.
    async fn remove(&self, id: &str) -> Result<(), StateError>;
}

/// State kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryState {
    resources: Mutex<HashMap<String, Map<String, Value>>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryState {
    async fn contains(&self, id: &str) -> Result<bool, StateError> {
        let resources = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(resources.contains_key(id))
    }

    async fn get(&self, id: &str, key: &str) -> Result<Option<Value>, StateError> {
        let resources = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(resources.get(id).and_then(|state| state.get(key)).cloned())
    }

    async fn set(&self, id: &str, key: &str, value: Value) -> Result<(), StateError> {
        let mut resources = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        resources
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StateError> {
        let mut resources = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        resources.remove(id);
        Ok(())
    }
}

/// State stored as one JSON document per resource under a root directory,
/// e.g. `.state/handler.json`.
#[derive(Debug, Clone)]
pub struct FileState {
    root: Utf8PathBuf,
}

impl FileState {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> Utf8PathBuf {
        let name: String = id
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
                _ => '_',
            })
            .collect();

        self.root.join(format!("{name}.json"))
    }

    async fn read(&self, id: &str) -> Result<Option<Map<String, Value>>, StateError> {
        let path = self.path_for(id);

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: path.into(),
                    source,
                });
            }
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StateError::Serde {
                key: id.to_string(),
                source,
            })
    }
}

#[async_trait]
impl StateStore for FileState {
    async fn contains(&self, id: &str) -> Result<bool, StateError> {
        Ok(self.read(id).await?.is_some())
    }

    async fn get(&self, id: &str, key: &str) -> Result<Option<Value>, StateError> {
        Ok(self.read(id).await?.and_then(|mut state| state.remove(key)))
    }

    async fn set(&self, id: &str, key: &str, value: Value) -> Result<(), StateError> {
        let mut state = self.read(id).await?.unwrap_or_default();
        state.insert(key.to_string(), value);

        let text = serde_json::to_string_pretty(&state).map_err(|source| StateError::Serde {
            key: key.to_string(),
            source,
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StateError::Io {
                path: self.root.clone().into(),
                source,
            })?;

        let path = self.path_for(id);
        tokio::fs::write(&path, text)
            .await
            .map_err(|source| StateError::Io {
                path: path.into(),
                source,
            })
    }

    async fn remove(&self, id: &str) -> Result<(), StateError> {
        let path = self.path_for(id);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Io {
                path: path.into(),
                source,
            }),
        }
    }
}
