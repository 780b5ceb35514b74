//! # Distributed Maps
//!
//! Named key/value maps shared by every node of the cluster. Handlers keep
//! synchronized state here (configurations per group, for instance) and
//! announce changes with events.
//!
//! The contract is read-your-writes on the local node. Nothing stronger is
//! promised across nodes.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Errors from typed map access.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("Failed to encode entry {key} of map {map}: {source}")]
    Encode {
        map: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode entry {key} of map {map}: {source}")]
    Decode {
        map: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Access to the cluster's named maps.
pub trait DistributedMaps: Send + Sync {
    /// Get the map called `name`, creating it empty on first use.
    fn get_map(&self, name: &str) -> Arc<ClusterMap>;

    /// Names of every map created so far, sorted.
    fn map_names(&self) -> Vec<String>;
}

/// One named map. Values are stored as JSON so any serde type fits.
#[derive(Debug)]
pub struct ClusterMap {
    name: String,
    entries: DashMap<String, serde_json::Value>,
}

impl ClusterMap {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read and decode the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, MapError> {
        let Some(value) = self.entries.get(key).map(|v| v.value().clone()) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| MapError::Decode {
                map: self.name.clone(),
                key: key.to_string(),
                source,
            })
    }

    /// Encode and store `value` under `key`, replacing any previous value.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), MapError> {
        let encoded = self.encode(key, value)?;
        self.entries.insert(key.to_string(), encoded);
        trace!(map = %self.name, key = key, "Map entry written");
        Ok(())
    }

    /// Atomically replace the value under `key` with `f(current)`.
    ///
    /// The entry stays locked while `f` runs, so concurrent writers on the
    /// same key are serialized. Returning `None` removes the key. The new
    /// value is returned.
    pub fn compute<T, F>(&self, key: &str, f: F) -> Result<Option<T>, MapError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Option<T>,
    {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let current: T =
                    serde_json::from_value(entry.get().clone()).map_err(|source| {
                        MapError::Decode {
                            map: self.name.clone(),
                            key: key.to_string(),
                            source,
                        }
                    })?;
                match f(Some(current)) {
                    Some(next) => {
                        let encoded = self.encode(key, &next)?;
                        entry.insert(encoded);
                        Ok(Some(next))
                    }
                    None => {
                        entry.remove();
                        trace!(map = %self.name, key = key, "Map entry removed");
                        Ok(None)
                    }
                }
            }
            Entry::Vacant(entry) => match f(None) {
                Some(next) => {
                    let encoded = self.encode(key, &next)?;
                    entry.insert(encoded);
                    trace!(map = %self.name, key = key, "Map entry written");
                    Ok(Some(next))
                }
                None => Ok(None),
            },
        }
    }

    /// Keys and decoded values of every entry, sorted by key.
    pub fn entries<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>, MapError> {
        let mut out = Vec::with_capacity(self.entries.len());
        for key in self.keys() {
            if let Some(value) = self.get(&key)? {
                out.push((key, value));
            }
        }
        Ok(out)
    }

    fn encode<T: Serialize>(&self, key: &str, value: &T) -> Result<serde_json::Value, MapError> {
        serde_json::to_value(value).map_err(|source| MapError::Encode {
            map: self.name.clone(),
            key: key.to_string(),
            source,
        })
    }

    /// Remove `key`. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys currently stored, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps held in this process, shared by every node attached to it.
#[derive(Debug, Default)]
pub struct InMemoryMaps {
    maps: DashMap<String, Arc<ClusterMap>>,
}

impl InMemoryMaps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DistributedMaps for InMemoryMaps {
    fn get_map(&self, name: &str) -> Arc<ClusterMap> {
        self.maps
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ClusterMap::new(name)))
            .clone()
    }

    fn map_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.maps.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
