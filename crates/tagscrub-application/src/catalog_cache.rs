// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-run memo of spelling corrections and artist catalogs, with optional
//! persistence between runs.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tagscrub_domain::Artist;
use thiserror::Error;
use tracing::{debug, warn};

use crate::collaborators::Correction;

#[derive(Debug, Error)]
pub enum CatalogStoreError {
    #[error("catalog cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("catalog cache at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Memo owned by one pipeline run.
///
/// Corrections are keyed by the observed artist string, catalogs by the
/// corrected artist name. Network failures are never memoized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogCache {
    /// `None` records a definite "not found".
    #[serde(default)]
    corrections: BTreeMap<String, Option<String>>,
    #[serde(default)]
    catalogs: BTreeMap<String, Artist>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correction(&self, observed: &str) -> Option<Correction> {
        self.corrections.get(observed).map(|stored| match stored {
            Some(name) => Correction::Suggested(name.clone()),
            None => Correction::NotFound,
        })
    }

    pub fn remember_correction(&mut self, observed: &str, correction: &Correction) {
        let stored = match correction {
            Correction::NetworkFailed => return,
            Correction::NotFound => None,
            Correction::Suggested(name) => Some(name.clone()),
        };
        self.corrections.insert(observed.to_string(), stored);
    }

    pub fn catalog(&self, artist: &str) -> Option<&Artist> {
        self.catalogs.get(artist)
    }

    pub fn remember_catalog(&mut self, artist: &str, catalog: Artist) {
        self.catalogs.insert(artist.to_string(), catalog);
    }

    pub fn len(&self) -> usize {
        self.corrections.len() + self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a [`CatalogCache`] lives between runs.
pub trait CatalogStore: Send + Sync {
    /// `Ok(None)` when nothing was stored yet.
    fn load(&self) -> Result<Option<CatalogCache>, CatalogStoreError>;
    fn save(&self, cache: &CatalogCache) -> Result<(), CatalogStoreError>;
}

/// Store that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCatalogStore;

impl CatalogStore for NoCatalogStore {
    fn load(&self) -> Result<Option<CatalogCache>, CatalogStoreError> {
        Ok(None)
    }

    fn save(&self, _cache: &CatalogCache) -> Result<(), CatalogStoreError> {
        Ok(())
    }
}

/// JSON file store. A file that fails to parse is deleted.
#[derive(Debug, Clone)]
pub struct JsonFileCatalogStore {
    path: PathBuf,
}

impl JsonFileCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> CatalogStoreError {
        CatalogStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CatalogStore for JsonFileCatalogStore {
    fn load(&self) -> Result<Option<CatalogCache>, CatalogStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        match serde_json::from_str::<CatalogCache>(&contents) {
            Ok(cache) => {
                debug!(
                    target: "catalog",
                    path = %self.path.display(),
                    entries = cache.len(),
                    "loaded catalog cache"
                );
                Ok(Some(cache))
            }
            Err(source) => {
                if let Err(err) = fs::remove_file(&self.path) {
                    warn!(
                        target: "catalog",
                        path = %self.path.display(),
                        error = %err,
                        "failed to remove corrupt catalog cache"
                    );
                }
                Err(CatalogStoreError::Corrupt {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn save(&self, cache: &CatalogCache) -> Result<(), CatalogStoreError> {
        let json = serde_json::to_string(cache)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        fs::write(&self.path, json).map_err(|err| self.io_error(err))?;
        debug!(
            target: "catalog",
            path = %self.path.display(),
            entries = cache.len(),
            "saved catalog cache"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagscrub_domain::Album;
    use tempfile::TempDir;

    fn sample_cache() -> CatalogCache {
        let mut cache = CatalogCache::new();
        cache.remember_correction("ozzy osborne", &Correction::Suggested("Ozzy Osbourne".into()));
        cache.remember_correction("zzzz", &Correction::NotFound);
        cache.remember_catalog(
            "Ozzy Osbourne",
            Artist::new("Ozzy Osbourne").with_album(
                Album::new("Ozzy Osbourne", "Blizzard of Ozz", 1000).with_track("Crazy Train", Some(1)),
            ),
        );
        cache
    }

    #[test]
    fn network_failures_are_not_memoized() {
        let mut cache = CatalogCache::new();
        cache.remember_correction("nirvana", &Correction::NetworkFailed);

        assert!(cache.correction("nirvana").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn corrections_round_trip_through_memo() {
        let cache = sample_cache();
        assert_eq!(
            cache.correction("ozzy osborne"),
            Some(Correction::Suggested("Ozzy Osbourne".into()))
        );
        assert_eq!(cache.correction("zzzz"), Some(Correction::NotFound));
        assert_eq!(cache.catalog("Ozzy Osbourne").map(|a| a.albums.len()), Some(1));
    }

    #[test]
    fn json_store_saves_and_loads() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileCatalogStore::new(dir.path().join("nested").join("catalog.json"));

        assert!(store.load().unwrap().is_none());

        let cache = sample_cache();
        store.save(&cache).unwrap();

        assert_eq!(store.load().unwrap(), Some(cache));
    }

    #[test]
    fn json_store_removes_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileCatalogStore::new(&path);

        let result = store.load();

        assert!(matches!(result, Err(CatalogStoreError::Corrupt { .. })));
        assert!(!path.exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn no_store_keeps_nothing() {
        let store = NoCatalogStore;
        store.save(&sample_cache()).unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
