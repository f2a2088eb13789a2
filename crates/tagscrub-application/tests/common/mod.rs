// SPDX-License-Identifier: GPL-3.0-or-later
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tagscrub_application::{
    ArtistNameCorrector, CatalogCache, CatalogSource, CatalogStore, CatalogStoreError, CollaboratorError, Correction,
    FingerprintLookup, IdentificationPipeline, TagError, TagStore,
};
use tagscrub_domain::{Album, Artist, TagFields};

#[derive(Default)]
pub struct FakeCorrector {
    answers: HashMap<String, Correction>,
    calls: AtomicUsize,
}

impl FakeCorrector {
    pub fn with(mut self, observed: &str, correction: Correction) -> Self {
        self.answers.insert(observed.to_string(), correction);
        self
    }

    pub fn suggest(self, observed: &str, suggestion: &str) -> Self {
        self.with(observed, Correction::Suggested(suggestion.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtistNameCorrector for FakeCorrector {
    async fn correct_artist_name(&self, observed: &str) -> Correction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers.get(observed).cloned().unwrap_or(Correction::NotFound)
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    artists: HashMap<String, Artist>,
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_artist(mut self, artist: Artist) -> Self {
        self.artists.insert(artist.name.clone(), artist);
        self
    }

    pub fn failing_for(mut self, artist: &str) -> Self {
        self.failing.push(artist.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_artist_catalog(&self, artist: &str) -> Result<Artist, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|name| name == artist) {
            return Err(CollaboratorError::Network("connection reset".to_string()));
        }
        Ok(self
            .artists
            .get(artist)
            .cloned()
            .unwrap_or_else(|| Artist::empty(artist)))
    }
}

#[derive(Default)]
pub struct FakeFingerprint {
    answers: HashMap<PathBuf, TagFields>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeFingerprint {
    pub fn with(mut self, path: &str, fields: TagFields) -> Self {
        self.answers.insert(PathBuf::from(path), fields);
        self
    }

    pub fn looked_up(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FingerprintLookup for FakeFingerprint {
    async fn fingerprint_and_lookup(&self, path: &Path) -> Option<TagFields> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        self.answers.get(path).cloned()
    }
}

/// Catalog store kept in memory, counting saves.
#[derive(Default)]
pub struct MemoryCatalogStore {
    pub stored: Mutex<Option<CatalogCache>>,
    pub saves: AtomicUsize,
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self) -> Result<Option<CatalogCache>, CatalogStoreError> {
        Ok(self.stored.lock().unwrap().clone())
    }

    fn save(&self, cache: &CatalogCache) -> Result<(), CatalogStoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(cache.clone());
        Ok(())
    }
}

/// Tag store over a map; paths without an entry fail to read.
#[derive(Default)]
pub struct MemoryTagStore {
    pub tags: Mutex<HashMap<PathBuf, TagFields>>,
}

impl MemoryTagStore {
    pub fn insert(&self, path: &Path, fields: TagFields) {
        self.tags.lock().unwrap().insert(path.to_path_buf(), fields);
    }

    pub fn get(&self, path: &Path) -> Option<TagFields> {
        self.tags.lock().unwrap().get(path).cloned()
    }
}

impl TagStore for MemoryTagStore {
    fn read_tags(&self, path: &Path) -> Result<TagFields, TagError> {
        self.get(path)
            .ok_or_else(|| TagError::FileNotFound(path.to_path_buf()))
    }

    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), TagError> {
        self.insert(path, fields.clone());
        Ok(())
    }
}

pub fn ozzy_catalog() -> Artist {
    Artist::new("Ozzy Osbourne")
        .with_album(
            Album::new("Ozzy Osbourne", "Blizzard of Ozz", 100)
                .with_track("I Don't Know", Some(1))
                .with_track("Crazy Train (Remastered)", Some(2))
                .with_track("Goodbye to Romance", Some(3)),
        )
        .with_album(
            Album::new("Ozzy Osbourne", "Tribute", 10)
                .with_track("I Don't Know (Live)", Some(1))
                .with_track("Crazy Train (Live)", Some(2))
                .with_track("Believer", Some(3))
                .with_track("Mr. Crowley", Some(4)),
        )
        .with_album(Album::new("Ozzy Osbourne", "", 5).with_track("Crazy Train", Some(9)))
}

pub fn nirvana_catalog() -> Artist {
    Artist::new("Nirvana").with_album(
        Album::new("Nirvana", "Nevermind", 500)
            .with_track("Smells Like Teen Spirit", Some(1))
            .with_track("In Bloom", Some(2))
            .with_track("Come as You Are", Some(3)),
    )
}

pub struct Harness {
    pub corrector: Arc<FakeCorrector>,
    pub catalog: Arc<FakeCatalog>,
    pub fingerprint: Arc<FakeFingerprint>,
    pub store: Arc<MemoryCatalogStore>,
}

impl Harness {
    pub fn new(corrector: FakeCorrector, catalog: FakeCatalog, fingerprint: FakeFingerprint) -> Self {
        Self {
            corrector: Arc::new(corrector),
            catalog: Arc::new(catalog),
            fingerprint: Arc::new(fingerprint),
            store: Arc::new(MemoryCatalogStore::default()),
        }
    }

    pub fn pipeline(&self) -> IdentificationPipeline {
        IdentificationPipeline::new(self.corrector.clone(), self.catalog.clone(), self.fingerprint.clone())
            .with_catalog_store(self.store.clone())
    }
}
