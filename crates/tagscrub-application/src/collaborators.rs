// SPDX-License-Identifier: GPL-3.0-or-later

//! Seams between the identification pipeline and the outside world.

use std::path::Path;

use async_trait::async_trait;
use tagscrub_domain::{Artist, TagFields};
use thiserror::Error;

/// Answer of a spelling corrector for one observed artist name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    NetworkFailed,
    NotFound,
    Suggested(String),
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ArtistNameCorrector: Send + Sync {
    async fn correct_artist_name(&self, observed: &str) -> Correction;
}

/// Source of reference catalogs.
///
/// An unknown artist is `Ok(Artist::empty(name))`, not an error.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_artist_catalog(&self, artist: &str) -> Result<Artist, CollaboratorError>;
}

#[async_trait]
pub trait FingerprintLookup: Send + Sync {
    /// Identify a file from its audio content; `None` when nothing usable came back.
    async fn fingerprint_and_lookup(&self, path: &Path) -> Option<TagFields>;
}
