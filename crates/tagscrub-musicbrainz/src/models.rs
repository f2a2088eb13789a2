// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Artist information from MusicBrainz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: Uuid,
    pub name: String,
    /// Disambiguation comment (e.g., "US hip hop artist").
    #[serde(default)]
    pub disambiguation: Option<String>,
    /// Search relevance 0-100, only present in search results.
    #[serde(default)]
    pub score: Option<u32>,
}

/// Search query parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    /// Maximum number of results (default 25, max 100).
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Generic search response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub created: Option<String>,
    pub count: u32,
    pub offset: u32,
    #[serde(flatten)]
    pub results: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistSearchResult {
    #[serde(default)]
    pub artists: Vec<Artist>,
}

impl ArtistSearchResult {
    /// The highest scored artist; the first listed wins ties.
    pub fn best(&self) -> Option<&Artist> {
        self.artists.iter().fold(None, |best: Option<&Artist>, artist| match best {
            Some(current) if current.score.unwrap_or(0) >= artist.score.unwrap_or(0) => {
                Some(current)
            }
            _ => Some(artist),
        })
    }
}
