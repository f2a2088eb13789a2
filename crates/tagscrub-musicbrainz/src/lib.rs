// SPDX-License-Identifier: GPL-3.0-or-later

//! MusicBrainz artist search, used to correct misspelled artist names.
//!
//! The client observes the MusicBrainz rate limit (one request per second for
//! anonymous use) and retries transient failures a bounded number of times.

pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use client::{MusicBrainzClient, MusicBrainzClientBuilder};
pub use error::{MusicBrainzError, Result};
pub use models::{Artist, ArtistSearchResult, SearchQuery, SearchResponse};
pub use rate_limiter::RateLimiter;
