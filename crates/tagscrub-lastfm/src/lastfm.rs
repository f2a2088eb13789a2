// SPDX-License-Identifier: GPL-3.0-or-later

//! Last.fm API client implementation

use moka::sync::Cache;
use reqwest::{Client, StatusCode};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0";
/// Last.fm error code for an unknown artist or album.
const LASTFM_NOT_FOUND: i64 = 6;

/// Struct representing the Last.fm API client.
pub struct LastFmClient {
    api_key: String,
    client: Client,
    rate_limiter: Arc<Semaphore>,
    request_delay: Duration,
    max_retries: u32,
    retry_delay: Duration,
    top_albums_limit: u32,
    cache_catalog: Cache<String, Catalog>,
    /// Base URL stored without a trailing slash.
    base_url: String,
}

impl LastFmClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("tagscrub/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|error| {
                debug!(
                    target: "lastfm",
                    ?error,
                    "failed to build Last.fm HTTP client with custom settings, falling back to default client"
                );
                Client::new()
            });

        let base_url = base_url
            .unwrap_or_else(|| LASTFM_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        debug!(target: "lastfm", base_url = %base_url, "initialized Last.fm client");

        Self {
            api_key,
            client,
            rate_limiter: Arc::new(Semaphore::new(1)),
            request_delay: Duration::from_millis(100),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            top_albums_limit: 20,
            cache_catalog: Cache::new(10_000),
            base_url,
        }
    }

    /// Pause observed after every request.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_top_albums_limit(mut self, limit: u32) -> Self {
        self.top_albums_limit = limit.max(1);
        self
    }

    /// First artist returned by `artist.search`, if any.
    #[instrument(skip(self), fields(artist = artist_name))]
    pub async fn search_artist(&self, artist_name: &str) -> Result<Option<ArtistMatch>, LastFmError> {
        let value = match self
            .call(&[("method", "artist.search"), ("artist", artist_name), ("limit", "5")])
            .await
        {
            Ok(value) => value,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let response: ArtistSearchResponse = serde_json::from_value(value)?;
        Ok(response
            .results
            .and_then(|results| results.artistmatches)
            .and_then(|matches| matches.artist.into_vec().into_iter().next()))
    }

    /// An artist's albums, most popular first.
    #[instrument(skip(self), fields(artist = artist_name))]
    pub async fn top_albums(&self, artist_name: &str, limit: u32) -> Result<Vec<TopAlbum>, LastFmError> {
        let limit = limit.to_string();
        let value = match self
            .call(&[
                ("method", "artist.gettopalbums"),
                ("artist", artist_name),
                ("limit", &limit),
            ])
            .await
        {
            Ok(value) => value,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let response: TopAlbumsResponse = serde_json::from_value(value)?;
        Ok(response
            .topalbums
            .map(|top| top.album.into_vec())
            .unwrap_or_default())
    }

    /// Track listing for one album; `None` when Last.fm does not know it.
    #[instrument(skip(self), fields(artist = artist_name, album = album_name))]
    pub async fn album_info(
        &self,
        artist_name: &str,
        album_name: &str,
    ) -> Result<Option<AlbumInfo>, LastFmError> {
        let value = match self
            .call(&[
                ("method", "album.getinfo"),
                ("artist", artist_name),
                ("album", album_name),
                ("autocorrect", "1"),
            ])
            .await
        {
            Ok(value) => value,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        let response: AlbumInfoResponse = serde_json::from_value(value)?;
        Ok(response.album)
    }

    /// The full catalog for an artist: top albums with their track listings.
    ///
    /// An unknown artist yields an empty catalog rather than an error.
    #[instrument(skip(self), fields(artist = artist_name))]
    pub async fn fetch_catalog(&self, artist_name: &str) -> Result<Catalog, LastFmError> {
        let cache_key = artist_name.to_lowercase();
        if let Some(cached) = self.cache_catalog.get(&cache_key) {
            debug!(target: "lastfm", artist = artist_name, "catalog served from cache");
            return Ok(cached);
        }

        let Some(found) = self.search_artist(artist_name).await? else {
            debug!(target: "lastfm", artist = artist_name, "artist not found");
            let empty = Catalog::empty(artist_name);
            self.cache_catalog.insert(cache_key, empty.clone());
            return Ok(empty);
        };

        let mut catalog = Catalog::empty(&found.name);
        for top in self.top_albums(&found.name, self.top_albums_limit).await? {
            if top.name.trim().is_empty() {
                continue;
            }

            let tracks = match self.album_info(&found.name, &top.name).await? {
                Some(info) => info.track_names(),
                None => Vec::new(),
            };

            catalog.albums.push(CatalogAlbum {
                name: top.name,
                mbid: top.mbid.filter(|mbid| !mbid.is_empty()),
                playcount: top.playcount,
                tracks,
            });
        }

        debug!(
            target: "lastfm",
            artist = %catalog.artist,
            albums = catalog.albums.len(),
            "catalog fetched"
        );
        self.cache_catalog.insert(cache_key, catalog.clone());
        Ok(catalog)
    }

    /// One API call with bounded retries on transient failures.
    async fn call(&self, params: &[(&str, &str)]) -> Result<Value, LastFmError> {
        let mut attempt = 0;
        loop {
            match self.call_once(params).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        target: "lastfm",
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "transient Last.fm failure, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn call_once(&self, params: &[(&str, &str)]) -> Result<Value, LastFmError> {
        let url = format!("{}/", self.base_url);
        let response = {
            let _permit = self
                .rate_limiter
                .acquire()
                .await
                .map_err(|_| LastFmError::RateLimiterClosed)?;
            let response = self
                .client
                .get(&url)
                .query(params)
                .query(&[("api_key", self.api_key.as_str()), ("format", "json")])
                .send()
                .await;
            tokio::time::sleep(self.request_delay).await;
            response?
        };

        let status = response.status();
        let body = response.text().await?;
        parse_lastfm_body(status, &body)
    }
}

/// Search hit from `artist.search`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ArtistMatch {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub listeners: u64,
}

/// Entry from `artist.gettopalbums`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TopAlbum {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub playcount: u64,
}

/// Payload of `album.getinfo`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AlbumInfo {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    #[serde(default)]
    tracks: Option<AlbumTracks>,
}

impl AlbumInfo {
    /// Track names ordered by their listed position.
    pub fn track_names(&self) -> Vec<String> {
        let Some(tracks) = &self.tracks else {
            return Vec::new();
        };

        let mut listed: Vec<(u64, String)> = tracks
            .track
            .clone()
            .into_vec()
            .into_iter()
            .enumerate()
            .map(|(index, track)| {
                let position = track
                    .attr
                    .map(|attr| attr.rank)
                    .filter(|rank| *rank > 0)
                    .unwrap_or(index as u64 + 1);
                (position, track.name)
            })
            .collect();
        listed.sort_by_key(|(position, _)| *position);
        listed.into_iter().map(|(_, name)| name).collect()
    }
}

/// An artist's catalog assembled from several Last.fm calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub artist: String,
    pub albums: Vec<CatalogAlbum>,
}

impl Catalog {
    pub fn empty(artist: &str) -> Self {
        Self {
            artist: artist.to_string(),
            albums: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogAlbum {
    pub name: String,
    pub mbid: Option<String>,
    pub playcount: u64,
    /// Track names in listing order; position + 1 is the track number.
    pub tracks: Vec<String>,
}

/// Error type returned by the Last.fm API client.
#[derive(Debug, Error)]
pub enum LastFmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    /// Last.fm reported an error in its JSON payload.
    #[error("Last.fm API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
    #[error("Rate limiter closed")]
    RateLimiterClosed,
}

impl LastFmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == LASTFM_NOT_FOUND)
    }

    /// Transport failures, server errors and Last.fm's "try again later" codes.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            // 8: operation failed, 11: service offline, 16: temporary error, 29: rate limit
            Self::Api { code, .. } => matches!(code, 8 | 11 | 16 | 29),
            Self::Deserialization(_) | Self::RateLimiterClosed => false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    results: Option<ArtistSearchResults>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResults {
    artistmatches: Option<ArtistMatches>,
}

#[derive(Debug, Deserialize)]
struct ArtistMatches {
    #[serde(default)]
    artist: OneOrMany<ArtistMatch>,
}

#[derive(Debug, Deserialize)]
struct TopAlbumsResponse {
    topalbums: Option<TopAlbums>,
}

#[derive(Debug, Deserialize)]
struct TopAlbums {
    #[serde(default)]
    album: OneOrMany<TopAlbum>,
}

#[derive(Debug, Deserialize)]
struct AlbumInfoResponse {
    album: Option<AlbumInfo>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct AlbumTracks {
    #[serde(default)]
    track: OneOrMany<AlbumTrack>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct AlbumTrack {
    name: String,
    #[serde(rename = "@attr", default)]
    attr: Option<TrackAttr>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct TrackAttr {
    #[serde(default, deserialize_with = "lenient_u64")]
    rank: u64,
}

/// Last.fm encodes counters as either JSON numbers or strings.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("invalid counter: {number}"))),
        Value::String(text) if text.trim().is_empty() => Ok(0),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid counter: {text}"))),
        Value::Null => Ok(0),
        other => Err(de::Error::custom(format!("invalid counter: {other}"))),
    }
}

fn parse_lastfm_body(status: StatusCode, response_body: &str) -> Result<Value, LastFmError> {
    // Error payloads arrive with non-success statuses too, so look at the body first.
    if let Ok(value) = serde_json::from_str::<Value>(response_body) {
        if let Some(code) = value.get("error").and_then(Value::as_i64) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(LastFmError::Api { code, message });
        }
        if status.is_success() {
            return Ok(value);
        }
    }

    if !status.is_success() {
        return Err(LastFmError::HttpStatus {
            status,
            body: response_body.to_string(),
        });
    }

    Ok(serde_json::from_str(response_body)?)
}
