// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{FingerprintError, Result};
use crate::fingerprint::Fingerprint;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};
use url::Url;

const ACOUSTID_API_BASE: &str = "https://api.acoustid.org/v2";
const USER_AGENT: &str = concat!("tagscrub/", env!("CARGO_PKG_VERSION"));

/// A MusicBrainz recording matched by a fingerprint, carrying the score of
/// the AcoustID result it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingMatch {
    /// MusicBrainz recording ID.
    pub id: String,
    pub title: Option<String>,
    pub artists: Vec<RecordingArtist>,
    pub releases: Vec<ReleaseInfo>,
    /// Match score (0-1), higher is more confident.
    pub score: f32,
}

impl RecordingMatch {
    /// Artist credit joined the way it is printed on releases.
    pub fn artist_credit(&self) -> Option<String> {
        if self.artists.is_empty() {
            return None;
        }

        let mut credit = String::new();
        for (index, artist) in self.artists.iter().enumerate() {
            credit.push_str(&artist.name);
            if index + 1 < self.artists.len() {
                credit.push_str(artist.joinphrase.as_deref().unwrap_or(", "));
            }
        }
        Some(credit)
    }

    /// First release listing this recording, with the track's position on it.
    ///
    /// AcoustID only lists the matched track under each release medium.
    pub fn first_release_position(&self) -> Option<(&ReleaseInfo, Option<u32>)> {
        let release = self.releases.first()?;
        let position = release
            .mediums
            .iter()
            .flat_map(|medium| medium.tracks.iter())
            .find_map(|track| track.position);
        Some((release, position))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub joinphrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mediums: Vec<MediumInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediumInfo {
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub track_count: Option<u32>,
    #[serde(default)]
    pub tracks: Vec<MediumTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediumTrack {
    /// Track (not recording) id.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
}

/// AcoustID API client for fingerprint lookup.
#[derive(Debug, Clone)]
pub struct AcoustidClient {
    client: Client,
    base_url: String,
    api_key: String,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl AcoustidClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> AcoustidClientBuilder {
        AcoustidClientBuilder::new(api_key)
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Every recording of every result, unfiltered.
    async fn lookup_raw(&self, fingerprint: &Fingerprint) -> Result<Vec<RecordingMatch>> {
        fingerprint.validate()?;

        let mut url = Url::parse(&format!("{}/lookup", self.base_url))
            .map_err(|e| FingerprintError::InvalidResponse(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("client", &self.api_key)
            .append_pair("format", "json")
            .append_pair("fingerprint", &fingerprint.hash)
            .append_pair("duration", &fingerprint.duration.to_string())
            .append_pair("meta", "recordings releases tracks");

        trace!(target: "fingerprint", "AcoustID lookup: {}", url);
        self.throttle().await;

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        debug!(target: "fingerprint", "AcoustID response status: {}", status);

        let body = response.text().await?;
        trace!(target: "fingerprint", "AcoustID response: {}", body);

        let api_response: AcoustidResponse = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                FingerprintError::SerializationError(e)
            } else {
                FingerprintError::AcoustidError(format!("HTTP {}: {}", status, body))
            }
        })?;

        if !api_response.status.eq_ignore_ascii_case("ok") {
            return Err(FingerprintError::AcoustidError(
                api_response
                    .error
                    .map(|error| error.message)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(api_response
            .results
            .into_iter()
            .flat_map(|result| {
                let score = result.score;
                result.recordings.into_iter().map(move |recording| RecordingMatch {
                    id: recording.id,
                    title: recording.title,
                    artists: recording.artists,
                    releases: recording.releases,
                    score,
                })
            })
            .collect())
    }

    /// Matching recordings scoring at least `min_score`.
    ///
    /// # Example
    /// ```no_run
    /// # use tagscrub_fingerprint::{AcoustidClient, Fingerprint};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = AcoustidClient::new("your-api-key")?;
    /// let fp = Fingerprint::new("AQADvEWZ", 120);
    /// let matches = client.lookup(&fp, 0.7).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn lookup(&self, fingerprint: &Fingerprint, min_score: f32) -> Result<Vec<RecordingMatch>> {
        check_min_score(min_score)?;

        Ok(self
            .lookup_raw(fingerprint)
            .await?
            .into_iter()
            .filter(|m| m.score >= min_score)
            .collect())
    }

    /// The highest scoring recording.
    ///
    /// # Errors
    /// - `NoMatches` if AcoustID knows no recording for the fingerprint.
    /// - `LowConfidence` if the best score is below `min_score`.
    pub async fn lookup_best(&self, fingerprint: &Fingerprint, min_score: f32) -> Result<RecordingMatch> {
        check_min_score(min_score)?;

        let best = self
            .lookup_raw(fingerprint)
            .await?
            .into_iter()
            .fold(None::<RecordingMatch>, |best, candidate| match best {
                Some(current) if current.score >= candidate.score => Some(current),
                _ => Some(candidate),
            })
            .ok_or(FingerprintError::NoMatches)?;

        if best.score >= min_score {
            Ok(best)
        } else {
            Err(FingerprintError::LowConfidence { score: best.score })
        }
    }
}

fn check_min_score(min_score: f32) -> Result<()> {
    if (0.0..=1.0).contains(&min_score) {
        Ok(())
    } else {
        Err(FingerprintError::AcoustidError(
            "Invalid parameter: min_score must be between 0.0 and 1.0".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct AcoustidResponse {
    status: String,
    #[serde(default)]
    results: Vec<AcoustidResult>,
    #[serde(default)]
    error: Option<AcoustidErrorBody>,
}

#[derive(Debug, Deserialize)]
struct AcoustidErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AcoustidResult {
    score: f32,
    #[serde(default)]
    recordings: Vec<AcoustidRecording>,
}

#[derive(Debug, Deserialize)]
struct AcoustidRecording {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artists: Vec<RecordingArtist>,
    #[serde(default)]
    releases: Vec<ReleaseInfo>,
}

#[derive(Debug)]
pub struct AcoustidClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
    min_interval: Duration,
}

impl AcoustidClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ACOUSTID_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            min_interval: Duration::from_secs(1),
        }
    }

    /// Set a custom base URL (useful for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum spacing between lookups.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn build(self) -> Result<AcoustidClient> {
        Url::parse(&self.base_url)
            .map_err(|e| FingerprintError::AcoustidError(format!("Invalid base URL: {}", e)))?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(AcoustidClient {
            client,
            base_url: self.base_url,
            api_key: self.api_key,
            min_interval: self.min_interval,
            last_request: Arc::new(Mutex::new(None)),
        })
    }
}
