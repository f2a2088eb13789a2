// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Emit log lines as JSON objects instead of the human readable format.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// Thresholds used by the fuzzy string matcher and the candidate generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// A match requires an edit distance strictly below this value.
    pub max_edit_distance: usize,
    /// One edit is tolerated per `length_divisor` characters of the candidate.
    pub length_divisor: usize,
    /// Only the first N albums of an artist's catalog are searched for candidates.
    pub max_albums_per_artist: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_edit_distance: 5,
            length_divisor: 5,
            max_albums_per_artist: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Progress is reported every N items (and on the last item of a pass).
    pub progress_interval: usize,
    pub persist_catalog_cache: bool,
    pub catalog_cache_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progress_interval: 25,
            persist_catalog_cache: false,
            catalog_cache_path: PathBuf::from("tagscrub-catalog.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    /// Byte offset of the window compared for duplicate detection.
    pub probe_offset: u64,
    pub probe_len: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ["mp3", "mp4", "m4a", "ogg", "flac"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            probe_offset: 100_000,
            probe_len: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub top_albums_limit: u32,
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            request_delay_ms: 100,
            max_retries: 3,
            retry_delay_ms: 2_000,
            top_albums_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicBrainzConfig {
    pub base_url: Option<String>,
    pub rate_limit_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub search_limit: u32,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            rate_limit_ms: 1_000,
            max_retries: 3,
            retry_delay_ms: 2_000,
            search_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcoustidConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub fpcalc_path: PathBuf,
    pub min_score: f32,
    pub rate_limit_ms: u64,
}

impl Default for AcoustidConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            fpcalc_path: PathBuf::from("fpcalc"),
            min_score: 0.5,
            rate_limit_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub matching: MatchingConfig,
    pub pipeline: PipelineConfig,
    pub scan: ScanConfig,
    pub lastfm: LastFmConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub acoustid: AcoustidConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: TAGSCRUB_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("TAGSCRUB_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = AppConfig::default();
        assert_eq!(config.matching.max_edit_distance, 5);
        assert_eq!(config.matching.length_divisor, 5);
        assert_eq!(config.matching.max_albums_per_artist, 20);
        assert_eq!(config.scan.probe_offset, 100_000);
        assert!(config.scan.extensions.contains(&"flac".to_string()));
        assert!(!config.pipeline.persist_catalog_cache);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("tagscrub.toml");
        fs::write(
            &path,
            "[matching]\nmax_albums_per_artist = 3\n\n[lastfm]\napi_key = \"abc\"\n",
        )
        .expect("config file should be written");

        let config = load(Some(&path)).expect("config should load");

        assert_eq!(config.matching.max_albums_per_artist, 3);
        assert_eq!(config.matching.max_edit_distance, 5);
        assert_eq!(config.lastfm.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_toml_file_falls_back_to_defaults() {
        let config = load(Some(Path::new("does-not-exist.toml"))).expect("config should load");
        assert_eq!(config.telemetry.log_level, "info");
    }
}
