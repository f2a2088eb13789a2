// SPDX-License-Identifier: GPL-3.0-or-later
pub mod adapters;
pub mod candidate_cache;
pub mod catalog_cache;
pub mod collaborators;
pub mod document;
pub mod events;
pub mod organize;
pub mod pipeline;
pub mod reconciler;
pub mod scan;
pub mod session;
pub mod string_matching;
pub mod tags;

pub use adapters::{artist_from_catalog, AcoustidLookup, LastFmCatalog, MusicBrainzCorrector};
pub use candidate_cache::{AlbumGuess, AlbumMember, CandidateCache, TrackGuess};
pub use catalog_cache::{CatalogCache, CatalogStore, CatalogStoreError, JsonFileCatalogStore, NoCatalogStore};
pub use collaborators::{ArtistNameCorrector, CatalogSource, CollaboratorError, Correction, FingerprintLookup};
pub use document::{export_items, import_items, parse_items, render_items, DocumentError, ImportMode};
pub use events::{NoProgress, ProgressEvent, ProgressSink, RecordingProgress};
pub use organize::{organize_items, OrganizeSummary};
pub use pipeline::{IdentificationPipeline, PipelineError, PipelineSummary};
pub use reconciler::{reconcile, ReconcileReport};
pub use scan::{scan_audio_files, ScanError, ScannedAudioFile};
pub use session::{ScrubSession, SessionError, WriteSummary};
pub use string_matching::{
    album_kind, artist_matches, edit_distance, normalize_for_comparison, remove_track_junk, strip_parentheticals,
    track_matches, AlbumKind, MatchKind, MatchThresholds,
};
pub use tags::{LoftyTagStore, TagError, TagStore};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tagscrub_config::AppConfig;
use tagscrub_fingerprint::{AcoustidClient, AcoustidIdentifier, FingerprintGenerator};
use tagscrub_lastfm::LastFmClient;
use tagscrub_musicbrainz::MusicBrainzClient;
use tracing::info;

/// Wire the production collaborators from configuration.
pub fn build_pipeline(config: &AppConfig) -> Result<IdentificationPipeline> {
    let musicbrainz = {
        let mut builder = MusicBrainzClient::builder()
            .rate_limit_interval(Duration::from_millis(config.musicbrainz.rate_limit_ms))
            .max_retries(config.musicbrainz.max_retries)
            .retry_delay(Duration::from_millis(config.musicbrainz.retry_delay_ms));
        if let Some(base_url) = &config.musicbrainz.base_url {
            builder = builder.base_url(base_url.clone());
        }
        builder.build().context("failed to build MusicBrainz client")?
    };

    let lastfm_key = config
        .lastfm
        .api_key
        .clone()
        .context("lastfm.api_key is required for identification")?;
    let lastfm = LastFmClient::new(lastfm_key, config.lastfm.base_url.clone())
        .with_request_delay(Duration::from_millis(config.lastfm.request_delay_ms))
        .with_retry_policy(config.lastfm.max_retries, Duration::from_millis(config.lastfm.retry_delay_ms))
        .with_top_albums_limit(config.lastfm.top_albums_limit);

    let acoustid_key = config
        .acoustid
        .api_key
        .clone()
        .context("acoustid.api_key is required for identification")?;
    let acoustid = {
        let mut builder = AcoustidClient::builder(acoustid_key)
            .rate_limit_interval(Duration::from_millis(config.acoustid.rate_limit_ms));
        if let Some(base_url) = &config.acoustid.base_url {
            builder = builder.base_url(base_url.clone());
        }
        builder.build().context("failed to build AcoustID client")?
    };
    let identifier = AcoustidIdentifier::new(
        FingerprintGenerator::new(config.acoustid.fpcalc_path.clone()),
        acoustid,
        config.acoustid.min_score,
    );

    let store: Arc<dyn CatalogStore> = if config.pipeline.persist_catalog_cache {
        Arc::new(JsonFileCatalogStore::new(config.pipeline.catalog_cache_path.clone()))
    } else {
        Arc::new(NoCatalogStore)
    };

    info!(target: "pipeline", persist_catalog_cache = config.pipeline.persist_catalog_cache, "identification pipeline ready");

    Ok(IdentificationPipeline::new(
        Arc::new(MusicBrainzCorrector::new(musicbrainz, config.musicbrainz.search_limit)),
        Arc::new(LastFmCatalog::new(lastfm)),
        Arc::new(AcoustidLookup::new(identifier)),
    )
    .with_catalog_store(store)
    .with_matching(&config.matching)
    .with_progress_interval(config.pipeline.progress_interval))
}
