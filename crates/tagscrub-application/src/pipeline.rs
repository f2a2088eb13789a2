// SPDX-License-Identifier: GPL-3.0-or-later

//! Three-pass identification of noisy items.
//!
//! 1. Correct each artist name and collect candidate (track, album) pairs
//!    from the artist's catalog.
//! 2. Reconcile candidates into one album per track and apply the winners;
//!    everything else falls back to acoustic fingerprinting.
//! 3. Rebuild candidates from the improved fields, reconcile again and
//!    classify every item.

use std::path::Path;
use std::sync::Arc;

use tagscrub_config::{MatchingConfig, PipelineConfig};
use tagscrub_domain::{Artist, IdentifyMethod, Item, QueryResult, TagFields};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::candidate_cache::{AlbumGuess, CandidateCache, TrackGuess};
use crate::catalog_cache::{CatalogCache, CatalogStore, NoCatalogStore};
use crate::collaborators::{ArtistNameCorrector, CatalogSource, Correction, FingerprintLookup};
use crate::events::{ProgressEvent, ProgressSink};
use crate::reconciler::{reconcile, ReconcileReport};
use crate::string_matching::{album_kind, artist_matches, remove_track_junk, track_matches, MatchThresholds};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("identification cancelled")]
    Cancelled,
}

/// Counts describing a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub items: usize,
    pub fields_changed: usize,
    pub no_guess: usize,
    pub network_errors: usize,
    pub first_reconcile: ReconcileReport,
    pub second_reconcile: ReconcileReport,
}

impl PipelineSummary {
    fn tally(items: &[Item], first_reconcile: ReconcileReport, second_reconcile: ReconcileReport) -> Self {
        let count = |wanted: QueryResult| items.iter().filter(|item| item.result == wanted).count();
        Self {
            items: items.len(),
            fields_changed: count(QueryResult::FieldsChanged),
            no_guess: count(QueryResult::NoGuess),
            network_errors: count(QueryResult::NetError),
            first_reconcile,
            second_reconcile,
        }
    }
}

/// Scratch state of one run.
#[derive(Default)]
struct RunState {
    catalog: CatalogCache,
    candidates: CandidateCache,
}

pub struct IdentificationPipeline {
    corrector: Arc<dyn ArtistNameCorrector>,
    catalog_source: Arc<dyn CatalogSource>,
    fingerprint: Arc<dyn FingerprintLookup>,
    catalog_store: Arc<dyn CatalogStore>,
    thresholds: MatchThresholds,
    max_albums_per_artist: usize,
    progress_interval: usize,
}

impl IdentificationPipeline {
    pub fn new(
        corrector: Arc<dyn ArtistNameCorrector>,
        catalog_source: Arc<dyn CatalogSource>,
        fingerprint: Arc<dyn FingerprintLookup>,
    ) -> Self {
        let matching = MatchingConfig::default();
        Self {
            corrector,
            catalog_source,
            fingerprint,
            catalog_store: Arc::new(NoCatalogStore),
            thresholds: MatchThresholds::from(&matching),
            max_albums_per_artist: matching.max_albums_per_artist,
            progress_interval: PipelineConfig::default().progress_interval,
        }
    }

    pub fn with_catalog_store(mut self, store: Arc<dyn CatalogStore>) -> Self {
        self.catalog_store = store;
        self
    }

    pub fn with_matching(mut self, config: &MatchingConfig) -> Self {
        self.thresholds = MatchThresholds::from(config);
        self.max_albums_per_artist = config.max_albums_per_artist;
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Identify `items` in place.
    ///
    /// On cancellation the items processed so far keep their results and
    /// [`PipelineError::Cancelled`] is returned. The catalog cache is saved
    /// in both cases.
    #[tracing::instrument(skip_all, fields(items = items.len()))]
    pub async fn run(
        &self,
        items: &mut [Item],
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PipelineSummary, PipelineError> {
        let mut state = RunState {
            catalog: self.load_catalog_cache(),
            candidates: CandidateCache::new(),
        };

        let outcome = self.run_passes(items, &mut state, progress, cancel).await;
        self.save_catalog_cache(&state.catalog);

        match &outcome {
            Ok(summary) => info!(
                target: "pipeline",
                items = summary.items,
                fields_changed = summary.fields_changed,
                no_guess = summary.no_guess,
                network_errors = summary.network_errors,
                "identification finished"
            ),
            Err(err) => warn!(target: "pipeline", error = %err, "identification stopped"),
        }
        outcome
    }

    async fn run_passes(
        &self,
        items: &mut [Item],
        state: &mut RunState,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PipelineSummary, PipelineError> {
        let total = items.len();

        for (index, item) in items.iter_mut().enumerate() {
            ensure_not_cancelled(cancel)?;
            self.first_pass_item(item, state).await;
            self.report(progress, "1", index, total, item);
        }

        let first_reconcile = reconcile(&mut state.candidates);
        for (index, item) in items.iter_mut().enumerate() {
            ensure_not_cancelled(cancel)?;
            apply_first_guess(item, &state.candidates);
            self.report(progress, "2a", index, total, item);
        }

        for (index, item) in items.iter_mut().enumerate() {
            ensure_not_cancelled(cancel)?;
            if !matches!(item.result, QueryResult::Ok | QueryResult::NetError) {
                self.fingerprint_item(item).await;
            }
            self.report(progress, "2b", index, total, item);
        }

        state.candidates.clear();
        for item in items.iter() {
            ensure_not_cancelled(cancel)?;
            if item.result == QueryResult::NetError || item.clean.artist.is_empty() {
                continue;
            }
            let title = if item.clean.title.is_empty() {
                &item.original.title
            } else {
                &item.clean.title
            };
            self.ensure_catalog(&item.clean.artist, &mut state.catalog).await;
            self.generate_candidates(
                item.path(),
                title,
                &item.clean.artist,
                state.catalog.catalog(&item.clean.artist),
                &mut state.candidates,
            );
        }

        let second_reconcile = reconcile(&mut state.candidates);
        for (index, item) in items.iter_mut().enumerate() {
            ensure_not_cancelled(cancel)?;
            if item.result != QueryResult::NetError {
                apply_second_guess(item, &state.candidates);
            }
            self.report(progress, "3", index, total, item);
        }

        Ok(PipelineSummary::tally(items, first_reconcile, second_reconcile))
    }

    async fn first_pass_item(&self, item: &mut Item, state: &mut RunState) {
        let observed = item.original.artist.clone();
        item.clean.artist = observed.clone();

        match self.correct_artist(&observed, &mut state.catalog).await {
            Correction::NetworkFailed => {
                item.clean = item.original.clone();
                item.result = QueryResult::NetError;
            }
            Correction::NotFound => item.result = QueryResult::ArtistNotFound,
            Correction::Suggested(suggestion) if !artist_matches(&observed, &suggestion, &self.thresholds) => {
                debug!(
                    target: "pipeline",
                    observed = %observed,
                    suggestion = %suggestion,
                    "artist suggestion rejected"
                );
                item.result = QueryResult::ArtistBadMatch;
            }
            Correction::Suggested(suggestion) => {
                self.ensure_catalog(&suggestion, &mut state.catalog).await;
                let found = self.generate_candidates(
                    item.path(),
                    &item.original.title,
                    &suggestion,
                    state.catalog.catalog(&suggestion),
                    &mut state.candidates,
                );
                if found {
                    item.clean.artist = suggestion;
                    item.result = QueryResult::Ok;
                } else {
                    item.result = QueryResult::TrackNotFound;
                }
            }
        }
        item.refresh_changed();
    }

    async fn correct_artist(&self, observed: &str, cache: &mut CatalogCache) -> Correction {
        if observed.trim().is_empty() {
            return Correction::NotFound;
        }
        if let Some(correction) = cache.correction(observed) {
            return correction;
        }

        let correction = self.corrector.correct_artist_name(observed).await;
        debug!(target: "pipeline", observed, correction = ?correction, "artist name corrected");
        cache.remember_correction(observed, &correction);
        correction
    }

    async fn ensure_catalog(&self, artist: &str, cache: &mut CatalogCache) {
        if cache.catalog(artist).is_some() {
            return;
        }

        match self.catalog_source.fetch_artist_catalog(artist).await {
            Ok(catalog) => {
                debug!(target: "catalog", artist, albums = catalog.albums.len(), "catalog fetched");
                cache.remember_catalog(artist, catalog);
            }
            Err(err) => {
                warn!(target: "catalog", artist, error = %err, "catalog fetch failed; treating as empty");
            }
        }
    }

    /// Record the closest track of each of the artist's leading albums.
    /// Returns whether any candidate was recorded.
    fn generate_candidates(
        &self,
        path: &Path,
        observed_title: &str,
        artist: &str,
        catalog: Option<&Artist>,
        candidates: &mut CandidateCache,
    ) -> bool {
        let Some(catalog) = catalog else {
            return false;
        };
        let observed_title = remove_track_junk(observed_title);
        let mut found = false;

        for album in catalog.albums.iter().take(self.max_albums_per_artist) {
            if album.name.is_empty() {
                debug!(target: "matching", artist, "skipping album without a name");
                continue;
            }

            let best = album
                .tracks
                .iter()
                .filter_map(|track| {
                    let name = remove_track_junk(&track.name);
                    track_matches(&observed_title, &name, &self.thresholds)
                        .map(|distance| (distance, name, track.number))
                })
                .min_by_key(|(distance, _, _)| *distance);

            if let Some((distance, name, number)) = best {
                debug!(
                    target: "matching",
                    artist,
                    album = %album.name,
                    kind = album_kind(&album.name).as_str(),
                    track = %name,
                    distance,
                    "track candidate"
                );
                let track = TrackGuess::new(path, name, number);
                let album_guess =
                    AlbumGuess::new(album.name.clone(), album.release_id.clone(), album.rank, album.total_tracks);
                candidates.record_candidate(artist, &track, &album_guess);
                found = true;
            }
        }

        found
    }

    async fn fingerprint_item(&self, item: &mut Item) {
        match self.fingerprint.fingerprint_and_lookup(item.path()).await {
            Some(fields) => {
                debug!(target: "pipeline", path = %item.path.display(), "fingerprint identified item");
                item.clean = fields;
                item.first_method = IdentifyMethod::Fingerprint;
            }
            None => {
                debug!(target: "pipeline", path = %item.path.display(), "fingerprint lookup failed");
                item.clean = TagFields::default();
                item.first_method = IdentifyMethod::FailedFingerprint;
            }
        }
        item.refresh_changed();
    }

    fn report(&self, progress: &mut dyn ProgressSink, pass: &'static str, index: usize, total: usize, item: &Item) {
        let position = index + 1;
        if position % self.progress_interval.max(1) == 0 || position == total {
            progress.report(ProgressEvent {
                pass,
                index: position,
                total,
                message: item.path.display().to_string(),
            });
        }
    }

    fn load_catalog_cache(&self) -> CatalogCache {
        match self.catalog_store.load() {
            Ok(Some(cache)) => cache,
            Ok(None) => CatalogCache::new(),
            Err(err) => {
                warn!(target: "catalog", error = %err, "discarding stored catalog cache");
                CatalogCache::new()
            }
        }
    }

    fn save_catalog_cache(&self, cache: &CatalogCache) {
        if let Err(err) = self.catalog_store.save(cache) {
            warn!(target: "catalog", error = %err, "failed to save catalog cache");
        }
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

fn copy_guess(item: &mut Item, guess: &TrackGuess) {
    item.clean.title = guess.name.clone();
    item.clean.album = guess.resolved_album().unwrap_or_default().to_string();
    item.clean.number = guess.number;
}

fn apply_first_guess(item: &mut Item, candidates: &CandidateCache) {
    if item.result != QueryResult::Ok {
        return;
    }

    match candidates.lookup(&item.clean.artist, item.path()) {
        Some(guess) => {
            copy_guess(item, guess);
            item.first_method = IdentifyMethod::NameLookup;
        }
        None => item.result = QueryResult::TrackNotFound,
    }
    item.refresh_changed();
}

fn apply_second_guess(item: &mut Item, candidates: &CandidateCache) {
    match candidates.lookup(&item.clean.artist, item.path()) {
        Some(guess) => {
            copy_guess(item, guess);
            item.second_method = IdentifyMethod::NameLookup;
            item.result = QueryResult::FieldsChanged;
        }
        None => {
            item.second_method = IdentifyMethod::SecondPassFailure;
            item.result = match item.first_method {
                IdentifyMethod::FailedFingerprint | IdentifyMethod::Unknown => QueryResult::NoGuess,
                _ => QueryResult::FieldsChanged,
            };
        }
    }
    item.refresh_changed();
}
