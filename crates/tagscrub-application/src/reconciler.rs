// SPDX-License-Identifier: GPL-3.0-or-later

//! Greedy album reconciliation: every track ends up in at most one album.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::candidate_cache::{AlbumGuess, CandidateCache};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub artists: usize,
    /// Albums picked as winners, across all artists.
    pub iterations: usize,
    /// Tracks left with exactly one album.
    pub resolved_tracks: usize,
}

/// Resolve every artist in the cache, in artist name order.
pub fn reconcile(cache: &mut CandidateCache) -> ReconcileReport {
    let artists: Vec<String> = cache.artists().map(str::to_string).collect();
    let mut report = ReconcileReport::default();

    for artist in &artists {
        report.iterations += reconcile_artist(cache, artist);
        report.artists += 1;
        report.resolved_tracks += cache
            .tracks(artist)
            .filter(|track| track.resolved_album().is_some())
            .count();
    }

    debug!(
        target: "reconcile",
        artists = report.artists,
        iterations = report.iterations,
        resolved_tracks = report.resolved_tracks,
        "reconciliation complete"
    );
    trace!(target: "reconcile", "candidate cache after reconciliation:\n{}", cache.debug_dump());
    report
}

/// Resolve one artist; returns the number of winning albums.
///
/// Repeatedly takes the best scoring unprocessed album that still has
/// members, hands it all of its members and removes them from every
/// competitor. Scores are recomputed each round because removals change
/// completeness. Each round retires one album, so the loop is bounded by
/// the number of albums with members.
pub fn reconcile_artist(cache: &mut CandidateCache, artist: &str) -> usize {
    let mut processed: BTreeSet<String> = BTreeSet::new();
    let mut iterations = 0;

    loop {
        let Some(winner) = cache
            .albums(artist)
            .filter(|album| !album.members.is_empty() && !processed.contains(&album.name))
            .max_by(|left, right| compare_albums(left, right))
        else {
            break;
        };

        let winner_name = winner.name.clone();
        let members: Vec<PathBuf> = winner.members.iter().map(|member| member.path.clone()).collect();
        debug!(
            target: "reconcile",
            artist,
            album = %winner_name,
            score = winner.score(),
            members = members.len(),
            "album selected"
        );

        for path in &members {
            cache.keep_only_in(artist, path, &winner_name);
        }

        processed.insert(winner_name);
        iterations += 1;
    }

    iterations
}

/// Higher score wins; on equal scores the alphabetically first name wins.
fn compare_albums(left: &AlbumGuess, right: &AlbumGuess) -> Ordering {
    left.score()
        .total_cmp(&right.score())
        .then_with(|| right.name.cmp(&left.name))
}
