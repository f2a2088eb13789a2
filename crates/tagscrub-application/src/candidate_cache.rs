// SPDX-License-Identifier: GPL-3.0-or-later

//! Candidate (track, album) associations, indexed both by track and by album.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// A catalog track proposed for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGuess {
    /// Input file the guess is for; two guesses with the same path are the same item.
    pub path: PathBuf,
    /// Catalog track name with junk parentheticals removed.
    pub name: String,
    pub number: Option<u32>,
    /// Albums still competing for this track, in the order they were proposed.
    pub candidate_albums: Vec<String>,
}

impl TrackGuess {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, number: Option<u32>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            number,
            candidate_albums: Vec::new(),
        }
    }

    /// The album, once exactly one candidate is left.
    pub fn resolved_album(&self) -> Option<&str> {
        match self.candidate_albums.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

/// A track as listed under an album guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMember {
    pub path: PathBuf,
    pub name: String,
    pub number: Option<u32>,
}

/// A catalog album with the input files that might belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumGuess {
    pub name: String,
    pub release_id: Option<String>,
    pub rank: u64,
    pub total_tracks: u32,
    pub members: Vec<AlbumMember>,
}

impl AlbumGuess {
    pub fn new(name: impl Into<String>, release_id: Option<String>, rank: u64, total_tracks: u32) -> Self {
        Self {
            name: name.into(),
            release_id,
            rank,
            total_tracks,
            members: Vec::new(),
        }
    }

    pub fn found_tracks(&self) -> usize {
        self.members.len()
    }

    /// Share of the declared tracks seen among the input files.
    ///
    /// Albums declaring no tracks count as complete.
    pub fn completeness(&self) -> f64 {
        if self.total_tracks == 0 {
            return 1.0;
        }
        self.found_tracks() as f64 / f64::from(self.total_tracks)
    }

    /// `completeness² × rank × found`.
    pub fn score(&self) -> f64 {
        let completeness = self.completeness();
        completeness * completeness * self.rank as f64 * self.found_tracks() as f64
    }

    fn has_member(&self, path: &Path) -> bool {
        self.members.iter().any(|member| member.path == path)
    }
}

/// Per-artist candidate store.
///
/// Both indexes describe the same relation and are only changed together,
/// through [`CandidateCache::record_candidate`] and the reconciliation step.
#[derive(Debug, Default, Clone)]
pub struct CandidateCache {
    by_track: BTreeMap<String, BTreeMap<PathBuf, TrackGuess>>,
    by_album: BTreeMap<String, BTreeMap<String, AlbumGuess>>,
}

impl CandidateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Propose `album` for the file described by `track`.
    ///
    /// The templates are copied on first sight; later calls only add
    /// associations. Recording the same file and album twice changes nothing.
    pub fn record_candidate(&mut self, artist: &str, track: &TrackGuess, album: &AlbumGuess) {
        let tracks = self.by_track.entry(artist.to_string()).or_default();
        let entry = tracks.entry(track.path.clone()).or_insert_with(|| TrackGuess {
            candidate_albums: Vec::new(),
            ..track.clone()
        });
        if entry.candidate_albums.iter().any(|name| *name == album.name) {
            return;
        }
        entry.candidate_albums.push(album.name.clone());

        let member = AlbumMember {
            path: entry.path.clone(),
            name: entry.name.clone(),
            number: entry.number,
        };

        let albums = self.by_album.entry(artist.to_string()).or_default();
        let album_entry = albums.entry(album.name.clone()).or_insert_with(|| AlbumGuess {
            members: Vec::new(),
            ..album.clone()
        });
        if !album_entry.has_member(&member.path) {
            album_entry.members.push(member);
        }
    }

    /// The guess for `path`, only when reconciliation left it exactly one album.
    pub fn lookup(&self, artist: &str, path: &Path) -> Option<&TrackGuess> {
        self.by_track
            .get(artist)?
            .get(path)
            .filter(|guess| guess.resolved_album().is_some())
    }

    pub fn clear(&mut self) {
        self.by_track.clear();
        self.by_album.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.by_track.is_empty() && self.by_album.is_empty()
    }

    /// Artists with candidates, sorted.
    pub fn artists(&self) -> impl Iterator<Item = &str> {
        self.by_album.keys().map(String::as_str)
    }

    pub fn albums(&self, artist: &str) -> impl Iterator<Item = &AlbumGuess> {
        self.by_album
            .get(artist)
            .into_iter()
            .flat_map(|albums| albums.values())
    }

    pub fn tracks(&self, artist: &str) -> impl Iterator<Item = &TrackGuess> {
        self.by_track
            .get(artist)
            .into_iter()
            .flat_map(|tracks| tracks.values())
    }

    pub fn album(&self, artist: &str, album: &str) -> Option<&AlbumGuess> {
        self.by_album.get(artist)?.get(album)
    }

    /// Albums currently listing `path` as a member.
    pub fn album_memberships(&self, artist: &str, path: &Path) -> Vec<&str> {
        self.albums(artist)
            .filter(|album| album.has_member(path))
            .map(|album| album.name.as_str())
            .collect()
    }

    /// Give `path` to `album` alone: drop it from every other album and
    /// collapse its candidate list. A track that never named `album` as a
    /// candidate loses all candidates instead.
    pub(crate) fn keep_only_in(&mut self, artist: &str, path: &Path, album: &str) {
        if let Some(albums) = self.by_album.get_mut(artist) {
            for (name, guess) in albums.iter_mut() {
                if name != album {
                    guess.members.retain(|member| member.path != path);
                }
            }
        }

        if let Some(guess) = self
            .by_track
            .get_mut(artist)
            .and_then(|tracks| tracks.get_mut(path))
        {
            if guess.candidate_albums.iter().any(|name| name == album) {
                guess.candidate_albums = vec![album.to_string()];
            } else {
                guess.candidate_albums.clear();
            }
        }
    }

    /// Human readable listing of both indexes.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        for (artist, albums) in &self.by_album {
            let _ = writeln!(out, "artist: {artist}");
            for album in albums.values() {
                let _ = writeln!(
                    out,
                    "  album: {} (rank {}, {}/{} tracks, score {:.2})",
                    album.name,
                    album.rank,
                    album.found_tracks(),
                    album.total_tracks,
                    album.score()
                );
                for member in &album.members {
                    let number = member.number.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                    let _ = writeln!(out, "    {number:>3} {} <- {}", member.name, member.path.display());
                }
            }
            for track in self.tracks(artist) {
                let _ = writeln!(
                    out,
                    "  track: {} [{}] <- {}",
                    track.name,
                    track.candidate_albums.join(" | "),
                    track.path.display()
                );
            }
        }
        out
    }
}
