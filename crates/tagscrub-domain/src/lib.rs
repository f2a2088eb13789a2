// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Catalog entities
// ============================================================================

/// An artist as listed by the reference catalog, with its most popular albums.
///
/// An artist without albums is how the catalog reports "not found".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub albums: Vec<Album>,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            albums: Vec::new(),
        }
    }

    /// The catalog's answer for an artist it does not know.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name)
    }

    pub fn with_album(mut self, album: Album) -> Self {
        self.albums.push(album);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    /// Name of the owning artist; albums reference artists by name only.
    pub artist: String,
    pub name: String,
    /// External release identifier (MusicBrainz id when the catalog has one).
    #[serde(default)]
    pub release_id: Option<String>,
    /// Popularity, higher is more popular.
    #[serde(default)]
    pub rank: u64,
    /// Track count declared by the catalog.
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Album {
    pub fn new(artist: impl Into<String>, name: impl Into<String>, rank: u64) -> Self {
        Self {
            artist: artist.into(),
            name: name.into(),
            release_id: None,
            rank,
            total_tracks: 0,
            tracks: Vec::new(),
        }
    }

    pub fn with_release_id(mut self, release_id: impl Into<String>) -> Self {
        self.release_id = Some(release_id.into());
        self
    }

    /// Append a track and count it towards the declared total.
    pub fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
        self.total_tracks += 1;
    }

    pub fn with_track(mut self, name: impl Into<String>, number: Option<u32>) -> Self {
        self.push_track(Track::new(name, number));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// `None` when the position on the release is unknown.
    #[serde(default)]
    pub number: Option<u32>,
}

impl Track {
    pub fn new(name: impl Into<String>, number: Option<u32>) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Classification of an item as it moves through identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResult {
    #[default]
    Unknown,
    ArtistNotFound,
    ArtistBadMatch,
    TrackNotFound,
    NetError,
    Ok,
    FieldsChanged,
    NoGuess,
}

impl QueryResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::ArtistNotFound => "artist not found",
            Self::ArtistBadMatch => "artist bad match",
            Self::TrackNotFound => "track not found",
            Self::NetError => "network error",
            Self::Ok => "success",
            Self::FieldsChanged => "fields changed",
            Self::NoGuess => "id attempts failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        [
            Self::Unknown,
            Self::ArtistNotFound,
            Self::ArtistBadMatch,
            Self::TrackNotFound,
            Self::NetError,
            Self::Ok,
            Self::FieldsChanged,
            Self::NoGuess,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy produced the answer for a stage of identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifyMethod {
    #[default]
    Unknown,
    NameLookup,
    Fingerprint,
    FailedFingerprint,
    SecondPassFailure,
}

impl IdentifyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NameLookup => "name lookup",
            Self::Fingerprint => "fingerprint",
            Self::FailedFingerprint => "failed fingerprint",
            Self::SecondPassFailure => "second pass failure",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        [
            Self::Unknown,
            Self::NameLookup,
            Self::Fingerprint,
            Self::FailedFingerprint,
            Self::SecondPassFailure,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for IdentifyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Items
// ============================================================================

/// The four tag fields the identification pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFields {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub number: Option<u32>,
}

impl TagFields {
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        title: impl Into<String>,
        number: Option<u32>,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            title: title.into(),
            number,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artist.is_empty() && self.album.is_empty() && self.title.is_empty() && self.number.is_none()
    }
}

/// Which tag fields differ between the original and the clean values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFields {
    pub artist: bool,
    pub album: bool,
    pub title: bool,
    pub number: bool,
}

impl ChangedFields {
    /// Text fields compare case-insensitively; track numbers compare exactly.
    pub fn between(original: &TagFields, clean: &TagFields) -> Self {
        Self {
            artist: original.artist.to_lowercase() != clean.artist.to_lowercase(),
            album: original.album.to_lowercase() != clean.album.to_lowercase(),
            title: original.title.to_lowercase() != clean.title.to_lowercase(),
            number: original.number != clean.number,
        }
    }

    pub fn any(&self) -> bool {
        self.artist || self.album || self.title || self.number
    }

    /// Compact flag rendering used in exported documents, e.g. `artist,title`.
    pub fn to_flags(&self) -> String {
        let mut flags = Vec::new();
        if self.artist {
            flags.push("artist");
        }
        if self.album {
            flags.push("album");
        }
        if self.title {
            flags.push("title");
        }
        if self.number {
            flags.push("number");
        }
        flags.join(",")
    }

    pub fn from_flags(flags: &str) -> Self {
        let mut changed = Self::default();
        for flag in flags.split(',').map(str::trim) {
            match flag {
                "artist" => changed.artist = true,
                "album" => changed.album = true,
                "title" => changed.title = true,
                "number" => changed.number = true,
                _ => {}
            }
        }
        changed
    }
}

/// One input audio file: what its tags said, what we think they should say, and how we got there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub path: PathBuf,
    pub original: TagFields,
    pub clean: TagFields,
    pub result: QueryResult,
    pub first_method: IdentifyMethod,
    pub second_method: IdentifyMethod,
    pub changed: ChangedFields,
    pub is_duplicate: bool,
}

impl Item {
    pub fn new(path: impl Into<PathBuf>, original: TagFields) -> Self {
        Self {
            path: path.into(),
            original,
            ..Self::default()
        }
    }

    pub fn with_duplicate(mut self, is_duplicate: bool) -> Self {
        self.is_duplicate = is_duplicate;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recompute [`ChangedFields`] from the current original and clean values.
    pub fn refresh_changed(&mut self) {
        self.changed = ChangedFields::between(&self.original, &self.clean);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn album_push_track_counts_total() {
        let album = Album::new("Nirvana", "Nevermind", 10)
            .with_track("Smells Like Teen Spirit", Some(1))
            .with_track("In Bloom", Some(2));

        assert_eq!(album.total_tracks, 2);
        assert_eq!(album.tracks[1].name, "In Bloom");
    }

    #[test]
    fn empty_artist_has_no_albums() {
        let artist = Artist::empty("Nobody");
        assert!(artist.is_empty());
        assert_eq!(artist.name, "Nobody");
    }

    #[test]
    fn changed_fields_ignore_case() {
        let original = TagFields::new("nirvana", "NEVERMIND", "in bloom", Some(2));
        let clean = TagFields::new("Nirvana", "Nevermind", "In Bloom", Some(2));

        let changed = ChangedFields::between(&original, &clean);

        assert!(!changed.any());
    }

    #[test]
    fn changed_fields_detect_each_field() {
        let original = TagFields::new("nirvana", "", "inbloom", None);
        let clean = TagFields::new("Nirvana", "Nevermind", "In Bloom", Some(2));

        let changed = ChangedFields::between(&original, &clean);

        assert!(!changed.artist);
        assert!(changed.album);
        assert!(changed.title);
        assert!(changed.number);
        assert_eq!(changed.to_flags(), "album,title,number");
        assert_eq!(ChangedFields::from_flags("album,title,number"), changed);
    }

    #[test]
    fn query_result_labels_parse_back() {
        for result in [
            QueryResult::Unknown,
            QueryResult::ArtistBadMatch,
            QueryResult::NetError,
            QueryResult::FieldsChanged,
            QueryResult::NoGuess,
        ] {
            assert_eq!(QueryResult::parse(result.as_str()), Some(result));
        }
        assert_eq!(QueryResult::parse("garbage"), None);
    }

    #[test]
    fn identify_method_labels_parse_back() {
        assert_eq!(
            IdentifyMethod::parse("Failed Fingerprint"),
            Some(IdentifyMethod::FailedFingerprint)
        );
        assert_eq!(IdentifyMethod::default(), IdentifyMethod::Unknown);
    }

    #[test]
    fn item_refresh_changed_uses_current_fields() {
        let mut item = Item::new("/music/a.mp3", TagFields::new("ozzy osborne", "", "crazy train", None));
        item.clean = TagFields::new("Ozzy Osbourne", "Blizzard of Ozz", "Crazy Train", Some(1));

        item.refresh_changed();

        assert!(item.changed.artist);
        assert!(item.changed.album);
        assert!(!item.changed.title);
        assert!(item.changed.number);
    }
}
