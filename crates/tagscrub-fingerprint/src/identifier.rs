// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use tracing::{debug, instrument};

use crate::acoustid::{AcoustidClient, RecordingMatch};
use crate::generator::FingerprintGenerator;
use crate::{FingerprintError, Result};

/// Tag values recovered from an acoustic match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedTrack {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub number: Option<u32>,
}

impl IdentifiedTrack {
    /// `None` unless the recording names both a title and an artist.
    pub fn from_recording(recording: &RecordingMatch) -> Option<Self> {
        let title = recording.title.clone().filter(|t| !t.trim().is_empty())?;
        let artist = recording.artist_credit().filter(|a| !a.trim().is_empty())?;
        let (album, number) = match recording.first_release_position() {
            Some((release, position)) => (release.title.clone().unwrap_or_default(), position),
            None => (String::new(), None),
        };

        Some(Self {
            artist,
            album,
            title,
            number,
        })
    }
}

/// Fingerprints a file and resolves it through AcoustID.
#[derive(Debug, Clone)]
pub struct AcoustidIdentifier {
    generator: FingerprintGenerator,
    client: AcoustidClient,
    min_score: f32,
}

impl AcoustidIdentifier {
    pub fn new(generator: FingerprintGenerator, client: AcoustidClient, min_score: f32) -> Self {
        Self {
            generator,
            client,
            min_score: min_score.clamp(0.0, 1.0),
        }
    }

    #[instrument(skip(self), fields(file = %path.display()))]
    pub async fn identify(&self, path: &Path) -> Result<IdentifiedTrack> {
        let fingerprint = self.generator.generate(path).await?;
        let best = self.client.lookup_best(&fingerprint, self.min_score).await?;
        debug!(target: "fingerprint", score = best.score, recording = %best.id, "best acoustic match");

        IdentifiedTrack::from_recording(&best).ok_or(FingerprintError::NoMatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acoustid::{MediumInfo, MediumTrack, RecordingArtist, ReleaseInfo};

    fn recording(title: Option<&str>, artists: &[&str]) -> RecordingMatch {
        RecordingMatch {
            id: "rec".to_string(),
            title: title.map(str::to_string),
            artists: artists
                .iter()
                .map(|name| RecordingArtist {
                    id: format!("{name}-id"),
                    name: name.to_string(),
                    joinphrase: Some(" & ".to_string()),
                })
                .collect(),
            releases: vec![ReleaseInfo {
                id: "rel".to_string(),
                title: Some("Bark at the Moon".to_string()),
                mediums: vec![MediumInfo {
                    position: Some(1),
                    track_count: Some(8),
                    tracks: vec![MediumTrack {
                        id: Some("trk".to_string()),
                        position: Some(1),
                        title: title.map(str::to_string),
                    }],
                }],
            }],
            score: 0.9,
        }
    }

    #[test]
    fn recording_with_release_becomes_identified_track() {
        let identified =
            IdentifiedTrack::from_recording(&recording(Some("Bark at the Moon"), &["Ozzy Osbourne"]))
                .unwrap();

        assert_eq!(identified.artist, "Ozzy Osbourne");
        assert_eq!(identified.album, "Bark at the Moon");
        assert_eq!(identified.number, Some(1));
    }

    #[test]
    fn joint_credit_uses_join_phrase() {
        let identified =
            IdentifiedTrack::from_recording(&recording(Some("Close My Eyes Forever"), &["Lita Ford", "Ozzy Osbourne"]))
                .unwrap();

        assert_eq!(identified.artist, "Lita Ford & Ozzy Osbourne");
    }

    #[test]
    fn untitled_or_uncredited_recording_is_rejected() {
        assert!(IdentifiedTrack::from_recording(&recording(None, &["Ozzy Osbourne"])).is_none());
        assert!(IdentifiedTrack::from_recording(&recording(Some("Crazy Train"), &[])).is_none());
    }
}
