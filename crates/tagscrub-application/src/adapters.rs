// SPDX-License-Identifier: GPL-3.0-or-later

//! Pipeline collaborators backed by the MusicBrainz, Last.fm and AcoustID clients.

use std::path::Path;

use async_trait::async_trait;
use tagscrub_domain::{Album, Artist, TagFields};
use tagscrub_fingerprint::{AcoustidIdentifier, FingerprintError};
use tagscrub_lastfm::{Catalog, LastFmClient};
use tagscrub_musicbrainz::{MusicBrainzClient, MusicBrainzError};
use tracing::{debug, warn};

use crate::collaborators::{ArtistNameCorrector, CatalogSource, CollaboratorError, Correction, FingerprintLookup};
use crate::string_matching::strip_parentheticals;

/// Spelling correction through MusicBrainz artist search.
pub struct MusicBrainzCorrector {
    client: MusicBrainzClient,
    search_limit: u32,
}

impl MusicBrainzCorrector {
    pub fn new(client: MusicBrainzClient, search_limit: u32) -> Self {
        Self {
            client,
            search_limit: search_limit.max(1),
        }
    }
}

#[async_trait]
impl ArtistNameCorrector for MusicBrainzCorrector {
    async fn correct_artist_name(&self, observed: &str) -> Correction {
        match self.client.best_artist(observed, self.search_limit).await {
            Ok(Some(artist)) => {
                let name = strip_parentheticals(&artist.name);
                if name.is_empty() {
                    Correction::NotFound
                } else {
                    Correction::Suggested(name)
                }
            }
            Ok(None) | Err(MusicBrainzError::NotFound(_)) => Correction::NotFound,
            Err(err) => {
                warn!(target: "musicbrainz", observed, error = %err, "artist search failed");
                Correction::NetworkFailed
            }
        }
    }
}

/// Reference catalogs from Last.fm.
pub struct LastFmCatalog {
    client: LastFmClient,
}

impl LastFmCatalog {
    pub fn new(client: LastFmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogSource for LastFmCatalog {
    async fn fetch_artist_catalog(&self, artist: &str) -> Result<Artist, CollaboratorError> {
        match self.client.fetch_catalog(artist).await {
            Ok(catalog) => Ok(artist_from_catalog(artist, &catalog)),
            Err(err) if err.is_not_found() => Ok(Artist::empty(artist)),
            Err(err) => Err(CollaboratorError::Network(err.to_string())),
        }
    }
}

/// Domain view of a Last.fm catalog, filed under the name it was requested as.
///
/// Rank is the album play count, track numbers follow the listing order and the
/// declared total is the number of listed tracks.
pub fn artist_from_catalog(requested: &str, catalog: &Catalog) -> Artist {
    let mut artist = Artist::new(requested);
    for entry in &catalog.albums {
        let mut album = Album::new(requested, entry.name.clone(), entry.playcount);
        if let Some(mbid) = &entry.mbid {
            album = album.with_release_id(mbid.clone());
        }
        for (position, track) in entry.tracks.iter().enumerate() {
            album = album.with_track(track.clone(), u32::try_from(position + 1).ok());
        }
        artist = artist.with_album(album);
    }
    artist
}

/// Acoustic identification through `fpcalc` and AcoustID.
pub struct AcoustidLookup {
    identifier: AcoustidIdentifier,
}

impl AcoustidLookup {
    pub fn new(identifier: AcoustidIdentifier) -> Self {
        Self { identifier }
    }
}

#[async_trait]
impl FingerprintLookup for AcoustidLookup {
    async fn fingerprint_and_lookup(&self, path: &Path) -> Option<TagFields> {
        match self.identifier.identify(path).await {
            Ok(track) => Some(TagFields::new(track.artist, track.album, track.title, track.number)),
            Err(err) if err.is_no_answer() => {
                debug!(target: "fingerprint", path = %path.display(), error = %err, "no acoustic match");
                None
            }
            Err(err @ FingerprintError::FpcalcNotFound(_)) => {
                warn!(target: "fingerprint", error = %err, "fingerprinting unavailable");
                None
            }
            Err(err) => {
                warn!(target: "fingerprint", path = %path.display(), error = %err, "fingerprint lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tagscrub_lastfm::CatalogAlbum;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn corrector_for(server: &MockServer) -> MusicBrainzCorrector {
        let client = MusicBrainzClient::builder()
            .base_url(server.uri())
            .rate_limit_interval(Duration::from_millis(1))
            .retry_delay(Duration::from_millis(1))
            .max_retries(0)
            .build()
            .unwrap();
        MusicBrainzCorrector::new(client, 5)
    }

    #[tokio::test]
    async fn corrector_suggests_best_artist_without_parentheticals() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artist"))
            .and(query_param("query", "everclear"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 1,
                "offset": 0,
                "artists": [{
                    "id": "2c9e2d4a-6a3a-4f7d-8bfc-3d2f6f2a9f10",
                    "name": "Everclear (band)",
                    "score": 100
                }]
            })))
            .mount(&server)
            .await;

        let correction = corrector_for(&server).correct_artist_name("everclear").await;

        assert_eq!(correction, Correction::Suggested("Everclear".to_string()));
    }

    #[tokio::test]
    async fn corrector_reports_empty_search_as_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 0,
                "offset": 0,
                "artists": []
            })))
            .mount(&server)
            .await;

        let correction = corrector_for(&server).correct_artist_name("zzzzzz").await;

        assert_eq!(correction, Correction::NotFound);
    }

    #[tokio::test]
    async fn corrector_reports_server_errors_as_network_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artist"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let correction = corrector_for(&server).correct_artist_name("nirvana").await;

        assert_eq!(correction, Correction::NetworkFailed);
    }

    #[test]
    fn catalog_conversion_numbers_tracks_by_position() {
        let catalog = Catalog {
            artist: "Ozzy Osbourne".to_string(),
            albums: vec![CatalogAlbum {
                name: "Blizzard of Ozz".to_string(),
                mbid: Some("blizzard-mbid".to_string()),
                playcount: 9_000_000,
                tracks: vec!["I Don't Know".to_string(), "Crazy Train".to_string()],
            }],
        };

        let artist = artist_from_catalog("Ozzy Osbourne", &catalog);

        let album = &artist.albums[0];
        assert_eq!(album.artist, "Ozzy Osbourne");
        assert_eq!(album.rank, 9_000_000);
        assert_eq!(album.total_tracks, 2);
        assert_eq!(album.release_id.as_deref(), Some("blizzard-mbid"));
        assert_eq!(album.tracks[1].name, "Crazy Train");
        assert_eq!(album.tracks[1].number, Some(2));
    }

    #[test]
    fn empty_catalog_converts_to_empty_artist() {
        let artist = artist_from_catalog("Nobody", &Catalog::empty("Nobody"));
        assert!(artist.is_empty());
    }
}
