//! Integration tests for the Last.fm API client

use serde_json::json;
use std::time::Duration;
use tagscrub_lastfm::{LastFmClient, LastFmError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> LastFmClient {
    LastFmClient::new("test-key".to_string(), Some(server.uri()))
        .with_request_delay(Duration::from_millis(0))
        .with_retry_policy(2, Duration::from_millis(1))
}

async fn mount_ozzy_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("method", "artist.search"))
        .and(query_param("artist", "Ozzy Osbourne"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {
                "artistmatches": {
                    "artist": [
                        { "name": "Ozzy Osbourne", "listeners": "2500000", "mbid": "8aa5b65a" },
                        { "name": "Ozzy Osbourne & Friends", "listeners": "100" }
                    ]
                }
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("method", "artist.gettopalbums"))
        .and(query_param("artist", "Ozzy Osbourne"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "topalbums": {
                "album": [
                    { "name": "Blizzard of Ozz", "playcount": 9000000, "mbid": "blizzard-mbid" },
                    { "name": "", "playcount": "12" },
                    { "name": "Diary of a Madman", "playcount": "5000000", "mbid": "" }
                ]
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("method", "album.getinfo"))
        .and(query_param("album", "Blizzard of Ozz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "album": {
                "name": "Blizzard of Ozz",
                "tracks": { "track": [
                    { "name": "I Don't Know", "@attr": { "rank": 1 } },
                    { "name": "Crazy Train", "@attr": { "rank": 2 } }
                ] }
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("method", "album.getinfo"))
        .and(query_param("album", "Diary of a Madman"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 6,
            "message": "Album not found"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_artist_returns_first_match() {
    let server = MockServer::start().await;
    mount_ozzy_catalog(&server).await;

    let client = client_for(&server);
    let found = client.search_artist("Ozzy Osbourne").await.unwrap().unwrap();

    assert_eq!(found.name, "Ozzy Osbourne");
    assert_eq!(found.listeners, 2_500_000);
}

#[tokio::test]
async fn test_top_albums_keeps_order() {
    let server = MockServer::start().await;
    mount_ozzy_catalog(&server).await;

    let client = client_for(&server);
    let albums = client.top_albums("Ozzy Osbourne", 20).await.unwrap();

    assert_eq!(albums.len(), 3);
    assert_eq!(albums[0].name, "Blizzard of Ozz");
    assert_eq!(albums[0].playcount, 9_000_000);
    assert_eq!(albums[2].playcount, 5_000_000);
}

#[tokio::test]
async fn test_fetch_catalog_assembles_albums() {
    let server = MockServer::start().await;
    mount_ozzy_catalog(&server).await;

    let client = client_for(&server);
    let catalog = client.fetch_catalog("Ozzy Osbourne").await.unwrap();

    assert_eq!(catalog.artist, "Ozzy Osbourne");
    // The nameless album is skipped.
    assert_eq!(catalog.albums.len(), 2);

    let blizzard = &catalog.albums[0];
    assert_eq!(blizzard.mbid.as_deref(), Some("blizzard-mbid"));
    assert_eq!(blizzard.tracks, vec!["I Don't Know", "Crazy Train"]);

    let diary = &catalog.albums[1];
    assert_eq!(diary.mbid, None);
    assert!(diary.tracks.is_empty());
}

#[tokio::test]
async fn test_fetch_catalog_is_cached() {
    let server = MockServer::start().await;
    mount_ozzy_catalog(&server).await;

    let client = client_for(&server);
    client.fetch_catalog("Ozzy Osbourne").await.unwrap();
    let first_count = server.received_requests().await.unwrap().len();

    client.fetch_catalog("ozzy osbourne").await.unwrap();
    let second_count = server.received_requests().await.unwrap().len();

    assert_eq!(first_count, second_count, "expected catalog to be cached");
}

#[tokio::test]
async fn test_unknown_artist_yields_empty_catalog() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("method", "artist.search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": { "artistmatches": { "artist": [] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let catalog = client.fetch_catalog("Nobody At All").await.unwrap();

    assert!(catalog.is_empty());
    assert_eq!(catalog.artist, "Nobody At All");
}

#[tokio::test]
async fn test_server_errors_are_retried_then_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.fetch_catalog("Ozzy Osbourne").await;

    assert!(matches!(result, Err(LastFmError::HttpStatus { .. })));
}

#[tokio::test]
async fn test_invalid_api_key_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": 10,
            "message": "Invalid API key"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.search_artist("Ozzy Osbourne").await;

    assert!(matches!(result, Err(LastFmError::Api { code: 10, .. })));
}
