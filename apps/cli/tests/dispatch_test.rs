//! Turns dispatched through the real Spotify client against a mock Web API

mod common;

use std::sync::Arc;

use cadence_cli::NO_ACTIVE_DEVICE_MESSAGE;
use cadence_shared_config::{SpotifyConfig, SynthesisPolicy};
use cadence_spotify_client::SpotifyClient;
use cadence_test_utils::MockLlmServer;
use common::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn spotify_client(server: &MockSpotifyServer) -> Arc<SpotifyClient> {
    Arc::new(SpotifyClient::new(&SpotifyConfig::with_url(server.url())).unwrap())
}

#[tokio::test]
async fn test_play_track_end_to_end() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token().await;
    spotify.mock_search("Hey Jude", Some(hey_jude())).await;
    spotify.mock_player_command("POST", "queue").await;
    spotify.mock_player_command("POST", "next").await;

    let llm = MockLlmServer::start().await;
    llm.mock_tool_calls(&[ToolCallFixture::new(
        "play_track",
        json!({"track_name": "Hey Jude"}),
    )])
    .await;
    let mut session = session(&llm, spotify_client(&spotify), SynthesisPolicy::Direct);

    let (result, _) = run_turn(&mut session, "play hey jude").await;

    assert_eq!(result.unwrap(), "Playing Hey Jude by The Beatles");
    assert_eq!(
        spotify.api_paths().await,
        vec!["/v1/search", "/v1/me/player/queue", "/v1/me/player/next"]
    );
}

#[tokio::test]
async fn test_add_to_queue_end_to_end_skips_misses() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token().await;
    spotify.mock_search("Yellow", Some(yellow())).await;
    spotify.mock_search("Nonexistent Song", None).await;
    spotify.mock_player_command("POST", "queue").await;

    let llm = MockLlmServer::start().await;
    llm.mock_tool_calls(&[ToolCallFixture::new(
        "add_to_queue",
        json!({"tracks": ["Yellow", "Nonexistent Song"]}),
    )])
    .await;
    let mut session = session(&llm, spotify_client(&spotify), SynthesisPolicy::Direct);

    let (result, _) = run_turn(&mut session, "queue yellow and nonexistent song").await;

    assert_eq!(
        result.unwrap(),
        "Added Yellow by Coldplay to the queue (couldn't find: Nonexistent Song)"
    );
    let paths = spotify.api_paths().await;
    assert_eq!(paths.iter().filter(|p| *p == "/v1/search").count(), 2);
    assert_eq!(paths.iter().filter(|p| *p == "/v1/me/player/queue").count(), 1);
}

#[tokio::test]
async fn test_blank_title_does_not_abort_the_batch() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token().await;
    spotify.mock_search("Yellow", Some(yellow())).await;
    spotify.mock_search("Hey Jude", Some(hey_jude())).await;
    spotify.mock_player_command("POST", "queue").await;
    spotify.mock_profile("user-1", "Tester").await;
    Mock::given(method("POST"))
        .and(path("/v1/users/user-1/playlists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "playlist-9",
            "name": "Mix",
            "external_urls": {"spotify": "https://open.spotify.com/playlist/playlist-9"}
        })))
        .mount(spotify.inner())
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/playlists/playlist-9/tracks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"snapshot_id": "s1"})))
        .mount(spotify.inner())
        .await;

    let llm = MockLlmServer::start().await;
    llm.mock_tool_calls(&[
        ToolCallFixture::new("add_to_queue", json!({"tracks": ["", "Yellow"]})),
        ToolCallFixture::new(
            "create_playlist_with_tracks",
            json!({"name": "Mix", "tracks": ["   ", "Hey Jude"]}),
        ),
    ])
    .await;
    let mut session = session(&llm, spotify_client(&spotify), SynthesisPolicy::Direct);

    let (result, _) = run_turn(&mut session, "queue yellow and make a mix").await;

    let reply = result.unwrap();
    assert!(reply.starts_with("Added Yellow by Coldplay to the queue\n\n"));
    assert!(reply.ends_with("Here's your playlist: https://open.spotify.com/playlist/playlist-9"));
    assert!(!reply.contains("unavailable"));
    let paths = spotify.api_paths().await;
    assert_eq!(paths.iter().filter(|p| *p == "/v1/search").count(), 2);
    assert_eq!(paths.iter().filter(|p| *p == "/v1/me/player/queue").count(), 1);
}

#[tokio::test]
async fn test_no_active_device_end_to_end() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token().await;
    spotify
        .mock_player_command_no_device("POST", "previous")
        .await;

    let llm = MockLlmServer::start().await;
    llm.mock_tool_calls(&[ToolCallFixture::new("switch_to_previous_track", json!({}))])
        .await;
    let mut session = session(&llm, spotify_client(&spotify), SynthesisPolicy::Direct);

    let (result, _) = run_turn(&mut session, "previous track").await;

    assert_eq!(result.unwrap(), NO_ACTIVE_DEVICE_MESSAGE);
}

#[tokio::test]
async fn test_upstream_failure_is_an_ordinary_outcome() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token().await;
    spotify.mock_server_error().await;

    let llm = MockLlmServer::start().await;
    llm.mock_tool_calls(&[
        ToolCallFixture::new("get_current_playback", json!({})),
        ToolCallFixture::new("switch_to_previous_track", json!({})),
    ])
    .await;
    let mut session = session(&llm, spotify_client(&spotify), SynthesisPolicy::Direct);

    let (result, _) = run_turn(&mut session, "what's playing, then go back").await;

    let reply = result.unwrap();
    assert_eq!(reply.matches("Spotify is unavailable right now").count(), 2);
    assert_eq!(session.transcript().len(), 3);
}

#[tokio::test]
async fn test_current_playback_end_to_end() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token().await;
    spotify.mock_current_playback(Some(yellow()), true).await;

    let llm = MockLlmServer::start().await;
    llm.mock_tool_calls(&[ToolCallFixture::new("get_current_playback", json!({}))])
        .await;
    llm.mock_narration("You're listening to Yellow by Coldplay.")
        .await;
    let mut session = session(&llm, spotify_client(&spotify), SynthesisPolicy::Narrated);

    let (result, _) = run_turn(&mut session, "what is playing?").await;

    assert_eq!(result.unwrap(), "You're listening to Yellow by Coldplay.");
    let requests = llm.requests().await;
    let prompt = requests[1]["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.ends_with("Details: Yellow by Coldplay"));
}

#[tokio::test]
async fn test_top_artists_pages_end_to_end() {
    let spotify = MockSpotifyServer::start().await;
    spotify.mock_token().await;

    for (limit, offset, first) in [("50", "0", 1), ("10", "50", 51)] {
        let count: usize = limit.parse().unwrap();
        let items: Vec<_> = (first..first + count)
            .map(|rank| json!({"id": format!("a{}", rank), "name": format!("Artist {}", rank)}))
            .collect();

        Mock::given(method("GET"))
            .and(path("/v1/me/top/artists"))
            .and(query_param("limit", limit))
            .and(query_param("offset", offset))
            .and(query_param("time_range", "long_term"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": items})))
            .mount(spotify.inner())
            .await;
    }

    let llm = MockLlmServer::start().await;
    llm.mock_tool_calls(&[ToolCallFixture::new("get_top_artists", json!({"tracks": 60}))])
        .await;
    let mut session = session(&llm, spotify_client(&spotify), SynthesisPolicy::Direct);

    let (result, _) = run_turn(&mut session, "who are my top 60 artists?").await;

    let reply = result.unwrap();
    assert!(reply.starts_with("Here are your top artists of all time:\n\nArtist 1\n\nArtist 2"));
    assert!(reply.ends_with("Artist 59\n\nArtist 60"));
    assert_eq!(spotify.api_paths().await.len(), 2);
}
