/// API integration tests
/// Tests complete HTTP request/response cycles with a real database and a fake playback daemon
mod common;

use axum::http::StatusCode;
use common::{audio, body_json, TestApp};
use juicebox_playback::{Mode, TransportState};
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.get("/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "none");
}

#[tokio::test]
async fn test_upload_requires_known_user() {
    let app = TestApp::new().await;

    let response = app
        .upload("mallory", "song.mp3", &audio("Queen", "Song"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/upload")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_then_duplicate() {
    let app = TestApp::new().await;

    let response = app
        .upload("alice", "bohemian.mp3", &audio("Queen", "Bohemian Rhapsody"))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "created");
    assert_eq!(created["artist"], "Queen");
    assert_eq!(created["owner_id"], app.alice.id);

    // Same bytes under another name and uploader
    let response = app
        .upload("bob", "copy.mp3", &audio("Queen", "Bohemian Rhapsody"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let duplicate = body_json(response).await;
    assert_eq!(duplicate["status"], "duplicate");
    assert_eq!(duplicate["existing"], created["id"]);

    let songs = body_json(app.get("/api/songs", None).await).await;
    assert_eq!(songs["total"], 1);
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = TestApp::new().await;

    let response = app
        .upload("alice", "cover.jpg", &audio("Queen", "Song"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .upload("alice", "untagged.mp3", b"title=Only A Title\n")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("artist"));
}

#[tokio::test]
async fn test_browse_and_search() {
    let app = TestApp::new().await;
    let id = app.song("Queen", "Bohemian Rhapsody").await;
    app.song("Muse", "Hysteria").await;

    let response = app.get("/api/songs?page=1", None).await;
    let body = body_json(response).await;
    assert_eq!(body["songs"].as_array().unwrap().len(), 2);
    assert_eq!(body["songs"][0]["owner_name"], "alice");

    let response = app.get(&format!("/api/songs/{}", id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Bohemian Rhapsody");

    let response = app.get("/api/songs/999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let results = body_json(app.get("/api/search?query=hyst", None).await).await;
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["artist"], "Muse");

    let response = app.get("/api/search?query=%20", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_playlist_entries_over_http() {
    let app = TestApp::new().await;
    let a = app.song("Artist", "A").await;
    let b = app.song("Artist", "B").await;
    let c = app.song("Artist", "C").await;

    let response = app
        .json("POST", "/api/playlists", Some("alice"), json!({ "title": "P" }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let playlist = body_json(response).await;
    let entries_uri = format!("/api/playlists/{}/entries", playlist["id"]);

    for (song, position, expected) in [(a, None, 1), (b, None, 2), (c, Some(1), 1)] {
        let response = app
            .json(
                "POST",
                &entries_uri,
                Some("bob"),
                json!({ "song_id": song, "position": position }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["position"], expected);
    }

    let response = app
        .delete(&format!("{}/{}", entries_uri, a), "alice")
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let entries = body_json(app.get(&entries_uri, Some("alice")).await).await;
    let order: Vec<(i64, i64)> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["song_id"].as_i64().unwrap(), e["position"].as_i64().unwrap()))
        .collect();
    assert_eq!(order, vec![(c, 1), (b, 2)]);
    assert_eq!(entries[0]["contributor_id"], app.bob.id);

    // Duplicate entry and out-of-range position are bad requests
    let response = app
        .json("POST", &entries_uri, Some("alice"), json!({ "song_id": b }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .json(
            "POST",
            &entries_uri,
            Some("alice"),
            json!({ "song_id": a, "position": 9 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Move B to the front
    let response = app
        .json(
            "PUT",
            &format!("{}/{}", entries_uri, b),
            Some("alice"),
            json!({ "position": 1 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await;
    assert_eq!(entries[0]["song_id"], b);
    assert_eq!(entries[1]["song_id"], c);
}

#[tokio::test]
async fn test_private_playlists_are_hidden() {
    let app = TestApp::new().await;

    let private = body_json(
        app.json("POST", "/api/playlists", Some("alice"), json!({ "title": "Mine" }))
            .await,
    )
    .await;
    app.json(
        "POST",
        "/api/playlists",
        Some("alice"),
        json!({ "title": "Shared", "is_public": true }),
    )
    .await;

    let visible = body_json(app.get("/api/playlists", Some("bob")).await).await;
    let titles: Vec<&str> = visible
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Shared"]);

    let uri = format!("/api/playlists/{}", private["id"]);
    assert_eq!(
        app.get(&uri, Some("bob")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.get(&uri, Some("alice")).await.status(), StatusCode::OK);

    // Only the owner deletes
    assert_ne!(app.delete(&uri, "bob").await.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.delete(&uri, "alice").await.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        app.get(&uri, Some("alice")).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_player_random_then_enqueue() {
    let app = TestApp::new().await;
    app.song("Artist", "A").await;
    app.song("Artist", "B").await;
    let c = app.song("Artist", "C").await;

    let response = app
        .json("POST", "/api/player/mode", None, json!({ "mode": "random" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["mode"], "random");
    assert_eq!(
        app.daemon.queue(),
        vec!["alice/Artist/A.mp3", "alice/Artist/B.mp3", "alice/Artist/C.mp3"]
    );

    let response = app
        .json("POST", "/api/player/enqueue", None, json!({ "song_id": c }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["mode"], "queue");
    assert_eq!(app.daemon.queue(), vec!["alice/Artist/C.mp3"]);
    assert_eq!(app.state.controller.mode().await, Mode::Queue);

    let response = app
        .json("POST", "/api/player/enqueue", None, json!({ "song_id": 999 }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .json("POST", "/api/player/enqueue", None, json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_player_enqueue_playlist() {
    let app = TestApp::new().await;
    let a = app.song("Artist", "A").await;
    let b = app.song("Artist", "B").await;

    let playlist = body_json(
        app.json("POST", "/api/playlists", Some("alice"), json!({ "title": "P" }))
            .await,
    )
    .await;
    let entries_uri = format!("/api/playlists/{}/entries", playlist["id"]);
    app.json("POST", &entries_uri, Some("alice"), json!({ "song_id": a }))
        .await;
    app.json(
        "POST",
        &entries_uri,
        Some("alice"),
        json!({ "song_id": b, "position": 1 }),
    )
    .await;

    let response = app
        .json(
            "POST",
            "/api/player/enqueue",
            None,
            json!({ "playlist_id": playlist["id"] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.daemon.queue(),
        vec!["alice/Artist/B.mp3", "alice/Artist/A.mp3"]
    );
}

#[tokio::test]
async fn test_player_controls_and_status() {
    let app = TestApp::new().await;
    let a = app.song("Artist", "A").await;
    app.json("POST", "/api/player/enqueue", None, json!({ "song_id": a }))
        .await;

    let response = app
        .json("POST", "/api/player/control/play", None, json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.daemon.state(), TransportState::Play);

    let response = app
        .json("POST", "/api/player/seek", None, json!({ "position": 12.5 }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let status = body_json(app.get("/api/player/status", None).await).await;
    assert_eq!(status["mode"], "queue");
    assert_eq!(status["device"]["state"], "play");
    assert_eq!(status["device"]["elapsed"], 12.5);
    assert_eq!(status["current"]["file"], "alice/Artist/A.mp3");
    assert_eq!(status["song"]["id"], a);

    let response = app
        .json("POST", "/api/player/control/dance", None, json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .json("POST", "/api/player/seek", None, json!({ "position": -1.0 }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Finite but beyond any representable duration
    let response = app
        .json("POST", "/api/player/seek", None, json!({ "position": 1e20 }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let status = body_json(app.get("/api/player/status", None).await).await;
    assert_eq!(status["device"]["elapsed"], 12.5);
}

#[tokio::test]
async fn test_player_reports_unavailable_device() {
    let app = TestApp::new().await;
    app.daemon.set_reachable(false);

    let response = app.get("/api/player/status", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .json("POST", "/api/player/mode", None, json!({ "mode": "random" }))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.state.controller.mode().await, Mode::None);

    // The daemon comes back; the next request reconnects on its own
    app.daemon.set_reachable(true);
    let response = app
        .json("POST", "/api/player/mode", None, json!({ "mode": "random" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.state.controller.mode().await, Mode::Random);
}
