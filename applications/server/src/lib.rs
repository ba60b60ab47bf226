//! Juicebox Server Library
//!
//! HTTP layer over the shared music library and the playback controller.
//!
//! This library exposes the router and its components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Build the application router, every route nested under `/api`
pub fn create_router(app_state: AppState) -> Router {
    let library_routes = Router::new()
        .route("/health", get(api::health::health))
        // Songs
        .route("/upload", post(api::upload::upload))
        .route("/songs", get(api::songs::list_songs))
        .route("/songs/:id", get(api::songs::get_song))
        .route("/search", get(api::songs::search))
        // Playlists
        .route(
            "/playlists",
            get(api::playlists::list_playlists).post(api::playlists::create_playlist),
        )
        .route(
            "/playlists/:id",
            get(api::playlists::get_playlist).delete(api::playlists::delete_playlist),
        )
        .route(
            "/playlists/:id/entries",
            get(api::playlists::get_entries).post(api::playlists::add_entry),
        )
        .route(
            "/playlists/:id/entries/:song_id",
            put(api::playlists::move_entry).delete(api::playlists::remove_entry),
        );

    let player_routes = Router::new()
        .route("/player/enqueue", post(api::player::enqueue))
        .route("/player/mode", post(api::player::switch_mode))
        .route("/player/control/:action", post(api::player::control))
        .route("/player/seek", post(api::player::seek))
        .route("/player/status", get(api::player::status));

    Router::new()
        .nest("/api", library_routes.merge(player_routes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
