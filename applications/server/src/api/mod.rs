/// API route modules
pub mod health;
pub mod player;
pub mod playlists;
pub mod songs;
pub mod upload;
