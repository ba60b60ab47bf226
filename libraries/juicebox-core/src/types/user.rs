/// User domain type
use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// User account (owner/contributor of songs and playlists)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,

    /// Unique login name
    pub username: String,

    /// Account creation timestamp (ISO string)
    pub created_at: String,
}
