use crate::is_unique_violation;
use juicebox_core::{error::Result, JuiceboxError, User, UserId};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        created_at: row.get("created_at"),
    }
}

/// Create a new user
pub async fn create(pool: &SqlitePool, username: &str) -> Result<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(JuiceboxError::validation("Username must not be empty"));
    }

    let result = sqlx::query("INSERT INTO users (username) VALUES (?)")
        .bind(username)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                JuiceboxError::validation(format!("Username already exists: {}", username))
            } else {
                e.into()
            }
        })?;

    get_by_id(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| JuiceboxError::storage("Failed to retrieve created user"))
}

/// Get user by ID
pub async fn get_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Get user by login name
pub async fn get_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Get all users
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query("SELECT id, username, created_at FROM users ORDER BY username")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(user_from_row).collect())
}
