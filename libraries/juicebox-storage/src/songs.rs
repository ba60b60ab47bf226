use crate::is_unique_violation;
use juicebox_core::{error::Result, CreateSong, JuiceboxError, Song, SongId, SongSummary};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use std::path::PathBuf;

pub(crate) const SONG_COLUMNS: &str =
    "id, owner_id, title, artist, album, checksum, location, cover_url, created_at";

pub(crate) fn song_from_row(row: &SqliteRow) -> Song {
    Song {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        artist: row.get("artist"),
        album: row.get("album"),
        checksum: row.get("checksum"),
        location: PathBuf::from(row.get::<String, _>("location")),
        cover_url: row.get("cover_url"),
        created_at: row.get("created_at"),
    }
}

/// Insert a song on an existing connection or transaction
///
/// A UNIQUE violation on `(artist, title)` or `checksum` is reported as
/// `JuiceboxError::Conflict`; callers racing on the same upload rely on this.
pub async fn insert(conn: &mut SqliteConnection, song: &CreateSong) -> Result<Song> {
    let result = sqlx::query(
        r#"
        INSERT INTO songs (owner_id, title, artist, album, checksum, location, cover_url)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(song.owner_id)
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.checksum)
    .bind(song.location.to_string_lossy().to_string())
    .bind(&song.cover_url)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            JuiceboxError::conflict(format!(
                "{} - {} is already in the library",
                song.artist, song.title
            ))
        } else {
            e.into()
        }
    })?;

    let id = result.last_insert_rowid();
    let row = sqlx::query(&format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(song_from_row(&row))
}

/// Create a new song
pub async fn create(pool: &SqlitePool, song: &CreateSong) -> Result<Song> {
    let mut conn = pool.acquire().await?;
    insert(&mut conn, song).await
}

/// Get song by ID
pub async fn get_by_id(pool: &SqlitePool, id: SongId) -> Result<Option<Song>> {
    let row = sqlx::query(&format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(song_from_row))
}

/// Get all songs, oldest first
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Song>> {
    let rows = sqlx::query(&format!("SELECT {SONG_COLUMNS} FROM songs ORDER BY id"))
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(song_from_row).collect())
}

/// Find the first song with exactly this title
pub async fn find_by_title(pool: &SqlitePool, title: &str) -> Result<Option<Song>> {
    let row = sqlx::query(&format!(
        "SELECT {SONG_COLUMNS} FROM songs WHERE title = ? ORDER BY id LIMIT 1"
    ))
    .bind(title)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(song_from_row))
}

/// Find a song that an upload would duplicate
///
/// Matches on same artist AND title, or on same checksum.
pub async fn find_duplicate(
    pool: &SqlitePool,
    artist: &str,
    title: &str,
    checksum: &str,
) -> Result<Option<Song>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {SONG_COLUMNS} FROM songs
        WHERE (artist = ? AND title = ?) OR checksum = ?
        ORDER BY id
        LIMIT 1
        "#
    ))
    .bind(artist)
    .bind(title)
    .bind(checksum)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(song_from_row))
}

/// Page through the catalog (1-based pages)
pub async fn list_page(pool: &SqlitePool, page: u32, per_page: u32) -> Result<Vec<SongSummary>> {
    let page = page.max(1);
    let offset = i64::from(page - 1) * i64::from(per_page);

    let rows = sqlx::query(
        r#"
        SELECT s.id, s.title, s.artist, s.album, u.username AS owner_name
        FROM songs s
        INNER JOIN users u ON s.owner_id = u.id
        ORDER BY s.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(i64::from(per_page))
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| SongSummary {
            id: row.get("id"),
            title: row.get("title"),
            artist: row.get("artist"),
            album: row.get("album"),
            owner_name: row.get("owner_name"),
        })
        .collect())
}

/// Search songs by title, album or artist (case-insensitive substring)
pub async fn search(pool: &SqlitePool, query: &str, limit: u32) -> Result<Vec<Song>> {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let search_pattern = format!("%{}%", escaped);

    let rows = sqlx::query(&format!(
        r#"
        SELECT {SONG_COLUMNS} FROM songs
        WHERE title LIKE ?1 ESCAPE '\'
           OR album LIKE ?1 ESCAPE '\'
           OR artist LIKE ?1 ESCAPE '\'
        ORDER BY artist, title
        LIMIT ?2
        "#
    ))
    .bind(&search_pattern)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(song_from_row).collect())
}

/// Number of songs in the library
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM songs")
        .fetch_one(pool)
        .await?;

    Ok(row.get("count"))
}
