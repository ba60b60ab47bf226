//! Playlists and the playlist ordering engine
//!
//! Every mutation of a playlist's entries runs in one transaction that performs the
//! resequencing, the insert or delete, and a density check of the resulting
//! positions. Readers therefore never observe duplicate or missing positions.
//!
//! The transaction's first statement always writes (`touch`), so `SQLite` takes the
//! write lock up front and concurrent editors queue on the busy timeout instead of
//! failing on a lock upgrade.

use crate::songs::{song_from_row, SONG_COLUMNS};
use juicebox_core::{
    error::Result, CreatePlaylist, JuiceboxError, MediaRoot, Playlist, PlaylistEntry, PlaylistId,
    QueueRef, Song, SongId, UserId,
};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};

fn playlist_from_row(row: &SqliteRow) -> Playlist {
    Playlist {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        is_public: row.get::<i64, _>("is_public") != 0,
        created_at: row.get("created_at"),
    }
}

fn entry_from_row(row: &SqliteRow) -> PlaylistEntry {
    PlaylistEntry {
        id: row.get("id"),
        playlist_id: row.get("playlist_id"),
        song_id: row.get("song_id"),
        contributor_id: row.get("contributor_id"),
        position: row.get("position"),
    }
}

/// Create new playlist
pub async fn create(pool: &SqlitePool, playlist: CreatePlaylist) -> Result<Playlist> {
    let title = playlist.title.trim();
    if title.is_empty() {
        return Err(JuiceboxError::validation("Playlist title must not be empty"));
    }

    let result = sqlx::query("INSERT INTO playlists (owner_id, title, is_public) VALUES (?, ?, ?)")
        .bind(playlist.owner_id)
        .bind(title)
        .bind(playlist.is_public)
        .execute(pool)
        .await?;

    get_by_id(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| JuiceboxError::storage("Failed to retrieve created playlist"))
}

/// Get playlist by ID
pub async fn get_by_id(pool: &SqlitePool, id: PlaylistId) -> Result<Option<Playlist>> {
    let row = sqlx::query(
        "SELECT id, owner_id, title, is_public, created_at FROM playlists WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(playlist_from_row))
}

/// Playlists a user can see: their own plus every public one
pub async fn get_visible(pool: &SqlitePool, user_id: UserId) -> Result<Vec<Playlist>> {
    let rows = sqlx::query(
        r#"
        SELECT id, owner_id, title, is_public, created_at
        FROM playlists
        WHERE owner_id = ? OR is_public = 1
        ORDER BY title, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(playlist_from_row).collect())
}

/// Delete playlist (owner only); its entries go with it
pub async fn delete(pool: &SqlitePool, id: PlaylistId, user_id: UserId) -> Result<()> {
    match get_by_id(pool, id).await? {
        Some(p) if p.owner_id == user_id => {
            sqlx::query("DELETE FROM playlists WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;
            Ok(())
        }
        Some(_) => Err(JuiceboxError::validation(
            "Only the owner can delete a playlist",
        )),
        None => Err(JuiceboxError::not_found("Playlist", id)),
    }
}

/// Add a song to a playlist
///
/// Appends when `position` is `None`. Otherwise `position` must lie in `1..=N+1`;
/// entries at or after it move down by one. Returns the position of the new entry.
pub async fn add_entry(
    pool: &SqlitePool,
    playlist_id: PlaylistId,
    song_id: SongId,
    contributor_id: Option<UserId>,
    position: Option<i64>,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    touch(&mut tx, playlist_id).await?;

    let song_exists = sqlx::query("SELECT 1 FROM songs WHERE id = ?")
        .bind(song_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !song_exists {
        return Err(JuiceboxError::not_found("Song", song_id));
    }

    if entry_position(&mut tx, playlist_id, song_id).await?.is_some() {
        return Err(JuiceboxError::validation(format!(
            "Song {} is already in playlist {}",
            song_id, playlist_id
        )));
    }

    let count = entry_count(&mut tx, playlist_id).await?;
    let position = position.unwrap_or(count + 1);
    if position < 1 || position > count + 1 {
        return Err(JuiceboxError::validation(format!(
            "Position {} is outside 1..={}",
            position,
            count + 1
        )));
    }

    if position <= count {
        shift_positions(&mut tx, playlist_id, position, count, 1).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO playlist_entries (playlist_id, song_id, contributor_id, position)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(playlist_id)
    .bind(song_id)
    .bind(contributor_id)
    .bind(position)
    .execute(&mut *tx)
    .await?;

    ensure_dense(&mut tx, playlist_id).await?;
    tx.commit().await?;

    tracing::debug!(playlist_id, song_id, position, "Added playlist entry");
    Ok(position)
}

/// Remove a song from a playlist, closing the gap it leaves
pub async fn remove_entry(pool: &SqlitePool, playlist_id: PlaylistId, song_id: SongId) -> Result<()> {
    let mut tx = pool.begin().await?;

    touch(&mut tx, playlist_id).await?;

    let Some(position) = entry_position(&mut tx, playlist_id, song_id).await? else {
        return Err(JuiceboxError::not_found(
            "Playlist entry",
            format!("{}/{}", playlist_id, song_id),
        ));
    };

    sqlx::query("DELETE FROM playlist_entries WHERE playlist_id = ? AND song_id = ?")
        .bind(playlist_id)
        .bind(song_id)
        .execute(&mut *tx)
        .await?;

    let count = entry_count(&mut tx, playlist_id).await?;
    if position <= count {
        shift_positions(&mut tx, playlist_id, position + 1, count + 1, -1).await?;
    }

    ensure_dense(&mut tx, playlist_id).await?;
    tx.commit().await?;

    tracing::debug!(playlist_id, song_id, position, "Removed playlist entry");
    Ok(())
}

/// Move a song to a new position within its playlist
pub async fn move_entry(
    pool: &SqlitePool,
    playlist_id: PlaylistId,
    song_id: SongId,
    new_position: i64,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    touch(&mut tx, playlist_id).await?;

    let Some(old_position) = entry_position(&mut tx, playlist_id, song_id).await? else {
        return Err(JuiceboxError::not_found(
            "Playlist entry",
            format!("{}/{}", playlist_id, song_id),
        ));
    };

    let count = entry_count(&mut tx, playlist_id).await?;
    if new_position < 1 || new_position > count {
        return Err(JuiceboxError::validation(format!(
            "Position {} is outside 1..={}",
            new_position, count
        )));
    }

    if old_position == new_position {
        return Ok(());
    }

    // Park the moving entry on 0 while its neighbours shift
    set_position(&mut tx, playlist_id, song_id, 0).await?;
    if new_position < old_position {
        shift_positions(&mut tx, playlist_id, new_position, old_position - 1, 1).await?;
    } else {
        shift_positions(&mut tx, playlist_id, old_position + 1, new_position, -1).await?;
    }
    set_position(&mut tx, playlist_id, song_id, new_position).await?;

    ensure_dense(&mut tx, playlist_id).await?;
    tx.commit().await?;

    Ok(())
}

/// Entries of a playlist in ascending position order
pub async fn get_entries(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<Vec<PlaylistEntry>> {
    ensure_exists(pool, playlist_id).await?;

    let rows = sqlx::query(
        r#"
        SELECT id, playlist_id, song_id, contributor_id, position
        FROM playlist_entries
        WHERE playlist_id = ?
        ORDER BY position
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(entry_from_row).collect())
}

/// Songs of a playlist in position order
pub async fn get_songs(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<Vec<Song>> {
    ensure_exists(pool, playlist_id).await?;

    let columns = SONG_COLUMNS
        .split(", ")
        .map(|c| format!("s.{c} AS {c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let rows = sqlx::query(&format!(
        r#"
        SELECT {columns}
        FROM playlist_entries pe
        INNER JOIN songs s ON pe.song_id = s.id
        WHERE pe.playlist_id = ?
        ORDER BY pe.position
        "#
    ))
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(song_from_row).collect())
}

/// Queue references for a playlist's songs in position order
pub async fn as_queueable_uris(
    pool: &SqlitePool,
    playlist_id: PlaylistId,
    root: &MediaRoot,
) -> Result<Vec<QueueRef>> {
    Ok(get_songs(pool, playlist_id)
        .await?
        .iter()
        .map(|song| root.queue_ref(&song.location))
        .collect())
}

// Helper functions

async fn ensure_exists(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<()> {
    let exists = sqlx::query("SELECT 1 FROM playlists WHERE id = ?")
        .bind(playlist_id)
        .fetch_optional(pool)
        .await?
        .is_some();

    if exists {
        Ok(())
    } else {
        Err(JuiceboxError::not_found("Playlist", playlist_id))
    }
}

/// Bump `updated_at`; doubles as the existence check and takes the write lock
async fn touch(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<()> {
    let result = sqlx::query("UPDATE playlists SET updated_at = datetime('now') WHERE id = ?")
        .bind(playlist_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(JuiceboxError::not_found("Playlist", playlist_id));
    }
    Ok(())
}

async fn entry_position(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
    song_id: SongId,
) -> Result<Option<i64>> {
    let row = sqlx::query(
        "SELECT position FROM playlist_entries WHERE playlist_id = ? AND song_id = ?",
    )
    .bind(playlist_id)
    .bind(song_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.get("position")))
}

async fn entry_count(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM playlist_entries WHERE playlist_id = ?")
        .bind(playlist_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.get("count"))
}

async fn set_position(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
    song_id: SongId,
    position: i64,
) -> Result<()> {
    sqlx::query("UPDATE playlist_entries SET position = ? WHERE playlist_id = ? AND song_id = ?")
        .bind(position)
        .bind(playlist_id)
        .bind(song_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Shift positions in `from..=to` by `delta`
///
/// `UNIQUE(playlist_id, position)` is checked row by row, so the shifted rows pass
/// through negative positions first and are flipped back in a second statement.
async fn shift_positions(
    conn: &mut SqliteConnection,
    playlist_id: PlaylistId,
    from: i64,
    to: i64,
    delta: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE playlist_entries
        SET position = -(position + ?)
        WHERE playlist_id = ? AND position >= ? AND position <= ?
        "#,
    )
    .bind(delta)
    .bind(playlist_id)
    .bind(from)
    .bind(to)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE playlist_entries SET position = -position WHERE playlist_id = ? AND position < 0",
    )
    .bind(playlist_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fail closed unless positions are exactly `1..=N`
async fn ensure_dense(conn: &mut SqliteConnection, playlist_id: PlaylistId) -> Result<()> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS n,
            COUNT(DISTINCT position) AS distinct_n,
            COALESCE(MIN(position), 0) AS lo,
            COALESCE(MAX(position), 0) AS hi
        FROM playlist_entries
        WHERE playlist_id = ?
        "#,
    )
    .bind(playlist_id)
    .fetch_one(&mut *conn)
    .await?;

    let n: i64 = row.get("n");
    let distinct_n: i64 = row.get("distinct_n");
    let lo: i64 = row.get("lo");
    let hi: i64 = row.get("hi");

    let dense = n == distinct_n && (n == 0 || (lo == 1 && hi == n));
    if !dense {
        tracing::error!(
            playlist_id,
            n,
            lo,
            hi,
            "Playlist positions are not dense, rolling back"
        );
        return Err(JuiceboxError::state(format!(
            "playlist {} has {} entries spanning positions {}..={}",
            playlist_id, n, lo, hi
        )));
    }
    Ok(())
}
