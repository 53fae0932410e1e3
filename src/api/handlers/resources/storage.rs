//! Database access for owned resources.
//!
//! Owner columns are written once at insert time; no update statement here
//! touches them.

use anyhow::{Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{CommentResponse, PlaylistResponse, TweetResponse, VideoResponse};

fn tweet_from_row(row: &PgRow) -> TweetResponse {
    TweetResponse {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn comment_from_row(row: &PgRow) -> CommentResponse {
    CommentResponse {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        video_id: row.get("video_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn playlist_from_row(row: &PgRow) -> PlaylistResponse {
    PlaylistResponse {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn video_from_row(row: &PgRow) -> VideoResponse {
    VideoResponse {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        video_url: row.get("video_url"),
        thumbnail_url: row.get("thumbnail_url"),
        duration: row.get("duration"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

async fn owner_of(pool: &PgPool, query: &'static str, id: Uuid) -> Result<Option<Uuid>> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup resource owner")?;

    Ok(row.map(|row| row.get("owner_id")))
}

// --- tweets -------------------------------------------------------------

pub(super) async fn insert_tweet(
    pool: &PgPool,
    owner_id: Uuid,
    content: &str,
) -> Result<TweetResponse> {
    let query = r"
        INSERT INTO tweets (owner_id, content)
        VALUES ($1, $2)
        RETURNING id, owner_id, content, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(owner_id)
        .bind(content)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert tweet")?;
    Ok(tweet_from_row(&row))
}

pub(super) async fn tweet_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>> {
    owner_of(pool, "SELECT owner_id FROM tweets WHERE id = $1", id).await
}

pub(super) async fn update_tweet(pool: &PgPool, id: Uuid, content: &str) -> Result<TweetResponse> {
    let query = r"
        UPDATE tweets
        SET content = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, owner_id, content, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(content)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to update tweet")?;
    Ok(tweet_from_row(&row))
}

pub(super) async fn delete_tweet(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "DELETE FROM tweets WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete tweet")?;
    Ok(())
}

// --- comments -----------------------------------------------------------

pub(super) async fn video_exists(pool: &PgPool, id: Uuid) -> Result<bool> {
    let query = "SELECT 1 FROM videos WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check video existence")?;
    Ok(row.is_some())
}

pub(super) async fn insert_comment(
    pool: &PgPool,
    owner_id: Uuid,
    video_id: Uuid,
    content: &str,
) -> Result<CommentResponse> {
    let query = r"
        INSERT INTO comments (owner_id, video_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, owner_id, video_id, content, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(owner_id)
        .bind(video_id)
        .bind(content)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert comment")?;
    Ok(comment_from_row(&row))
}

pub(super) async fn comment_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>> {
    owner_of(pool, "SELECT owner_id FROM comments WHERE id = $1", id).await
}

pub(super) async fn update_comment(
    pool: &PgPool,
    id: Uuid,
    content: &str,
) -> Result<CommentResponse> {
    let query = r"
        UPDATE comments
        SET content = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, owner_id, video_id, content, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(content)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to update comment")?;
    Ok(comment_from_row(&row))
}

pub(super) async fn delete_comment(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "DELETE FROM comments WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete comment")?;
    Ok(())
}

// --- playlists ----------------------------------------------------------

pub(super) async fn insert_playlist(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<PlaylistResponse> {
    let query = r"
        INSERT INTO playlists (owner_id, name, description)
        VALUES ($1, $2, $3)
        RETURNING id, owner_id, name, description, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert playlist")?;
    Ok(playlist_from_row(&row))
}

pub(super) async fn playlist_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>> {
    owner_of(pool, "SELECT owner_id FROM playlists WHERE id = $1", id).await
}

pub(super) async fn update_playlist(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<PlaylistResponse> {
    let query = r"
        UPDATE playlists
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, owner_id, name, description, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to update playlist")?;
    Ok(playlist_from_row(&row))
}

pub(super) async fn delete_playlist(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "DELETE FROM playlists WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete playlist")?;
    Ok(())
}

pub(super) async fn add_playlist_video(
    pool: &PgPool,
    playlist_id: Uuid,
    video_id: Uuid,
) -> Result<()> {
    // Re-adding an existing entry is a no-op.
    let query = r"
        INSERT INTO playlist_videos (playlist_id, video_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(playlist_id)
        .bind(video_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to add video to playlist")?;
    Ok(())
}

pub(super) async fn remove_playlist_video(
    pool: &PgPool,
    playlist_id: Uuid,
    video_id: Uuid,
) -> Result<bool> {
    let query = "DELETE FROM playlist_videos WHERE playlist_id = $1 AND video_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(playlist_id)
        .bind(video_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to remove video from playlist")?;
    Ok(result.rows_affected() > 0)
}

// --- videos -------------------------------------------------------------

pub(super) struct NewVideo<'a> {
    pub(super) owner_id: Uuid,
    pub(super) title: &'a str,
    pub(super) description: Option<&'a str>,
    pub(super) video_url: &'a str,
    pub(super) thumbnail_url: &'a str,
    pub(super) duration: Option<f64>,
}

pub(super) async fn insert_video(pool: &PgPool, video: &NewVideo<'_>) -> Result<VideoResponse> {
    let query = r"
        INSERT INTO videos (owner_id, title, description, video_url, thumbnail_url, duration)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, owner_id, title, description, video_url, thumbnail_url,
                  duration, is_published, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(video.owner_id)
        .bind(video.title)
        .bind(video.description)
        .bind(video.video_url)
        .bind(video.thumbnail_url)
        .bind(video.duration)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert video")?;
    Ok(video_from_row(&row))
}

pub(super) async fn find_video(pool: &PgPool, id: Uuid) -> Result<Option<VideoResponse>> {
    let query = r"
        SELECT id, owner_id, title, description, video_url, thumbnail_url,
               duration, is_published, created_at, updated_at
        FROM videos
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup video")?;
    Ok(row.map(|row| video_from_row(&row)))
}

pub(super) async fn update_video(
    pool: &PgPool,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<VideoResponse> {
    let query = r"
        UPDATE videos
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, owner_id, title, description, video_url, thumbnail_url,
                  duration, is_published, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to update video")?;
    Ok(video_from_row(&row))
}

pub(super) async fn toggle_publish(pool: &PgPool, id: Uuid) -> Result<VideoResponse> {
    let query = r"
        UPDATE videos
        SET is_published = NOT is_published, updated_at = NOW()
        WHERE id = $1
        RETURNING id, owner_id, title, description, video_url, thumbnail_url,
                  duration, is_published, created_at, updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to toggle publish state")?;
    Ok(video_from_row(&row))
}

pub(super) async fn delete_video(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = "DELETE FROM videos WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete video")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
    use std::time::Duration;

    fn unreachable_pool() -> PgPool {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("invalid")
            .database("invalid")
            .ssl_mode(PgSslMode::Disable);
        PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(options)
    }

    #[tokio::test]
    async fn tweet_owner_fails_without_db() {
        let pool = unreachable_pool();
        assert!(tweet_owner(&pool, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn video_exists_fails_without_db() {
        let pool = unreachable_pool();
        assert!(video_exists(&pool, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn toggle_publish_fails_without_db() {
        let pool = unreachable_pool();
        assert!(toggle_publish(&pool, Uuid::new_v4()).await.is_err());
    }
}
