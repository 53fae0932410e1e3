//! Database access for user credentials and session fingerprints.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Identity fields safe to hand to downstream code. Never carries the
/// password hash or the refresh fingerprint.
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) avatar_url: String,
    pub(crate) cover_url: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

/// User plus the stored hash, for password verification at login.
pub(super) struct LoginRecord {
    pub(super) user: UserRecord,
    pub(super) password_hash: String,
}

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(UserRecord),
    Conflict,
}

pub(super) struct NewUser<'a> {
    pub(super) username: &'a str,
    pub(super) email: &'a str,
    pub(super) full_name: &'a str,
    pub(super) password_hash: &'a str,
    pub(super) avatar_url: &'a str,
    pub(super) cover_url: Option<&'a str>,
}

const USER_COLUMNS: &str =
    "id, username, email, full_name, avatar_url, cover_url, created_at";

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        avatar_url: row.get("avatar_url"),
        cover_url: row.get("cover_url"),
        created_at: row.get("created_at"),
    }
}

/// Insert a new user, relying on the unique constraints for duplicate
/// detection so the check and the write cannot race.
pub(super) async fn insert_user(pool: &PgPool, new_user: &NewUser<'_>) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users
            (username, email, full_name, password_hash, avatar_url, cover_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, username, email, full_name, avatar_url, cover_url, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.full_name)
        .bind(new_user.password_hash)
        .bind(new_user.avatar_url)
        .bind(new_user.cover_url)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(user_from_row(&row))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Look up a user with its password hash by username or email.
pub(super) async fn find_login_record(
    pool: &PgPool,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<LoginRecord>> {
    let query = r"
        SELECT id, username, email, full_name, avatar_url, cover_url, created_at, password_hash
        FROM users
        WHERE ($1::text IS NOT NULL AND username = $1)
           OR ($2::text IS NOT NULL AND email = $2)
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup login record")?;

    Ok(row.map(|row| LoginRecord {
        password_hash: row.get("password_hash"),
        user: user_from_row(&row),
    }))
}

/// Load a user by id, as the authentication gate does for every request.
pub(crate) async fn find_user(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Stored password hash for the current-password check.
pub(super) async fn find_password_hash(pool: &PgPool, id: Uuid) -> Result<Option<String>> {
    let query = "SELECT password_hash FROM users WHERE id = $1";
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
        .context("failed to lookup password hash")?;

    Ok(row.map(|row| row.get("password_hash")))
}

/// Overwrite the refresh-token fingerprint. This is the rotation point: the
/// previously stored fingerprint (and with it any prior session) stops
/// matching.
pub(super) async fn store_refresh_fingerprint(
    pool: &PgPool,
    id: Uuid,
    fingerprint: &str,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET refresh_token_hash = $2, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(fingerprint)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store refresh fingerprint")?;
    Ok(())
}

/// Clear the fingerprint on logout. Idempotent; clearing an already-cleared
/// session is fine.
pub(super) async fn clear_refresh_fingerprint(pool: &PgPool, id: Uuid) -> Result<()> {
    let query = r"
        UPDATE users
        SET refresh_token_hash = NULL, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear refresh fingerprint")?;
    Ok(())
}

/// Currently pinned fingerprint for a user.
///
/// Outer `None` means the user row is gone; inner `None` means no active
/// session.
pub(super) async fn stored_fingerprint(pool: &PgPool, id: Uuid) -> Result<Option<Option<String>>> {
    let query = "SELECT refresh_token_hash FROM users WHERE id = $1";
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
        .context("failed to lookup refresh fingerprint")?;

    Ok(row.map(|row| row.get("refresh_token_hash")))
}

/// Scoped password update. Touches only the hash so it cannot drift from
/// the full-profile update paths in validation coverage.
pub(super) async fn update_password_hash(pool: &PgPool, id: Uuid, hash: &str) -> Result<()> {
    let query = r"
        UPDATE users
        SET password_hash = $2, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password hash")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
    use std::time::Duration;

    pub(crate) fn unreachable_pool() -> PgPool {
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

    #[test]
    fn signup_outcome_debug_names() {
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
    }

    #[tokio::test]
    async fn find_user_fails_without_db() {
        let pool = unreachable_pool();
        assert!(find_user(&pool, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn insert_user_fails_without_db() {
        let pool = unreachable_pool();
        let new_user = NewUser {
            username: "alice",
            email: "a@x.com",
            full_name: "Alice",
            password_hash: "$argon2id$stub",
            avatar_url: "https://media.test/avatar.png",
            cover_url: None,
        };
        assert!(insert_user(&pool, &new_user).await.is_err());
    }

    #[tokio::test]
    async fn stored_fingerprint_fails_without_db() {
        let pool = unreachable_pool();
        assert!(stored_fingerprint(&pool, Uuid::new_v4()).await.is_err());
    }
}
