//! Users, sessions, and role assignments.
//!
//! Passwords are stored as argon2 encoded hashes. Session tokens are random
//! 256-bit values handed to the client once; only their SHA-256 hex digest
//! is persisted, so a leaked sessions table cannot be replayed.

use argon2::Config as ArgonConfig;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::DbError;

/// A row from the `users` table, minus the password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity a valid session token resolves to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with that email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(argon2::Error),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Db(DbError::Sqlx(e))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Sign-up / sign-in / sign-out
// ---------------------------------------------------------------------------

/// Creates a user and an initial session. Returns the user and the raw
/// session token.
///
/// The email is lowercased and trimmed before storage so lookups are
/// case-insensitive in practice.
///
/// # Errors
///
/// Returns [`AuthError::EmailTaken`] when the email is already registered,
/// [`AuthError::Hash`] if password hashing fails, or [`AuthError::Db`] on
/// query failure.
pub async fn sign_up(
    pool: &PgPool,
    email: &str,
    password: &str,
    session_ttl_hours: i64,
) -> Result<(UserRow, String), AuthError> {
    let email = normalize_email(email);
    let password_hash = hash_password(password).map_err(AuthError::Hash)?;

    let user = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, password_hash) \
         VALUES ($1, $2) \
         RETURNING id, email, created_at",
    )
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23505") {
                return AuthError::EmailTaken;
            }
        }
        AuthError::from(e)
    })?;

    let token = create_session(pool, user.id, session_ttl_hours).await?;
    Ok((user, token))
}

/// Verifies credentials and opens a session. Returns the user and the raw
/// session token.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] for an unknown email or a
/// wrong password (indistinguishable on purpose), or [`AuthError::Db`] on
/// query failure.
pub async fn sign_in(
    pool: &PgPool,
    email: &str,
    password: &str,
    session_ttl_hours: i64,
) -> Result<(UserRow, String), AuthError> {
    let email = normalize_email(email);

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(AuthError::InvalidCredentials);
    };

    let verified = argon2::verify_encoded(&row.password_hash, password.as_bytes()).unwrap_or(false);
    if !verified {
        return Err(AuthError::InvalidCredentials);
    }

    let token = create_session(pool, row.id, session_ttl_hours).await?;
    Ok((
        UserRow {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
        },
        token,
    ))
}

/// Deletes the session for a raw token; a no-op for unknown tokens.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn sign_out(pool: &PgPool, token: &str) -> Result<(), DbError> {
    sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
        .bind(token_digest(token))
        .execute(pool)
        .await?;

    Ok(())
}

/// Resolves a raw session token to the identity it belongs to, or `None`
/// for unknown or expired tokens.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_session(pool: &PgPool, token: &str) -> Result<Option<SessionIdentity>, DbError> {
    let identity = sqlx::query_as::<_, SessionIdentity>(
        "SELECT u.id AS user_id, u.email \
         FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token_digest = $1 AND s.expires_at > NOW()",
    )
    .bind(token_digest(token))
    .fetch_optional(pool)
    .await?;

    Ok(identity)
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// True when the user holds the given role.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn has_role(pool: &PgPool, user_id: Uuid, role: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
    )
    .bind(user_id)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Grants a role to a user; granting an already-held role is a no-op.
///
/// Request flows only ever read roles; this exists for operators and tests.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn grant_role(pool: &PgPool, user_id: Uuid, role: &str) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role) \
         VALUES ($1, $2) \
         ON CONFLICT (user_id, role) DO NOTHING",
    )
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

async fn create_session(pool: &PgPool, user_id: Uuid, ttl_hours: i64) -> Result<String, DbError> {
    let token = new_session_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    sqlx::query(
        "INSERT INTO sessions (token_digest, user_id, expires_at) \
         VALUES ($1, $2, $3)",
    )
    .bind(token_digest(&token))
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(token)
}

fn hash_password(password: &str) -> Result<String, argon2::Error> {
    let salt: [u8; 16] = rand::rng().random();
    argon2::hash_encoded(password.as_bytes(), &salt, &ArgonConfig::default())
}

fn new_session_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex_encode(&bytes)
}

fn token_digest(token: &str) -> String {
    hex_encode(&Sha256::digest(token.as_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
