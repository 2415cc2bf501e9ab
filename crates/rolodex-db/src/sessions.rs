//! Server-side session store backing the auth cookie.
//!
//! The cookie value is an opaque random secret. Only its SHA-256 digest is
//! persisted, so a leaked database dump cannot be replayed as a session.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use rolodex_core::{Error, NewSession, Result, SessionRepository};

/// Length of the random session secret placed in the cookie.
const SECRET_LENGTH: usize = 48;

/// PostgreSQL implementation of SessionRepository.
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Generate a cryptographically secure random string.
    fn generate_secret(length: usize) -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }

    /// Hash a secret using SHA256.
    fn hash_secret(secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, account_id: Uuid, ttl: Duration) -> Result<NewSession> {
        let secret = Self::generate_secret(SECRET_LENGTH);
        let token_hash = Self::hash_secret(&secret);
        let now = Utc::now();
        let expires_at = now + ttl;

        sqlx::query(
            "INSERT INTO session (id, account_id, token_hash, created_at_utc, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(account_id)
        .bind(&token_hash)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        debug!(
            subsystem = "database",
            component = "sessions",
            op = "create",
            account_id = %account_id,
            ttl_hours = ttl.num_hours(),
            "Session minted"
        );

        Ok(NewSession { secret, expires_at })
    }

    async fn resolve(&self, secret: &str) -> Result<Uuid> {
        let token_hash = Self::hash_secret(secret);
        let row = sqlx::query(
            "SELECT account_id FROM session WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Unauthorized("session missing or expired".into()))?;

        Ok(row.get("account_id"))
    }

    async fn revoke(&self, secret: &str) -> Result<()> {
        let token_hash = Self::hash_secret(secret);
        sqlx::query("DELETE FROM session WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
