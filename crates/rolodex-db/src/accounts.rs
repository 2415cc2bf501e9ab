//! Account repository implementation.
//!
//! Passwords are hashed with Argon2id; the PHC-format hash string is the
//! only thing persisted and it never crosses the crate boundary.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use rolodex_core::{Account, AccountRepository, Error, Result};

/// PostgreSQL implementation of AccountRepository.
pub struct PgAccountRepository {
    pool: Pool<Postgres>,
}

impl PgAccountRepository {
    /// Create a new PgAccountRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_password(password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, email: &str, password: &str) -> Result<Account> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidInput("a valid email is required".into()));
        }
        if password.len() < 8 {
            return Err(Error::InvalidInput(
                "password must be at least 8 characters".into(),
            ));
        }

        let id = Uuid::now_v7();
        let now = Utc::now();
        let password_hash = Self::hash_password(password)?;

        sqlx::query(
            "INSERT INTO account (id, email, password_hash, created_at_utc)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(
            subsystem = "database",
            component = "accounts",
            op = "create",
            account_id = %id,
            "Account registered"
        );

        Ok(Account {
            id,
            email,
            created_at_utc: now,
        })
    }

    async fn verify(&self, email: &str, password: &str) -> Result<Account> {
        let email = email.trim().to_lowercase();
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at_utc FROM account WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        // Same error for unknown email and wrong password.
        let Some(row) = row else {
            return Err(Error::Unauthorized("invalid email or password".into()));
        };

        let stored_hash: String = row.get("password_hash");
        if !Self::verify_password(password, &stored_hash) {
            return Err(Error::Unauthorized("invalid email or password".into()));
        }

        Ok(Account {
            id: row.get("id"),
            email: row.get("email"),
            created_at_utc: row.get("created_at_utc"),
        })
    }

    async fn get(&self, id: Uuid) -> Result<Account> {
        let row = sqlx::query("SELECT id, email, created_at_utc FROM account WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))?;

        Ok(Account {
            id: row.get("id"),
            email: row.get("email"),
            created_at_utc: row.get("created_at_utc"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_roundtrip() {
        let hash = PgAccountRepository::hash_password("correct horse battery").unwrap();
        assert!(PgAccountRepository::verify_password(
            "correct horse battery",
            &hash
        ));
        assert!(!PgAccountRepository::verify_password("wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = PgAccountRepository::hash_password("same input").unwrap();
        let b = PgAccountRepository::hash_password("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_stored_hash_never_verifies() {
        assert!(!PgAccountRepository::verify_password("pw", "not-a-phc-hash"));
    }
}
