//! # rolodex-db
//!
//! PostgreSQL database layer for rolodex.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for contacts, groups, tags, accounts,
//!   and sessions
//! - Filesystem storage for avatar images
//!
//! ## Example
//!
//! ```rust,no_run
//! use rolodex_db::Database;
//! use rolodex_core::{ContactRepository, CreateContactRequest, ContactFields};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/rolodex").await?;
//!     let owner_id = uuid::Uuid::new_v4();
//!
//!     let id = db.contacts.create(owner_id, CreateContactRequest {
//!         fields: ContactFields {
//!             name: "Jane Doe".into(),
//!             email: "jane@x.com".into(),
//!             phone: "5551234567".into(),
//!             address: "1 Main St".into(),
//!             group_id: 1,
//!         },
//!         note: None,
//!         image: String::new(),
//!     }).await?;
//!
//!     println!("Created contact: {}", id);
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod contacts;
pub mod groups;
pub mod image_store;
pub mod pool;
pub mod sessions;
pub mod tags;

#[cfg(test)]
mod tests;

// Test fixtures for integration tests
// Note: always compiled so integration tests (in tests/) can use them.
pub mod test_fixtures;

// Re-export core types
pub use rolodex_core::*;

// Re-export repository implementations
pub use accounts::PgAccountRepository;
pub use contacts::PgContactRepository;
pub use groups::PgGroupRepository;
pub use image_store::{sanitize_filename, ImageStore, PUBLIC_IMAGE_PREFIX};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use sessions::PgSessionRepository;
pub use tags::PgTagRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Contact repository for CRUD operations.
    pub contacts: PgContactRepository,
    /// Group repository for the shared taxonomy.
    pub groups: PgGroupRepository,
    /// Tag repository for owner-scoped listing and deletion.
    pub tags: PgTagRepository,
    /// Account repository for registration and credential checks.
    pub accounts: PgAccountRepository,
    /// Session repository backing the auth cookie.
    pub sessions: PgSessionRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            contacts: PgContactRepository::new(pool.clone()),
            groups: PgGroupRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            accounts: PgAccountRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
