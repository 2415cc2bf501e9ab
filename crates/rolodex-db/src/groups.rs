//! Group repository implementation.
//!
//! Groups are shared reference data seeded by migrations; the API never
//! mutates them, so this repository is read-only.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use rolodex_core::{Error, Group, GroupRepository, Result};

/// PostgreSQL implementation of GroupRepository.
pub struct PgGroupRepository {
    pool: Pool<Postgres>,
}

impl PgGroupRepository {
    /// Create a new PgGroupRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn list(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, name FROM contact_group ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Group {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn get(&self, id: i32) -> Result<Group> {
        let row = sqlx::query("SELECT id, name FROM contact_group WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("group {}", id)))?;

        Ok(Group {
            id: row.get("id"),
            name: row.get("name"),
        })
    }
}
