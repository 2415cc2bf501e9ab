//! Tag repository implementation.
//!
//! Tag creation lives on the contact repository (a tag is always born
//! linked to a contact); this repository covers owner-scoped listing and
//! deletion.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use rolodex_core::{Error, Result, Tag, TagRepository};

use crate::contacts::tag_from_row;

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT id, name, owner_id, created_at_utc FROM tag
             WHERE owner_id = $1
             ORDER BY created_at_utc",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        // Contact links cascade with the row.
        let result = sqlx::query("DELETE FROM tag WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("tag {}", id)));
        }
        Ok(())
    }
}
