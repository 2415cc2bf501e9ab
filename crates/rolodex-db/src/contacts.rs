//! Contact repository implementation.
//!
//! Multi-step writes (contact + note, note upserts) run inside a single
//! transaction so a crash never leaves a contact without its intended note.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use rolodex_core::{
    validate_contact_fields, validate_tag_name, ContactFields, ContactFull, ContactRepository,
    CreateContactRequest, Error, Group, Note, Result, Tag, UpdateContactRequest, DEFAULT_GROUP_ID,
};

/// What the update path should do with the contact's note.
#[derive(Debug, PartialEq, Eq)]
enum NoteAction<'a> {
    /// Remove any existing note.
    Delete,
    /// Update the existing note in place, or insert one if absent.
    Upsert(&'a str),
}

/// Three-way note handling: a missing or empty note string deletes,
/// anything else upserts.
fn note_action(note: Option<&str>) -> NoteAction<'_> {
    match note {
        None | Some("") => NoteAction::Delete,
        Some(content) => NoteAction::Upsert(content),
    }
}

/// PostgreSQL implementation of ContactRepository.
pub struct PgContactRepository {
    pool: Pool<Postgres>,
}

impl PgContactRepository {
    /// Create a new PgContactRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Resolve a requested group id inside a transaction, falling back to
    /// the reserved default group when the id does not exist.
    async fn resolve_group(tx: &mut Transaction<'_, Postgres>, group_id: i32) -> Result<Group> {
        let row = sqlx::query("SELECT id, name FROM contact_group WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&mut **tx)
            .await?;

        if let Some(row) = row {
            return Ok(Group {
                id: row.get("id"),
                name: row.get("name"),
            });
        }

        debug!(
            subsystem = "database",
            component = "contacts",
            requested_group_id = group_id,
            fallback_group_id = DEFAULT_GROUP_ID,
            "Requested group does not exist, falling back to default"
        );

        let row = sqlx::query("SELECT id, name FROM contact_group WHERE id = $1")
            .bind(DEFAULT_GROUP_ID)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                Error::Config(format!(
                    "default contact_group (id {}) is missing; run migrations",
                    DEFAULT_GROUP_ID
                ))
            })?;

        Ok(Group {
            id: row.get("id"),
            name: row.get("name"),
        })
    }

    /// Apply the three-way note rule for a contact inside a transaction.
    async fn apply_note(
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        contact_id: Uuid,
        note: Option<&str>,
    ) -> Result<()> {
        match note_action(note) {
            NoteAction::Delete => {
                sqlx::query("DELETE FROM note WHERE contact_id = $1")
                    .bind(contact_id)
                    .execute(&mut **tx)
                    .await?;
            }
            NoteAction::Upsert(content) => {
                let updated = sqlx::query("UPDATE note SET content = $2 WHERE contact_id = $1")
                    .bind(contact_id)
                    .bind(content)
                    .execute(&mut **tx)
                    .await?;
                if updated.rows_affected() == 0 {
                    sqlx::query(
                        "INSERT INTO note (id, content, contact_id, owner_id) VALUES ($1, $2, $3, $4)",
                    )
                    .bind(Uuid::now_v7())
                    .bind(content)
                    .bind(contact_id)
                    .bind(owner_id)
                    .execute(&mut **tx)
                    .await?;
                }
            }
        }
        Ok(())
    }

    /// Fetch notes and tags for a set of contacts and assemble full rows.
    async fn attach_relations(
        &self,
        owner_id: Uuid,
        contacts: Vec<(Uuid, ContactFields, String, chrono::DateTime<Utc>, Group)>,
    ) -> Result<Vec<ContactFull>> {
        let ids: Vec<Uuid> = contacts.iter().map(|c| c.0).collect();

        let note_rows = sqlx::query(
            "SELECT id, content, contact_id, owner_id FROM note
             WHERE contact_id = ANY($1) AND owner_id = $2",
        )
        .bind(&ids)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut notes: HashMap<Uuid, Note> = HashMap::with_capacity(note_rows.len());
        for row in note_rows {
            let note = note_from_row(&row);
            notes.insert(note.contact_id, note);
        }

        let tag_rows = sqlx::query(
            "SELECT ct.contact_id, t.id, t.name, t.owner_id, t.created_at_utc
             FROM contact_tag ct
             JOIN tag t ON t.id = ct.tag_id
             WHERE ct.contact_id = ANY($1)
             ORDER BY t.created_at_utc",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            let contact_id: Uuid = row.get("contact_id");
            tags.entry(contact_id).or_default().push(tag_from_row(&row));
        }

        Ok(contacts
            .into_iter()
            .map(|(id, fields, image, created_at_utc, group)| ContactFull {
                id,
                name: fields.name,
                email: fields.email,
                phone: fields.phone,
                address: fields.address,
                image,
                created_at_utc,
                group,
                note: notes.remove(&id),
                tags: tags.remove(&id).unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ContactFull>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, c.email, c.phone, c.address, c.image,
                    c.group_id, c.created_at_utc, g.name AS group_name
             FROM contact c
             JOIN contact_group g ON g.id = c.group_id
             WHERE c.owner_id = $1
             ORDER BY c.created_at_utc",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let contacts = rows.iter().map(contact_parts_from_row).collect();
        self.attach_relations(owner_id, contacts).await
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<ContactFull> {
        let row = sqlx::query(
            "SELECT c.id, c.name, c.email, c.phone, c.address, c.image,
                    c.group_id, c.created_at_utc, g.name AS group_name
             FROM contact c
             JOIN contact_group g ON g.id = c.group_id
             WHERE c.id = $1 AND c.owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::ContactNotFound(id))?;

        let contacts = vec![contact_parts_from_row(&row)];
        let mut full = self.attach_relations(owner_id, contacts).await?;
        full.pop().ok_or(Error::ContactNotFound(id))
    }

    async fn create(&self, owner_id: Uuid, req: CreateContactRequest) -> Result<Uuid> {
        validate_contact_fields(&req.fields).map_err(Error::InvalidInput)?;

        let id = Uuid::now_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let group = Self::resolve_group(&mut tx, req.fields.group_id).await?;

        sqlx::query(
            "INSERT INTO contact
                 (id, name, email, phone, address, image, group_id, owner_id, created_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id)
        .bind(&req.fields.name)
        .bind(&req.fields.email)
        .bind(&req.fields.phone)
        .bind(&req.fields.address)
        .bind(&req.image)
        .bind(group.id)
        .bind(owner_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // A supplied note string, even an empty one, creates the note row.
        if let Some(content) = &req.note {
            sqlx::query(
                "INSERT INTO note (id, content, contact_id, owner_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::now_v7())
            .bind(content)
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "contacts",
            op = "create",
            contact_id = %id,
            group_id = group.id,
            has_note = req.note.is_some(),
            has_image = !req.image.is_empty(),
            "Contact created"
        );
        Ok(id)
    }

    async fn update(&self, owner_id: Uuid, id: Uuid, req: UpdateContactRequest) -> Result<String> {
        validate_contact_fields(&req.fields).map_err(Error::InvalidInput)?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT image FROM contact WHERE id = $1 AND owner_id = $2 FOR UPDATE")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::ContactNotFound(id))?;
        let previous_image: String = row.get("image");

        let group = Self::resolve_group(&mut tx, req.fields.group_id).await?;

        let image = req.new_image.as_deref().unwrap_or(&previous_image);
        sqlx::query(
            "UPDATE contact
             SET name = $2, email = $3, phone = $4, address = $5, group_id = $6, image = $7
             WHERE id = $1",
        )
        .bind(id)
        .bind(&req.fields.name)
        .bind(&req.fields.email)
        .bind(&req.fields.phone)
        .bind(&req.fields.address)
        .bind(group.id)
        .bind(image)
        .execute(&mut *tx)
        .await?;

        Self::apply_note(&mut tx, owner_id, id, req.note.as_deref()).await?;

        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "contacts",
            op = "update",
            contact_id = %id,
            group_id = group.id,
            image_replaced = req.new_image.is_some(),
            "Contact updated"
        );
        Ok(previous_image)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<String> {
        // Note and tag links go via ON DELETE CASCADE; tag rows survive.
        let row = sqlx::query(
            "DELETE FROM contact WHERE id = $1 AND owner_id = $2 RETURNING image",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::ContactNotFound(id))?;

        debug!(
            subsystem = "database",
            component = "contacts",
            op = "delete",
            contact_id = %id,
            "Contact deleted"
        );
        Ok(row.get("image"))
    }

    async fn add_tag(&self, owner_id: Uuid, contact_id: Uuid, name: &str) -> Result<Tag> {
        validate_tag_name(name).map_err(Error::InvalidInput)?;

        let mut tx = self.pool.begin().await?;

        let owned = sqlx::query("SELECT 1 AS one FROM contact WHERE id = $1 AND owner_id = $2")
            .bind(contact_id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?;
        if owned.is_none() {
            return Err(Error::ContactNotFound(contact_id));
        }

        // Intentionally no dedupe: the same name yields a new tag row each time.
        let tag_id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO tag (id, name, owner_id, created_at_utc) VALUES ($1, $2, $3, $4)",
        )
        .bind(tag_id)
        .bind(name)
        .bind(owner_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO contact_tag (contact_id, tag_id) VALUES ($1, $2)")
            .bind(contact_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Tag {
            id: tag_id,
            name: name.to_string(),
            owner_id,
            created_at_utc: now,
        })
    }
}

/// Split a joined contact row into its assembly parts.
fn contact_parts_from_row(
    row: &sqlx::postgres::PgRow,
) -> (Uuid, ContactFields, String, chrono::DateTime<Utc>, Group) {
    (
        row.get("id"),
        ContactFields {
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            address: row.get("address"),
            group_id: row.get("group_id"),
        },
        row.get("image"),
        row.get("created_at_utc"),
        Group {
            id: row.get("group_id"),
            name: row.get("group_name"),
        },
    )
}

/// Convert a database row to a Note.
fn note_from_row(row: &sqlx::postgres::PgRow) -> Note {
    Note {
        id: row.get("id"),
        content: row.get("content"),
        contact_id: row.get("contact_id"),
        owner_id: row.get("owner_id"),
    }
}

/// Convert a database row to a Tag.
pub(crate) fn tag_from_row(row: &sqlx::postgres::PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        owner_id: row.get("owner_id"),
        created_at_utc: row.get("created_at_utc"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_note_deletes() {
        assert_eq!(note_action(None), NoteAction::Delete);
    }

    #[test]
    fn test_empty_note_deletes() {
        assert_eq!(note_action(Some("")), NoteAction::Delete);
    }

    #[test]
    fn test_non_empty_note_upserts() {
        assert_eq!(
            note_action(Some("call back on Monday")),
            NoteAction::Upsert("call back on Monday")
        );
    }

    #[test]
    fn test_whitespace_note_is_kept() {
        // Only the truly empty string deletes; whitespace is content.
        assert_eq!(note_action(Some("  ")), NoteAction::Upsert("  "));
    }
}
