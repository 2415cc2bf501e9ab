//! Core data models for rolodex.
//!
//! These types are shared across the rolodex crates and represent the
//! domain entities plus the request/response contracts exposed over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// CONTACT TYPES
// =============================================================================

/// A contact row as stored, without relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Public-relative image path (`/images/...`), empty string when no
    /// image has been uploaded.
    pub image: String,
    pub group_id: i32,
    pub owner_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
}

/// A contact with its group, optional note, and tags eagerly attached.
///
/// This is the response shape for every contact read endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactFull {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub image: String,
    pub created_at_utc: DateTime<Utc>,
    pub group: Group,
    pub note: Option<Note>,
    pub tags: Vec<Tag>,
}

/// Scalar fields for contact create/update. All four text fields are
/// required non-blank; `group_id` falls back to [`crate::DEFAULT_GROUP_ID`]
/// when it does not resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub group_id: i32,
}

/// Request to create a contact.
#[derive(Debug, Clone)]
pub struct CreateContactRequest {
    pub fields: ContactFields,
    /// Free-text note. `Some` (even empty) creates a linked note row.
    pub note: Option<String>,
    /// Public path of an already-stored avatar image, empty when none.
    pub image: String,
}

/// Request to update a contact. Scalar fields are a full replace.
#[derive(Debug, Clone)]
pub struct UpdateContactRequest {
    pub fields: ContactFields,
    /// Three-way note handling: `None` or `Some("")` deletes any existing
    /// note; non-empty upserts the single note for the contact.
    pub note: Option<String>,
    /// `Some(path)` replaces the stored image path; `None` keeps it.
    pub new_image: Option<String>,
}

// =============================================================================
// GROUP / NOTE / TAG TYPES
// =============================================================================

/// A shared category label. Reference data, never mutated by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i32,
    pub name: String,
}

/// Free-text annotation, at most one per contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub contact_id: Uuid,
    pub owner_id: Uuid,
}

/// A user-defined label, many-to-many with contacts. Tags are not
/// deduplicated by name; adding "VIP" twice yields two rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at_utc: DateTime<Utc>,
}

// =============================================================================
// ACCOUNT / SESSION TYPES
// =============================================================================

/// A registered user account. The password hash never leaves the db crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Credentials payload for register and login.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A freshly created session. The secret is returned exactly once; only
/// its SHA-256 digest is persisted.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}
