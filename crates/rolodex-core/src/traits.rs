//! Repository trait definitions.
//!
//! Every repository takes the owner id explicitly where ownership applies.
//! Nothing is read from ambient request state, which keeps the traits
//! testable without a simulated HTTP pipeline.

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::models::{
    Account, ContactFull, CreateContactRequest, Group, NewSession, Tag, UpdateContactRequest,
};
use crate::Result;

/// Contact CRUD, scoped by owning user.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// List all contacts owned by the caller, relations attached.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ContactFull>>;

    /// Fetch one contact with relations, or `ContactNotFound`.
    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<ContactFull>;

    /// Insert a contact (and its note, when supplied) in one transaction.
    /// Returns the new contact id.
    async fn create(&self, owner_id: Uuid, req: CreateContactRequest) -> Result<Uuid>;

    /// Replace scalar fields, re-resolve the group, and apply three-way
    /// note handling in one transaction. Returns the image path that was
    /// stored before the update so the caller can clean up a superseded
    /// file (empty string when there was none).
    async fn update(&self, owner_id: Uuid, id: Uuid, req: UpdateContactRequest) -> Result<String>;

    /// Delete a contact the caller owns. The note and tag links go with it
    /// (tag rows survive). Returns the stored image path for file cleanup.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<String>;

    /// Create a brand-new tag row (no dedupe by name) and link it to the
    /// given contact. Fails with `ContactNotFound` when the contact is
    /// absent or owned by someone else.
    async fn add_tag(&self, owner_id: Uuid, contact_id: Uuid, name: &str) -> Result<Tag>;
}

/// Read-only lookup of the shared group taxonomy.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// All groups, ordered by id.
    async fn list(&self) -> Result<Vec<Group>>;

    /// One group by id, or `NotFound`.
    async fn get(&self, id: i32) -> Result<Group>;
}

/// Tag listing and deletion, scoped by owning user.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// All tags owned by the caller.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<Tag>>;

    /// Delete a tag the caller owns, or `NotFound`. Contact links cascade.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()>;
}

/// Account registration and credential verification.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Register a new account. Duplicate emails surface as a database
    /// unique violation.
    async fn create(&self, email: &str, password: &str) -> Result<Account>;

    /// Verify credentials, returning the account or `Unauthorized`.
    async fn verify(&self, email: &str, password: &str) -> Result<Account>;

    /// Fetch an account by id.
    async fn get(&self, id: Uuid) -> Result<Account>;
}

/// Server-side cookie session store.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Mint a session for the account. The returned secret goes into the
    /// cookie; only its hash is stored.
    async fn create(&self, account_id: Uuid, ttl: Duration) -> Result<NewSession>;

    /// Resolve a cookie secret to the owning account id, or `Unauthorized`
    /// when the session is unknown or expired.
    async fn resolve(&self, secret: &str) -> Result<Uuid>;

    /// Revoke the session behind the given secret. Idempotent.
    async fn revoke(&self, secret: &str) -> Result<()>;

    /// Drop expired sessions; returns the number removed.
    async fn purge_expired(&self) -> Result<u64>;
}
