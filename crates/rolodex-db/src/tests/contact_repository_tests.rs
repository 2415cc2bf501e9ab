//! Contact CRUD behavior against a live database.
//!
//! Covers: default-group fallback, required-field rejection, note
//! upsert/delete on update, tag duplication, and delete cascades.

use crate::test_fixtures::{sample_contact, TestDatabase};
use rolodex_core::{
    ContactFields, ContactRepository, Error, TagRepository, UpdateContactRequest, DEFAULT_GROUP_ID,
};

fn update_from(fields: ContactFields, note: Option<&str>) -> UpdateContactRequest {
    UpdateContactRequest {
        fields,
        note: note.map(String::from),
        new_image: None,
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_create_with_unknown_group_falls_back_to_default() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let id = test_db
        .db
        .contacts
        .create(owner.id, sample_contact(999))
        .await
        .expect("create contact");

    let contact = test_db.db.contacts.get(owner.id, id).await.unwrap();
    assert_eq!(contact.group.id, DEFAULT_GROUP_ID);
    assert!(contact.tags.is_empty());
    assert!(contact.note.is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_create_rejects_blank_required_field() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let mut req = sample_contact(1);
    req.fields.phone = "   ".to_string();

    let err = test_db.db.contacts.create(owner.id, req).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    // Nothing was persisted.
    let all = test_db.db.contacts.list(owner.id).await.unwrap();
    assert!(all.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_get_roundtrips_submitted_fields() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let id = test_db
        .db
        .contacts
        .create(owner.id, sample_contact(2))
        .await
        .unwrap();

    let contact = test_db.db.contacts.get(owner.id, id).await.unwrap();
    assert_eq!(contact.name, "Jane Doe");
    assert_eq!(contact.email, "jane@x.com");
    assert_eq!(contact.phone, "5551234567");
    assert_eq!(contact.address, "1 Main St");
    assert_eq!(contact.group.id, 2);
    assert_eq!(contact.image, "");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_create_with_note_links_it() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let mut req = sample_contact(1);
    req.note = Some("met at the conference".to_string());
    let id = test_db.db.contacts.create(owner.id, req).await.unwrap();

    let contact = test_db.db.contacts.get(owner.id, id).await.unwrap();
    let note = contact.note.expect("note attached");
    assert_eq!(note.content, "met at the conference");
    assert_eq!(note.contact_id, id);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_update_note_upserts_never_duplicates() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let id = test_db
        .db
        .contacts
        .create(owner.id, sample_contact(1))
        .await
        .unwrap();
    let fields = sample_contact(1).fields;

    // Non-empty note on a contact without one: insert.
    test_db
        .db
        .contacts
        .update(owner.id, id, update_from(fields.clone(), Some("first")))
        .await
        .unwrap();
    let first = test_db.db.contacts.get(owner.id, id).await.unwrap();
    let first_note = first.note.expect("note inserted");
    assert_eq!(first_note.content, "first");

    // Non-empty note again: update in place, same single row.
    test_db
        .db
        .contacts
        .update(owner.id, id, update_from(fields.clone(), Some("second")))
        .await
        .unwrap();
    let second = test_db.db.contacts.get(owner.id, id).await.unwrap();
    let second_note = second.note.expect("note still present");
    assert_eq!(second_note.content, "second");
    assert_eq!(second_note.id, first_note.id);

    // Empty note: delete.
    test_db
        .db
        .contacts
        .update(owner.id, id, update_from(fields, Some("")))
        .await
        .unwrap();
    let third = test_db.db.contacts.get(owner.id, id).await.unwrap();
    assert!(third.note.is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_update_returns_previous_image_path() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let mut req = sample_contact(1);
    req.image = "/images/old.png".to_string();
    let id = test_db.db.contacts.create(owner.id, req).await.unwrap();

    let mut update = update_from(sample_contact(1).fields, None);
    update.new_image = Some("/images/new.png".to_string());
    let previous = test_db.db.contacts.update(owner.id, id, update).await.unwrap();
    assert_eq!(previous, "/images/old.png");

    let contact = test_db.db.contacts.get(owner.id, id).await.unwrap();
    assert_eq!(contact.image, "/images/new.png");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_add_same_tag_twice_yields_two_rows() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let id = test_db
        .db
        .contacts
        .create(owner.id, sample_contact(1))
        .await
        .unwrap();

    let a = test_db.db.contacts.add_tag(owner.id, id, "VIP").await.unwrap();
    let b = test_db.db.contacts.add_tag(owner.id, id, "VIP").await.unwrap();
    assert_ne!(a.id, b.id);

    let contact = test_db.db.contacts.get(owner.id, id).await.unwrap();
    assert_eq!(contact.tags.len(), 2);
    assert!(contact.tags.iter().all(|t| t.name == "VIP"));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_delete_cascades_note_and_links_but_not_tags() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let mut req = sample_contact(1);
    req.note = Some("to be cascaded".to_string());
    let id = test_db.db.contacts.create(owner.id, req).await.unwrap();
    let tag = test_db.db.contacts.add_tag(owner.id, id, "keeper").await.unwrap();

    let image = test_db.db.contacts.delete(owner.id, id).await.unwrap();
    assert_eq!(image, "");

    let err = test_db.db.contacts.get(owner.id, id).await.unwrap_err();
    assert!(matches!(err, Error::ContactNotFound(_)));

    // The tag row survives the contact.
    let tags = test_db.db.tags.list(owner.id).await.unwrap();
    assert!(tags.iter().any(|t| t.id == tag.id));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_tag_delete_detaches_from_contact() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.register_account().await;

    let id = test_db
        .db
        .contacts
        .create(owner.id, sample_contact(1))
        .await
        .unwrap();
    let tag = test_db.db.contacts.add_tag(owner.id, id, "temp").await.unwrap();

    test_db.db.tags.delete(owner.id, tag.id).await.unwrap();

    let contact = test_db.db.contacts.get(owner.id, id).await.unwrap();
    assert!(contact.tags.is_empty());

    test_db.cleanup().await;
}
