//! Multi-tenancy isolation: one user's rows must never leak to another.

use crate::test_fixtures::{sample_contact, TestDatabase};
use rolodex_core::{ContactRepository, Error, TagRepository, UpdateContactRequest};

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_list_is_scoped_to_owner() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.register_account().await;
    let bob = test_db.register_account().await;

    let alice_id = test_db
        .db
        .contacts
        .create(alice.id, sample_contact(1))
        .await
        .unwrap();
    test_db
        .db
        .contacts
        .create(bob.id, sample_contact(1))
        .await
        .unwrap();

    let alice_contacts = test_db.db.contacts.list(alice.id).await.unwrap();
    assert_eq!(alice_contacts.len(), 1);
    assert_eq!(alice_contacts[0].id, alice_id);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_cross_user_get_update_delete_are_not_found() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.register_account().await;
    let bob = test_db.register_account().await;

    let id = test_db
        .db
        .contacts
        .create(alice.id, sample_contact(1))
        .await
        .unwrap();

    let err = test_db.db.contacts.get(bob.id, id).await.unwrap_err();
    assert!(matches!(err, Error::ContactNotFound(_)));

    let update = UpdateContactRequest {
        fields: sample_contact(1).fields,
        note: None,
        new_image: None,
    };
    let err = test_db.db.contacts.update(bob.id, id, update).await.unwrap_err();
    assert!(matches!(err, Error::ContactNotFound(_)));

    let err = test_db.db.contacts.delete(bob.id, id).await.unwrap_err();
    assert!(matches!(err, Error::ContactNotFound(_)));

    // Alice's contact is untouched.
    assert!(test_db.db.contacts.get(alice.id, id).await.is_ok());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL test database"]
async fn test_cross_user_tag_operations_are_not_found() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.register_account().await;
    let bob = test_db.register_account().await;

    let id = test_db
        .db
        .contacts
        .create(alice.id, sample_contact(1))
        .await
        .unwrap();
    let tag = test_db
        .db
        .contacts
        .add_tag(alice.id, id, "private")
        .await
        .unwrap();

    // Bob cannot tag Alice's contact.
    let err = test_db
        .db
        .contacts
        .add_tag(bob.id, id, "intruder")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ContactNotFound(_)));

    // Bob cannot delete Alice's tag, and Bob's listing stays empty.
    let err = test_db.db.tags.delete(bob.id, tag.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(test_db.db.tags.list(bob.id).await.unwrap().is_empty());

    test_db.cleanup().await;
}
