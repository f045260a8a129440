mod common;

use crate::common::*;
use estate_messaging::libs::core::identity::Caller;
use estate_messaging::libs::core::models::{IdentityKey, Role};
use estate_messaging::libs::messaging::error::MessageError;
use estate_messaging::libs::messaging::validation::SendMessageRequest;
use estate_messaging::libs::messaging::view::DELETED_PLACEHOLDER;
use estate_messaging::libs::storage::database::storage_sqlite::SqliteTransaction;
use estate_messaging::libs::storage::records::MessageRecord;
use estate_messaging::libs::storage::storage_traits::{MessageStore, Transactional};

#[test]
fn test_send_message_creates_visible_message() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);

    let message = db.send(&alice, &bob, "Is the flat on Elm Street still available?");

    assert_eq!(message.sender_id, alice.user_id);
    assert_eq!(message.receiver_id, bob.user_id);
    assert!(!message.is_deleted_by_sender);
    assert!(!message.is_deleted_by_receiver);
    assert_eq!(db.stored(&message.message_id), message);
}

#[test]
fn test_send_message_rejects_self_and_unknown_receiver() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let engine = db.engine();

    let to_self = engine.send_message(
        &Caller::from(&alice),
        SendMessageRequest::new(alice.user_id.to_string(), "Hello!"),
    );
    assert!(matches!(to_self, Err(MessageError::Validation(_))));

    let to_nobody = engine.send_message(
        &Caller::from(&alice),
        SendMessageRequest::new(IdentityKey::generate().to_string(), "Hello!"),
    );
    assert!(matches!(to_nobody, Err(MessageError::Validation(_))));
}

#[test]
fn test_list_is_newest_first_for_both_parties() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);

    let first = db.send(&alice, &bob, "one");
    let second = db.send(&bob, &alice, "two");
    let third = db.send(&alice, &bob, "three");

    let expected = vec![third.message_id, second.message_id, first.message_id];
    for viewer in [&alice, &bob] {
        let views = db
            .engine()
            .list_messages_for_user(&Caller::from(viewer))
            .unwrap();
        let ids: Vec<IdentityKey> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, expected);
    }

    let as_bob = db.engine().list_messages_for_user(&Caller::from(&bob)).unwrap();
    assert!(!as_bob[0].from_me);
    assert!(as_bob[1].from_me);
    assert_eq!(as_bob[1].sender.username, "bob");
    assert_eq!(as_bob[1].receiver.display_name, "ALICE");
}

#[test]
fn test_equal_timestamps_list_latest_insertion_first() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);

    let created_at = db.send(&alice, &bob, "latest").created_at - chrono::Duration::seconds(1);
    let records: Vec<MessageRecord> = (0..5)
        .map(|i| {
            let (from, to) = if i % 2 == 0 { (&alice, &bob) } else { (&bob, &alice) };
            let mut record =
                MessageRecord::new(from.user_id, to.user_id, format!("same instant {}", i));
            record.created_at = created_at;
            record
        })
        .collect();

    let mut connection = db.store.new_connection().unwrap();
    let mut tx = SqliteTransaction::new(&mut connection).unwrap();
    for record in &records {
        tx.insert_message(record).unwrap();
    }
    tx.commit().unwrap();

    let expected: Vec<IdentityKey> = records.iter().rev().map(|r| r.message_id).collect();
    let engine = db.engine();

    let listed = engine.list_messages_for_user(&Caller::from(&bob)).unwrap();
    assert_eq!(listed.len(), 6);
    assert_eq!(listed[0].content, "latest");
    let ids: Vec<IdentityKey> = listed[1..].iter().map(|v| v.id).collect();
    assert_eq!(ids, expected);

    let conversation = engine
        .list_conversation(&Caller::from(&alice), &bob.user_id)
        .unwrap();
    let ids: Vec<IdentityKey> = conversation[1..].iter().map(|v| v.id).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_sent_message_serializes_with_camel_case_fields() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);
    let message = db.send(&alice, &bob, "Is the flat still available?");

    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["messageId"], serde_json::json!(message.message_id.to_string()));
    assert_eq!(json["senderId"], serde_json::json!(alice.user_id.to_string()));
    assert_eq!(json["receiverId"], serde_json::json!(bob.user_id.to_string()));
    assert_eq!(json["content"], serde_json::json!("Is the flat still available?"));
    assert_eq!(json["isDeletedBySender"], serde_json::json!(false));
    assert_eq!(json["isDeletedByReceiver"], serde_json::json!(false));
    assert!(json["deletedForEveryoneAt"].is_null());
    assert!(json.get("createdAt").is_some());
}

#[test]
fn test_list_excludes_other_users_messages() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);
    let carol = db.user("carol", Role::User);

    db.send(&alice, &bob, "private");

    let as_carol = db
        .engine()
        .list_messages_for_user(&Caller::from(&carol))
        .unwrap();
    assert!(as_carol.is_empty());
}

#[test]
fn test_conversation_only_contains_messages_with_peer() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);
    let carol = db.user("carol", Role::User);

    let with_bob = db.send(&alice, &bob, "to bob");
    db.send(&alice, &carol, "to carol");
    let from_bob = db.send(&bob, &alice, "from bob");

    let conversation = db
        .engine()
        .list_conversation(&Caller::from(&alice), &bob.user_id)
        .unwrap();
    let ids: Vec<IdentityKey> = conversation.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![from_bob.message_id, with_bob.message_id]);
}

#[test]
fn test_get_message_requires_participation() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);
    let mallory = db.user("mallory", Role::User);
    let message = db.send(&alice, &bob, "Hi");
    let engine = db.engine();

    let as_bob = engine.get_message(&Caller::from(&bob), &message.message_id).unwrap();
    assert_eq!(as_bob.content, "Hi");

    let as_mallory = engine.get_message(&Caller::from(&mallory), &message.message_id);
    assert!(matches!(as_mallory, Err(MessageError::Forbidden(_))));

    let missing = engine.get_message(&Caller::from(&bob), &IdentityKey::generate());
    assert!(matches!(missing, Err(MessageError::NotFound)));
}

#[test]
fn test_hidden_message_keeps_stored_content() {
    let db = TestStore::new();
    let alice = db.user("alice", Role::User);
    let bob = db.user("bob", Role::User);
    let message = db.send(&alice, &bob, "Hi");

    db.engine()
        .delete_message_for_user(
            &Caller::from(&bob),
            &message.message_id,
            Default::default(),
        )
        .unwrap();

    let as_bob = db
        .engine()
        .get_message(&Caller::from(&bob), &message.message_id)
        .unwrap();
    assert_eq!(as_bob.content, DELETED_PLACEHOLDER);
    assert_eq!(db.stored(&message.message_id).content, "Hi");
}
