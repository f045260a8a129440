#![allow(dead_code)]

use estate_messaging::libs::config::Config;
use estate_messaging::libs::core::identity::Caller;
use estate_messaging::libs::core::models::{IdentityKey, Role};
use estate_messaging::libs::messaging::engine::MessageEngine;
use estate_messaging::libs::messaging::validation::SendMessageRequest;
use estate_messaging::libs::storage::database::database::db_migration;
use estate_messaging::libs::storage::database::storage_sqlite::SqliteStore;
use estate_messaging::libs::storage::records::{MessageRecord, UserRecord};
use estate_messaging::libs::storage::storage_traits::MessageStore;
use estate_messaging::libs::storage::database::storage_sqlite::SqliteTransaction;
use tempfile::TempDir;

// Each test gets its own database file; the directory is removed on drop.
pub struct TestStore {
    pub store: SqliteStore,
    _dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create test directory");
        let config = Config::new(dir.path().join("messages.db"));
        let store = SqliteStore::new(&config).expect("Failed to open store");
        db_migration(&store).expect("Failed to migrate store");
        Self { store, _dir: dir }
    }

    pub fn engine(&self) -> MessageEngine<'_> {
        MessageEngine::new(&self.store)
    }

    pub fn user(&self, username: &str, role: Role) -> UserRecord {
        let record = UserRecord::new(
            username.to_string(),
            username.to_uppercase(),
            format!("{}@example.com", username),
            role,
        );
        self.engine()
            .register_user(&record)
            .expect("Failed to register user");
        record
    }

    pub fn send(&self, from: &UserRecord, to: &UserRecord, content: &str) -> MessageRecord {
        self.engine()
            .send_message(
                &Caller::from(from),
                SendMessageRequest::new(to.user_id.to_string(), content),
            )
            .expect("Failed to send message")
    }

    /// Reads the stored row directly, bypassing any viewer projection.
    pub fn stored(&self, message_id: &IdentityKey) -> MessageRecord {
        let mut connection = self.store.new_connection().unwrap();
        let mut tx = SqliteTransaction::new(&mut connection).unwrap();
        tx.load_message(message_id)
            .unwrap()
            .expect("Message should exist")
    }
}
