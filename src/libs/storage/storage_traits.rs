use crate::libs::core::models::{IdentityKey, Role};
use crate::libs::storage::records::{MessageRecord, UserRecord};
use thiserror::Error;

pub trait Transactional {
    fn commit(self) -> Result<(), StoreError>;
    fn rollback(self) -> Result<(), StoreError>;
}

pub trait UserStore {
    fn create_user(&mut self, record: &UserRecord) -> Result<(), StoreError>;
    fn load_user_by_id(&mut self, user_id: &IdentityKey) -> Result<Option<UserRecord>, StoreError>;
    fn load_user_by_name(&mut self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    fn update_user_role(&mut self, user_id: &IdentityKey, role: Role) -> Result<bool, StoreError>;
}

pub trait MessageStore {
    fn insert_message(&mut self, record: &MessageRecord) -> Result<(), StoreError>;

    fn load_message(&mut self, message_id: &IdentityKey)
        -> Result<Option<MessageRecord>, StoreError>;

    /// Every message the user sent or received, newest first.
    fn load_messages_for_user(
        &mut self,
        user_id: &IdentityKey,
    ) -> Result<Vec<MessageRecord>, StoreError>;

    /// Messages exchanged between two users in either direction, newest first.
    fn load_messages_between(
        &mut self,
        user_id: &IdentityKey,
        peer_id: &IdentityKey,
    ) -> Result<Vec<MessageRecord>, StoreError>;

    /// Writes the deletion state (content and both flags) of `record` in one
    /// statement, provided the stored version still equals `record.version`.
    /// On success `record.version` is advanced to the stored value.
    fn update_deletion_state(&mut self, record: &mut MessageRecord) -> Result<(), StoreError>;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("ConnectionPool Error: {0}")]
    ConnectionPool(#[from] r2d2::Error),
    #[error("User Already Exists: {0}")]
    UserAlreadyExists(String),
    #[error("Version Conflict: message {message_id} expected version {expected}")]
    VersionConflict {
        message_id: IdentityKey,
        expected: u32,
    },
    #[error("Store has not been initialised")]
    NotInitialised,
    #[error("Transaction Error: {0}")]
    Transaction(String),
}
