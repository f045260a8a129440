pub mod libs;

use crate::libs::config::{Config, ConfigError};
use crate::libs::core::identity::Caller;
use crate::libs::core::models::{IdentityKey, Role};
use crate::libs::messaging::engine::{DeleteOutcome, MessageEngine};
use crate::libs::messaging::error::{MessageError, MessageResult};
use crate::libs::messaging::validation::{DeleteMessageRequest, SendMessageRequest};
use crate::libs::messaging::view::MessageView;
use crate::libs::storage::database::database::db_migration;
use crate::libs::storage::database::storage_sqlite::SqliteStore;
use crate::libs::storage::records::{MessageRecord, UserRecord};
use crate::libs::storage::storage_traits::StoreError;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

pub static DATABASE: OnceLock<SqliteStore> = OnceLock::new();

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("{0}")]
    InitializationError(String),
    #[error("Configuration Error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Reads the environment configuration, installs logging and opens the
/// process-wide store.
pub fn init_from_env() -> Result<Config, DatabaseError> {
    let config = Config::from_env()?;
    libs::logging::init_tracing(&config.log_filter);
    init_database(&config)?;
    Ok(config)
}

/// Opens the process-wide store and migrates its schema. A second call is a
/// no-op as long as the first one succeeded.
pub fn init_database(config: &Config) -> Result<(), DatabaseError> {
    if DATABASE.get().is_some() {
        return Ok(());
    }

    let store = SqliteStore::new(config)
        .map_err(|err| DatabaseError::InitializationError(err.to_string()))?;
    db_migration(&store).map_err(|err| DatabaseError::InitializationError(err.to_string()))?;

    // A concurrent initialiser may have won; either store points at the same file.
    let _ = DATABASE.set(store);
    info!(path = %config.database_path.display(), "Database initialised and ready to use");
    Ok(())
}

fn engine() -> MessageResult<MessageEngine<'static>> {
    let store = DATABASE
        .get()
        .ok_or(MessageError::Storage(StoreError::NotInitialised))?;
    Ok(MessageEngine::new(store))
}

pub fn create_user(
    username: String,
    display_name: String,
    email: String,
    role: Role,
) -> MessageResult<UserRecord> {
    let record = UserRecord::new(username, display_name, email, role);
    engine()?.register_user(&record)?;
    Ok(record)
}

pub fn set_user_role(
    caller: &Caller,
    user_id: &IdentityKey,
    role: Role,
) -> MessageResult<UserRecord> {
    engine()?.set_user_role(caller, user_id, role)
}

pub fn send_message(caller: &Caller, request: SendMessageRequest) -> MessageResult<MessageRecord> {
    engine()?.send_message(caller, request)
}

pub fn list_messages(caller: &Caller) -> MessageResult<Vec<MessageView>> {
    engine()?.list_messages_for_user(caller)
}

pub fn list_conversation(
    caller: &Caller,
    peer_id: &IdentityKey,
) -> MessageResult<Vec<MessageView>> {
    engine()?.list_conversation(caller, peer_id)
}

pub fn get_message(caller: &Caller, message_id: &IdentityKey) -> MessageResult<MessageView> {
    engine()?.get_message(caller, message_id)
}

/// Deletes a message for the caller or for both parties; a request without
/// a type deletes for the caller only.
pub fn delete_message(
    caller: &Caller,
    message_id: &IdentityKey,
    request: &DeleteMessageRequest,
) -> MessageResult<DeleteOutcome> {
    let mode = request.mode()?;
    engine()?.delete_message_for_user(caller, message_id, mode)
}

pub fn moderate_message(caller: &Caller, message_id: &IdentityKey) -> MessageResult<DeleteOutcome> {
    engine()?.moderate_message(caller, message_id)
}
