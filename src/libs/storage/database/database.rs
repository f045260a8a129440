use crate::libs::storage::database::storage_sqlite::{SqliteStore, SqliteTransaction};
use crate::libs::storage::storage_traits::{StoreError, Transactional};
use tracing::info;

/// Creates the schema if it does not exist yet. Safe to run on every start.
pub fn db_migration(store: &SqliteStore) -> Result<(), StoreError> {
    let mut connection = store.new_connection()?;
    let sqlite_transaction = SqliteTransaction::new(&mut connection)?;

    sqlite_transaction.inner().execute(
        "CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'user',
                created_at INTEGER NOT NULL,

                CHECK (role IN ('user', 'admin'))
        );",
        [],
    )?;

    // content is shared by both parties; per-party deletion lives in the flags
    sqlite_transaction.inner().execute(
        "CREATE TABLE IF NOT EXISTS messages (
            message_id TEXT PRIMARY KEY,
            sender_id TEXT NOT NULL,
            receiver_id TEXT NOT NULL,
            content TEXT NOT NULL,
            is_deleted_by_sender BOOLEAN NOT NULL DEFAULT false,
            is_deleted_by_receiver BOOLEAN NOT NULL DEFAULT false,
            deleted_for_everyone_at INTEGER,
            created_at INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,

            FOREIGN KEY (sender_id) REFERENCES users(user_id),
            FOREIGN KEY (receiver_id) REFERENCES users(user_id)
        );",
        [],
    )?;

    sqlite_transaction.inner().execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages (sender_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages (receiver_id, created_at);",
    )?;

    sqlite_transaction.inner().execute(
        "CREATE TRIGGER IF NOT EXISTS messages_parties_immutable
            BEFORE UPDATE OF sender_id, receiver_id ON messages
            WHEN NEW.sender_id IS NOT OLD.sender_id OR NEW.receiver_id IS NOT OLD.receiver_id
            BEGIN
                SELECT RAISE(ABORT, 'message sender and receiver are immutable');
            END;",
        [],
    )?;

    sqlite_transaction.commit()?;
    info!("Database schema is up to date");

    Ok(())
}
