use crate::libs::config::Config;
use crate::libs::core::models::{IdentityKey, Role};
use crate::libs::storage::records::{MessageRecord, UserRecord};
use crate::libs::storage::storage_traits::{MessageStore, StoreError, Transactional, UserStore};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{
    params, ErrorCode, OptionalExtension, Result, Row, Transaction, TransactionBehavior,
};
use std::time::Duration;
use tracing::debug;

const MESSAGE_COLUMNS: &str = "message_id, sender_id, receiver_id, content, \
     is_deleted_by_sender, is_deleted_by_receiver, deleted_for_everyone_at, created_at, version";

const USER_COLUMNS: &str = "user_id, username, display_name, email, role, created_at";

pub struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> SqliteTransaction<'conn> {
    pub fn new(
        conn: &'conn mut PooledConnection<SqliteConnectionManager>,
    ) -> Result<Self, StoreError> {
        let trans = conn.transaction()?;
        Ok(Self { tx: trans })
    }

    /// Takes the database write lock up front, so that rows read inside the
    /// transaction cannot change before it commits.
    pub fn immediate(
        conn: &'conn mut PooledConnection<SqliteConnectionManager>,
    ) -> Result<Self, StoreError> {
        let trans = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(Self { tx: trans })
    }

    pub fn inner(&self) -> &Transaction<'conn> {
        &self.tx
    }
}

impl<'conn> Transactional for SqliteTransaction<'conn> {
    fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }
}

#[derive(Debug)]
pub struct SqliteStore {
    conn_pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&config.database_path).with_init(move |c| {
            c.busy_timeout(busy_timeout)?;
            c.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .build(manager)?;
        debug!(path = %config.database_path.display(), "Opened sqlite connection pool");
        Ok(Self { conn_pool: pool })
    }

    pub fn new_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.conn_pool.get()?)
    }
}

fn timestamp_from_millis(column: usize, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {}", millis).into(),
        )
    })
}

fn message_from_row(row: &Row<'_>) -> Result<MessageRecord> {
    let deleted_for_everyone_at = row
        .get::<_, Option<i64>>(6)?
        .map(|millis| timestamp_from_millis(6, millis))
        .transpose()?;

    Ok(MessageRecord {
        message_id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        is_deleted_by_sender: row.get(4)?,
        is_deleted_by_receiver: row.get(5)?,
        deleted_for_everyone_at,
        created_at: timestamp_from_millis(7, row.get(7)?)?,
        version: row.get(8)?,
    })
}

fn user_from_row(row: &Row<'_>) -> Result<UserRecord> {
    Ok(UserRecord {
        user_id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
        role: row.get(4)?,
        created_at: timestamp_from_millis(5, row.get(5)?)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl<'conn> UserStore for SqliteTransaction<'conn> {
    fn create_user(&mut self, record: &UserRecord) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO users (user_id, username, display_name, email, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.user_id,
                    record.username,
                    record.display_name,
                    record.email,
                    record.role,
                    record.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::UserAlreadyExists(record.username.clone())
                } else {
                    StoreError::Sqlite(e)
                }
            })?;
        Ok(())
    }

    fn load_user_by_id(&mut self, user_id: &IdentityKey) -> Result<Option<UserRecord>, StoreError> {
        let user = self
            .tx
            .query_row(
                &format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS),
                params![user_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn load_user_by_name(&mut self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = self
            .tx
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn update_user_role(&mut self, user_id: &IdentityKey, role: Role) -> Result<bool, StoreError> {
        let changed = self.tx.execute(
            "UPDATE users SET role = ?1 WHERE user_id = ?2",
            params![role, user_id],
        )?;
        Ok(changed == 1)
    }
}

impl<'conn> MessageStore for SqliteTransaction<'conn> {
    fn insert_message(&mut self, record: &MessageRecord) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO messages (message_id, sender_id, receiver_id, content,
                is_deleted_by_sender, is_deleted_by_receiver, deleted_for_everyone_at,
                created_at, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.message_id,
                record.sender_id,
                record.receiver_id,
                record.content,
                record.is_deleted_by_sender,
                record.is_deleted_by_receiver,
                record.deleted_for_everyone_at.map(|t| t.timestamp_millis()),
                record.created_at.timestamp_millis(),
                record.version,
            ],
        )?;
        Ok(())
    }

    fn load_message(
        &mut self,
        message_id: &IdentityKey,
    ) -> Result<Option<MessageRecord>, StoreError> {
        let message = self
            .tx
            .query_row(
                &format!("SELECT {} FROM messages WHERE message_id = ?1", MESSAGE_COLUMNS),
                params![message_id],
                message_from_row,
            )
            .optional()?;
        Ok(message)
    }

    fn load_messages_for_user(
        &mut self,
        user_id: &IdentityKey,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {} FROM messages
             WHERE sender_id = ?1 OR receiver_id = ?1
             ORDER BY created_at DESC, rowid DESC",
            MESSAGE_COLUMNS
        ))?;
        let messages = stmt
            .query_map(params![user_id], message_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(messages)
    }

    fn load_messages_between(
        &mut self,
        user_id: &IdentityKey,
        peer_id: &IdentityKey,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        let mut stmt = self.tx.prepare(&format!(
            "SELECT {} FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY created_at DESC, rowid DESC",
            MESSAGE_COLUMNS
        ))?;
        let messages = stmt
            .query_map(params![user_id, peer_id], message_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(messages)
    }

    fn update_deletion_state(&mut self, record: &mut MessageRecord) -> Result<(), StoreError> {
        let changed = self.tx.execute(
            "UPDATE messages
             SET content = ?1,
                 is_deleted_by_sender = ?2,
                 is_deleted_by_receiver = ?3,
                 deleted_for_everyone_at = ?4,
                 version = version + 1
             WHERE message_id = ?5 AND version = ?6",
            params![
                record.content,
                record.is_deleted_by_sender,
                record.is_deleted_by_receiver,
                record.deleted_for_everyone_at.map(|t| t.timestamp_millis()),
                record.message_id,
                record.version,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::VersionConflict {
                message_id: record.message_id,
                expected: record.version,
            });
        }
        record.version += 1;
        Ok(())
    }
}
