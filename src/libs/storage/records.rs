use crate::libs::core::models::{IdentityKey, Role};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

/// Stored content of a message once its sender deleted it for everyone.
pub const DELETED_FOR_EVERYONE_CONTENT: &str = "Message has been deleted";

// Timestamps are persisted with millisecond precision.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub user_id: IdentityKey,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: String, display_name: String, email: String, role: Role) -> Self {
        Self {
            user_id: IdentityKey::generate(),
            username,
            display_name,
            email,
            role,
            created_at: now(),
        }
    }
}

/// Which side of a message a user is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Party {
    Sender,
    Receiver,
}

/// A stored message. Its serialized form is what a sender gets back on
/// creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub message_id: IdentityKey,
    pub sender_id: IdentityKey,
    pub receiver_id: IdentityKey,
    pub content: String,
    pub is_deleted_by_sender: bool,
    pub is_deleted_by_receiver: bool,
    pub deleted_for_everyone_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

impl MessageRecord {
    pub fn new(sender_id: IdentityKey, receiver_id: IdentityKey, content: String) -> Self {
        Self {
            message_id: IdentityKey::generate(),
            sender_id,
            receiver_id,
            content,
            is_deleted_by_sender: false,
            is_deleted_by_receiver: false,
            deleted_for_everyone_at: None,
            created_at: now(),
            version: 0,
        }
    }

    /// The caller's relationship to this message. Sender wins if a record
    /// ever names the same user on both sides.
    pub fn party_of(&self, user_id: &IdentityKey) -> Option<Party> {
        if &self.sender_id == user_id {
            Some(Party::Sender)
        } else if &self.receiver_id == user_id {
            Some(Party::Receiver)
        } else {
            None
        }
    }

    pub fn is_deleted_for(&self, party: Party) -> bool {
        match party {
            Party::Sender => self.is_deleted_by_sender,
            Party::Receiver => self.is_deleted_by_receiver,
        }
    }

    pub fn is_deleted_for_everyone(&self) -> bool {
        self.deleted_for_everyone_at.is_some()
    }

    /// Soft delete for one party. Content is left intact.
    pub fn hide_for(&mut self, party: Party) {
        match party {
            Party::Sender => self.is_deleted_by_sender = true,
            Party::Receiver => self.is_deleted_by_receiver = true,
        }
    }

    /// Irreversible: the original content is overwritten for both parties.
    pub fn destroy_for_everyone(&mut self) {
        self.content = DELETED_FOR_EVERYONE_CONTENT.to_string();
        self.is_deleted_by_sender = true;
        self.is_deleted_by_receiver = true;
        if self.deleted_for_everyone_at.is_none() {
            self.deleted_for_everyone_at = Some(now());
        }
    }
}
