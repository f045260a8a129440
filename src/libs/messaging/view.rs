use crate::libs::core::models::IdentityKey;
use crate::libs::storage::records::{MessageRecord, UserRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a viewer sees in place of a message they deleted for themselves.
pub const DELETED_PLACEHOLDER: &str = "Message deleted";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: IdentityKey,
    pub username: String,
    pub display_name: String,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.user_id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

/// A message as one particular viewer is allowed to see it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: IdentityKey,
    pub from_me: bool,
    pub content: String,
    pub deleted: bool,
    pub deleted_for_everyone: bool,
    pub sender: UserSummary,
    pub receiver: UserSummary,
    pub created_at: DateTime<Utc>,
}

/// Projects `message` for `viewer`, who must be one of its parties.
///
/// Once destroyed for everyone the stored deletion text is shown as is.
/// Otherwise a viewer whose own flag is set gets [`DELETED_PLACEHOLDER`],
/// whatever the other party's flag says. The record is never modified.
pub fn project_for_viewer(
    message: &MessageRecord,
    viewer: &IdentityKey,
    sender: UserSummary,
    receiver: UserSummary,
) -> MessageView {
    let from_me = &message.sender_id == viewer;
    let deleted = if from_me {
        message.is_deleted_by_sender
    } else {
        message.is_deleted_by_receiver
    };

    let content = if deleted && !message.is_deleted_for_everyone() {
        DELETED_PLACEHOLDER.to_string()
    } else {
        message.content.clone()
    };

    MessageView {
        id: message.message_id,
        from_me,
        content,
        deleted,
        deleted_for_everyone: message.is_deleted_for_everyone(),
        sender,
        receiver,
        created_at: message.created_at,
    }
}
