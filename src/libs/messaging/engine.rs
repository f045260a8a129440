use crate::libs::core::identity::Caller;
use crate::libs::core::models::{DeleteMode, IdentityKey, Role};
use crate::libs::messaging::error::{MessageError, MessageResult};
use crate::libs::messaging::validation::SendMessageRequest;
use crate::libs::messaging::view::{project_for_viewer, MessageView, UserSummary};
use crate::libs::storage::database::storage_sqlite::{SqliteStore, SqliteTransaction};
use crate::libs::storage::records::{MessageRecord, Party, UserRecord};
use crate::libs::storage::storage_traits::{MessageStore, StoreError, Transactional, UserStore};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Result of a successful deletion request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    DeletedForMe,
    DeletedForEveryone,
}

impl DeleteOutcome {
    pub fn acknowledgment(&self) -> &'static str {
        match self {
            DeleteOutcome::DeletedForMe => "Message deleted for you",
            DeleteOutcome::DeletedForEveryone => "Message deleted for everyone",
        }
    }
}

/// Sending, reading and deleting direct messages on behalf of a caller.
///
/// Every operation runs in its own transaction. Deletions take the write
/// lock before reading the message, so the authorization check and the
/// flag update see the same row.
pub struct MessageEngine<'s> {
    store: &'s SqliteStore,
}

impl<'s> MessageEngine<'s> {
    pub fn new(store: &'s SqliteStore) -> Self {
        Self { store }
    }

    pub fn register_user(&self, record: &UserRecord) -> MessageResult<()> {
        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut connection)?;
        tx.create_user(record).map_err(|e| match e {
            StoreError::UserAlreadyExists(_) => {
                MessageError::Validation("Username or email already in use".to_string())
            }
            other => MessageError::Storage(other),
        })?;
        tx.commit()?;
        info!(user_id = %record.user_id, username = %record.username, "User registered");
        Ok(())
    }

    pub fn load_user(&self, user_id: &IdentityKey) -> MessageResult<UserRecord> {
        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut connection)?;
        let user = tx.load_user_by_id(user_id)?.ok_or(MessageError::NotFound)?;
        tx.commit()?;
        Ok(user)
    }

    pub fn load_user_by_name(&self, username: &str) -> MessageResult<UserRecord> {
        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut connection)?;
        let user = tx
            .load_user_by_name(username)?
            .ok_or(MessageError::NotFound)?;
        tx.commit()?;
        Ok(user)
    }

    /// Promotes or demotes a user. Admin only.
    pub fn set_user_role(
        &self,
        caller: &Caller,
        user_id: &IdentityKey,
        role: Role,
    ) -> MessageResult<UserRecord> {
        if !caller.is_admin() {
            warn!(caller = %caller.user_id, "Non-admin attempted a role change");
            return Err(MessageError::Forbidden("Admin role required"));
        }

        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::immediate(&mut connection)?;
        if !tx.update_user_role(user_id, role)? {
            return Err(MessageError::NotFound);
        }
        let user = tx.load_user_by_id(user_id)?.ok_or(MessageError::NotFound)?;
        tx.commit()?;

        info!(user_id = %user_id, role = role.as_str(), caller = %caller.user_id, "User role changed");
        Ok(user)
    }

    pub fn send_message(
        &self,
        caller: &Caller,
        request: SendMessageRequest,
    ) -> MessageResult<MessageRecord> {
        let (receiver_id, content) = request.into_parts()?;
        if receiver_id == caller.user_id {
            return Err(MessageError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }

        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut connection)?;
        if tx.load_user_by_id(&receiver_id)?.is_none() {
            return Err(MessageError::Validation(
                "receiverId does not reference a user".to_string(),
            ));
        }

        let message = MessageRecord::new(caller.user_id, receiver_id, content);
        tx.insert_message(&message)?;
        tx.commit()?;

        info!(message_id = %message.message_id, sender = %caller.user_id, receiver = %receiver_id, "Message sent");
        Ok(message)
    }

    /// All messages the caller sent or received, newest first, each projected
    /// for the caller.
    pub fn list_messages_for_user(&self, caller: &Caller) -> MessageResult<Vec<MessageView>> {
        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut connection)?;
        let messages = tx.load_messages_for_user(&caller.user_id)?;
        let views = project_all(&mut tx, &caller.user_id, &messages)?;
        tx.commit()?;

        debug!(caller = %caller.user_id, count = views.len(), "Listed messages");
        Ok(views)
    }

    pub fn list_conversation(
        &self,
        caller: &Caller,
        peer_id: &IdentityKey,
    ) -> MessageResult<Vec<MessageView>> {
        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut connection)?;
        let messages = tx.load_messages_between(&caller.user_id, peer_id)?;
        let views = project_all(&mut tx, &caller.user_id, &messages)?;
        tx.commit()?;

        debug!(caller = %caller.user_id, peer = %peer_id, count = views.len(), "Listed conversation");
        Ok(views)
    }

    pub fn get_message(
        &self,
        caller: &Caller,
        message_id: &IdentityKey,
    ) -> MessageResult<MessageView> {
        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut connection)?;
        let message = tx.load_message(message_id)?.ok_or(MessageError::NotFound)?;
        if message.party_of(&caller.user_id).is_none() {
            warn!(message_id = %message_id, caller = %caller.user_id, "Read of foreign message refused");
            return Err(MessageError::Forbidden("Not authorized"));
        }
        let mut views = project_all(&mut tx, &caller.user_id, std::slice::from_ref(&message))?;
        tx.commit()?;

        views.pop().ok_or(MessageError::NotFound)
    }

    pub fn delete_message_for_user(
        &self,
        caller: &Caller,
        message_id: &IdentityKey,
        mode: DeleteMode,
    ) -> MessageResult<DeleteOutcome> {
        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::immediate(&mut connection)?;
        let outcome = apply_deletion(&mut tx, caller, message_id, mode)?;
        tx.commit()?;

        info!(message_id = %message_id, caller = %caller.user_id, mode = %mode, "Message deleted");
        Ok(outcome)
    }

    /// Administrator override. Applies the same transition as a sender's
    /// delete-for-everyone, regardless of who sent the message.
    pub fn moderate_message(
        &self,
        caller: &Caller,
        message_id: &IdentityKey,
    ) -> MessageResult<DeleteOutcome> {
        if !caller.is_admin() {
            warn!(message_id = %message_id, caller = %caller.user_id, "Non-admin attempted moderation");
            return Err(MessageError::Forbidden("Admin role required"));
        }

        let mut connection = self.store.new_connection()?;
        let mut tx = SqliteTransaction::immediate(&mut connection)?;
        let mut message = tx.load_message(message_id)?.ok_or(MessageError::NotFound)?;
        destroy(&mut tx, &mut message)?;
        tx.commit()?;

        info!(message_id = %message_id, admin = %caller.user_id, "Message removed by moderator");
        Ok(DeleteOutcome::DeletedForEveryone)
    }
}

fn apply_deletion<T: MessageStore>(
    tx: &mut T,
    caller: &Caller,
    message_id: &IdentityKey,
    mode: DeleteMode,
) -> MessageResult<DeleteOutcome> {
    let mut message = tx.load_message(message_id)?.ok_or(MessageError::NotFound)?;

    let Some(party) = message.party_of(&caller.user_id) else {
        warn!(message_id = %message_id, caller = %caller.user_id, "Delete of foreign message refused");
        return Err(MessageError::Forbidden("Not authorized"));
    };

    match mode {
        DeleteMode::Me => {
            if !message.is_deleted_for(party) {
                message.hide_for(party);
                tx.update_deletion_state(&mut message)?;
            }
            Ok(DeleteOutcome::DeletedForMe)
        }
        DeleteMode::Everyone => {
            if party != Party::Sender {
                warn!(message_id = %message_id, caller = %caller.user_id, "Receiver attempted delete for everyone");
                return Err(MessageError::Forbidden("Only sender can delete for everyone"));
            }
            destroy(tx, &mut message)?;
            Ok(DeleteOutcome::DeletedForEveryone)
        }
    }
}

fn destroy<T: MessageStore>(tx: &mut T, message: &mut MessageRecord) -> MessageResult<()> {
    if message.is_deleted_for_everyone() {
        return Ok(());
    }
    message.destroy_for_everyone();
    tx.update_deletion_state(message)?;
    Ok(())
}

fn project_all<T: UserStore>(
    tx: &mut T,
    viewer: &IdentityKey,
    messages: &[MessageRecord],
) -> MessageResult<Vec<MessageView>> {
    let mut users: HashMap<IdentityKey, UserSummary> = HashMap::new();
    let mut views = Vec::with_capacity(messages.len());

    for message in messages {
        let sender = summary(tx, &mut users, &message.sender_id)?;
        let receiver = summary(tx, &mut users, &message.receiver_id)?;
        views.push(project_for_viewer(message, viewer, sender, receiver));
    }

    Ok(views)
}

fn summary<T: UserStore>(
    tx: &mut T,
    cache: &mut HashMap<IdentityKey, UserSummary>,
    user_id: &IdentityKey,
) -> MessageResult<UserSummary> {
    if let Some(found) = cache.get(user_id) {
        return Ok(found.clone());
    }
    let user = tx.load_user_by_id(user_id)?.ok_or(MessageError::NotFound)?;
    let found = UserSummary::from(&user);
    cache.insert(*user_id, found.clone());
    Ok(found)
}
