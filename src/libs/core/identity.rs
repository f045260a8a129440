use crate::libs::core::models::{IdentityKey, Role};
use crate::libs::storage::records::UserRecord;

/// The authenticated caller of an engine operation, as resolved by the
/// transport layer. Passed explicitly into every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: IdentityKey,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: IdentityKey, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user(user_id: IdentityKey) -> Self {
        Self::new(user_id, Role::User)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&UserRecord> for Caller {
    fn from(user: &UserRecord) -> Self {
        Self::new(user.user_id, user.role)
    }
}
