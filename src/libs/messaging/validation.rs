use crate::libs::core::models::{DeleteMode, IdentityKey};
use crate::libs::messaging::error::{MessageError, MessageResult};
use serde::Deserialize;
use validator::Validate;

/// Body of a send request as it arrives from the client.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "receiverId is required"))]
    pub receiver_id: String,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

impl SendMessageRequest {
    pub fn new(receiver_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            content: content.into(),
        }
    }

    /// Checks the request shape and resolves the receiver identifier.
    pub fn into_parts(self) -> MessageResult<(IdentityKey, String)> {
        self.validate()?;
        let receiver_id = self
            .receiver_id
            .parse::<IdentityKey>()
            .map_err(|e| MessageError::Validation(format!("receiverId: {}", e)))?;
        Ok((receiver_id, self.content))
    }
}

/// Body of a delete request. The raw `type` is kept as sent so that an
/// unknown value surfaces as a validation error rather than a decode failure.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeleteMessageRequest {
    #[serde(default, rename = "type")]
    pub delete_type: Option<String>,
}

impl DeleteMessageRequest {
    pub fn new(delete_type: Option<&str>) -> Self {
        Self {
            delete_type: delete_type.map(str::to_string),
        }
    }

    pub fn mode(&self) -> MessageResult<DeleteMode> {
        parse_delete_mode(self.delete_type.as_deref())
    }
}

/// Resolves an optional raw delete type; absent means `me`.
pub fn parse_delete_mode(raw: Option<&str>) -> MessageResult<DeleteMode> {
    match raw {
        None => Ok(DeleteMode::default()),
        Some(value) => value.parse().map_err(MessageError::Validation),
    }
}
