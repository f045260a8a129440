use crate::libs::storage::storage_traits::StoreError;
use thiserror::Error;
use validator::ValidationErrors;

pub type MessageResult<T> = Result<T, MessageError>;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("not found")]
    NotFound,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error")]
    Storage(#[from] StoreError),
}

impl From<ValidationErrors> for MessageError {
    fn from(errors: ValidationErrors) -> Self {
        MessageError::Validation(errors.to_string())
    }
}

impl MessageError {
    /// HTTP status the transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            MessageError::Validation(_) => 400,
            MessageError::Forbidden(_) => 403,
            MessageError::NotFound => 404,
            MessageError::Storage(_) => 500,
        }
    }
}
