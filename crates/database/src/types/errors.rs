//! Error types for the chat store

use thiserror::Error;

/// Error raised by every store and service operation.
///
/// Each variant belongs to exactly one [`ErrorKind`]; the transport layer maps
/// kinds to responses with [`ChatError::http_status`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Corrupt record: {message}")]
    Corrupt { message: String },
}

/// Failure taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    Conflict,
    Validation,
    StorageFailure,
}

impl ChatError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: impl ToString) -> Self {
        Self::not_found("User", id)
    }

    pub fn conversation_not_found(id: i64) -> Self {
        Self::not_found("Conversation", id)
    }

    pub fn message_not_found(id: i64) -> Self {
        Self::not_found("Message", id)
    }

    pub fn comment_not_found(id: i64) -> Self {
        Self::not_found("Comment", id)
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::NotFound { .. } => ErrorKind::NotFound,
            ChatError::Forbidden { .. } => ErrorKind::Forbidden,
            ChatError::InvalidState { .. } => ErrorKind::InvalidState,
            ChatError::Conflict { .. } => ErrorKind::Conflict,
            ChatError::Validation { .. } => ErrorKind::Validation,
            ChatError::Storage(_) | ChatError::Corrupt { .. } => ErrorKind::StorageFailure,
        }
    }

    /// Status code a transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::Validation => 400,
            ErrorKind::InvalidState | ErrorKind::Conflict | ErrorKind::StorageFailure => 500,
        }
    }

    /// True when the underlying database rejected a write on a unique index.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            ChatError::Storage(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<chrono::ParseError> for ChatError {
    fn from(err: chrono::ParseError) -> Self {
        Self::Corrupt {
            message: format!("Timestamp parsing error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_transport_statuses() {
        assert_eq!(ChatError::message_not_found(7).http_status(), 404);
        assert_eq!(ChatError::forbidden("not a member").http_status(), 403);
        assert_eq!(ChatError::validation("empty").http_status(), 400);
        assert_eq!(ChatError::invalid_state("no membership").http_status(), 500);
        assert_eq!(ChatError::conflict("taken").http_status(), 500);
        assert_eq!(
            ChatError::Storage(sqlx::Error::RowNotFound).kind(),
            ErrorKind::StorageFailure
        );
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let error = ChatError::conversation_not_found(42);
        assert_eq!(error.to_string(), "Conversation not found: 42");
    }
}
