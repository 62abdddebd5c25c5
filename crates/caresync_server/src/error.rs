//! Error types for the sync server.

use caresync_protocol::{KnowledgeVector, ProtocolError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServerError {
    /// The device must pull before it may push.
    #[error("new knowledge on server, pull first then try again (latest {latest}, device {device})")]
    SynchronizationConflict {
        /// Stamp of the last accepted revision.
        latest: KnowledgeVector,
        /// Knowledge the device declared.
        device: KnowledgeVector,
    },

    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A request body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::SynchronizationConflict { .. }
                | ServerError::InvalidRequest(_)
                | ServerError::Decode(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Internal(_))
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Decode(message) => ServerError::Decode(message),
            ProtocolError::Encode(message) => ServerError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
        assert!(ServerError::SynchronizationConflict {
            latest: KnowledgeVector::new(),
            device: KnowledgeVector::new(),
        }
        .is_client_error());
    }

    #[test]
    fn protocol_errors_map_by_direction() {
        let decode: ServerError = ProtocolError::decode("eof").into();
        assert!(decode.is_client_error());
        let encode: ServerError = ProtocolError::encode("io").into();
        assert!(encode.is_server_error());
    }

    #[test]
    fn conflict_message_asks_for_pull() {
        let err = ServerError::SynchronizationConflict {
            latest: KnowledgeVector::new(),
            device: KnowledgeVector::new(),
        };
        assert!(err.to_string().contains("pull first"));
    }
}
