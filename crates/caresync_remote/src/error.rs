//! Error types for remotes, transports and the sync engine.

use caresync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A payload or envelope from the counterpart could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The counterpart refused the request itself. Sending it again cannot
    /// succeed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A local value could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The counterpart refused a push; the store must pull first.
    #[error("synchronization conflict: {reason}")]
    SynchronizationConflict {
        /// Reason reported by the counterpart.
        reason: String,
    },

    /// No winner could be chosen among conflicting versions.
    #[error("conflict resolution failed: {0}")]
    ConflictResolution(String),

    /// Another operation of the same kind is already running on this remote.
    #[error("a {operation} is already in flight")]
    OperationInFlight {
        /// The operation that was refused.
        operation: String,
    },

    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The local store failed.
    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if repeating the whole cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::SynchronizationConflict { .. } => true,
            SyncError::OperationInFlight { .. } => true,
            _ => false,
        }
    }

    /// Returns true if the counterpart asked the store to pull first.
    pub fn is_synchronization_conflict(&self) -> bool {
        matches!(self, SyncError::SynchronizationConflict { .. })
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Decode(message) => SyncError::Decode(message),
            ProtocolError::Encode(message) => SyncError::Encode(message),
        }
    }
}
