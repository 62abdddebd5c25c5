//! Error types for protocol encoding and decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while encoding or decoding protocol data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A payload could not be decoded. Nothing from it may be applied.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A value could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Creates an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    /// Returns true if this is a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self, ProtocolError::Decode(_))
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::Encode(err.to_string())
        } else {
            Self::Decode(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_syntax_errors_are_decode_errors() {
        let err: ProtocolError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(err.is_decode());
        assert!(err.to_string().starts_with("decode failed"));
    }
}
