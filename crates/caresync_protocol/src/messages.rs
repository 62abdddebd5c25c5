//! Protocol messages exchanged between a remote and its server.
//!
//! Envelopes are CBOR. Entity payloads inside them stay opaque bytes (JSON
//! encoded entity arrays) so the server never has to understand entities.

use crate::error::{ProtocolError, ProtocolResult};
use crate::knowledge::KnowledgeVector;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Endpoint for pull requests.
pub const PULL_PATH: &str = "/sync/pull";

/// Endpoint for push requests.
pub const PUSH_PATH: &str = "/sync/push";

/// Encodes a message as CBOR.
pub fn to_cbor<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| ProtocolError::encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes a message from CBOR.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::from_reader(bytes).map_err(|e| ProtocolError::decode(e.to_string()))
}

/// Pull request from a remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Knowledge of the pulling store.
    pub knowledge: KnowledgeVector,
}

impl PullRequest {
    /// Creates a new pull request.
    pub fn new(knowledge: KnowledgeVector) -> Self {
        Self { knowledge }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Pull response from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Aggregate knowledge of the server.
    pub knowledge: KnowledgeVector,
    /// Payloads of every revision the caller does not know, in log order.
    pub payloads: Vec<Bytes>,
}

impl PullResponse {
    /// Creates a new pull response.
    pub fn new(knowledge: KnowledgeVector, payloads: Vec<Bytes>) -> Self {
        Self {
            knowledge,
            payloads,
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Push request from a remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    /// Knowledge of the pushing store.
    pub knowledge: KnowledgeVector,
    /// Encoded entities, absent when the store only advertises knowledge.
    pub payload: Option<Bytes>,
}

impl PushRequest {
    /// Creates a new push request.
    pub fn new(knowledge: KnowledgeVector, payload: Option<Bytes>) -> Self {
        Self { knowledge, payload }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

/// Push response from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Whether the push was accepted.
    pub accepted: bool,
    /// Aggregate knowledge of the server after handling the push.
    pub knowledge: KnowledgeVector,
    /// Reason for a rejection.
    pub error: Option<String>,
}

impl PushResponse {
    /// Creates an accepted push response.
    pub fn accepted(knowledge: KnowledgeVector) -> Self {
        Self {
            accepted: true,
            knowledge,
            error: None,
        }
    }

    /// Creates a rejected push response.
    pub fn rejected(knowledge: KnowledgeVector, reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            knowledge,
            error: Some(reason.into()),
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        from_cbor(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ProcessId;

    fn knowledge() -> KnowledgeVector {
        [(ProcessId::generate(), 3), (ProcessId::generate(), 1)]
            .into_iter()
            .collect()
    }

    #[test]
    fn pull_roundtrip() {
        let response = PullResponse::new(
            knowledge(),
            vec![Bytes::from_static(b"[]"), Bytes::from_static(b"[1]")],
        );
        let decoded = PullResponse::decode(&response.encode().unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn push_without_payload_roundtrip() {
        let request = PushRequest::new(knowledge(), None);
        let decoded = PushRequest::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(decoded, request);
        assert!(decoded.payload.is_none());
    }

    #[test]
    fn rejected_response_carries_reason() {
        let response = PushResponse::rejected(knowledge(), "pull first");
        let decoded = PushResponse::decode(&response.encode().unwrap()).unwrap();
        assert!(!decoded.accepted);
        assert_eq!(decoded.error.as_deref(), Some("pull first"));
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let bytes = PullRequest::new(knowledge()).encode().unwrap();
        let err = PullRequest::decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(err.is_decode());
    }
}
