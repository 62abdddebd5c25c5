//! Fuzz testing harnesses for the caresync wire formats.
//!
//! Each target accepts arbitrary bytes and must never panic. They can be
//! driven by cargo-fuzz or by the proptest cases below.

use caresync_protocol::{
    decode_entities, encode_entities, KnowledgeVector, PullRequest, PullResponse, PushRequest,
    PushResponse, RevisionRecord, PULL_PATH, PUSH_PATH,
};
use caresync_server::{ServerConfig, SyncServer};

/// Fuzz target for the JSON revision decoder.
///
/// A revision that decodes must encode again and decode to the same value.
pub fn fuzz_revision_decode(data: &[u8]) {
    if let Ok(revision) = RevisionRecord::from_json_slice(data) {
        if let Ok(encoded) = revision.to_json_bytes() {
            let decoded = RevisionRecord::from_json_slice(&encoded);
            assert!(decoded.is_ok(), "Re-encoded revision failed to decode");
        }
    }
}

/// Fuzz target for the entity array decoder used for server payloads.
pub fn fuzz_entities_decode(data: &[u8]) {
    if let Ok(entities) = decode_entities(data) {
        if let Ok(encoded) = encode_entities(&entities) {
            let decoded = decode_entities(&encoded);
            assert!(
                decoded.map(|e| e.len()).ok() == Some(entities.len()),
                "Entity count changed across re-encoding"
            );
        }
    }
}

/// Fuzz target for the CBOR envelopes.
pub fn fuzz_envelope_decode(data: &[u8]) {
    let _ = PullRequest::decode(data);
    let _ = PullResponse::decode(data);
    let _ = PushRequest::decode(data);
    let _ = PushResponse::decode(data);
}

/// Fuzz target for the server endpoints.
///
/// Arbitrary request bodies must be answered with a response or an error,
/// and a body that fails to decode must leave the server untouched.
pub fn fuzz_server_requests(data: &[u8]) {
    let server = SyncServer::new(ServerConfig::default());
    for path in [PULL_PATH, PUSH_PATH, "/sync/unknown"] {
        let before = server.revision_count();
        if server.handle_post(path, data).is_err() {
            assert_eq!(
                server.revision_count(),
                before,
                "Failed request changed the revision log"
            );
        }
    }
}

/// Fuzz target for knowledge vector parsing from JSON.
pub fn fuzz_knowledge_vector(data: &[u8]) {
    if let Ok(knowledge) = serde_json::from_slice::<KnowledgeVector>(data) {
        // Display and comparisons shouldn't panic
        let _ = knowledge.to_string();
        assert!(knowledge.dominates(&knowledge));
        assert!(knowledge.dominates(&KnowledgeVector::new()));
    }
}
