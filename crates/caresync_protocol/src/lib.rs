//! # caresync protocol
//!
//! Protocol types and codecs for caresync.
//!
//! This crate provides:
//! - `KnowledgeVector` logical clocks and their partial order
//! - `Entity` versions (tasks, outcomes) and `RevisionRecord` batches
//! - The JSON revision wire format and CBOR transport envelopes
//! - `VersionGraph`, an arena of entity versions with conflict detection
//! - `ConflictResolver` strategies
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod entity;
mod error;
mod graph;
mod knowledge;
mod messages;
mod revision;

pub use conflict::{ConflictPolicy, ConflictResolver};
pub use entity::{
    Entity, EntityKind, LogicalKey, Outcome, OutcomeValue, SchemaVersion, Task, Timestamp,
    Timezone, VersionHeader,
};
pub use error::{ProtocolError, ProtocolResult};
pub use graph::VersionGraph;
pub use knowledge::{KnowledgeOrdering, KnowledgeVector, ProcessId};
pub use messages::{
    from_cbor, to_cbor, PullRequest, PullResponse, PushRequest, PushResponse, PULL_PATH,
    PUSH_PATH,
};
pub use revision::{decode_entities, encode_entities, RevisionRecord};

// Re-exported so dependents name the same payload and id types.
pub use bytes::Bytes;
pub use uuid::Uuid;
