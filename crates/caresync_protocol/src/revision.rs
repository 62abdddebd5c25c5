//! Revision records and their JSON codec.

use crate::entity::Entity;
use crate::error::{ProtocolError, ProtocolResult};
use crate::knowledge::KnowledgeVector;
use serde::{Deserialize, Serialize};

/// A batch of entities stamped with the knowledge it was produced under.
///
/// Wire format:
///
/// ```json
/// {
///   "knowledgeVector": { "processes": [ { "id": "<uuid>", "clock": 3 } ] },
///   "entities": [ { "type": "task", "object": { ... } } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRecord {
    /// Entities in this batch, in order.
    pub entities: Vec<Entity>,
    /// What is known as of this batch.
    pub knowledge_vector: KnowledgeVector,
}

impl RevisionRecord {
    /// Creates a revision record.
    pub fn new(entities: Vec<Entity>, knowledge_vector: KnowledgeVector) -> Self {
        Self {
            entities,
            knowledge_vector,
        }
    }

    /// Creates a record that carries knowledge but no entities.
    pub fn knowledge_only(knowledge_vector: KnowledgeVector) -> Self {
        Self::new(Vec::new(), knowledge_vector)
    }

    /// Returns true if the record carries no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Encodes the record as JSON.
    pub fn to_json_bytes(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::encode(e.to_string()))
    }

    /// Decodes a record from JSON.
    ///
    /// Fails as a whole if any entity is malformed or of an unknown kind.
    pub fn from_json_slice(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::decode(e.to_string()))
    }
}

/// Encodes a heterogeneous entity sequence as a JSON array.
pub fn encode_entities(entities: &[Entity]) -> ProtocolResult<Vec<u8>> {
    serde_json::to_vec(entities).map_err(|e| ProtocolError::encode(e.to_string()))
}

/// Decodes a JSON array produced by [`encode_entities`].
pub fn decode_entities(bytes: &[u8]) -> ProtocolResult<Vec<Entity>> {
    serde_json::from_slice(bytes).map_err(|e| ProtocolError::decode(e.to_string()))
}
