//! Versioned care-record entities.
//!
//! Entities are immutable. A logical update produces a new version whose
//! `previousVersionUUIDs` point at the version it replaces, so the versions
//! of one logical record form a directed acyclic graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Numeric timestamp carried on the wire (seconds since the reference date).
pub type Timestamp = f64;

/// Schema version stamped on an entity by the store that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVersion {
    /// Major version.
    pub major_version: u32,
    /// Minor version.
    pub minor_version: u32,
    /// Patch number.
    pub patch_number: u32,
}

/// Time zone the entity was recorded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timezone {
    /// IANA identifier, e.g. `America/Los_Angeles`.
    pub identifier: String,
}

/// Fields shared by every entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHeader {
    /// Stable, human-meaningful logical ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Version identity.
    pub uuid: Uuid,
    /// Versions this one replaces.
    #[serde(rename = "previousVersionUUIDs")]
    pub previous_version_uuids: Vec<Uuid>,
    /// Versions known to replace this one.
    #[serde(rename = "nextVersionUUIDs")]
    pub next_version_uuids: Vec<Uuid>,
    /// When the logical record was created.
    pub created_date: Timestamp,
    /// When this version was written.
    pub updated_date: Timestamp,
    /// When this version takes effect.
    pub effective_date: Timestamp,
    /// When the record was deleted, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_date: Option<Timestamp>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Attached notes (opaque to synchronization).
    pub notes: Vec<Value>,
    /// Grouping identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_identifier: Option<String>,
    /// Identifier assigned by a remote system.
    #[serde(rename = "remoteID", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Schema version of the writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<SchemaVersion>,
    /// Time zone of the writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<Timezone>,
}

impl VersionHeader {
    /// Creates a first version with a fresh UUID and all dates set to `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            previous_version_uuids: Vec::new(),
            next_version_uuids: Vec::new(),
            created_date: now,
            updated_date: now,
            effective_date: now,
            deleted_date: None,
            tags: Vec::new(),
            notes: Vec::new(),
            group_identifier: None,
            remote_id: None,
            schema_version: None,
            timezone: None,
        }
    }

    /// Sets the logical ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the header of a new version that replaces this one.
    ///
    /// The creation date of the logical record is carried over.
    pub fn successor(&self, now: Timestamp) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            previous_version_uuids: vec![self.uuid],
            next_version_uuids: Vec::new(),
            updated_date: now,
            ..self.clone()
        }
    }
}

/// A task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Version metadata.
    #[serde(flatten)]
    pub header: VersionHeader,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Instructions shown to the patient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Whether completing the task counts towards adherence.
    #[serde(default)]
    pub impacts_adherence: bool,
    /// Owning care plan version.
    #[serde(rename = "carePlanUUID", default, skip_serializing_if = "Option::is_none")]
    pub care_plan_uuid: Option<Uuid>,
    /// Schedule (opaque to synchronization).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Value>,
}

impl Task {
    /// Creates a task with the given logical ID and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: Timestamp) -> Self {
        Self {
            header: VersionHeader::new(now).with_id(id),
            title: Some(title.into()),
            instructions: None,
            impacts_adherence: true,
            care_plan_uuid: None,
            schedule: None,
        }
    }
}

/// A single recorded value of an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeValue {
    /// Value type tag, e.g. `boolean`.
    #[serde(rename = "type")]
    pub value_type: String,
    /// The value itself.
    pub value: Value,
    /// When the value was recorded.
    pub created_date: Timestamp,
    /// Units, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Application-defined kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl OutcomeValue {
    /// Creates a boolean value.
    pub fn boolean(value: bool, created_date: Timestamp) -> Self {
        Self {
            value_type: "boolean".into(),
            value: Value::Bool(value),
            created_date,
            units: None,
            kind: None,
        }
    }
}

/// The outcome of one task occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// Version metadata.
    #[serde(flatten)]
    pub header: VersionHeader,
    /// Task version this outcome belongs to.
    #[serde(rename = "taskUUID")]
    pub task_uuid: Uuid,
    /// Index of the task occurrence.
    pub task_occurrence_index: u64,
    /// Recorded values.
    #[serde(default)]
    pub values: Vec<OutcomeValue>,
}

impl Outcome {
    /// Creates an empty outcome for a task occurrence.
    pub fn new(task_uuid: Uuid, task_occurrence_index: u64, now: Timestamp) -> Self {
        Self {
            header: VersionHeader::new(now),
            task_uuid,
            task_occurrence_index,
            values: Vec::new(),
        }
    }

    /// Returns a new version of this outcome with `value` appended.
    pub fn appending(&self, value: OutcomeValue, now: Timestamp) -> Self {
        let mut next = Self {
            header: self.header.successor(now),
            ..self.clone()
        };
        next.values.push(value);
        next
    }
}

/// Discriminant of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// A task.
    Task,
    /// An outcome.
    Outcome,
}

impl EntityKind {
    /// Returns the wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Outcome => "outcome",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a logical record across all of its versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalKey {
    /// A task, by logical ID.
    Task(String),
    /// An outcome, by task version and occurrence.
    Outcome {
        /// Task version UUID.
        task: Uuid,
        /// Occurrence index.
        occurrence: u64,
    },
}

/// A versioned domain record, tagged by kind on the wire as
/// `{"type": "task", "object": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "camelCase")]
pub enum Entity {
    /// A task.
    Task(Task),
    /// An outcome.
    Outcome(Outcome),
}

impl Entity {
    /// Returns the kind of this entity.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Task(_) => EntityKind::Task,
            Entity::Outcome(_) => EntityKind::Outcome,
        }
    }

    /// Returns the shared version metadata.
    pub fn header(&self) -> &VersionHeader {
        match self {
            Entity::Task(task) => &task.header,
            Entity::Outcome(outcome) => &outcome.header,
        }
    }

    /// Returns the version UUID.
    pub fn uuid(&self) -> Uuid {
        self.header().uuid
    }

    /// Returns the creation date.
    pub fn created_date(&self) -> Timestamp {
        self.header().created_date
    }

    /// Returns the date this version was written.
    pub fn updated_date(&self) -> Timestamp {
        self.header().updated_date
    }

    /// Returns the logical identity, if the entity carries one.
    pub fn logical_key(&self) -> Option<LogicalKey> {
        match self {
            Entity::Task(task) => task.header.id.clone().map(LogicalKey::Task),
            Entity::Outcome(outcome) => Some(LogicalKey::Outcome {
                task: outcome.task_uuid,
                occurrence: outcome.task_occurrence_index,
            }),
        }
    }

    /// Returns the task, if this is one.
    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Entity::Task(task) => Some(task),
            Entity::Outcome(_) => None,
        }
    }

    /// Returns the outcome, if this is one.
    pub fn as_outcome(&self) -> Option<&Outcome> {
        match self {
            Entity::Outcome(outcome) => Some(outcome),
            Entity::Task(_) => None,
        }
    }
}

impl From<Task> for Entity {
    fn from(task: Task) -> Self {
        Entity::Task(task)
    }
}

impl From<Outcome> for Entity {
    fn from(outcome: Outcome) -> Self {
        Entity::Outcome(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_wire_shape() {
        let task = Task::new("nausea", "Track your nausea", 10.0);
        let json = serde_json::to_value(Entity::from(task.clone())).unwrap();

        assert_eq!(json["type"], "task");
        let object = &json["object"];
        assert_eq!(object["id"], "nausea");
        assert_eq!(object["previousVersionUUIDs"], json!([]));
        assert_eq!(object["nextVersionUUIDs"], json!([]));
        assert_eq!(object["createdDate"], 10.0);
        assert_eq!(object["tags"], json!([]));
        assert_eq!(object["notes"], json!([]));
        assert_eq!(object["title"], "Track your nausea");
        assert!(object.get("deletedDate").is_none());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = json!({
            "type": "patient",
            "object": { "uuid": Uuid::new_v4() }
        });
        let err = serde_json::from_value::<Entity>(json).unwrap_err();
        assert!(err.to_string().contains("patient"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let json = json!({
            "type": "outcome",
            "object": {
                "uuid": Uuid::new_v4(),
                "taskUUID": Uuid::new_v4(),
                "taskOccurrenceIndex": 0,
                "previousVersionUUIDs": [],
                "nextVersionUUIDs": [],
                "tags": [],
                "notes": [],
                "updatedDate": 1.0,
                "effectiveDate": 1.0
            }
        });
        assert!(serde_json::from_value::<Entity>(json).is_err());
    }

    #[test]
    fn uppercase_uuids_and_integer_dates_decode() {
        let json = json!({
            "type": "task",
            "object": {
                "id": "nausea",
                "uuid": "0838965B-FCAB-44A8-A6D8-418E9F02BC4C",
                "previousVersionUUIDs": [],
                "nextVersionUUIDs": [],
                "createdDate": 637569158.4899869,
                "updatedDate": 637569158.49000001,
                "effectiveDate": 637142400,
                "tags": [],
                "notes": [],
                "schemaVersion": { "majorVersion": 2, "minorVersion": 1, "patchNumber": 0 },
                "timezone": { "identifier": "America/Los_Angeles" }
            }
        });
        let entity: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(entity.kind(), EntityKind::Task);
        assert_eq!(entity.header().effective_date, 637142400.0);
        assert_eq!(entity.logical_key(), Some(LogicalKey::Task("nausea".into())));
        assert_eq!(
            entity.header().schema_version,
            Some(SchemaVersion {
                major_version: 2,
                minor_version: 1,
                patch_number: 0
            })
        );
    }

    #[test]
    fn appending_links_versions() {
        let first = Outcome::new(Uuid::new_v4(), 4, 1.0);
        let second = first.appending(OutcomeValue::boolean(true, 2.0), 2.0);

        assert_ne!(first.header.uuid, second.header.uuid);
        assert_eq!(second.header.previous_version_uuids, vec![first.header.uuid]);
        assert_eq!(second.header.created_date, 1.0);
        assert_eq!(second.header.updated_date, 2.0);
        assert_eq!(second.values.len(), 1);
        assert_eq!(
            Entity::from(first).logical_key(),
            Entity::from(second).logical_key()
        );
    }
}
