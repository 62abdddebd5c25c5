//! The local store side of synchronization.

use crate::error::{SyncError, SyncResult};
use caresync_protocol::{
    Entity, EntityKind, KnowledgeVector, ProcessId, RevisionRecord, Uuid, VersionGraph,
};
use tracing::debug;

/// A locally persisted store of versioned entities that can synchronize.
pub trait RevisionStore: Send {
    /// Returns everything this store knows.
    fn knowledge(&self) -> KnowledgeVector;

    /// Folds a pulled revision into the store.
    fn merge_revision(&mut self, revision: RevisionRecord) -> SyncResult<()>;

    /// Returns every group of versions of one record that cannot be ordered.
    fn conflicts(&self) -> Vec<Vec<Entity>>;

    /// Records that `winner` supersedes the rest of `candidates`.
    fn resolve_conflict(&mut self, winner: &Entity, candidates: &[Entity]) -> SyncResult<()>;

    /// Returns the local changes to push, stamped with the store knowledge.
    fn device_revision(&self) -> RevisionRecord;

    /// Marks `pushed` as accepted by the counterpart and advances the
    /// store's own clock.
    fn acknowledge_push(&mut self, pushed: &RevisionRecord);
}

/// An in-memory store over a [`VersionGraph`].
///
/// Knowledge starts at `{self: 1}`. Entities added locally belong to the
/// revision of the current own clock and stay pending until a push carrying
/// them is acknowledged; each acknowledgement increments the own clock.
/// Merged entities are never pushed back.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    process: ProcessId,
    knowledge: KnowledgeVector,
    graph: VersionGraph,
    pending: Vec<Uuid>,
}

impl MemoryStore {
    /// Creates a store with a fresh process id.
    pub fn new() -> Self {
        Self::with_process(ProcessId::generate())
    }

    /// Creates a store for a given process id.
    pub fn with_process(process: ProcessId) -> Self {
        let mut knowledge = KnowledgeVector::new();
        knowledge.increment(process);
        Self {
            process,
            knowledge,
            graph: VersionGraph::new(),
            pending: Vec::new(),
        }
    }

    /// Returns this store's process id.
    pub fn process_id(&self) -> ProcessId {
        self.process
    }

    /// Adds a locally created version.
    pub fn add_entity(&mut self, entity: impl Into<Entity>) -> SyncResult<Uuid> {
        let entity = entity.into();
        let uuid = entity.uuid();
        if !self.graph.insert(entity) {
            return Err(SyncError::Store(format!("version {uuid} already exists")));
        }
        self.pending.push(uuid);
        Ok(uuid)
    }

    /// Returns a version by UUID.
    pub fn entity(&self, uuid: &Uuid) -> Option<&Entity> {
        self.graph.get(uuid)
    }

    /// Returns the current heads.
    pub fn heads(&self) -> Vec<&Entity> {
        self.graph.heads().collect()
    }

    /// Returns the current heads of one kind.
    pub fn heads_of_kind(&self, kind: EntityKind) -> Vec<&Entity> {
        self.graph.heads().filter(|e| e.kind() == kind).collect()
    }

    /// Returns the number of local versions not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Returns the number of stored versions.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Returns true if the store holds no versions.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionStore for MemoryStore {
    fn knowledge(&self) -> KnowledgeVector {
        self.knowledge.clone()
    }

    fn merge_revision(&mut self, revision: RevisionRecord) -> SyncResult<()> {
        let received = revision.entities.len();
        let inserted = revision
            .entities
            .into_iter()
            .map(|entity| self.graph.insert(entity))
            .filter(|inserted| *inserted)
            .count();
        self.knowledge.merge_with(&revision.knowledge_vector);
        debug!(
            process = %self.process,
            received,
            inserted,
            knowledge = %self.knowledge,
            "merged revision"
        );
        Ok(())
    }

    fn conflicts(&self) -> Vec<Vec<Entity>> {
        self.graph.conflicts()
    }

    fn resolve_conflict(&mut self, winner: &Entity, candidates: &[Entity]) -> SyncResult<()> {
        let winner_uuid = winner.uuid();
        let losers: Vec<Uuid> = candidates
            .iter()
            .map(Entity::uuid)
            .filter(|uuid| *uuid != winner_uuid)
            .collect();
        if !self.graph.resolve(winner_uuid, losers.iter().copied()) {
            return Err(SyncError::Store(format!(
                "conflict winner {winner_uuid} is not in the store"
            )));
        }
        // Superseded local edits never leave the device.
        self.pending.retain(|uuid| !losers.contains(uuid));
        Ok(())
    }

    fn device_revision(&self) -> RevisionRecord {
        let entities = self
            .pending
            .iter()
            .filter_map(|uuid| self.graph.get(uuid).cloned())
            .collect();
        RevisionRecord::new(entities, self.knowledge.clone())
    }

    fn acknowledge_push(&mut self, pushed: &RevisionRecord) {
        self.pending
            .retain(|uuid| !pushed.entities.iter().any(|e| e.uuid() == *uuid));
        let clock = self.knowledge.increment(self.process);
        debug!(process = %self.process, clock, pending = self.pending.len(), "push acknowledged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caresync_protocol::{Outcome, OutcomeValue, Task};

    #[test]
    fn fresh_store_knows_itself() {
        let store = MemoryStore::new();
        assert_eq!(store.knowledge().clock(&store.process_id()), 1);
        assert!(store.is_empty());
        assert!(store.device_revision().is_empty());
    }

    #[test]
    fn local_entities_are_pending_until_acknowledged() {
        let mut store = MemoryStore::new();
        store.add_entity(Task::new("nausea", "Nausea", 1.0)).unwrap();

        let revision = store.device_revision();
        assert_eq!(revision.entities.len(), 1);
        assert_eq!(revision.knowledge_vector.clock(&store.process_id()), 1);

        store.acknowledge_push(&revision);
        assert_eq!(store.pending(), 0);
        assert_eq!(store.knowledge().clock(&store.process_id()), 2);
        assert!(store.device_revision().entities.is_empty());
    }

    #[test]
    fn entity_added_during_push_stays_pending() {
        let mut store = MemoryStore::new();
        store.add_entity(Task::new("a", "A", 1.0)).unwrap();
        let pushed = store.device_revision();
        let late = store.add_entity(Task::new("b", "B", 2.0)).unwrap();

        store.acknowledge_push(&pushed);
        let next = store.device_revision();
        assert_eq!(next.entities.len(), 1);
        assert_eq!(next.entities[0].uuid(), late);
    }

    #[test]
    fn duplicate_local_version_is_refused() {
        let mut store = MemoryStore::new();
        let task = Task::new("a", "A", 1.0);
        store.add_entity(task.clone()).unwrap();
        assert!(matches!(store.add_entity(task), Err(SyncError::Store(_))));
    }

    #[test]
    fn merged_entities_are_not_pushed_back() {
        let mut store = MemoryStore::new();
        let remote_process = ProcessId::generate();
        let remote_knowledge: KnowledgeVector = [(remote_process, 3)].into_iter().collect();
        let task = Entity::from(Task::new("a", "A", 1.0));

        store
            .merge_revision(RevisionRecord::new(vec![task.clone()], remote_knowledge))
            .unwrap();
        store
            .merge_revision(RevisionRecord::new(vec![task.clone()], KnowledgeVector::new()))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.knowledge().clock(&remote_process), 3);
        assert!(store.device_revision().entities.is_empty());
        assert_eq!(store.entity(&task.uuid()), Some(&task));
    }

    #[test]
    fn resolved_conflict_leaves_one_head() {
        let mut store = MemoryStore::new();
        let base = Outcome::new(Uuid::nil(), 0, 1.0);
        let left = base.appending(OutcomeValue::boolean(true, 2.0), 2.0);
        let right = base.appending(OutcomeValue::boolean(false, 3.0), 3.0);
        store.add_entity(base).unwrap();
        store.add_entity(left.clone()).unwrap();
        store.add_entity(right.clone()).unwrap();

        let conflicts = store.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].len(), 2);

        let winner = Entity::from(right);
        store.resolve_conflict(&winner, &conflicts[0]).unwrap();
        assert!(store.conflicts().is_empty());
        assert_eq!(store.heads_of_kind(EntityKind::Outcome), vec![&winner]);

        let stranger = Entity::from(Task::new("x", "X", 0.0));
        assert!(store.resolve_conflict(&stranger, &conflicts[0]).is_err());
    }

    #[test]
    fn losing_local_edit_is_not_pushed() {
        let mut store = MemoryStore::new();
        let base = Outcome::new(Uuid::nil(), 0, 1.0);
        let mine = base.appending(OutcomeValue::boolean(true, 2.0), 2.0);
        let theirs = base.appending(OutcomeValue::boolean(false, 5.0), 5.0);
        store.add_entity(base.clone()).unwrap();
        store.add_entity(mine.clone()).unwrap();
        store
            .merge_revision(RevisionRecord::new(
                vec![theirs.clone().into()],
                KnowledgeVector::new(),
            ))
            .unwrap();

        let conflicts = store.conflicts();
        assert_eq!(conflicts.len(), 1);
        store
            .resolve_conflict(&Entity::from(theirs.clone()), &conflicts[0])
            .unwrap();

        let pushed: Vec<Uuid> = store
            .device_revision()
            .entities
            .iter()
            .map(Entity::uuid)
            .collect();
        assert_eq!(pushed, vec![base.header.uuid]);
        assert_eq!(store.pending(), 1);
        assert!(store.entity(&mine.header.uuid).is_some());
    }
}
