//! Version graph of entities.
//!
//! Versions are kept in an arena and linked by index in both directions, so
//! previous/next edges never form ownership cycles. Edges come from either
//! side's declaration: a version listing `previousVersionUUIDs` and a
//! version listing `nextVersionUUIDs` produce the same edge. References to
//! versions that have not arrived yet are parked and linked on arrival, so
//! insertion order does not matter.

use crate::entity::{Entity, LogicalKey};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Node {
    entity: Entity,
    previous: Vec<usize>,
    next: Vec<usize>,
}

/// Which side of a parked edge the waiting node is on.
#[derive(Debug, Clone, Copy)]
enum Parked {
    /// The waiting node is the predecessor of the missing one.
    Predecessor(usize),
    /// The waiting node is the successor of the missing one.
    Successor(usize),
}

/// Arena of entity versions indexed by UUID.
///
/// # Invariants
///
/// - A UUID is inserted at most once; versions are never replaced.
/// - `previous`/`next` adjacency lists mirror each other.
/// - Version edges never form a cycle. A declared link that would close one
///   is dropped, so the first edge to arrive wins.
/// - A head is a version with no known successor that has not lost a
///   recorded conflict resolution.
#[derive(Debug, Clone, Default)]
pub struct VersionGraph {
    nodes: Vec<Node>,
    index: HashMap<Uuid, usize>,
    parked: HashMap<Uuid, Vec<Parked>>,
    superseded: HashSet<usize>,
}

impl VersionGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a version. Returns false if its UUID was already present.
    pub fn insert(&mut self, entity: Entity) -> bool {
        let uuid = entity.uuid();
        if self.index.contains_key(&uuid) {
            return false;
        }

        let idx = self.nodes.len();
        let header = entity.header();
        let previous = header.previous_version_uuids.clone();
        let next = header.next_version_uuids.clone();

        self.nodes.push(Node {
            entity,
            previous: Vec::new(),
            next: Vec::new(),
        });
        self.index.insert(uuid, idx);

        for prev_uuid in previous {
            match self.index.get(&prev_uuid) {
                Some(&prev_idx) => self.link(prev_idx, idx),
                None => self
                    .parked
                    .entry(prev_uuid)
                    .or_default()
                    .push(Parked::Successor(idx)),
            }
        }

        for next_uuid in next {
            match self.index.get(&next_uuid) {
                Some(&next_idx) => self.link(idx, next_idx),
                None => self
                    .parked
                    .entry(next_uuid)
                    .or_default()
                    .push(Parked::Predecessor(idx)),
            }
        }

        if let Some(waiting) = self.parked.remove(&uuid) {
            for parked in waiting {
                match parked {
                    Parked::Successor(succ) => self.link(idx, succ),
                    Parked::Predecessor(pred) => self.link(pred, idx),
                }
            }
        }

        true
    }

    fn link(&mut self, from: usize, to: usize) {
        if from == to || self.nodes[from].next.contains(&to) {
            return;
        }
        if self.reaches(to, from) {
            return;
        }
        self.nodes[from].next.push(to);
        self.nodes[to].previous.push(from);
    }

    /// Returns true if `target` is a successor of `start`, following next
    /// edges.
    fn reaches(&self, start: usize, target: usize) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if idx == target {
                return true;
            }
            if seen.insert(idx) {
                stack.extend(self.nodes[idx].next.iter().copied());
            }
        }
        false
    }

    /// Returns the version with the given UUID.
    pub fn get(&self, uuid: &Uuid) -> Option<&Entity> {
        self.index.get(uuid).map(|&idx| &self.nodes[idx].entity)
    }

    /// Returns true if the version is present.
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.index.contains_key(uuid)
    }

    /// Returns the number of versions.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph holds no versions.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all versions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.nodes.iter().map(|node| &node.entity)
    }

    /// Returns the UUIDs of known direct successors.
    pub fn successors(&self, uuid: &Uuid) -> Vec<Uuid> {
        self.neighbours(uuid, |node| &node.next)
    }

    /// Returns the UUIDs of known direct predecessors.
    pub fn predecessors(&self, uuid: &Uuid) -> Vec<Uuid> {
        self.neighbours(uuid, |node| &node.previous)
    }

    fn neighbours(&self, uuid: &Uuid, side: impl Fn(&Node) -> &Vec<usize>) -> Vec<Uuid> {
        self.index
            .get(uuid)
            .map(|&idx| {
                side(&self.nodes[idx])
                    .iter()
                    .map(|&other| self.nodes[other].entity.uuid())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_head(&self, idx: usize) -> bool {
        self.nodes[idx].next.is_empty() && !self.superseded.contains(&idx)
    }

    /// Iterates over the current heads in insertion order.
    pub fn heads(&self) -> impl Iterator<Item = &Entity> + '_ {
        (0..self.nodes.len())
            .filter(move |&idx| self.is_head(idx))
            .map(move |idx| &self.nodes[idx].entity)
    }

    /// Returns every group of two or more heads that belong to the same
    /// logical record.
    ///
    /// Heads belong together when they are connected through version edges
    /// or share a [`LogicalKey`]. Groups are ordered by their earliest
    /// inserted member and members by insertion order.
    pub fn conflicts(&self) -> Vec<Vec<Entity>> {
        let mut sets = DisjointSet::new(self.nodes.len());
        let mut by_key: HashMap<LogicalKey, usize> = HashMap::new();

        for (idx, node) in self.nodes.iter().enumerate() {
            for &next in &node.next {
                sets.union(idx, next);
            }
            if let Some(key) = node.entity.logical_key() {
                match by_key.get(&key) {
                    Some(&first) => sets.union(first, idx),
                    None => {
                        by_key.insert(key, idx);
                    }
                }
            }
        }

        let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        for idx in (0..self.nodes.len()).filter(|&idx| self.is_head(idx)) {
            let root = sets.find(idx);
            match group_of_root.get(&root) {
                Some(&group) => groups[group].1.push(idx),
                None => {
                    group_of_root.insert(root, groups.len());
                    groups.push((idx, vec![idx]));
                }
            }
        }

        groups
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(_, members)| {
                members
                    .into_iter()
                    .map(|idx| self.nodes[idx].entity.clone())
                    .collect()
            })
            .collect()
    }

    /// Records the outcome of a conflict: every listed loser stops being a
    /// head. Returns false, changing nothing, if the winner is unknown.
    pub fn resolve(&mut self, winner: Uuid, losers: impl IntoIterator<Item = Uuid>) -> bool {
        let Some(&winner_idx) = self.index.get(&winner) else {
            return false;
        };
        for loser in losers {
            if let Some(&idx) = self.index.get(&loser) {
                if idx != winner_idx {
                    self.superseded.insert(idx);
                }
            }
        }
        true
    }
}

/// Union-find over arena indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index becomes root to keep grouping deterministic.
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[child] = root;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Outcome, OutcomeValue, Task};

    fn chain(len: usize) -> Vec<Outcome> {
        let mut versions = vec![Outcome::new(Uuid::new_v4(), 0, 1.0)];
        for i in 1..len {
            let next = versions[i - 1].appending(OutcomeValue::boolean(true, i as f64), i as f64);
            versions.push(next);
        }
        versions
    }

    #[test]
    fn chain_has_single_head() {
        let mut graph = VersionGraph::new();
        for version in chain(5) {
            assert!(graph.insert(version.into()));
        }

        let heads: Vec<_> = graph.heads().collect();
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[0].as_outcome().unwrap().values.len(), 4);
        assert!(graph.conflicts().is_empty());
    }

    #[test]
    fn out_of_order_insertion_links() {
        let versions = chain(3);
        let mut graph = VersionGraph::new();
        for version in versions.iter().rev() {
            graph.insert(version.clone().into());
        }

        assert_eq!(graph.heads().count(), 1);
        assert_eq!(
            graph.successors(&versions[0].header.uuid),
            vec![versions[1].header.uuid]
        );
        assert_eq!(
            graph.predecessors(&versions[2].header.uuid),
            vec![versions[1].header.uuid]
        );
    }

    #[test]
    fn next_links_are_honoured() {
        let first = Task::new("walk", "Walk", 1.0);
        let mut second = Task::new("walk", "Walk more", 2.0);
        let mut first_declaring = first.clone();
        first_declaring.header.next_version_uuids = vec![second.header.uuid];
        second.header.previous_version_uuids.clear();

        let mut graph = VersionGraph::new();
        graph.insert(first_declaring.into());
        graph.insert(second.clone().into());

        let heads: Vec<_> = graph.heads().map(|e| e.uuid()).collect();
        assert_eq!(heads, vec![second.header.uuid]);
    }

    #[test]
    fn cyclic_links_keep_a_single_head() {
        let mut first = Task::new("walk", "Walk", 1.0);
        let mut second = Task::new("walk", "Walk more", 2.0);
        first.header.next_version_uuids = vec![second.header.uuid];
        second.header.previous_version_uuids.clear();
        second.header.next_version_uuids = vec![first.header.uuid];

        let mut graph = VersionGraph::new();
        graph.insert(first.clone().into());
        graph.insert(second.clone().into());

        let heads: Vec<_> = graph.heads().map(|e| e.uuid()).collect();
        assert_eq!(heads, vec![second.header.uuid]);
        assert!(graph.conflicts().is_empty());
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let task = Task::new("walk", "Walk", 1.0);
        let mut graph = VersionGraph::new();
        assert!(graph.insert(task.clone().into()));
        assert!(!graph.insert(task.into()));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn branches_conflict_until_resolved() {
        let root = Outcome::new(Uuid::new_v4(), 1, 1.0);
        let left = root.appending(OutcomeValue::boolean(true, 2.0), 2.0);
        let right = root.appending(OutcomeValue::boolean(false, 3.0), 3.0);

        let mut graph = VersionGraph::new();
        graph.insert(root.into());
        graph.insert(left.clone().into());
        graph.insert(right.clone().into());

        let conflicts = graph.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].len(), 2);
        assert_eq!(conflicts[0][0].uuid(), left.header.uuid);

        assert!(graph.resolve(right.header.uuid, [left.header.uuid, right.header.uuid]));
        assert!(graph.conflicts().is_empty());
        let heads: Vec<_> = graph.heads().map(|e| e.uuid()).collect();
        assert_eq!(heads, vec![right.header.uuid]);
    }

    #[test]
    fn resolve_with_unknown_winner_changes_nothing() {
        let task = Task::new("walk", "Walk", 1.0);
        let uuid = task.header.uuid;
        let mut graph = VersionGraph::new();
        graph.insert(task.into());

        assert!(!graph.resolve(Uuid::new_v4(), [uuid]));
        assert_eq!(graph.heads().count(), 1);
    }

    #[test]
    fn unlinked_versions_with_same_key_conflict() {
        let a = Task::new("nausea", "Track nausea", 1.0);
        let b = Task::new("nausea", "Track your nausea", 2.0);
        let other = Task::new("walk", "Walk", 3.0);

        let mut graph = VersionGraph::new();
        graph.insert(a.into());
        graph.insert(other.into());
        graph.insert(b.into());

        let conflicts = graph.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0]
            .iter()
            .all(|e| e.header().id.as_deref() == Some("nausea")));
    }

    #[test]
    fn later_version_reopens_resolved_branch() {
        let root = Outcome::new(Uuid::new_v4(), 1, 1.0);
        let left = root.appending(OutcomeValue::boolean(true, 2.0), 2.0);
        let right = root.appending(OutcomeValue::boolean(false, 3.0), 3.0);

        let mut graph = VersionGraph::new();
        graph.insert(root.into());
        graph.insert(left.clone().into());
        graph.insert(right.clone().into());
        graph.resolve(right.header.uuid, [left.header.uuid]);

        let left_next = left.appending(OutcomeValue::boolean(true, 4.0), 4.0);
        graph.insert(left_next.into());
        assert_eq!(graph.conflicts().len(), 1);
    }
}
