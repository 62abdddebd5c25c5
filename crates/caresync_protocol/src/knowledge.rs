//! Knowledge vectors.
//!
//! A [`KnowledgeVector`] maps each participating process to a logical clock
//! and reads as "every operation from process P up to clock C is known".
//! Vectors form a partial order under entrywise comparison and a join
//! semilattice under entrywise maximum.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of one synchronization participant.
///
/// One per store instance; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(Uuid);

impl ProcessId {
    /// Generates a fresh random process ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ProcessId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Outcome of comparing two knowledge vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeOrdering {
    /// The left vector is strictly behind the right one.
    LessThan,
    /// The left vector knows everything the right one knows.
    GreaterOrEqual,
    /// Each vector knows something the other does not.
    Incomparable,
}

/// A per-process logical clock map.
///
/// Absent processes have clock 0, and zero entries are never stored, so
/// `{P: 0}` and `{}` are the same vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "WireKnowledgeVector", into = "WireKnowledgeVector")]
pub struct KnowledgeVector {
    clocks: BTreeMap<ProcessId, u64>,
}

impl KnowledgeVector {
    /// Creates the zero vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the clock for a process (0 if unknown).
    pub fn clock(&self, process: &ProcessId) -> u64 {
        self.clocks.get(process).copied().unwrap_or(0)
    }

    /// Advances the clock of `process` by one and returns the new value.
    pub fn increment(&mut self, process: ProcessId) -> u64 {
        let clock = self.clocks.entry(process).or_insert(0);
        *clock = clock.saturating_add(1);
        *clock
    }

    /// Raises the clock of `process` to at least `clock`.
    pub fn observe(&mut self, process: ProcessId, clock: u64) {
        if clock == 0 {
            return;
        }
        let entry = self.clocks.entry(process).or_insert(0);
        *entry = (*entry).max(clock);
    }

    /// Returns true if this vector knows everything `other` knows (`self ≥ other`).
    ///
    /// Processes present only in `self` never block dominance.
    pub fn dominates(&self, other: &KnowledgeVector) -> bool {
        other
            .clocks
            .iter()
            .all(|(process, clock)| self.clock(process) >= *clock)
    }

    /// Compares two vectors entrywise.
    pub fn compare(&self, other: &KnowledgeVector) -> KnowledgeOrdering {
        if self.dominates(other) {
            KnowledgeOrdering::GreaterOrEqual
        } else if other.dominates(self) {
            KnowledgeOrdering::LessThan
        } else {
            KnowledgeOrdering::Incomparable
        }
    }

    /// Returns the least upper bound of `self` and `other`.
    pub fn merge(&self, other: &KnowledgeVector) -> KnowledgeVector {
        let mut merged = self.clone();
        merged.merge_with(other);
        merged
    }

    /// Folds `other` into `self` (entrywise maximum).
    pub fn merge_with(&mut self, other: &KnowledgeVector) {
        for (process, clock) in &other.clocks {
            self.observe(*process, *clock);
        }
    }

    /// Returns true if no process has a non-zero clock.
    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Returns the number of processes with a non-zero clock.
    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    /// Iterates over `(process, clock)` pairs in process order.
    pub fn iter(&self) -> impl Iterator<Item = (ProcessId, u64)> + '_ {
        self.clocks.iter().map(|(process, clock)| (*process, *clock))
    }
}

impl PartialOrd for KnowledgeVector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.dominates(other), other.dominates(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (false, false) => None,
        }
    }
}

impl FromIterator<(ProcessId, u64)> for KnowledgeVector {
    fn from_iter<I: IntoIterator<Item = (ProcessId, u64)>>(iter: I) -> Self {
        let mut vector = KnowledgeVector::new();
        for (process, clock) in iter {
            vector.observe(process, clock);
        }
        vector
    }
}

impl fmt::Display for KnowledgeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (process, clock)) in self.clocks.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{process}: {clock}")?;
        }
        f.write_str("}")
    }
}

/// `{"processes": [{"id": ..., "clock": ...}]}`
#[derive(Serialize, Deserialize)]
struct WireKnowledgeVector {
    processes: Vec<WireProcessClock>,
}

#[derive(Serialize, Deserialize)]
struct WireProcessClock {
    id: ProcessId,
    clock: u64,
}

impl From<WireKnowledgeVector> for KnowledgeVector {
    fn from(wire: WireKnowledgeVector) -> Self {
        wire.processes
            .into_iter()
            .map(|entry| (entry.id, entry.clock))
            .collect()
    }
}

impl From<KnowledgeVector> for WireKnowledgeVector {
    fn from(vector: KnowledgeVector) -> Self {
        Self {
            processes: vector
                .clocks
                .into_iter()
                .map(|(id, clock)| WireProcessClock { id, clock })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pid(n: u8) -> ProcessId {
        ProcessId::from_uuid(Uuid::from_bytes([n; 16]))
    }

    fn kv(entries: &[(u8, u64)]) -> KnowledgeVector {
        entries.iter().map(|(n, c)| (pid(*n), *c)).collect()
    }

    fn vector_strategy() -> impl Strategy<Value = KnowledgeVector> {
        prop::collection::vec((0u8..4, 0u64..6), 0..5)
            .prop_map(|entries| entries.into_iter().map(|(n, c)| (pid(n), c)).collect())
    }

    #[test]
    fn zero_entries_are_absent() {
        assert_eq!(kv(&[(1, 0)]), KnowledgeVector::new());
        assert!(kv(&[(1, 0), (2, 0)]).is_empty());
        assert_eq!(kv(&[(1, 3)]).clock(&pid(9)), 0);
    }

    #[test]
    fn increment_only_grows() {
        let mut vector = KnowledgeVector::new();
        assert_eq!(vector.increment(pid(1)), 1);
        assert_eq!(vector.increment(pid(1)), 2);
        vector.observe(pid(1), 1);
        assert_eq!(vector.clock(&pid(1)), 2);
    }

    #[test]
    fn compare_cases() {
        let a = kv(&[(1, 2), (2, 1)]);
        let b = kv(&[(1, 1)]);
        let c = kv(&[(2, 3)]);

        assert_eq!(a.compare(&b), KnowledgeOrdering::GreaterOrEqual);
        assert_eq!(b.compare(&a), KnowledgeOrdering::LessThan);
        assert_eq!(a.compare(&a), KnowledgeOrdering::GreaterOrEqual);
        assert_eq!(b.compare(&c), KnowledgeOrdering::Incomparable);
        assert_eq!(a.partial_cmp(&c), None);
        assert!(a > b);
    }

    #[test]
    fn extra_processes_do_not_block_dominance() {
        let a = kv(&[(1, 1), (7, 9)]);
        let b = kv(&[(1, 1)]);
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn json_shape() {
        let vector = kv(&[(1, 12), (2, 4)]);
        let json = serde_json::to_value(&vector).unwrap();
        let processes = json["processes"].as_array().unwrap();
        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0]["clock"], 12);
        assert!(processes[0]["id"].is_string());

        let decoded: KnowledgeVector = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, vector);
    }

    #[test]
    fn decoding_duplicate_ids_keeps_max() {
        let id = pid(1).to_string();
        let json = format!(
            r#"{{"processes":[{{"id":"{id}","clock":3}},{{"id":"{id}","clock":5}}]}}"#
        );
        let decoded: KnowledgeVector = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.clock(&pid(1)), 5);
    }

    proptest! {
        #[test]
        fn merge_is_associative(a in vector_strategy(), b in vector_strategy(), c in vector_strategy()) {
            prop_assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
        }

        #[test]
        fn merge_is_commutative(a in vector_strategy(), b in vector_strategy()) {
            prop_assert_eq!(a.merge(&b), b.merge(&a));
        }

        #[test]
        fn merge_is_idempotent(a in vector_strategy()) {
            prop_assert_eq!(a.merge(&a), a);
        }

        #[test]
        fn merge_is_upper_bound(a in vector_strategy(), b in vector_strategy()) {
            let joined = a.merge(&b);
            prop_assert!(joined.dominates(&a));
            prop_assert!(joined.dominates(&b));
        }

        #[test]
        fn compare_is_antisymmetric(a in vector_strategy(), b in vector_strategy()) {
            if a.compare(&b) == KnowledgeOrdering::LessThan {
                prop_assert_eq!(b.compare(&a), KnowledgeOrdering::GreaterOrEqual);
            }
            if a.compare(&b) == KnowledgeOrdering::Incomparable {
                prop_assert_eq!(b.compare(&a), KnowledgeOrdering::Incomparable);
            }
        }
    }
}
