//! Property-based test generators using proptest.
//!
//! Process ids are drawn from a small pool so that generated knowledge
//! vectors overlap and every ordering shows up.

use caresync_protocol::{
    Entity, KnowledgeVector, Outcome, OutcomeValue, ProcessId, RevisionRecord, Task, Timestamp,
    Uuid,
};
use proptest::prelude::*;

/// Number of distinct processes in the generator pool.
pub const PROCESS_POOL: u128 = 4;

/// Strategy for generating process ids from the shared pool.
pub fn process_id_strategy() -> impl Strategy<Value = ProcessId> {
    (1..=PROCESS_POOL).prop_map(|n| ProcessId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating knowledge vectors over the shared pool.
pub fn knowledge_vector_strategy() -> impl Strategy<Value = KnowledgeVector> {
    prop::collection::vec((process_id_strategy(), 1u64..16), 0..=PROCESS_POOL as usize)
        .prop_map(|entries| {
            let mut knowledge = KnowledgeVector::new();
            for (process, clock) in entries {
                knowledge.observe(process, clock);
            }
            knowledge
        })
}

/// Strategy for generating timestamps, as seconds since the reference date.
///
/// Whole milliseconds keep the values exact in JSON.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (0u32..1_000_000_000).prop_map(|ms| f64::from(ms) / 1000.0)
}

/// Strategy for generating first task versions.
pub fn task_strategy() -> impl Strategy<Value = Task> {
    (
        prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex"),
        prop::string::string_regex("[A-Za-z ]{0,24}").expect("Invalid regex"),
        timestamp_strategy(),
    )
        .prop_map(|(id, title, now)| Task::new(id, title, now))
}

/// Strategy for generating outcome versions with up to five boolean
/// values, each appended as a new version.
pub fn outcome_strategy() -> impl Strategy<Value = Outcome> {
    (
        any::<u128>(),
        0u64..64,
        timestamp_strategy(),
        prop::collection::vec(any::<bool>(), 0..5),
    )
        .prop_map(|(task, index, now, values)| {
            values.into_iter().fold(
                Outcome::new(Uuid::from_u128(task), index, now),
                |outcome, value| outcome.appending(OutcomeValue::boolean(value, now), now),
            )
        })
}

/// Strategy for generating entities of either kind.
pub fn entity_strategy() -> impl Strategy<Value = Entity> {
    prop_oneof![
        1 => task_strategy().prop_map(Entity::from),
        2 => outcome_strategy().prop_map(Entity::from),
    ]
}

/// Strategy for generating revision records.
pub fn revision_record_strategy() -> impl Strategy<Value = RevisionRecord> {
    (
        prop::collection::vec(entity_strategy(), 0..8),
        knowledge_vector_strategy(),
    )
        .prop_map(|(entities, knowledge)| RevisionRecord::new(entities, knowledge))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
