//! Conflict resolution strategies.
//!
//! A conflict is a set of two or more versions of one logical record that
//! cannot be causally ordered. Resolution picks exactly one whole version;
//! fields are never merged.

use crate::entity::Entity;
use std::cmp::Ordering;

/// Chooses a winner among competing versions.
///
/// Implementations return a reference into `candidates`, so a winner is
/// always one of the inputs. Returning `None` means the strategy declined
/// to choose.
pub trait ConflictResolver: Send + Sync {
    /// Picks the winning version.
    fn choose<'a>(&self, candidates: &'a [Entity]) -> Option<&'a Entity>;
}

impl<F> ConflictResolver for F
where
    F: for<'a> Fn(&'a [Entity]) -> Option<&'a Entity> + Send + Sync,
{
    fn choose<'a>(&self, candidates: &'a [Entity]) -> Option<&'a Entity> {
        self(candidates)
    }
}

/// Built-in resolution policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// The version with the newest `createdDate` wins.
    ///
    /// Ties fall back to the newest `updatedDate`, then to the greatest
    /// UUID, so the result does not depend on candidate order.
    #[default]
    NewestCreated,
    /// The version with the newest `updatedDate` wins, same tie-breaks.
    NewestUpdated,
    /// The first candidate wins.
    KeepFirst,
}

impl ConflictPolicy {
    /// Converts to a code.
    pub fn to_code(&self) -> u8 {
        match self {
            ConflictPolicy::NewestCreated => 1,
            ConflictPolicy::NewestUpdated => 2,
            ConflictPolicy::KeepFirst => 3,
        }
    }

    /// Converts from a code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ConflictPolicy::NewestCreated),
            2 => Some(ConflictPolicy::NewestUpdated),
            3 => Some(ConflictPolicy::KeepFirst),
            _ => None,
        }
    }
}

fn newest_created(a: &Entity, b: &Entity) -> Ordering {
    a.created_date()
        .total_cmp(&b.created_date())
        .then_with(|| newest_updated(a, b))
}

fn newest_updated(a: &Entity, b: &Entity) -> Ordering {
    a.updated_date()
        .total_cmp(&b.updated_date())
        .then_with(|| a.uuid().cmp(&b.uuid()))
}

impl ConflictResolver for ConflictPolicy {
    fn choose<'a>(&self, candidates: &'a [Entity]) -> Option<&'a Entity> {
        match self {
            ConflictPolicy::NewestCreated => candidates.iter().max_by(|a, b| newest_created(a, b)),
            ConflictPolicy::NewestUpdated => candidates.iter().max_by(|a, b| newest_updated(a, b)),
            ConflictPolicy::KeepFirst => candidates.first(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Outcome, Task};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn outcome(created: f64, updated: f64) -> Entity {
        let mut outcome = Outcome::new(Uuid::nil(), 0, created);
        outcome.header.updated_date = updated;
        outcome.into()
    }

    #[test]
    fn newest_created_wins() {
        let candidates = vec![outcome(1.0, 9.0), outcome(3.0, 3.0), outcome(2.0, 2.0)];
        let winner = ConflictPolicy::NewestCreated.choose(&candidates).unwrap();
        assert_eq!(winner.created_date(), 3.0);
    }

    #[test]
    fn ties_fall_back_to_updated_date() {
        let candidates = vec![outcome(1.0, 5.0), outcome(1.0, 7.0)];
        let winner = ConflictPolicy::NewestCreated.choose(&candidates).unwrap();
        assert_eq!(winner.updated_date(), 7.0);

        let winner = ConflictPolicy::NewestUpdated.choose(&candidates).unwrap();
        assert_eq!(winner.updated_date(), 7.0);
    }

    #[test]
    fn keep_first() {
        let candidates = vec![outcome(1.0, 1.0), outcome(3.0, 3.0)];
        let winner = ConflictPolicy::KeepFirst.choose(&candidates).unwrap();
        assert_eq!(winner.uuid(), candidates[0].uuid());
    }

    #[test]
    fn single_candidate_is_trivial_winner() {
        let candidates = vec![Entity::from(Task::new("a", "A", 1.0))];
        for policy in [
            ConflictPolicy::NewestCreated,
            ConflictPolicy::NewestUpdated,
            ConflictPolicy::KeepFirst,
        ] {
            assert_eq!(policy.choose(&candidates), Some(&candidates[0]));
        }
    }

    #[test]
    fn empty_set_has_no_winner() {
        assert!(ConflictPolicy::NewestCreated.choose(&[]).is_none());
        assert!(ConflictPolicy::KeepFirst.choose(&[]).is_none());
    }

    #[test]
    fn functions_are_resolvers() {
        fn last(candidates: &[Entity]) -> Option<&Entity> {
            candidates.last()
        }
        let candidates = vec![outcome(5.0, 5.0), outcome(1.0, 1.0)];
        assert_eq!(last.choose(&candidates).unwrap().created_date(), 1.0);
    }

    #[test]
    fn policy_codes() {
        for policy in [
            ConflictPolicy::NewestCreated,
            ConflictPolicy::NewestUpdated,
            ConflictPolicy::KeepFirst,
        ] {
            assert_eq!(ConflictPolicy::from_code(policy.to_code()), Some(policy));
        }
        assert_eq!(ConflictPolicy::from_code(0), None);
    }

    proptest! {
        #[test]
        fn winner_is_an_input_with_max_created(dates in prop::collection::vec((0u32..50, 0u32..50), 1..8)) {
            let candidates: Vec<Entity> = dates
                .iter()
                .map(|(c, u)| outcome(f64::from(*c), f64::from(*u)))
                .collect();
            let winner = ConflictPolicy::NewestCreated.choose(&candidates).unwrap();

            prop_assert!(candidates.iter().any(|c| c.uuid() == winner.uuid()));
            let max = candidates.iter().map(|c| c.created_date()).fold(f64::MIN, f64::max);
            prop_assert_eq!(winner.created_date(), max);

            let mut reversed = candidates.clone();
            reversed.reverse();
            let again = ConflictPolicy::NewestCreated.choose(&reversed).unwrap();
            prop_assert_eq!(again.uuid(), winner.uuid());
        }
    }
}
