//! Server-side revision log.

use crate::config::PushPolicy;
use crate::error::{ServerError, ServerResult};
use caresync_protocol::{Bytes, KnowledgeVector};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// A revision accepted by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedRevision {
    /// Knowledge the pushing device declared.
    pub stamp: KnowledgeVector,
    /// Encoded entities, opaque to the server.
    pub payload: Bytes,
}

#[derive(Debug, Default)]
struct LogState {
    revisions: Vec<LoggedRevision>,
    knowledge: KnowledgeVector,
}

impl LogState {
    fn latest_stamp(&self) -> KnowledgeVector {
        self.revisions
            .last()
            .map(|r| r.stamp.clone())
            .unwrap_or_default()
    }
}

/// Append-only log of accepted revisions.
///
/// The log maintains:
/// - Accepted revisions in acceptance order
/// - The merge of every knowledge vector it has been shown
///
/// Validation and append happen under one lock, so concurrent uploads
/// are linearized.
#[derive(Debug)]
pub struct RevisionLog {
    state: Mutex<LogState>,
    policy: PushPolicy,
}

impl RevisionLog {
    /// Creates an empty log.
    pub fn new(policy: PushPolicy) -> Self {
        Self {
            state: Mutex::new(LogState::default()),
            policy,
        }
    }

    /// Returns the admission rule in effect.
    pub fn policy(&self) -> PushPolicy {
        self.policy
    }

    /// Accepts a push.
    ///
    /// The push is validated against the stamp of the last accepted
    /// revision. On success the server knowledge absorbs `device` and a
    /// non-empty payload is appended. Returns the server knowledge after
    /// the merge.
    pub fn upload(
        &self,
        payload: Option<Bytes>,
        device: &KnowledgeVector,
    ) -> ServerResult<KnowledgeVector> {
        let mut state = self.state.lock();
        let latest = state.latest_stamp();

        if !self.policy.admits(&latest, device) {
            warn!(%latest, %device, "rejecting push, device must pull first");
            return Err(ServerError::SynchronizationConflict {
                latest,
                device: device.clone(),
            });
        }

        state.knowledge.merge_with(device);
        if let Some(payload) = payload.filter(|p| !p.is_empty()) {
            debug!(bytes = payload.len(), stamp = %device, "appending revision");
            state.revisions.push(LoggedRevision {
                stamp: device.clone(),
                payload,
            });
        }

        Ok(state.knowledge.clone())
    }

    /// Returns the server knowledge and, in log order, the payload of
    /// every revision whose stamp `device` does not dominate.
    pub fn updates(&self, device: &KnowledgeVector) -> (KnowledgeVector, Vec<Bytes>) {
        let state = self.state.lock();
        let payloads: Vec<Bytes> = state
            .revisions
            .iter()
            .filter(|r| !device.dominates(&r.stamp))
            .map(|r| r.payload.clone())
            .collect();
        debug!(
            %device,
            returned = payloads.len(),
            logged = state.revisions.len(),
            "serving updates"
        );
        (state.knowledge.clone(), payloads)
    }

    /// Appends a revision without validation.
    ///
    /// Used to preload a server with existing content.
    pub fn seed(&self, stamp: KnowledgeVector, payload: Bytes) {
        let mut state = self.state.lock();
        state.knowledge.merge_with(&stamp);
        state.revisions.push(LoggedRevision { stamp, payload });
    }

    /// Returns the stamp of the last accepted revision, or the zero vector.
    pub fn latest_stamp(&self) -> KnowledgeVector {
        self.state.lock().latest_stamp()
    }

    /// Returns the aggregate server knowledge.
    pub fn knowledge(&self) -> KnowledgeVector {
        self.state.lock().knowledge.clone()
    }

    /// Returns a copy of every logged revision.
    pub fn revisions(&self) -> Vec<LoggedRevision> {
        self.state.lock().revisions.clone()
    }

    /// Returns the number of logged revisions.
    pub fn len(&self) -> usize {
        self.state.lock().revisions.len()
    }

    /// Returns true if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.state.lock().revisions.is_empty()
    }
}

impl Default for RevisionLog {
    fn default() -> Self {
        Self::new(PushPolicy::default())
    }
}
