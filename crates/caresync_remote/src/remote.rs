//! The client-side handle for one synchronization counterpart.

use crate::config::RemoteConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use caresync_protocol::{
    decode_entities, encode_entities, Bytes, ConflictPolicy, ConflictResolver, Entity,
    KnowledgeVector, PullRequest, PushRequest, RevisionRecord,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Receives notifications from a [`Remote`].
pub trait RemoteDelegate: Send + Sync {
    /// The counterpart has changes and asks the store to synchronize.
    fn remote_did_request_synchronization(&self, remote: &str);

    /// Progress of the running pull, between `0.0` and `1.0`.
    fn remote_did_update_progress(&self, remote: &str, progress: f64) {
        let _ = (remote, progress);
    }
}

/// Marks one kind of operation as running for as long as it lives.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, operation: &str) -> SyncResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::OperationInFlight {
                operation: operation.to_string(),
            })?;
        Ok(Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A store's handle on one synchronization counterpart.
///
/// A remote owns no entity data. It moves revisions over its transport,
/// picks winners among conflicting versions, and tells its delegate when
/// the counterpart wants attention. At most one pull and one push run at a
/// time; an overlapping call fails with [`SyncError::OperationInFlight`].
pub struct Remote<T: SyncTransport> {
    name: String,
    automatically_synchronizes: AtomicBool,
    transport: T,
    resolver: Box<dyn ConflictResolver>,
    delegate: RwLock<Option<Weak<dyn RemoteDelegate>>>,
    pulling: AtomicBool,
    pushing: AtomicBool,
}

impl<T: SyncTransport> Remote<T> {
    /// Creates a remote resolving conflicts by newest creation date.
    pub fn new(config: RemoteConfig, transport: T) -> Self {
        Self {
            name: config.name,
            automatically_synchronizes: AtomicBool::new(config.automatically_synchronizes),
            transport,
            resolver: Box::new(ConflictPolicy::default()),
            delegate: RwLock::new(None),
            pulling: AtomicBool::new(false),
            pushing: AtomicBool::new(false),
        }
    }

    /// Replaces the conflict resolution strategy.
    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Returns the counterpart's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the host should synchronize without being asked.
    pub fn automatically_synchronizes(&self) -> bool {
        self.automatically_synchronizes.load(Ordering::Relaxed)
    }

    /// Sets whether the host should synchronize without being asked.
    pub fn set_automatically_synchronizes(&self, enabled: bool) {
        self.automatically_synchronizes
            .store(enabled, Ordering::Relaxed);
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registers a delegate. The remote keeps only a weak reference.
    pub fn set_delegate<D: RemoteDelegate + 'static>(&self, delegate: &Arc<D>) {
        let delegate: Arc<dyn RemoteDelegate> = delegate.clone();
        *self.delegate.write() = Some(Arc::downgrade(&delegate));
    }

    /// Forgets the delegate.
    pub fn clear_delegate(&self) {
        *self.delegate.write() = None;
    }

    fn delegate(&self) -> Option<Arc<dyn RemoteDelegate>> {
        let weak = self.delegate.read().clone();
        weak.and_then(|d| d.upgrade())
    }

    fn report_progress(&self, progress: f64) {
        if let Some(delegate) = self.delegate() {
            delegate.remote_did_update_progress(&self.name, progress);
        }
    }

    /// Notifies the delegate that the counterpart has changes.
    ///
    /// Returns false if no delegate was listening.
    pub fn request_synchronization(&self) -> bool {
        match self.delegate() {
            Some(delegate) => {
                delegate.remote_did_request_synchronization(&self.name);
                true
            }
            None => {
                debug!(remote = %self.name, "synchronization requested with no delegate");
                false
            }
        }
    }

    /// Fetches every revision the counterpart holds that `since` does not
    /// know about.
    ///
    /// On success `merge_revision` is called once with all new entities, in
    /// log order, stamped with the counterpart's knowledge. On failure it is
    /// never called.
    pub async fn pull_revisions<F>(
        &self,
        since: &KnowledgeVector,
        merge_revision: F,
    ) -> SyncResult<()>
    where
        F: FnOnce(RevisionRecord) + Send,
    {
        let _guard = InFlight::acquire(&self.pulling, "pull")?;
        self.report_progress(0.0);

        let response = self
            .transport
            .pull(&PullRequest::new(since.clone()))
            .await?;

        let mut entities = Vec::new();
        for payload in &response.payloads {
            entities.extend(decode_entities(payload)?);
        }
        debug!(
            remote = %self.name,
            revisions = response.payloads.len(),
            entities = entities.len(),
            knowledge = %response.knowledge,
            "pulled revisions"
        );

        merge_revision(RevisionRecord::new(entities, response.knowledge));
        self.report_progress(1.0);
        Ok(())
    }

    /// Offers the store's local changes to the counterpart.
    ///
    /// A refusal surfaces as [`SyncError::SynchronizationConflict`]; the
    /// store should pull and try again.
    pub async fn push_revisions(&self, device_revision: RevisionRecord) -> SyncResult<()> {
        let _guard = InFlight::acquire(&self.pushing, "push")?;

        let payload = if device_revision.entities.is_empty() {
            None
        } else {
            Some(Bytes::from(encode_entities(&device_revision.entities)?))
        };
        let entities = device_revision.entities.len();
        let request = PushRequest::new(device_revision.knowledge_vector, payload);

        let response = self.transport.push(&request).await?;
        if response.accepted {
            info!(remote = %self.name, entities, knowledge = %response.knowledge, "push accepted");
            Ok(())
        } else {
            let reason = response
                .error
                .unwrap_or_else(|| "push rejected".to_string());
            warn!(remote = %self.name, %reason, "push rejected");
            Err(SyncError::SynchronizationConflict { reason })
        }
    }

    /// Picks the winner among conflicting versions of one record.
    ///
    /// The winner is always one of `conflicts`.
    pub async fn choose_conflict_resolution(
        &self,
        mut conflicts: Vec<Entity>,
    ) -> SyncResult<Entity> {
        match conflicts.len() {
            0 => Err(SyncError::ConflictResolution(
                "no candidates to choose from".to_string(),
            )),
            1 => Ok(conflicts.swap_remove(0)),
            n => {
                let winner = self.resolver.choose(&conflicts).ok_or_else(|| {
                    SyncError::ConflictResolution(format!("resolver declined {n} candidates"))
                })?;
                debug!(remote = %self.name, candidates = n, winner = %winner.uuid(), "resolved conflict");
                Ok(winner.clone())
            }
        }
    }
}
