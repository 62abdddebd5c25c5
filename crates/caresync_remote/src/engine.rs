//! Sync engine state machine.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::Remote;
use crate::store::RevisionStore;
use crate::transport::SyncTransport;
use caresync_protocol::{RevisionRecord, Uuid};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle, not syncing.
    Idle,
    /// Engine is pulling revisions from the counterpart.
    Pulling,
    /// Engine is resolving conflicts in the store.
    Resolving,
    /// Engine is pushing local changes to the counterpart.
    Pushing,
    /// Engine has completed a sync cycle.
    Synced,
    /// Engine encountered an error.
    Error,
    /// Engine is waiting before retrying.
    RetryWait,
}

impl SyncState {
    /// Returns true if the engine is in an active sync state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Pulling | SyncState::Resolving | SyncState::Pushing
        )
    }

    /// Returns true if the engine can start a new sync.
    pub fn can_start_sync(&self) -> bool {
        matches!(
            self,
            SyncState::Idle | SyncState::Synced | SyncState::Error | SyncState::RetryWait
        )
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of entities pulled.
    pub entities_pulled: u64,
    /// Total number of entities pushed.
    pub entities_pushed: u64,
    /// Total number of conflicts resolved.
    pub conflicts_resolved: u64,
    /// Total number of pushes the counterpart refused.
    pub rejected_pushes: u64,
    /// Total number of retries.
    pub retries: u64,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Number of entities pulled.
    pub pulled: u64,
    /// Number of entities pushed.
    pub pushed: u64,
    /// Winning version of every conflict resolved during the cycle.
    pub resolved: Vec<Uuid>,
    /// Duration of the sync cycle.
    pub duration: Duration,
}

/// The sync engine drives a store through pull, resolve and push against
/// one remote.
pub struct SyncEngine<T: SyncTransport, S: RevisionStore> {
    config: SyncConfig,
    remote: Arc<Remote<T>>,
    store: Mutex<S>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<T: SyncTransport, S: RevisionStore> SyncEngine<T, S> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, remote: Arc<Remote<T>>, store: S) -> Self {
        Self {
            config,
            remote,
            store: Mutex::new(store),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the remote this engine synchronizes with.
    pub fn remote(&self) -> &Arc<Remote<T>> {
        &self.remote
    }

    /// Runs `f` with shared access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.store.lock())
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.store.lock())
    }

    /// Consumes the engine, returning the store.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }

    fn set_state(&self, state: SyncState) {
        debug!(remote = %self.remote.name(), ?state, "sync state");
        *self.state.write() = state;
    }

    /// Moves to `Pulling` if no cycle is running.
    fn begin(&self) -> SyncResult<()> {
        let mut state = self.state.write();
        if !state.can_start_sync() {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", *state),
                to: format!("{:?}", SyncState::Pulling),
            });
        }
        *state = SyncState::Pulling;
        Ok(())
    }

    /// Performs one sync cycle: pull, resolve conflicts, push.
    pub async fn sync(&self) -> SyncResult<SyncCycleResult> {
        let start = Instant::now();
        self.begin()?;

        match self.run_cycle(start).await {
            Ok(result) => {
                self.set_state(SyncState::Synced);
                let mut stats = self.stats.write();
                stats.cycles_completed += 1;
                stats.entities_pulled += result.pulled;
                stats.entities_pushed += result.pushed;
                stats.conflicts_resolved += result.resolved.len() as u64;
                stats.last_sync_time = Some(Instant::now());
                stats.last_error = None;
                info!(
                    remote = %self.remote.name(),
                    pulled = result.pulled,
                    pushed = result.pushed,
                    resolved = result.resolved.len(),
                    "sync cycle complete"
                );
                Ok(result)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Performs sync cycles until one succeeds, a non-retryable error
    /// occurs, or the configured attempts run out.
    ///
    /// A refused push is retryable: the next cycle pulls first.
    pub async fn sync_with_retry(&self) -> SyncResult<SyncCycleResult> {
        let retry_config = &self.config.retry;
        let max_attempts = retry_config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                self.set_state(SyncState::RetryWait);
                tokio::time::sleep(retry_config.delay_for_attempt(attempt)).await;
                self.stats.write().retries += 1;
            }

            match self.sync().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    info!(remote = %self.remote.name(), attempt, error = %e, "retrying sync");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_cycle(&self, start: Instant) -> SyncResult<SyncCycleResult> {
        let since = self.store.lock().knowledge();
        let mut pulled: Option<RevisionRecord> = None;
        self.remote
            .pull_revisions(&since, |revision| pulled = Some(revision))
            .await?;

        let pulled_count = match pulled {
            Some(revision) => {
                let count = revision.entities.len() as u64;
                self.store.lock().merge_revision(revision)?;
                count
            }
            None => 0,
        };

        self.set_state(SyncState::Resolving);
        let groups = self.store.lock().conflicts();
        let mut resolved = Vec::with_capacity(groups.len());
        for group in groups {
            let winner = self
                .remote
                .choose_conflict_resolution(group.clone())
                .await?;
            self.store.lock().resolve_conflict(&winner, &group)?;
            resolved.push(winner.uuid());
        }

        self.set_state(SyncState::Pushing);
        let revision = self.store.lock().device_revision();
        let pushed = revision.entities.len() as u64;
        if let Err(e) = self.remote.push_revisions(revision.clone()).await {
            if e.is_synchronization_conflict() {
                self.stats.write().rejected_pushes += 1;
            }
            return Err(e);
        }
        self.store.lock().acknowledge_push(&revision);

        Ok(SyncCycleResult {
            pulled: pulled_count,
            pushed,
            resolved,
            duration: start.elapsed(),
        })
    }

    fn handle_error(&self, error: &SyncError) {
        warn!(remote = %self.remote.name(), %error, "sync cycle failed");
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}
