//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use caresync_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A sync transport carries requests to one counterpart.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process loopback, mock for testing, etc.).
pub trait SyncTransport: Send + Sync {
    /// Asks the counterpart for everything not dominated by the request
    /// knowledge.
    fn pull(&self, request: &PullRequest) -> impl Future<Output = SyncResult<PullResponse>> + Send;

    /// Offers local changes to the counterpart.
    fn push(&self, request: &PushRequest) -> impl Future<Output = SyncResult<PushResponse>> + Send;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport connection.
    fn close(&self) -> SyncResult<()>;
}

/// A mock transport for testing.
///
/// Serves canned responses, records every request it sees, and can inject
/// a one-shot failure or a fixed delay.
#[derive(Debug)]
pub struct MockTransport {
    connected: AtomicBool,
    pull_response: Mutex<Option<PullResponse>>,
    push_response: Mutex<Option<PushResponse>>,
    failure: Mutex<Option<SyncError>>,
    delay: Mutex<Option<Duration>>,
    pulls: Mutex<Vec<PullRequest>>,
    pushes: Mutex<Vec<PushRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            pull_response: Mutex::new(None),
            push_response: Mutex::new(None),
            failure: Mutex::new(None),
            delay: Mutex::new(None),
            pulls: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
        }
    }

    /// Sets the pull response.
    pub fn set_pull_response(&self, response: PullResponse) {
        *self.pull_response.lock() = Some(response);
    }

    /// Sets the push response.
    pub fn set_push_response(&self, response: PushResponse) {
        *self.push_response.lock() = Some(response);
    }

    /// Makes the next request fail with `error`.
    pub fn fail_next(&self, error: SyncError) {
        *self.failure.lock() = Some(error);
    }

    /// Delays every response by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns every pull request received so far.
    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.pulls.lock().clone()
    }

    /// Returns every push request received so far.
    pub fn push_requests(&self) -> Vec<PushRequest> {
        self.pushes.lock().clone()
    }

    async fn prepare(&self) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::transport_fatal("transport closed"));
        }
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failure.lock().take();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTransport for MockTransport {
    async fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        self.pulls.lock().push(request.clone());
        self.prepare().await?;
        let response = self.pull_response.lock().clone();
        response.ok_or_else(|| SyncError::transport_fatal("no mock pull response set"))
    }

    async fn push(&self, request: &PushRequest) -> SyncResult<PushResponse> {
        self.pushes.lock().push(request.clone());
        self.prepare().await?;
        let response = self.push_response.lock().clone();
        response.ok_or_else(|| SyncError::transport_fatal("no mock push response set"))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
