//! HTTP transport implementation.
//!
//! This module provides an HTTP-style transport for remotes. The actual
//! HTTP client is abstracted via a trait to allow different implementations
//! (reqwest, hyper, an in-process server, etc.).

use crate::config::TransportConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use caresync_protocol::{
    from_cbor, to_cbor, PullRequest, PullResponse, PushRequest, PushResponse, PULL_PATH,
    PUSH_PATH,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual byte transport.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    ///
    /// Failures on the wire are [`SyncError::Transport`]. A request the
    /// counterpart refuses outright is [`SyncError::InvalidRequest`], which
    /// is never retried.
    fn post(&self, url: &str, body: Vec<u8>) -> impl Future<Output = SyncResult<Vec<u8>>> + Send;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based sync transport.
///
/// Uses CBOR encoding for request/response bodies.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the sync server (e.g., "https://sync.example.com").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    config: TransportConfig,
    /// Connection state.
    connected: AtomicBool,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport with the default configuration.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self::with_config(base_url, client, TransportConfig::default())
    }

    /// Creates a new HTTP transport.
    pub fn with_config(base_url: impl Into<String>, client: C, config: TransportConfig) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            config,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    async fn post_cbor<Req, Res>(&self, endpoint: &str, request: &Req) -> SyncResult<Res>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        if !self.is_connected() {
            return Err(SyncError::transport_fatal("transport closed"));
        }

        let body = to_cbor(request)?;
        let url = format!("{}{}", self.base_url, endpoint);

        let response_body =
            match tokio::time::timeout(self.config.timeout, self.client.post(&url, body)).await {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => {
                    warn!(%url, error = %e, retryable = e.is_retryable(), "request failed");
                    self.set_error(&e.to_string());
                    return Err(e);
                }
                Err(_) => {
                    let message = format!("request to {url} timed out after {:?}", self.config.timeout);
                    warn!(%url, "request timed out");
                    self.set_error(&message);
                    return Err(SyncError::transport_retryable(message));
                }
            };

        self.clear_error();
        Ok(from_cbor(&response_body)?)
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    async fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        self.post_cbor(PULL_PATH, request).await
    }

    async fn push(&self, request: &PushRequest) -> SyncResult<PushResponse> {
        self.post_cbor(PUSH_PATH, request).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// A loopback HTTP client that routes requests directly to a sync server.
///
/// Requests must address `base_url`; the remainder of the URL is handed to
/// the server as the path. Useful for testing without actual network
/// overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    base_url: String,
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client serving `base_url` from the given server.
    pub fn new(base_url: impl Into<String>, server: S) -> Self {
        Self {
            base_url: base_url.into(),
            server,
        }
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles a POST request and returns the response.
    fn handle_post(&self, path: &str, body: &[u8]) -> SyncResult<Vec<u8>>;
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    async fn post(&self, url: &str, body: Vec<u8>) -> SyncResult<Vec<u8>> {
        let path = url.strip_prefix(self.base_url.as_str()).ok_or_else(|| {
            SyncError::transport_fatal(format!("{url} is not served by {}", self.base_url))
        })?;
        self.server.handle_post(path, &body)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
