//! # caresync remote
//!
//! Client side of caresync synchronization.
//!
//! This crate provides:
//! - [`Remote`], a store's handle on one counterpart (pull, push, conflict
//!   resolution, delegate notifications)
//! - Transport abstraction with HTTP-style, loopback and mock transports
//! - [`RevisionStore`] and the in-memory [`MemoryStore`]
//! - [`SyncEngine`], the pull → resolve → push cycle with retry
//!
//! ## Architecture
//!
//! Synchronization is **pull-then-push**:
//! 1. Pull every revision the store does not know and merge it
//! 2. Resolve each group of conflicting versions by picking one winner
//! 3. Push the store's local changes stamped with its knowledge
//!
//! ## Key Invariants
//!
//! - A pull merges at most one revision and only on success
//! - A refused push changes nothing on either side
//! - At most one pull and one push run per remote at any time
//! - A conflict winner is always one of the competing versions

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod http;
mod remote;
mod store;
mod transport;

pub use config::{RemoteConfig, RetryConfig, SyncConfig, TransportConfig};
pub use engine::{SyncCycleResult, SyncEngine, SyncState, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpTransport, LoopbackClient, LoopbackServer};
pub use remote::{Remote, RemoteDelegate};
pub use store::{MemoryStore, RevisionStore};
pub use transport::{MockTransport, SyncTransport};
