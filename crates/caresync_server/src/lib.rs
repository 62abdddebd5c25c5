//! # caresync server
//!
//! Reference sync server for caresync.
//!
//! This crate provides:
//! - An append-only revision log stamped with knowledge vectors
//! - Push admission under a configurable [`PushPolicy`]
//! - Request handlers for the pull and push endpoints
//!
//! # Architecture
//!
//! The server keeps no per-device state. Every revision is stored exactly
//! as pushed, tagged with the knowledge the pushing device declared, and a
//! pulling device receives every revision its own knowledge does not
//! dominate. Entity payloads are opaque bytes.
//!
//! # Protocol
//!
//! Devices synchronize pull-then-push:
//! 1. The device pulls with its knowledge and merges what it receives
//! 2. The device resolves conflicts locally
//! 3. The device pushes its local changes with its updated knowledge
//! 4. The server rejects the push if the device must pull first

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod revision_log;
mod server;

pub use config::{PushPolicy, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use revision_log::{LoggedRevision, RevisionLog};
pub use server::SyncServer;
