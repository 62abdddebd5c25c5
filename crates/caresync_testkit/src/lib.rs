//! # caresync testkit
//!
//! Test utilities for caresync.
//!
//! This crate provides:
//! - Fixtures, including the seeded "nausea" revision and entity builders
//! - Property-based test generators using proptest
//! - Fuzz harnesses for the wire decoders and the server endpoints
//! - Stress utilities for concurrent uploads
//!
//! ## Usage
//!
//! ```rust
//! use caresync_testkit::prelude::*;
//! use caresync_server::ServerConfig;
//!
//! let server = seeded_server(ServerConfig::default());
//! assert_eq!(server.revision_count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use stress::*;
