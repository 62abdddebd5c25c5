//! Server configuration.

use caresync_protocol::KnowledgeVector;

/// Rule deciding whether a push is admitted, given the stamp of the last
/// accepted revision (`latest`) and the knowledge the device declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushPolicy {
    /// Reject iff `latest ≥ device`: the server has already seen everything
    /// the device claims to know. Incomparable knowledge is admitted.
    #[default]
    RejectSubsumed,
    /// Admit only if `device ≥ latest` and `device ≠ latest`: the device
    /// must already know everything the server recorded.
    RequireDominance,
}

impl PushPolicy {
    /// Returns true if a push declaring `device` may be accepted on top of
    /// `latest`.
    pub fn admits(&self, latest: &KnowledgeVector, device: &KnowledgeVector) -> bool {
        match self {
            PushPolicy::RejectSubsumed => !latest.dominates(device),
            PushPolicy::RequireDominance => device.dominates(latest) && device != latest,
        }
    }

    /// Converts to a code.
    pub fn to_code(&self) -> u8 {
        match self {
            PushPolicy::RejectSubsumed => 1,
            PushPolicy::RequireDominance => 2,
        }
    }

    /// Converts from a code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PushPolicy::RejectSubsumed),
            2 => Some(PushPolicy::RequireDominance),
            _ => None,
        }
    }
}

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Admission rule for pushes.
    pub push_policy: PushPolicy,
    /// Largest accepted push payload, in bytes.
    pub max_payload_bytes: usize,
}

impl ServerConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            push_policy: PushPolicy::default(),
            max_payload_bytes: 16 * 1024 * 1024,
        }
    }

    /// Sets the push admission rule.
    pub fn with_push_policy(mut self, policy: PushPolicy) -> Self {
        self.push_policy = policy;
        self
    }

    /// Sets the maximum push payload size.
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
