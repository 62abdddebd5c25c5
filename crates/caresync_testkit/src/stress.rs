//! Stress tests for the synchronization server.
//!
//! These harnesses drive a shared [`SyncServer`] from many threads at once.

use caresync_protocol::{Bytes, KnowledgeVector, ProcessId, Uuid};
use caresync_server::SyncServer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Pushes the server refused before an operation went through.
    pub rejected_attempts: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            rejected_attempts: 0,
            duration,
            ops_per_second,
        }
    }

    /// Records how many pushes were refused along the way.
    #[must_use]
    pub fn with_rejections(mut self, rejected: usize) -> Self {
        self.rejected_attempts = rejected;
        self
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Uploads: {}", self.total_ops);
        println!("Accepted: {}", self.successful_ops);
        println!("Gave up: {}", self.failed_ops);
        println!("Refused attempts: {}", self.rejected_attempts);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} uploads/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent devices, one thread each.
    pub threads: usize,
    /// Number of revisions each device uploads.
    pub uploads_per_thread: usize,
    /// Maximum rejected attempts per revision before giving up.
    pub max_attempts: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            uploads_per_thread: 250,
            max_attempts: 1_000,
        }
    }
}

/// Returns the process id used by stress device `thread`.
pub fn stress_process(thread: usize) -> ProcessId {
    ProcessId::from_uuid(Uuid::from_u128(0x5157_0000 + thread as u128))
}

fn payload(thread: usize, revision: usize) -> Bytes {
    Bytes::from(format!("[\"device {thread} revision {revision}\"]"))
}

/// Uploads from every device without pulling.
///
/// Device `t` stamps its `i`th revision `{t: i}`. Such stamps never
/// dominate each other across devices, so under the default push policy
/// every upload is accepted.
pub fn stress_blind_uploads(server: Arc<SyncServer>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let server = Arc::clone(&server);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let uploads = config.uploads_per_thread;

            thread::spawn(move || {
                let process = stress_process(t);
                let mut knowledge = KnowledgeVector::new();
                for i in 0..uploads {
                    knowledge.increment(process);
                    match server.upload(Some(payload(t, i)), &knowledge) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Uploads from every device, pulling first and retrying on rejection.
///
/// Before each attempt a device absorbs the server knowledge and bumps its
/// own clock, so its stamp dominates everything logged so far unless another
/// device appended in between. A revision that is still rejected after
/// `max_attempts` counts as failed.
pub fn stress_pull_then_push(server: Arc<SyncServer>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let server = Arc::clone(&server);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let rejected = Arc::clone(&rejected);
            let uploads = config.uploads_per_thread;
            let max_attempts = config.max_attempts;

            thread::spawn(move || {
                let process = stress_process(t);
                let mut knowledge = KnowledgeVector::new();
                for i in 0..uploads {
                    let mut accepted = false;
                    for _ in 0..max_attempts {
                        knowledge.merge_with(&server.knowledge());
                        knowledge.increment(process);
                        if server.upload(Some(payload(t, i)), &knowledge).is_ok() {
                            accepted = true;
                            break;
                        }
                        rejected.fetch_add(1, Ordering::Relaxed);
                        thread::yield_now();
                    }
                    if accepted {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
    .with_rejections(rejected.load(Ordering::Relaxed))
}
