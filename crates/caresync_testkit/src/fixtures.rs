//! Test fixtures and entity builders.
//!
//! The seeded revision holds one task (`nausea`) and five versions of a
//! single outcome, each version appending one value to its predecessor.

use caresync_protocol::{Entity, Outcome, OutcomeValue, RevisionRecord, Task, Timestamp, Uuid};
use caresync_server::{ServerConfig, SyncServer};
use tracing_subscriber::EnvFilter;

/// The seeded revision in its JSON wire form.
pub const NAUSEA_REVISION_JSON: &str = include_str!("../fixtures/nausea_revision.json");

/// UUID of the seeded task.
pub const NAUSEA_TASK_UUID: Uuid = Uuid::from_u128(0x0838965B_FCAB_44A8_A6D8_418E9F02BC4C);

/// UUIDs of the seeded outcome versions, oldest first.
pub const NAUSEA_OUTCOME_CHAIN: [Uuid; 5] = [
    Uuid::from_u128(0x59B7CE13_C381_4300_A9B7_A8FB51325FF4),
    Uuid::from_u128(0xA06AC993_2A91_444A_8D36_2303BF7879AD),
    Uuid::from_u128(0xE7B89B33_499C_4650_B4AE_CA647BD03602),
    Uuid::from_u128(0x5830D963_B790_431C_AF76_78A90D5CC793),
    Uuid::from_u128(0xE772CCD1_994F_440E_BDE2_F1103D1CD622),
];

/// Occurrence index shared by every seeded outcome version.
pub const NAUSEA_OCCURRENCE: u64 = 4;

/// Decodes the seeded revision.
pub fn nausea_revision() -> RevisionRecord {
    RevisionRecord::from_json_slice(NAUSEA_REVISION_JSON.as_bytes())
        .expect("Seeded revision must decode")
}

/// Creates a server preloaded with the seeded revision.
pub fn seeded_server(config: ServerConfig) -> SyncServer {
    SyncServer::seeded(config, &nausea_revision()).expect("Failed to seed server")
}

/// Creates a first task version.
pub fn task(id: &str, now: Timestamp) -> Entity {
    Task::new(id, id, now).into()
}

/// Creates a new version of `base` with one more value, whose logical
/// creation date is `created`.
pub fn outcome_edit(base: &Outcome, value: bool, created: Timestamp) -> Outcome {
    let mut edit = base.appending(OutcomeValue::boolean(value, created), created);
    edit.header.created_date = created;
    edit
}

/// Installs a `tracing` subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
