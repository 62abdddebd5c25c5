//! Main sync server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use crate::revision_log::RevisionLog;
use caresync_protocol::{
    Bytes, KnowledgeVector, PullRequest, PullResponse, PushRequest, PushResponse, RevisionRecord,
};
use std::sync::Arc;
use tracing::info;

/// The sync server.
///
/// The server is a single append-only revision log shared by every
/// device. It never inspects entity payloads; it only compares knowledge
/// vectors to decide which pushes to admit and which revisions a pulling
/// device is missing.
///
/// # Example
///
/// ```
/// use caresync_server::{ServerConfig, SyncServer};
/// use caresync_protocol::{Bytes, KnowledgeVector, ProcessId};
///
/// let server = SyncServer::new(ServerConfig::default());
/// let device: KnowledgeVector = [(ProcessId::generate(), 1)].into_iter().collect();
///
/// server.upload(Some(Bytes::from_static(b"[]")), &device).unwrap();
/// let (knowledge, payloads) = server.updates(&KnowledgeVector::new());
/// assert_eq!(knowledge, device);
/// assert_eq!(payloads.len(), 1);
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new sync server.
    pub fn new(config: ServerConfig) -> Self {
        let log = Arc::new(RevisionLog::new(config.push_policy));
        Self::with_log(config, log)
    }

    /// Creates a sync server over an existing revision log.
    pub fn with_log(config: ServerConfig, log: Arc<RevisionLog>) -> Self {
        let context = Arc::new(HandlerContext::new(config, log));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Creates a sync server preloaded with one revision.
    ///
    /// The revision's entities become the first log entry, stamped with its
    /// knowledge vector.
    pub fn seeded(config: ServerConfig, revision: &RevisionRecord) -> ServerResult<Self> {
        let server = Self::new(config);
        server.seed(revision)?;
        Ok(server)
    }

    /// Appends a revision without validation.
    pub fn seed(&self, revision: &RevisionRecord) -> ServerResult<()> {
        let payload = caresync_protocol::encode_entities(&revision.entities)?;
        info!(
            entities = revision.entities.len(),
            stamp = %revision.knowledge_vector,
            "seeding server"
        );
        self.context
            .log
            .seed(revision.knowledge_vector.clone(), Bytes::from(payload));
        Ok(())
    }

    /// Accepts a push. See [`RevisionLog::upload`].
    pub fn upload(
        &self,
        payload: Option<Bytes>,
        device: &KnowledgeVector,
    ) -> ServerResult<KnowledgeVector> {
        self.context.log.upload(payload, device)
    }

    /// Returns what `device` is missing. See [`RevisionLog::updates`].
    pub fn updates(&self, device: &KnowledgeVector) -> (KnowledgeVector, Vec<Bytes>) {
        self.context.log.updates(device)
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        self.handler.handle_pull(request)
    }

    /// Handles a push request.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        self.handler.handle_push(request)
    }

    /// Handles an encoded request posted to `path`.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> ServerResult<Vec<u8>> {
        self.handler.handle_post(path, body)
    }

    /// Returns the aggregate server knowledge.
    pub fn knowledge(&self) -> KnowledgeVector {
        self.context.log.knowledge()
    }

    /// Returns the stamp of the last accepted revision.
    pub fn latest_stamp(&self) -> KnowledgeVector {
        self.context.log.latest_stamp()
    }

    /// Returns the number of logged revisions.
    pub fn revision_count(&self) -> usize {
        self.context.log.len()
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }
}
