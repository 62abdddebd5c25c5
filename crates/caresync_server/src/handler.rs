//! Request handlers for sync endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::revision_log::RevisionLog;
use caresync_protocol::{
    PullRequest, PullResponse, PushRequest, PushResponse, PULL_PATH, PUSH_PATH,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Revision log (shared across all handlers).
    pub log: Arc<RevisionLog>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, log: Arc<RevisionLog>) -> Self {
        Self { config, log }
    }
}

/// Handler for sync requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        let (knowledge, payloads) = self.context.log.updates(&request.knowledge);
        Ok(PullResponse::new(knowledge, payloads))
    }

    /// Handles a push request.
    ///
    /// A push the log refuses is answered with a rejected response rather
    /// than an error, so the device learns the server knowledge either way.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        let size = request.payload.as_ref().map_or(0, |p| p.len());
        if size > self.context.config.max_payload_bytes {
            return Err(ServerError::InvalidRequest(format!(
                "Payload too large: {} > {}",
                size, self.context.config.max_payload_bytes
            )));
        }

        match self.context.log.upload(request.payload, &request.knowledge) {
            Ok(knowledge) => {
                info!(bytes = size, %knowledge, "push accepted");
                Ok(PushResponse::accepted(knowledge))
            }
            Err(err @ ServerError::SynchronizationConflict { .. }) => {
                Ok(PushResponse::rejected(self.context.log.knowledge(), err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Handles an encoded request posted to `path`, returning the encoded
    /// response.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> ServerResult<Vec<u8>> {
        debug!(path, bytes = body.len(), "handling request");
        match path {
            PULL_PATH => {
                let request = PullRequest::decode(body)?;
                Ok(self.handle_pull(request)?.encode()?)
            }
            PUSH_PATH => {
                let request = PushRequest::decode(body)?;
                Ok(self.handle_push(request)?.encode()?)
            }
            other => Err(ServerError::InvalidRequest(format!("Unknown path: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PushPolicy;
    use caresync_protocol::{Bytes, KnowledgeVector, ProcessId};

    fn handler(config: ServerConfig) -> RequestHandler {
        let log = Arc::new(RevisionLog::new(config.push_policy));
        RequestHandler::new(Arc::new(HandlerContext::new(config, log)))
    }

    fn kv(process: ProcessId, clock: u64) -> KnowledgeVector {
        [(process, clock)].into_iter().collect()
    }

    #[test]
    fn push_then_pull() {
        let handler = handler(ServerConfig::default());
        let a = ProcessId::generate();

        let push = PushRequest::new(kv(a, 1), Some(Bytes::from_static(b"[]")));
        let response = handler.handle_push(push).unwrap();
        assert!(response.accepted);
        assert_eq!(response.knowledge, kv(a, 1));

        let pull = handler
            .handle_pull(PullRequest::new(KnowledgeVector::new()))
            .unwrap();
        assert_eq!(pull.payloads.len(), 1);
        assert_eq!(pull.knowledge, kv(a, 1));
    }

    #[test]
    fn rejected_push_reports_server_knowledge() {
        let handler = handler(ServerConfig::default());
        let a = ProcessId::generate();
        handler
            .handle_push(PushRequest::new(kv(a, 3), Some(Bytes::from_static(b"[]"))))
            .unwrap();

        let response = handler
            .handle_push(PushRequest::new(kv(a, 2), None))
            .unwrap();
        assert!(!response.accepted);
        assert_eq!(response.knowledge, kv(a, 3));
        assert!(response.error.unwrap().contains("pull first"));
    }

    #[test]
    fn oversized_payload_is_invalid() {
        let handler = handler(
            ServerConfig::new()
                .with_max_payload_bytes(4)
                .with_push_policy(PushPolicy::RejectSubsumed),
        );
        let push = PushRequest::new(
            kv(ProcessId::generate(), 1),
            Some(Bytes::from_static(b"too long")),
        );
        let err = handler.handle_push(push).unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[test]
    fn post_dispatches_by_path() {
        let handler = handler(ServerConfig::default());
        let a = ProcessId::generate();

        let body = PushRequest::new(kv(a, 1), Some(Bytes::from_static(b"[]")))
            .encode()
            .unwrap();
        let response = PushResponse::decode(&handler.handle_post(PUSH_PATH, &body).unwrap()).unwrap();
        assert!(response.accepted);

        let body = PullRequest::new(KnowledgeVector::new()).encode().unwrap();
        let response = PullResponse::decode(&handler.handle_post(PULL_PATH, &body).unwrap()).unwrap();
        assert_eq!(response.payloads.len(), 1);
    }

    #[test]
    fn post_rejects_unknown_path_and_garbage() {
        let handler = handler(ServerConfig::default());
        assert!(matches!(
            handler.handle_post("/sync/handshake", &[]),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(
            handler.handle_post(PULL_PATH, &[0xff, 0x00]),
            Err(ServerError::Decode(_))
        ));
    }
}
