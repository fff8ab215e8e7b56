use std::sync::Arc;

use domains::{AttachmentStore, CredentialGate, Renderer};
use services::BoardService;
use storage_adapters::UrlSigner;

use crate::metrics::BoardMetrics;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<BoardService>,
    pub renderer: Arc<dyn Renderer>,
    pub gate: Arc<dyn CredentialGate>,
    pub metrics: Arc<BoardMetrics>,
    /// Set when attachments are served by the board itself (memory and
    /// local stores). `None` for S3, whose URLs point at the bucket.
    pub media: Option<LocalMedia>,
}

#[derive(Clone)]
pub struct LocalMedia {
    pub signer: Arc<UrlSigner>,
    pub store: Arc<dyn AttachmentStore>,
}
