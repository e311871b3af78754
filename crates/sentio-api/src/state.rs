//! Application state shared across route handlers.

use std::sync::Arc;
use std::time::Instant;

use sentio_chat::{ConversationOrchestrator, TextGenerator};
use sentio_core::SentioConfig;
use sentio_storage::{AccountError, AccountRepository, DocumentStore};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Per-user sessions and the chat pipeline.
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub accounts: Arc<AccountRepository>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire the chat pipeline and account repository over one store.
    pub fn new(
        config: &SentioConfig,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, AccountError> {
        let accounts = AccountRepository::new(Arc::clone(&store), &config.accounts)?;
        let orchestrator = ConversationOrchestrator::new(config, generator, store);
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            accounts: Arc::new(accounts),
            start_time: Instant::now(),
        })
    }
}
