//! Application state shared across all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::analysis::AnalysisBatcher;
use crate::chat::{CancelFlag, Session, SessionController};
use crate::config::AgentConfig;
use crate::llm::{CompletionClient, OllamaClient};
use crate::scraping::{NewsHarvester, ScrapingError};

/// Shared application state.
pub struct AppState {
    /// Streams replies into the session.
    pub controller: SessionController,
    /// Feeds CSV chunks through the controller.
    pub batcher: AnalysisBatcher,
    /// Scrapes the news listing.
    pub harvester: NewsHarvester,
    /// The one conversation; held for the whole of a generation.
    pub session: Mutex<Session>,
    /// Stop flag of `session`, reachable while the session is locked.
    pub cancel: CancelFlag,
    /// Export of the last successful harvest.
    pub latest_csv: RwLock<Option<Vec<u8>>>,
    /// Model used when a request names none.
    pub default_model: String,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Create state backed by the configured Ollama server.
    ///
    /// # Errors
    /// Returns an error if the Ollama client or harvester cannot be created.
    pub fn new(config: &AgentConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let ollama = OllamaClient::new(config.ollama_url.as_str())
            .map_err(|e| format!("Failed to create Ollama client: {e}"))?
            .with_request_timeout(config.request_timeout)
            .with_execution_mode(config.execution_mode);

        Ok(Self::with_client(Arc::new(ollama), config)?)
    }

    /// Create state on top of any completion client.
    ///
    /// # Errors
    /// Returns an error if the harvester cannot be created.
    pub fn with_client(
        client: Arc<dyn CompletionClient>,
        config: &AgentConfig,
    ) -> Result<Arc<Self>, ScrapingError> {
        let controller = SessionController::new(client);
        let batcher = AnalysisBatcher::new(controller.clone(), config.batch);
        let harvester = NewsHarvester::new(config.harvest.clone())?;
        let session = Session::new();
        let cancel = session.cancel_flag();

        Ok(Arc::new(Self {
            controller,
            batcher,
            harvester,
            session: Mutex::new(session),
            cancel,
            latest_csv: RwLock::new(None),
            default_model: config.default_model.clone(),
            static_dir: config.static_dir.clone(),
        }))
    }
}
