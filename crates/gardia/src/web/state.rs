use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::transmit::Transmitter;
use crate::web::session::SessionStore;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Current configuration; replaced when the admin saves a valid file.
    config: RwLock<Arc<Config>>,

    /// File the admin editor reads and writes.
    config_path: PathBuf,

    /// Outbound link.
    transmitter: Arc<dyn Transmitter>,

    /// Admin sessions.
    sessions: SessionStore,
}

/// State handle passed to every handler.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create the state for a server using `config`, loaded from
    /// `config_path`.
    #[must_use]
    pub fn new(config: Config, config_path: PathBuf, transmitter: Arc<dyn Transmitter>) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            config_path,
            transmitter,
            sessions: SessionStore::new(),
        }
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> Arc<Config> {
        Arc::clone(&*self.config.read().await)
    }

    /// Swap in a new configuration for subsequent requests.
    pub async fn replace_config(&self, config: Config) {
        *self.config.write().await = Arc::new(config);
    }

    /// Path of the configuration file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The outbound link.
    #[must_use]
    pub fn transmitter(&self) -> &dyn Transmitter {
        self.transmitter.as_ref()
    }

    /// Admin sessions.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
