use std::sync::Arc;

use joplin_core::{BufferRef, ClientConfig, RemoteClient, TreeSync};
use tokio::sync::RwLock;

use crate::remote::Connector;

/// One authenticated connection to the Joplin service
pub struct NotebookSession {
    pub remote: Arc<dyn RemoteClient>,
    /// Tree of the explorer buffer
    pub explorer: TreeSync,
    pub config: ClientConfig,
}

impl NotebookSession {
    pub fn new(remote: Arc<dyn RemoteClient>, config: ClientConfig) -> Self {
        let buffer = BufferRef(config.explorer.title.clone());
        Self {
            explorer: TreeSync::new(remote.clone(), buffer),
            remote,
            config,
        }
    }

    pub fn title(&self) -> &str {
        &self.explorer.buffer().0
    }

    pub fn debug(&self) -> bool {
        self.config.explorer.debug
    }
}

/// Global state for LSP server
/// Must be Send + Sync
#[derive(Clone)]
pub struct GlobalState {
    /// Set by `initialize` once the token has been accepted
    pub session: Arc<RwLock<Option<Arc<NotebookSession>>>>,
    pub connector: Arc<dyn Connector>,
}

impl GlobalState {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            connector,
        }
    }

    /// Current session, released from the state lock before any remote call
    pub async fn session(&self) -> Option<Arc<NotebookSession>> {
        self.session.read().await.clone()
    }
}
