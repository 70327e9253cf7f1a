//! Joplin Explorer LSP Library
//!
//! LSP protocol layer, turns `joplin/*` commands into notebook tree triggers
//! and Joplin Data API calls.

use std::sync::Arc;

use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LspService};

use crate::remote::{Connector, HttpConnector};
use crate::state::GlobalState;

mod config;
mod conversion;
mod handlers;
pub mod protocol;
pub mod remote;
mod state;
mod surface;


pub use config::LspSettings;

/// LSP backend implementation
pub struct Backend {
    client: Client,
    state: GlobalState,
}

impl Backend {
    pub fn new(client: Client, connector: Arc<dyn Connector>) -> Self {
        Self {
            client,
            state: GlobalState::new(connector),
        }
    }
}

#[tower_lsp::async_trait]
impl tower_lsp::LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handlers::handle_initialize(&self.client, &self.state, params).await
    }

    async fn initialized(&self, _: InitializedParams) {
        eprintln!("✅ Client initialized, ready to accept requests");
    }

    async fn shutdown(&self) -> Result<()> {
        eprintln!("🛑 Shutdown requested");
        Ok(())
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        let client = &self.client;
        let state = &self.state;

        match params.command.as_str() {
            protocol::OPEN_NOTEBOOK => handlers::handle_open_notebook(client, state, params).await,
            protocol::EXPAND => handlers::handle_expand(client, state, params).await,
            protocol::COLLAPSE => handlers::handle_collapse(client, state, params).await,
            protocol::FOCUS => handlers::handle_focus(client, state, params).await,
            protocol::OPEN_NOTE => handlers::handle_open_note(client, state, params).await,
            protocol::NEW_NOTE => handlers::handle_new_note(client, state, params).await,
            protocol::NEW_TODO => handlers::handle_new_todo(client, state, params).await,
            protocol::SAVE_NOTE => handlers::handle_save_note(client, state, params).await,
            protocol::LIST_NOTES => handlers::handle_list_notes(client, state, params).await,
            other => {
                log::debug!("Unknown command {:?}", other);
                Err(Error::method_not_found())
            }
        }
    }
}

/// Create and return LSP service and client socket
pub fn create_lsp_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(|client| Backend::new(client, Arc::new(HttpConnector)))
}
