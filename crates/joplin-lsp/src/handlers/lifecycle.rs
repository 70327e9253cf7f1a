use std::sync::Arc;

use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::Client;

use crate::config::LspSettings;
use crate::conversion::config_error_to_rpc;
use crate::protocol::COMMANDS;
use crate::state::{GlobalState, NotebookSession};

/// Handle "initialize" request
///
/// The server always starts; without a usable token it simply has no session
/// and every joplin command is refused.
pub async fn handle_initialize(
    client: &Client,
    state: &GlobalState,
    params: InitializeParams,
) -> Result<InitializeResult> {
    let settings = LspSettings::from_options(params.initialization_options)
        .map_err(|e| Error::invalid_params(format!("Invalid initializationOptions: {}", e)))?;
    let config = settings.resolve().map_err(config_error_to_rpc)?;

    match config.token() {
        None => {
            client
                .show_message(MessageType::WARNING, "joplin needs a token")
                .await;
        }
        Some(token) => {
            client
                .log_message(
                    MessageType::INFO,
                    format!("Connecting to Joplin at {}", config.api.base_url),
                )
                .await;

            let remote = state.connector.connect(&config.api, token);
            match remote.ping().await {
                Ok(true) => {
                    let session = NotebookSession::new(remote, config);
                    client
                        .log_message(
                            MessageType::INFO,
                            format!("✅ Joplin session ready ({})", session.title()),
                        )
                        .await;
                    *state.session.write().await = Some(Arc::new(session));
                }
                Ok(false) => {
                    client
                        .show_message(MessageType::ERROR, "no valid joplin app token")
                        .await;
                }
                Err(e) => {
                    log::warn!("Ping failed: {}", e);
                    client
                        .show_message(
                            MessageType::ERROR,
                            format!("no valid joplin app token ({})", e),
                        )
                        .await;
                }
            }
        }
    }

    Ok(InitializeResult {
        capabilities: ServerCapabilities {
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
                work_done_progress_options: Default::default(),
            }),
            ..Default::default()
        },
        server_info: Some(ServerInfo {
            name: "joplin-explorer".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    })
}
