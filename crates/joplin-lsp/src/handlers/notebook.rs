use std::sync::Arc;

use joplin_core::{SyncOutcome, TreeError};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{ExecuteCommandParams, MessageType};
use tower_lsp::Client;

use crate::conversion::tree_error_to_rpc;
use crate::handlers::{line_arg, require_session, to_value};
use crate::protocol::{COLLAPSE, EXPAND, FOCUS, OPEN_NOTEBOOK};
use crate::state::{GlobalState, NotebookSession};
use crate::surface::{unchanged_view, ViewSurface};

/// Handle "joplin/openNotebook"
/// Lists the notebooks on first use, later calls show the cached tree
pub async fn handle_open_notebook(
    client: &Client,
    state: &GlobalState,
    _params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    let session = require_session(client, state, OPEN_NOTEBOOK).await?;
    let surface = ViewSurface::new(None, session.debug());

    let outcome = session.explorer.open_root(&surface).await;
    reply(client, &session, surface, outcome, OPEN_NOTEBOOK).await
}

/// Handle "joplin/expand"
/// Arguments: [line]
pub async fn handle_expand(
    client: &Client,
    state: &GlobalState,
    params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    let line = line_arg(&params)?;
    let session = require_session(client, state, EXPAND).await?;
    let surface = ViewSurface::new(Some(line), session.debug());

    let outcome = session.explorer.expand_at_cursor(&surface).await;
    reply(client, &session, surface, outcome, EXPAND).await
}

/// Handle "joplin/collapse"
pub async fn handle_collapse(
    client: &Client,
    state: &GlobalState,
    _params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    let session = require_session(client, state, COLLAPSE).await?;
    let surface = ViewSurface::new(None, session.debug());

    let outcome = session.explorer.collapse(&surface).await;
    reply(client, &session, surface, outcome, COLLAPSE).await
}

/// Handle "joplin/focus"
/// Arguments: [line]
pub async fn handle_focus(
    client: &Client,
    state: &GlobalState,
    params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    let line = line_arg(&params)?;
    let session = require_session(client, state, FOCUS).await?;
    let surface = ViewSurface::new(Some(line), session.debug());

    let outcome = session.explorer.focus(line, &surface).await;
    reply(client, &session, surface, outcome, FOCUS).await
}

/// Turn a trigger outcome into the view sent back to the client
async fn reply(
    client: &Client,
    session: &Arc<NotebookSession>,
    surface: ViewSurface,
    outcome: std::result::Result<SyncOutcome, TreeError>,
    command: &str,
) -> Result<Option<serde_json::Value>> {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            if let TreeError::Remote(remote) = &err {
                client
                    .show_message(
                        MessageType::ERROR,
                        format!("Joplin request failed: {}", remote),
                    )
                    .await;
            }
            client
                .log_message(MessageType::WARNING, format!("{} failed: {}", command, err))
                .await;
            return Err(tree_error_to_rpc(err));
        }
    };

    let debug = session.debug();
    let view = match surface.into_view(session.title()) {
        Some(view) => view,
        None => {
            let rendered = session
                .explorer
                .snapshot()
                .await
                .map_err(tree_error_to_rpc)?;
            unchanged_view(session.title(), rendered, debug)
        }
    };

    let verb = match outcome {
        SyncOutcome::Rendered(_) => "rendered",
        SyncOutcome::CacheHit(_) => "cached",
        SyncOutcome::Ignored => "ignored",
    };
    client
        .log_message(
            MessageType::INFO,
            format!("{}: {} ({} lines)", command, verb, view.lines.len()),
        )
        .await;

    to_value(&view)
}
