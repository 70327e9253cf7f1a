mod lifecycle;
mod notebook;
mod notes;

pub use lifecycle::*;
pub use notebook::*;
pub use notes::*;

use std::sync::Arc;

use tower_lsp::jsonrpc::{Error, ErrorCode, Result};
use tower_lsp::lsp_types::{ExecuteCommandParams, MessageType};
use tower_lsp::Client;

use crate::state::{GlobalState, NotebookSession};

/// Session of the server, or an error once the client has been told why there is none
pub(crate) async fn require_session(
    client: &Client,
    state: &GlobalState,
    command: &str,
) -> Result<Arc<NotebookSession>> {
    match state.session().await {
        Some(session) => Ok(session),
        None => {
            client
                .log_message(
                    MessageType::WARNING,
                    format!("⚠️ No Joplin session for {}", command),
                )
                .await;
            Err(Error {
                code: ErrorCode::InternalError,
                message: "Joplin session not initialized".into(),
                data: None,
            })
        }
    }
}

/// Required string argument at `index`
pub(crate) fn string_arg(params: &ExecuteCommandParams, index: usize, name: &str) -> Result<String> {
    let value = params
        .arguments
        .get(index)
        .ok_or_else(|| Error::invalid_params(format!("Missing argument: {}", name)))?;

    serde_json::from_value(value.clone())
        .map_err(|_| Error::invalid_params(format!("Invalid {}", name)))
}

/// Optional string argument at `index`, null counts as absent
pub(crate) fn optional_string_arg(
    params: &ExecuteCommandParams,
    index: usize,
    name: &str,
) -> Result<Option<String>> {
    match params.arguments.get(index) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => string_arg(params, index, name).map(Some),
    }
}

/// 1-based buffer line argument, accepted as a number or a numeric string
pub(crate) fn line_arg(params: &ExecuteCommandParams) -> Result<usize> {
    let value = params
        .arguments
        .first()
        .ok_or_else(|| Error::invalid_params("Missing argument: line"))?;

    let line = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    line.and_then(|line| usize::try_from(line).ok())
        .ok_or_else(|| Error::invalid_params("Invalid line"))
}

pub(crate) fn to_value<T: serde::Serialize>(value: &T) -> Result<Option<serde_json::Value>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| Error {
            code: ErrorCode::InternalError,
            message: format!("Failed to encode result: {}", e).into(),
            data: None,
        })
}
