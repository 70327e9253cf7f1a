//! Conversion utilities between Core types and LSP types

use joplin_core::{ConfigError, Note, RemoteError, TreeError};
use tower_lsp::jsonrpc::{Error, ErrorCode};

use crate::protocol::{NoteDocument, NoteSummary};

const NOTE_FILETYPE: &str = "markdown";

/// Convert a tree failure into a JSON-RPC error
///
/// Rejected operations are the caller's fault, everything else is ours.
pub fn tree_error_to_rpc(err: TreeError) -> Error {
    let code = match &err {
        TreeError::InvalidState(_) | TreeError::NotFound(_) => ErrorCode::InvalidParams,
        TreeError::Remote(_) | TreeError::ConsistencyViolation(_) => ErrorCode::InternalError,
    };
    Error {
        code,
        message: err.to_string().into(),
        data: None,
    }
}

pub fn remote_error_to_rpc(err: RemoteError) -> Error {
    Error {
        code: ErrorCode::InternalError,
        message: format!("Joplin request failed: {}", err).into(),
        data: None,
    }
}

pub fn config_error_to_rpc(err: ConfigError) -> Error {
    Error {
        code: ErrorCode::InvalidParams,
        message: format!("Invalid client config: {}", err).into(),
        data: None,
    }
}

/// Convert a fetched note into the document the client opens
///
/// A configured opener is used verbatim, otherwise the note opens in a new
/// window named after its title.
pub fn note_to_document(note: Note, opener: Option<&str>) -> NoteDocument {
    let opener = match opener {
        Some(opener) => opener.to_string(),
        None => format!("new {}", note.title),
    };
    NoteDocument {
        opener,
        id: note.id,
        title: note.title,
        body: note.body,
        parent_id: note.parent_id,
        is_todo: note.is_todo,
        filetype: NOTE_FILETYPE.to_string(),
    }
}

pub fn note_to_summary(note: Note) -> NoteSummary {
    NoteSummary {
        id: note.id,
        title: note.title,
    }
}
