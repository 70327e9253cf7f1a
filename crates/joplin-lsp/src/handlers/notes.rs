use joplin_core::{NoteDraft, NoteUpdate, RemoteError};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::{ExecuteCommandParams, MessageType};
use tower_lsp::Client;

use crate::conversion::{note_to_document, note_to_summary, remote_error_to_rpc};
use crate::handlers::{optional_string_arg, require_session, string_arg, to_value};
use crate::protocol::{LIST_NOTES, NEW_NOTE, NEW_TODO, OPEN_NOTE, SAVE_NOTE};
use crate::state::GlobalState;

/// Handle "joplin/openNote"
/// Arguments: [noteId]
pub async fn handle_open_note(
    client: &Client,
    state: &GlobalState,
    params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    let note_id = string_arg(&params, 0, "noteId")?;
    let session = require_session(client, state, OPEN_NOTE).await?;

    let note = match session.remote.get_note(&note_id).await {
        Ok(note) => note,
        Err(e) => return Err(report(client, OPEN_NOTE, e).await),
    };

    let document = note_to_document(note, session.config.explorer.opener.as_deref());
    to_value(&document)
}

/// Handle "joplin/newNote"
/// Arguments: [title, parentId?]
pub async fn handle_new_note(
    client: &Client,
    state: &GlobalState,
    params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    create(client, state, params, false).await
}

/// Handle "joplin/newTodo"
/// Arguments: [title, parentId?]
pub async fn handle_new_todo(
    client: &Client,
    state: &GlobalState,
    params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    create(client, state, params, true).await
}

/// Handle "joplin/saveNote"
/// Arguments: [noteId, title, body]
pub async fn handle_save_note(
    client: &Client,
    state: &GlobalState,
    params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    if params.arguments.len() < 3 {
        return Err(Error::invalid_params(
            "Missing arguments: [noteId, title, body]",
        ));
    }
    let update = NoteUpdate {
        id: string_arg(&params, 0, "noteId")?,
        title: string_arg(&params, 1, "title")?,
        body: string_arg(&params, 2, "body")?,
    };
    let session = require_session(client, state, SAVE_NOTE).await?;

    let note = match session.remote.update_note(update).await {
        Ok(note) => note,
        Err(e) => return Err(report(client, SAVE_NOTE, e).await),
    };

    client
        .log_message(MessageType::INFO, format!("💾 Saved note {:?}", note.title))
        .await;
    let document = note_to_document(note, session.config.explorer.opener.as_deref());
    to_value(&document)
}

/// Handle "joplin/listNotes"
/// Returns every note as a flat list
pub async fn handle_list_notes(
    client: &Client,
    state: &GlobalState,
    _params: ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    let session = require_session(client, state, LIST_NOTES).await?;

    let notes = match session.remote.list_notes().await {
        Ok(notes) => notes,
        Err(e) => return Err(report(client, LIST_NOTES, e).await),
    };

    let summaries: Vec<_> = notes.into_iter().map(note_to_summary).collect();
    to_value(&summaries)
}

async fn create(
    client: &Client,
    state: &GlobalState,
    params: ExecuteCommandParams,
    is_todo: bool,
) -> Result<Option<serde_json::Value>> {
    let command = if is_todo { NEW_TODO } else { NEW_NOTE };

    let title = string_arg(&params, 0, "title")?;
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::invalid_params("Title must not be empty"));
    }
    let parent_id = optional_string_arg(&params, 1, "parentId")?.unwrap_or_default();
    let session = require_session(client, state, command).await?;

    let draft = NoteDraft::new(title, parent_id, is_todo);
    let note = match session.remote.create_note(draft).await {
        Ok(note) => note,
        Err(e) => return Err(report(client, command, e).await),
    };

    client
        .log_message(
            MessageType::INFO,
            format!("📝 Created {} {:?}", if is_todo { "todo" } else { "note" }, note.title),
        )
        .await;
    let document = note_to_document(note, session.config.explorer.opener.as_deref());
    to_value(&document)
}

/// Show a remote failure to the user and turn it into the reply error
async fn report(client: &Client, command: &str, err: RemoteError) -> Error {
    log::warn!("{}: {}", command, err);
    client
        .show_message(MessageType::ERROR, format!("Joplin request failed: {}", err))
        .await;
    remote_error_to_rpc(err)
}
