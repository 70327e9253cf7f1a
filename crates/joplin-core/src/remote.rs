use async_trait::async_trait;

use crate::error::RemoteError;
use crate::model::{Folder, Note, NoteDraft, NoteUpdate};

/// Access to the note service
///
/// Implementations drain pagination themselves, a listing is either complete or an error.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Every folder, all levels, flat (each carries its `parent_id`)
    async fn list_folders(&self) -> Result<Vec<Folder>, RemoteError>;

    async fn list_notes_by_folder(&self, folder_id: &str) -> Result<Vec<Note>, RemoteError>;

    /// Every note, without bodies
    async fn list_notes(&self) -> Result<Vec<Note>, RemoteError>;

    async fn get_note(&self, note_id: &str) -> Result<Note, RemoteError>;

    async fn create_note(&self, draft: NoteDraft) -> Result<Note, RemoteError>;

    async fn update_note(&self, update: NoteUpdate) -> Result<Note, RemoteError>;

    /// Whether the service answers with the configured token
    async fn ping(&self) -> Result<bool, RemoteError>;
}
