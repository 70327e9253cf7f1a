use joplin_core::Annotation;
use serde::{Deserialize, Serialize};

pub const OPEN_NOTEBOOK: &str = "joplin/openNotebook";
pub const EXPAND: &str = "joplin/expand";
pub const COLLAPSE: &str = "joplin/collapse";
pub const FOCUS: &str = "joplin/focus";
pub const OPEN_NOTE: &str = "joplin/openNote";
pub const NEW_NOTE: &str = "joplin/newNote";
pub const NEW_TODO: &str = "joplin/newTodo";
pub const SAVE_NOTE: &str = "joplin/saveNote";
pub const LIST_NOTES: &str = "joplin/listNotes";

pub const COMMANDS: &[&str] = &[
    OPEN_NOTEBOOK,
    EXPAND,
    COLLAPSE,
    FOCUS,
    OPEN_NOTE,
    NEW_NOTE,
    NEW_TODO,
    SAVE_NOTE,
    LIST_NOTES,
];

/// Contents of the explorer buffer after a notebook command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookView {
    /// Buffer name
    pub title: String,
    pub lines: Vec<String>,
    /// One entry per line
    pub annotations: Vec<Annotation>,
    /// False when the command left the buffer as it was
    pub changed: bool,
    /// Virtual text per line, only filled in debug mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

/// A note opened into its own buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDocument {
    pub id: String,
    pub title: String,
    pub body: String,
    pub parent_id: String,
    pub is_todo: bool,
    /// Editor command that opens the buffer
    pub opener: String,
    pub filetype: String,
}

/// Entry of the flat note list (quickfix style)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
}
