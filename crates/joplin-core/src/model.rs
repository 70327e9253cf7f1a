use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TreeError;

/// Identifier of a remote folder or note (32 hex chars in Joplin)
pub type EntityId = String;

/// Root container id, also the parent id of top-level folders
pub const ROOT_ID: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Folder,
    Note,
}

/// Notebook as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: EntityId,
    #[serde(default)]
    pub parent_id: EntityId,
    #[serde(default)]
    pub title: String,
}

/// Note or todo as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: EntityId,
    #[serde(default)]
    pub parent_id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_todo: bool,
    #[serde(default)]
    pub body: String,
}

/// Unified tree element
///
/// `children == None` is the lazy-load sentinel: the folder was never fetched.
/// `Some(vec![])` means fetched and confirmed empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub parent_id: EntityId,
    pub title: String,
    pub kind: NodeKind,
    pub is_todo: bool,
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// Synthetic top-level container, renders no line of its own
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            parent_id: ROOT_ID.to_string(),
            title: String::new(),
            kind: NodeKind::Folder,
            is_todo: false,
            children: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Whether the contents of this node were ever fetched
    pub fn is_fetched(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Shape validation, a note must stay a leaf
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.kind == NodeKind::Note && !self.children().is_empty() {
            return Err(TreeError::ConsistencyViolation(format!(
                "note {} has {} children",
                self.id,
                self.children().len()
            )));
        }
        self.children().iter().try_for_each(Node::validate)
    }

    pub fn annotation(&self) -> Annotation {
        Annotation {
            id: self.id.clone(),
            kind: self.kind,
        }
    }
}

impl From<Folder> for Node {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            parent_id: folder.parent_id,
            title: folder.title,
            kind: NodeKind::Folder,
            is_todo: false,
            children: None,
        }
    }
}

impl From<Note> for Node {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            parent_id: note.parent_id,
            title: note.title,
            kind: NodeKind::Note,
            is_todo: note.is_todo,
            children: None,
        }
    }
}

/// Per-line entity binding painted next to a rendered line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: EntityId,
    pub kind: NodeKind,
}

/// Input of `RemoteClient::create_note`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub parent_id: EntityId,
    pub is_todo: bool,
    pub body: String,
}

impl NoteDraft {
    /// A new note starts with its title as a markdown heading
    pub fn new(title: impl Into<String>, parent_id: impl Into<String>, is_todo: bool) -> Self {
        let title = title.into();
        Self {
            body: format!("# {}", title),
            title,
            parent_id: parent_id.into(),
            is_todo,
        }
    }
}

/// Input of `RemoteClient::update_note`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub id: EntityId,
    pub title: String,
    pub body: String,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Opaque handle to an editor buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferRef(pub String);

/// Joplin sends booleans as `0`/`1`
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
