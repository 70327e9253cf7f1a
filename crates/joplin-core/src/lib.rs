//! Joplin Core Library
//!
//! Notebook tree, renderer and remote synchronization.
//! No HTTP or editor runtime dependencies, the host supplies both.
//!

mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod remote;
pub mod render;
pub mod store;
pub mod sync;

pub use config::{ApiConfig, ClientConfig, ConfigError, ExplorerConfig};
pub use editor::EditorSurface;
pub use error::{RemoteError, TreeError};
pub use model::{Annotation, BufferRef, Folder, Node, NodeKind, Note, NoteDraft, NoteUpdate, Page};
pub use remote::RemoteClient;
pub use render::{render, RenderedTree};
pub use store::TreeStore;
pub use sync::{SyncOutcome, TreeSync};
