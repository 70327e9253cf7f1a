use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::editor::EditorSurface;
use crate::error::{RemoteError, TreeError};
use crate::model::{BufferRef, Folder, Node, Note, ROOT_ID};
use crate::remote::RemoteClient;
use crate::render::{render, RenderedTree};
use crate::store::TreeStore;

#[cfg(test)]
mod tests;

/// What a trigger did to the explorer buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Remote data was fetched, the tree mutated and repainted
    Rendered(RenderedTree),
    /// Repainted from the in-memory tree without any remote call
    CacheHit(RenderedTree),
    /// Nothing to do (stale line, leaf, already at top)
    Ignored,
}

impl SyncOutcome {
    pub fn rendered(&self) -> Option<&RenderedTree> {
        match self {
            SyncOutcome::Rendered(tree) | SyncOutcome::CacheHit(tree) => Some(tree),
            SyncOutcome::Ignored => None,
        }
    }
}

/// Session-scoped notebook explorer
///
/// Owns the tree of one explorer buffer and drives it from three triggers:
/// open, expand and collapse (plus focus, which re-roots downwards).
/// Remote calls happen without holding the tree lock; every mutation takes
/// the write guard for exactly one `attach_children` or `replace_root`.
pub struct TreeSync {
    remote: Arc<dyn RemoteClient>,
    buffer: BufferRef,
    store: RwLock<TreeStore>,
    /// Flat copy of the last full folder listing
    catalogue: RwLock<Vec<Folder>>,
    fetches: FetchLocks,
    reroot: Mutex<()>,
}

impl TreeSync {
    pub fn new(remote: Arc<dyn RemoteClient>, buffer: BufferRef) -> Self {
        Self {
            remote,
            buffer,
            store: RwLock::new(TreeStore::new()),
            catalogue: RwLock::new(Vec::new()),
            fetches: FetchLocks::default(),
            reroot: Mutex::new(()),
        }
    }

    pub fn buffer(&self) -> &BufferRef {
        &self.buffer
    }

    pub async fn is_initialized(&self) -> bool {
        self.store.read().await.is_initialized()
    }

    /// Id of the node the view is currently rooted on
    pub async fn root_id(&self) -> Result<String, TreeError> {
        let store = self.store.read().await;
        Ok(store.root()?.id.clone())
    }

    /// Current rendering, without painting it
    pub async fn snapshot(&self) -> Result<RenderedTree, TreeError> {
        let store = self.store.read().await;
        let root = store.root().map_err(report)?;
        Ok(render(root))
    }

    /// Show the notebook tree, fetching the folder listing on first use
    ///
    /// Once initialized the in-memory snapshot is shown as is, later remote
    /// changes only appear after a collapse or a new session.
    pub async fn open_root(&self, surface: &dyn EditorSurface) -> Result<SyncOutcome, TreeError> {
        let _fetch = self.fetches.acquire(ROOT_ID).await;

        if self.is_initialized().await {
            log::debug!("openRoot: showing cached notebook tree");
            return self.repaint(surface, SyncOutcome::CacheHit).await;
        }

        let folders = self
            .remote
            .list_folders()
            .await
            .map_err(|err| remote_failed("openRoot", err))?;
        log::info!("openRoot: {} folders listed", folders.len());

        let top = top_level(&folders);
        *self.catalogue.write().await = folders;
        self.store.write().await.initialize(top).map_err(report)?;

        self.repaint(surface, SyncOutcome::Rendered).await
    }

    /// Expand the folder shown at the cursor
    pub async fn expand_at_cursor(
        &self,
        surface: &dyn EditorSurface,
    ) -> Result<SyncOutcome, TreeError> {
        match surface.current_line_number() {
            Some(line) => self.expand(line, surface).await,
            None => {
                log::debug!("expand: cursor is outside the explorer buffer");
                Ok(SyncOutcome::Ignored)
            }
        }
    }

    /// Load the notes of the folder shown on 1-based `line`
    pub async fn expand(
        &self,
        line: usize,
        surface: &dyn EditorSurface,
    ) -> Result<SyncOutcome, TreeError> {
        let folder_id = match self.folder_at_line(line, "expand").await? {
            Some(id) => id,
            None => return Ok(SyncOutcome::Ignored),
        };

        // Concurrent expands of one folder queue here, the later ones find it fetched
        let _fetch = self.fetches.acquire(&folder_id).await;

        match self.fetch_state(&folder_id).await? {
            FetchState::Missing => {
                log::info!("expand: {:?} vanished before its fetch started", folder_id);
                return Ok(SyncOutcome::Ignored);
            }
            FetchState::Fetched => {
                log::debug!("expand: {:?} already fetched", folder_id);
                return self.repaint(surface, SyncOutcome::CacheHit).await;
            }
            FetchState::Pending => {}
        }

        let notes = self
            .remote
            .list_notes_by_folder(&folder_id)
            .await
            .map_err(|err| remote_failed("expand", err))?;
        log::debug!("expand: {} notes in {:?}", notes.len(), folder_id);

        let children = self.contents_of(&folder_id, notes).await;
        {
            let mut store = self.store.write().await;
            match store.attach_children(&folder_id, children) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    log::info!("expand: {:?} was re-rooted away during fetch", folder_id);
                    return Ok(SyncOutcome::Ignored);
                }
                Err(err) => return Err(report(err)),
            }
        }

        self.repaint(surface, SyncOutcome::Rendered).await
    }

    /// Re-root the view on the parent of the current root
    pub async fn collapse(&self, surface: &dyn EditorSurface) -> Result<SyncOutcome, TreeError> {
        let _reroot = self.reroot.lock().await;

        let previous = {
            let store = self.store.read().await;
            ensure_open(&store, "collapse")?;
            store.root().map_err(report)?.clone()
        };
        if previous.is_root() {
            log::debug!("collapse: already at the top level");
            return Ok(SyncOutcome::Ignored);
        }

        // No parent pointers are kept, the listing is the only way to find the parent
        let folders = self
            .remote
            .list_folders()
            .await
            .map_err(|err| remote_failed("collapse", err))?;

        let listed_parent = folders
            .iter()
            .find(|folder| previous.parent_id != ROOT_ID && folder.id == previous.parent_id);
        let mut parent = match listed_parent {
            Some(folder) => {
                let notes = self
                    .remote
                    .list_notes_by_folder(&folder.id)
                    .await
                    .map_err(|err| remote_failed("collapse", err))?;
                let mut node = Node::from(folder.clone());
                node.children = Some(children_from(&folders, &folder.id, notes));
                node
            }
            None => {
                if previous.parent_id != ROOT_ID {
                    log::warn!(
                        "collapse: parent {:?} of {:?} is not listed, back to the top level",
                        previous.parent_id,
                        previous.id
                    );
                }
                top_level_root(&folders)
            }
        };

        *self.catalogue.write().await = folders;
        let mut store = self.store.write().await;

        // Graft the old root as it is now, expands may have attached below it during the fetch
        let left = store.root().map_err(report)?.clone();
        if let Some(children) = parent.children.as_mut() {
            if let Some(slot) = children.iter_mut().find(|child| child.id == left.id) {
                slot.children = left.children;
            }
        }
        store.replace_root(Some(parent)).map_err(report)?;
        drop(store);

        self.repaint(surface, SyncOutcome::Rendered).await
    }

    /// Re-root the view on the folder shown on 1-based `line`
    pub async fn focus(
        &self,
        line: usize,
        surface: &dyn EditorSurface,
    ) -> Result<SyncOutcome, TreeError> {
        let _reroot = self.reroot.lock().await;

        let folder_id = match self.folder_at_line(line, "focus").await? {
            Some(id) => id,
            None => return Ok(SyncOutcome::Ignored),
        };
        let _fetch = self.fetches.acquire(&folder_id).await;

        let cached = {
            let store = self.store.read().await;
            match store.find_by_id(&folder_id) {
                Ok(node) => node.is_fetched(),
                Err(err) if err.is_not_found() => return Ok(SyncOutcome::Ignored),
                Err(err) => return Err(report(err)),
            }
        };

        let fetched = if cached {
            None
        } else {
            let notes = self
                .remote
                .list_notes_by_folder(&folder_id)
                .await
                .map_err(|err| remote_failed("focus", err))?;
            Some(self.contents_of(&folder_id, notes).await)
        };

        {
            let mut store = self.store.write().await;
            // Take the folder as it is now, expands below it may have landed meanwhile
            let mut node = match store.find_by_id(&folder_id) {
                Ok(node) => node.clone(),
                Err(err) if err.is_not_found() => return Ok(SyncOutcome::Ignored),
                Err(err) => return Err(report(err)),
            };
            if let Some(children) = fetched {
                node.children = Some(children);
            }
            store.replace_root(Some(node)).map_err(report)?;
        }

        self.repaint(surface, SyncOutcome::Rendered).await
    }

    /// Id of the folder on `line`, `None` when the line shows nothing expandable
    async fn folder_at_line(&self, line: usize, op: &str) -> Result<Option<String>, TreeError> {
        let Some(ordinal) = line.checked_sub(1) else {
            log::debug!("{}: line numbers start at 1", op);
            return Ok(None);
        };

        let store = self.store.read().await;
        ensure_open(&store, op)?;
        let node = match store.find_by_ordinal(ordinal) {
            Ok(node) => node,
            Err(err) if err.is_not_found() => {
                log::debug!("{}: {}", op, err);
                return Ok(None);
            }
            Err(err) => return Err(report(err)),
        };

        if !node.is_folder() {
            log::debug!("{}: {:?} is a note", op, node.id);
            return Ok(None);
        }
        Ok(Some(node.id.clone()))
    }

    async fn fetch_state(&self, id: &str) -> Result<FetchState, TreeError> {
        let store = self.store.read().await;
        match store.find_by_id(id) {
            Ok(node) if node.is_fetched() => Ok(FetchState::Fetched),
            Ok(_) => Ok(FetchState::Pending),
            Err(err) if err.is_not_found() => Ok(FetchState::Missing),
            Err(err) => Err(report(err)),
        }
    }

    async fn contents_of(&self, folder_id: &str, notes: Vec<Note>) -> Vec<Node> {
        let catalogue = self.catalogue.read().await;
        children_from(&catalogue, folder_id, notes)
    }

    /// Render and paint while holding the read guard so paints follow mutation order
    async fn repaint(
        &self,
        surface: &dyn EditorSurface,
        outcome: fn(RenderedTree) -> SyncOutcome,
    ) -> Result<SyncOutcome, TreeError> {
        let store = self.store.read().await;
        let rendered = render(store.root().map_err(report)?);
        surface.paint(&self.buffer, &rendered);
        Ok(outcome(rendered))
    }
}

enum FetchState {
    Pending,
    Fetched,
    Missing,
}

/// One lock per node id, held for the whole fetch-and-attach of that node
///
/// Keeps one entry per folder ever fetched.
#[derive(Default)]
struct FetchLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FetchLocks {
    async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Folders directly under the root container
///
/// A folder whose parent is missing from the listing is shown at the top too.
fn top_level(folders: &[Folder]) -> Vec<Folder> {
    folders
        .iter()
        .filter(|folder| {
            folder.parent_id == ROOT_ID || !folders.iter().any(|f| f.id == folder.parent_id)
        })
        .cloned()
        .collect()
}

/// Synthetic root holding the top-level folders of a listing
fn top_level_root(folders: &[Folder]) -> Node {
    let mut root = Node::root();
    root.children = Some(top_level(folders).into_iter().map(Node::from).collect());
    root
}

/// Sub-folders of `folder_id` followed by its notes
fn children_from(folders: &[Folder], folder_id: &str, notes: Vec<Note>) -> Vec<Node> {
    folders
        .iter()
        .filter(|folder| folder.parent_id == folder_id && folder.id != folder_id)
        .cloned()
        .map(Node::from)
        .chain(notes.into_iter().map(Node::from))
        .collect()
}

fn ensure_open(store: &TreeStore, op: &str) -> Result<(), TreeError> {
    if store.is_initialized() {
        Ok(())
    } else {
        Err(TreeError::InvalidState(format!(
            "{}: the notebook explorer is not open",
            op
        )))
    }
}

fn remote_failed(op: &str, err: RemoteError) -> TreeError {
    log::warn!("{}: remote call failed, tree left unchanged: {}", op, err);
    TreeError::Remote(err)
}

fn report(err: TreeError) -> TreeError {
    if let TreeError::ConsistencyViolation(reason) = &err {
        log::error!("notebook tree invariant broken: {}", reason);
    }
    err
}
