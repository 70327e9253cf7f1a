use super::*;
use crate::model::{Annotation, NodeKind, NoteDraft, NoteUpdate};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

#[derive(Default)]
struct FakeRemote {
    folders: StdMutex<Vec<Folder>>,
    notes: StdMutex<HashMap<String, Vec<Note>>>,
    folder_calls: AtomicUsize,
    note_calls: AtomicUsize,
    fail: AtomicBool,
}

impl FakeRemote {
    fn with_folders(folders: &[(&str, &str, &str)]) -> Arc<Self> {
        let remote = Self::default();
        *remote.folders.lock().unwrap() = folders
            .iter()
            .map(|(id, parent_id, title)| Folder {
                id: id.to_string(),
                parent_id: parent_id.to_string(),
                title: title.to_string(),
            })
            .collect();
        Arc::new(remote)
    }

    fn add_note(&self, folder_id: &str, id: &str, title: &str, is_todo: bool) {
        self.notes
            .lock()
            .unwrap()
            .entry(folder_id.to_string())
            .or_default()
            .push(Note {
                id: id.to_string(),
                parent_id: folder_id.to_string(),
                title: title.to_string(),
                is_todo,
                body: format!("# {}", title),
            });
    }

    fn remove_folder(&self, id: &str) {
        self.folders.lock().unwrap().retain(|folder| folder.id != id);
    }

    fn folder_calls(&self) -> usize {
        self.folder_calls.load(Ordering::SeqCst)
    }

    fn note_calls(&self) -> usize {
        self.note_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RemoteError::Http("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn list_folders(&self) -> Result<Vec<Folder>, RemoteError> {
        self.folder_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check()?;
        Ok(self.folders.lock().unwrap().clone())
    }

    async fn list_notes_by_folder(&self, folder_id: &str) -> Result<Vec<Note>, RemoteError> {
        self.note_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check()?;
        Ok(self
            .notes
            .lock()
            .unwrap()
            .get(folder_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_notes(&self) -> Result<Vec<Note>, RemoteError> {
        self.check()?;
        Ok(self.notes.lock().unwrap().values().flatten().cloned().collect())
    }

    async fn get_note(&self, note_id: &str) -> Result<Note, RemoteError> {
        self.check()?;
        self.notes
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|note| note.id == note_id)
            .cloned()
            .ok_or(RemoteError::Status {
                status: 404,
                body: "Not Found".into(),
            })
    }

    async fn create_note(&self, _draft: NoteDraft) -> Result<Note, RemoteError> {
        Err(RemoteError::Http("not scripted".into()))
    }

    async fn update_note(&self, _update: NoteUpdate) -> Result<Note, RemoteError> {
        Err(RemoteError::Http("not scripted".into()))
    }

    async fn ping(&self) -> Result<bool, RemoteError> {
        Ok(true)
    }
}

#[derive(Default)]
struct RecordingSurface {
    lines: StdMutex<Vec<String>>,
    annotations: StdMutex<Vec<(usize, Annotation)>>,
    paints: AtomicUsize,
    cursor: Option<usize>,
}

impl RecordingSurface {
    fn at_line(line: usize) -> Self {
        Self {
            cursor: Some(line),
            ..Default::default()
        }
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn paints(&self) -> usize {
        self.paints.load(Ordering::SeqCst)
    }
}

impl EditorSurface for RecordingSurface {
    fn set_buffer_lines(&self, _buffer: &BufferRef, lines: &[String]) {
        self.paints.fetch_add(1, Ordering::SeqCst);
        *self.lines.lock().unwrap() = lines.to_vec();
    }

    fn set_line_annotation(&self, _buffer: &BufferRef, line: usize, annotation: &Annotation) {
        self.annotations
            .lock()
            .unwrap()
            .push((line, annotation.clone()));
    }

    fn clear_annotations(&self, _buffer: &BufferRef) {
        self.annotations.lock().unwrap().clear();
    }

    fn current_line_number(&self) -> Option<usize> {
        self.cursor
    }
}

fn explorer(remote: &Arc<FakeRemote>) -> TreeSync {
    TreeSync::new(remote.clone(), BufferRef("explorer".into()))
}

fn work_home() -> Arc<FakeRemote> {
    FakeRemote::with_folders(&[("A", "", "Work"), ("B", "", "Home")])
}

/// Painted buffer and bindings match the tree's pre-order walk
async fn assert_consistent(sync: &TreeSync, surface: &RecordingSurface) {
    let store = sync.store.read().await;
    let lines = surface.lines();
    let annotations = surface.annotations.lock().unwrap().clone();

    let nodes: Vec<&Node> = store.iter().map(|(_, _, node)| node).collect();
    assert_eq!(lines.len(), nodes.len());
    assert_eq!(annotations.len(), nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        assert_eq!(annotations[index].0, index);
        assert_eq!(annotations[index].1.id, node.id);
        assert_eq!(annotations[index].1.kind, node.kind);
        assert!(lines[index].ends_with(&format!("+ /{}", node.title)));
    }
    assert!(store.validate().is_ok());
}

#[tokio::test]
async fn test_open_root_renders_top_level_folders() {
    let remote = work_home();
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();

    let outcome = sync.open_root(&surface).await.unwrap();

    let rendered = outcome.rendered().unwrap();
    assert!(matches!(outcome, SyncOutcome::Rendered(_)));
    assert_eq!(rendered.lines, vec!["  + /Work", "  + /Home"]);
    let ids: Vec<&str> = rendered.annotations.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(surface.lines(), vec!["  + /Work", "  + /Home"]);
    assert_eq!(remote.folder_calls(), 1);
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_open_root_twice_reuses_snapshot() {
    let remote = work_home();
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();

    let first = sync.open_root(&surface).await.unwrap();
    // Remote changes are not picked up by a second open
    remote.add_note("A", "n1", "ignored", false);
    let second = sync.open_root(&surface).await.unwrap();

    assert!(matches!(second, SyncOutcome::CacheHit(_)));
    assert_eq!(first.rendered(), second.rendered());
    assert_eq!(remote.folder_calls(), 1);
    assert_eq!(surface.paints(), 2);
}

#[tokio::test]
async fn test_open_root_failure_leaves_tree_uninitialized() {
    let remote = work_home();
    remote.fail.store(true, Ordering::SeqCst);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();

    let result = sync.open_root(&surface).await;
    assert!(matches!(result, Err(TreeError::Remote(_))));
    assert!(!sync.is_initialized().await);
    assert_eq!(surface.paints(), 0);

    remote.fail.store(false, Ordering::SeqCst);
    assert!(sync.open_root(&surface).await.is_ok());
}

#[tokio::test]
async fn test_expand_attaches_notes_under_folder() {
    let remote = work_home();
    remote.add_note("A", "n1", "todo1", true);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();

    let outcome = sync.expand(1, &surface).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Rendered(_)));
    assert_eq!(
        surface.lines(),
        vec!["  + /Work", "    + /todo1", "  + /Home"]
    );
    {
        let store = sync.store.read().await;
        let a = store.find_by_id("A").unwrap();
        assert_eq!(a.children().len(), 1);
        assert_eq!(a.children()[0].id, "n1");
        assert_eq!(a.children()[0].kind, NodeKind::Note);
        assert!(a.children()[0].is_todo);
        assert!(!store.find_by_id("B").unwrap().is_fetched());
    }
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_expand_twice_fetches_once() {
    let remote = work_home();
    remote.add_note("A", "n1", "todo1", true);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();

    let first = sync.expand(1, &surface).await.unwrap();
    let second = sync.expand(1, &surface).await.unwrap();

    assert_eq!(remote.note_calls(), 1);
    assert!(matches!(second, SyncOutcome::CacheHit(_)));
    assert_eq!(first.rendered(), second.rendered());
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_expand_empty_folder_is_cached_too() {
    let remote = work_home();
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();

    sync.expand(2, &surface).await.unwrap();
    sync.expand(2, &surface).await.unwrap();

    assert_eq!(remote.note_calls(), 1);
    let store = sync.store.read().await;
    assert_eq!(store.find_by_id("B").unwrap().children, Some(vec![]));
}

#[tokio::test]
async fn test_expand_on_note_is_ignored() {
    let remote = work_home();
    remote.add_note("A", "n1", "todo1", true);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    sync.expand(1, &surface).await.unwrap();
    let before = sync.snapshot().await.unwrap();
    let version = sync.store.read().await.version();

    let outcome = sync.expand(2, &surface).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Ignored);
    assert_eq!(remote.note_calls(), 1);
    assert_eq!(sync.snapshot().await.unwrap(), before);
    assert_eq!(sync.store.read().await.version(), version);
}

#[tokio::test]
async fn test_expand_out_of_range_is_ignored() {
    let remote = work_home();
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();

    assert_eq!(sync.expand(0, &surface).await.unwrap(), SyncOutcome::Ignored);
    assert_eq!(sync.expand(3, &surface).await.unwrap(), SyncOutcome::Ignored);
    assert_eq!(remote.note_calls(), 0);
}

#[tokio::test]
async fn test_expand_before_open_is_rejected() {
    let remote = work_home();
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();

    let result = sync.expand(1, &surface).await;
    assert!(matches!(result, Err(TreeError::InvalidState(_))));
    assert!(matches!(
        sync.snapshot().await,
        Err(TreeError::ConsistencyViolation(_))
    ));
}

#[tokio::test]
async fn test_expand_failure_leaves_tree_untouched() {
    let remote = work_home();
    remote.add_note("A", "n1", "todo1", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    let before = sync.snapshot().await.unwrap();

    remote.fail.store(true, Ordering::SeqCst);
    let result = sync.expand(1, &surface).await;
    assert!(matches!(result, Err(TreeError::Remote(_))));
    assert_eq!(sync.snapshot().await.unwrap(), before);
    assert!(!sync.store.read().await.find_by_id("A").unwrap().is_fetched());

    remote.fail.store(false, Ordering::SeqCst);
    let outcome = sync.expand(1, &surface).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Rendered(_)));
    assert_eq!(remote.note_calls(), 2);
}

#[tokio::test]
async fn test_concurrent_expands_of_one_folder_fetch_once() {
    let remote = work_home();
    remote.add_note("A", "n1", "todo1", false);
    remote.add_note("A", "n2", "todo2", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();

    let (first, second) = tokio::join!(sync.expand(1, &surface), sync.expand(1, &surface));

    let mut outcomes = [first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|outcome| matches!(outcome, SyncOutcome::CacheHit(_)));
    assert!(matches!(outcomes[0], SyncOutcome::Rendered(_)));
    assert!(matches!(outcomes[1], SyncOutcome::CacheHit(_)));
    assert_eq!(remote.note_calls(), 1);
    assert_eq!(
        sync.store.read().await.find_by_id("A").unwrap().children().len(),
        2
    );
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_expand_lists_sub_folders_before_notes() {
    let remote = FakeRemote::with_folders(&[
        ("A", "", "Work"),
        ("S", "A", "Projects"),
        ("B", "", "Home"),
    ]);
    remote.add_note("A", "n1", "todo1", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();

    sync.open_root(&surface).await.unwrap();
    assert_eq!(surface.lines(), vec!["  + /Work", "  + /Home"]);

    sync.expand(1, &surface).await.unwrap();
    assert_eq!(
        surface.lines(),
        vec!["  + /Work", "    + /Projects", "    + /todo1", "  + /Home"]
    );

    // The sub-folder is itself lazily loaded
    remote.add_note("S", "s1", "deep", false);
    sync.expand(2, &surface).await.unwrap();
    assert_eq!(surface.lines()[2], "      + /deep");
    assert_eq!(remote.note_calls(), 2);
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_expand_at_cursor_uses_surface_line() {
    let remote = work_home();
    remote.add_note("B", "h1", "chores", false);
    let sync = explorer(&remote);
    sync.open_root(&RecordingSurface::default()).await.unwrap();

    let surface = RecordingSurface::at_line(2);
    sync.expand_at_cursor(&surface).await.unwrap();
    assert_eq!(surface.lines()[2], "    + /chores");

    let outside = RecordingSurface::default();
    assert_eq!(
        sync.expand_at_cursor(&outside).await.unwrap(),
        SyncOutcome::Ignored
    );
}

#[tokio::test]
async fn test_collapse_at_top_is_noop() {
    let remote = work_home();
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    let before = sync.snapshot().await.unwrap();
    let paints = surface.paints();

    let outcome = sync.collapse(&surface).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Ignored);
    assert_eq!(sync.snapshot().await.unwrap(), before);
    assert_eq!(remote.folder_calls(), 1);
    assert_eq!(surface.paints(), paints);
}

#[tokio::test]
async fn test_focus_then_collapse_returns_to_top() {
    let remote = work_home();
    remote.add_note("A", "n1", "todo1", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();

    sync.focus(1, &surface).await.unwrap();
    assert_eq!(sync.root_id().await.unwrap(), "A");
    assert_eq!(surface.lines(), vec!["  + /todo1"]);
    assert_consistent(&sync, &surface).await;

    sync.collapse(&surface).await.unwrap();
    assert_eq!(sync.root_id().await.unwrap(), "");
    // Work keeps the notes fetched while focused
    assert_eq!(
        surface.lines(),
        vec!["  + /Work", "    + /todo1", "  + /Home"]
    );
    assert_eq!(remote.note_calls(), 1);
    assert_eq!(remote.folder_calls(), 2);
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_collapse_from_sub_folder_refetches_parent() {
    let remote = FakeRemote::with_folders(&[("A", "", "Work"), ("S", "A", "Projects")]);
    remote.add_note("A", "n1", "todo1", false);
    remote.add_note("S", "s1", "deep", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    sync.expand(1, &surface).await.unwrap();
    sync.expand(2, &surface).await.unwrap();

    sync.focus(2, &surface).await.unwrap();
    assert_eq!(sync.root_id().await.unwrap(), "S");
    assert_eq!(surface.lines(), vec!["  + /deep"]);
    assert_eq!(remote.note_calls(), 2);

    remote.add_note("A", "n2", "added later", false);
    let outcome = sync.collapse(&surface).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Rendered(_)));
    assert_eq!(sync.root_id().await.unwrap(), "A");
    assert_eq!(remote.note_calls(), 3);
    assert_eq!(
        surface.lines(),
        vec!["  + /Projects", "    + /deep", "  + /todo1", "  + /added later"]
    );
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_collapse_with_missing_parent_goes_to_top() {
    let remote = FakeRemote::with_folders(&[("A", "", "Work"), ("S", "A", "Projects")]);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    sync.expand(1, &surface).await.unwrap();
    sync.focus(1, &surface).await.unwrap();
    sync.focus(1, &surface).await.unwrap();
    assert_eq!(sync.root_id().await.unwrap(), "S");

    remote.remove_folder("A");
    let outcome = sync.collapse(&surface).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Rendered(_)));
    assert_eq!(sync.root_id().await.unwrap(), "");
    assert_eq!(surface.lines(), vec!["  + /Projects"]);
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_collapse_from_orphan_folder_goes_to_top() {
    let remote = FakeRemote::with_folders(&[("X", "gone", "Orphan"), ("B", "", "Home")]);
    remote.add_note("X", "x1", "stray", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    assert_eq!(surface.lines(), vec!["  + /Orphan", "  + /Home"]);

    sync.focus(1, &surface).await.unwrap();
    assert_eq!(sync.root_id().await.unwrap(), "X");

    sync.collapse(&surface).await.unwrap();
    assert_eq!(sync.root_id().await.unwrap(), "");
    assert_eq!(
        surface.lines(),
        vec!["  + /Orphan", "    + /stray", "  + /Home"]
    );
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_collapse_keeps_concurrent_expand_below_old_root() {
    let remote = FakeRemote::with_folders(&[
        ("A", "", "Work"),
        ("S", "A", "Projects"),
        ("T", "S", "Drafts"),
    ]);
    remote.add_note("T", "t1", "outline", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    sync.expand(1, &surface).await.unwrap();
    sync.focus(2, &surface).await.unwrap();
    assert_eq!(sync.root_id().await.unwrap(), "S");
    assert_eq!(surface.lines(), vec!["  + /Drafts"]);

    let (expanded, collapsed) = tokio::join!(sync.expand(1, &surface), sync.collapse(&surface));

    assert!(matches!(expanded.unwrap(), SyncOutcome::Rendered(_)));
    assert!(matches!(collapsed.unwrap(), SyncOutcome::Rendered(_)));
    assert_eq!(sync.root_id().await.unwrap(), "A");
    assert!(sync.store.read().await.find_by_id("T").unwrap().is_fetched());
    assert_eq!(
        surface.lines(),
        vec!["  + /Projects", "    + /Drafts", "      + /outline"]
    );
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_focus_keeps_concurrent_expand_below_new_root() {
    let remote = FakeRemote::with_folders(&[("A", "", "Work"), ("S", "A", "Projects")]);
    remote.add_note("S", "s1", "deep", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    sync.expand(1, &surface).await.unwrap();
    assert_eq!(surface.lines(), vec!["  + /Work", "    + /Projects"]);

    let (expanded, focused) = tokio::join!(sync.expand(2, &surface), sync.focus(1, &surface));

    assert!(matches!(expanded.unwrap(), SyncOutcome::Rendered(_)));
    assert!(matches!(focused.unwrap(), SyncOutcome::Rendered(_)));
    assert_eq!(sync.root_id().await.unwrap(), "A");
    assert!(sync.store.read().await.find_by_id("S").unwrap().is_fetched());
    assert_eq!(surface.lines(), vec!["  + /Projects", "    + /deep"]);
    assert_consistent(&sync, &surface).await;
}

#[tokio::test]
async fn test_expand_of_folder_re_rooted_away_is_ignored() {
    let remote = work_home();
    remote.add_note("A", "n1", "todo1", false);
    let sync = explorer(&remote);
    let surface = RecordingSurface::default();
    sync.open_root(&surface).await.unwrap();
    // Home is fetched (empty), focusing it needs no remote call
    sync.expand(2, &surface).await.unwrap();

    let (expanded, focused) = tokio::join!(sync.expand(1, &surface), sync.focus(2, &surface));

    assert_eq!(expanded.unwrap(), SyncOutcome::Ignored);
    assert!(matches!(focused.unwrap(), SyncOutcome::Rendered(_)));
    assert_eq!(sync.root_id().await.unwrap(), "B");
    assert!(surface.lines().is_empty());
    assert!(sync.store.read().await.find_by_id("n1").is_err());
}
