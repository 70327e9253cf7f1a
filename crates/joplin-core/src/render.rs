use serde::{Deserialize, Serialize};

use crate::model::{Annotation, Node};
use crate::store::PreOrder;

const INDENT: &str = "  ";
const MARKER: &str = "+ /";

/// Display lines of a tree and the entity bound to each of them
///
/// `annotations[i]` belongs to `lines[i]`, both in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedTree {
    pub lines: Vec<String>,
    pub annotations: Vec<Annotation>,
}

impl RenderedTree {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Binding of a 1-based buffer line
    pub fn annotation_at_line(&self, line: usize) -> Option<&Annotation> {
        self.annotations.get(line.checked_sub(1)?)
    }
}

/// Render every node below `root`, the root itself has no line
pub fn render(root: &Node) -> RenderedTree {
    let mut rendered = RenderedTree::default();
    for (_, depth, node) in PreOrder::new(root) {
        rendered.lines.push(format_line(depth, &node.title));
        rendered.annotations.push(node.annotation());
    }
    rendered
}

/// 0-based line showing the node with `id`
pub fn line_of(root: &Node, id: &str) -> Option<usize> {
    PreOrder::new(root)
        .find(|(_, _, node)| node.id == id)
        .map(|(index, _, _)| index)
}

// The root's children sit one indent in, like the explorer always drew them
fn format_line(depth: usize, title: &str) -> String {
    format!("{}{}{}", INDENT.repeat(depth + 1), MARKER, title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Folder, Note, NodeKind};
    use crate::store::TreeStore;

    fn work_home() -> TreeStore {
        let mut store = TreeStore::new();
        store
            .initialize(vec![
                Folder {
                    id: "A".into(),
                    parent_id: String::new(),
                    title: "Work".into(),
                },
                Folder {
                    id: "B".into(),
                    parent_id: String::new(),
                    title: "Home".into(),
                },
            ])
            .unwrap();
        store
    }

    fn assert_bound(store: &TreeStore, rendered: &RenderedTree) {
        assert_eq!(rendered.lines.len(), rendered.annotations.len());
        for (index, _, node) in store.iter() {
            assert_eq!(rendered.annotations[index].id, node.id);
            assert_eq!(line_of(store.root().unwrap(), &node.id), Some(index));
        }
    }

    #[test]
    fn test_render_top_level_folders() {
        let store = work_home();
        let rendered = render(store.root().unwrap());

        assert_eq!(rendered.lines, vec!["  + /Work", "  + /Home"]);
        let ids: Vec<&str> = rendered.annotations.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(rendered
            .annotations
            .iter()
            .all(|a| a.kind == NodeKind::Folder));
        assert_bound(&store, &rendered);
    }

    #[test]
    fn test_render_is_idempotent() {
        let store = work_home();
        let root = store.root().unwrap();
        assert_eq!(render(root), render(root));
    }

    #[test]
    fn test_render_indents_children() {
        let mut store = work_home();
        store
            .attach_children(
                "A",
                vec![Node::from(Note {
                    id: "n1".into(),
                    parent_id: "A".into(),
                    title: "todo1".into(),
                    is_todo: true,
                    body: String::new(),
                })],
            )
            .unwrap();

        let rendered = render(store.root().unwrap());
        assert_eq!(
            rendered.lines,
            vec!["  + /Work", "    + /todo1", "  + /Home"]
        );
        assert_eq!(rendered.annotations[1].kind, NodeKind::Note);
        assert_eq!(rendered.annotation_at_line(2).unwrap().id, "n1");
        assert!(rendered.annotation_at_line(0).is_none());
        assert_bound(&store, &rendered);
    }

    #[test]
    fn test_render_empty_root() {
        let mut store = TreeStore::new();
        store.initialize(vec![]).unwrap();
        let rendered = render(store.root().unwrap());
        assert!(rendered.is_empty());
        assert_eq!(line_of(store.root().unwrap(), "A"), None);
    }
}
