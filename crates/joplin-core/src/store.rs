use std::collections::HashSet;

use crate::error::TreeError;
use crate::model::{Folder, Node};

// In memory, one per editor session
#[derive(Debug, Default)]
pub struct TreeStore {
    root: Option<Node>,
    version: u64,
}

impl TreeStore {
    pub fn new() -> Self {
        Self {
            root: None,
            version: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.root.is_some()
    }

    /// Mutation counter, bumped by every successful structural change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Build the root container from the top-level folders
    pub fn initialize(&mut self, top_level_folders: Vec<Folder>) -> Result<(), TreeError> {
        if self.is_initialized() {
            return Err(TreeError::InvalidState(
                "notebook tree is already initialized".into(),
            ));
        }

        let mut root = Node::root();
        root.children = Some(top_level_folders.into_iter().map(Node::from).collect());
        check_tree(&root)?;

        self.root = Some(root);
        self.version += 1;
        Ok(())
    }

    pub fn root(&self) -> Result<&Node, TreeError> {
        self.root.as_ref().ok_or_else(|| {
            TreeError::ConsistencyViolation("notebook tree used before initialization".into())
        })
    }

    /// Visible nodes in pre-order, root excluded
    pub fn iter(&self) -> PreOrder<'_> {
        match &self.root {
            Some(root) => PreOrder::new(root),
            None => PreOrder::empty(),
        }
    }

    /// Depth-first search including the root itself
    ///
    /// Walks the whole tree so that a duplicated id is reported instead of
    /// silently resolving to the first match.
    pub fn find_by_id(&self, id: &str) -> Result<&Node, TreeError> {
        let root = self.root()?;

        let mut found: Option<&Node> = None;
        for node in std::iter::once(root).chain(self.iter().map(|(_, _, node)| node)) {
            if node.id != id {
                continue;
            }
            if found.is_some() {
                log::error!("duplicate id {:?} in notebook tree", id);
                return Err(TreeError::ConsistencyViolation(format!(
                    "duplicate id {:?} in notebook tree",
                    id
                )));
            }
            found = Some(node);
        }

        found.ok_or_else(|| TreeError::NotFound(format!("no node with id {:?}", id)))
    }

    /// Node displayed at the 0-based `ordinal`
    pub fn find_by_ordinal(&self, ordinal: usize) -> Result<&Node, TreeError> {
        self.root()?;

        let mut visible = 0;
        for (index, _, node) in self.iter() {
            if index == ordinal {
                return Ok(node);
            }
            visible = index + 1;
        }

        Err(TreeError::NotFound(format!(
            "ordinal {} is past the {} visible nodes",
            ordinal, visible
        )))
    }

    /// Record the fetched children of a folder
    ///
    /// Absent or empty children are replaced. Non-empty children are merged
    /// by id: an incoming entry overwrites title and metadata of the existing
    /// one (last write wins) and keeps its already fetched subtree, unknown ids
    /// are appended in arrival order.
    pub fn attach_children(&mut self, id: &str, children: Vec<Node>) -> Result<(), TreeError> {
        let root = self.root.as_mut().ok_or_else(|| {
            TreeError::ConsistencyViolation("notebook tree used before initialization".into())
        })?;

        for child in &children {
            child.validate()?;
        }

        let foreign = {
            let target = find(root, id)
                .ok_or_else(|| TreeError::NotFound(format!("no node with id {:?}", id)))?;
            if !target.is_folder() {
                return Err(TreeError::InvalidState(format!(
                    "{:?} is a note and cannot hold children",
                    id
                )));
            }
            let own: HashSet<&str> = target.children().iter().map(|c| c.id.as_str()).collect();
            let mut all = HashSet::new();
            collect_ids(root, &mut all)?;
            all.into_iter()
                .filter(|existing| !own.contains(existing.as_str()))
                .collect::<HashSet<String>>()
        };

        let mut incoming_ids = HashSet::new();
        for child in &children {
            collect_ids_lenient(child, &mut incoming_ids);
        }
        if let Some(clash) = incoming_ids.iter().find(|cid| foreign.contains(*cid)) {
            log::error!("attach under {:?} would duplicate id {:?}", id, clash);
            return Err(TreeError::ConsistencyViolation(format!(
                "id {:?} already exists elsewhere in the tree",
                clash
            )));
        }

        let target = find_mut(root, id)
            .ok_or_else(|| TreeError::NotFound(format!("no node with id {:?}", id)))?;
        let existing = target.children.take().unwrap_or_default();
        target.children = Some(merge_by_id(existing, children));

        self.version += 1;
        Ok(())
    }

    /// Discard the current tree and make `node` the new root
    pub fn replace_root(&mut self, node: Option<Node>) -> Result<(), TreeError> {
        if !self.is_initialized() {
            return Err(TreeError::InvalidState(
                "cannot re-root an uninitialized tree".into(),
            ));
        }
        let node = node.ok_or_else(|| {
            TreeError::InvalidState("no parent folder to re-root on".into())
        })?;
        if !node.is_folder() {
            return Err(TreeError::InvalidState(format!(
                "{:?} is a note and cannot be a root",
                node.id
            )));
        }
        check_tree(&node)?;

        self.root = Some(node);
        self.version += 1;
        Ok(())
    }

    /// Re-check id uniqueness and leaf shape over the whole tree
    pub fn validate(&self) -> Result<(), TreeError> {
        check_tree(self.root()?)
    }
}

/// Pre-order walk yielding `(ordinal, depth, node)`
///
/// Depth 0 is the root's direct children.
pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a Node)>,
    next_index: usize,
}

impl<'a> PreOrder<'a> {
    pub fn new(root: &'a Node) -> Self {
        Self {
            stack: root.children().iter().rev().map(|child| (0, child)).collect(),
            next_index: 0,
        }
    }

    fn empty() -> Self {
        Self {
            stack: Vec::new(),
            next_index: 0,
        }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children().iter().rev().map(|child| (depth + 1, child)));

        let index = self.next_index;
        self.next_index += 1;
        Some((index, depth, node))
    }
}

fn find<'a>(node: &'a Node, id: &str) -> Option<&'a Node> {
    if node.id == id {
        return Some(node);
    }
    node.children().iter().find_map(|child| find(child, id))
}

fn find_mut<'a>(node: &'a mut Node, id: &str) -> Option<&'a mut Node> {
    if node.id == id {
        return Some(node);
    }
    node.children
        .as_mut()?
        .iter_mut()
        .find_map(|child| find_mut(child, id))
}

fn collect_ids(node: &Node, ids: &mut HashSet<String>) -> Result<(), TreeError> {
    if !ids.insert(node.id.clone()) {
        return Err(TreeError::ConsistencyViolation(format!(
            "duplicate id {:?} in notebook tree",
            node.id
        )));
    }
    node.children()
        .iter()
        .try_for_each(|child| collect_ids(child, ids))
}

fn collect_ids_lenient(node: &Node, ids: &mut HashSet<String>) {
    ids.insert(node.id.clone());
    for child in node.children() {
        collect_ids_lenient(child, ids);
    }
}

fn check_tree(root: &Node) -> Result<(), TreeError> {
    root.validate()?;
    collect_ids(root, &mut HashSet::new())
}

/// Last write wins by id, first occurrence keeps its position
fn merge_by_id(existing: Vec<Node>, incoming: Vec<Node>) -> Vec<Node> {
    let mut merged = existing;
    for node in incoming {
        match merged.iter_mut().find(|current| current.id == node.id) {
            Some(current) => {
                let children = if node.is_folder() {
                    node.children.or_else(|| current.children.take())
                } else {
                    None
                };
                *current = Node { children, ..node };
            }
            None => merged.push(node),
        }
    }
    merged
}
