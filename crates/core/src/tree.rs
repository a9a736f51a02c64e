//! Reconstruction of the folder hierarchy from the server's node list.
//!
//! The server may answer with a flat list linked by `parentId` or with a
//! forest whose nodes carry nested `children`. Both shapes are accepted
//! without special-casing: [`flatten`] filters on `parentId` at every level,
//! and [`DocumentTree`] indexes every node it can find at any depth.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::ValidationError;
use crate::model::{DocumentNode, NodeId};

/// Depth-first, pre-order listing of the nodes whose `parentId` equals
/// `parent`, each immediately followed by its nested `children`.
///
/// Siblings keep their input order. A node id is emitted at most once; when
/// the same id appears twice the first occurrence wins.
pub fn flatten<'a>(nodes: &'a [DocumentNode], parent: Option<&NodeId>) -> Vec<&'a DocumentNode> {
    let mut out = Vec::new();
    let mut seen: HashSet<&'a NodeId> = HashSet::new();
    let mut stack: Vec<(std::slice::Iter<'a, DocumentNode>, &'a NodeId)> = Vec::new();

    for top in nodes.iter().filter(|n| n.parent_id.as_ref() == parent) {
        if seen.insert(&top.id) {
            out.push(top);
        }
        stack.push((top.children.iter(), &top.id));

        while let Some((iter, pid)) = stack.last_mut() {
            let pid: &'a NodeId = *pid;
            let next = iter.next();
            match next {
                Some(child) if child.parent_id.as_ref() == Some(pid) => {
                    if seen.insert(&child.id) {
                        out.push(child);
                    }
                    stack.push((child.children.iter(), &child.id));
                }
                Some(_) => {}
                None => {
                    stack.pop();
                }
            }
        }
    }
    out
}

/// Indexed member set of one claim's documents.
///
/// Members are stored detached (no nested `children`) in first-seen,
/// pre-order input order.
#[derive(Debug, Clone, Default)]
pub struct DocumentTree {
    nodes: Vec<DocumentNode>,
    index: HashMap<NodeId, usize>,
    by_parent: HashMap<Option<NodeId>, Vec<usize>>,
}

impl DocumentTree {
    pub fn from_nodes(nodes: &[DocumentNode]) -> Self {
        let mut tree = DocumentTree::default();
        let mut stack: Vec<std::slice::Iter<'_, DocumentNode>> = vec![nodes.iter()];
        while let Some(iter) = stack.last_mut() {
            let next = iter.next();
            match next {
                Some(node) => {
                    tree.insert(node);
                    if !node.children.is_empty() {
                        stack.push(node.children.iter());
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
        let orphans = tree.orphans().len();
        if orphans > 0 {
            tracing::warn!(orphans, "document list contains nodes unreachable from root");
        }
        tree
    }

    fn insert(&mut self, node: &DocumentNode) {
        if self.index.contains_key(&node.id) {
            tracing::debug!(id = %node.id, "duplicate node id, keeping first occurrence");
            return;
        }
        let pos = self.nodes.len();
        self.index.insert(node.id.clone(), pos);
        self.by_parent
            .entry(node.parent_id.clone())
            .or_default()
            .push(pos);
        self.nodes.push(node.detached());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentNode> {
        self.nodes.iter()
    }

    pub fn get(&self, id: &NodeId) -> Option<&DocumentNode> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Direct children of `parent` (`None` = root), in input order.
    pub fn children_of(&self, parent: Option<&NodeId>) -> Vec<&DocumentNode> {
        self.by_parent
            .get(&parent.cloned())
            .map(|ids| ids.iter().map(|&pos| &self.nodes[pos]).collect())
            .unwrap_or_default()
    }

    /// Parent chain of `id`, nearest first. Stops at a missing parent and
    /// never loops, even if the input contains a cycle.
    pub fn ancestors(&self, id: &NodeId) -> Vec<&DocumentNode> {
        let mut out = Vec::new();
        let mut seen: HashSet<&NodeId> = HashSet::new();
        seen.insert(id);
        let mut cur = self.get(id).and_then(|n| n.parent_id.as_ref());
        while let Some(pid) = cur {
            if !seen.insert(pid) {
                break;
            }
            match self.get(pid) {
                Some(parent) => {
                    out.push(parent);
                    cur = parent.parent_id.as_ref();
                }
                None => break,
            }
        }
        out
    }

    /// Root-first chain ending with `id` itself.
    pub fn path_to(&self, id: &NodeId) -> Vec<&DocumentNode> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let mut path = self.ancestors(id);
        path.reverse();
        path.push(node);
        path
    }

    /// Slash-joined names from the root down to `id`.
    pub fn display_path(&self, id: &NodeId) -> String {
        self.path_to(id)
            .iter()
            .map(|n| n.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// True when `of` appears on the parent chain of `id`.
    pub fn is_descendant(&self, id: &NodeId, of: &NodeId) -> bool {
        self.ancestors(id).iter().any(|a| &a.id == of)
    }

    /// Ids reachable from the root through folder nodes only.
    fn reachable(&self) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<usize> = self
            .by_parent
            .get(&None)
            .cloned()
            .unwrap_or_default()
            .into();
        while let Some(pos) = queue.pop_front() {
            if !seen.insert(pos) {
                continue;
            }
            let node = &self.nodes[pos];
            if node.is_folder() {
                if let Some(kids) = self.by_parent.get(&Some(node.id.clone())) {
                    queue.extend(kids.iter().copied());
                }
            }
        }
        seen
    }

    pub fn is_reachable(&self, id: &NodeId) -> bool {
        match self.index.get(id) {
            Some(pos) => self.reachable().contains(pos),
            None => false,
        }
    }

    /// Members that cannot be reached from the root: their parent is
    /// missing, is a file, or they sit on a parent cycle.
    pub fn orphans(&self) -> Vec<&DocumentNode> {
        let reachable = self.reachable();
        self.nodes
            .iter()
            .enumerate()
            .filter(|(pos, _)| !reachable.contains(pos))
            .map(|(_, n)| n)
            .collect()
    }

    /// Rebuild the nested form: root nodes with `children` populated
    /// recursively. Orphans are left out.
    pub fn nest(&self) -> Vec<DocumentNode> {
        self.children_of(None)
            .into_iter()
            .map(|n| self.nest_node(n))
            .collect()
    }

    fn nest_node(&self, node: &DocumentNode) -> DocumentNode {
        let mut out = node.clone();
        if node.is_folder() {
            out.children = self
                .children_of(Some(&node.id))
                .into_iter()
                .map(|c| self.nest_node(c))
                .collect();
        }
        out
    }

    /// Reject moves that would break the hierarchy: into itself, into one of
    /// its descendants, or under something that is not a folder.
    pub fn check_move(
        &self,
        node: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<(), ValidationError> {
        if !self.contains(node) {
            return Err(ValidationError::UnknownNode(node.clone()));
        }
        let Some(target) = new_parent else {
            return Ok(());
        };
        if target == node {
            return Err(ValidationError::MoveIntoSelf(node.clone()));
        }
        let target_node = self
            .get(target)
            .ok_or_else(|| ValidationError::UnknownNode(target.clone()))?;
        if !target_node.is_folder() {
            return Err(ValidationError::TargetNotFolder(target.clone()));
        }
        if self.is_descendant(target, node) {
            return Err(ValidationError::MoveIntoDescendant {
                node: node.clone(),
                target: target.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClaimId, NodeKind};
    use pretty_assertions::assert_eq;

    fn claim() -> ClaimId {
        ClaimId::new("c1")
    }

    fn ids(nodes: &[&DocumentNode]) -> Vec<String> {
        nodes.iter().map(|n| n.id.0.clone()).collect()
    }

    #[test]
    fn flat_list_filters_by_parent() {
        let c = claim();
        let list = vec![
            DocumentNode::folder("1", &c, None, "Docs"),
            DocumentNode::file("2", &c, Some("1"), "a.pdf"),
        ];
        assert_eq!(ids(&flatten(&list, None)), vec!["1"]);
        assert_eq!(ids(&flatten(&list, Some(&NodeId::from("1")))), vec!["2"]);
    }

    #[test]
    fn nested_input_is_emitted_depth_first() {
        let c = claim();
        let mut docs = DocumentNode::folder("1", &c, None, "Docs");
        let mut inner = DocumentNode::folder("2", &c, Some("1"), "Inner");
        inner.children = vec![DocumentNode::file("3", &c, Some("2"), "x.txt")];
        docs.children = vec![inner, DocumentNode::file("4", &c, Some("1"), "y.txt")];
        let forest = vec![docs, DocumentNode::file("5", &c, None, "z.txt")];

        assert_eq!(ids(&flatten(&forest, None)), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let c = claim();
        let mut docs = DocumentNode::folder("1", &c, None, "Docs");
        docs.children = vec![DocumentNode::file("2", &c, Some("1"), "first")];
        let list = vec![
            docs,
            DocumentNode::folder("1", &c, None, "Docs again"),
        ];
        let flat = flatten(&list, None);
        assert_eq!(ids(&flat), vec!["1", "2"]);
        assert_eq!(flat[0].name, "Docs");

        let tree = DocumentTree::from_nodes(&list);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(&"1".into()).map(|n| n.name.as_str()), Some("Docs"));
    }

    #[test]
    fn tree_indexes_every_depth() {
        let c = claim();
        let mut docs = DocumentNode::folder("1", &c, None, "Docs");
        docs.children = vec![DocumentNode::file("2", &c, Some("1"), "a.pdf")];
        let tree = DocumentTree::from_nodes(&[docs]);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|n| n.children.is_empty()));
        assert_eq!(ids(&tree.children_of(Some(&"1".into()))), vec!["2"]);
    }

    #[test]
    fn ancestors_and_paths() {
        let c = claim();
        let list = vec![
            DocumentNode::folder("a", &c, None, "A"),
            DocumentNode::folder("b", &c, Some("a"), "B"),
            DocumentNode::file("c", &c, Some("b"), "c.txt"),
        ];
        let tree = DocumentTree::from_nodes(&list);
        assert_eq!(ids(&tree.ancestors(&"c".into())), vec!["b", "a"]);
        assert_eq!(tree.display_path(&"c".into()), "A/B/c.txt");
        assert!(tree.is_descendant(&"c".into(), &"a".into()));
        assert!(!tree.is_descendant(&"a".into(), &"c".into()));
    }

    #[test]
    fn cycles_and_dangling_parents_are_orphans() {
        let c = claim();
        let list = vec![
            DocumentNode::folder("root", &c, None, "Root folder"),
            DocumentNode::folder("x", &c, Some("y"), "X"),
            DocumentNode::folder("y", &c, Some("x"), "Y"),
            DocumentNode::file("lost", &c, Some("gone"), "lost.txt"),
            DocumentNode::file("f", &c, None, "f.txt"),
            DocumentNode::file("under-file", &c, Some("f"), "nested.txt"),
        ];
        let tree = DocumentTree::from_nodes(&list);
        let mut orphans = ids(&tree.orphans());
        orphans.sort();
        assert_eq!(orphans, vec!["lost", "under-file", "x", "y"]);
        assert_eq!(ids(&tree.ancestors(&"x".into())), vec!["y"]);
        assert!(!tree.is_reachable(&"x".into()));
        assert!(tree.is_reachable(&"f".into()));
    }

    #[test]
    fn nest_rebuilds_children() {
        let c = claim();
        let list = vec![
            DocumentNode::folder("1", &c, None, "Docs"),
            DocumentNode::file("2", &c, Some("1"), "a.pdf"),
            DocumentNode::file("3", &c, None, "b.pdf"),
        ];
        let nested = DocumentTree::from_nodes(&list).nest();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].children.len(), 1);
        assert_eq!(nested[0].children[0].kind, NodeKind::File);
        assert_eq!(ids(&flatten(&nested, None)), vec!["1", "2", "3"]);
    }

    #[test]
    fn move_into_descendant_is_rejected() {
        let c = claim();
        let list = vec![
            DocumentNode::folder("A", &c, None, "A"),
            DocumentNode::folder("B", &c, Some("A"), "B"),
            DocumentNode::folder("C", &c, Some("B"), "C"),
            DocumentNode::file("f", &c, None, "f.txt"),
        ];
        let tree = DocumentTree::from_nodes(&list);
        let a = NodeId::from("A");
        let cc = NodeId::from("C");
        assert_eq!(
            tree.check_move(&a, Some(&cc)),
            Err(ValidationError::MoveIntoDescendant {
                node: a.clone(),
                target: cc.clone()
            })
        );
        assert_eq!(
            tree.check_move(&a, Some(&a)),
            Err(ValidationError::MoveIntoSelf(a.clone()))
        );
        assert_eq!(
            tree.check_move(&cc, Some(&"f".into())),
            Err(ValidationError::TargetNotFolder("f".into()))
        );
        assert_eq!(tree.check_move(&cc, None), Ok(()));
        assert_eq!(tree.check_move(&cc, Some(&a)), Ok(()));
    }
}
