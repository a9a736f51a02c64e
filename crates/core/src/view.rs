//! Navigation and selection state of a document listing.
//!
//! `ViewState` is plain serializable data. Every transition takes the
//! current [`DocumentTree`] by reference and only touches the view.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{DocumentNode, NodeId};
use crate::tree::DocumentTree;

pub const ROOT_LABEL: &str = "Root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub id: Option<NodeId>,
    pub name: String,
}

impl Breadcrumb {
    pub fn root() -> Self {
        Self {
            id: None,
            name: ROOT_LABEL.to_string(),
        }
    }
}

/// Items of one folder: folders first, then files, input order within each.
#[derive(Debug, Clone, Default)]
pub struct FolderContents<'a> {
    pub folders: Vec<&'a DocumentNode>,
    pub files: Vec<&'a DocumentNode>,
}

impl<'a> FolderContents<'a> {
    pub fn items(&self) -> impl Iterator<Item = &'a DocumentNode> + '_ {
        self.folders.iter().chain(self.files.iter()).copied()
    }

    pub fn len(&self) -> usize {
        self.folders.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.items().any(|n| &n.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub current_folder: Option<NodeId>,
    pub breadcrumbs: Vec<Breadcrumb>,
    #[serde(default)]
    pub selected: BTreeSet<NodeId>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_folder: None,
            breadcrumbs: vec![Breadcrumb::root()],
            selected: BTreeSet::new(),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents<'t>(&self, tree: &'t DocumentTree) -> FolderContents<'t> {
        let (folders, files): (Vec<_>, Vec<_>) = tree
            .children_of(self.current_folder.as_ref())
            .into_iter()
            .partition(|n| n.is_folder());
        FolderContents { folders, files }
    }

    // Navigation

    /// Open `folder` (`None` = root). The breadcrumb trail is the full
    /// ancestor chain. Selection is cleared. Returns false, leaving the
    /// state untouched, when `folder` is not a folder of `tree`.
    pub fn navigate_to_folder(&mut self, tree: &DocumentTree, folder: Option<&NodeId>) -> bool {
        if !self.set_location(tree, folder) {
            tracing::warn!(folder = ?folder, "cannot navigate: folder not reachable from root");
            return false;
        }
        self.selected.clear();
        true
    }

    /// Jump to a breadcrumb. Targets that are neither on the current trail
    /// nor a visible folder leave the view unchanged.
    pub fn navigate_to_breadcrumb(&mut self, tree: &DocumentTree, target: Option<&NodeId>) -> bool {
        let Some(id) = target else {
            return self.navigate_to_folder(tree, None);
        };
        let on_trail = self.breadcrumbs.iter().any(|b| b.id.as_ref() == Some(id));
        let visible = self.contents(tree).folders.iter().any(|f| &f.id == id);
        if !on_trail && !visible {
            tracing::warn!(crumb = %id, "breadcrumb target not on trail or in view, ignoring");
            return false;
        }
        self.navigate_to_folder(tree, Some(id))
    }

    pub fn navigate_up(&mut self, tree: &DocumentTree) -> bool {
        let Some(cur) = self.current_folder.clone() else {
            return false;
        };
        let parent = tree.get(&cur).and_then(|n| n.parent_id.clone());
        self.navigate_to_folder(tree, parent.as_ref())
    }

    fn set_location(&mut self, tree: &DocumentTree, folder: Option<&NodeId>) -> bool {
        let Some(id) = folder else {
            self.current_folder = None;
            self.breadcrumbs = vec![Breadcrumb::root()];
            return true;
        };
        match tree.get(id) {
            Some(node) if node.is_folder() && tree.is_reachable(id) => {
                let mut trail = vec![Breadcrumb::root()];
                trail.extend(tree.path_to(id).into_iter().map(|n| Breadcrumb {
                    id: Some(n.id.clone()),
                    name: n.name.clone(),
                }));
                self.current_folder = Some(id.clone());
                self.breadcrumbs = trail;
                true
            }
            _ => false,
        }
    }

    // Selection

    /// Checked selects every visible item, unchecked clears the selection.
    pub fn select_all(&mut self, tree: &DocumentTree, checked: bool) {
        self.selected = if checked {
            self.contents(tree).items().map(|n| n.id.clone()).collect()
        } else {
            BTreeSet::new()
        };
    }

    /// Add or remove one id. Ids outside the current folder are ignored.
    pub fn toggle(&mut self, tree: &DocumentTree, id: &NodeId, checked: bool) -> bool {
        if !checked {
            return self.selected.remove(id);
        }
        if !self.contents(tree).contains(id) {
            tracing::debug!(id = %id, "ignoring selection of item outside current folder");
            return false;
        }
        self.selected.insert(id.clone())
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn all_selected(&self, tree: &DocumentTree) -> bool {
        let visible = self.contents(tree).len();
        !self.selected.is_empty() && self.selected.len() == visible
    }

    pub fn indeterminate(&self, tree: &DocumentTree) -> bool {
        let visible = self.contents(tree).len();
        !self.selected.is_empty() && self.selected.len() < visible
    }

    /// Selected items in display order.
    pub fn selected_nodes<'t>(&self, tree: &'t DocumentTree) -> Vec<&'t DocumentNode> {
        self.contents(tree)
            .items()
            .filter(|n| self.selected.contains(&n.id))
            .collect()
    }

    pub fn selected_files<'t>(&self, tree: &'t DocumentTree) -> Vec<&'t DocumentNode> {
        self.selected_nodes(tree)
            .into_iter()
            .filter(|n| n.is_file())
            .collect()
    }

    // Reload

    /// Bring the view back in line with a freshly loaded tree.
    ///
    /// A current folder that vanished or became unreachable falls back to
    /// the deepest breadcrumb that still resolves. Breadcrumb names follow
    /// renames and moves. Selected ids that are no longer visible are dropped.
    pub fn reconcile(&mut self, tree: &DocumentTree) {
        let still_there = |id: &NodeId| {
            tree.get(id).is_some_and(|n| n.is_folder()) && tree.is_reachable(id)
        };

        let location = match self.current_folder.clone() {
            Some(id) if still_there(&id) => Some(id),
            Some(id) => {
                let fallback = self
                    .breadcrumbs
                    .iter()
                    .rev()
                    .filter_map(|b| b.id.clone())
                    .find(|b| b != &id && still_there(b));
                tracing::info!(
                    folder = %id,
                    fallback = ?fallback,
                    "current folder is gone after reload"
                );
                self.selected.clear();
                fallback
            }
            None => None,
        };
        self.set_location(tree, location.as_ref());

        let visible = self.contents(tree);
        self.selected.retain(|id| visible.contains(id));
    }
}
