//! A claim's document listing bound to the service that owns it.
//!
//! Every structural change goes to the service first and is followed by a
//! full reload; the in-memory tree is never patched locally.

use crossbeam_channel::Sender;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Error, Result, ValidationError};
use crate::model::{ClaimId, DocumentNode, FileCategory, NodeId};
use crate::service::{DocumentService, FileUpload, PreviewBody};
use crate::tree::DocumentTree;
use crate::view::{FolderContents, ViewState};

/// Progress of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkMsg {
    Started { total: usize },
    ItemDone { id: NodeId },
    ItemFailed { id: NodeId, reason: String },
    Finished { succeeded: usize, failed: usize },
}

/// Per-item outcome of a bulk operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: Vec<NodeId>,
    pub failed: Vec<(NodeId, String)>,
    /// Set when the items went through but the listing could not be
    /// refreshed afterwards. The tree and view are then the pre-batch ones.
    pub reload_error: Option<String>,
}

impl BulkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.reload_error.is_none()
    }

    fn record(&mut self, id: NodeId, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded.push(id),
            Err(e) => self.failed.push((id, e.to_string())),
        }
    }
}

/// What a preview of a file resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewContent {
    Image { content_type: String, bytes: Vec<u8> },
    Text(String),
    Unavailable,
}

pub struct Explorer<S> {
    service: S,
    claim: ClaimId,
    tree: DocumentTree,
    view: ViewState,
    progress: Option<Sender<BulkMsg>>,
}

impl<S: DocumentService> Explorer<S> {
    /// Load the claim's documents and start at the root.
    pub fn open(service: S, claim: ClaimId) -> Result<Self> {
        Self::restore(service, claim, ViewState::new())
    }

    /// Load the claim's documents and resume a saved view.
    pub fn restore(service: S, claim: ClaimId, view: ViewState) -> Result<Self> {
        let mut explorer = Self {
            service,
            claim,
            tree: DocumentTree::default(),
            view,
            progress: None,
        };
        explorer.reload()?;
        Ok(explorer)
    }

    pub fn with_progress(mut self, tx: Sender<BulkMsg>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn set_progress(&mut self, tx: Option<Sender<BulkMsg>>) {
        self.progress = tx;
    }

    pub fn claim(&self) -> &ClaimId {
        &self.claim
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn into_view(self) -> ViewState {
        self.view
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn current_folder(&self) -> Option<NodeId> {
        self.view.current_folder.clone()
    }

    pub fn contents(&self) -> FolderContents<'_> {
        self.view.contents(&self.tree)
    }

    /// Replace the tree with the service's current listing.
    pub fn reload(&mut self) -> Result<()> {
        let nodes = self.service.list(&self.claim)?;
        self.tree = DocumentTree::from_nodes(&nodes);
        self.view.reconcile(&self.tree);
        debug!(claim = %self.claim, nodes = self.tree.len(), "reloaded documents");
        Ok(())
    }

    // Navigation and selection

    pub fn navigate_to_folder(&mut self, folder: Option<&NodeId>) -> bool {
        self.view.navigate_to_folder(&self.tree, folder)
    }

    pub fn navigate_to_breadcrumb(&mut self, target: Option<&NodeId>) -> bool {
        self.view.navigate_to_breadcrumb(&self.tree, target)
    }

    pub fn navigate_up(&mut self) -> bool {
        self.view.navigate_up(&self.tree)
    }

    pub fn select_all(&mut self, checked: bool) {
        self.view.select_all(&self.tree, checked)
    }

    pub fn toggle(&mut self, id: &NodeId, checked: bool) -> bool {
        self.view.toggle(&self.tree, id, checked)
    }

    pub fn clear_selection(&mut self) {
        self.view.clear_selection()
    }

    // Mutations

    pub fn create_folder(&mut self, parent: Option<&NodeId>, name: &str) -> Result<DocumentNode> {
        let name = non_empty(name)?;
        self.require_folder(parent)?;
        info!(claim = %self.claim, parent_id = ?parent, folder = name, "creating folder");
        let created = self.service.create_folder(&self.claim, parent, name)?;
        debug!(id = %created.id, "folder created");
        self.reload()?;
        Ok(created)
    }

    pub fn upload_file(
        &mut self,
        parent: Option<&NodeId>,
        file: &FileUpload,
    ) -> Result<DocumentNode> {
        non_empty(&file.name)?;
        self.require_folder(parent)?;
        info!(claim = %self.claim, parent_id = ?parent, file = %file.name, "uploading file");
        let uploaded = self.service.upload_file(&self.claim, parent, file)?;
        debug!(id = %uploaded.id, status = %uploaded.status, "file uploaded");
        self.reload()?;
        Ok(uploaded)
    }

    /// Upload several files one after another. Failures are collected per
    /// file; the tree is reloaded once at the end. Reported ids are the file
    /// names.
    pub fn upload_files(
        &mut self,
        parent: Option<&NodeId>,
        files: &[FileUpload],
    ) -> Result<BulkReport> {
        if files.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        self.require_folder(parent)?;
        self.emit(BulkMsg::Started { total: files.len() });
        let mut report = BulkReport::default();
        for file in files {
            let outcome = non_empty(&file.name)
                .map_err(Error::from)
                .and_then(|_| self.service.upload_file(&self.claim, parent, file))
                .map(|node| {
                    debug!(id = %node.id, "file uploaded");
                });
            self.track(&mut report, NodeId::new(file.name.clone()), outcome);
        }
        self.finish(&report);
        self.reload_after_batch(&mut report);
        Ok(report)
    }

    pub fn rename(&mut self, node: &NodeId, new_name: &str) -> Result<DocumentNode> {
        let new_name = non_empty(new_name)?;
        self.require_node(node)?;
        info!(id = %node, new_name, "renaming");
        let renamed = self.service.rename(node, new_name)?;
        debug!(id = %renamed.id, new_name = %renamed.name, "renamed");
        self.reload()?;
        Ok(renamed)
    }

    pub fn delete(&mut self, node: &NodeId) -> Result<()> {
        self.require_node(node)?;
        info!(id = %node, "deleting");
        self.service.delete(node)?;
        self.reload()
    }

    pub fn move_node(
        &mut self,
        node: &NodeId,
        new_parent: Option<&NodeId>,
    ) -> Result<DocumentNode> {
        self.tree.check_move(node, new_parent)?;
        info!(id = %node, new_parent = ?new_parent, "moving");
        let moved = self.service.move_node(node, new_parent)?;
        debug!(id = %moved.id, parent_id = ?moved.parent_id, "moved");
        self.reload()?;
        Ok(moved)
    }

    // Bulk operations on the current selection

    /// Delete every selected item, one request at a time, continuing past
    /// failures. Reloads once afterwards and clears the selection if that
    /// reload went through.
    pub fn bulk_delete(&mut self) -> Result<BulkReport> {
        let targets: Vec<NodeId> = self
            .view
            .selected_nodes(&self.tree)
            .into_iter()
            .map(|n| n.id.clone())
            .collect();
        if targets.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        info!(count = targets.len(), "bulk delete");
        self.emit(BulkMsg::Started { total: targets.len() });
        let mut report = BulkReport::default();
        for id in targets {
            let outcome = self.service.delete(&id);
            self.track(&mut report, id, outcome);
        }
        self.finish(&report);
        if self.reload_after_batch(&mut report) {
            self.view.clear_selection();
        }
        Ok(report)
    }

    /// Download the selected files into `dest`, in parallel. Folders in the
    /// selection are skipped. Files sharing a name get a ` (n)` suffix.
    pub fn bulk_download(&self, dest: &Path) -> Result<BulkReport> {
        if self.view.selected.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let files: Vec<&DocumentNode> = self.view.selected_files(&self.tree);
        if files.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }
        std::fs::create_dir_all(dest)?;
        info!(count = files.len(), dest = %dest.display(), "bulk download");
        self.emit(BulkMsg::Started { total: files.len() });

        let targets: Vec<(&DocumentNode, String)> =
            files.iter().copied().zip(local_names(&files)).collect();
        let outcomes: Vec<(NodeId, Result<()>)> = targets
            .par_iter()
            .map(|(file, name)| {
                let outcome = self
                    .service
                    .download(&file.id)
                    .and_then(|bytes| Ok(std::fs::write(dest.join(name), bytes)?));
                (file.id.clone(), outcome)
            })
            .collect();

        let mut report = BulkReport::default();
        for (id, outcome) in outcomes {
            self.track(&mut report, id, outcome);
        }
        self.finish(&report);
        Ok(report)
    }

    pub fn download(&self, node: &NodeId) -> Result<Vec<u8>> {
        let file = self.require_node(node)?;
        if !file.is_file() {
            return Err(ValidationError::NoFilesSelected.into());
        }
        self.service.download(node)
    }

    /// Images come back as bytes, textual content as text, anything else is
    /// not previewable.
    pub fn preview(&self, node: &NodeId) -> Result<PreviewContent> {
        let file = self.require_node(node)?;
        if !file.is_file() {
            return Ok(PreviewContent::Unavailable);
        }
        let image = file.category() == FileCategory::Image;
        let preview = self.service.preview(node)?;
        Ok(match (image, preview.body) {
            (true, PreviewBody::Bytes(bytes)) => PreviewContent::Image {
                content_type: preview.content_type,
                bytes,
            },
            (true, PreviewBody::Text(text)) => PreviewContent::Image {
                content_type: preview.content_type,
                bytes: text.into_bytes(),
            },
            (false, PreviewBody::Text(text)) => PreviewContent::Text(text),
            (false, PreviewBody::Bytes(_)) => PreviewContent::Unavailable,
        })
    }

    /// Reload after a batch whose items already reached the service. A
    /// failure is kept in the report instead of discarding it.
    fn reload_after_batch(&mut self, report: &mut BulkReport) -> bool {
        match self.reload() {
            Ok(()) => true,
            Err(e) => {
                warn!(claim = %self.claim, error = %e, "reload after bulk operation failed");
                report.reload_error = Some(e.to_string());
                false
            }
        }
    }

    fn require_node(&self, id: &NodeId) -> Result<&DocumentNode> {
        self.tree
            .get(id)
            .ok_or_else(|| ValidationError::UnknownNode(id.clone()).into())
    }

    fn require_folder(&self, parent: Option<&NodeId>) -> Result<()> {
        let Some(id) = parent else {
            return Ok(());
        };
        if self.require_node(id)?.is_folder() {
            Ok(())
        } else {
            Err(ValidationError::TargetNotFolder(id.clone()).into())
        }
    }

    fn emit(&self, msg: BulkMsg) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(msg);
        }
    }

    fn track(&self, report: &mut BulkReport, id: NodeId, outcome: Result<()>) {
        match &outcome {
            Ok(()) => self.emit(BulkMsg::ItemDone { id: id.clone() }),
            Err(e) => {
                warn!(id = %id, error = %e, "bulk item failed");
                self.emit(BulkMsg::ItemFailed {
                    id: id.clone(),
                    reason: e.to_string(),
                });
            }
        }
        report.record(id, outcome);
    }

    fn finish(&self, report: &BulkReport) {
        self.emit(BulkMsg::Finished {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
        });
    }
}

/// Last path component of the node's name, falling back to its id.
fn local_name(node: &DocumentNode) -> String {
    Path::new(&node.name)
        .file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| node.id.to_string())
}

/// Local file names for `files`, in order. Names that collide
/// (case-insensitively) with an earlier one become `stem (2).ext`,
/// `stem (3).ext` and so on.
fn local_names(files: &[&DocumentNode]) -> Vec<String> {
    let mut taken = HashSet::new();
    files
        .iter()
        .map(|file| {
            let name = local_name(file);
            if taken.insert(name.to_lowercase()) {
                return name;
            }
            let (stem, ext) = match name.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
                _ => (name.as_str(), String::new()),
            };
            (2..)
                .map(|n| format!("{stem} ({n}){ext}"))
                .find(|candidate| taken.insert(candidate.to_lowercase()))
                .unwrap_or_default()
        })
        .collect()
}

/// Trimmed name, or `EmptyName` when nothing is left.
pub fn non_empty(name: &str) -> std::result::Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(trimmed)
    }
}
