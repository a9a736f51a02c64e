#![allow(dead_code)]

use claimtree_core::memory::InMemoryDocuments;
use claimtree_core::{
    ClaimId, DocumentNode, DocumentService, Error, FileUpload, NodeId, Preview, Result,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const TEST_CLAIM: &str = "claim-1";

pub fn claim() -> ClaimId {
    ClaimId::new(TEST_CLAIM)
}

/// Invoices/2024/March chain plus a couple of files.
pub fn sample_nodes() -> Vec<DocumentNode> {
    let c = claim();
    vec![
        DocumentNode::folder("A", &c, None, "Invoices"),
        DocumentNode::folder("B", &c, Some("A"), "2024"),
        DocumentNode::folder("C", &c, Some("B"), "March"),
        DocumentNode::file("f1", &c, Some("C"), "inv-001.pdf"),
        DocumentNode::file("f2", &c, Some("C"), "inv-002.txt"),
        DocumentNode::file("img", &c, Some("C"), "scan.png"),
        DocumentNode::file("r1", &c, None, "readme.txt"),
    ]
}

/// Wraps a service and records every call that reaches it.
pub struct Recording<S> {
    pub inner: S,
    pub calls: Mutex<Vec<String>>,
    lists_down: AtomicBool,
}

impl<S> Recording<S> {
    pub fn new(inner: S) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(Vec::new()),
            lists_down: AtomicBool::new(false),
        })
    }

    /// Make every following `list` fail while mutations keep working.
    pub fn break_listing(&self) {
        self.lists_down.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls other than `list`.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("list"))
            .collect()
    }

    fn log(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl<S: DocumentService> DocumentService for Recording<S> {
    fn list(&self, claim: &ClaimId) -> Result<Vec<DocumentNode>> {
        self.log(format!("list {claim}"));
        if self.lists_down.load(Ordering::SeqCst) {
            return Err(Error::RequestFailed {
                status: 503,
                message: "listing unavailable".into(),
            });
        }
        self.inner.list(claim)
    }

    fn create_folder(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        name: &str,
    ) -> Result<DocumentNode> {
        self.log(format!("create_folder {parent:?} {name}"));
        self.inner.create_folder(claim, parent, name)
    }

    fn upload_file(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        file: &FileUpload,
    ) -> Result<DocumentNode> {
        self.log(format!("upload_file {parent:?} {}", file.name));
        self.inner.upload_file(claim, parent, file)
    }

    fn rename(&self, node: &NodeId, new_name: &str) -> Result<DocumentNode> {
        self.log(format!("rename {node} {new_name}"));
        self.inner.rename(node, new_name)
    }

    fn delete(&self, node: &NodeId) -> Result<()> {
        self.log(format!("delete {node}"));
        self.inner.delete(node)
    }

    fn move_node(&self, node: &NodeId, new_parent: Option<&NodeId>) -> Result<DocumentNode> {
        self.log(format!("move {node} {new_parent:?}"));
        self.inner.move_node(node, new_parent)
    }

    fn download(&self, node: &NodeId) -> Result<Vec<u8>> {
        self.log(format!("download {node}"));
        self.inner.download(node)
    }

    fn preview(&self, node: &NodeId) -> Result<Preview> {
        self.log(format!("preview {node}"));
        self.inner.preview(node)
    }
}

pub fn recorded_sample() -> Arc<Recording<InMemoryDocuments>> {
    Recording::new(InMemoryDocuments::with_nodes(sample_nodes()))
}
