//! In-process [`DocumentService`] holding one claim set of nodes behind a
//! mutex. Mirrors the remote API closely enough to drive the explorer
//! without a server.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::model::{ClaimId, DocumentNode, DocumentStatus, NodeId, NodeKind};
use crate::service::{guess_content_type, DocumentService, FileUpload, Preview, PreviewBody};
use crate::tree::DocumentTree;

/// What happens to the contents of a deleted folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    #[default]
    Cascade,
    /// Descendants stay behind with a dangling `parentId`.
    Orphan,
}

/// Shape of the `list` answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListShape {
    #[default]
    Flat,
    /// Roots with nested `children`, like the portal's API.
    Nested,
}

#[derive(Default)]
struct Store {
    nodes: Vec<DocumentNode>,
    blobs: HashMap<NodeId, (String, Vec<u8>)>,
    next_id: u64,
    failing: HashSet<NodeId>,
}

impl Store {
    fn position(&self, id: &NodeId) -> Result<usize> {
        if self.failing.contains(id) {
            return Err(Error::RequestFailed {
                status: 500,
                message: format!("simulated failure for {id}"),
            });
        }
        self.nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| Error::RequestFailed {
                status: 404,
                message: "Document not found".to_string(),
            })
    }

    fn check_parent(&self, claim: &ClaimId, parent: Option<&NodeId>) -> Result<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        match self.nodes.iter().find(|n| &n.id == parent && &n.claim_id == claim) {
            Some(n) if n.kind == NodeKind::Folder => Ok(()),
            Some(_) => Err(Error::RequestFailed {
                status: 400,
                message: "Target must be a folder".to_string(),
            }),
            None => Err(Error::RequestFailed {
                status: 404,
                message: "Parent folder not found".to_string(),
            }),
        }
    }

    fn mint(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(format!("doc-{}", self.next_id))
    }
}

#[derive(Default)]
pub struct InMemoryDocuments {
    store: Mutex<Store>,
    delete_policy: DeletePolicy,
    shape: ListShape,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<DocumentNode>) -> Self {
        let svc = Self::default();
        svc.store.lock().nodes = nodes;
        svc
    }

    pub fn delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn list_shape(mut self, shape: ListShape) -> Self {
        self.shape = shape;
        self
    }

    /// Make every later call touching `id` fail with a 500.
    pub fn fail_on(&self, id: impl Into<NodeId>) {
        self.store.lock().failing.insert(id.into());
    }

    pub fn snapshot(&self) -> Vec<DocumentNode> {
        self.store.lock().nodes.clone()
    }

    /// Small sample claim used by the CLI's offline mode.
    pub fn demo(claim: &ClaimId) -> Self {
        let mut nodes = vec![
            DocumentNode::folder("doc-1", claim, None, "Import Entries"),
            DocumentNode::folder("doc-2", claim, None, "Export Evidence"),
            DocumentNode::folder("doc-3", claim, Some("doc-1"), "2024"),
            DocumentNode::file("doc-4", claim, Some("doc-3"), "entry-7501.pdf"),
            DocumentNode::file("doc-5", claim, Some("doc-2"), "bill-of-lading.png"),
            DocumentNode::file("doc-6", claim, None, "notes.txt"),
        ];
        nodes[3].status = DocumentStatus::Validated;
        nodes[4].status = DocumentStatus::Processing;
        let svc = Self::with_nodes(nodes);
        {
            let mut store = svc.store.lock();
            store.next_id = 6;
            store.blobs.insert(
                NodeId::from("doc-6"),
                ("text/plain".to_string(), b"Drawback claim notes\n".to_vec()),
            );
        }
        svc
    }
}

impl DocumentService for InMemoryDocuments {
    fn list(&self, claim: &ClaimId) -> Result<Vec<DocumentNode>> {
        let nodes: Vec<DocumentNode> = self
            .store
            .lock()
            .nodes
            .iter()
            .filter(|n| &n.claim_id == claim)
            .cloned()
            .collect();
        Ok(match self.shape {
            ListShape::Flat => nodes,
            ListShape::Nested => DocumentTree::from_nodes(&nodes).nest(),
        })
    }

    fn create_folder(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        name: &str,
    ) -> Result<DocumentNode> {
        let mut store = self.store.lock();
        store.check_parent(claim, parent)?;
        let id = store.mint();
        let node = DocumentNode::folder(id.as_str(), claim, parent.map(NodeId::as_str), name);
        store.nodes.push(node.clone());
        Ok(node)
    }

    fn upload_file(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        file: &FileUpload,
    ) -> Result<DocumentNode> {
        let mut store = self.store.lock();
        store.check_parent(claim, parent)?;
        let id = store.mint();
        let mut node =
            DocumentNode::file(id.as_str(), claim, parent.map(NodeId::as_str), &file.name);
        node.file_type = file
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase());
        let content_type = file
            .content_type
            .clone()
            .or_else(|| guess_content_type(&file.name).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        store.blobs.insert(id, (content_type, file.bytes.clone()));
        store.nodes.push(node.clone());
        Ok(node)
    }

    fn rename(&self, node: &NodeId, new_name: &str) -> Result<DocumentNode> {
        let mut store = self.store.lock();
        let pos = store.position(node)?;
        let entry = &mut store.nodes[pos];
        entry.name = new_name.to_string();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn delete(&self, node: &NodeId) -> Result<()> {
        let mut store = self.store.lock();
        store.position(node)?;
        let mut doomed: HashSet<NodeId> = HashSet::from([node.clone()]);
        if self.delete_policy == DeletePolicy::Cascade {
            loop {
                let more: Vec<NodeId> = store
                    .nodes
                    .iter()
                    .filter(|n| !doomed.contains(&n.id))
                    .filter(|n| n.parent_id.as_ref().is_some_and(|p| doomed.contains(p)))
                    .map(|n| n.id.clone())
                    .collect();
                if more.is_empty() {
                    break;
                }
                doomed.extend(more);
            }
        }
        store.nodes.retain(|n| !doomed.contains(&n.id));
        store.blobs.retain(|id, _| !doomed.contains(id));
        Ok(())
    }

    fn move_node(&self, node: &NodeId, new_parent: Option<&NodeId>) -> Result<DocumentNode> {
        let mut store = self.store.lock();
        let pos = store.position(node)?;
        let claim = store.nodes[pos].claim_id.clone();
        store.check_parent(&claim, new_parent)?;
        let entry = &mut store.nodes[pos];
        entry.parent_id = new_parent.cloned();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn download(&self, node: &NodeId) -> Result<Vec<u8>> {
        let store = self.store.lock();
        let pos = store.position(node)?;
        if store.nodes[pos].kind != NodeKind::File {
            return Err(Error::RequestFailed {
                status: 404,
                message: "File not found".to_string(),
            });
        }
        Ok(store
            .blobs
            .get(node)
            .map(|(_, bytes)| bytes.clone())
            .unwrap_or_default())
    }

    fn preview(&self, node: &NodeId) -> Result<Preview> {
        let bytes = self.download(node)?;
        let content_type = self
            .store
            .lock()
            .blobs
            .get(node)
            .map(|(ct, _)| ct.clone())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let body = if crate::http::is_textual(&content_type) {
            PreviewBody::Text(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            PreviewBody::Bytes(bytes)
        };
        Ok(Preview { content_type, body })
    }
}
