//! The remote document service the tree model depends on.
//!
//! Calls block until the round trip completes. Mutations return the node
//! the server produced, but callers must re-list to learn the structure.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{ClaimId, DocumentNode, NodeId};

/// File content handed to [`DocumentService::upload_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            content_type: guess_content_type(&name).map(str::to_string),
            name,
            bytes,
        })
    }
}

/// Content type by file extension, for the handful of types the portal
/// previews or validates.
pub fn guess_content_type(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let ct = match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(ct)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewBody {
    Bytes(Vec<u8>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub content_type: String,
    pub body: PreviewBody,
}

pub trait DocumentService: Send + Sync {
    /// All nodes of a claim, flat or nested.
    fn list(&self, claim: &ClaimId) -> Result<Vec<DocumentNode>>;

    fn create_folder(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        name: &str,
    ) -> Result<DocumentNode>;

    fn upload_file(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        file: &FileUpload,
    ) -> Result<DocumentNode>;

    fn rename(&self, node: &NodeId, new_name: &str) -> Result<DocumentNode>;

    /// Whether descendants of a folder go too is up to the server.
    fn delete(&self, node: &NodeId) -> Result<()>;

    fn move_node(&self, node: &NodeId, new_parent: Option<&NodeId>) -> Result<DocumentNode>;

    fn download(&self, node: &NodeId) -> Result<Vec<u8>>;

    fn preview(&self, node: &NodeId) -> Result<Preview>;
}

impl<T: DocumentService + ?Sized> DocumentService for Arc<T> {
    fn list(&self, claim: &ClaimId) -> Result<Vec<DocumentNode>> {
        (**self).list(claim)
    }

    fn create_folder(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        name: &str,
    ) -> Result<DocumentNode> {
        (**self).create_folder(claim, parent, name)
    }

    fn upload_file(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        file: &FileUpload,
    ) -> Result<DocumentNode> {
        (**self).upload_file(claim, parent, file)
    }

    fn rename(&self, node: &NodeId, new_name: &str) -> Result<DocumentNode> {
        (**self).rename(node, new_name)
    }

    fn delete(&self, node: &NodeId) -> Result<()> {
        (**self).delete(node)
    }

    fn move_node(&self, node: &NodeId, new_parent: Option<&NodeId>) -> Result<DocumentNode> {
        (**self).move_node(node, new_parent)
    }

    fn download(&self, node: &NodeId) -> Result<Vec<u8>> {
        (**self).download(node)
    }

    fn preview(&self, node: &NodeId) -> Result<Preview> {
        (**self).preview(node)
    }
}
