use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub String);

impl ClaimId {
    pub fn new(id: impl Into<String>) -> Self {
        ClaimId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

/// Processing status. Owned by the server-side pipeline; the tree only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DocumentStatus {
    #[default]
    Uploaded,
    Processing,
    Validated,
    Error,
}

impl DocumentStatus {
    /// User-facing meaning of the status. `Uploaded` reads differently for
    /// folders (created) and files (queued for processing).
    pub fn describe(self, kind: NodeKind) -> &'static str {
        match (self, kind) {
            (DocumentStatus::Validated, _) => {
                "Document has been validated and meets requirements"
            }
            (DocumentStatus::Processing, _) => "Document is being processed, please wait",
            (DocumentStatus::Error, _) => {
                "Document processing failed, needs to be re-uploaded or fixed"
            }
            (DocumentStatus::Uploaded, NodeKind::Folder) => "Folder has been created successfully",
            (DocumentStatus::Uploaded, NodeKind::File) => {
                "Document uploaded, waiting for system processing"
            }
        }
    }

    pub fn is_settled(self, kind: NodeKind) -> bool {
        matches!(
            (self, kind),
            (DocumentStatus::Validated, _) | (DocumentStatus::Uploaded, NodeKind::Folder)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Uploaded => "Uploaded",
            DocumentStatus::Processing => "Processing",
            DocumentStatus::Validated => "Validated",
            DocumentStatus::Error => "Error",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub claim_id: ClaimId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_icon: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::option"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "timestamp::required")]
    pub updated_at: DateTime<Utc>,
    /// Pre-nested subtree, present only when the source returns nested nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    pub fn folder(id: &str, claim: &ClaimId, parent: Option<&str>, name: &str) -> Self {
        Self::bare(id, claim, parent, name, NodeKind::Folder)
    }

    pub fn file(id: &str, claim: &ClaimId, parent: Option<&str>, name: &str) -> Self {
        Self::bare(id, claim, parent, name, NodeKind::File)
    }

    fn bare(id: &str, claim: &ClaimId, parent: Option<&str>, name: &str, kind: NodeKind) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::new(id),
            name: name.to_string(),
            kind,
            claim_id: claim.clone(),
            parent_id: parent.map(NodeId::new),
            status: DocumentStatus::Uploaded,
            file_type: None,
            file_url: None,
            status_message: None,
            status_icon: None,
            created_at: Some(now),
            updated_at: now,
            children: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn category(&self) -> FileCategory {
        FileCategory::of(self)
    }

    /// Copy of the node with any nested `children` dropped.
    pub fn detached(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }
}

/// Icon/preview category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Folder,
    Image,
    Text,
    Other,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "svg"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "pdf", "doc", "docx", "csv", "json"];

impl FileCategory {
    pub fn of(node: &DocumentNode) -> Self {
        if node.is_folder() {
            return FileCategory::Folder;
        }
        let ext = node
            .file_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .or_else(|| {
                node.name
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_lowercase())
            });
        match ext.as_deref() {
            Some(e) if IMAGE_EXTENSIONS.contains(&e) => FileCategory::Image,
            Some(e) if TEXT_EXTENSIONS.contains(&e) => FileCategory::Text,
            _ => FileCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    InProgress,
    ActionRequired,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: ClaimId,
    pub name: String,
    pub status: ClaimStatus,
    #[serde(alias = "template_type")]
    pub template_type: String,
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(alias = "created_at", deserialize_with = "timestamp::required")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updated_at", deserialize_with = "timestamp::required")]
    pub updated_at: DateTime<Utc>,
}

/// Timestamps arrive either as RFC 3339 or as naive ISO 8601 without an
/// offset. Naive values are UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer};

    pub(super) fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| s.parse::<NaiveDateTime>().map(|t| Utc.from_utc_datetime(&t)))
    }

    pub(super) fn required<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(de)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(super) fn option<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(de)?
            .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
