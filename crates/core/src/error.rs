use crate::model::NodeId;
use thiserror::Error;

/// Input rejected before any request is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("no items selected")]
    EmptySelection,
    #[error("no files selected, only files can be downloaded")]
    NoFilesSelected,
    #[error("cannot move {0} into itself")]
    MoveIntoSelf(NodeId),
    #[error("cannot move {node} into its own descendant {target}")]
    MoveIntoDescendant { node: NodeId, target: NodeId },
    #[error("{0} is not a folder")]
    TargetNotFolder(NodeId),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("not signed in: no API token available")]
    AuthenticationMissing,

    #[error("request failed: {status} {message}")]
    RequestFailed { status: u16, message: String },

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::ValidationFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
