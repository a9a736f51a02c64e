//! [`DocumentService`] over the portal's REST API.

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::{IntoUrl, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Claim, ClaimId, DocumentNode, NodeId};
use crate::service::{DocumentService, FileUpload, Preview, PreviewBody};

#[derive(Clone)]
pub struct HttpDocumentService {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for HttpDocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentService")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpDocumentService {
    pub fn new(base_url: impl IntoUrl, token: Option<String>) -> Result<Self> {
        let base_url = base_url.into_url()?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .user_agent(concat!("claimtree/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Bearer token, or `AuthenticationMissing` before anything is sent.
    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(Error::AuthenticationMissing)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.bearer_auth(self.token()?).send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(Error::RequestFailed {
            status: status.as_u16(),
            message: error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
        })
    }

    fn decode<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let body = self.send(req)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn list_claims(&self) -> Result<Vec<Claim>> {
        self.token()?;
        let url = self.url(&["claims", ""])?;
        debug!(%url, "GET");
        self.decode(self.client.get(url))
    }
}

/// The API reports failures as `{"detail": "..."}`.
fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Detail {
        detail: serde_json::Value,
    }
    let detail = serde_json::from_str::<Detail>(body).ok()?.detail;
    Some(match detail {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

impl DocumentService for HttpDocumentService {
    fn list(&self, claim: &ClaimId) -> Result<Vec<DocumentNode>> {
        self.token()?;
        let url = self.url(&["documents", "claims", claim.as_str(), "documents"])?;
        debug!(%url, "GET");
        self.decode(self.client.get(url))
    }

    fn create_folder(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        name: &str,
    ) -> Result<DocumentNode> {
        self.token()?;
        let mut form = multipart::Form::new()
            .text("claim_id", claim.0.clone())
            .text("name", name.to_string());
        if let Some(parent) = parent {
            form = form.text("parent_id", parent.0.clone());
        }
        let url = self.url(&["documents", "folder"])?;
        debug!(%claim, folder = name, %url, "POST");
        self.decode(self.client.post(url).multipart(form))
    }

    fn upload_file(
        &self,
        claim: &ClaimId,
        parent: Option<&NodeId>,
        file: &FileUpload,
    ) -> Result<DocumentNode> {
        self.token()?;
        let mut part = multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(ct) = &file.content_type {
            part = part.mime_str(ct)?;
        }
        let mut form = multipart::Form::new()
            .part("file", part)
            .text("claim_id", claim.0.clone());
        if let Some(parent) = parent {
            form = form.text("parent_id", parent.0.clone());
        }
        let url = self.url(&["documents", "upload"])?;
        debug!(%claim, file = %file.name, bytes = file.bytes.len(), %url, "POST");
        self.decode(self.client.post(url).multipart(form))
    }

    fn rename(&self, node: &NodeId, new_name: &str) -> Result<DocumentNode> {
        self.token()?;
        let url = self.url(&["documents", node.as_str()])?;
        debug!(%url, new_name, "PATCH");
        self.decode(self.client.patch(url).json(&json!({ "name": new_name })))
    }

    fn delete(&self, node: &NodeId) -> Result<()> {
        self.token()?;
        let url = self.url(&["documents", node.as_str()])?;
        debug!(%url, "DELETE");
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn move_node(&self, node: &NodeId, new_parent: Option<&NodeId>) -> Result<DocumentNode> {
        self.token()?;
        let url = self.url(&["documents", node.as_str(), "move"])?;
        debug!(%url, new_parent = ?new_parent, "PATCH");
        let mut req = self.client.patch(url);
        if let Some(parent) = new_parent {
            req = req.query(&[("new_parent_id", parent.as_str())]);
        }
        self.decode(req)
    }

    fn download(&self, node: &NodeId) -> Result<Vec<u8>> {
        self.token()?;
        let url = self.url(&["documents", node.as_str(), "download"])?;
        debug!(%url, "GET");
        let bytes = self.send(self.client.get(url))?.bytes()?;
        Ok(bytes.to_vec())
    }

    fn preview(&self, node: &NodeId) -> Result<Preview> {
        self.token()?;
        let url = self.url(&["documents", node.as_str(), "preview"])?;
        debug!(%url, "GET");
        let resp = self.send(self.client.get(url))?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = if is_textual(&content_type) {
            PreviewBody::Text(resp.text()?)
        } else {
            PreviewBody::Bytes(resp.bytes()?.to_vec())
        };
        Ok(Preview { content_type, body })
    }
}

pub(crate) fn is_textual(content_type: &str) -> bool {
    content_type.contains("text/") || content_type.contains("json")
}
