//! The CLI's navigation state, kept between invocations in a JSON file.

use anyhow::Context;
use claimtree_core::{ClaimId, ViewState};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub claim: Option<ClaimId>,
    #[serde(default)]
    pub view: ViewState,
}

impl Session {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    pub fn open(&mut self, claim: ClaimId) {
        self.claim = Some(claim);
        self.view = ViewState::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(session, Session::default());
    }

    #[test]
    fn saves_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut session = Session::default();
        session.open(ClaimId::new("claim-9"));
        session.save(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), session);
    }
}
