use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".claimtree-session.json")
}

impl Settings {
    /// `claimtree.toml` (optional), then `CLAIMTREE_*` variables, with a
    /// `.env` file loaded first if present.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("claimtree").required(false))
            .add_source(Environment::with_prefix("CLAIMTREE"))
            .build()
            .context("reading configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings: Settings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.api_url, "http://localhost:8000");
        assert_eq!(settings.log_level, "warn");
        assert!(settings.token.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "api_url = \"https://portal.example.com/api\"\ntoken = \"abc\"",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.api_url, "https://portal.example.com/api");
        assert_eq!(settings.token.as_deref(), Some("abc"));
    }
}
