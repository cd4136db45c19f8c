//! Server configuration.
//!
//! Loaded from `teto.toml` (default: the platform config dir, e.g.
//! `~/.config/teto/teto.toml`). Environment variables override the file,
//! CLI flags override both. Every field has a default, so a missing file
//! is not an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::generate;
use crate::search;

const CONFIG_FILE_NAME: &str = "teto.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body (upload) size in MiB.
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
    /// Optional directory of front-end assets served for unmatched paths.
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_mb: default_body_limit_mb(),
            static_dir: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_body_limit_mb() -> usize {
    100
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root holding `videos/` and `materials/`.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
        }
    }
}

fn default_uploads_dir() -> String {
    "./uploads".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_search_url() -> String {
    "https://www.google.com/search".into()
}
fn default_user_agent() -> String {
    search::DEFAULT_USER_AGENT.into()
}

/// `[generator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Prefer `GEMINI_API_KEY` in the environment over storing it here.
    #[serde(default)]
    pub api_key: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_generator_base_url(),
            model: default_model(),
            api_key: String::new(),
        }
    }
}

fn default_generator_base_url() -> String {
    generate::DEFAULT_BASE_URL.into()
}
fn default_model() -> String {
    generate::DEFAULT_MODEL.into()
}

impl Config {
    /// Default config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "teto")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(PathBuf::from(
                shellexpand::tilde(&p.to_string_lossy()).into_owned(),
            )),
            None => Self::default_path(),
        };
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("Failed to read config {}", p.display()))?;
                let parsed = Self::from_toml(&raw)
                    .with_context(|| format!("Failed to parse config {}", p.display()))?;
                tracing::debug!(path = %p.display(), "Loaded config file");
                parsed
            }
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `PORT`, `GEMINI_API_KEY` and `TETO_UPLOADS_DIR` overrides.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(key) = var("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            self.generator.api_key = key;
        }
        if let Some(dir) = var("TETO_UPLOADS_DIR").filter(|d| !d.is_empty()) {
            self.storage.uploads_dir = dir;
        }
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.server.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.body_limit_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.generator.model, "gemini-1.5-flash");
        assert_eq!(config.storage.uploads_dir, "./uploads");
    }

    #[test]
    fn huge_body_limit_saturates() {
        let mut config = Config::default();
        config.server.body_limit_mb = usize::MAX / 2;
        assert_eq!(config.body_limit_bytes(), usize::MAX);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [generator]
            model = "gemini-2.5-flash"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.generator.model, "gemini-2.5-flash");
        assert_eq!(config.search.search_url, "https://www.google.com/search");
    }

    #[test]
    fn malformed_toml_errors() {
        assert!(Config::from_toml("[server\nport = ").is_err());
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "PORT" => Some("5001".into()),
            "GEMINI_API_KEY" => Some("secret".into()),
            "TETO_UPLOADS_DIR" => Some("/srv/uploads".into()),
            _ => None,
        });
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.generator.api_key, "secret");
        assert_eq!(config.storage.uploads_dir, "/srv/uploads");

        config.apply_env(|key| (key == "PORT").then(|| "not-a-port".into()));
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("teto.toml");
        std::fs::write(&path, "[server]\nbody_limit_mb = 5\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.body_limit_mb, 5);

        let missing = Config::load(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(missing.server.body_limit_mb, 100);
    }
}
