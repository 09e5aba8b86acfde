//! Client configuration
//!
//! Loaded from a JSON file with serde defaults, then validated. Every field
//! except `url` is optional.
//!
//! ```json
//! {
//!   "url": "https://db.example.com:7473/db/data/",
//!   "username": "neo4j",
//!   "password": "secret",
//!   "timeout_ms": 30000
//! }
//! ```

use std::env;
use std::fs;
use std::path::Path;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Environment variable naming a PEM file of extra trusted CA certificates
pub const CA_CERTS_ENV: &str = "CACERTSFILE";

/// Connection settings for a [`Database`](crate::Database)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service root URL (default: "http://localhost:7474/db/data/")
    #[serde(default = "default_url")]
    pub url: String,

    /// Basic auth user; overrides credentials embedded in `url`
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// User-Agent header (default: "cypherlink")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout enforced by the transport
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// PEM file of extra trusted roots; falls back to `CACERTSFILE`
    #[serde(default)]
    pub ca_cert_file: Option<String>,

    /// Skip TLS certificate verification (default: false)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_url() -> String {
    "http://localhost:7474/db/data/".to_string()
}

fn default_user_agent() -> String {
    "cypherlink".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            user_agent: default_user_agent(),
            timeout_ms: None,
            ca_cert_file: None,
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    /// Config pointing at `url`, everything else defaulted
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: ClientConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate field combinations
    pub fn validate(&self) -> Result<()> {
        let url = self.parsed_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "Unsupported URL scheme '{}'. Only http and https are allowed.",
                url.scheme()
            )));
        }

        if self.timeout_ms == Some(0) {
            return Err(Error::Config("timeout_ms must be > 0".to_string()));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(Error::Config(
                "password is set but username is missing".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("user_agent must not be empty".to_string()));
        }

        Ok(())
    }

    /// Service root URL with any embedded credentials stripped
    pub fn service_root_url(&self) -> Result<String> {
        let mut url = self.parsed_url()?;
        // Only fails for cannot-be-a-base URLs, which validate() rejects.
        let _ = url.set_username("");
        let _ = url.set_password(None);
        Ok(url.to_string())
    }

    /// Effective basic auth credentials.
    ///
    /// Explicit `username`/`password` win; otherwise the userinfo of `url`.
    pub fn credentials(&self) -> Option<(String, String)> {
        if let Some(ref username) = self.username {
            return Some((username.clone(), self.password.clone().unwrap_or_default()));
        }
        let url = Url::parse(&self.url).ok()?;
        if url.username().is_empty() {
            return None;
        }
        Some((
            url.username().to_string(),
            url.password().unwrap_or_default().to_string(),
        ))
    }

    /// CA file from config, else from the environment
    pub fn resolved_ca_cert_file(&self) -> Option<String> {
        self.ca_cert_file
            .clone()
            .or_else(|| env::var(CA_CERTS_ENV).ok().filter(|v| !v.is_empty()))
    }

    fn parsed_url(&self) -> Result<Url> {
        Url::parse(&self.url).map_err(|e| Error::Config(format!("Invalid url '{}': {}", self.url, e)))
    }
}
