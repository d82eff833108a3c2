//! Client configuration: host, API key and workspace.
//!
//! # Design
//! `Config` is an immutable value. It can be built explicitly, from the
//! `MIXTO_*` environment variables, or from a JSON file (by default
//! `~/.mixto.json`). Resolution failures come back as
//! `Error::Configuration`; deciding whether to abort is the caller's job.
//!
//! The API key is never printed: `Debug` redacts it and the type is not
//! `Serialize`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

pub const ENV_HOST: &str = "MIXTO_HOST";
pub const ENV_API_KEY: &str = "MIXTO_API_KEY";
pub const ENV_WORKSPACE: &str = "MIXTO_WORKSPACE";

/// File name looked up in the user's home directory by `Config::load`.
pub const CONFIG_FILE_NAME: &str = ".mixto.json";

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    host: String,
    #[serde(default)]
    api_key: String,
    #[serde(default, alias = "workspace_id")]
    workspace: String,
}

impl Config {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            workspace: workspace.into(),
        }
    }

    /// Read `MIXTO_HOST`, `MIXTO_API_KEY` and `MIXTO_WORKSPACE`.
    pub fn from_env() -> Result<Self> {
        let config = Self::env_values();
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file with `host`, `api_key` and `workspace` keys.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Environment first; if the host or key is still missing, fill the gaps
    /// from `~/.mixto.json`.
    pub fn load() -> Result<Self> {
        let path = default_config_path();
        Self::load_with_fallback(path.as_deref())
    }

    pub(crate) fn load_with_fallback(fallback: Option<&Path>) -> Result<Self> {
        let mut config = Self::env_values();
        if config.host.is_empty() || config.api_key.is_empty() {
            let path = fallback.ok_or_else(|| {
                Error::Configuration("host or API key not set and no home directory found".to_string())
            })?;
            let file = Self::read_file(path)?;
            config.fill_missing(file);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the host is a usable base URL and the key is present.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration("API key is empty".to_string()));
        }
        Ok(())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The workspace for workspace-scoped operations; empty is an error.
    pub(crate) fn require_workspace(&self) -> Result<&str> {
        let workspace = self.workspace.trim();
        if workspace.is_empty() {
            return Err(Error::Configuration("workspace is not set".to_string()));
        }
        Ok(workspace)
    }

    pub(crate) fn base_url(&self) -> Result<Url> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(Error::Configuration("host is empty".to_string()));
        }
        let url = Url::parse(host).map_err(|e| Error::Configuration(format!("invalid host URL {host:?}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::Configuration(format!("host URL {host:?} cannot be a base")));
        }
        Ok(url)
    }

    fn env_values() -> Self {
        Self {
            host: env_var(ENV_HOST),
            api_key: env_var(ENV_API_KEY),
            workspace: env_var(ENV_WORKSPACE),
        }
    }

    fn read_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("cannot parse {}: {e}", path.display())))
    }

    fn fill_missing(&mut self, other: Self) {
        if self.host.is_empty() {
            self.host = other.host;
        }
        if self.api_key.is_empty() {
            self.api_key = other.api_key;
        }
        if self.workspace.is_empty() {
            self.workspace = other.workspace;
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("workspace", &self.workspace)
            .finish()
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

fn env_var(name: &str) -> String {
    std::env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}
