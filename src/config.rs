use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "ImportConfig::default_tile_px")]
    pub tile_px: u32,
    #[serde(default = "ImportConfig::default_cache_root")]
    pub cache_root: PathBuf,
    #[serde(default = "ImportConfig::default_cache_index_name")]
    pub cache_index_name: String,
    #[serde(default = "ImportConfig::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "ImportConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportConfigOverrides {
    pub tile_px: Option<u32>,
    pub cache_root: Option<PathBuf>,
    pub api_key: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            tile_px: Self::default_tile_px(),
            cache_root: Self::default_cache_root(),
            cache_index_name: Self::default_cache_index_name(),
            api_base_url: Self::default_api_base_url(),
            api_key: None,
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}

impl ImportConfig {
    pub const API_KEY_ENV: &'static str = "GATHER_API_KEY";

    const fn default_tile_px() -> u32 {
        32
    }

    fn default_cache_root() -> PathBuf {
        PathBuf::from("gather-http-cache")
    }

    fn default_cache_index_name() -> String {
        "cache.json".to_string()
    }

    fn default_api_base_url() -> String {
        "https://api.gather.town".to_string()
    }

    const fn default_request_timeout_secs() -> u64 {
        30
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        cfg.validate().with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_px == 0 {
            bail!("tile_px must be greater than zero");
        }
        if self.cache_index_name.is_empty() || self.cache_index_name.contains(['/', '\\']) {
            bail!("cache_index_name must be a plain file name, got '{}'", self.cache_index_name);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ImportConfigOverrides) {
        if let Some(tile_px) = overrides.tile_px {
            self.tile_px = tile_px;
        }
        if let Some(cache_root) = &overrides.cache_root {
            self.cache_root = cache_root.clone();
        }
        if let Some(api_key) = &overrides.api_key {
            self.api_key = Some(api_key.clone());
        }
    }

    /// Cache root made absolute against the working directory so recorded
    /// asset paths stay valid from anywhere.
    pub fn absolute_cache_root(&self) -> Result<PathBuf> {
        if self.cache_root.is_absolute() {
            return Ok(self.cache_root.clone());
        }
        let cwd = env::current_dir().context("Failed to resolve the current directory")?;
        Ok(cwd.join(&self.cache_root))
    }

    /// Configured key, else the `GATHER_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| env::var(Self::API_KEY_ENV).ok()).filter(|key| !key.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ImportConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.tile_px.is_none() && self.cache_root.is_none() && self.api_key.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.tile_px.is_some() {
            fields.push("tile_px");
        }
        if self.cache_root.is_some() {
            fields.push("cache_root");
        }
        if self.api_key.is_some() {
            fields.push("api_key");
        }
        fields
    }
}
