//! RT connection profiles stored as YAML.
//!
//! ```yaml
//! default_profile: helpdesk
//! profiles:
//!   helpdesk:
//!     base_url: https://rt.example.com
//!     token: 1-14-abcdef
//! ```

use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable consulted when a profile carries no token.
pub const TOKEN_ENV_VAR: &str = "RT_TOKEN";

const CONFIG_DIR: &str = ".rt-rest2";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// `~/.rt-rest2/config.yaml`, or `None` without a home directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location; an absent file or home directory
    /// yields an empty config.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!(path = %path.display(), "No RT config file");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Unable to read RT config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in RT config {}", path.display()))?;

        debug!(path = %path.display(), profiles = config.profiles.len(), "Loaded RT config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Unable to create {}", dir.display()))?;
        }

        let yaml = serde_yaml::to_string(self).context("Unable to serialize RT config")?;
        fs::write(path, yaml)
            .with_context(|| format!("Unable to write RT config {}", path.display()))
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Pick a profile by explicit name, then `default_profile`, then the
    /// alphabetically first entry.
    pub fn resolve_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Option<(&'a str, &'a Profile)> {
        match requested.or(self.default_profile.as_deref()) {
            Some(name) => self.profiles.get(name).map(|profile| (name, profile)),
            None => self
                .profiles
                .iter()
                .next()
                .map(|(name, profile)| (name.as_str(), profile)),
        }
    }
}

/// Connection settings for one RT server. The token may be left out and
/// supplied through `RT_TOKEN` instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Profile {
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Profile {
    pub fn token_or_env(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| env::var(TOKEN_ENV_VAR).ok())
            .filter(|token| !token.is_empty())
    }
}
