use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure. Every field has a default, so shipping
/// without a config file is fine.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct MoverConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub dialog: DialogSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppSettings {
    /// Kill switch so an embedder can ship with the offer turned off.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_enabled() -> bool {
    true
}

/// Overrides for the discovered applications directories.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct PathSettings {
    #[serde(default)]
    pub system_dir: Option<PathBuf>,
    #[serde(default)]
    pub user_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct DialogSettings {
    /// Replaces the stock offer wording when set.
    #[serde(default)]
    pub message: Option<String>,
}

impl MoverConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Returns
    /// * `Ok(MoverConfig)` - Successfully parsed and validated config
    /// * `Err` - File not found, parse error, or validation error
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: MoverConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML from: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate that overrides are usable
    fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.paths.system_dir {
            if !dir.is_absolute() {
                anyhow::bail!("paths.system_dir must be an absolute path");
            }
        }

        if let Some(dir) = &self.paths.user_dir {
            if !dir.is_absolute() {
                anyhow::bail!("paths.user_dir must be an absolute path");
            }
        }

        if let Some(message) = &self.dialog.message {
            if message.trim().is_empty() {
                anyhow::bail!("dialog.message cannot be empty");
            }
        }

        Ok(())
    }
}
