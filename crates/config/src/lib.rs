//! User configuration for the hot-swap floating toolbar.
//!
//! Settings live in a TOML file under the platform configuration directory. A missing file is
//! not an error: the defaults are used instead.

use std::path::{Path, PathBuf};

use eyre::Context;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "hotswap-toolbar";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hotswap: HotSwapSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotSwapSettings {
    /// Show the floating "code changed" toolbar in the main editor
    pub floating_toolbar: bool,
}

impl Default for HotSwapSettings {
    fn default() -> Self {
        Self {
            floating_toolbar: true,
        }
    }
}

impl Settings {
    /// Default location of the settings file, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(FILE_NAME))
    }

    /// Load from the default location, falling back to the defaults
    pub fn load() -> eyre::Result<Self> {
        let Some(path) = Self::default_path() else {
            tracing::debug!("no configuration directory available, using defaults");
            return Ok(Self::default());
        };

        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings = Self::from_toml_str(&contents)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?settings, "settings loaded");
        Ok(settings)
    }

    pub fn from_toml_str(s: &str) -> eyre::Result<Self> {
        let settings = toml::from_str(s).context("deserializing settings")?;
        Ok(settings)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("creating settings directory")?;
        }
        let contents = toml::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, contents)
            .with_context(|| format!("writing settings file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floating_toolbar_enabled_by_default() {
        assert!(Settings::default().hotswap.floating_toolbar);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn disable_floating_toolbar() {
        let settings = Settings::from_toml_str(
            r#"
            [hotswap]
            floating_toolbar = false
            "#,
        )
        .unwrap();
        assert!(!settings.hotswap.floating_toolbar);
    }

    #[test]
    fn invalid_value_is_rejected() {
        let result = Settings::from_toml_str(
            r#"
            [hotswap]
            floating_toolbar = "sometimes"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn save_to_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let settings = Settings {
            hotswap: HotSwapSettings {
                floating_toolbar: false,
            },
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load_from(dir.path().join("missing.toml"));
        assert!(result.is_err());
    }
}
