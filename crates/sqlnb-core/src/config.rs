/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project configuration (`_sqlnb.yml`).
 */

//! Project configuration.
//!
//! An optional `_sqlnb.yml` (or `_sqlnb.yaml`) next to the notebook, or in
//! any parent directory, tunes execution, the SQL session and image
//! rendering:
//!
//! ```yaml
//! execute:
//!   timeout: 600
//!   kernel: python3
//! session:
//!   territory: FRANCE
//!   language: FRENCH
//! images:
//!   delay: 5
//!   window-size: "1920,1080"
//! binaries:
//!   pandoc: /opt/pandoc/bin/pandoc
//! ```
//!
//! External tools are located from, in order: the `SQLNB_<TOOL>`
//! environment variable, `binaries.<tool>` in the config file, then `PATH`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::Result;
use crate::error::SqlnbError;

pub const CONFIG_FILE_NAMES: [&str; 2] = ["_sqlnb.yml", "_sqlnb.yaml"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SqlnbConfig {
    pub execute: ExecuteConfig,
    pub session: SessionSettings,
    pub images: ImageConfig,
    pub binaries: BinaryConfig,

    /// File this configuration was loaded from, if any.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExecuteConfig {
    /// Seconds allowed for a single cell.
    pub timeout: u64,
    pub kernel: String,
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            timeout: 600,
            kernel: "python3".to_string(),
        }
    }
}

/// Database session locale set before every query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionSettings {
    pub territory: String,
    pub language: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            territory: "FRANCE".to_string(),
            language: "FRENCH".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ImageConfig {
    /// Seconds to wait for the table page to render.
    pub delay: u64,
    /// Browser window size as `WIDTH,HEIGHT`.
    pub window_size: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            delay: 5,
            window_size: "1920,1080".to_string(),
        }
    }
}

impl ImageConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    pub fn window_size(&self) -> Result<(u32, u32)> {
        let parsed = self
            .window_size
            .split_once(',')
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));
        match parsed {
            Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(SqlnbError::config(format!(
                "images.window-size must be WIDTH,HEIGHT, got '{}'",
                self.window_size
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BinaryConfig {
    pub pandoc: Option<PathBuf>,
    pub jupyter: Option<PathBuf>,
    pub chromium: Option<PathBuf>,
    pub magick: Option<PathBuf>,
}

impl SqlnbConfig {
    /// Find and load the configuration for a notebook.
    ///
    /// Searches the notebook's directory and its parents; falls back to the
    /// defaults when no file is found.
    pub fn discover(notebook: &Path) -> Result<Self> {
        let start = if notebook.is_dir() {
            Some(notebook)
        } else {
            notebook.parent()
        };
        let mut current = start.map(Path::to_path_buf);

        while let Some(dir) = current {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Self::load(&candidate);
                }
            }
            current = dir.parent().map(Path::to_path_buf);
        }

        tracing::debug!("No _sqlnb.yml found, using defaults");
        Ok(Self::default())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlnbError::resource(path, format!("cannot read configuration: {e}")))?;
        let mut config = Self::from_yaml_str(&content).map_err(|e| match e {
            SqlnbError::Configuration { message, .. } => {
                SqlnbError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        config.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty file is a valid, empty configuration
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| SqlnbError::config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.execute.timeout == 0 {
            return Err(SqlnbError::config("execute.timeout must be positive"));
        }
        if self.execute.kernel.trim().is_empty() {
            return Err(SqlnbError::config("execute.kernel must not be empty"));
        }
        validate_session_word("session.territory", &self.session.territory)?;
        validate_session_word("session.language", &self.session.language)?;
        self.images.window_size()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.execute.timeout)
    }

    pub fn pandoc(&self) -> Option<PathBuf> {
        find_binary("SQLNB_PANDOC", self.binaries.pandoc.as_deref(), &["pandoc"])
    }

    pub fn jupyter(&self) -> Option<PathBuf> {
        find_binary("SQLNB_JUPYTER", self.binaries.jupyter.as_deref(), &["jupyter"])
    }

    pub fn chromium(&self) -> Option<PathBuf> {
        find_binary(
            "SQLNB_CHROMIUM",
            self.binaries.chromium.as_deref(),
            &[
                "chromium",
                "chromium-browser",
                "google-chrome",
                "google-chrome-stable",
            ],
        )
    }

    pub fn magick(&self) -> Option<PathBuf> {
        find_binary("SQLNB_MAGICK", self.binaries.magick.as_deref(), &["magick"])
    }
}

/// Session values are spliced into `ALTER SESSION` statements.
fn validate_session_word(key: &str, value: &str) -> Result<()> {
    let valid = !value.trim().is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SqlnbError::config(format!(
            "{key} must contain only letters, spaces, '_' or '-', got '{value}'"
        )))
    }
}

/// Locate an external tool.
///
/// Checks the environment variable, then the configured path, then each
/// candidate name on `PATH`.
pub fn find_binary(env_var: &str, configured: Option<&Path>, names: &[&str]) -> Option<PathBuf> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value));
        }
    }
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    names.iter().find_map(|name| which::which(name).ok())
}
