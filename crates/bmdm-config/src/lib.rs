#![deny(unsafe_code)]

//! Archive configuration for bmdm.
//!
//! The archive keeps a flat TOML file recording who operates it:
//!
//! ```toml
//! name = "Ada Lovelace"
//! email = "ada@example.org"
//! ```
//!
//! [`ArchiveConfig`] is the in-memory form. Both keys are optional; an
//! archive that was never configured has neither.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// User identity attached to an archive.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Display name of the archive operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Contact email of the archive operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ArchiveConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error: it yields the default (empty) config,
    /// since `boot` creates the file lazily.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file absent, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: ArchiveConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate and write the configuration to `path`, replacing any
    /// previous content.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        std::fs::write(path, self.to_toml()?)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Render the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "name must not be empty".to_string(),
            ));
        }
        if let Some(email) = &self.email
            && !is_plausible_email(email)
        {
            return Err(ConfigError::Validation(format!(
                "email must look like local@domain, got {email:?}"
            )));
        }
        Ok(())
    }

    /// Human-readable attribution, e.g. `Ada Lovelace <ada@example.org>`.
    ///
    /// Returns `None` when no identity has been configured.
    pub fn attribution(&self) -> Option<String> {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => Some(format!("{name} <{email}>")),
            (Some(name), None) => Some(name.clone()),
            (None, Some(email)) => Some(format!("<{email}>")),
            (None, None) => None,
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
