//! TOML-based gate configuration.
//!
//! Stores the reveal source and the teaser screen defaults:
//! - `reveal.reveal_at`: RFC 3339 instant for network-free deployments
//! - `reveal.status_url`: backend endpoint for remote-authoritative ones
//! - `screen.*`: display defaults used until a status document overrides them
//!
//! Configuration is stored at `~/.config/revealgate/config.toml`.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GateError};
use crate::gate::{HttpStatusFetcher, RevealSource};
use crate::status::ScreenConfig;

/// Which moment (or which backend) decides the reveal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevealSettings {
    /// RFC 3339 reveal instant. Selects the local strategy.
    #[serde(default)]
    pub reveal_at: Option<String>,
    /// Status endpoint URL. Selects the remote strategy; wins over
    /// `reveal_at` when both are set -- the strategies are never merged.
    #[serde(default)]
    pub status_url: Option<String>,
}

impl RevealSettings {
    /// The configured reveal instant in epoch milliseconds, if any.
    pub fn reveal_at_ms(&self) -> Result<Option<u64>, ConfigError> {
        let Some(raw) = &self.reveal_at else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| ConfigError::InvalidValue {
            key: "reveal.reveal_at".into(),
            message: e.to_string(),
        })?;
        let ms = u64::try_from(parsed.timestamp_millis()).map_err(|_| {
            ConfigError::InvalidValue {
                key: "reveal.reveal_at".into(),
                message: "instant precedes the Unix epoch".into(),
            }
        })?;
        Ok(Some(ms))
    }
}

/// Gate configuration.
///
/// Serialized to/from TOML at `~/.config/revealgate/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub reveal: RevealSettings,
    #[serde(default)]
    pub screen: ScreenConfig,
}

impl GateConfig {
    fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("revealgate"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Path of the config file on this machine.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Self::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load from disk, returning defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Build the reveal source this deployment is configured for.
    pub fn reveal_source(&self) -> Result<RevealSource, GateError> {
        if let Some(url) = &self.reveal.status_url {
            let fetcher = HttpStatusFetcher::new(url)?;
            return Ok(RevealSource::Remote {
                fetcher: Box::new(fetcher),
            });
        }
        if let Some(reveal_at_ms) = self.reveal.reveal_at_ms()? {
            return Ok(RevealSource::Local { reveal_at_ms });
        }
        Err(ConfigError::NoRevealSource.into())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let value = json_value_by_path(&json, key)?;
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

fn json_value_by_path<'a>(
    root: &'a serde_json::Value,
    key: &str,
) -> Option<&'a serde_json::Value> {
    if key.is_empty() {
        return None;
    }
    let mut current = root;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn set_json_value_by_path(
    root: &mut serde_json::Value,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let mut parts = key.split('.').peekable();
    if parts.peek().is_none() {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }

    let mut current = root;
    while let Some(part) = parts.next() {
        let is_leaf = parts.peek().is_none();
        if is_leaf {
            let object = current
                .as_object_mut()
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            let existing = object
                .get(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(value.parse().map_err(
                    |_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("cannot parse '{value}' as bool"),
                    },
                )?),
                serde_json::Value::Number(_) => {
                    let n: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("cannot parse '{value}' as number"),
                    })?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: e.to_string(),
                    })?
                }
                // Strings and unset optionals both take the raw text.
                _ => serde_json::Value::String(value.into()),
            };

            object.insert(part.to_string(), new_value);
            return Ok(());
        }

        current = current
            .get_mut(part)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    }

    Err(ConfigError::UnknownKey(key.to_string()))
}
