//! Core error types for revealgate-core.
//!
//! Nothing in the gate is fatal: status failures degrade to a fail-closed
//! state, playback denials walk the retry ladder. These types exist so the
//! boundaries (fetcher, config, CLI) can still report precisely what went
//! wrong.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for revealgate-core.
#[derive(Error, Debug)]
pub enum GateError {
    /// Remote status document errors
    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors from fetching or decoding the remote reveal-status document.
///
/// All of these are absorbed inside the poller (§fail-closed); they surface
/// only from one-shot fetches.
#[derive(Error, Debug)]
pub enum StatusError {
    /// Transport-level failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered outside the 2xx range
    #[error("Status endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// Body was not a valid status document
    #[error("Malformed status document: {0}")]
    Parse(String),

    /// Endpoint URL could not be parsed
    #[error("Invalid status URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No reveal instant and no status URL configured
    #[error("No reveal source configured: set reveal.reveal_at or reveal.status_url")]
    NoRevealSource,

    /// Config directory could not be determined
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// Playback request denied by the runtime's autoplay policy.
///
/// Recovered locally by the retry ladder; never surfaced as a user-facing
/// error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("playback denied by runtime autoplay policy")]
pub struct PlaybackDenied;

/// Result type alias for GateError
pub type Result<T, E = GateError> = std::result::Result<T, E>;
