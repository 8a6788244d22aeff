//! Error types for the Playbook Watcher core library.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Provision | Bot account, token lookup, token minting and persistence |
//! | E2001-E2099 | Config | Configuration file, environment and validation errors |
//! | E3001-E3099 | Upstream | Playbooks API transport, status and decoding errors |
//! | E4001-E4099 | Plugin | Plugin lifecycle and host server errors |
//! | E9001-E9099 | General | Internal, IO and serialization errors |

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    // ========================================================================
    // Provision Errors (E1001-E1099)
    // ========================================================================
    /// The host refused to create or look up the bot principal
    #[error("[E1001] Failed to ensure bot '{username}': {message}")]
    BotEnsureFailed { username: String, message: String },

    /// Reading the persisted token from the key-value store failed
    #[error("[E1002] Failed to read bot token from key '{key}': {message}")]
    TokenLookupFailed { key: String, message: String },

    /// The host refused to mint an access token
    #[error("[E1003] Failed to create access token for bot '{bot_id}': {message}")]
    TokenCreateFailed { bot_id: String, message: String },

    /// Writing the freshly minted token to the key-value store failed
    #[error("[E1004] Failed to persist bot token under key '{key}': {message}")]
    TokenPersistFailed { key: String, message: String },

    /// A call against the host REST API returned an error status
    #[error("[E1005] Host API request failed with status {status}: {message}")]
    HostRequestFailed { status: u16, message: String },

    // ========================================================================
    // Configuration Errors (E2001-E2099)
    // ========================================================================
    /// Required configuration value is missing
    #[error("[E2001] Missing required configuration: {0}")]
    MissingConfig(String),

    /// Invalid configuration value
    #[error("[E2002] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    /// Configuration source could not be parsed
    #[error("[E2003] Failed to parse configuration: {0}")]
    ConfigParseError(String),

    // ========================================================================
    // Upstream Errors (E3001-E3099)
    // ========================================================================
    /// Transport-level failure talking to the playbooks API
    #[error("[E3001] Upstream request failed: {0}")]
    ApiRequestFailed(String),

    /// Upstream answered with a non-success status
    #[error("[E3002] Upstream returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    /// Upstream body was not the expected JSON
    #[error("[E3003] Failed to parse upstream response: {0}")]
    ApiParseError(String),

    /// Upstream could not be reached
    #[error("[E3004] Upstream service unavailable: {0}")]
    ApiServiceUnavailable(String),

    /// The configured request deadline elapsed
    #[error("[E3005] Upstream request timed out: {0}")]
    UpstreamTimeout(String),

    // ========================================================================
    // Plugin Errors (E4001-E4099)
    // ========================================================================
    /// Operation requires an active plugin
    #[error("[E4001] Plugin '{0}' is not active")]
    PluginNotActive(String),

    /// Activation requested twice
    #[error("[E4002] Plugin '{0}' is already active")]
    PluginAlreadyActive(String),

    /// The standalone host could not bind its listener
    #[error("[E4003] Failed to bind server on '{address}': {message}")]
    ServerBindFailed { address: String, message: String },

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    #[error("[E9001] Internal error: {0}")]
    Internal(String),

    #[error("[E9002] IO error: {0}")]
    IoError(String),

    #[error("[E9003] Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for Playbook Watcher operations.
pub type WatcherResult<T> = Result<T, WatcherError>;

impl From<reqwest::Error> for WatcherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WatcherError::UpstreamTimeout(err.to_string())
        } else if err.is_connect() {
            WatcherError::ApiServiceUnavailable(err.to_string())
        } else if err.is_status() {
            match err.status() {
                Some(status) => WatcherError::ApiStatus {
                    status: status.as_u16(),
                    message: err.to_string(),
                },
                None => WatcherError::ApiRequestFailed(err.to_string()),
            }
        } else if err.is_decode() {
            WatcherError::ApiParseError(err.to_string())
        } else {
            WatcherError::ApiRequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WatcherError {
    fn from(err: serde_json::Error) -> Self {
        WatcherError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for WatcherError {
    fn from(err: std::io::Error) -> Self {
        WatcherError::IoError(err.to_string())
    }
}

impl From<config::ConfigError> for WatcherError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => WatcherError::MissingConfig(key),
            config::ConfigError::FileParse { uri, cause } => WatcherError::ConfigParseError(
                format!("Failed to parse {}: {}", uri.unwrap_or_default(), cause),
            ),
            config::ConfigError::Type {
                origin,
                unexpected,
                expected,
                key,
            } => WatcherError::InvalidConfigValue {
                key: key.unwrap_or_else(|| origin.map(|o| o.to_string()).unwrap_or_default()),
                message: format!("Expected {}, got {}", expected, unexpected),
            },
            _ => WatcherError::ConfigParseError(err.to_string()),
        }
    }
}

impl WatcherError {
    /// Returns true for failures that abort plugin activation.
    pub fn is_provision_error(&self) -> bool {
        matches!(
            self,
            WatcherError::BotEnsureFailed { .. }
                | WatcherError::TokenLookupFailed { .. }
                | WatcherError::TokenCreateFailed { .. }
                | WatcherError::TokenPersistFailed { .. }
                | WatcherError::HostRequestFailed { .. }
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WatcherError::MissingConfig(_)
                | WatcherError::InvalidConfigValue { .. }
                | WatcherError::ConfigParseError(_)
        )
    }

    /// Returns true for failures talking to the playbooks API.
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            WatcherError::ApiRequestFailed(_)
                | WatcherError::ApiStatus { .. }
                | WatcherError::ApiParseError(_)
                | WatcherError::ApiServiceUnavailable(_)
                | WatcherError::UpstreamTimeout(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WatcherError::BotEnsureFailed { .. } => "E1001",
            WatcherError::TokenLookupFailed { .. } => "E1002",
            WatcherError::TokenCreateFailed { .. } => "E1003",
            WatcherError::TokenPersistFailed { .. } => "E1004",
            WatcherError::HostRequestFailed { .. } => "E1005",
            WatcherError::MissingConfig(_) => "E2001",
            WatcherError::InvalidConfigValue { .. } => "E2002",
            WatcherError::ConfigParseError(_) => "E2003",
            WatcherError::ApiRequestFailed(_) => "E3001",
            WatcherError::ApiStatus { .. } => "E3002",
            WatcherError::ApiParseError(_) => "E3003",
            WatcherError::ApiServiceUnavailable(_) => "E3004",
            WatcherError::UpstreamTimeout(_) => "E3005",
            WatcherError::PluginNotActive(_) => "E4001",
            WatcherError::PluginAlreadyActive(_) => "E4002",
            WatcherError::ServerBindFailed { .. } => "E4003",
            WatcherError::Internal(_) => "E9001",
            WatcherError::IoError(_) => "E9002",
            WatcherError::SerializationError(_) => "E9003",
        }
    }

    /// Returns a user-friendly suggestion for how to resolve this error.
    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            WatcherError::BotEnsureFailed { .. } => {
                Some("Check that the admin token may create bot accounts on the host")
            }
            WatcherError::TokenCreateFailed { .. } => {
                Some("Enable personal access tokens in the host system console")
            }
            WatcherError::TokenLookupFailed { .. } | WatcherError::TokenPersistFailed { .. } => {
                Some("Check that the key-value store file is readable and writable")
            }
            WatcherError::MissingConfig(_) => {
                Some("Set the value in playbook-watcher.toml or as a WATCHER_* environment variable")
            }
            WatcherError::ApiServiceUnavailable(_) | WatcherError::UpstreamTimeout(_) => {
                Some("Check that the playbooks plugin is enabled and reachable at the site URL")
            }
            WatcherError::ServerBindFailed { .. } => {
                Some("Choose a different server.bind_address or stop the process using it")
            }
            _ => None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        WatcherError::Internal(message.into())
    }
}

/// Format an error for CLI display with an optional suggestion.
pub struct CliErrorDisplay<'a> {
    error: &'a WatcherError,
    show_suggestion: bool,
}

impl<'a> CliErrorDisplay<'a> {
    pub fn new(error: &'a WatcherError) -> Self {
        Self {
            error,
            show_suggestion: true,
        }
    }

    pub fn without_suggestion(mut self) -> Self {
        self.show_suggestion = false;
        self
    }
}

impl<'a> fmt::Display for CliErrorDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.error)?;

        if self.show_suggestion {
            if let Some(suggestion) = self.error.user_suggestion() {
                writeln!(f)?;
                writeln!(f, "  Suggestion: {}", suggestion)?;
            }
        }

        Ok(())
    }
}
