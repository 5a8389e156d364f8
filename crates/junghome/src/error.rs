//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use junghome_config::ConfigError;
use junghome_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to gateway at {url}")]
    #[diagnostic(
        code(junghome::connection_failed),
        help(
            "Check that the gateway is powered and reachable.\n\
             Try: junghome test --host <address>"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Gateway socket is not connected")]
    #[diagnostic(
        code(junghome::disconnected),
        help("Commands need a live socket. Check the gateway and retry.")
    )]
    Disconnected,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Gateway rejected the token")]
    #[diagnostic(
        code(junghome::auth_failed),
        help(
            "Create a new token in the JUNG HOME app and update profile '{profile}':\n\
             junghome config init --gateway <address> --token-env <VAR> --force"
        )
    )]
    AuthFailed { profile: String },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(junghome::no_token),
        help(
            "Pass --token, set JUNGHOME_TOKEN, or configure one with:\n\
             junghome config init --gateway <address> --token-env <VAR>"
        )
    )]
    NoToken { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(junghome::not_found),
        help("Run: junghome {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Gateway error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(junghome::api_error))]
    ApiError { status: Option<u16>, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(junghome::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(junghome::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: junghome config init --gateway <address>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No gateway configured")]
    #[diagnostic(
        code(junghome::no_config),
        help(
            "Pass --host and --token, or create a profile with:\n\
             junghome config init --gateway <address> --token-env <VAR>\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(junghome::config))]
    Config(String),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Gateway did not answer in time")]
    #[diagnostic(
        code(junghome::timeout),
        help("Increase the timeout with --timeout or check the network.")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoToken { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Name the profile in errors raised before it was known.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { .. } => Self::AuthFailed {
                profile: name.to_owned(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { .. } => CliError::AuthFailed {
                profile: "current".into(),
            },
            CoreError::GatewayDisconnected => CliError::Disconnected,
            CoreError::Timeout => CliError::Timeout,
            CoreError::DeviceNotFound { id } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: id,
                list_command: "devices list".into(),
            },
            CoreError::DatapointNotFound { device_id, kind } => CliError::NotFound {
                resource_type: format!("{kind} datapoint of device"),
                identifier: device_id,
                list_command: "devices get <id>".into(),
            },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Api { message, status } => CliError::ApiError { status, message },
            CoreError::Decode { message } => CliError::ApiError {
                status: None,
                message: format!("unexpected response: {message}"),
            },
            CoreError::Config { message } => CliError::Config(message),
            CoreError::Internal(message) => CliError::ApiError {
                status: None,
                message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoToken { profile } => CliError::NoToken { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_connection_have_distinct_codes() {
        let auth = CliError::from(CoreError::AuthenticationFailed {
            message: "401".into(),
        });
        let down = CliError::from(CoreError::GatewayDisconnected);
        assert_eq!(auth.exit_code(), exit_code::AUTH);
        assert_eq!(down.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn api_status_is_shown() {
        let err = CliError::from(CoreError::Api {
            message: "busy".into(),
            status: Some(503),
        });
        assert_eq!(err.to_string(), "Gateway error (503): busy");
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn missing_token_maps_from_config() {
        let err = CliError::from(ConfigError::NoToken {
            profile: "home".into(),
        });
        assert!(matches!(err, CliError::NoToken { ref profile } if profile == "home"));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
