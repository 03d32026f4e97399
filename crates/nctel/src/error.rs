//! CLI error types with miette diagnostics.
//!
//! Maps config, payload, and decode errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nctel_config::ConfigError;
use nctel_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const PAYLOAD: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(nctel::no_config),
        help(
            "Pass --config PATH or create one at the default location.\n\
             Default: {default_path}"
        )
    )]
    NoConfig { path: String, default_path: String },

    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(nctel::validation))]
    Validation { field: String, reason: String },

    #[error("No credentials configured for user '{username}'")]
    #[diagnostic(
        code(nctel::no_credentials),
        help("Set `password_env` to the name of an environment variable holding the password, or `key_file`.")
    )]
    NoCredentials { username: String },

    #[error("Configuration could not be loaded")]
    #[diagnostic(code(nctel::config))]
    Config(#[source] ConfigError),

    // ── Payloads ─────────────────────────────────────────────────────

    #[error("Could not parse payload {path}")]
    #[diagnostic(
        code(nctel::payload),
        help("The file must contain the XML elements of a <data> reply or notification body.")
    )]
    Payload {
        path: String,
        #[source]
        source: nctel_api::Error,
    },

    #[error("Could not decode payload")]
    #[diagnostic(code(nctel::decode))]
    Decode(#[source] CoreError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode record: {0}")]
    #[diagnostic(code(nctel::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoConfig { .. } | Self::NoCredentials { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            Self::Payload { .. } | Self::Decode(_) => exit_code::PAYLOAD,
            Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { username } => CliError::NoCredentials { username },
            ConfigError::NotFound { path } => CliError::NoConfig {
                path: path.display().to_string(),
                default_path: nctel_config::config_path().display().to_string(),
            },
            other => CliError::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Decode(err)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn config_errors_map_to_config_exit_code() {
        let err = CliError::from(ConfigError::NotFound {
            path: PathBuf::from("/nope.toml"),
        });
        assert!(matches!(err, CliError::NoConfig { .. }));
        assert_eq!(err.exit_code(), exit_code::CONFIG);

        let err = CliError::from(ConfigError::Validation {
            field: "address".into(),
            reason: "must be set".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn decode_errors_map_to_payload_exit_code() {
        let err = CliError::from(CoreError::UnsupportedValue {
            leaf: "blob".into(),
            value_type: "binary",
        });
        assert_eq!(err.exit_code(), exit_code::PAYLOAD);
    }
}
