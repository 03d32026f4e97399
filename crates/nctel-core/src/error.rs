// ── Core error types ──
//
// Errors the collector reports through the sink. None of them is fatal to
// the process: configuration errors end one service, everything else is
// retried or confined to one payload. The `From<nctel_api::Error>` impl
// translates transport-layer errors into these categories.

use thiserror::Error;

use crate::service::ServiceKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Missing requests: no {service} requests configured")]
    MissingRequests { service: ServiceKind },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Cannot open session with {address}: {reason}")]
    SessionFailed { address: String, reason: String },

    #[error("Host key verification failed: {reason}")]
    HostKey { reason: String },

    #[error("Operation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Request errors ───────────────────────────────────────────────
    #[error("{operation} for '{target}' rejected: {reason}")]
    RequestRejected {
        operation: &'static str,
        target: String,
        reason: String,
    },

    #[error("Server error: {message}")]
    Rpc { message: String },

    #[error("No request succeeded on the {service} service")]
    NoRequestSucceeded { service: ServiceKind },

    // ── Receive / poll errors ────────────────────────────────────────
    #[error("Receive failed: {reason}")]
    ReceiveFailed { reason: String },

    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// The session was closed underneath a blocking call.
    #[error("Session interrupted: {reason}")]
    Interrupted { reason: String },

    // ── Decode errors ────────────────────────────────────────────────
    #[error("Unsupported value type {value_type} for leaf '{leaf}'")]
    UnsupportedValue {
        leaf: String,
        value_type: &'static str,
    },
}

impl CoreError {
    /// Returns `true` if the error is the expected side effect of a local
    /// close or cancellation and should not be reported.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }

    /// Returns `true` for configuration errors: reported once, never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingRequests { .. } | Self::Config { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nctel_api::Error> for CoreError {
    fn from(err: nctel_api::Error) -> Self {
        match err {
            nctel_api::Error::Dial { address, reason } => {
                CoreError::ConnectionFailed { address, reason }
            }
            nctel_api::Error::InvalidFingerprint(reason) => CoreError::HostKey { reason },
            e @ nctel_api::Error::HostKeyMismatch { .. } => CoreError::HostKey {
                reason: e.to_string(),
            },
            nctel_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            nctel_api::Error::SessionSetup(reason) => CoreError::SessionFailed {
                address: String::new(),
                reason,
            },
            nctel_api::Error::Rpc { message } => CoreError::Rpc { message },
            nctel_api::Error::Interrupted(reason) => CoreError::Interrupted { reason },
            nctel_api::Error::Closed => CoreError::Interrupted {
                reason: "session closed".into(),
            },
            nctel_api::Error::Payload(reason) => CoreError::MalformedPayload { reason },
        }
    }
}
