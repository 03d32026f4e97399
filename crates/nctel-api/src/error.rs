use thiserror::Error;

/// Top-level error type for the `nctel-api` crate.
///
/// Covers every failure mode a transport or session implementation can
/// surface: dialing, host-key verification, session setup, RPC rejection,
/// framing, and payload parsing. `nctel-core` maps these into lifecycle
/// decisions (retry, report, or treat as shutdown).
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// TCP/SSH dial failed (connection refused, DNS failure, auth rejected).
    #[error("Failed to dial {address}: {reason}")]
    Dial { address: String, reason: String },

    /// Host-key fingerprint could not be parsed.
    #[error("Invalid host key fingerprint: {0}")]
    InvalidFingerprint(String),

    /// The server presented a key that does not match the configured fingerprint.
    #[error("Host key mismatch: expected {expected}, got {presented}")]
    HostKeyMismatch { expected: String, presented: String },

    /// Operation did not complete within the configured timeout.
    #[error("Operation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Session ─────────────────────────────────────────────────────
    /// Protocol session could not be opened on an established transport.
    #[error("Session setup failed: {0}")]
    SessionSetup(String),

    /// The remote side rejected a request (`<rpc-error>`).
    #[error("RPC error: {message}")]
    Rpc { message: String },

    /// A blocking read was aborted because the transport was closed
    /// underneath it (framing error on a half-read message).
    #[error("Session interrupted: {0}")]
    Interrupted(String),

    /// The session has already been closed.
    #[error("Session closed")]
    Closed,

    // ── Data ────────────────────────────────────────────────────────
    /// A payload could not be parsed into a tree.
    #[error("Malformed payload: {0}")]
    Payload(String),
}

impl Error {
    /// Returns `true` if this error is the expected consequence of the
    /// session being closed locally (shutdown, redial).
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Interrupted(_) | Self::Closed)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Payload(err.to_string())
    }
}
