// ── Connection management ──
//
// Dial → open session, retried at a fixed interval until it succeeds or the
// cancellation token fires. There is no retry limit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nctel_api::{Auth, Connector, DialParams, HostKeyFingerprint, HostKeyPolicy, Session};

use crate::config::{AuthCredentials, ControllerConfig, HostKeyVerification};
use crate::error::CoreError;
use crate::service::ServiceKind;
use crate::sink::Sink;

/// Produces live sessions to one server for one service.
pub struct ConnectionManager {
    config: Arc<ControllerConfig>,
    connector: Arc<dyn Connector>,
    service: ServiceKind,
}

impl ConnectionManager {
    pub fn new(
        config: Arc<ControllerConfig>,
        connector: Arc<dyn Connector>,
        service: ServiceKind,
    ) -> Self {
        Self {
            config,
            connector,
            service,
        }
    }

    /// Block until a session is open or `cancel` fires.
    ///
    /// Every failed attempt is reported to `sink`, then retried after the
    /// redial interval. Returns `Ok(None)` on cancellation, and `Err` only
    /// for configuration errors that no retry can fix.
    pub async fn connect(
        &self,
        cancel: &CancellationToken,
        sink: &dyn Sink,
    ) -> Result<Option<Arc<dyn Session>>, CoreError> {
        if self.config.host_key == HostKeyVerification::Unspecified {
            return Err(CoreError::config(format!(
                "host key verification for {} needs either a fingerprint or \
                 insecure_skip_verify",
                self.config.address
            )));
        }

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            debug!(
                address = %self.config.address,
                service = %self.service,
                attempt,
                "connecting"
            );

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(None),
                result = self.attempt() => result,
            };

            match result {
                Ok(session) => {
                    info!(
                        address = %self.config.address,
                        service = %self.service,
                        attempt,
                        "session established"
                    );
                    return Ok(Some(session));
                }
                Err(e) => {
                    debug!(
                        address = %self.config.address,
                        service = %self.service,
                        attempt,
                        error = %e,
                        "connection attempt failed"
                    );
                    sink.report_error(e);
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(self.config.redial_interval) => {}
            }
        }
    }

    async fn attempt(&self) -> Result<Arc<dyn Session>, CoreError> {
        let params = dial_params(&self.config)?;
        let timeout = self.config.timeout;

        let transport = with_timeout(timeout, self.connector.dial(&params)).await?;
        with_timeout(timeout, transport.open_session())
            .await
            .map_err(|e| match e {
                CoreError::SessionFailed { reason, .. } => CoreError::SessionFailed {
                    address: self.config.address.clone(),
                    reason,
                },
                other => other,
            })
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Build dial parameters, resolving the configured host-key fingerprint.
///
/// An unparsable fingerprint is a host-key error, not a configuration
/// error, so it is retried like any other connection failure.
pub(crate) fn dial_params(config: &ControllerConfig) -> Result<DialParams, CoreError> {
    let host_key = match &config.host_key {
        HostKeyVerification::DangerAcceptAny => HostKeyPolicy::AcceptAny,
        HostKeyVerification::Fingerprint(raw) => {
            HostKeyPolicy::Fingerprint(raw.parse::<HostKeyFingerprint>()?)
        }
        HostKeyVerification::Unspecified => {
            return Err(CoreError::config("no host key verification configured"));
        }
    };

    Ok(DialParams {
        address: config.address.clone(),
        auth: to_api_auth(&config.auth),
        host_key,
        timeout: config.timeout,
    })
}

fn to_api_auth(auth: &AuthCredentials) -> Auth {
    match auth {
        AuthCredentials::Password { username, password } => Auth::Password {
            username: username.clone(),
            password: password.clone(),
        },
        AuthCredentials::PrivateKey {
            username,
            key_path,
            passphrase,
        } => Auth::PrivateKey {
            username: username.clone(),
            key_path: key_path.clone(),
            passphrase: passphrase.clone(),
        },
    }
}

/// Race a transport operation against `timeout`.
pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, nctel_api::Error>>,
) -> Result<T, CoreError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    const FINGERPRINT: &str = "SHA256:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU";

    fn config(host_key: HostKeyVerification) -> ControllerConfig {
        let mut config = ControllerConfig::new(
            "192.0.2.1:830",
            AuthCredentials::Password {
                username: "admin".into(),
                password: SecretString::from("secret".to_owned()),
            },
        );
        config.host_key = host_key;
        config
    }

    #[test]
    fn fingerprint_is_parsed_into_policy() {
        let params = assert_ok!(dial_params(&config(HostKeyVerification::Fingerprint(
            FINGERPRINT.into()
        ))));
        let expected: HostKeyFingerprint = FINGERPRINT.parse().unwrap();
        assert_eq!(params.host_key, HostKeyPolicy::Fingerprint(expected));
        assert_eq!(params.address, "192.0.2.1:830");
        assert_eq!(params.auth.username(), "admin");
    }

    #[test]
    fn accept_any_needs_no_fingerprint() {
        let params = assert_ok!(dial_params(&config(HostKeyVerification::DangerAcceptAny)));
        assert_eq!(params.host_key, HostKeyPolicy::AcceptAny);
    }

    #[test]
    fn bad_fingerprint_is_a_retryable_host_key_error() {
        let err = assert_err!(dial_params(&config(HostKeyVerification::Fingerprint(
            "MD5:aa:bb".into()
        ))));
        assert!(matches!(err, CoreError::HostKey { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_verification_is_fatal() {
        let err = assert_err!(dial_params(&config(HostKeyVerification::Unspecified)));
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_operations_time_out() {
        let result: Result<(), CoreError> = with_timeout(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CoreError::Timeout { timeout_secs: 5 })));
    }
}
