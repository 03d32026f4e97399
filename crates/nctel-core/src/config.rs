// ── Runtime collection configuration ──
//
// These types describe *how* to reach one server and *what* to collect
// from it. They carry credential data and timing, but never touch disk.
// `nctel-config` (or an embedding host) builds a `ControllerConfig` and
// hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

pub use nctel_api::Trigger;

/// Default delay between redial attempts.
pub const DEFAULT_REDIAL_INTERVAL: Duration = Duration::from_secs(10);

/// Default timeout for dial, session setup, and request calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to authenticate with the server.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    Password {
        username: String,
        password: SecretString,
    },
    PrivateKey {
        username: String,
        key_path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

/// Server identity verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Accept any host key. Only for lab equipment.
    DangerAcceptAny,
    /// Require the host key to match this `SHA256:<base64>` fingerprint.
    Fingerprint(String),
    /// Neither option configured; dialing fails with a configuration error.
    #[default]
    Unspecified,
}

// ── Request definitions ──────────────────────────────────────────

/// Datastore subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub selector: String,
    pub trigger: Trigger,
    /// Required (> 0) for periodic subscriptions; dampening period for
    /// on-change subscriptions.
    pub period: Option<Duration>,
    pub tags: Vec<String>,
}

/// Event-stream subscription. An empty stream means the default stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationRequest {
    pub stream: String,
    pub tags: Vec<String>,
}

/// Periodic `get` of a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub selector: String,
    pub period: Duration,
    pub tags: Vec<String>,
}

/// Any request a service can create on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSpec {
    Subscription(SubscriptionRequest),
    Notification(NotificationRequest),
    Poll(PollRequest),
}

impl RequestSpec {
    /// Measurement selector (subscription/poll selector, or stream name).
    pub fn selector(&self) -> &str {
        match self {
            Self::Subscription(s) => &s.selector,
            Self::Notification(n) => &n.stream,
            Self::Poll(p) => &p.selector,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Self::Subscription(s) => &s.tags,
            Self::Notification(n) => &n.tags,
            Self::Poll(p) => &p.tags,
        }
    }
}

// ── Service configuration ────────────────────────────────────────

/// Requests handled by the push-based service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionServiceConfig {
    pub subscriptions: Vec<SubscriptionRequest>,
    pub notifications: Vec<NotificationRequest>,
}

/// Requests handled by the polling service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollingServiceConfig {
    pub polls: Vec<PollRequest>,
}

/// Configuration for collecting from a single server.
///
/// Each configured service opens its own session to `address`.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Server address (`host:port`). Also the `source` tag of every record.
    pub address: String,
    pub auth: AuthCredentials,
    pub host_key: HostKeyVerification,
    /// Delay between connection attempts and after a session ends.
    pub redial_interval: Duration,
    /// Timeout for dial, session setup, and request calls.
    pub timeout: Duration,
    /// Push-based service. `None` disables it.
    pub subscription: Option<SubscriptionServiceConfig>,
    /// Polling service. `None` disables it.
    pub polling: Option<PollingServiceConfig>,
}

impl ControllerConfig {
    pub fn new(address: impl Into<String>, auth: AuthCredentials) -> Self {
        Self {
            address: address.into(),
            auth,
            host_key: HostKeyVerification::default(),
            redial_interval: DEFAULT_REDIAL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            subscription: None,
            polling: None,
        }
    }

    /// Every request across all configured services.
    pub fn request_specs(&self) -> impl Iterator<Item = RequestSpec> + '_ {
        let pushes = self.subscription.iter().flat_map(|s| {
            s.subscriptions
                .iter()
                .cloned()
                .map(RequestSpec::Subscription)
                .chain(s.notifications.iter().cloned().map(RequestSpec::Notification))
        });
        let polls = self
            .polling
            .iter()
            .flat_map(|p| p.polls.iter().cloned().map(RequestSpec::Poll));
        pushes.chain(polls)
    }
}
