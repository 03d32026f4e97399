//! Configuration for the nctel collector.
//!
//! TOML file + `NCTEL_` environment overrides, credential resolution
//! (env var + plaintext), and translation to `nctel_core::ControllerConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nctel_core::{
    AuthCredentials, ControllerConfig, HostKeyVerification, NotificationRequest, PollRequest,
    PollingServiceConfig, SubscriptionRequest, SubscriptionServiceConfig, Trigger,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for user '{username}'")]
    NoCredentials { username: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration: one server and what to collect from it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server address, `host:port`.
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub username: Option<String>,

    /// Password (plaintext; prefer `password_env`).
    #[serde(default)]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default)]
    pub password_env: Option<String>,

    /// Private key file for public-key authentication.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Environment variable name containing the private key passphrase.
    #[serde(default)]
    pub key_passphrase_env: Option<String>,

    /// Accept any host key. Lab use only.
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Expected host key, `SHA256:<base64>`.
    #[serde(default)]
    pub host_key_fingerprint: Option<String>,

    #[serde(default = "default_redial_interval")]
    pub redial_interval: String,

    #[serde(default = "default_timeout")]
    pub timeout: String,

    #[serde(default)]
    pub subscription: Option<SubscriptionSection>,

    #[serde(default)]
    pub polling: Option<PollingSection>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: String::new(),
            username: None,
            password: None,
            password_env: None,
            key_file: None,
            key_passphrase_env: None,
            insecure_skip_verify: false,
            host_key_fingerprint: None,
            redial_interval: default_redial_interval(),
            timeout: default_timeout(),
            subscription: None,
            polling: None,
        }
    }
}

fn default_redial_interval() -> String {
    "10s".into()
}
fn default_timeout() -> String {
    "30s".into()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionSection {
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionEntry>,
    #[serde(default)]
    pub notifications: Vec<NotificationEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionEntry {
    pub selector: String,
    /// `periodic` or `on-change`.
    pub trigger: String,
    /// Update period (periodic) or dampening period (on-change).
    pub period: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationEntry {
    /// Stream name. Empty subscribes to the default stream.
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PollingSection {
    #[serde(default)]
    pub polls: Vec<PollEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollEntry {
    pub selector: String,
    pub period: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "nctel", "nctel").map_or_else(
        || PathBuf::from(".").join("nctel.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` (or the platform default) plus environment.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("NCTEL_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Render the config as TOML with secrets removed.
pub fn render_redacted(cfg: &Config) -> Result<String, ConfigError> {
    let mut cfg = cfg.clone();
    if cfg.password.is_some() {
        cfg.password = Some("<redacted>".into());
    }
    Ok(toml::to_string_pretty(&cfg)?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve authentication from the environment and the config.
pub fn resolve_auth(cfg: &Config) -> Result<AuthCredentials, ConfigError> {
    resolve_auth_with(cfg, |name| std::env::var(name).ok())
}

/// Like [`resolve_auth`] with an explicit environment lookup.
///
/// Password chain: `password_env` variable, then plaintext `password`.
pub fn resolve_auth_with(
    cfg: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AuthCredentials, ConfigError> {
    let username = cfg
        .username
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ConfigError::invalid("username", "must be set"))?;

    if let Some(ref key_path) = cfg.key_file {
        let passphrase = cfg
            .key_passphrase_env
            .as_deref()
            .and_then(&env)
            .map(SecretString::from);
        return Ok(AuthCredentials::PrivateKey {
            username,
            key_path: key_path.clone(),
            passphrase,
        });
    }

    // 1. Env var named by the config
    if let Some(password) = cfg.password_env.as_deref().and_then(&env) {
        return Ok(AuthCredentials::Password {
            username,
            password: SecretString::from(password),
        });
    }

    // 2. Plaintext in config
    if let Some(ref password) = cfg.password {
        return Ok(AuthCredentials::Password {
            username,
            password: SecretString::from(password.clone()),
        });
    }

    Err(ConfigError::NoCredentials { username })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a validated `ControllerConfig`.
pub fn to_controller_config(cfg: &Config) -> Result<ControllerConfig, ConfigError> {
    let auth = resolve_auth(cfg)?;
    build_controller_config(cfg, auth)
}

/// Build a validated `ControllerConfig` with already-resolved credentials.
pub fn build_controller_config(
    cfg: &Config,
    auth: AuthCredentials,
) -> Result<ControllerConfig, ConfigError> {
    if cfg.address.trim().is_empty() {
        return Err(ConfigError::invalid("address", "must be set"));
    }

    let host_key = if cfg.insecure_skip_verify {
        HostKeyVerification::DangerAcceptAny
    } else if let Some(ref fingerprint) = cfg.host_key_fingerprint {
        HostKeyVerification::Fingerprint(fingerprint.clone())
    } else {
        return Err(ConfigError::invalid(
            "host_key_fingerprint",
            "required unless insecure_skip_verify is set",
        ));
    };

    let mut config = ControllerConfig::new(cfg.address.trim(), auth);
    config.host_key = host_key;
    config.redial_interval = parse_duration("redial_interval", &cfg.redial_interval)?;
    config.timeout = parse_duration("timeout", &cfg.timeout)?;

    if let Some(ref section) = cfg.subscription {
        config.subscription = Some(SubscriptionServiceConfig {
            subscriptions: section
                .subscriptions
                .iter()
                .map(subscription_request)
                .collect::<Result<_, _>>()?,
            notifications: section
                .notifications
                .iter()
                .map(|n| NotificationRequest {
                    stream: n.stream.clone(),
                    tags: n.tags.clone(),
                })
                .collect(),
        });
    }

    if let Some(ref section) = cfg.polling {
        config.polling = Some(PollingServiceConfig {
            polls: section
                .polls
                .iter()
                .map(poll_request)
                .collect::<Result<_, _>>()?,
        });
    }

    Ok(config)
}

fn subscription_request(entry: &SubscriptionEntry) -> Result<SubscriptionRequest, ConfigError> {
    let field = format!("subscription '{}'", entry.selector);
    let trigger: Trigger = entry.trigger.parse().map_err(|_| {
        ConfigError::invalid(
            &field,
            format!(
                "trigger must be 'periodic' or 'on-change', got '{}'",
                entry.trigger
            ),
        )
    })?;

    let period = entry
        .period
        .as_deref()
        .map(|raw| parse_duration(&field, raw))
        .transpose()?;

    if trigger == Trigger::Periodic && period.is_none_or(|p| p.is_zero()) {
        return Err(ConfigError::invalid(
            &field,
            "periodic subscriptions need a period greater than zero",
        ));
    }

    Ok(SubscriptionRequest {
        selector: entry.selector.clone(),
        trigger,
        period,
        tags: entry.tags.clone(),
    })
}

fn poll_request(entry: &PollEntry) -> Result<PollRequest, ConfigError> {
    let field = format!("poll '{}'", entry.selector);
    let period = parse_duration(&field, &entry.period)?;
    if period.is_zero() {
        return Err(ConfigError::invalid(&field, "period must be greater than zero"));
    }
    Ok(PollRequest {
        selector: entry.selector.clone(),
        period,
        tags: entry.tags.clone(),
    })
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| ConfigError::invalid(field, format!("'{raw}': {e}")))
}
