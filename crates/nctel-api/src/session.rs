//! Seams between the collector and a concrete NETCONF transport.
//!
//! The collector never speaks SSH or frames RPCs itself. A host crate
//! supplies a [`Connector`]; the core drives it through dial → open session
//! → requests → receive, and closes sessions on redial or shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;
use crate::hostkey::HostKeyPolicy;
use crate::request::{Notification, NotificationKind, Reply, Request};

/// Client authentication material (api-level mirror of core's `AuthCredentials`).
#[derive(Debug, Clone)]
pub enum Auth {
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

impl Auth {
    pub fn username(&self) -> &str {
        match self {
            Self::Password { username, .. } | Self::PrivateKey { username, .. } => username,
        }
    }
}

/// Everything a [`Connector`] needs to reach one server.
#[derive(Debug, Clone)]
pub struct DialParams {
    /// `host:port` of the server.
    pub address: String,
    pub auth: Auth,
    pub host_key: HostKeyPolicy,
    pub timeout: Duration,
}

/// One live protocol session.
///
/// Implementations must tolerate [`close`](Self::close) being called while
/// another task is blocked in [`receive`](Self::receive); the blocked call
/// should then fail with [`Error::Interrupted`] or [`Error::Closed`].
/// Request calls need not be safe to interleave: the caller serializes them.
#[async_trait]
pub trait Session: Send + Sync {
    /// Synchronous request/response.
    async fn call(&self, request: &Request) -> Result<Reply, Error>;

    /// Request that only expects an `<ok/>` acknowledgement.
    async fn call_simple(&self, request: &Request) -> Result<(), Error>;

    /// Block until the next push of the given kind arrives.
    async fn receive(&self, kind: NotificationKind) -> Result<Notification, Error>;

    /// Close the session and its transport.
    async fn close(&self) -> Result<(), Error>;
}

/// An authenticated, encrypted transport on which a session can be opened.
#[async_trait]
pub trait Transport: Send {
    async fn open_session(self: Box<Self>) -> Result<Arc<dyn Session>, Error>;
}

/// Factory for transports. One connector serves every service of a controller.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn dial(&self, params: &DialParams) -> Result<Box<dyn Transport>, Error>;
}
