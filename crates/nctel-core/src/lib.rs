//! Session lifecycle and payload decoding for NETCONF telemetry collection.
//!
//! This crate turns a server address plus a list of requests into a stream
//! of time-series records:
//!
//! - **[`Controller`]**: owns one server. [`start()`](Controller::start)
//!   builds the shared [`SelectorRegistry`] and launches one [`Service`] per
//!   configured request family; [`stop()`](Controller::stop) cancels them,
//!   closes their sessions, and joins them.
//!
//! - **[`Service`]**: redial loop. Obtains a session through the
//!   [`ConnectionManager`], creates its requests under an exclusive session
//!   lock, then supervises receive tasks (subscriptions, notifications) or
//!   poll tasks until they end.
//!
//! - **[`decode()`]**: non-recursive walk over a [`PayloadTree`] that
//!   classifies each leaf as a tag or a field and groups the results into
//!   [`Record`]s through a [`RecordGrouper`].
//!
//! - **[`Sink`]**: destination for records and recovered errors.
//!
//! The transport itself is supplied by the host through the
//! [`nctel_api::Connector`] seam.
//!
//! [`PayloadTree`]: nctel_api::PayloadTree

pub mod config;
pub mod connection;
pub mod controller;
pub mod decode;
pub mod error;
pub mod normalize;
pub mod record;
pub mod selector;
pub mod service;
pub mod sink;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    AuthCredentials, ControllerConfig, HostKeyVerification, NotificationRequest,
    PollRequest, PollingServiceConfig, RequestSpec, SubscriptionRequest,
    SubscriptionServiceConfig, Trigger,
};
pub use connection::ConnectionManager;
pub use controller::Controller;
pub use decode::{SOURCE_TAG, decode};
pub use error::CoreError;
pub use normalize::{namespace_prefix, normalize};
pub use record::{Record, RecordGrouper};
pub use selector::SelectorRegistry;
pub use service::{Service, ServiceKind, ServiceState};
pub use sink::{ChannelSink, Sink, SinkEvent};
