//! Typed requests and responses exchanged over a [`Session`](crate::Session).
//!
//! These describe *what* is asked of the server; encoding them into RPC
//! envelopes is the session implementation's job.

use std::time::Duration;

use chrono::{DateTime, Utc};
use strum::{Display, EnumString};

use crate::payload::PayloadTree;

/// When a datastore subscription pushes updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Trigger {
    /// Push the full subtree every period.
    Periodic,
    /// Push changes as they happen, no more often than the dampening period.
    OnChange,
}

/// A request a session can execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Dynamic datastore subscription (YANG-push `establish-subscription`).
    EstablishSubscription {
        selector: String,
        trigger: Trigger,
        /// Update period for [`Trigger::Periodic`], dampening period for
        /// [`Trigger::OnChange`].
        period: Duration,
    },
    /// Event-stream subscription (`create-subscription`). An empty stream
    /// name subscribes to the server's default stream.
    CreateSubscription { stream: String },
    /// Retrieve operational state under a subtree selector (`get`).
    Get { selector: String },
}

impl Request {
    /// Short operation name for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::EstablishSubscription { .. } => "establish-subscription",
            Self::CreateSubscription { .. } => "create-subscription",
            Self::Get { .. } => "get",
        }
    }
}

/// Response to a [`Request`] that carries data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Contents of the reply's data element. The server does not timestamp
    /// replies, so callers stamp them on receipt.
    pub data: Vec<PayloadTree>,
}

/// Asynchronous push received on a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Server-side event time, when the message carries one.
    pub event_time: Option<DateTime<Utc>>,
    /// Subscription the push belongs to, for datastore subscriptions.
    pub subscription_id: Option<u32>,
    /// Whether the push came from a datastore subscription or an event stream.
    pub kind: NotificationKind,
    /// Payload roots carried by the push.
    pub body: Vec<PayloadTree>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum NotificationKind {
    /// `push-update` / `push-change-update` from an established subscription.
    Datastore,
    /// Event notification from a `create-subscription` stream.
    Event,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trigger_round_trips_through_strings() {
        assert_eq!("periodic".parse::<Trigger>().unwrap(), Trigger::Periodic);
        assert_eq!("on-change".parse::<Trigger>().unwrap(), Trigger::OnChange);
        assert_eq!(Trigger::OnChange.to_string(), "on-change");
        assert!("sometimes".parse::<Trigger>().is_err());
    }
}
