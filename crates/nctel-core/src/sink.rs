// ── Record sink ──
//
// Where decoded records and reported errors go. Every receive and poll
// task of every service writes here concurrently.

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::CoreError;
use crate::record::Record;

/// Destination for finished records and collector errors.
///
/// Implementations must be safe for concurrent use from many tasks.
pub trait Sink: Send + Sync {
    fn emit(&self, record: Record);

    /// Receive an error the collector recovered from. The default only logs.
    fn report_error(&self, error: CoreError) {
        warn!(error = %error, "collector error");
    }
}

/// Item delivered by a [`ChannelSink`].
#[derive(Debug)]
pub enum SinkEvent {
    Record(Record),
    Error(CoreError),
}

/// Sink forwarding everything into an unbounded channel.
///
/// Items are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn emit(&self, record: Record) {
        let _ = self.tx.send(SinkEvent::Record(record));
    }

    fn report_error(&self, error: CoreError) {
        warn!(error = %error, "collector error");
        let _ = self.tx.send(SinkEvent::Error(error));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn forwards_records_and_errors_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(Record {
            measurement: "m".into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: Utc::now(),
        });
        sink.report_error(CoreError::config("bad"));
        drop(sink);

        assert!(matches!(rx.recv().await, Some(SinkEvent::Record(r)) if r.measurement == "m"));
        assert!(matches!(
            rx.recv().await,
            Some(SinkEvent::Error(CoreError::Config { .. }))
        ));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.report_error(CoreError::config("nobody listening"));
    }
}
