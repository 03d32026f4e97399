// ── Collection services ──
//
// A service owns one session to the server at a time. Each redial
// iteration connects, creates the configured requests, then supervises one
// receive task per push kind and one poll task per poll request until they
// all finish. The session is closed before the next iteration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nctel_api::{Connector, NotificationKind, PayloadTree, Request, Session};

use crate::config::{ControllerConfig, PollRequest, RequestSpec, Trigger};
use crate::connection::{ConnectionManager, with_timeout};
use crate::decode::decode;
use crate::error::CoreError;
use crate::selector::SelectorRegistry;
use crate::sink::Sink;

/// Which family of requests a service drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ServiceKind {
    /// Datastore subscriptions and event-stream notifications.
    Subscription,
    /// Periodic `get` requests.
    Polling,
}

/// Lifecycle state of a service, observable without touching the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ServiceState {
    Disconnected,
    Connected,
    RequestsEstablished,
    Ended,
}

// ── Service ──────────────────────────────────────────────────────

pub struct Service {
    kind: ServiceKind,
    requests: Vec<RequestSpec>,
    config: Arc<ControllerConfig>,
    connections: ConnectionManager,
    selectors: Arc<SelectorRegistry>,
    sink: Arc<dyn Sink>,
    state: watch::Sender<ServiceState>,
    /// Session of the current iteration, kept reachable so `close_session`
    /// can interrupt tasks blocked on it.
    live: Mutex<Option<Arc<dyn Session>>>,
}

impl Service {
    pub fn new(
        kind: ServiceKind,
        requests: Vec<RequestSpec>,
        config: Arc<ControllerConfig>,
        connector: Arc<dyn Connector>,
        selectors: Arc<SelectorRegistry>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let (state, _) = watch::channel(ServiceState::Disconnected);
        Self {
            kind,
            requests,
            connections: ConnectionManager::new(Arc::clone(&config), connector, kind),
            config,
            selectors,
            sink,
            state,
            live: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn requests(&self) -> &[RequestSpec] {
        &self.requests
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Run until `cancel` fires.
    ///
    /// Returns immediately, in state [`ServiceState::Ended`], when no
    /// requests are configured or the configuration is invalid.
    pub async fn run(&self, cancel: CancellationToken) {
        if self.requests.is_empty() {
            self.fail(CoreError::MissingRequests { service: self.kind });
            return;
        }
        if let Err(e) = self.validate() {
            self.fail(e);
            return;
        }

        while !cancel.is_cancelled() {
            self.set_state(ServiceState::Disconnected);

            match self.connections.connect(&cancel, self.sink.as_ref()).await {
                Ok(Some(session)) => {
                    self.set_state(ServiceState::Connected);
                    self.run_session(session, &cancel).await;
                }
                Ok(None) => break,
                Err(e) => {
                    self.fail(e);
                    return;
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.redial_interval) => {}
            }
        }

        debug!(service = %self.kind, address = %self.config.address, "service stopped");
    }

    /// Close the live session, if any.
    ///
    /// Errors caused by the session already being closed are expected and
    /// ignored.
    pub async fn close_session(&self) {
        let session = self.live.lock().await.take();
        if let Some(session) = session {
            match with_timeout(self.config.timeout, session.close()).await {
                Ok(()) => debug!(service = %self.kind, "session closed"),
                Err(e) if e.is_shutdown() => {}
                Err(e) => warn!(service = %self.kind, error = %e, "session close failed (non-fatal)"),
            }
        }
    }

    // ── One redial iteration ─────────────────────────────────────

    async fn run_session(&self, session: Arc<dyn Session>, cancel: &CancellationToken) {
        *self.live.lock().await = Some(Arc::clone(&session));

        let live = Arc::new(LiveSession {
            session,
            lock: Mutex::new(()),
            timeout: self.config.timeout,
        });

        let established = self.establish(&live, cancel).await;
        if established.is_empty() {
            if !cancel.is_cancelled() {
                self.sink
                    .report_error(CoreError::NoRequestSucceeded { service: self.kind });
            }
        } else {
            self.set_state(ServiceState::RequestsEstablished);
            info!(
                service = %self.kind,
                address = %self.config.address,
                "requests established"
            );
            self.supervise(live, established, cancel).await;
            self.set_state(ServiceState::Ended);
        }

        self.close_session().await;
    }

    /// Create every configured request, one at a time under the session
    /// lock. A rejected request does not stop the others.
    async fn establish(&self, live: &LiveSession, cancel: &CancellationToken) -> Established {
        let mut established = Established::default();

        for spec in &self.requests {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = live.create(spec) => result,
            };

            match result {
                Ok(()) => {
                    debug!(service = %self.kind, selector = spec.selector(), "request created");
                    established.add(spec);
                }
                Err(e) => {
                    debug!(
                        service = %self.kind,
                        selector = spec.selector(),
                        error = %e,
                        "request rejected"
                    );
                    self.sink.report_error(e);
                }
            }
        }
        established
    }

    /// Run the receive and poll tasks for this iteration until all exit.
    async fn supervise(
        &self,
        live: Arc<LiveSession>,
        established: Established,
        cancel: &CancellationToken,
    ) {
        let ctx = Arc::new(TaskContext {
            live,
            selectors: Arc::clone(&self.selectors),
            sink: Arc::clone(&self.sink),
            source: self.config.address.clone(),
        });

        let mut tasks = JoinSet::new();
        for kind in established.push_kinds() {
            tasks.spawn(receive_task(Arc::clone(&ctx), kind, cancel.clone()));
        }
        for poll in established.polls {
            tasks.spawn(poll_task(Arc::clone(&ctx), poll, cancel.clone()));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(service = %self.kind, error = %e, "collection task aborted");
            }
        }
        debug!(service = %self.kind, "collection tasks finished");
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn validate(&self) -> Result<(), CoreError> {
        for spec in &self.requests {
            match spec {
                RequestSpec::Subscription(sub) if sub.trigger == Trigger::Periodic => {
                    if sub.period.is_none_or(|p| p.is_zero()) {
                        return Err(CoreError::config(format!(
                            "periodic subscription '{}' needs a period greater than zero",
                            sub.selector
                        )));
                    }
                }
                RequestSpec::Poll(poll) if poll.period.is_zero() => {
                    return Err(CoreError::config(format!(
                        "poll '{}' needs a period greater than zero",
                        poll.selector
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn fail(&self, error: CoreError) {
        debug!(service = %self.kind, error = %error, "service ended");
        self.sink.report_error(error);
        self.set_state(ServiceState::Ended);
    }

    fn set_state(&self, state: ServiceState) {
        self.state.send_replace(state);
    }
}

// ── Per-session plumbing ─────────────────────────────────────────

/// A session plus the lock that serializes calls on it.
///
/// Receive calls do not take the lock: a receive can block indefinitely and
/// must not starve request calls or `close`.
struct LiveSession {
    session: Arc<dyn Session>,
    lock: Mutex<()>,
    timeout: Duration,
}

impl LiveSession {
    async fn create(&self, spec: &RequestSpec) -> Result<(), CoreError> {
        let request = match spec {
            RequestSpec::Subscription(sub) => Request::EstablishSubscription {
                selector: sub.selector.clone(),
                trigger: sub.trigger,
                period: sub.period.unwrap_or_default(),
            },
            RequestSpec::Notification(notification) => Request::CreateSubscription {
                stream: notification.stream.clone(),
            },
            // Nothing to set up on the server; the poll task issues the gets.
            RequestSpec::Poll(_) => return Ok(()),
        };

        let _guard = self.lock.lock().await;
        with_timeout(self.timeout, self.session.call_simple(&request))
            .await
            .map_err(|e| CoreError::RequestRejected {
                operation: request.operation(),
                target: spec.selector().to_owned(),
                reason: e.to_string(),
            })
    }

    async fn get(&self, request: &Request) -> Result<Vec<PayloadTree>, CoreError> {
        let _guard = self.lock.lock().await;
        let reply = with_timeout(self.timeout, self.session.call(request)).await?;
        Ok(reply.data)
    }
}

/// Requests that were created successfully in one iteration.
#[derive(Default)]
struct Established {
    datastore: bool,
    events: bool,
    polls: Vec<PollRequest>,
}

impl Established {
    fn add(&mut self, spec: &RequestSpec) {
        match spec {
            RequestSpec::Subscription(_) => self.datastore = true,
            RequestSpec::Notification(_) => self.events = true,
            RequestSpec::Poll(poll) => self.polls.push(poll.clone()),
        }
    }

    fn is_empty(&self) -> bool {
        !self.datastore && !self.events && self.polls.is_empty()
    }

    fn push_kinds(&self) -> impl Iterator<Item = NotificationKind> {
        [
            (self.datastore, NotificationKind::Datastore),
            (self.events, NotificationKind::Event),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
    }
}

/// Shared by every task of one iteration.
struct TaskContext {
    live: Arc<LiveSession>,
    selectors: Arc<SelectorRegistry>,
    sink: Arc<dyn Sink>,
    source: String,
}

impl TaskContext {
    /// Decode each payload root and hand the records to the sink. A root
    /// that fails to decode yields nothing and does not affect the others.
    fn emit(&self, roots: &[PayloadTree], timestamp: DateTime<Utc>) {
        for root in roots {
            match decode(root, &self.selectors, &self.source, timestamp) {
                Ok(records) => {
                    for record in records {
                        self.sink.emit(record);
                    }
                }
                Err(e) => self.sink.report_error(e),
            }
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Drain pushes of one kind until the session fails or `cancel` fires.
///
/// Does not retry: the next redial iteration recovers.
async fn receive_task(ctx: Arc<TaskContext>, kind: NotificationKind, cancel: CancellationToken) {
    loop {
        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = ctx.live.session.receive(kind) => received,
        };

        match received {
            Ok(notification) => {
                let timestamp = notification.event_time.unwrap_or_else(Utc::now);
                ctx.emit(&notification.body, timestamp);
            }
            Err(e) => {
                if !cancel.is_cancelled() {
                    debug!(%kind, error = %e, "receive failed");
                    ctx.sink.report_error(CoreError::ReceiveFailed {
                        reason: e.to_string(),
                    });
                }
                break;
            }
        }
    }
    debug!(%kind, "receive task exiting");
}

/// Issue `get` for one poll request every period until `cancel` fires.
///
/// A failed poll is reported and retried on the next tick. A closed session
/// ends the task so the service can redial.
async fn poll_task(ctx: Arc<TaskContext>, poll: PollRequest, cancel: CancellationToken) {
    let request = Request::Get {
        selector: poll.selector.clone(),
    };
    let mut interval = tokio::time::interval(poll.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = ctx.live.get(&request) => result,
        };

        match result {
            Ok(data) => ctx.emit(&data, Utc::now()),
            Err(e) if e.is_shutdown() => {
                if !cancel.is_cancelled() {
                    ctx.sink.report_error(e);
                }
                break;
            }
            Err(e) => {
                debug!(selector = %poll.selector, error = %e, "poll failed");
                ctx.sink.report_error(e);
            }
        }
    }
    debug!(selector = %poll.selector, "poll task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubscriptionRequest;

    #[test]
    fn kinds_display_lowercase() {
        assert_eq!(ServiceKind::Subscription.to_string(), "subscription");
        assert_eq!(ServiceKind::Polling.to_string(), "polling");
    }

    #[test]
    fn established_push_kinds() {
        let mut established = Established::default();
        assert!(established.is_empty());

        established.add(&RequestSpec::Subscription(SubscriptionRequest {
            selector: "/a".into(),
            trigger: Trigger::OnChange,
            period: None,
            tags: Vec::new(),
        }));
        assert!(!established.is_empty());
        assert_eq!(
            established.push_kinds().collect::<Vec<_>>(),
            vec![NotificationKind::Datastore]
        );
    }
}
