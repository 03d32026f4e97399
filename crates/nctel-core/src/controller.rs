// ── Controller ──
//
// Owns one server address and the services collecting from it. `start`
// builds the shared selector registry and launches every configured
// service; `stop` cancels them, closes their sessions, and joins them.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nctel_api::Connector;

use crate::config::{ControllerConfig, RequestSpec};
use crate::error::CoreError;
use crate::selector::SelectorRegistry;
use crate::service::{Service, ServiceKind, ServiceState};
use crate::sink::Sink;

/// Collection entry point for one server.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Can be restarted after
/// [`stop`](Self::stop).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: Arc<ControllerConfig>,
    connector: Arc<dyn Connector>,
    cancel: CancellationToken,
    /// Child token for the current run, replaced on each start.
    cancel_child: Mutex<CancellationToken>,
    services: Mutex<Vec<Arc<Service>>>,
    selectors: Mutex<Arc<SelectorRegistry>>,
    tasks: Mutex<JoinSet<()>>,
}

impl Controller {
    /// Create a controller. Does NOT connect; call [`start`](Self::start).
    pub fn new(config: ControllerConfig, connector: Arc<dyn Connector>) -> Self {
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        Self {
            inner: Arc::new(ControllerInner {
                config: Arc::new(config),
                connector,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                services: Mutex::new(Vec::new()),
                selectors: Mutex::new(Arc::new(SelectorRegistry::new())),
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Launch every configured service, emitting into `sink`.
    ///
    /// Fails when no service is configured. Also refused while running and
    /// after [`shutdown`](Self::shutdown).
    pub async fn start(&self, sink: Arc<dyn Sink>) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::config(format!(
                "controller for {} has been shut down",
                self.inner.config.address
            )));
        }

        let mut services = self.inner.services.lock().await;
        if !services.is_empty() {
            return Err(CoreError::config(format!(
                "controller for {} is already running",
                self.inner.config.address
            )));
        }

        let specs: Vec<RequestSpec> = self.inner.config.request_specs().collect();
        let selectors = Arc::new(SelectorRegistry::from_specs(&specs));
        *self.inner.selectors.lock().await = Arc::clone(&selectors);

        let planned = self.planned_services();
        if planned.is_empty() {
            return Err(CoreError::config(format!(
                "no services configured for {}",
                self.inner.config.address
            )));
        }

        // Fresh child token so a stopped controller can be started again.
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let mut tasks = self.inner.tasks.lock().await;
        for (kind, requests) in planned {
            let service = Arc::new(Service::new(
                kind,
                requests,
                Arc::clone(&self.inner.config),
                Arc::clone(&self.inner.connector),
                Arc::clone(&selectors),
                Arc::clone(&sink),
            ));
            services.push(Arc::clone(&service));

            let cancel = child.clone();
            tasks.spawn(async move { service.run(cancel).await });
        }

        info!(
            address = %self.inner.config.address,
            services = services.len(),
            measurements = selectors.measurements().count(),
            tags = selectors.tags().count(),
            "controller started"
        );
        Ok(())
    }

    /// Cancel all services, close their sessions, and wait for them to exit.
    pub async fn stop(&self) {
        self.inner.cancel_child.lock().await.cancel();

        // Close before joining: a task blocked in receive only wakes when
        // its session goes away or it observes the token.
        let services = std::mem::take(&mut *self.inner.services.lock().await);
        for service in &services {
            service.close_session().await;
        }

        let mut tasks = std::mem::take(&mut *self.inner.tasks.lock().await);
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "service task aborted");
            }
        }

        debug!(address = %self.inner.config.address, "controller stopped");
    }

    /// Stop and prevent any further start.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.stop().await;
    }

    // ── Observability ────────────────────────────────────────────

    /// Snapshot of each running service's state.
    pub async fn service_states(&self) -> Vec<(ServiceKind, ServiceState)> {
        self.inner
            .services
            .lock()
            .await
            .iter()
            .map(|service| (service.kind(), service.state()))
            .collect()
    }

    /// Selector registry of the current (or last) run.
    pub async fn selectors(&self) -> Arc<SelectorRegistry> {
        Arc::clone(&*self.inner.selectors.lock().await)
    }

    fn planned_services(&self) -> Vec<(ServiceKind, Vec<RequestSpec>)> {
        let config = &self.inner.config;
        let mut planned = Vec::new();

        if let Some(subscription) = &config.subscription {
            let requests = subscription
                .subscriptions
                .iter()
                .cloned()
                .map(RequestSpec::Subscription)
                .chain(
                    subscription
                        .notifications
                        .iter()
                        .cloned()
                        .map(RequestSpec::Notification),
                )
                .collect();
            planned.push((ServiceKind::Subscription, requests));
        }
        if let Some(polling) = &config.polling {
            let requests = polling.polls.iter().cloned().map(RequestSpec::Poll).collect();
            planned.push((ServiceKind::Polling, requests));
        }
        planned
    }
}
