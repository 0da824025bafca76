//! Ban fan-out to every live cache server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use edge_cache::BanPattern;
use edge_observability::InvalidationMetrics;
use futures::future::join_all;
use http::Method;
use tracing::{debug, warn, Instrument};

use crate::error::TransportError;
use crate::registry::{CacheServer, ServerRegistry};
use crate::transport::{BanRequest, BanResponse, BanTransport};

/// Result of sending one ban to one server.
#[derive(Debug)]
pub struct ServerOutcome {
    /// The server addressed.
    pub server: CacheServer,
    /// Its answer, or why there was none.
    pub result: Result<BanResponse, TransportError>,
    /// Time spent on the exchange.
    pub elapsed: Duration,
}

impl ServerOutcome {
    /// Whether the server acknowledged the ban.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-server outcomes of one dispatched ban.
#[derive(Debug)]
pub struct DispatchReport {
    /// The request sent.
    pub request: BanRequest,
    /// One outcome per live server, in registry order.
    pub outcomes: Vec<ServerOutcome>,
}

impl DispatchReport {
    /// Number of servers addressed.
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of servers that acknowledged the ban.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of servers that failed.
    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ServerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// True when every addressed server acknowledged the ban.
    ///
    /// Also true for an empty live set.
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Sends ban requests to every live server in the registry.
///
/// Servers are addressed concurrently and independently: a failure on one
/// is logged and recorded but never affects the others, and `dispatch`
/// itself never fails.
pub struct Dispatcher<R, T> {
    registry: R,
    transport: T,
    method: Method,
    metrics: Arc<InvalidationMetrics>,
}

impl<R: ServerRegistry, T: BanTransport> Dispatcher<R, T> {
    /// Create a dispatcher sending `method` requests.
    pub fn new(registry: R, transport: T, method: Method) -> Self {
        Self {
            registry,
            transport,
            method,
            metrics: Arc::new(InvalidationMetrics::new()),
        }
    }

    /// Share counters with other dispatchers.
    pub fn with_metrics(mut self, metrics: Arc<InvalidationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The ban method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The server registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The invalidation counters.
    pub fn metrics(&self) -> &Arc<InvalidationMetrics> {
        &self.metrics
    }

    /// Ban `pattern` on every live server with the configured method.
    pub async fn ban(&self, pattern: &BanPattern) -> DispatchReport {
        self.dispatch(BanRequest::for_pattern(self.method.clone(), pattern)).await
    }

    /// Send `request` to every live server and wait for all of them.
    pub async fn dispatch(&self, request: BanRequest) -> DispatchReport {
        let span = tracing::debug_span!("ban", pattern = %request.pattern(), host = ?request.host());
        self.fan_out(request).instrument(span).await
    }

    async fn fan_out(&self, request: BanRequest) -> DispatchReport {
        let servers = self.registry.live_servers();
        self.metrics.record_dispatch(servers.len());

        debug!(
            method = %request.method(),
            pattern = %request.pattern(),
            host = request.host().unwrap_or("-"),
            servers = servers.len(),
            "dispatching ban"
        );

        if servers.is_empty() {
            return DispatchReport {
                request,
                outcomes: Vec::new(),
            };
        }

        let req = &request;
        let attempts = servers.into_iter().map(|server| async move {
            let start = Instant::now();
            let result = self.transport.send(&server, req).await;
            ServerOutcome {
                server,
                result,
                elapsed: start.elapsed(),
            }
        });
        let outcomes = join_all(attempts).await;

        for outcome in &outcomes {
            self.metrics.record_attempt(outcome.is_success());
            match &outcome.result {
                Ok(response) => debug!(
                    server = %outcome.server,
                    status = response.status,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "ban acknowledged"
                ),
                Err(e) => warn!(
                    server = %outcome.server,
                    pattern = %request.pattern(),
                    error = %e,
                    "ban failed"
                ),
            }
        }

        DispatchReport { request, outcomes }
    }
}
