//! Front door dispatching tagged operations through per-operation resolvers.
//!
//! An outer request-handling layer tags each inbound operation read-or-write
//! and names the client session; the selector binds the session's timestamp
//! accessor, constructs a fresh [`Resolver`], and dispatches. HTTP itself
//! stays outside this crate; only the tag crosses the boundary.

use std::future::Future;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::manager::ConnectionManager;
use crate::policy::{ReplicaDelayPolicy, RouterConfig, RoutingPolicy};
use crate::resolver::Resolver;
use crate::role::RoleContext;
use crate::session::{SessionId, SessionTimestamps, TimestampStore};
use crate::telemetry::{NullTelemetry, Telemetry};

/// Whether an inbound operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Read-only operation, eligible for replica routing
    Read,
    /// Mutating operation, always routed to the primary
    Write,
}

impl AccessKind {
    /// Tags an HTTP method: GET and HEAD read, everything else writes.
    pub fn from_http_method(method: &str) -> Self {
        if method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD") {
            AccessKind::Read
        } else {
            AccessKind::Write
        }
    }
}

/// Binds sessions to resolvers and dispatches tagged operations.
pub struct DatabaseSelector<C> {
    /// Connection manager shared by all resolvers
    connections: Arc<C>,
    /// Keyed last-write timestamp store
    store: Arc<dyn TimestampStore>,
    /// Staleness policy shared by all resolvers
    policy: Arc<dyn RoutingPolicy>,
    /// Instrumentation sink
    telemetry: Arc<dyn Telemetry>,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl<C: ConnectionManager> DatabaseSelector<C> {
    /// Creates a selector with the default delay policy, no telemetry, and
    /// the system clock.
    pub fn new(
        connections: Arc<C>,
        store: Arc<dyn TimestampStore>,
        config: RouterConfig,
    ) -> Self {
        Self {
            connections,
            store,
            policy: Arc::new(ReplicaDelayPolicy::new(&config)),
            telemetry: Arc::new(NullTelemetry),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the routing policy.
    pub fn with_policy(mut self, policy: Arc<dyn RoutingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the telemetry sink.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Constructs a per-operation resolver bound to the given session.
    pub fn resolver(&self, session: SessionId) -> Resolver<C> {
        let timestamps = SessionTimestamps::bind(self.store.clone(), session);
        Resolver::new(
            self.connections.clone(),
            timestamps,
            RouterConfig::default(),
        )
        .with_policy(self.policy.clone())
        .with_telemetry(self.telemetry.clone())
        .with_clock(self.clock.clone())
    }

    /// Dispatches one tagged operation for the session.
    pub async fn run<T, F, Fut>(
        &self,
        session: SessionId,
        kind: AccessKind,
        op: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let resolver = self.resolver(session);
        match kind {
            AccessKind::Read => resolver.read(op).await,
            AccessKind::Write => resolver.write(op).await,
        }
    }
}

impl<C> std::fmt::Debug for DatabaseSelector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSelector").finish()
    }
}
