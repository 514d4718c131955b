//! Request-scoped role resolver.
//!
//! One resolver is constructed per inbound operation. It decides whether the
//! operation runs on the primary or a replica, executes it through the
//! connection manager under that role, and keeps the session's last-write
//! timestamp current.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::manager::ConnectionManager;
use crate::policy::{ReplicaDelayPolicy, RouterConfig, RoutingPolicy};
use crate::role::{Role, RoleContext};
use crate::session::SessionTimestamps;
use crate::telemetry::{EventKind, NullTelemetry, SpanTimer, Telemetry};

/// Routes one session's reads and writes between primary and replica.
///
/// Holds no shared state of its own; the session's last-write timestamp is
/// reached through the bound [`SessionTimestamps`] handle, so constructing a
/// fresh resolver per operation is cheap and safe.
pub struct Resolver<C> {
    /// Connection manager executing operations under a role
    connections: Arc<C>,
    /// Session-bound last-write timestamp accessor
    timestamps: SessionTimestamps,
    /// Staleness policy
    policy: Arc<dyn RoutingPolicy>,
    /// Instrumentation sink
    telemetry: Arc<dyn Telemetry>,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl<C: ConnectionManager> Resolver<C> {
    /// Creates a resolver with the default delay policy, no telemetry, and
    /// the system clock.
    pub fn new(
        connections: Arc<C>,
        timestamps: SessionTimestamps,
        config: RouterConfig,
    ) -> Self {
        Self {
            connections,
            timestamps,
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

    /// Executes a read under the chosen role and returns its result
    /// unchanged.
    ///
    /// Reads inside the staleness window are forced to the primary with
    /// writes prevented; otherwise they run on a replica. Exactly one
    /// telemetry event wraps the execution, also when the operation fails.
    pub async fn read<T, F, Fut>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if self.should_read_from_primary() {
            self.read_from_primary(op).await
        } else {
            self.read_from_replica(op).await
        }
    }

    /// Executes a write on the primary and returns its result unchanged.
    ///
    /// The session's last-write timestamp is updated on every exit path,
    /// success and failure alike, before the result propagates. A failed
    /// write therefore still pins the session's next reads to the primary
    /// for the duration of the staleness window.
    pub async fn write<T, F, Fut>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let span = SpanTimer::start(&*self.clock);
        let result = self.connections.execute_as(Role::Primary, op).await;
        self.timestamps
            .update_last_write_timestamp(self.clock.now_millis());
        self.telemetry
            .record(span.finish(EventKind::WroteToPrimary, Role::Primary, result.is_ok()));
        result
    }

    /// Whether a read must currently be routed to the primary.
    pub fn should_read_from_primary(&self) -> bool {
        let elapsed = self.time_since_last_write();
        let to_primary = self.policy.should_read_from_primary(elapsed);
        tracing::trace!(
            session = %self.timestamps.session().as_str(),
            ?elapsed,
            to_primary,
            "routing decision"
        );
        to_primary
    }

    /// Time since the session's last write, `None` when it has never
    /// written.
    fn time_since_last_write(&self) -> Option<Duration> {
        self.timestamps.last_write_timestamp().map(|last| {
            // Clock skew may put `last` ahead of now; clamp to zero, which
            // keeps the read on the primary.
            let millis = self.clock.now_millis().saturating_sub(last).max(0);
            Duration::from_millis(millis as u64)
        })
    }

    async fn read_from_primary<T, F, Fut>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let span = SpanTimer::start(&*self.clock);
        let result = self.connections.execute_with_writes_disabled(op).await;
        self.telemetry
            .record(span.finish(EventKind::ReadFromPrimary, Role::Primary, result.is_ok()));
        result
    }

    async fn read_from_replica<T, F, Fut>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let span = SpanTimer::start(&*self.clock);
        let result = self.connections.execute_as(Role::Replica, op).await;
        self.telemetry
            .record(span.finish(EventKind::ReadFromReplica, Role::Replica, result.is_ok()));
        result
    }
}

impl<C> std::fmt::Debug for Resolver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("session", self.timestamps.session())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Error;
    use crate::manager::DirectConnections;
    use crate::session::{InMemoryTimestampStore, SessionId, TimestampStore};
    use crate::telemetry::MemoryTelemetry;

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<InMemoryTimestampStore>,
        telemetry: Arc<MemoryTelemetry>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                clock: ManualClock::starting_at(0),
                store: Arc::new(InMemoryTimestampStore::new()),
                telemetry: Arc::new(MemoryTelemetry::new()),
            }
        }

        fn resolver(&self, session: &str) -> Resolver<DirectConnections> {
            let timestamps = SessionTimestamps::bind(
                self.store.clone(),
                SessionId::new(session),
            );
            Resolver::new(
                Arc::new(DirectConnections),
                timestamps,
                RouterConfig::default(),
            )
            .with_clock(self.clock.clone())
            .with_telemetry(self.telemetry.clone())
        }
    }

    async fn observed_role(resolver: &Resolver<DirectConnections>) -> Role {
        resolver
            .read(|ctx| async move { Ok(ctx.role()) })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_read_with_no_prior_write_goes_to_replica() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        assert!(!resolver.should_read_from_primary());
        assert_eq!(observed_role(&resolver).await, Role::Replica);
    }

    #[tokio::test]
    async fn test_read_inside_window_goes_to_primary() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        resolver.write(|_ctx| async move { Ok(()) }).await.unwrap();

        fx.clock.advance(1_000);
        assert_eq!(observed_role(&resolver).await, Role::Primary);
    }

    #[tokio::test]
    async fn test_window_boundary_is_inclusive() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        resolver.write(|_ctx| async move { Ok(()) }).await.unwrap();

        // Exactly `delay` elapsed routes to the replica.
        fx.clock.advance(2_000);
        assert_eq!(observed_role(&resolver).await, Role::Replica);
    }

    #[tokio::test]
    async fn test_write_runs_on_primary_and_records_timestamp() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");
        fx.clock.set(5_000);

        let role = resolver
            .write(|ctx| async move {
                ctx.ensure_writes_allowed()?;
                Ok(ctx.role())
            })
            .await
            .unwrap();
        assert_eq!(role, Role::Primary);
        assert_eq!(
            fx.store.last_write_timestamp(&SessionId::new("alice")),
            Some(5_000)
        );
    }

    #[tokio::test]
    async fn test_failed_write_still_updates_timestamp() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");
        fx.clock.set(5_000);

        let result: Result<()> = resolver
            .write(|_ctx| async move { Err(Error::connection("primary down")) })
            .await;
        assert!(matches!(result, Err(Error::Connection(_))));

        // Conservative bias: the session counts as having just written.
        assert_eq!(
            fx.store.last_write_timestamp(&SessionId::new("alice")),
            Some(5_000)
        );
        fx.clock.advance(500);
        assert_eq!(observed_role(&resolver).await, Role::Primary);
    }

    #[tokio::test]
    async fn test_forced_primary_read_prevents_writes() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        resolver.write(|_ctx| async move { Ok(()) }).await.unwrap();
        fx.clock.advance(100);

        let result: Result<()> = resolver
            .read(|ctx| async move {
                ctx.ensure_writes_allowed()?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::ForbiddenWrite)));

        // The read's event still completed, wrapping the failure.
        let events = fx.telemetry.events();
        let last = events.last().unwrap();
        assert_eq!(last.kind, EventKind::ReadFromPrimary);
        assert!(!last.success);
    }

    #[tokio::test]
    async fn test_replica_read_scope_also_prevents_writes() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        let result: Result<()> = resolver
            .read(|ctx| async move {
                ctx.ensure_writes_allowed()?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::ForbiddenWrite)));
    }

    #[tokio::test]
    async fn test_two_second_delay_scenario() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        // t=0: write succeeds, timestamp=0.
        resolver.write(|_ctx| async move { Ok(()) }).await.unwrap();
        assert_eq!(
            fx.store.last_write_timestamp(&SessionId::new("alice")),
            Some(0)
        );

        // t=1s: 1s elapsed < 2s, primary.
        fx.clock.set(1_000);
        assert_eq!(observed_role(&resolver).await, Role::Primary);

        // t=3s: 3s elapsed >= 2s, replica.
        fx.clock.set(3_000);
        assert_eq!(observed_role(&resolver).await, Role::Replica);

        // t=3.1s: write, timestamp=3.1s.
        fx.clock.set(3_100);
        resolver.write(|_ctx| async move { Ok(()) }).await.unwrap();
        assert_eq!(
            fx.store.last_write_timestamp(&SessionId::new("alice")),
            Some(3_100)
        );

        // t=4s: 0.9s elapsed < 2s, primary.
        fx.clock.set(4_000);
        assert_eq!(observed_role(&resolver).await, Role::Primary);
    }

    #[tokio::test]
    async fn test_sessions_route_independently() {
        let fx = Fixture::new();
        let alice = fx.resolver("alice");
        let bob = fx.resolver("bob");

        alice.write(|_ctx| async move { Ok(()) }).await.unwrap();
        fx.clock.advance(500);

        assert_eq!(observed_role(&alice).await, Role::Primary);
        assert_eq!(observed_role(&bob).await, Role::Replica);
    }

    #[tokio::test]
    async fn test_each_call_emits_exactly_one_event() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        resolver.write(|_ctx| async move { Ok(()) }).await.unwrap();
        fx.clock.advance(100);
        let _ = observed_role(&resolver).await;
        fx.clock.advance(5_000);
        let _ = observed_role(&resolver).await;

        let kinds: Vec<_> = fx
            .telemetry
            .events()
            .into_iter()
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::WroteToPrimary,
                EventKind::ReadFromPrimary,
                EventKind::ReadFromReplica,
            ]
        );
    }

    #[tokio::test]
    async fn test_event_spans_the_operation() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        resolver
            .read(|_ctx| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(())
            })
            .await
            .unwrap();

        let events = fx.telemetry.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].duration_ms >= 20);
        assert!(events[0].success);
    }

    #[tokio::test]
    async fn test_custom_policy_overrides_routing() {
        let fx = Fixture::new();
        let resolver = fx
            .resolver("alice")
            .with_policy(Arc::new(|_: Option<Duration>| true));

        // No prior write, but the policy pins every read to the primary.
        assert!(resolver.should_read_from_primary());
        assert_eq!(observed_role(&resolver).await, Role::Primary);
    }

    #[tokio::test]
    async fn test_skewed_store_timestamp_keeps_primary() {
        let fx = Fixture::new();
        let resolver = fx.resolver("alice");

        // A timestamp ahead of the local clock clamps to zero elapsed.
        fx.store
            .set_last_write_timestamp(&SessionId::new("alice"), 10_000);
        fx.clock.set(9_000);
        assert_eq!(observed_role(&resolver).await, Role::Primary);
    }
}
