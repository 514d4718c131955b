//! Instrumentation events emitted around routed operations.
//!
//! Every `read`/`write` dispatched by the resolver produces exactly one
//! event wrapping the operation's execution span, including when the
//! operation fails. Events are observability only; routing never consults
//! them.

use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::role::Role;

/// Kind of routed operation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A read forced to the primary inside the staleness window
    ReadFromPrimary,
    /// A read served by a replica
    ReadFromReplica,
    /// A write, always on the primary
    WroteToPrimary,
}

impl EventKind {
    /// Event name as emitted on the wire, e.g. `read_from_replica`.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ReadFromPrimary => "read_from_primary",
            EventKind::ReadFromReplica => "read_from_replica",
            EventKind::WroteToPrimary => "wrote_to_primary",
        }
    }
}

/// One operation's execution span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEvent {
    /// What kind of routed operation ran
    pub kind: EventKind,
    /// Role the operation executed under
    pub role: Role,
    /// Span start, milliseconds since the Unix epoch
    pub started_at: i64,
    /// Span duration in milliseconds
    pub duration_ms: u64,
    /// Whether the wrapped operation completed without error
    pub success: bool,
}

/// Measures one operation's execution span.
///
/// Started before the operation runs and finished after it returns, so the
/// resulting event wraps exactly the execution, failures included.
#[derive(Debug)]
pub struct SpanTimer {
    started_at: i64,
    begun: Instant,
}

impl SpanTimer {
    /// Starts timing a span.
    pub fn start(clock: &dyn Clock) -> Self {
        Self {
            started_at: clock.now_millis(),
            begun: Instant::now(),
        }
    }

    /// Closes the span into an event.
    pub fn finish(self, kind: EventKind, role: Role, success: bool) -> RoutingEvent {
        RoutingEvent {
            kind,
            role,
            started_at: self.started_at,
            duration_ms: self.begun.elapsed().as_millis() as u64,
            success,
        }
    }
}

/// Sink accepting routing events.
pub trait Telemetry: Send + Sync {
    /// Records one completed operation span.
    fn record(&self, event: RoutingEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn record(&self, _event: RoutingEvent) {}
}

/// Sink fanning events out over a broadcast channel.
///
/// Subscribers that fall behind lose the oldest events; the sender never
/// blocks the routed operation.
#[derive(Debug)]
pub struct BroadcastTelemetry {
    event_tx: broadcast::Sender<RoutingEvent>,
}

impl BroadcastTelemetry {
    /// Creates a sink with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self { event_tx }
    }

    /// Subscribes to routing events.
    pub fn subscribe(&self) -> broadcast::Receiver<RoutingEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for BroadcastTelemetry {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Telemetry for BroadcastTelemetry {
    fn record(&self, event: RoutingEvent) {
        tracing::debug!(
            event = event.kind.name(),
            duration_ms = event.duration_ms,
            success = event.success,
            "routed operation completed"
        );
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

/// Sink collecting events in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<RoutingEvent>>,
}

impl MemoryTelemetry {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far.
    pub fn events(&self) -> Vec<RoutingEvent> {
        self.events.lock().clone()
    }

    /// Number of events recorded.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, event: RoutingEvent) {
        self.events.lock().push(event);
    }
}
