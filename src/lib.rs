//! Switchyard routes read and write database operations between a primary
//! and its replicas.
//!
//! A write pins the client session to the primary for a configurable
//! staleness window (2 seconds by default); once the window passes, reads
//! are released to a replica. Reads forced to the primary run with writes
//! prevented. Connections themselves are opaque to this crate and supplied
//! by a [`ConnectionManager`] implementation.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
/// Time sources for routing decisions
pub mod clock;
/// Database roles and scoped execution contexts
pub mod role;
/// Staleness policy and router configuration
pub mod policy;
/// Per-session last-write timestamp storage
pub mod session;
/// Instrumentation events around routed operations
pub mod telemetry;
/// Connection manager boundary
pub mod manager;
/// The per-operation role resolver
pub mod resolver;
/// Tagged-operation dispatch front door
pub mod selector;

// Re-export common types
pub use error::{Error, Result};
pub use clock::{Clock, SystemClock};
pub use role::{Role, RoleContext};
pub use policy::{ReplicaDelayPolicy, RouterConfig, RoutingPolicy, SEND_TO_REPLICA_DELAY};
pub use session::{InMemoryTimestampStore, SessionId, SessionTimestamps, TimestampStore};
pub use telemetry::{BroadcastTelemetry, EventKind, NullTelemetry, RoutingEvent, Telemetry};
pub use manager::{ConnectionManager, DirectConnections};
pub use resolver::Resolver;
pub use selector::{AccessKind, DatabaseSelector};

/// Version of the Switchyard library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
