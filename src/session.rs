//! Per-session last-write timestamp storage.
//!
//! Each logical client session records the moment of its most recent write.
//! The resolver reads that moment to decide whether replica reads are safe
//! and bumps it after every write. Storage is keyed by session so concurrent
//! requests of the same client observe each other's writes.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a logical client session.
///
/// Typically derived from a session cookie or caller identity by the outer
/// request-handling layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session id from an existing key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generates a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The underlying key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Keyed store of last-write timestamps, one value per session.
///
/// Implementations must tolerate concurrent readers and writers on the same
/// session; last-write-wins is acceptable as long as the stored value is one
/// of the attempted values, never a torn write.
pub trait TimestampStore: Send + Sync {
    /// Returns the session's last-write moment in epoch milliseconds, or
    /// `None` when the session has never written.
    fn last_write_timestamp(&self, session: &SessionId) -> Option<i64>;

    /// Records a write moment for the session.
    ///
    /// The stored value must never decrease; an update older than the current
    /// value is ignored.
    fn set_last_write_timestamp(&self, session: &SessionId, millis: i64);
}

/// In-memory timestamp store backed by a concurrent map.
///
/// Suitable for single-process deployments and tests. Multi-process
/// deployments supply their own store (e.g. backed by the client session
/// itself or a shared cache); eviction is the owner's concern.
#[derive(Debug, Default)]
pub struct InMemoryTimestampStore {
    sessions: DashMap<SessionId, i64>,
}

impl InMemoryTimestampStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session has written yet.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops a session's timestamp, e.g. on logout.
    pub fn evict(&self, session: &SessionId) {
        self.sessions.remove(session);
    }
}

impl TimestampStore for InMemoryTimestampStore {
    fn last_write_timestamp(&self, session: &SessionId) -> Option<i64> {
        self.sessions.get(session).map(|entry| *entry)
    }

    fn set_last_write_timestamp(&self, session: &SessionId, millis: i64) {
        self.sessions
            .entry(session.clone())
            .and_modify(|current| *current = (*current).max(millis))
            .or_insert(millis);
    }
}

/// Timestamp accessor bound to one session.
///
/// The resolver holds one of these per inbound operation; constructing a
/// fresh resolver per operation is safe as long as the handle points at a
/// stable store.
#[derive(Clone)]
pub struct SessionTimestamps {
    store: Arc<dyn TimestampStore>,
    session: SessionId,
}

impl SessionTimestamps {
    /// Binds a session id to a store.
    pub fn bind(store: Arc<dyn TimestampStore>, session: SessionId) -> Self {
        Self { store, session }
    }

    /// The session this handle is bound to.
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// The session's last-write moment in epoch milliseconds.
    pub fn last_write_timestamp(&self) -> Option<i64> {
        self.store.last_write_timestamp(&self.session)
    }

    /// Records a write moment for the session.
    pub fn update_last_write_timestamp(&self, millis: i64) {
        self.store.set_last_write_timestamp(&self.session, millis);
    }
}

impl std::fmt::Debug for SessionTimestamps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTimestamps")
            .field("session", &self.session)
            .finish()
    }
}
