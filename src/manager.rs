//! Connection manager boundary.
//!
//! The resolver decides a role and hands the wrapped operation to a
//! `ConnectionManager`, which executes it against whatever connection it
//! holds for that role. Acquisition, pooling, and failover live behind this
//! trait and are not this crate's concern.

use std::future::Future;

use async_trait::async_trait;

use crate::error::Result;
use crate::role::{Role, RoleContext};

/// Capability executing operations against role-specific connections.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Executes `op` against the connection held for `role`.
    ///
    /// The operation receives a [`RoleContext`] pinned to that role; writes
    /// are permitted only on the primary.
    async fn execute_as<T, F, Fut>(&self, role: Role, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static;

    /// Executes `op` pinned to the primary with writes rejected.
    ///
    /// Used for reads forced to the primary inside the staleness window; any
    /// write attempted through the context fails with
    /// [`Error::ForbiddenWrite`](crate::Error::ForbiddenWrite).
    async fn execute_with_writes_disabled<T, F, Fut>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static;
}

/// Minimal manager that runs operations in place.
///
/// Mints the role context and invokes the operation directly; the operation
/// itself owns whatever connection handles it needs. Default wiring for
/// embedders that already scope connections elsewhere, and the manager used
/// throughout the test suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectConnections;

#[async_trait]
impl ConnectionManager for DirectConnections {
    async fn execute_as<T, F, Fut>(&self, role: Role, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        tracing::trace!(?role, "executing operation");
        op(RoleContext::new(role)).await
    }

    async fn execute_with_writes_disabled<T, F, Fut>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RoleContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        tracing::trace!("executing operation on primary with writes prevented");
        op(RoleContext::primary_with_writes_prevented()).await
    }
}
