//! Database roles and the scoped context an operation runs under.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Database connection role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Writer connection with the most current data
    Primary,
    /// Reader connection that may lag the primary
    Replica,
}

impl Role {
    /// Returns true for the primary role.
    pub fn is_primary(&self) -> bool {
        matches!(self, Role::Primary)
    }
}

/// Execution scope handed to a wrapped operation.
///
/// Carries the role the operation was routed to and whether writes are
/// permitted inside the scope. The context is passed by value into the
/// operation, so leaving the scope needs no teardown; dropping the context
/// ends it on every exit path.
///
/// Reads forced to the primary run with writes prevented, guarding against
/// read handlers that mutate state as a side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleContext {
    role: Role,
    writes_allowed: bool,
}

impl RoleContext {
    /// Creates a context for the given role with writes permitted on the
    /// primary and rejected on replicas.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            writes_allowed: role.is_primary(),
        }
    }

    /// Creates a primary-pinned context with writes rejected.
    pub fn primary_with_writes_prevented() -> Self {
        Self {
            role: Role::Primary,
            writes_allowed: false,
        }
    }

    /// The role this scope is pinned to.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether write statements may execute inside this scope.
    pub fn writes_allowed(&self) -> bool {
        self.writes_allowed
    }

    /// Checks that a write is permitted, returning `Error::ForbiddenWrite`
    /// when the scope is write-preventing.
    ///
    /// Operations call this before issuing any mutating statement.
    pub fn ensure_writes_allowed(&self) -> Result<()> {
        if self.writes_allowed {
            Ok(())
        } else {
            Err(Error::ForbiddenWrite)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_context_allows_writes() {
        let ctx = RoleContext::new(Role::Primary);
        assert_eq!(ctx.role(), Role::Primary);
        assert!(ctx.writes_allowed());
        assert!(ctx.ensure_writes_allowed().is_ok());
    }

    #[test]
    fn test_replica_context_rejects_writes() {
        let ctx = RoleContext::new(Role::Replica);
        assert_eq!(ctx.role(), Role::Replica);
        assert!(!ctx.writes_allowed());
        assert!(matches!(
            ctx.ensure_writes_allowed(),
            Err(Error::ForbiddenWrite)
        ));
    }

    #[test]
    fn test_forced_primary_read_context() {
        let ctx = RoleContext::primary_with_writes_prevented();
        assert_eq!(ctx.role(), Role::Primary);
        assert!(matches!(
            ctx.ensure_writes_allowed(),
            Err(Error::ForbiddenWrite)
        ));
    }
}
