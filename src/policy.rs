//! Staleness policy deciding when reads must go to the primary.

use std::time::Duration;

use crate::error::{Error, Result};

/// Minimum time since the last write before reads may go to a replica.
pub const SEND_TO_REPLICA_DELAY: Duration = Duration::from_secs(2);

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Minimum time since the last write before a replica is eligible for reads
    pub delay: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            delay: SEND_TO_REPLICA_DELAY,
        }
    }
}

impl RouterConfig {
    /// Creates a configuration with the given replica delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.delay > Duration::from_secs(24 * 60 * 60) {
            return Err(Error::Config(
                "replica delay must be under 24 hours".into(),
            ));
        }
        Ok(())
    }
}

/// Strategy deciding whether a read must run on the primary.
///
/// `elapsed` is the time since the session's last write, or `None` when the
/// session has never written. Custom policies are composed in as values
/// rather than by subclassing the resolver.
pub trait RoutingPolicy: Send + Sync {
    /// Returns true when the read must be routed to the primary.
    fn should_read_from_primary(&self, elapsed: Option<Duration>) -> bool;
}

/// Default policy: force the primary until `delay` has passed since the
/// session's last write.
///
/// The threshold is inclusive: exactly `delay` elapsed sends the read to a
/// replica. A session with no prior write is treated as infinitely stale.
#[derive(Debug, Clone)]
pub struct ReplicaDelayPolicy {
    delay: Duration,
}

impl ReplicaDelayPolicy {
    /// Creates a policy from the given configuration.
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            delay: config.delay,
        }
    }

    /// The configured replica delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ReplicaDelayPolicy {
    fn default() -> Self {
        Self {
            delay: SEND_TO_REPLICA_DELAY,
        }
    }
}

impl RoutingPolicy for ReplicaDelayPolicy {
    fn should_read_from_primary(&self, elapsed: Option<Duration>) -> bool {
        match elapsed {
            Some(elapsed) => elapsed < self.delay,
            None => false,
        }
    }
}

impl<F> RoutingPolicy for F
where
    F: Fn(Option<Duration>) -> bool + Send + Sync,
{
    fn should_read_from_primary(&self, elapsed: Option<Duration>) -> bool {
        self(elapsed)
    }
}
