//! Fixed-window rate limiting with a pluggable backing counter store.

mod redis;
mod store;

pub use redis::RedisCounterStore;
pub use store::{CounterStore, MemoryCounterStore, StoreError, WindowState};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::metrics::{RATE_LIMITED_TOTAL, STORE_ERRORS_TOTAL};

// What a check decided for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        remaining: u32,
        reset_after_secs: u64,
    },
    Denied {
        retry_after_secs: u64,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Per-route limiting policy. Windows are keyed by (policy name, identity),
/// so two policies over the same request stay independent.
#[derive(Debug, Clone)]
pub struct Policy {
    pub name: &'static str,
    pub limit: u32,
    pub window_secs: u64,
}

impl Policy {
    pub fn new(name: &'static str, limit: u32, window_secs: u64) -> Self {
        Self {
            name,
            limit,
            window_secs,
        }
    }
}

// What to do when the counter store is unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailPolicy {
    /// Admit all requests while the store is down
    Open,
    /// Deny all requests while the store is down
    Closed,
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    fail_policy: FailPolicy,
    store_timeout: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, fail_policy: FailPolicy, store_timeout: Duration) -> Self {
        Self {
            store,
            fail_policy,
            store_timeout,
        }
    }

    /// Consume one unit of quota for `identity` under `policy`.
    ///
    /// Every call increments the stored window, allowed or not. Store errors
    /// and timeouts never surface to the caller; they resolve through the
    /// configured fail policy.
    pub async fn check(&self, policy: &Policy, identity: &str) -> Decision {
        let key = format!("{}:{}", policy.name, identity);
        let window_secs = policy.window_secs.max(1);

        let state = match timeout(self.store_timeout, self.store.incr(&key, window_secs)).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => return self.degraded(policy, &e.to_string()),
            Err(_) => return self.degraded(policy, "counter store timed out"),
        };

        if state.count <= policy.limit {
            Decision::Allowed {
                remaining: policy.limit - state.count,
                reset_after_secs: state.reset_after_secs,
            }
        } else {
            RATE_LIMITED_TOTAL.inc();
            Decision::Denied {
                retry_after_secs: state.reset_after_secs,
            }
        }
    }

    fn degraded(&self, policy: &Policy, reason: &str) -> Decision {
        STORE_ERRORS_TOTAL.inc();
        match self.fail_policy {
            FailPolicy::Open => {
                tracing::warn!(policy = policy.name, reason, "counter store unavailable, failing open");
                Decision::Allowed {
                    remaining: policy.limit,
                    reset_after_secs: policy.window_secs,
                }
            }
            FailPolicy::Closed => {
                tracing::warn!(policy = policy.name, reason, "counter store unavailable, failing closed");
                Decision::Denied {
                    retry_after_secs: policy.window_secs,
                }
            }
        }
    }
}
