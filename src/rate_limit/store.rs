use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::metrics::ACTIVE_WINDOWS;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

// Post-increment view of a window
#[derive(Debug, Clone, Copy)]
pub struct WindowState {
    pub count: u32,
    pub reset_after_secs: u64,
}

/// Backing store for fixed-window counters.
///
/// `incr` is the single primitive: bump the counter for `key` in the current
/// window and report the post-increment state. The increment must be atomic -
/// two concurrent calls for the same key must observe distinct counts.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(&self, key: &str, window_secs: u64) -> Result<WindowState, StoreError>;
}

// Window entry - count since window_start
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// In-process counter store. One map entry per (policy, identity); the
/// DashMap entry lock covers the whole read-modify-write, so concurrent
/// checks for the same key serialize instead of losing updates.
pub struct MemoryCounterStore {
    windows: DashMap<String, WindowEntry>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    // Drop windows idle longer than `idle_for`, to bound memory.
    // Run periodically from a background task.
    pub fn sweep(&self, idle_for: Duration) {
        self.windows
            .retain(|_, entry| entry.window_start.elapsed() < idle_for);
        ACTIVE_WINDOWS.set(self.windows.len() as f64);
    }

    #[cfg(test)]
    pub fn tracked_windows(&self) -> usize {
        self.windows.len()
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str, window_secs: u64) -> Result<WindowState, StoreError> {
        let window = Duration::from_secs(window_secs);
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_start: Instant::now(),
            });

        let age = entry.window_start.elapsed();
        if age >= window {
            // Window expired - overwrite rather than accumulate
            entry.count = 1;
            entry.window_start = Instant::now();
            return Ok(WindowState {
                count: 1,
                reset_after_secs: window_secs,
            });
        }

        entry.count += 1;
        let reset_after_secs = window.saturating_sub(age).as_secs_f64().ceil() as u64;
        Ok(WindowState {
            count: entry.count,
            reset_after_secs,
        })
    }
}
