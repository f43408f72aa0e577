//! [`Watchdog`] – producer health monitor.
//!
//! Every producer loop (ranging, vision) calls [`Watchdog::heartbeat`] once
//! per iteration. The watchdog tracks the timestamp of each heartbeat and
//! considers a component *stale* when its deadline has been exceeded.
//!
//! The handle is cheap to clone and shared across threads; call
//! [`Watchdog::check_all`] from the consumer loop to find stale producers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Health state reported for a single component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentHealth {
    /// The component has sent a heartbeat within its deadline.
    Healthy,
    /// The component has not sent a heartbeat within its deadline.
    TimedOut,
}

// ────────────────────────────────────────────────────────────────────────────
// Internal entry
// ────────────────────────────────────────────────────────────────────────────

struct ComponentEntry {
    last_heartbeat: Instant,
    timeout: Duration,
}

// ────────────────────────────────────────────────────────────────────────────
// Watchdog
// ────────────────────────────────────────────────────────────────────────────

/// Tracks heartbeats from registered producers and detects stale ones.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use rover_kernel::watchdog::{Watchdog, ComponentHealth};
///
/// let wd = Watchdog::new();
/// wd.register("ranging", Duration::from_secs(1));
/// let producer = wd.clone();
/// producer.heartbeat("ranging");
///
/// assert_eq!(wd.health("ranging"), ComponentHealth::Healthy);
/// ```
#[derive(Clone, Default)]
pub struct Watchdog {
    components: Arc<Mutex<HashMap<String, ComponentEntry>>>,
}

impl Watchdog {
    /// Create an empty watchdog with no registered components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component_id` with a maximum heartbeat `timeout`.
    ///
    /// The component starts healthy. Re-registering resets its deadline.
    pub fn register(&self, component_id: &str, timeout: Duration) {
        self.components.lock().insert(
            component_id.to_string(),
            ComponentEntry {
                last_heartbeat: Instant::now(),
                timeout,
            },
        );
    }

    /// Record a heartbeat for `component_id`, resetting its deadline.
    ///
    /// No-ops for components that have not been registered.
    pub fn heartbeat(&self, component_id: &str) {
        if let Some(entry) = self.components.lock().get_mut(component_id) {
            entry.last_heartbeat = Instant::now();
        }
    }

    /// Return the [`ComponentHealth`] of `component_id`.
    ///
    /// Returns [`ComponentHealth::TimedOut`] for unknown components.
    pub fn health(&self, component_id: &str) -> ComponentHealth {
        match self.components.lock().get(component_id) {
            Some(entry) if entry.last_heartbeat.elapsed() <= entry.timeout => {
                ComponentHealth::Healthy
            }
            _ => ComponentHealth::TimedOut,
        }
    }

    /// IDs of all components whose deadline has passed, sorted.
    pub fn check_all(&self) -> Vec<String> {
        let mut stale: Vec<String> = self
            .components
            .lock()
            .iter()
            .filter(|(_, entry)| entry.last_heartbeat.elapsed() > entry.timeout)
            .map(|(id, _)| id.clone())
            .collect();
        stale.sort();
        stale
    }
}
