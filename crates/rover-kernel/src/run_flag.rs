//! [`RunFlag`] – the one piece of state every loop shares.
//!
//! Each loop polls [`RunFlag::is_running`] once per iteration and exits
//! promptly once it reads `false`. The flag only ever goes from running to
//! stopped; the first [`RunFlag::request_stop`] wins and records why.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Cooperative shutdown flag.
#[derive(Debug, Clone)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    /// A new flag in the running state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask every loop to stop. Returns `true` for the call that actually
    /// flipped the flag; later calls are no-ops.
    pub fn request_stop(&self, reason: &str) -> bool {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        if was_running {
            info!(reason, "shutdown requested");
        }
        was_running
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}
