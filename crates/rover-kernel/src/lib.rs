//! `rover-kernel` – Loop Supervision
//!
//! Cross-loop coordination for the control stack. It does not decide
//! anything; it tells loops when to stop and notices when one goes quiet.
//!
//! # Modules
//!
//! - [`run_flag`] – [`RunFlag`][run_flag::RunFlag]: the shared "running" flag
//!   every loop polls once per iteration; set once on shutdown.
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: tracks heartbeats from
//!   the producer loops so the arbitration loop can report stale sensors.

pub mod run_flag;
pub mod watchdog;

pub use run_flag::RunFlag;
pub use watchdog::{ComponentHealth, Watchdog};
