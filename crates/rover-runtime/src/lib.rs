//! `rover-runtime` – The Control Loop
//!
//! Turns sensor snapshots into actuator commands and runs the whole vehicle.
//!
//! # Modules
//!
//! - [`arbitration`] – [`Arbiter`][arbitration::Arbiter]: the per-cycle
//!   state machine (obstructed / seeking / centering / aligned), and
//!   [`ArbitrationLoop`][arbitration::ArbitrationLoop], the fixed-cadence
//!   loop that applies its decisions and owns every actuator.
//! - [`harness`] – [`Rover`][harness::Rover]: builds drivers, producers and
//!   the arbitration loop from one configuration and runs the ranging,
//!   vision and arbitration threads until shutdown.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export.
//!
//! # Safety ordering
//!
//! Obstacle avoidance is decided before any tracking logic in every cycle,
//! and only the arbitration thread writes to the pulse driver. Producer
//! threads publish into [`Latest`][rover_perception::Latest] cells and never
//! touch an actuator.

pub mod arbitration;
pub mod harness;
pub mod telemetry;

pub use arbitration::{Arbiter, ArbitrationLoop, ArbitrationState, Decision};
pub use harness::{Hardware, Rover};
pub use telemetry::{TracerProviderGuard, init_tracing};
