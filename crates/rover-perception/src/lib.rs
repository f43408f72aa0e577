//! `rover-perception` – sensor producers and the snapshots they publish.
//!
//! # Modules
//!
//! - [`snapshot`] – [`Latest`][snapshot::Latest]: lock-guarded last-value
//!   cell; readers always get one self-consistent record.
//! - [`range`] – [`RangeMonitor`][range::RangeMonitor]: trigger/echo ranging
//!   with a deadline on every wait, yielding a
//!   [`DistanceSample`][rover_types::DistanceSample].
//! - [`tracker`] – [`TargetTracker`][tracker::TargetTracker]: best-confidence
//!   selection of the configured class, yielding a
//!   [`DetectionResult`][rover_types::DetectionResult].

pub mod range;
pub mod snapshot;
pub mod tracker;

pub use range::{RangeMonitor, RangeSensor, distance_from_pulse};
pub use snapshot::{Latest, Snapshot};
pub use tracker::{TargetTracker, select_target};
