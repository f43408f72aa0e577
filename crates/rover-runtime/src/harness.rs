//! [`Rover`] – wires drivers, producers and the arbitration loop together and
//! runs them as three threads.
//!
//! ```text
//!  ranging thread ──► Latest<DistanceSample> ─┐
//!                                              ├──► arbitration thread ──► PulseBus
//!  vision thread  ──► Latest<DetectionResult> ─┘
//! ```
//!
//! The threads share nothing but the two snapshot cells, the [`Watchdog`]
//! and the [`RunFlag`]. Construction validates the configuration and builds
//! every component before any thread starts; [`Rover::run`] returns only
//! after all three threads have joined and the pulse driver is released.
//! A panicking producer clears the run flag, which winds the other loops
//! down and neutralises the outputs.

use std::thread;
use std::time::Duration;

use rover_hal::{
    Camera, DriveController, EchoPins, ObjectDetector, PanTiltController, PulseBus, PulseOutput,
};
use rover_kernel::{RunFlag, Watchdog};
use rover_perception::{Latest, RangeMonitor, RangeSensor, TargetTracker};
use rover_types::config::RoverConfig;
use rover_types::{DetectionResult, DistanceSample, RoverError};
use tracing::{debug, error, info};

use crate::arbitration::{ArbitrationLoop, Inputs};

/// Watchdog name of the ranging producer.
pub const RANGING: &str = "ranging";
/// Watchdog name of the vision producer.
pub const VISION: &str = "vision";

/// The concrete drivers a [`Rover`] runs on.
pub struct Hardware {
    pub pulse: Box<dyn PulseOutput>,
    pub echo: Box<dyn EchoPins>,
    pub camera: Box<dyn Camera>,
    pub detector: Box<dyn ObjectDetector>,
}

/// A fully constructed vehicle, ready to run.
pub struct Rover {
    bus: PulseBus,
    arbitration: ArbitrationLoop,
    ranging: Ranging,
    vision: Vision,
    inputs: Inputs,
}

impl Rover {
    /// Validate `config` and build every component on `hardware`.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::InvalidConfiguration`] before anything touches
    /// the hardware if the configuration is inconsistent.
    pub fn new(config: &RoverConfig, hardware: Hardware) -> Result<Self, RoverError> {
        config.validate()?;

        let bus = PulseBus::new(hardware.pulse);
        let drive = DriveController::from_config(&config.drive, &bus);
        let aim = PanTiltController::new(&config.aim, &bus)?;

        let watchdog = Watchdog::new();
        watchdog.register(RANGING, config.arbitration.stale_after());
        watchdog.register(VISION, config.arbitration.stale_after());
        let inputs = Inputs {
            range: Latest::new(DistanceSample::unknown()),
            target: Latest::new(DetectionResult::NotFound),
            watchdog,
        };

        let arbitration = ArbitrationLoop::new(config, drive, aim, bus.clone(), inputs.clone());
        let ranging = Ranging {
            sensor: Box::new(RangeMonitor::new(hardware.echo, &config.range)),
            interval: config.range.sample_interval(),
        };
        let vision = Vision {
            camera: hardware.camera,
            tracker: TargetTracker::new(hardware.detector, &config.vision),
            interval: config.vision.frame_interval(),
        };

        Ok(Self {
            bus,
            arbitration,
            ranging,
            vision,
            inputs,
        })
    }

    /// Snapshot cells and watchdog shared with the loops.
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    /// Run all three loops until `run` clears or an actuator fails.
    ///
    /// # Errors
    ///
    /// Returns the fatal actuator error that ended the run. The pulse driver
    /// has been released by the time this returns either way.
    pub fn run(self, run: &RunFlag) -> Result<(), RoverError> {
        let Self {
            bus,
            arbitration,
            ranging,
            vision,
            inputs,
        } = self;

        info!("rover starting");
        let result = thread::scope(|s| {
            let range_out = inputs.range.clone();
            let range_wd = inputs.watchdog.clone();
            let ranging_thread = s.spawn(move || {
                let _guard = StopOnPanic::new(RANGING, run);
                ranging.run(&range_out, &range_wd, run);
            });

            let target_out = inputs.target.clone();
            let vision_wd = inputs.watchdog.clone();
            let vision_thread = s.spawn(move || {
                let _guard = StopOnPanic::new(VISION, run);
                vision.run(&target_out, &vision_wd, run);
            });

            let arbiter = s.spawn(move || arbitration.run(run));
            let outcome = arbiter.join().unwrap_or_else(|_| {
                Err(RoverError::ActuatorUnavailable {
                    component: "arbitration".to_string(),
                    details: "loop panicked".to_string(),
                })
            });
            // Producers must not outlive the consumer.
            run.request_stop("arbitration loop exited");
            for (producer, handle) in [(RANGING, ranging_thread), (VISION, vision_thread)] {
                if handle.join().is_err() {
                    error!(producer, "producer thread panicked");
                }
            }
            outcome
        });

        // Normally a no-op: the arbitration loop released on its way out.
        if let Err(e) = bus.release() {
            error!(error = %e, "final pulse release failed");
        }
        info!(ok = result.is_ok(), "rover stopped");
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Producer loops
// ─────────────────────────────────────────────────────────────────────────────

/// Clears the run flag if the owning producer thread unwinds, so the
/// arbitration loop never keeps acting on a dead producer's last value.
struct StopOnPanic<'a> {
    producer: &'static str,
    run: &'a RunFlag,
}

impl<'a> StopOnPanic<'a> {
    fn new(producer: &'static str, run: &'a RunFlag) -> Self {
        Self { producer, run }
    }
}

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.run
                .request_stop(&format!("{} thread panicked", self.producer));
        }
    }
}

struct Ranging {
    sensor: Box<dyn RangeSensor>,
    interval: Duration,
}

impl Ranging {
    fn run(mut self, out: &Latest<DistanceSample>, watchdog: &Watchdog, run: &RunFlag) {
        debug!("ranging loop started");
        while run.is_running() {
            let sample = self.sensor.measure();
            out.publish(sample);
            if sample.valid {
                watchdog.heartbeat(RANGING);
            }
            thread::sleep(self.interval);
        }
        debug!("ranging loop stopped");
    }
}

struct Vision {
    camera: Box<dyn Camera>,
    tracker: TargetTracker,
    interval: Duration,
}

impl Vision {
    fn run(mut self, out: &Latest<DetectionResult>, watchdog: &Watchdog, run: &RunFlag) {
        debug!(class = self.tracker.target_class(), "vision loop started");
        while run.is_running() {
            match self.camera.capture() {
                Ok(frame) => {
                    if let Some(result) = self.tracker.track(&frame) {
                        out.publish(result);
                        watchdog.heartbeat(VISION);
                    }
                }
                Err(e) => debug!(camera = self.camera.id(), error = %e, "frame capture failed"),
            }
            thread::sleep(self.interval);
        }
        debug!("vision loop stopped");
    }
}
