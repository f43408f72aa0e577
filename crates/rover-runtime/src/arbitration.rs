//! Arbitration – fuses the latest range and vision snapshots into one
//! actuator command per cycle.
//!
//! The decision itself lives in [`Arbiter::decide`], a plain function of the
//! two snapshots and the current aim bearing. Apart from the held distance
//! and the obstruction latch it keeps no memory between cycles, so every
//! branch can be exercised without threads or hardware.
//!
//! [`ArbitrationLoop`] is the only writer of the actuators. It reads the
//! [`Latest`] cells published by the producer loops, applies the
//! [`Decision`], and on exit (or on an actuator fault) stops the drive and
//! releases the shared [`PulseBus`].
//!
//! # States
//!
//! | State | Condition | Action |
//! |---|---|---|
//! | `Obstructed` | distance below stop threshold, or no valid sample yet | stop |
//! | `Seeking` | no target | hold (or stop) |
//! | `Centering` | target outside the jitter window on either axis | nudge aim; turn chassis if bearing is large, else stop |
//! | `Aligned` | target inside the window on both axes | forward at cruise speed; turn chassis if bearing is large |

use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use rover_hal::{Bearing, DriveController, PanTiltController, PulseBus};
use rover_kernel::{RunFlag, Watchdog};
use rover_perception::Latest;
use rover_types::config::{RoverConfig, SeekBehavior};
use rover_types::{
    AimAxisId, DetectionResult, DistanceSample, DriveCommand, FrameSize, Nudge, RoverError,
};
use tracing::{debug, error, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Decision types
// ─────────────────────────────────────────────────────────────────────────────

/// Arbitration state, re-derived every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationState {
    Obstructed,
    Seeking,
    Centering,
    Aligned,
}

/// One corrective step for an aim axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AimCorrection {
    pub step_degrees: i32,
    pub sense: Nudge,
}

/// Output of one arbitration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: ArbitrationState,
    /// `None` leaves the chassis doing whatever it was last told.
    pub drive: Option<DriveCommand>,
    pub pan: Option<AimCorrection>,
    pub tilt: Option<AimCorrection>,
}

impl Decision {
    fn drive_only(state: ArbitrationState, drive: Option<DriveCommand>) -> Self {
        Self {
            state,
            drive,
            pan: None,
            tilt: None,
        }
    }
}

/// Corrective step for a pixel offset: `min(|offset| / divisor, max_step)`,
/// but never less than 1° once outside the jitter window.
///
/// Returns `None` while the offset is inside the jitter window, i.e. unless
/// `|offset| > threshold`. `positive` is the nudge sense applied when the
/// offset is positive.
pub fn aim_correction(
    offset: i32,
    threshold: i32,
    divisor: i32,
    max_step: i32,
    positive: Nudge,
) -> Option<AimCorrection> {
    let magnitude = offset.saturating_abs();
    if magnitude <= threshold {
        return None;
    }
    // A zero step would leave the target off-centre with the chassis stopped.
    let step = (magnitude / divisor.max(1)).max(1).min(max_step.max(0));
    let sense = match (offset > 0, positive) {
        (true, sense) => sense,
        (false, Nudge::Increase) => Nudge::Decrease,
        (false, Nudge::Decrease) => Nudge::Increase,
    };
    Some(AimCorrection {
        step_degrees: step,
        sense,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Arbiter
// ─────────────────────────────────────────────────────────────────────────────

/// Pure decision logic.
///
/// # Example
///
/// ```
/// use rover_runtime::arbitration::{Arbiter, ArbitrationState};
/// use rover_hal::Bearing;
/// use rover_types::config::RoverConfig;
/// use rover_types::{DetectionResult, DistanceSample, DriveCommand, FrameSize};
///
/// let mut arbiter = Arbiter::new(&RoverConfig::default());
/// let target = DetectionResult::Found { center_x: 320, center_y: 180, confidence: 0.9 };
/// let d = arbiter.decide(DistanceSample::new(10.0), target, FrameSize::new(640, 360), Bearing::default());
/// assert_eq!(d.state, ArbitrationState::Obstructed);
/// assert_eq!(d.drive, Some(DriveCommand::Stop));
/// ```
#[derive(Debug, Clone)]
pub struct Arbiter {
    stop_threshold_cm: f32,
    clearance_hysteresis_cm: f32,
    pan_threshold_px: i32,
    tilt_threshold_px: i32,
    step_divisor: i32,
    max_step_degrees: i32,
    steer_threshold_degrees: i32,
    seek_behavior: SeekBehavior,
    cruise_speed: u8,
    turn_speed: u8,
    held_distance_cm: Option<f32>,
    obstructed: bool,
}

impl Arbiter {
    pub fn new(config: &RoverConfig) -> Self {
        let arb = &config.arbitration;
        Self {
            stop_threshold_cm: config.range.stop_threshold_cm,
            clearance_hysteresis_cm: config.range.clearance_hysteresis_cm,
            pan_threshold_px: arb.pan_threshold_px,
            tilt_threshold_px: arb.tilt_threshold_px,
            step_divisor: arb.step_divisor,
            max_step_degrees: arb.max_step_degrees,
            steer_threshold_degrees: arb.steer_threshold_degrees,
            seek_behavior: arb.seek_behavior,
            cruise_speed: config.drive.cruise_speed,
            turn_speed: config.drive.turn_speed,
            held_distance_cm: None,
            // Nothing is known about the path until the first valid sample.
            obstructed: true,
        }
    }

    /// Distance the arbiter is currently acting on, if any sample was valid.
    pub fn held_distance_cm(&self) -> Option<f32> {
        self.held_distance_cm
    }

    /// Fold a range sample into the held distance and update the
    /// obstruction latch. Invalid samples leave both untouched.
    fn assess_range(&mut self, sample: DistanceSample) -> bool {
        if let Some(cm) = sample.reading() {
            self.held_distance_cm = Some(cm);
        }
        self.obstructed = match self.held_distance_cm {
            None => true,
            Some(cm) if self.obstructed => {
                cm < self.stop_threshold_cm + self.clearance_hysteresis_cm
            }
            Some(cm) => cm < self.stop_threshold_cm,
        };
        self.obstructed
    }

    /// Chassis turn toward the target when the pan bearing is beyond the
    /// steer threshold. Negative bearing means the target is to the right.
    fn steer(&self, bearing: Bearing) -> Option<DriveCommand> {
        if bearing.pan.abs() <= self.steer_threshold_degrees {
            None
        } else if bearing.pan < 0 {
            Some(DriveCommand::TurnRight(self.turn_speed))
        } else {
            Some(DriveCommand::TurnLeft(self.turn_speed))
        }
    }

    /// Decide this cycle's action from the latest snapshots.
    pub fn decide(
        &mut self,
        range: DistanceSample,
        target: DetectionResult,
        frame: FrameSize,
        bearing: Bearing,
    ) -> Decision {
        if self.assess_range(range) {
            return Decision::drive_only(ArbitrationState::Obstructed, Some(DriveCommand::Stop));
        }

        let Some(offset) = target.offset_from(frame) else {
            let drive = match self.seek_behavior {
                SeekBehavior::Hold => None,
                SeekBehavior::Stop => Some(DriveCommand::Stop),
            };
            return Decision::drive_only(ArbitrationState::Seeking, drive);
        };

        // Target right of centre lowers the pan angle; target below centre
        // raises the tilt angle.
        let pan = aim_correction(
            offset.dx,
            self.pan_threshold_px,
            self.step_divisor,
            self.max_step_degrees,
            Nudge::Decrease,
        );
        let tilt = aim_correction(
            offset.dy,
            self.tilt_threshold_px,
            self.step_divisor,
            self.max_step_degrees,
            Nudge::Increase,
        );

        let steer = self.steer(bearing);
        let (state, drive) = if pan.is_some() || tilt.is_some() {
            (ArbitrationState::Centering, steer.unwrap_or(DriveCommand::Stop))
        } else {
            (
                ArbitrationState::Aligned,
                steer.unwrap_or(DriveCommand::Forward(self.cruise_speed)),
            )
        };

        Decision {
            state,
            drive: Some(drive),
            pan,
            tilt,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ArbitrationLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the arbitration loop reads from the producer loops.
#[derive(Clone)]
pub struct Inputs {
    pub range: Latest<DistanceSample>,
    pub target: Latest<DetectionResult>,
    pub watchdog: Watchdog,
}

/// The fixed-cadence decision loop and sole owner of the actuators.
pub struct ArbitrationLoop {
    arbiter: Arbiter,
    drive: DriveController,
    aim: PanTiltController,
    bus: PulseBus,
    inputs: Inputs,
    frame: FrameSize,
    cycle: Duration,
    last_state: Option<ArbitrationState>,
    last_drive: Option<DriveCommand>,
    stale: BTreeSet<String>,
}

impl ArbitrationLoop {
    pub fn new(
        config: &RoverConfig,
        drive: DriveController,
        aim: PanTiltController,
        bus: PulseBus,
        inputs: Inputs,
    ) -> Self {
        Self {
            arbiter: Arbiter::new(config),
            drive,
            aim,
            bus,
            inputs,
            frame: config.vision.frame_size(),
            cycle: config.arbitration.cycle(),
            last_state: None,
            last_drive: None,
            stale: BTreeSet::new(),
        }
    }

    /// Park the aim mechanism at centre. Must precede the first
    /// [`step`][Self::step].
    pub fn center(&mut self) -> Result<(), RoverError> {
        self.aim.center()
    }

    pub fn current_bearing(&self) -> Bearing {
        self.aim.current_bearing()
    }

    pub fn last_drive(&self) -> Option<DriveCommand> {
        self.last_drive
    }

    /// Run one cycle: read snapshots, decide, apply.
    ///
    /// # Errors
    ///
    /// Propagates actuator failures; they are fatal for the loop.
    pub fn step(&mut self) -> Result<Decision, RoverError> {
        self.report_stale_producers();

        let range = self.inputs.range.read();
        let target = self.inputs.target.read();
        let decision = self
            .arbiter
            .decide(range, target, self.frame, self.aim.current_bearing());

        self.log_transition(decision.state);

        if let Some(pan) = decision.pan {
            self.aim.nudge(AimAxisId::Pan, pan.step_degrees, pan.sense)?;
        }
        if let Some(tilt) = decision.tilt {
            self.aim.nudge(AimAxisId::Tilt, tilt.step_degrees, tilt.sense)?;
        }
        if let Some(command) = decision.drive
            && self.last_drive != Some(command)
        {
            self.drive.apply(command)?;
            debug!(%command, "drive command issued");
            self.last_drive = Some(command);
        }

        Ok(decision)
    }

    /// Loop until `run` clears or an actuator fails, then neutralize.
    ///
    /// # Errors
    ///
    /// Returns the actuator error that ended the loop, after requesting a
    /// system-wide stop.
    pub fn run(mut self, run: &RunFlag) -> Result<(), RoverError> {
        let result = self.drive_loop(run);
        if let Err(ref e) = result {
            error!(error = %e, "actuator fault; shutting down");
            run.request_stop("actuator fault");
        }
        self.neutralize();
        result
    }

    fn drive_loop(&mut self, run: &RunFlag) -> Result<(), RoverError> {
        self.center()?;
        info!(cycle_ms = self.cycle.as_millis() as u64, "arbitration loop started");
        while run.is_running() {
            self.step()?;
            thread::sleep(self.cycle);
        }
        Ok(())
    }

    /// Stop the chassis and release the pulse driver. Safe to call more
    /// than once.
    pub fn neutralize(&mut self) {
        if !self.bus.is_released()
            && let Err(e) = self.drive.stop()
        {
            warn!(error = %e, "could not stop drive during teardown");
        }
        if let Err(e) = self.bus.release() {
            warn!(error = %e, "pulse driver release failed");
        }
    }

    fn log_transition(&mut self, state: ArbitrationState) {
        let previous = self.last_state.replace(state);
        if previous == Some(state) {
            return;
        }
        let entering = state == ArbitrationState::Obstructed;
        let leaving = previous == Some(ArbitrationState::Obstructed);
        match self.arbiter.held_distance_cm() {
            Some(cm) if entering => info!(distance_cm = cm, "obstacle ahead, stopping"),
            None if entering => info!("no valid range yet, holding still"),
            _ if leaving => info!(
                distance_cm = self.arbiter.held_distance_cm(),
                "path clear"
            ),
            _ => debug!(?previous, ?state, "arbitration state changed"),
        }
    }

    fn report_stale_producers(&mut self) {
        let stale: BTreeSet<String> = self.inputs.watchdog.check_all().into_iter().collect();
        for component in stale.difference(&self.stale) {
            warn!(component = %component, "producer stale; acting on last published value");
        }
        for component in self.stale.difference(&stale) {
            info!(component = %component, "producer recovered");
        }
        self.stale = stale;
    }
}
