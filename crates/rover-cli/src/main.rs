//! `rover-cli` – Rover command line interface
//!
//! This binary is the ignition switch for the vehicle. It:
//!
//! 1. Loads `~/.rover/config.toml` (writing the defaults there on first
//!    run) and applies `ROVER_*` environment overrides.
//! 2. Validates the configuration before any hardware is touched.
//! 3. Intercepts **Ctrl-C** to clear the shared run flag; every loop stops
//!    within one polling interval and the outputs are neutralised.
//! 4. Runs either the autonomous follow loop or the operator jog prompt.
//!
//! Drivers are the simulated ones from `rover-hal`: a virtual pulse
//! generator, an echo sensor reporting a fixed distance and a scripted
//! detector whose target drifts across the frame.

mod config;
mod jog;

use std::process::ExitCode;

use colored::Colorize;
use rover_hal::sim::{ScriptStep, ScriptedDetector, SimCamera, SimEchoPins, SimPulseOutput};
use rover_kernel::RunFlag;
use rover_runtime::{Hardware, Rover};
use rover_types::config::{Mode, RoverConfig};
use rover_types::{BoundingBox, Detection, RoverError};
use tracing::{error, info, warn};

/// Distance reported by the simulated range finder.
const SIM_CLEARANCE_CM: f32 = 120.0;

fn main() -> ExitCode {
    let _telemetry = rover_runtime::init_tracing("rover");

    print_banner();

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {e}", "Config error".red());
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = cfg.validate() {
        println!("{}: {e}", "Invalid configuration".red().bold());
        return ExitCode::FAILURE;
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let run = RunFlag::new();
    let run_ctrlc = run.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if run_ctrlc.request_stop("operator interrupt") {
            println!();
            println!("{}", "⚠  Ctrl-C received – stopping motors …".yellow().bold());
        }
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop with 'q' in jog mode only");
    }

    info!(mode = %cfg.mode, "starting");
    let outcome = match cfg.mode {
        Mode::Autonomous => run_autonomous(&cfg, &run),
        Mode::Jog => jog::run(&cfg.drive, Box::new(SimPulseOutput::new("sim_pwm")), &run),
    };

    match outcome {
        Ok(()) => {
            println!("{}", "  ✓ Outputs released. Goodbye.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "rover stopped on error");
            println!("{}: {e}", "Stopped on error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<RoverConfig, RoverError> {
    let path = config::config_path();
    let shown = path.display().to_string();
    let (cfg, source) = config::load_or_init(&path)?;
    match source {
        config::Source::Loaded => println!("  Config loaded from {}", shown.bold()),
        config::Source::Created => println!("  Wrote default config to {}", shown.bold()),
        config::Source::Defaults => {
            println!("  No config at {}; using defaults.", shown.dimmed());
        }
    }
    Ok(cfg)
}

fn run_autonomous(cfg: &RoverConfig, run: &RunFlag) -> Result<(), RoverError> {
    println!(
        "  Following {} (confidence > {}). Press {} to stop.\n",
        cfg.vision.target_class.bold(),
        cfg.vision.confidence_threshold,
        "Ctrl-C".bold()
    );
    let hardware = Hardware {
        pulse: Box::new(SimPulseOutput::new("sim_pwm")),
        echo: Box::new(SimEchoPins::at_distance("sim_echo", SIM_CLEARANCE_CM)),
        camera: Box::new(SimCamera::new("sim_camera", cfg.vision.frame_size())),
        detector: Box::new(ScriptedDetector::new("sim_detector", drifting_target(cfg))),
    };
    Rover::new(cfg, hardware)?.run(run)
}

/// A target sweeping right to left across the frame, lost for a few frames
/// at each end.
fn drifting_target(cfg: &RoverConfig) -> Vec<ScriptStep> {
    let frame = cfg.vision.frame_size();
    let (width, height) = (frame.width as i32, frame.height as i32);
    let half = (width / 16).max(1);
    let mut script: Vec<ScriptStep> = (0..=16)
        .rev()
        .map(|i| {
            let cx = i * width / 16;
            Ok(vec![Detection {
                label: cfg.vision.target_class.clone(),
                confidence: 0.9,
                bbox: BoundingBox::new(cx - half, height / 3, cx + half, 2 * height / 3),
            }])
        })
        .collect();
    script.extend((0..4).map(|_| Ok(Vec::new())));
    script
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"    ____                      "#.bold().cyan());
    println!("{}", r#"   / __ \____ _   _____  _____"#.bold().cyan());
    println!("{}", r#"  / /_/ / __ \ | / / _ \/ ___/"#.bold().cyan());
    println!("{}", r#" / _, _/ /_/ / |/ /  __/ /    "#.bold().cyan());
    println!("{}", r#"/_/ |_|\____/|___/\___/_/     "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Rover".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Obstacle-aware target follower");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drifting_target_stays_inside_the_frame() {
        let cfg = RoverConfig::default();
        let script = drifting_target(&cfg);
        let centres: Vec<i32> = script
            .iter()
            .filter_map(|step| step.as_ref().ok())
            .filter_map(|dets| dets.first())
            .map(|d| d.bbox.center().0)
            .collect();
        assert_eq!(centres.first(), Some(&640));
        assert_eq!(centres.last(), Some(&0));
        assert!(script.iter().any(|s| matches!(s, Ok(d) if d.is_empty())));
    }
}
