//! Jog mode – drive the chassis by hand from a line prompt.
//!
//! Commands follow [`rover_types::operator`]: `f5` forward at 55 %, `a3`
//! turn left at 33 %, `s` stop, `q` quit. The arbitration loop does not run
//! in this mode, so no obstacle stop is applied.

use colored::Colorize;
use rover_hal::{DriveController, PulseBus, PulseOutput};
use rover_kernel::RunFlag;
use rover_types::config::DriveConfig;
use rover_types::{DriveCommand, RoverError};
use rover_types::operator::{self, OperatorCommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

/// What the prompt loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Applied(DriveCommand),
    Rejected(String),
    Quit,
}

/// Drive state behind the prompt, separated from the terminal for testing.
pub struct JogSession {
    drive: DriveController,
    bus: PulseBus,
}

impl JogSession {
    pub fn new(config: &DriveConfig, output: Box<dyn PulseOutput>) -> Self {
        let bus = PulseBus::new(output);
        let drive = DriveController::from_config(config, &bus);
        Self { drive, bus }
    }

    /// Handle one line of operator input.
    ///
    /// # Errors
    ///
    /// Propagates actuator failures. Bad input is reported in the reply.
    pub fn handle(&mut self, line: &str) -> Result<Reply, RoverError> {
        match operator::parse(line) {
            Ok(OperatorCommand::Quit) => Ok(Reply::Quit),
            Ok(OperatorCommand::Drive(command)) => {
                self.drive.apply(command)?;
                Ok(Reply::Applied(command))
            }
            Err(e) => Ok(Reply::Rejected(e.to_string())),
        }
    }

    /// Stop the motors and release the pulse driver.
    pub fn shutdown(&mut self) {
        if !self.bus.is_released()
            && let Err(e) = self.drive.stop()
        {
            warn!(error = %e, "could not stop drive");
        }
        if let Err(e) = self.bus.release() {
            warn!(error = %e, "pulse driver release failed");
        }
    }
}

/// Run the interactive prompt until `q`, Ctrl-D, Ctrl-C or `run` clears.
///
/// # Errors
///
/// Returns the actuator error that ended the session; the motors have been
/// stopped and the driver released either way.
pub fn run(
    config: &DriveConfig,
    output: Box<dyn PulseOutput>,
    run: &RunFlag,
) -> Result<(), RoverError> {
    let mut session = JogSession::new(config, output);
    let result = prompt_loop(&mut session, run);
    session.shutdown();
    run.request_stop("jog session ended");
    result
}

fn prompt_loop(session: &mut JogSession, run: &RunFlag) -> Result<(), RoverError> {
    let mut editor =
        DefaultEditor::new().map_err(|e| RoverError::Config(format!("terminal: {e}")))?;
    println!(
        "  Jog mode. {} forward, {} reverse, {} left, {} right + speed digit; {} stop, {} quit.\n",
        "f".bold(),
        "r".bold(),
        "a".bold(),
        "d".bold(),
        "s".bold(),
        "q".bold()
    );

    while run.is_running() {
        let line = match editor.readline("rover> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                warn!(error = %e, "prompt failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        match session.handle(&line)? {
            Reply::Applied(command) => {
                info!(%command, "jog");
                println!("  {}", command.to_string().green());
            }
            Reply::Rejected(why) => println!("  {} {why}", "?".yellow().bold()),
            Reply::Quit => break,
        }
    }
    Ok(())
}
