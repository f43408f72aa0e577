//! Operator jog commands.
//!
//! A command is a direction letter followed by a single speed digit, e.g.
//! `f5` or `r3`. The digit maps to `digit * 11` percent, so `9` is 99 %.
//!
//! | Input | Meaning |
//! |---|---|
//! | `f<d>` | forward |
//! | `r<d>` | reverse |
//! | `a<d>` | turn left |
//! | `d<d>` | turn right |
//! | `s` | stop |
//! | `q` | quit |
//!
//! ```rust
//! use rover_types::DriveCommand;
//! use rover_types::operator::{parse, OperatorCommand};
//!
//! assert_eq!(parse("f5").unwrap(), OperatorCommand::Drive(DriveCommand::Forward(55)));
//! assert_eq!(parse("s").unwrap(), OperatorCommand::Drive(DriveCommand::Stop));
//! ```

use thiserror::Error;

use crate::DriveCommand;

/// Percent of duty per speed digit.
pub const SPEED_PER_DIGIT: u8 = 11;

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Drive(DriveCommand),
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorParseError {
    #[error("empty command")]
    Empty,
    #[error("invalid direction '{0}'; use f, r, a or d")]
    UnknownDirection(char),
    #[error("missing speed digit; use a format like f5 or r3")]
    MissingSpeed,
    #[error("invalid speed '{0}'; use a number between 0 and 9")]
    InvalidSpeed(String),
}

/// Parse one line of operator input.
///
/// # Errors
///
/// Returns an [`OperatorParseError`] describing why the input was rejected.
pub fn parse(input: &str) -> Result<OperatorCommand, OperatorParseError> {
    let input = input.trim();
    let mut chars = input.chars();
    let direction = chars.next().ok_or(OperatorParseError::Empty)?;
    let rest = chars.as_str();

    match (direction, rest) {
        ('q', "") => return Ok(OperatorCommand::Quit),
        ('s', "") => return Ok(OperatorCommand::Drive(DriveCommand::Stop)),
        _ => {}
    }

    let make: fn(u8) -> DriveCommand = match direction {
        'f' => DriveCommand::Forward,
        'r' => DriveCommand::Backward,
        'a' => DriveCommand::TurnLeft,
        'd' => DriveCommand::TurnRight,
        other => return Err(OperatorParseError::UnknownDirection(other)),
    };

    if rest.is_empty() {
        return Err(OperatorParseError::MissingSpeed);
    }
    let digit = match rest.as_bytes() {
        [b] if b.is_ascii_digit() => b - b'0',
        _ => return Err(OperatorParseError::InvalidSpeed(rest.to_string())),
    };
    Ok(OperatorCommand::Drive(make(digit * SPEED_PER_DIGIT)))
}
