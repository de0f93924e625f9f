use thiserror::Error;

use super::types::Axis;

/// A reply line that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("no reply")]
    NoReply,
    #[error("expected {expected} reply, got {got:?}")]
    UnexpectedReply { expected: &'static str, got: String },
    #[error("reply for axis {got}, expected axis {expected}")]
    WrongAxis { expected: u8, got: String },
    #[error("reply is missing field {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("{axis} position {position} outside safety window {min}..={max}")]
    OutOfBounds {
        axis: Axis,
        position: i32,
        min: i32,
        max: i32,
    },
    #[error("{axis} did not reach {target} after {polls} polls (last seen at {last})")]
    MotionTimeout {
        axis: Axis,
        target: i32,
        last: i32,
        polls: u32,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] ProtocolError),
    #[error("cancelled by user")]
    UserCancelled,
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}
