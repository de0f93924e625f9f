//! Line protocol spoken by the servo bridge.
//!
//! Requests are single comma separated lines. Only the two queries produce a
//! reply:
//!
//! ```text
//! GET_POS,<axis>        -> POSITION,<axis>,<position>
//! GET_TELEMETRY,<axis>  -> TELEMETRY,<axis>,<position>,<speed>,<load>,<voltage>,<temperature>,<moving>,<current>
//! ```

use std::str::FromStr;

use super::error::ProtocolError;
use super::types::{Axis, MoveProfile, Telemetry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Move {
        axis: Axis,
        position: i32,
        profile: MoveProfile,
    },
    SyncMove {
        first: (Axis, i32),
        second: (Axis, i32),
        profile: MoveProfile,
    },
    Calibrate(Axis),
    GetPosition(Axis),
    GetTelemetry(Axis),
}

impl Request {
    pub fn encode(&self) -> String {
        match *self {
            Request::Move {
                axis,
                position,
                profile,
            } => format!(
                "MOVE,{},{},{},{}",
                axis.id(),
                position,
                profile.speed,
                profile.acceleration
            ),
            Request::SyncMove {
                first,
                second,
                profile,
            } => format!(
                "SYNC_MOVE,[{},{}],2,[{},{}],[{},{}],[{},{}]",
                first.0.id(),
                second.0.id(),
                first.1,
                second.1,
                profile.speed,
                profile.speed,
                profile.acceleration,
                profile.acceleration
            ),
            Request::Calibrate(axis) => format!("CALIBRATE,{}", axis.id()),
            Request::GetPosition(axis) => format!("GET_POS,{}", axis.id()),
            Request::GetTelemetry(axis) => format!("GET_TELEMETRY,{}", axis.id()),
        }
    }
}

pub fn decode_position(line: &str, axis: Axis) -> Result<i32, ProtocolError> {
    let fields = reply_fields(line, "POSITION", axis)?;
    field(&fields, 2, "position")
}

pub fn decode_telemetry(line: &str, axis: Axis) -> Result<Telemetry, ProtocolError> {
    let fields = reply_fields(line, "TELEMETRY", axis)?;
    Ok(Telemetry {
        axis,
        position: field(&fields, 2, "position")?,
        speed: field(&fields, 3, "speed")?,
        load: field(&fields, 4, "load")?,
        voltage: field(&fields, 5, "voltage")?,
        temperature: field(&fields, 6, "temperature")?,
        moving: flag(&fields, 7, "moving")?,
        current: field(&fields, 8, "current")?,
    })
}

/// Splits a reply and checks the reply type and the echoed axis id.
fn reply_fields<'a>(
    line: &'a str,
    kind: &'static str,
    axis: Axis,
) -> Result<Vec<&'a str>, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::NoReply);
    }
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields[0] != kind {
        return Err(ProtocolError::UnexpectedReply {
            expected: kind,
            got: fields[0].to_string(),
        });
    }
    let echoed = fields.get(1).ok_or(ProtocolError::MissingField("axis"))?;
    if echoed.parse::<u8>().ok() != Some(axis.id()) {
        return Err(ProtocolError::WrongAxis {
            expected: axis.id(),
            got: echoed.to_string(),
        });
    }
    Ok(fields)
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &'static str) -> Result<T, ProtocolError> {
    let raw = fields
        .get(index)
        .ok_or(ProtocolError::MissingField(name))?;
    raw.parse().map_err(|_| ProtocolError::InvalidField {
        field: name,
        value: raw.to_string(),
    })
}

fn flag(fields: &[&str], index: usize, name: &'static str) -> Result<bool, ProtocolError> {
    let raw = fields
        .get(index)
        .ok_or(ProtocolError::MissingField(name))?;
    match raw.to_ascii_lowercase().as_str() {
        "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        _ => Err(ProtocolError::InvalidField {
            field: name,
            value: raw.to_string(),
        }),
    }
}
