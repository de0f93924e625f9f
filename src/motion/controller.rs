use std::io;
use std::thread;

use log::{debug, warn};

use super::error::{MotionError, ProtocolError};
use super::protocol::{decode_position, decode_telemetry, Request};
use super::transport::LineTransport;
use super::types::{Axis, AxisLimits, MoveProfile, Telemetry};
use crate::cancel::CancelFlag;
use crate::config::MotionConfig;

/// Drives the two gimbal servos over the line protocol.
///
/// Every move checks the cooperative stop flag before anything is sent, and
/// elevation targets outside the safety window are refused without touching
/// the device.
pub struct MotionController<T> {
    transport: T,
    config: MotionConfig,
    cancel: CancelFlag,
    last_position: [Option<i32>; 2],
}

impl<T: LineTransport> MotionController<T> {
    pub fn new(transport: T, config: MotionConfig, cancel: CancelFlag) -> Self {
        Self {
            transport,
            config,
            cancel,
            last_position: [None, None],
        }
    }

    pub fn limits(&self) -> &AxisLimits {
        &self.config.limits
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn profile(&self) -> MoveProfile {
        MoveProfile {
            speed: self.config.speed,
            acceleration: self.config.acceleration,
        }
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Position seen by the most recent successful query of `axis`.
    pub fn last_position(&self, axis: Axis) -> Option<i32> {
        self.last_position[axis.index()]
    }

    /// Issues a move and polls until the axis is within tolerance of `target`.
    /// Returns the confirmed position.
    pub fn move_axis_and_confirm(
        &mut self,
        axis: Axis,
        target: i32,
        profile: MoveProfile,
    ) -> Result<i32, MotionError> {
        self.move_axis(axis, target, profile)?;

        let mut last = self.last_position(axis).unwrap_or(target);
        for _ in 0..self.config.max_polls {
            last = self.position(axis)?;
            if in_range(last, target, self.config.tolerance) {
                return Ok(last);
            }
            thread::sleep(self.config.poll_interval);
        }

        Err(MotionError::MotionTimeout {
            axis,
            target,
            last,
            polls: self.config.max_polls,
        })
    }

    /// Synchronised move of both axes, confirmed with the tighter dual tolerance.
    pub fn move_both_and_confirm(
        &mut self,
        first: (Axis, i32),
        second: (Axis, i32),
        profile: MoveProfile,
    ) -> Result<(i32, i32), MotionError> {
        self.check_cancelled()?;
        self.check_bounds(first.0, first.1)?;
        self.check_bounds(second.0, second.1)?;

        self.send(&Request::SyncMove {
            first,
            second,
            profile,
        })?;

        let tolerance = self.config.dual_tolerance;
        let mut last = (first.1, second.1);
        for _ in 0..self.config.max_polls {
            last = (self.position(first.0)?, self.position(second.0)?);
            if in_range(last.0, first.1, tolerance) && in_range(last.1, second.1, tolerance) {
                return Ok(last);
            }
            thread::sleep(self.config.poll_interval);
        }

        let (axis, target, seen) = if in_range(last.0, first.1, tolerance) {
            (second.0, second.1, last.1)
        } else {
            (first.0, first.1, last.0)
        };
        Err(MotionError::MotionTimeout {
            axis,
            target,
            last: seen,
            polls: self.config.max_polls,
        })
    }

    /// Sends a move without waiting for arrival.
    pub fn move_axis(
        &mut self,
        axis: Axis,
        position: i32,
        profile: MoveProfile,
    ) -> Result<(), MotionError> {
        self.check_cancelled()?;
        self.check_bounds(axis, position)?;
        self.send(&Request::Move {
            axis,
            position,
            profile,
        })
    }

    pub fn calibrate(&mut self, axis: Axis) -> Result<(), MotionError> {
        self.send(&Request::Calibrate(axis))
    }

    /// Queries the axis position, re-issuing the query on malformed replies.
    pub fn position(&mut self, axis: Axis) -> Result<i32, MotionError> {
        let position = self.query(Request::GetPosition(axis), |line| {
            decode_position(line, axis)
        })?;
        self.last_position[axis.index()] = Some(position);
        Ok(position)
    }

    /// One telemetry request. `None` means the reply was unusable and the
    /// caller should ask again.
    pub fn read_telemetry(&mut self, axis: Axis) -> Result<Option<Telemetry>, MotionError> {
        self.send(&Request::GetTelemetry(axis))?;
        let line = match self.transport.read_line() {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match decode_telemetry(&line, axis) {
            Ok(telemetry) => {
                self.last_position[axis.index()] = Some(telemetry.position);
                Ok(Some(telemetry))
            }
            Err(e) => {
                debug!("Discarding telemetry reply {:?}: {}", line, e);
                Ok(None)
            }
        }
    }

    /// Telemetry with the configured number of attempts.
    pub fn telemetry(&mut self, axis: Axis) -> Result<Option<Telemetry>, MotionError> {
        for _ in 0..self.config.query_retries.max(1) {
            if let Some(telemetry) = self.read_telemetry(axis)? {
                return Ok(Some(telemetry));
            }
        }
        warn!("No usable telemetry from {} servo", axis);
        Ok(None)
    }

    /// Blocks until both servos answer position queries.
    pub fn wait_ready(&mut self) -> Result<(), MotionError> {
        let mut last_error = None;
        for attempt in 1..=self.config.ready_attempts.max(1) {
            match (self.position(Axis::Azimuth), self.position(Axis::Elevation)) {
                (Ok(azimuth), Ok(elevation)) => {
                    log::info!("Servos ready at azimuth {}, elevation {}", azimuth, elevation);
                    return Ok(());
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Servos not ready (attempt {}): {}", attempt, e);
                    last_error = Some(e);
                }
            }
            thread::sleep(self.config.ready_interval);
        }
        Err(last_error.unwrap_or(MotionError::MalformedResponse(ProtocolError::NoReply)))
    }

    fn check_cancelled(&self) -> Result<(), MotionError> {
        if self.cancel.take() {
            return Err(MotionError::UserCancelled);
        }
        Ok(())
    }

    fn check_bounds(&self, axis: Axis, position: i32) -> Result<(), MotionError> {
        let window = self.config.limits.elevation_safety;
        if axis == Axis::Elevation && !window.contains(position) {
            return Err(MotionError::OutOfBounds {
                axis,
                position,
                min: window.min,
                max: window.max,
            });
        }
        Ok(())
    }

    fn send(&mut self, request: &Request) -> Result<(), MotionError> {
        self.transport.send_line(&request.encode())?;
        Ok(())
    }

    fn query<R>(
        &mut self,
        request: Request,
        decode: impl Fn(&str) -> Result<R, ProtocolError>,
    ) -> Result<R, MotionError> {
        let mut last_error = ProtocolError::NoReply;
        for attempt in 1..=self.config.query_retries.max(1) {
            self.send(&request)?;
            let result = match self.transport.read_line() {
                Ok(line) => decode(&line),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => Err(ProtocolError::NoReply),
                Err(e) => return Err(e.into()),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "Malformed reply to {} (attempt {}): {}",
                        request.encode(),
                        attempt,
                        e
                    );
                    last_error = e;
                }
            }
        }
        Err(MotionError::MalformedResponse(last_error))
    }
}

fn in_range(actual: i32, expected: i32, tolerance: i32) -> bool {
    (actual - expected).abs() <= tolerance
}
