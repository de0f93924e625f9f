//! In-process stand-in for the servo bridge. Used by `--simulate` and by tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use super::transport::LineTransport;
use super::types::Axis;

#[derive(Debug, Clone, Copy)]
struct SimAxis {
    position: i32,
    target: i32,
    stalled: bool,
}

impl SimAxis {
    fn step(&mut self, rate: i32) {
        if self.stalled {
            return;
        }
        let delta = self.target - self.position;
        self.position += delta.clamp(-rate, rate);
    }
}

/// Simulated pan/tilt rig. Each position query advances moving axes by a
/// fixed step, so "move and confirm" loops behave like the hardware.
pub struct SimulatedRig {
    axes: [SimAxis; 2],
    rate: i32,
    replies: VecDeque<String>,
    garble: u32,
    sent: Arc<Mutex<Vec<String>>>,
}

impl SimulatedRig {
    pub fn new(azimuth: i32, elevation: i32) -> Self {
        let axis = |position| SimAxis {
            position,
            target: position,
            stalled: false,
        };
        Self {
            axes: [axis(azimuth), axis(elevation)],
            rate: 400,
            replies: VecDeque::new(),
            garble: 0,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Units travelled per query.
    #[cfg(test)]
    pub fn with_rate(mut self, rate: i32) -> Self {
        self.rate = rate.max(1);
        self
    }

    /// The axis accepts commands but never moves.
    #[cfg(test)]
    pub fn with_stalled(mut self, axis: Axis) -> Self {
        self.axes[axis.index()].stalled = true;
        self
    }

    /// The next `count` replies are corrupted.
    #[cfg(test)]
    pub fn with_garbled_replies(mut self, count: u32) -> Self {
        self.garble = count;
        self
    }

    /// Every line the controller sent, shared so it stays readable after the
    /// rig is moved into a controller.
    #[cfg(test)]
    pub fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    fn handle(&mut self, line: &str) -> io::Result<()> {
        let fields: Vec<&str> = line.split(',').collect();
        let axis = |index: usize| -> io::Result<Axis> {
            fields
                .get(index)
                .and_then(|raw| raw.trim_matches(['[', ']']).parse::<u8>().ok())
                .and_then(Axis::from_id)
                .ok_or_else(|| invalid(line))
        };
        let number = |index: usize| -> io::Result<i32> {
            fields
                .get(index)
                .and_then(|raw| raw.trim_matches(['[', ']']).parse::<i32>().ok())
                .ok_or_else(|| invalid(line))
        };

        match fields[0] {
            "MOVE" => {
                let target = number(2)?;
                self.axes[axis(1)?.index()].target = target;
            }
            "SYNC_MOVE" => {
                // SYNC_MOVE,[a1,a2],2,[p1,p2],[s1,s2],[c1,c2]
                let first = axis(1)?;
                let second = axis(2)?;
                self.axes[first.index()].target = number(4)?;
                self.axes[second.index()].target = number(5)?;
            }
            "CALIBRATE" => {
                let axis = &mut self.axes[axis(1)?.index()];
                axis.position = 2048;
                axis.target = 2048;
            }
            "GET_POS" => {
                let axis = axis(1)?;
                let rate = self.rate;
                let state = &mut self.axes[axis.index()];
                state.step(rate);
                let reply = format!("POSITION,{},{}", axis.id(), state.position);
                self.reply(reply);
            }
            "GET_TELEMETRY" => {
                let axis = axis(1)?;
                let state = self.axes[axis.index()];
                let moving = u8::from(state.position != state.target);
                let reply = format!(
                    "TELEMETRY,{},{},0,10,74,35,{},100",
                    axis.id(),
                    state.position,
                    moving
                );
                self.reply(reply);
            }
            _ => return Err(invalid(line)),
        }
        Ok(())
    }

    fn reply(&mut self, line: String) {
        if self.garble > 0 {
            self.garble -= 1;
            self.replies.push_back("#ERR".to_string());
        } else {
            self.replies.push_back(line);
        }
    }
}

impl LineTransport for SimulatedRig {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.sent.lock().unwrap().push(line.to_string());
        self.handle(line)
    }

    fn read_line(&mut self) -> io::Result<String> {
        self.replies
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::TimedOut))
    }
}

fn invalid(line: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("unsupported command: {}", line),
    )
}
