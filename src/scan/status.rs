use chrono::{DateTime, Utc};
use crossbeam::channel::Receiver;
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

use super::types::{ScanCommand, ScanEvent, ScanReport};
use crate::tracker::Track;

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanMode {
    Idle,
    Running {
        run_id: Uuid,
        command: ScanCommand,
        started: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ScanStatus {
    pub mode: ScanMode,
    pub last_report: Option<ScanReport>,
    pub tracks: Vec<Track>,
    pub last_error: Option<String>,
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self {
            mode: ScanMode::Idle,
            last_report: None,
            tracks: Vec::new(),
            last_error: None,
        }
    }
}

impl ScanStatus {
    pub fn apply(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Started { run_id, command } => {
                self.mode = ScanMode::Running {
                    run_id,
                    command,
                    started: Utc::now(),
                };
                self.last_error = None;
            }
            ScanEvent::Measurement(report) => {
                self.tracks = report.tracks.clone();
                self.last_report = Some(*report);
            }
            ScanEvent::Refined {
                track_id,
                position,
                peak_mhz,
                peak_power_db,
                improved: true,
                ..
            } => {
                if let Some(track) = self.tracks.iter_mut().find(|t| t.id == track_id) {
                    track.best_position = position;
                    track.peak_mhz = peak_mhz;
                    track.peak_power_db = peak_power_db;
                }
            }
            ScanEvent::Refined { .. } => {}
            ScanEvent::Finished { .. } => self.mode = ScanMode::Idle,
            ScanEvent::Failed { error, .. } => {
                self.mode = ScanMode::Idle;
                self.last_error = Some(error);
            }
            ScanEvent::TracksCleared => self.tracks.clear(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    status: ScanStatus,
}

/// Latest engine state as seen through the event stream.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    shared: Arc<StdMutex<Shared>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(StdMutex::new(Shared {
                status: ScanStatus::default(),
            })),
        }
    }

    pub fn status(&self) -> ScanStatus {
        self.shared.lock().unwrap().status.clone()
    }

    pub fn apply(&self, event: ScanEvent) {
        self.shared.lock().unwrap().status.apply(event);
    }

    /// Drains `events` into the board until the engine goes away.
    pub fn spawn_collector(&self, events: Receiver<ScanEvent>) -> std::io::Result<JoinHandle<()>> {
        let board = self.clone();
        thread::Builder::new()
            .name("scan-status".into())
            .spawn(move || {
                for event in events.iter() {
                    board.apply(event);
                }
            })
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
