use chrono::Utc;
use crossbeam::channel::Receiver;
use uuid::Uuid;

use super::error::ScanError;
use super::events::EventSender;
use super::refine::{PositionRefiner, SearchStart};
use super::types::{LabelledDetection, RunOutcome, ScanCommand, ScanEvent, ScanReport};
use crate::channel::ChannelClassifier;
use crate::config::SweepConfig;
use crate::motion::{Axis, LineTransport, MotionController, MotionError, Telemetry, Waypoint};
use crate::planner::{full_area_passes, horizontal_waypoints, section_waypoints, SweepCursor};
use crate::spectrum::{Detection, Segmenter, SpectrumSensor};
use crate::tracker::{Refinement, SignalTracker, Track, TrackId};

/// Composes motion, sensing, segmentation and tracking into sweep procedures.
///
/// Single threaded and blocking. Owns the track set; consumers only ever see
/// snapshots pushed through the event stream.
pub struct Orchestrator<T, S> {
    motion: MotionController<T>,
    sensor: S,
    segmenter: Segmenter,
    tracker: SignalTracker,
    classifier: ChannelClassifier,
    sweep: SweepConfig,
    events: EventSender,
    inbox: Option<Receiver<ScanCommand>>,
    pending: Option<ScanCommand>,
    run_id: Uuid,
    sequence: u64,
}

impl<T: LineTransport, S: SpectrumSensor> Orchestrator<T, S> {
    pub fn new(
        motion: MotionController<T>,
        sensor: S,
        segmenter: Segmenter,
        tracker: SignalTracker,
        sweep: SweepConfig,
        events: EventSender,
    ) -> Self {
        Self {
            motion,
            sensor,
            segmenter,
            tracker,
            classifier: ChannelClassifier::default(),
            sweep,
            events,
            inbox: None,
            pending: None,
            run_id: Uuid::nil(),
            sequence: 0,
        }
    }

    pub fn motion(&self) -> &MotionController<T> {
        &self.motion
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.tracker.snapshot()
    }

    /// Blocks until both servos answer position queries.
    pub fn wait_ready(&mut self) -> Result<(), ScanError> {
        Ok(self.motion.wait_ready()?)
    }

    /// Worker loop: waits for ready servos, then executes commands until every
    /// command sender is gone.
    pub fn run(mut self, commands: Receiver<ScanCommand>) {
        if let Err(e) = self.wait_ready() {
            log::error!("Servos did not become ready: {}", e);
        }
        self.inbox = Some(commands.clone());

        loop {
            let command = match self.pending.take() {
                Some(command) => command,
                None => match commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };
            // Failures are reported on the event stream.
            let _ = self.execute(command);
        }
        log::info!("Scan engine stopped");
    }

    /// Runs one command to completion. Cancellation is not an error.
    pub fn execute(&mut self, command: ScanCommand) -> Result<RunOutcome, ScanError> {
        if command == ScanCommand::Stop {
            // Nothing is running, so a raised flag would only cancel the next run.
            self.motion.cancel_flag().clear();
            return Ok(RunOutcome::Cancelled);
        }
        if !command.is_run() {
            self.adjust(&command);
            return Ok(RunOutcome::Completed);
        }

        self.run_id = Uuid::new_v4();
        self.sequence = 0;
        log::info!("Starting {} (run {})", command, self.run_id);
        self.events.send(ScanEvent::Started {
            run_id: self.run_id,
            command: command.clone(),
        });

        match self.run_command(&command) {
            Ok(()) => {
                log::info!("Finished {} after {} measurements", command, self.sequence);
                self.finish(RunOutcome::Completed);
                Ok(RunOutcome::Completed)
            }
            Err(e) if e.is_cancelled() => {
                log::info!("Cancelled {} after {} measurements", command, self.sequence);
                self.finish(RunOutcome::Cancelled);
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => {
                log::error!("{} failed: {}", command, e);
                self.events.send(ScanEvent::Failed {
                    run_id: self.run_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn finish(&self, outcome: RunOutcome) {
        self.events.send(ScanEvent::Finished {
            run_id: self.run_id,
            outcome,
        });
    }

    fn run_command(&mut self, command: &ScanCommand) -> Result<(), ScanError> {
        match *command {
            ScanCommand::FullSweep => self.full_sweep(),
            ScanCommand::HorizontalSweep {
                points,
                elevation,
                passes,
            } => {
                let stops = horizontal_waypoints(points, self.sweep.circumference, self.sweep.start_angle)
                    .into_iter()
                    .map(|(_, azimuth)| azimuth)
                    .collect();
                self.continuous_sweep(stops, elevation, passes)
            }
            ScanCommand::SectionSweep {
                start,
                end,
                points,
                elevation,
                passes,
            } => {
                if start >= end {
                    return Err(ScanError::InvalidCommand(format!(
                        "section start {} is not below end {}",
                        start, end
                    )));
                }
                self.continuous_sweep(section_waypoints(start, end, points), elevation, passes)
            }
            ScanCommand::SingleScan => {
                let here = Waypoint::new(
                    self.motion.position(Axis::Azimuth)?,
                    self.motion.position(Axis::Elevation)?,
                );
                self.measure_at(here, true).map(|_| ())
            }
            ScanCommand::RefineTrack { track_id, radius } => {
                self.refine_track(track_id, radius.unwrap_or(self.sweep.refine_radius))
            }
            ScanCommand::Forward => self.forward(),
            ScanCommand::Calibrate => self.calibrate(),
            ScanCommand::ClearTracks | ScanCommand::SetThreshold { .. } => {
                self.adjust(command);
                Ok(())
            }
            ScanCommand::Stop => Ok(()),
        }
    }

    /// Applies a command that changes engine state without moving.
    fn adjust(&mut self, command: &ScanCommand) {
        match *command {
            ScanCommand::ClearTracks => self.clear_tracks(),
            ScanCommand::SetThreshold { threshold_db } => {
                match threshold_db {
                    Some(db) => log::info!("Detection threshold pinned at {:.1} dB", db),
                    None => log::info!("Detection threshold back to adaptive"),
                }
                self.segmenter.set_manual_threshold(threshold_db);
            }
            _ => {}
        }
    }

    /// Walks every elevation band from the horizon up, alternating direction.
    fn full_sweep(&mut self) -> Result<(), ScanError> {
        let passes = full_area_passes(
            self.motion.limits(),
            &self.sweep.point_counts,
            self.sweep.circumference,
            self.sweep.start_angle,
        );
        let profile = self.motion.profile();
        for pass in passes {
            self.poll_inbox();
            self.motion
                .move_axis_and_confirm(Axis::Elevation, pass.elevation, profile)?;
            for azimuth in pass.azimuths {
                self.poll_inbox();
                self.motion.move_axis_and_confirm(Axis::Azimuth, azimuth, profile)?;
                self.measure_at(Waypoint::new(azimuth, pass.elevation), true)?;
            }
            self.tracker.advance_sweep();
        }
        Ok(())
    }

    /// Back and forth over a fixed set of azimuth stops at one elevation.
    fn continuous_sweep(
        &mut self,
        stops: Vec<i32>,
        elevation: i32,
        passes: Option<u32>,
    ) -> Result<(), ScanError> {
        let limits = *self.motion.limits();
        let stops: Vec<i32> = stops.into_iter().map(|a| limits.azimuth.clamp(a)).collect();
        let profile = self.motion.profile();
        self.motion
            .move_axis_and_confirm(Axis::Elevation, elevation, profile)?;

        for step in SweepCursor::new(stops, passes) {
            if step.starts_pass && step.pass > 0 {
                self.tracker.advance_sweep();
            }
            self.poll_inbox();
            self.hold_elevation(elevation)?;
            self.motion
                .move_axis_and_confirm(Axis::Azimuth, step.position, profile)?;
            self.measure_at(Waypoint::new(step.position, elevation), true)?;
        }
        self.tracker.advance_sweep();
        Ok(())
    }

    /// Re-issues the elevation if it drifted away from the sweep level.
    fn hold_elevation(&mut self, elevation: i32) -> Result<(), ScanError> {
        let tolerance = self.motion.config().hold_tolerance;
        match self.motion.last_position(Axis::Elevation) {
            Some(current) if (current - elevation).abs() <= tolerance => Ok(()),
            current => {
                log::warn!(
                    "Elevation drifted to {:?}, moving back to {}",
                    current,
                    elevation
                );
                let profile = self.motion.profile();
                self.motion
                    .move_axis_and_confirm(Axis::Elevation, elevation, profile)?;
                Ok(())
            }
        }
    }

    fn refine_track(&mut self, track_id: TrackId, radius: i32) -> Result<(), ScanError> {
        let track = self
            .tracker
            .get(track_id)
            .ok_or(ScanError::UnknownTrack(track_id))?;
        let start = SearchStart {
            position: track.best_position,
            peak_mhz: track.peak_mhz,
            peak_power_db: track.peak_power_db,
            start_mhz: track.start_mhz,
            end_mhz: track.end_mhz,
        };

        let refiner = PositionRefiner::new(*self.motion.limits(), self.sweep.refine_min_radius);
        let result = refiner.refine(start, radius, |point| self.listen_at(point))?;

        let improved = self.tracker.apply_refinement(
            track_id,
            Refinement {
                position: result.position,
                peak_mhz: result.peak_mhz,
                peak_power_db: result.peak_power_db,
            },
        );
        if improved {
            let label = self.classifier.classify_frequency(result.peak_mhz);
            self.tracker.set_channel(track_id, label);
        }
        log::info!(
            "Track {} refined to ({}, {}) at {:.1} dB after {} measurements",
            track_id,
            result.position.azimuth,
            result.position.elevation,
            result.peak_power_db,
            result.measurements
        );
        self.events.send(ScanEvent::Refined {
            run_id: self.run_id,
            track_id,
            position: result.position,
            peak_mhz: result.peak_mhz,
            peak_power_db: result.peak_power_db,
            improved,
        });
        Ok(())
    }

    /// Measurement for the refiner. Does not feed the tracker, so the result
    /// can be compared against the track's own best reading.
    fn listen_at(&mut self, point: Waypoint) -> Result<Vec<Detection>, ScanError> {
        self.poll_inbox();
        let profile = self.motion.profile();
        self.motion.move_both_and_confirm(
            (Axis::Elevation, point.elevation),
            (Axis::Azimuth, point.azimuth),
            profile,
        )?;
        let report = self.measure_at(point, false)?;
        Ok(report.detections.into_iter().map(|d| d.detection).collect())
    }

    /// Elevation first so the dish never sweeps through the mount at a low tilt.
    fn forward(&mut self) -> Result<(), ScanError> {
        let forward = self.motion.config().forward;
        let profile = self.motion.profile();
        self.motion
            .move_axis_and_confirm(Axis::Elevation, forward.elevation, profile)?;
        self.motion
            .move_axis_and_confirm(Axis::Azimuth, forward.azimuth, profile)?;
        log::info!("At forward position ({}, {})", forward.azimuth, forward.elevation);
        Ok(())
    }

    fn calibrate(&mut self) -> Result<(), ScanError> {
        self.motion.calibrate(Axis::Azimuth)?;
        self.motion.calibrate(Axis::Elevation)?;
        self.motion.wait_ready()?;
        log::info!("Servos calibrated");
        Ok(())
    }

    fn clear_tracks(&mut self) {
        log::info!("Clearing {} tracks", self.tracker.len());
        self.tracker.clear();
        self.events.send(ScanEvent::TracksCleared);
    }

    /// Takes one sample at the current position and publishes the report.
    /// A sensor or telemetry failure aborts the step before the tracks change.
    fn measure_at(&mut self, position: Waypoint, ingest: bool) -> Result<ScanReport, ScanError> {
        let sample = self.sensor.measure()?;
        let telemetry_azimuth = self.telemetry(Axis::Azimuth)?;
        let telemetry_elevation = self.telemetry(Axis::Elevation)?;

        let segmentation = self.segmenter.segment(&sample);
        let detections: Vec<Detection> = segmentation
            .detections
            .into_iter()
            .map(|d| d.located_at(position))
            .collect();

        if ingest {
            let outcome = self.tracker.ingest(&detections, position);
            for id in outcome.new_ids.iter().chain(&outcome.updated_ids) {
                if let Some(track) = self.tracker.get(*id) {
                    let label = self.classifier.classify_frequency(track.peak_mhz);
                    self.tracker.set_channel(*id, label);
                }
            }
        }

        let report = ScanReport {
            run_id: self.run_id,
            sequence: self.sequence,
            position,
            sweep: self.tracker.sweep(),
            threshold_db: segmentation.threshold_db,
            detections: detections
                .into_iter()
                .map(|detection| LabelledDetection {
                    channel: self.classifier.classify(&detection),
                    detection,
                })
                .collect(),
            tracks: self.tracker.snapshot(),
            sample,
            telemetry_azimuth,
            telemetry_elevation,
            timestamp: Utc::now(),
        };
        self.sequence += 1;
        self.events.send(ScanEvent::Measurement(Box::new(report.clone())));
        Ok(report)
    }

    fn telemetry(&mut self, axis: Axis) -> Result<Option<Telemetry>, MotionError> {
        let telemetry = self.motion.telemetry(axis)?;
        if let Some(t) = &telemetry {
            if t.temperature >= self.motion.config().temperature_warning {
                log::warn!("{} servo running hot: {} C", axis, t.temperature);
            }
        }
        Ok(telemetry)
    }

    /// Handles commands that arrived while a pattern runs. A stop or a new
    /// pattern cancels the current one at its next move; the new pattern runs
    /// once the current one has unwound. A stop also drops any pattern queued
    /// before it.
    fn poll_inbox(&mut self) {
        let Some(inbox) = &self.inbox else {
            return;
        };
        let received: Vec<ScanCommand> = inbox.try_iter().collect();
        for command in received {
            match command {
                ScanCommand::Stop => {
                    if let Some(dropped) = self.pending.take() {
                        log::info!("Stop discards queued {}", dropped);
                    }
                    self.motion.cancel_flag().raise();
                }
                command if !command.is_run() => self.adjust(&command),
                command => {
                    log::info!("{} preempts the running pattern", command);
                    self.motion.cancel_flag().raise();
                    self.pending = Some(command);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFlag;
    use crate::config::{MotionConfig, SegmenterConfig, TrackerConfig};
    use crate::motion::sim::SimulatedRig;
    use crate::scan::events::event_channel;
    use crate::spectrum::{SensorError, SpectrumSample};
    use crossbeam::channel::unbounded;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const BINS: usize = 64;

    /// Returns one strong carrier whenever the rig points at `hot_azimuth`,
    /// flat noise otherwise.
    struct FakeSensor {
        rig_azimuth: Arc<Mutex<Vec<String>>>,
        hot_azimuth: i32,
        fail: bool,
    }

    impl FakeSensor {
        fn current_azimuth(&self) -> Option<i32> {
            self.rig_azimuth
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find_map(|line| {
                    let fields: Vec<&str> = line.split(',').collect();
                    match fields.as_slice() {
                        ["MOVE", "1", position, ..] => position.parse().ok(),
                        ["SYNC_MOVE", ..] => fields.get(5).and_then(|p| p.trim_end_matches(']').parse().ok()),
                        _ => None,
                    }
                })
        }
    }

    impl SpectrumSensor for FakeSensor {
        fn measure(&mut self) -> Result<SpectrumSample, SensorError> {
            if self.fail {
                return Err(SensorError::Unavailable("unplugged".into()));
            }
            let mut db = vec![-70.0; BINS];
            if self.current_azimuth() == Some(self.hot_azimuth) {
                for value in &mut db[20..24] {
                    *value = -20.0;
                }
            }
            let power = db.iter().map(|d: &f64| 10f64.powf(d / 10.0)).collect();
            let frequencies = (0..BINS).map(|i| 5800.0 + i as f64).collect();
            SpectrumSample::new(power, frequencies)
        }
    }

    struct Harness {
        orchestrator: Orchestrator<SimulatedRig, FakeSensor>,
        events: Receiver<ScanEvent>,
        sent: Arc<Mutex<Vec<String>>>,
        cancel: CancelFlag,
    }

    fn harness(hot_azimuth: i32, fail: bool) -> Harness {
        let rig = SimulatedRig::new(2048, 1024).with_rate(4096);
        let sent = rig.sent_log();
        let config = MotionConfig {
            poll_interval: Duration::from_millis(0),
            ready_interval: Duration::from_millis(0),
            ..MotionConfig::default()
        };
        let cancel = CancelFlag::new();
        let motion = MotionController::new(rig, config, cancel.clone());
        let sensor = FakeSensor {
            rig_azimuth: sent.clone(),
            hot_azimuth,
            fail,
        };
        let (tx, events) = event_channel(1024);
        let orchestrator = Orchestrator::new(
            motion,
            sensor,
            Segmenter::new(SegmenterConfig {
                dead_zone: crate::config::DeadZone { start: 0, end: 0 },
                ..SegmenterConfig::default()
            }),
            SignalTracker::new(&TrackerConfig::default()),
            SweepConfig::default(),
            tx,
        );
        Harness {
            orchestrator,
            events,
            sent,
            cancel,
        }
    }

    fn reports(events: &Receiver<ScanEvent>) -> Vec<ScanReport> {
        events
            .try_iter()
            .filter_map(|e| match e {
                ScanEvent::Measurement(report) => Some(*report),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn horizontal_passes_stay_aligned() {
        let mut h = harness(1024, false);
        let outcome = h
            .orchestrator
            .execute(ScanCommand::HorizontalSweep {
                points: 4,
                elevation: 1200,
                passes: Some(2),
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let reports = reports(&h.events);
        let positions: Vec<i32> = reports.iter().map(|r| r.position.azimuth).collect();
        assert_eq!(positions, vec![0, 1024, 2048, 3072, 2048, 1024, 0]);
        assert!(reports.iter().all(|r| r.position.elevation == 1200));
        let sweeps: Vec<usize> = reports.iter().map(|r| r.sweep).collect();
        assert_eq!(sweeps, vec![0, 0, 0, 0, 1, 1, 1]);

        let tracks = h.orchestrator.tracks();
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.best_position, Waypoint::new(1024, 1200));
        assert_eq!(track.hits, 2);
        assert_eq!(track.history.len(), 2);
        assert_eq!(track.history[0].len(), 1);
        assert_eq!(track.history[1].len(), 1);
    }

    #[test]
    fn measurement_reports_carry_telemetry_and_labels() {
        let mut h = harness(2048, false);
        h.orchestrator.execute(ScanCommand::SingleScan).unwrap();
        let single = reports(&h.events);
        assert_eq!(single.len(), 1);
        assert!(single[0].detections.is_empty(), "no MOVE was sent, so nothing is hot");
        assert_eq!(single[0].position, Waypoint::new(2048, 1024));

        h.orchestrator
            .execute(ScanCommand::SectionSweep {
                start: 2048,
                end: 2304,
                points: 1,
                elevation: 1024,
                passes: Some(1),
            })
            .unwrap();
        let section = reports(&h.events);
        assert_eq!(section.len(), 1);
        let report = &section[0];
        assert_eq!(report.detections.len(), 1);
        assert_eq!(report.detections[0].detection.position, Some(report.position));
        assert!(report.telemetry_azimuth.is_some());
        assert_eq!(report.telemetry_elevation.as_ref().map(|t| t.position), Some(1024));
        assert_eq!(report.tracks.len(), 1);
        assert!(report.tracks[0].channel.is_some());
    }

    #[test]
    fn out_of_bounds_elevation_fails_the_run_without_moving() {
        let mut h = harness(0, false);
        let result = h.orchestrator.execute(ScanCommand::HorizontalSweep {
            points: 4,
            elevation: 2500,
            passes: Some(1),
        });
        assert!(matches!(
            result,
            Err(ScanError::Motion(MotionError::OutOfBounds { .. }))
        ));
        assert!(h.sent.lock().unwrap().is_empty());
        let events: Vec<ScanEvent> = h.events.try_iter().collect();
        assert!(matches!(events.last(), Some(ScanEvent::Failed { .. })));
    }

    #[test]
    fn raised_flag_cancels_and_engine_restarts() {
        let mut h = harness(0, false);
        h.cancel.raise();
        let outcome = h.orchestrator.execute(ScanCommand::FullSweep).unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(!h.cancel.is_raised());
        assert!(h.sent.lock().unwrap().is_empty());

        let outcome = h.orchestrator.execute(ScanCommand::Forward).unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
    }

    #[test]
    fn sensor_failure_is_surfaced() {
        let mut h = harness(0, true);
        let result = h.orchestrator.execute(ScanCommand::SingleScan);
        assert!(matches!(result, Err(ScanError::Sensor(_))));
    }

    #[test]
    fn stop_while_idle_clears_flag() {
        let mut h = harness(0, false);
        h.cancel.raise();
        h.orchestrator.execute(ScanCommand::Stop).unwrap();
        assert!(!h.cancel.is_raised());
    }

    #[test]
    fn refine_unknown_track_fails() {
        let mut h = harness(0, false);
        let result = h.orchestrator.execute(ScanCommand::RefineTrack {
            track_id: 42,
            radius: None,
        });
        assert!(matches!(result, Err(ScanError::UnknownTrack(42))));
    }

    #[test]
    fn inbox_stop_cancels_running_pattern() {
        let mut h = harness(0, false);
        let (tx, rx) = unbounded();
        h.orchestrator.inbox = Some(rx);
        tx.send(ScanCommand::Stop).unwrap();
        let outcome = h
            .orchestrator
            .execute(ScanCommand::HorizontalSweep {
                points: 4,
                elevation: 1024,
                passes: None,
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(h.orchestrator.pending.is_none());
    }

    #[test]
    fn new_pattern_preempts_and_is_queued() {
        let mut h = harness(0, false);
        let (tx, rx) = unbounded();
        h.orchestrator.inbox = Some(rx);
        tx.send(ScanCommand::Forward).unwrap();
        let outcome = h
            .orchestrator
            .execute(ScanCommand::HorizontalSweep {
                points: 4,
                elevation: 1024,
                passes: None,
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(h.orchestrator.pending, Some(ScanCommand::Forward));
    }

    /// Rig whose telemetry requests fail at the transport.
    struct TelemetryFault(SimulatedRig);

    impl LineTransport for TelemetryFault {
        fn send_line(&mut self, line: &str) -> std::io::Result<()> {
            if line.starts_with("GET_TELEMETRY") {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.0.send_line(line)
        }

        fn read_line(&mut self) -> std::io::Result<String> {
            self.0.read_line()
        }
    }

    #[test]
    fn telemetry_failure_leaves_tracks_untouched() {
        let rig = SimulatedRig::new(2048, 1024).with_rate(4096);
        let sent = rig.sent_log();
        let config = MotionConfig {
            poll_interval: Duration::ZERO,
            ..MotionConfig::default()
        };
        let motion = MotionController::new(TelemetryFault(rig), config, CancelFlag::new());
        let sensor = FakeSensor {
            rig_azimuth: sent,
            hot_azimuth: 2048,
            fail: false,
        };
        let (tx, _events) = event_channel(64);
        let mut orchestrator = Orchestrator::new(
            motion,
            sensor,
            Segmenter::new(SegmenterConfig {
                dead_zone: crate::config::DeadZone { start: 0, end: 0 },
                ..SegmenterConfig::default()
            }),
            SignalTracker::new(&TrackerConfig::default()),
            SweepConfig::default(),
            tx,
        );
        let result = orchestrator.execute(ScanCommand::SectionSweep {
            start: 2048,
            end: 2304,
            points: 1,
            elevation: 1024,
            passes: Some(1),
        });
        assert!(matches!(result, Err(ScanError::Motion(MotionError::Transport(_)))));
        assert!(orchestrator.tracks().is_empty());
    }

    #[test]
    fn stop_after_new_pattern_discards_it() {
        let mut h = harness(0, false);
        let (tx, rx) = unbounded();
        h.orchestrator.inbox = Some(rx);
        tx.send(ScanCommand::Forward).unwrap();
        tx.send(ScanCommand::Stop).unwrap();
        let outcome = h
            .orchestrator
            .execute(ScanCommand::HorizontalSweep {
                points: 4,
                elevation: 1024,
                passes: None,
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(h.orchestrator.pending.is_none());
    }

    #[test]
    fn full_sweep_advances_one_sweep_per_band() {
        let mut h = harness(1024, false);
        h.orchestrator.sweep.point_counts = vec![4, 4, 1];
        let outcome = h.orchestrator.execute(ScanCommand::FullSweep).unwrap();
        assert_eq!(outcome, RunOutcome::Completed);

        let reports = reports(&h.events);
        let azimuths: Vec<i32> = reports.iter().map(|r| r.position.azimuth).collect();
        assert_eq!(azimuths, vec![0, 1024, 2048, 3072, 3072, 2048, 1024, 0, 0]);
        let elevations: Vec<i32> = reports.iter().map(|r| r.position.elevation).collect();
        assert_eq!(
            elevations,
            vec![1024, 1024, 1024, 1024, 1536, 1536, 1536, 1536, 2048]
        );
        let sweeps: Vec<usize> = reports.iter().map(|r| r.sweep).collect();
        assert_eq!(sweeps, vec![0, 0, 0, 0, 1, 1, 1, 1, 2]);

        let tracks = h.orchestrator.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hits, 2);
        assert_eq!(tracks[0].history.len(), 2);
        assert_eq!(tracks[0].history[1][0].position, Waypoint::new(1024, 1536));
    }

    #[test]
    fn set_threshold_pins_next_measurement() {
        let mut h = harness(0, false);
        let outcome = h
            .orchestrator
            .execute(ScanCommand::SetThreshold {
                threshold_db: Some(-30.0),
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert!(h.events.try_recv().is_err());

        h.orchestrator.execute(ScanCommand::SingleScan).unwrap();
        let reports = reports(&h.events);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].threshold_db, -30.0);
    }
}
