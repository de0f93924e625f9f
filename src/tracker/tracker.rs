use chrono::Utc;
use std::collections::BTreeMap;

use super::ids::IdGenerator;
use super::types::{IngestOutcome, PositionSample, Track, TrackId};
use crate::channel::ChannelLabel;
use crate::config::TrackerConfig;
use crate::motion::Waypoint;
use crate::spectrum::Detection;

/// A better fix for a track found by a local search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement {
    pub position: Waypoint,
    pub peak_mhz: f64,
    pub peak_power_db: f64,
}

/// Follows emitters across measurements taken at different positions.
///
/// Matching is a tolerance on peak, start and end frequency together. Two
/// distinct emitters inside the same tolerance are merged; this is an
/// approximation, not an identity guarantee.
#[derive(Debug)]
pub struct SignalTracker {
    tracks: BTreeMap<TrackId, Track>,
    ids: IdGenerator,
    tolerance_mhz: f64,
    sweep: usize,
    sweep_has_data: bool,
}

impl SignalTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            ids: IdGenerator::new(),
            tolerance_mhz: config.tolerance_mhz,
            sweep: 0,
            sweep_has_data: false,
        }
    }

    /// Current sweep number. History buckets are indexed by it.
    pub fn sweep(&self) -> usize {
        self.sweep
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Owned copies, in id order.
    pub fn snapshot(&self) -> Vec<Track> {
        self.tracks.values().cloned().collect()
    }

    /// Moves on to the next sweep. A sweep that saw no ingest is not counted.
    pub fn advance_sweep(&mut self) {
        if self.sweep_has_data {
            self.sweep += 1;
            self.sweep_has_data = false;
        }
    }

    pub fn ingest(&mut self, detections: &[Detection], position: Waypoint) -> IngestOutcome {
        let sweep = self.sweep;
        let tolerance = self.tolerance_mhz;
        self.sweep_has_data = true;
        for track in self.tracks.values_mut() {
            track.align_history(sweep);
        }

        let mut outcome = IngestOutcome::default();
        for detection in detections {
            let matched = self
                .tracks
                .values_mut()
                .find(|t| t.matches(detection, tolerance));

            match matched {
                Some(track) => {
                    track.history[sweep].push(PositionSample {
                        position,
                        power_db: detection.peak_power_db,
                    });
                    track.hits += 1;
                    track.last_seen = Utc::now();
                    track.start_mhz = track.start_mhz.min(detection.start_mhz);
                    track.end_mhz = track.end_mhz.max(detection.end_mhz);
                    if detection.peak_power_db > track.peak_power_db {
                        track.peak_power_db = detection.peak_power_db;
                        track.peak_mhz = detection.peak_mhz;
                        track.best_position = position;
                    }
                    if !outcome.updated_ids.contains(&track.id) {
                        outcome.updated_ids.push(track.id);
                    }
                }
                None => {
                    let id = self.ids.next_id();
                    let track = Track::seed(id, detection, position, sweep);
                    log::info!(
                        "New track {}: {:.2}-{:.2} MHz, peak {:.2} MHz at {:.1} dB",
                        id,
                        track.start_mhz,
                        track.end_mhz,
                        track.peak_mhz,
                        track.peak_power_db
                    );
                    self.tracks.insert(id, track);
                    outcome.new_ids.push(id);
                }
            }
        }
        outcome
    }

    pub fn set_channel(&mut self, id: TrackId, label: ChannelLabel) {
        if let Some(track) = self.tracks.get_mut(&id) {
            track.channel = Some(label);
        }
    }

    /// Takes the refined fix if it beats the track's best reading.
    /// Returns whether the track changed.
    pub fn apply_refinement(&mut self, id: TrackId, refinement: Refinement) -> bool {
        let Some(track) = self.tracks.get_mut(&id) else {
            return false;
        };
        if refinement.peak_power_db <= track.peak_power_db {
            return false;
        }
        track.peak_power_db = refinement.peak_power_db;
        track.peak_mhz = refinement.peak_mhz;
        track.best_position = refinement.position;
        track.last_seen = Utc::now();
        true
    }

    /// Drops every track and starts over at sweep zero. Ids keep counting.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.sweep = 0;
        self.sweep_has_data = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detection(start: f64, peak: f64, end: f64, power: f64) -> Detection {
        Detection {
            start_mhz: start,
            end_mhz: end,
            peak_mhz: peak,
            peak_power_db: power,
            position: None,
        }
    }

    fn tracker() -> SignalTracker {
        SignalTracker::new(&TrackerConfig::default())
    }

    const HERE: Waypoint = Waypoint::new(1000, 1024);
    const THERE: Waypoint = Waypoint::new(2000, 1200);

    #[test]
    fn close_detections_merge_into_one_track() {
        let mut tracker = tracker();
        let first = tracker.ingest(&[detection(5780.0, 5781.0, 5782.0, -30.0)], HERE);
        let second = tracker.ingest(&[detection(5780.05, 5781.08, 5781.95, -25.0)], THERE);

        assert_eq!(first.new_ids, vec![1]);
        assert_eq!(second.new_ids, Vec::<TrackId>::new());
        assert_eq!(second.updated_ids, vec![1]);
        assert_eq!(tracker.len(), 1);

        let track = tracker.get(1).unwrap();
        assert_eq!(track.hits, 2);
        assert_eq!(track.best_position, THERE);
        assert_relative_eq!(track.peak_mhz, 5781.08);
        assert_relative_eq!(track.peak_power_db, -25.0);
        // envelope never shrinks
        assert_relative_eq!(track.start_mhz, 5780.0);
        assert_relative_eq!(track.end_mhz, 5782.0);
    }

    #[test]
    fn any_field_out_of_tolerance_splits() {
        let base = detection(5780.0, 5781.0, 5782.0, -30.0);
        let variants = [
            detection(5780.0, 5781.2, 5782.0, -30.0),
            detection(5779.8, 5781.0, 5782.0, -30.0),
            detection(5780.0, 5781.0, 5782.3, -30.0),
        ];
        for variant in variants {
            let mut tracker = tracker();
            tracker.ingest(&[base.clone()], HERE);
            let outcome = tracker.ingest(&[variant], HERE);
            assert_eq!(outcome.new_ids.len(), 1);
            assert_eq!(tracker.len(), 2);
        }
    }

    #[test]
    fn weaker_reading_keeps_best_position() {
        let mut tracker = tracker();
        tracker.ingest(&[detection(5780.0, 5781.0, 5782.0, -20.0)], HERE);
        tracker.ingest(&[detection(5780.0, 5781.05, 5782.0, -40.0)], THERE);
        let track = tracker.get(1).unwrap();
        assert_eq!(track.best_position, HERE);
        assert_relative_eq!(track.peak_mhz, 5781.0);
        assert_eq!(track.history[0].len(), 2);
    }

    #[test]
    fn history_stays_aligned_across_sweeps() {
        let mut tracker = tracker();
        let a = detection(5780.0, 5781.0, 5782.0, -30.0);
        let b = detection(5800.0, 5801.0, 5802.0, -30.0);

        tracker.ingest(&[a.clone()], HERE);
        tracker.advance_sweep();
        tracker.ingest(&[b.clone()], HERE);
        tracker.advance_sweep();
        tracker.ingest(&[], THERE);

        assert_eq!(tracker.sweep(), 2);
        for track in tracker.snapshot() {
            assert_eq!(track.history.len(), 3);
        }
        let first = tracker.get(1).unwrap();
        assert_eq!(first.history[0].len(), 1);
        assert!(first.history[1].is_empty());
        let second = tracker.get(2).unwrap();
        assert!(second.history[0].is_empty());
        assert_eq!(second.history[1].len(), 1);
    }

    #[test]
    fn empty_sweeps_are_not_counted() {
        let mut tracker = tracker();
        tracker.advance_sweep();
        tracker.advance_sweep();
        assert_eq!(tracker.sweep(), 0);
        tracker.ingest(&[], HERE);
        tracker.advance_sweep();
        assert_eq!(tracker.sweep(), 1);
    }

    #[test]
    fn clear_keeps_ids_increasing() {
        let mut tracker = tracker();
        tracker.ingest(&[detection(5780.0, 5781.0, 5782.0, -30.0)], HERE);
        tracker.advance_sweep();
        tracker.clear();
        assert!(tracker.is_empty());
        assert_eq!(tracker.sweep(), 0);
        let outcome = tracker.ingest(&[detection(5780.0, 5781.0, 5782.0, -30.0)], HERE);
        assert_eq!(outcome.new_ids, vec![2]);
    }

    #[test]
    fn refinement_only_improves() {
        let mut tracker = tracker();
        tracker.ingest(&[detection(5780.0, 5781.0, 5782.0, -30.0)], HERE);
        let weaker = Refinement {
            position: THERE,
            peak_mhz: 5781.5,
            peak_power_db: -35.0,
        };
        assert!(!tracker.apply_refinement(1, weaker));
        let stronger = Refinement {
            peak_power_db: -10.0,
            ..weaker
        };
        assert!(tracker.apply_refinement(1, stronger));
        assert_eq!(tracker.get(1).unwrap().best_position, THERE);
        assert!(!tracker.apply_refinement(99, stronger));
    }
}
