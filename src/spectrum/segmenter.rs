use serde::Serialize;

use super::types::{Detection, SpectrumSample};
use crate::config::{NoiseStatistic, SegmenterConfig};

/// Detections found in one sample together with the threshold that found them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub threshold_db: f64,
    pub detections: Vec<Detection>,
}

/// Cuts a spectrum into signals: every maximal run of bins at or above the
/// level of interest becomes one detection. The dead zone around the DC spike
/// never counts as signal and always ends a run.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Pins the threshold, or hands it back to the adaptive estimate with `None`.
    pub fn set_manual_threshold(&mut self, threshold_db: Option<f64>) {
        self.config.manual_threshold_db = threshold_db;
    }

    pub fn segment(&self, sample: &SpectrumSample) -> Segmentation {
        let db = sample.to_db();
        let threshold_db = self.level_of_interest(&db);
        log::debug!("level of interest {:.2} dB", threshold_db);
        Segmentation {
            threshold_db,
            detections: self.segment_db(&db, &sample.frequencies_mhz, threshold_db),
        }
    }

    /// Adaptive threshold `min + k * |min - stat|` over the bins outside the
    /// dead zone, clamped into `[floor, ceiling]`. A pinned manual value is
    /// returned as is.
    pub fn level_of_interest(&self, db: &[f64]) -> f64 {
        if let Some(manual) = self.config.manual_threshold_db {
            return manual;
        }

        let mut usable: Vec<f64> = db
            .iter()
            .enumerate()
            .filter(|(i, v)| !self.config.dead_zone.contains(*i) && v.is_finite())
            .map(|(_, v)| *v)
            .collect();
        if usable.is_empty() {
            return self.config.floor_db;
        }
        usable.sort_by(f64::total_cmp);

        let min = usable[0];
        let stat = match self.config.statistic {
            NoiseStatistic::Median => median(&usable),
            NoiseStatistic::Mean => usable.iter().sum::<f64>() / usable.len() as f64,
        };
        let threshold = min + self.config.multiplier * (min - stat).abs();
        threshold.clamp(self.config.floor_db, self.config.ceiling_db)
    }

    /// Splits a dB spectrum at a fixed threshold. Deterministic for a given
    /// input, so the same sample always yields the same boundaries.
    pub fn segment_db(&self, db: &[f64], frequencies: &[f64], threshold_db: f64) -> Vec<Detection> {
        let mut detections = Vec::new();
        let mut run: Option<Detection> = None;

        for (index, (&power_db, &frequency)) in db.iter().zip(frequencies).enumerate() {
            // NaN bins end a run too.
            if self.config.dead_zone.contains(index) || !(power_db >= threshold_db) {
                detections.extend(run.take());
                continue;
            }
            match run.as_mut() {
                Some(current) => {
                    current.end_mhz = frequency;
                    if power_db > current.peak_power_db {
                        current.peak_power_db = power_db;
                        current.peak_mhz = frequency;
                    }
                }
                None => {
                    run = Some(Detection {
                        start_mhz: frequency,
                        end_mhz: frequency,
                        peak_mhz: frequency,
                        peak_power_db: power_db,
                        position: None,
                    });
                }
            }
        }
        detections.extend(run);
        detections
    }
}

/// Median of an already sorted, non-empty slice.
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
