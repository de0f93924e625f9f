use std::path::Path;
use std::process::Command;

use super::error::SensorError;
use super::types::SpectrumSample;
use crate::config::SensorConfig;

/// Anything that can take one power spectrum on demand.
pub trait SpectrumSensor: Send {
    fn measure(&mut self) -> Result<SpectrumSample, SensorError>;
}

impl<T: SpectrumSensor + ?Sized> SpectrumSensor for Box<T> {
    fn measure(&mut self) -> Result<SpectrumSample, SensorError> {
        (**self).measure()
    }
}

pub fn from_config(config: &SensorConfig) -> Result<Box<dyn SpectrumSensor>, SensorError> {
    match config {
        SensorConfig::Replay { path } => Ok(Box::new(ReplaySensor::from_file(path)?)),
        SensorConfig::HackrfSweep {
            min_mhz,
            max_mhz,
            bin_width_hz,
            lna_gain,
            vga_gain,
            amp,
        } => Ok(Box::new(HackrfSweepSensor {
            min_mhz: *min_mhz,
            max_mhz: *max_mhz,
            bin_width_hz: *bin_width_hz,
            lna_gain: *lna_gain,
            vga_gain: *vga_gain,
            amp: *amp,
        })),
    }
}

/// Plays back recorded samples in order, wrapping around at the end.
pub struct ReplaySensor {
    samples: Vec<SpectrumSample>,
    next: usize,
}

impl ReplaySensor {
    pub fn new(samples: Vec<SpectrumSample>) -> Self {
        Self { samples, next: 0 }
    }

    /// Loads a JSON array of `{power, frequencies_mhz}` objects.
    pub fn from_file(path: &Path) -> Result<Self, SensorError> {
        let content = std::fs::read_to_string(path)?;
        let samples: Vec<SpectrumSample> = serde_json::from_str(&content)?;
        let samples = samples
            .into_iter()
            .map(|s| SpectrumSample::new(s.power, s.frequencies_mhz))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("Loaded {} recorded samples from {}", samples.len(), path.display());
        Ok(Self::new(samples))
    }
}

impl SpectrumSensor for ReplaySensor {
    fn measure(&mut self) -> Result<SpectrumSample, SensorError> {
        if self.samples.is_empty() {
            return Err(SensorError::Unavailable("no recorded samples".into()));
        }
        let sample = self.samples[self.next].clone();
        self.next = (self.next + 1) % self.samples.len();
        Ok(sample)
    }
}

/// Runs one `hackrf_sweep` pass per measurement.
#[derive(Debug, Clone)]
pub struct HackrfSweepSensor {
    pub min_mhz: u32,
    pub max_mhz: u32,
    pub bin_width_hz: u32,
    pub lna_gain: u32,
    pub vga_gain: u32,
    pub amp: bool,
}

impl HackrfSweepSensor {
    fn args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            format!("{}:{}", self.min_mhz, self.max_mhz),
            "-w".into(),
            self.bin_width_hz.to_string(),
            "-l".into(),
            self.lna_gain.to_string(),
            "-g".into(),
            self.vga_gain.to_string(),
            "-a".into(),
            u8::from(self.amp).to_string(),
            "-1".into(),
        ]
    }
}

impl SpectrumSensor for HackrfSweepSensor {
    fn measure(&mut self) -> Result<SpectrumSample, SensorError> {
        let output = Command::new("hackrf_sweep")
            .args(self.args())
            .output()
            .map_err(|e| SensorError::Unavailable(format!("failed to run hackrf_sweep: {}", e)))?;
        if !output.status.success() {
            return Err(SensorError::Unavailable(format!(
                "hackrf_sweep exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_sweep_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses `hackrf_sweep` CSV rows
/// (`date, time, hz_low, hz_high, hz_bin_width, num_samples, dB, dB, ...`)
/// into one ascending sample in linear power.
pub fn parse_sweep_output(text: &str) -> Result<SpectrumSample, SensorError> {
    let mut bins: Vec<(f64, f64)> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 7 {
            return Err(SensorError::Parse(format!(
                "line {}: expected at least 7 fields, got {}",
                line_no + 1,
                fields.len()
            )));
        }
        let number = |index: usize| -> Result<f64, SensorError> {
            fields[index].parse::<f64>().map_err(|_| {
                SensorError::Parse(format!(
                    "line {}: invalid number {:?}",
                    line_no + 1,
                    fields[index]
                ))
            })
        };
        let hz_low = number(2)?;
        let bin_width = number(4)?;
        for index in 6..fields.len() {
            let center_hz = hz_low + (index - 6) as f64 * bin_width + bin_width / 2.0;
            bins.push((center_hz / 1e6, number(index)?));
        }
    }

    if bins.is_empty() {
        return Err(SensorError::Parse("no sweep rows".into()));
    }
    bins.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (frequencies, power): (Vec<f64>, Vec<f64>) = bins
        .into_iter()
        .map(|(frequency, db)| (frequency, 10f64.powf(db / 10.0)))
        .unzip();
    SpectrumSample::new(power, frequencies)
}
