use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::motion::{AxisLimits, AxisRange, Waypoint};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    pub sensor: SensorConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StationConfig {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub speed: u32,
    pub acceleration: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub query_retries: u32,
    pub tolerance: i32,
    pub dual_tolerance: i32,
    /// Drift allowed on the held elevation during horizontal sweeps before it is re-issued.
    pub hold_tolerance: i32,
    pub ready_attempts: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub ready_interval: Duration,
    pub temperature_warning: i32,
    pub limits: AxisLimits,
    pub forward: Waypoint,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 2000,
            acceleration: 100,
            poll_interval: Duration::from_millis(20),
            max_polls: 500,
            query_retries: 3,
            tolerance: 20,
            dual_tolerance: 10,
            hold_tolerance: 10,
            ready_attempts: 10,
            ready_interval: Duration::from_secs(1),
            temperature_warning: 50,
            limits: AxisLimits::default(),
            forward: Waypoint {
                azimuth: 2048,
                elevation: 1024,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseStatistic {
    Median,
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeadZone {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
}

impl DeadZone {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Pins the level of interest and disables the adaptive estimate.
    pub manual_threshold_db: Option<f64>,
    pub multiplier: f64,
    pub statistic: NoiseStatistic,
    pub floor_db: f64,
    pub ceiling_db: f64,
    pub dead_zone: DeadZone,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            manual_threshold_db: None,
            multiplier: 2.0,
            statistic: NoiseStatistic::Median,
            floor_db: -55.0,
            ceiling_db: -35.0,
            dead_zone: DeadZone {
                start: 1000,
                end: 1048,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub tolerance_mhz: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { tolerance_mhz: 0.1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Azimuth points per elevation band of the full-area sweep, horizon first.
    pub point_counts: Vec<usize>,
    pub circumference: i32,
    pub start_angle: f64,
    pub refine_radius: i32,
    pub refine_min_radius: i32,
    pub event_queue: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            point_counts: vec![12, 12, 10, 8, 6, 4, 1],
            circumference: 4096,
            start_angle: 0.0,
            refine_radius: 256,
            refine_min_radius: 25,
            event_queue: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorConfig {
    Replay {
        path: PathBuf,
    },
    HackrfSweep {
        min_mhz: u32,
        max_mhz: u32,
        #[serde(default = "default_bin_width")]
        bin_width_hz: u32,
        #[serde(default = "default_lna_gain")]
        lna_gain: u32,
        #[serde(default = "default_vga_gain")]
        vga_gain: u32,
        #[serde(default)]
        amp: bool,
    },
}

fn default_bin_width() -> u32 {
    100_000
}

fn default_lna_gain() -> u32 {
    32
}

fn default_vga_gain() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    ControlScan,
    ViewScan,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let limits = &self.motion.limits;
        for (name, range) in [
            ("azimuth", limits.azimuth),
            ("elevation_safety", limits.elevation_safety),
            ("elevation_scan", limits.elevation_scan),
        ] {
            if range.min >= range.max {
                return Err(ConfigError::Invalid(format!(
                    "{} range is empty ({}..={})",
                    name, range.min, range.max
                )));
            }
        }
        if !contains_range(limits.elevation_safety, limits.elevation_scan) {
            return Err(ConfigError::Invalid(
                "elevation_scan must lie inside elevation_safety".into(),
            ));
        }
        if self.sweep.point_counts.len() < 2 {
            return Err(ConfigError::Invalid(
                "sweep.point_counts needs at least two bands".into(),
            ));
        }
        if self.segmenter.floor_db > self.segmenter.ceiling_db {
            return Err(ConfigError::Invalid(
                "segmenter.floor_db is above segmenter.ceiling_db".into(),
            ));
        }
        Ok(())
    }
}

fn contains_range(outer: AxisRange, inner: AxisRange) -> bool {
    outer.min <= inner.min && inner.max <= outer.max
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
sensor:
  kind: replay
  path: samples.json
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_str(MINIMAL).unwrap();
        assert_eq!(config.motion.tolerance, 20);
        assert_eq!(config.motion.dual_tolerance, 10);
        assert_eq!(config.motion.limits.elevation_safety.min, 700);
        assert_eq!(config.segmenter.floor_db, -55.0);
        assert_eq!(config.sweep.point_counts, vec![12, 12, 10, 8, 6, 4, 1]);
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn durations_are_humantime_strings() {
        let yaml = r#"
motion:
  poll_interval: 5ms
  ready_interval: 2s
sensor:
  kind: hackrf_sweep
  min_mhz: 5640
  max_mhz: 5945
api_keys:
  - key: secret
    name: field
    permissions: [control_scan, view_scan]
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.motion.poll_interval, Duration::from_millis(5));
        assert_eq!(config.motion.ready_interval, Duration::from_secs(2));
        assert!(matches!(
            config.sensor,
            SensorConfig::HackrfSweep {
                bin_width_hz: 100_000,
                ..
            }
        ));
        let key = config.find_api_key("secret").unwrap();
        assert!(key.permissions.contains(&Permission::ControlScan));
    }

    #[test]
    fn rejects_scan_range_outside_safety_window() {
        let yaml = r#"
motion:
  limits:
    azimuth: { min: 0, max: 4096 }
    elevation_safety: { min: 1000, max: 2000 }
    elevation_scan: { min: 900, max: 2000 }
sensor:
  kind: replay
  path: samples.json
"#;
        assert!(matches!(
            Config::from_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(matches!(config.sensor, SensorConfig::Replay { .. }));
    }
}
