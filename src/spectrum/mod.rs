mod error;
mod segmenter;
pub mod sensor;
mod types;

pub use error::SensorError;
pub use segmenter::Segmenter;
pub use sensor::{from_config, SpectrumSensor};
pub use types::{Detection, SpectrumSample};
