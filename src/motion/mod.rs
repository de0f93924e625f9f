mod controller;
mod error;
pub mod protocol;
pub mod sim;
mod transport;
mod types;

pub use controller::MotionController;
pub use error::MotionError;
pub use transport::{LineTransport, SerialTransport};
pub use types::{Axis, AxisLimits, AxisRange, Bearing, Telemetry, Waypoint};
