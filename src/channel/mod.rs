//! Analog video channel reference tables and the frequency classifier.

mod bands;
mod board;
mod classifier;

pub use bands::{ChannelBand, ChannelTable};
pub use board::{ChannelBoard, ChannelEntry};
pub use classifier::{ChannelClassifier, ChannelLabel};
