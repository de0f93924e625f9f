mod error;
mod events;
mod orchestrator;
mod refine;
mod status;
mod types;
mod worker;

pub use error::ScanError;
pub use events::{event_channel, EventSender};
pub use orchestrator::Orchestrator;
pub use status::{ScanMode, StatusBoard};
pub use types::{LabelledDetection, RunOutcome, ScanCommand, ScanEvent, ScanReport};
pub use worker::{spawn, ScanHandle};
