use crossbeam::channel::{unbounded, Sender};
use std::thread::{self, JoinHandle};

use super::error::ScanError;
use super::orchestrator::Orchestrator;
use super::types::ScanCommand;
use crate::cancel::CancelFlag;
use crate::motion::LineTransport;
use crate::spectrum::SpectrumSensor;

/// Control side of a running engine. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    commands: Sender<ScanCommand>,
    cancel: CancelFlag,
}

impl ScanHandle {
    pub fn submit(&self, command: ScanCommand) -> Result<(), ScanError> {
        if command == ScanCommand::Stop {
            // Takes effect at the next move even before the engine reads its inbox.
            self.cancel.raise();
        }
        self.commands
            .send(command)
            .map_err(|_| ScanError::EngineStopped)
    }

    /// Handle with no engine behind it. Commands pile up in the returned
    /// receiver.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, crossbeam::channel::Receiver<ScanCommand>) {
        let (tx, rx) = unbounded();
        (
            ScanHandle {
                commands: tx,
                cancel: CancelFlag::new(),
            },
            rx,
        )
    }
}

/// Moves the engine onto its own thread. The thread ends once every handle
/// has been dropped.
pub fn spawn<T, S>(
    orchestrator: Orchestrator<T, S>,
) -> std::io::Result<(ScanHandle, JoinHandle<()>)>
where
    T: LineTransport + 'static,
    S: SpectrumSensor + 'static,
{
    let cancel = orchestrator.motion().cancel_flag().clone();
    let (tx, rx) = unbounded();
    let join = thread::Builder::new()
        .name("scan-engine".into())
        .spawn(move || orchestrator.run(rx))?;
    Ok((
        ScanHandle {
            commands: tx,
            cancel,
        },
        join,
    ))
}
