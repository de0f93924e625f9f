use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use super::types::ScanEvent;

/// Producer side of the event stream. Never blocks: when the queue is full the
/// oldest event is dropped to make room.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<ScanEvent>,
    // Held so the producer can evict from the front of the queue.
    rx: Receiver<ScanEvent>,
}

pub fn event_channel(capacity: usize) -> (EventSender, Receiver<ScanEvent>) {
    let (tx, rx) = bounded(capacity.max(1));
    (EventSender { tx, rx: rx.clone() }, rx)
}

impl EventSender {
    pub fn send(&self, event: ScanEvent) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.rx.try_recv().is_ok() {
                        log::debug!("event queue full, dropped oldest event");
                    }
                    event = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}
