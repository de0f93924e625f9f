use std::thread;

use super::parser::Plan;
use crate::motion::LineTransport;
use crate::scan::{Orchestrator, RunOutcome, ScanError};
use crate::spectrum::SpectrumSensor;

/// Runs a plan's steps in order on the calling thread. Stops at the first
/// failed or cancelled step.
pub struct PlanRunner<'a, T, S> {
    pub plan: &'a Plan,
    pub orchestrator: &'a mut Orchestrator<T, S>,
}

impl<T: LineTransport, S: SpectrumSensor> PlanRunner<'_, T, S> {
    /// Returns how many steps completed.
    pub fn run(self) -> Result<usize, ScanError> {
        let total = self.plan.steps.len();
        for (i, step) in self.plan.steps.iter().enumerate() {
            log::info!("Step {}/{}: {}", i + 1, total, step.command);
            if let RunOutcome::Cancelled = self.orchestrator.execute(step.command.clone())? {
                log::warn!("Step {} cancelled, abandoning plan", i + 1);
                return Ok(i);
            }
            if let Some(pause) = step.after {
                log::info!("Waiting {}", humantime::format_duration(pause));
                thread::sleep(pause);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFlag;
    use crate::config::{MotionConfig, SegmenterConfig, SweepConfig, TrackerConfig};
    use crate::motion::sim::SimulatedRig;
    use crate::motion::MotionController;
    use crate::scan::{event_channel, ScanEvent};
    use crate::spectrum::sensor::ReplaySensor;
    use crate::spectrum::{Segmenter, SpectrumSample};
    use crate::tracker::SignalTracker;
    use std::time::Duration;

    fn orchestrator(cancel: CancelFlag) -> (Orchestrator<SimulatedRig, ReplaySensor>, crossbeam::channel::Receiver<ScanEvent>) {
        let config = MotionConfig {
            poll_interval: Duration::ZERO,
            ..MotionConfig::default()
        };
        let motion = MotionController::new(SimulatedRig::new(0, 1024).with_rate(4096), config, cancel);
        let sample = SpectrumSample::new(vec![1e-7; 16], (0..16).map(|i| 5800.0 + i as f64).collect()).unwrap();
        let (tx, rx) = event_channel(64);
        let orchestrator = Orchestrator::new(
            motion,
            ReplaySensor::new(vec![sample]),
            Segmenter::new(SegmenterConfig::default()),
            SignalTracker::new(&TrackerConfig::default()),
            SweepConfig::default(),
            tx,
        );
        (orchestrator, rx)
    }

    #[test]
    fn runs_every_step_in_order() {
        let plan = Plan::from_str(
            r#"
steps:
  - action: forward
  - action: section_sweep
    start: 1792
    end: 2304
    points: 4
    elevation: 1024
    passes: 2
  - action: single_scan
    after: 1ms
"#,
        )
        .unwrap();
        let (mut orchestrator, events) = orchestrator(CancelFlag::new());
        let done = PlanRunner {
            plan: &plan,
            orchestrator: &mut orchestrator,
        }
        .run()
        .unwrap();
        assert_eq!(done, 3);

        let measurements = events
            .try_iter()
            .filter(|e| matches!(e, ScanEvent::Measurement(_)))
            .count();
        // 4 stops, 3 on the way back, then the single scan
        assert_eq!(measurements, 8);
    }

    #[test]
    fn cancelled_step_ends_the_plan() {
        let plan = Plan::from_str("steps:\n  - action: forward\n  - action: single_scan\n").unwrap();
        let cancel = CancelFlag::new();
        cancel.raise();
        let (mut orchestrator, _events) = orchestrator(cancel);
        let done = PlanRunner {
            plan: &plan,
            orchestrator: &mut orchestrator,
        }
        .run()
        .unwrap();
        assert_eq!(done, 0);
    }
}
