//! Progress Streaming
//!
//! Stage lifecycle events broadcast to any number of listeners. Sending
//! never blocks and never fails the pipeline; events are dropped when no one
//! is subscribed.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use super::stage::Stage;

/// Progress event types
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A stage's backend call is about to start
    StageStarted { stage: Stage },
    /// A stage produced an outcome
    StageFinished {
        stage: Stage,
        failed: bool,
        duration: Duration,
    },
    /// All stages have an outcome
    Finished {
        failed_stages: usize,
        total_duration: Duration,
    },
}

/// Snapshot of pipeline progress
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    /// Stages with an outcome
    pub completed: usize,
    /// Stages in the run
    pub total: usize,
    /// Stages currently waiting on the backend
    pub running: Vec<Stage>,
    /// Failed stages so far
    pub failed: usize,
}

impl ProgressState {
    /// Overall progress (0.0-1.0)
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Broadcasts [`ProgressEvent`]s and keeps a running [`ProgressState`]
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<RwLock<ProgressState>>,
    sender: broadcast::Sender<ProgressEvent>,
    start_time: Arc<RwLock<Option<Instant>>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Stage::ALL.len())
    }
}

impl ProgressTracker {
    pub fn new(total_stages: usize) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            state: Arc::new(RwLock::new(ProgressState {
                total: total_stages,
                ..Default::default()
            })),
            sender,
            start_time: Arc::new(RwLock::new(None)),
        }
    }

    #[inline]
    fn emit(&self, event: ProgressEvent) {
        // No receivers is normal when nothing renders progress
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn state(&self) -> ProgressState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn with_state(&self, update: impl FnOnce(&mut ProgressState)) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut state);
    }

    pub fn stage_started(&self, stage: Stage) {
        self.start_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_or_insert_with(Instant::now);
        self.with_state(|s| s.running.push(stage));
        self.emit(ProgressEvent::StageStarted { stage });
    }

    pub fn stage_finished(&self, stage: Stage, failed: bool, duration: Duration) {
        self.with_state(|s| {
            s.running.retain(|r| *r != stage);
            s.completed += 1;
            if failed {
                s.failed += 1;
            }
        });
        self.emit(ProgressEvent::StageFinished {
            stage,
            failed,
            duration,
        });
    }

    pub fn finish(&self) {
        let started = *self
            .start_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let total_duration = started.map(|t| t.elapsed()).unwrap_or_default();
        let failed_stages = self.state().failed;
        self.emit(ProgressEvent::Finished {
            failed_stages,
            total_duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_tracks_stages() {
        let tracker = ProgressTracker::default();
        tracker.stage_started(Stage::Analyst);
        assert_eq!(tracker.state().running, vec![Stage::Analyst]);

        tracker.stage_finished(Stage::Analyst, true, Duration::from_millis(5));
        let state = tracker.state();
        assert!(state.running.is_empty());
        assert_eq!(state.completed, 1);
        assert_eq!(state.failed, 1);
        assert!((state.fraction() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let tracker = ProgressTracker::default();
        tracker.stage_started(Stage::Writer);
        tracker.finish();
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let tracker = ProgressTracker::default();
        let mut rx = tracker.subscribe();

        tracker.stage_started(Stage::Analyst);
        tracker.stage_finished(Stage::Analyst, false, Duration::from_millis(1));
        tracker.finish();

        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::StageStarted {
                stage: Stage::Analyst
            }
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            ProgressEvent::StageFinished { failed: false, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ProgressEvent::Finished {
                failed_stages: 0,
                ..
            }
        ));
    }
}
