//! Console Progress Rendering
//!
//! Prints one line per pipeline event. Rendering runs on its own task and
//! ends when the pipeline sends `Finished` or drops its sender.

use std::time::Duration;

use console::style;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::pipeline::{ProgressEvent, ProgressTracker, Stage};

pub struct ConsoleRenderer {
    tracker: ProgressTracker,
    show_bar: bool,
}

impl ConsoleRenderer {
    pub fn new(tracker: ProgressTracker) -> Self {
        Self {
            tracker,
            show_bar: true,
        }
    }

    pub fn with_bar(mut self, show: bool) -> Self {
        self.show_bar = show;
        self
    }

    /// Line for one event
    pub fn render(&self, event: &ProgressEvent) -> String {
        let state = self.tracker.state();
        let bar = if self.show_bar {
            format!(
                "{} {}/{} ",
                render_progress_bar(state.completed, state.total, 20),
                state.completed,
                state.total
            )
        } else {
            String::new()
        };

        match event {
            ProgressEvent::StageStarted { stage } => {
                format!("{}{} {} working...", bar, style("…").cyan(), role(*stage))
            }
            ProgressEvent::StageFinished {
                stage,
                failed,
                duration,
            } => {
                let mark = if *failed {
                    style("✗").red().to_string()
                } else {
                    style("✓").green().to_string()
                };
                format!(
                    "{}{} {} {} ({})",
                    bar,
                    mark,
                    role(*stage),
                    if *failed { "failed" } else { "done" },
                    format_duration(*duration)
                )
            }
            ProgressEvent::Finished {
                failed_stages,
                total_duration,
            } => {
                if *failed_stages == 0 {
                    format!(
                        "{} All agents finished in {}",
                        style("✓").green(),
                        format_duration(*total_duration)
                    )
                } else {
                    format!(
                        "{} Agents finished in {} with {} failure(s)",
                        style("⚠").yellow(),
                        format_duration(*total_duration),
                        failed_stages
                    )
                }
            }
        }
    }

    /// Print events from `rx` until the run finishes
    pub fn spawn(self, mut rx: broadcast::Receiver<ProgressEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        println!("{}", self.render(&event));
                        if matches!(event, ProgressEvent::Finished { .. }) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Progress renderer skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

fn role(stage: Stage) -> String {
    style(stage.role()).bold().to_string()
}

/// Render a simple progress bar
fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format duration as human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_progress_bar() {
        assert_eq!(render_progress_bar(0, 4, 4), "[░░░░]");
        assert_eq!(render_progress_bar(2, 4, 4), "[██░░]");
        assert_eq!(render_progress_bar(4, 4, 4), "[████]");
        assert_eq!(render_progress_bar(0, 0, 2), "[  ]");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_render_failure_line() {
        let renderer = ConsoleRenderer::new(ProgressTracker::default()).with_bar(false);
        let line = renderer.render(&ProgressEvent::StageFinished {
            stage: Stage::TechLead,
            failed: true,
            duration: Duration::from_millis(10),
        });
        assert!(line.contains("Tech Lead"));
        assert!(line.contains("failed"));
    }

    #[tokio::test]
    async fn test_spawn_stops_on_finished() {
        let tracker = ProgressTracker::default();
        let handle = ConsoleRenderer::new(tracker.clone()).spawn(tracker.subscribe());

        tracker.stage_started(Stage::Analyst);
        tracker.stage_finished(Stage::Analyst, false, Duration::from_millis(1));
        tracker.finish();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("renderer should stop")
            .unwrap();
    }
}
