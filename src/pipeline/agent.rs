//! Completion client bound to one stage's persona.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::outcome::{StageOutcome, StageRecord};
use super::stage::Stage;
use crate::ai::{ContextGuard, ErrorClassifier, SharedProvider, TokenUsage, with_timeout};

/// Runs single guarded completion calls against a shared provider
#[derive(Clone)]
pub struct Agent {
    provider: SharedProvider,
    guard: ContextGuard,
    request_timeout: Duration,
}

impl Agent {
    pub fn new(provider: SharedProvider, guard: ContextGuard, request_timeout: Duration) -> Self {
        Self {
            provider,
            guard,
            request_timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Prompt sent for `stage`: persona, then the guarded input
    pub fn build_prompt(&self, stage: Stage, input: &str) -> String {
        let guarded = self.guard.apply(input);
        format!(
            "SYSTEM_IDENTITY:\n{}\n\nINPUT_DATA:\n{}",
            stage.persona(),
            guarded
        )
    }

    /// One backend call; never retried. Failures become [`StageOutcome::Failed`].
    pub async fn run(&self, stage: Stage, input: &str) -> StageRecord {
        let prompt = self.build_prompt(stage, input);
        let operation = format!("{} completion", stage.role());
        let start = Instant::now();

        debug!(
            "{} prompt: {} chars via {}",
            stage.role(),
            prompt.chars().count(),
            self.provider.name()
        );

        let result = with_timeout(
            self.request_timeout,
            self.provider.generate(&prompt),
            &operation,
        )
        .await;
        let duration = start.elapsed();

        match result {
            Ok(response) => {
                info!(
                    "{} finished in {:.1}s via {}/{} ({} tokens)",
                    stage.role(),
                    duration.as_secs_f64(),
                    response.metadata.provider,
                    response.metadata.model,
                    response.usage.total()
                );
                StageRecord {
                    outcome: StageOutcome::Completed {
                        stage,
                        text: response.content,
                    },
                    duration,
                    usage: response.usage,
                }
            }
            Err(err) => {
                let classified = ErrorClassifier::classify_lens_error(&err, self.provider.name());
                warn!(
                    "Agent '{}' failed [{}]: {}",
                    stage.role(),
                    classified.category,
                    err
                );
                if let Some(hint) = classified.hint() {
                    info!("{}: {}", stage.role(), hint);
                }
                StageRecord {
                    outcome: StageOutcome::Failed {
                        stage,
                        reason: err.to_string(),
                    },
                    duration,
                    usage: TokenUsage::default(),
                }
            }
        }
    }
}
