//! Stage results and how failures travel downstream.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::stage::Stage;
use crate::ai::TokenUsage;

/// How a failed stage's output reaches the stages that depend on it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Downstream inputs receive the failure text verbatim
    #[default]
    Forward,
    /// Downstream inputs receive a short "output unavailable" notice
    Substitute,
}

/// Result of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed { stage: Stage, text: String },
    Failed { stage: Stage, reason: String },
}

impl StageOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Completed { stage, .. } | Self::Failed { stage, .. } => *stage,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Displayable text: the response, or the failure message
    pub fn text(&self) -> String {
        match self {
            Self::Completed { text, .. } => text.clone(),
            Self::Failed { stage, reason } => format!(
                "Error: Agent '{}' failed to process data. Reason: {}",
                stage.role(),
                reason
            ),
        }
    }

    /// Text handed to dependent stages under `policy`
    pub fn forwarded_text(&self, policy: FailurePolicy) -> String {
        match (self, policy) {
            (Self::Failed { stage, .. }, FailurePolicy::Substitute) => {
                format!("[{} output unavailable]", stage.role())
            }
            _ => self.text(),
        }
    }
}

/// A stage outcome with its cost
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub outcome: StageOutcome,
    pub duration: Duration,
    pub usage: TokenUsage,
}
