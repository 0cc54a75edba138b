//! Scripted in-process provider for pipeline tests.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{LlmProvider, LlmResponse, TokenUsage};
use crate::types::{LensError, Result};

#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Every call fails with this message
    Fail(String),
    /// Returns the prompt unchanged
    Echo,
    /// Returns `"{tag}#{n}"` where n is the 1-based call number
    Numbered(String),
    /// Sleeps before echoing
    Slow(Duration),
}

/// Provider that records prompts and answers according to a [`StubBehavior`]
pub struct StubProvider {
    behavior: StubBehavior,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new(behavior: StubBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(StubBehavior::Fail(message.to_string()))
    }

    pub fn echo() -> Arc<Self> {
        Self::new(StubBehavior::Echo)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        let content = match &self.behavior {
            StubBehavior::Fail(message) => return Err(LensError::LlmApi(message.clone())),
            StubBehavior::Echo => prompt.to_string(),
            StubBehavior::Numbered(tag) => format!("{}#{}", tag, n),
            StubBehavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                prompt.to_string()
            }
        };

        let mut response = LlmResponse::content_only(content);
        response.usage = TokenUsage {
            input_tokens: 1,
            output_tokens: 1,
        };
        response.metadata.provider = "stub".to_string();
        response.metadata.model = "stub-model".to_string();
        Ok(response)
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}
