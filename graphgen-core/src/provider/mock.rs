//! Provider that replays canned replies

use super::*;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Replays queued replies in order and records every prompt it receives.
///
/// When the queue runs dry it answers with the fallback reply if one is set,
/// otherwise with an error.
#[derive(Debug, Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every prompt with the same text
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        lock(&self.replies).push_back(Ok(reply.into()));
        self
    }

    pub fn with_error(self, err: ProviderError) -> Self {
        lock(&self.replies).push_back(Err(err));
        self
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn models(&self) -> Vec<String> {
        vec!["mock".into()]
    }

    fn default_model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let prompt = request.last_user_text().unwrap_or_default().to_string();
        lock(&self.prompts).push(prompt);

        let reply = match lock(&self.replies).pop_front() {
            Some(reply) => reply?,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| ProviderError::Other("mock provider has no reply queued".into()))?,
        };

        Ok(CompletionResponse {
            id: format!("mock-{}", self.call_count()),
            model: request.model.unwrap_or_else(|| "mock".into()),
            content: Some(reply),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        })
    }
}
