//! Mock implementations for testing
//!
//! Scripted LLM and speech backends so consultation flows and HTTP routes
//! can be exercised without network access.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
};
use crate::speech::{SpeechError, SpeechRecognizer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock LLM provider replaying scripted replies in order
#[derive(Debug)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub received_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            current_response: Arc::new(Mutex::new(0)),
            received_requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::new(vec![])
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Every request seen so far, in call order
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.received_requests.lock().await.clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.received_requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let response_idx = *current % self.responses.len().max(1);
        *current += 1;

        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[response_idx].clone()
        };

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
            metadata: HashMap::new(),
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Mock recognizer returning a fixed transcript or error
#[derive(Debug)]
pub struct MockSpeechRecognizer {
    pub result: Result<String, SpeechError>,
    pub received_audio: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockSpeechRecognizer {
    pub fn transcript(text: impl Into<String>) -> Self {
        Self {
            result: Ok(text.into()),
            received_audio: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(error: SpeechError) -> Self {
        Self {
            result: Err(error),
            received_audio: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn received(&self) -> Vec<Vec<u8>> {
        self.received_audio.lock().await.clone()
    }
}

#[async_trait]
impl SpeechRecognizer for MockSpeechRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, SpeechError> {
        self.received_audio.lock().await.push(audio.to_vec());
        self.result.clone()
    }
}
