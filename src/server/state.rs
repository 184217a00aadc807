//! Request-independent service state and the submission pipeline

use crate::conversation::SharedConversation;
use crate::error::{sanitize_error_message, TriageError, TriageResult};
use crate::observability::metrics::metrics;
use crate::speech::SpeechRecognizer;
use crate::triage::prompts::{INVALID_INPUT_METHOD, SPEECH_DISABLED};
use crate::triage::{TriageEngine, TriageReply};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Fields of a `/submit` form; typed text wins over audio
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Submission {
    pub text_input: Option<String>,
    pub audio_input: Option<Vec<u8>>,
}

pub struct AppState {
    engine: TriageEngine,
    conversation: SharedConversation,
    speech: Option<Arc<dyn SpeechRecognizer>>,
    max_upload_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub llm_provider: String,
    pub speech_provider: Option<String>,
    /// `None` while a turn holds the conversation
    pub conversation_id: Option<Uuid>,
    pub conversation_started_at: Option<DateTime<Utc>>,
    pub message_count: Option<usize>,
    pub busy: bool,
    pub uptime_seconds: u64,
}

impl AppState {
    pub fn new(
        engine: TriageEngine,
        conversation: SharedConversation,
        speech: Option<Arc<dyn SpeechRecognizer>>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            engine,
            conversation,
            speech,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn conversation(&self) -> &SharedConversation {
        &self.conversation
    }

    /// Turn a submission into the assistant's reply
    pub async fn submit(&self, submission: Submission) -> TriageResult<TriageReply> {
        let query = match submission {
            Submission {
                text_input: Some(text),
                ..
            } => {
                metrics().text_submitted();
                text
            }
            Submission {
                audio_input: Some(audio),
                ..
            } => {
                metrics().audio_submitted();
                self.transcribe(&audio).await?
            }
            _ => {
                metrics().submission_rejected();
                return Err(TriageError::invalid_input(INVALID_INPUT_METHOD));
            }
        };

        let mut conversation = self.conversation.lock().await;
        Ok(self.engine.respond(&mut conversation, &query).await)
    }

    /// Recognition failures become the phrase the patient sees echoed back
    async fn transcribe(&self, audio: &[u8]) -> TriageResult<String> {
        let Some(recognizer) = &self.speech else {
            metrics().submission_rejected();
            return Err(TriageError::invalid_input(SPEECH_DISABLED));
        };

        match recognizer.transcribe(audio).await {
            Ok(text) => {
                metrics().transcription_succeeded();
                Ok(text)
            }
            Err(e) => {
                metrics().transcription_failed();
                warn!(
                    recognizer = recognizer.name(),
                    error = %sanitize_error_message(&e.to_string()),
                    "Speech recognition failed"
                );
                Ok(e.user_phrase().to_string())
            }
        }
    }

    /// Abandon the current consultation
    pub async fn reset(&self) -> Uuid {
        let mut conversation = self.conversation.lock().await;
        let previous = conversation.id();
        conversation.reset();
        metrics().consultation_reset();
        info!(
            previous_conversation = %previous,
            conversation_id = %conversation.id(),
            "Consultation reset"
        );
        conversation.id()
    }

    pub fn health(&self) -> HealthStatus {
        let snapshot = self
            .conversation
            .try_lock()
            .ok()
            .map(|conversation| {
                (
                    conversation.id(),
                    conversation.started_at(),
                    conversation.len(),
                )
            });

        HealthStatus {
            status: "healthy",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            llm_provider: self.engine.provider_name().to_string(),
            speech_provider: self.speech.as_ref().map(|s| s.name().to_string()),
            conversation_id: snapshot.map(|(id, _, _)| id),
            conversation_started_at: snapshot.map(|(_, started_at, _)| started_at),
            message_count: snapshot.map(|(_, _, len)| len),
            busy: snapshot.is_none(),
            uptime_seconds: metrics().uptime_seconds(),
        }
    }
}
