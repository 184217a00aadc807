//! Speech transcription adapter
//!
//! Recorded clips from the browser are forwarded to a cloud recognizer and
//! the resulting text enters the consultation exactly like typed input.

pub mod audio;
pub mod google;
pub mod whisper;

use crate::config::{SpeechProviderKind, SpeechSection};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use audio::AudioClip;
pub use google::{GoogleSpeechConfig, GoogleSpeechRecognizer};
pub use whisper::{WhisperConfig, WhisperRecognizer};

/// Speech recognition errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech recognizer not configured: {0}")]
    NotConfigured(String),
    #[error("Unsupported audio: {0}")]
    Audio(String),
    #[error("Speech service request failed: {0}")]
    Request(String),
    #[error("Speech could not be recognized")]
    Unrecognized,
}

impl SpeechError {
    /// Phrase that stands in for the transcript when recognition fails
    pub fn user_phrase(&self) -> &'static str {
        match self {
            SpeechError::Unrecognized | SpeechError::Audio(_) => {
                crate::triage::prompts::SPEECH_UNRECOGNIZED
            }
            SpeechError::NotConfigured(_) | SpeechError::Request(_) => {
                crate::triage::prompts::SPEECH_REQUEST_FAILED
            }
        }
    }
}

/// Cloud speech-to-text backend
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Transcribe an uploaded clip (WAV or raw 16-bit PCM)
    async fn transcribe(&self, audio: &[u8]) -> Result<String, SpeechError>;
}

/// Build the recognizer selected by the `[speech]` section
pub fn build_recognizer(
    section: &SpeechSection,
    api_key: String,
) -> Result<Arc<dyn SpeechRecognizer>, SpeechError> {
    let timeout = Duration::from_secs(section.timeout_secs);

    match section.provider {
        SpeechProviderKind::Google => {
            let mut config = GoogleSpeechConfig {
                api_key,
                language: section.language.clone(),
                sample_rate: section.sample_rate,
                timeout,
                ..Default::default()
            };
            if let Some(base_url) = &section.base_url {
                config.base_url = base_url.clone();
            }
            Ok(Arc::new(GoogleSpeechRecognizer::new(config)?))
        }
        SpeechProviderKind::Whisper => {
            let base_url = section.base_url.clone().ok_or_else(|| {
                SpeechError::NotConfigured("whisper backend needs a base_url".to_string())
            })?;
            let mut config = WhisperConfig {
                api_key,
                base_url,
                language: section.language.clone(),
                sample_rate: section.sample_rate,
                timeout,
                ..Default::default()
            };
            if let Some(model) = &section.model {
                config.model = model.clone();
            }
            Ok(Arc::new(WhisperRecognizer::new(config)?))
        }
    }
}
