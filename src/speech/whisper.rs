//! OpenAI-compatible `/audio/transcriptions` backend
//!
//! Works with hosted Whisper and with self-hosted STT routers exposing the
//! same multipart endpoint.

use crate::speech::{AudioClip, SpeechError, SpeechRecognizer};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// BCP-47 code; only the primary subtag is sent
    pub language: String,
    pub sample_rate: u32,
    pub timeout: Duration,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
            language: "zh-CN".to_string(),
            sample_rate: 16000,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct WhisperRecognizer {
    config: WhisperConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl WhisperRecognizer {
    pub fn new(config: WhisperConfig) -> Result<Self, SpeechError> {
        if config.api_key.is_empty() {
            return Err(SpeechError::NotConfigured(
                "transcription API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpeechError::Request(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// "zh-CN" -> "zh"
    fn iso_language(&self) -> String {
        self.config
            .language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, SpeechError> {
        let clip = AudioClip::from_upload(audio, self.config.sample_rate)?;
        let wav = clip.to_wav_bytes()?;
        debug!(
            bytes = wav.len(),
            duration_secs = clip.duration_secs(),
            "Uploading clip for transcription"
        );

        let file_part = Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| SpeechError::Request(e.to_string()))?;
        let form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("language", self.iso_language())
            .text("response_format", "json");

        let url = format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                SpeechError::Request(format!("HTTP request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Transcription service rejected request");
            return Err(SpeechError::Request(format!("{status} - {body}")));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| {
                SpeechError::Request(format!("invalid response body: {}", e.without_url()))
            })?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(SpeechError::Unrecognized);
        }
        info!(transcript = %text, "Speech recognized");
        Ok(text)
    }
}
