//! Google Cloud Speech-to-Text (v1 REST, synchronous recognize)

use crate::speech::{AudioClip, SpeechError, SpeechRecognizer};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const GOOGLE_SPEECH_BASE_URL: &str = "https://speech.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct GoogleSpeechConfig {
    pub api_key: String,
    pub base_url: String,
    /// BCP-47 language code
    pub language: String,
    /// Rate assumed for headerless uploads
    pub sample_rate: u32,
    pub timeout: Duration,
}

impl Default for GoogleSpeechConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: GOOGLE_SPEECH_BASE_URL.to_string(),
            language: "zh-CN".to_string(),
            sample_rate: 16000,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct GoogleSpeechRecognizer {
    config: GoogleSpeechConfig,
    client: Client,
}

impl GoogleSpeechRecognizer {
    pub fn new(config: GoogleSpeechConfig) -> Result<Self, SpeechError> {
        if config.api_key.is_empty() {
            return Err(SpeechError::NotConfigured(
                "Google Speech API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpeechError::Request(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, clip: &AudioClip) -> RecognizeRequest {
        RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16".to_string(),
                sample_rate_hertz: clip.sample_rate,
                language_code: self.config.language.clone(),
            },
            audio: RecognitionAudio {
                content: general_purpose::STANDARD.encode(clip.to_pcm_bytes()),
            },
        }
    }

    /// Best alternative of the first result
    fn extract_transcript(response: RecognizeResponse) -> Result<String, SpeechError> {
        let transcript = response
            .results
            .into_iter()
            .next()
            .and_then(|result| result.alternatives.into_iter().next())
            .map(|alternative| alternative.transcript.trim().to_string())
            .unwrap_or_default();

        if transcript.is_empty() {
            Err(SpeechError::Unrecognized)
        } else {
            Ok(transcript)
        }
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechRecognizer {
    fn name(&self) -> &str {
        "google"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, SpeechError> {
        let clip = AudioClip::from_upload(audio, self.config.sample_rate)?;
        debug!(
            sample_rate = clip.sample_rate,
            duration_secs = clip.duration_secs(),
            "Sending clip to Google Speech"
        );

        let url = format!(
            "{}/speech:recognize",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&self.build_request(&clip))
            .send()
            .await
            .map_err(|e| {
                SpeechError::Request(format!("HTTP request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Google Speech rejected request");
            return Err(SpeechError::Request(format!("{status} - {body}")));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| {
                SpeechError::Request(format!("invalid response body: {}", e.without_url()))
            })?;

        let transcript = Self::extract_transcript(parsed)?;
        info!(transcript = %transcript, "Speech recognized");
        Ok(transcript)
    }
}

#[derive(Debug, Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: String,
    sample_rate_hertz: u32,
    language_code: String,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = GoogleSpeechRecognizer::new(GoogleSpeechConfig::default());
        assert!(matches!(result, Err(SpeechError::NotConfigured(_))));
    }

    #[test]
    fn test_request_uses_camel_case_and_base64() {
        let recognizer = GoogleSpeechRecognizer::new(GoogleSpeechConfig {
            api_key: "k".to_string(),
            ..Default::default()
        })
        .unwrap();
        let clip = AudioClip {
            samples: vec![1],
            sample_rate: 16000,
        };

        let json = serde_json::to_value(recognizer.build_request(&clip)).unwrap();
        assert_eq!(json["config"]["encoding"], "LINEAR16");
        assert_eq!(json["config"]["sampleRateHertz"], 16000);
        assert_eq!(json["config"]["languageCode"], "zh-CN");
        assert_eq!(json["audio"]["content"], "AQA=");
    }

    #[test]
    fn test_transcript_is_first_result_best_alternative() {
        let response: RecognizeResponse = serde_json::from_str(
            r#"{"results":[
                {"alternatives":[{"transcript":"我头痛","confidence":0.9},{"transcript":"我头疼"}]},
                {"alternatives":[{"transcript":"三天了"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            GoogleSpeechRecognizer::extract_transcript(response).unwrap(),
            "我头痛"
        );
    }

    #[test]
    fn test_empty_results_are_unrecognized() {
        let response: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(
            GoogleSpeechRecognizer::extract_transcript(response),
            Err(SpeechError::Unrecognized)
        );

        let response: RecognizeResponse = serde_json::from_str(
            r#"{"results":[
                {"alternatives":[]},
                {"alternatives":[{"transcript":"咳嗽"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            GoogleSpeechRecognizer::extract_transcript(response),
            Err(SpeechError::Unrecognized)
        );
    }
}
