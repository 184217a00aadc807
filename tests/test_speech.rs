//! Integration tests for the speech backends
//!
//! Each recognizer is pointed at a mock server and checked for the wire
//! format it sends and how it maps service replies to transcripts or
//! errors.


use std::time::Duration;
use test_helpers::{pcm_bytes, wav_bytes};
use triage_assistant::config::{SpeechProviderKind, SpeechSection};
use triage_assistant::speech::{
    build_recognizer, GoogleSpeechConfig, GoogleSpeechRecognizer, SpeechError, SpeechRecognizer,
    WhisperConfig, WhisperRecognizer,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Byte-level body search; multipart WAV uploads are not valid UTF-8
struct BodyContainsBytes(&'static [u8]);

impl Match for BodyContainsBytes {
    fn matches(&self, request: &Request) -> bool {
        request
            .body
            .windows(self.0.len())
            .any(|window| window == self.0)
    }
}

fn google(base_url: &str) -> GoogleSpeechRecognizer {
    GoogleSpeechRecognizer::new(GoogleSpeechConfig {
        api_key: "speech-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

fn whisper(base_url: &str) -> WhisperRecognizer {
    WhisperRecognizer::new(WhisperConfig {
        api_key: "stt-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_google_recognizes_wav_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech:recognize"))
        .and(query_param("key", "speech-key"))
        .and(body_partial_json(serde_json::json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": 8000,
                "languageCode": "zh-CN"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                { "alternatives": [{ "transcript": "我发烧两天", "confidence": 0.93 }] },
                { "alternatives": [{ "transcript": "了" }] }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let recognizer = google(&mock_server.uri());
    let transcript = recognizer
        .transcribe(&wav_bytes(&[0, 120, -120, 0], 8000, 1))
        .await
        .unwrap();

    assert_eq!(transcript, "我发烧两天");
}

#[tokio::test]
async fn test_google_transport_error_does_not_expose_api_key() {
    let recognizer = GoogleSpeechRecognizer::new(GoogleSpeechConfig {
        api_key: "SUPERSECRETKEY123".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap();

    let err = recognizer.transcribe(&pcm_bytes(&[1, 2, 3])).await.unwrap_err();

    assert!(matches!(err, SpeechError::Request(_)));
    assert!(!err.to_string().contains("SUPERSECRETKEY123"), "leaked: {err}");
    assert_eq!(err.user_phrase(), "请求错误");
}

#[tokio::test]
async fn test_google_raw_pcm_uses_configured_rate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech:recognize"))
        .and(body_partial_json(serde_json::json!({
            "config": { "sampleRateHertz": 16000 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{ "alternatives": [{ "transcript": "咳嗽" }] }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let recognizer = google(&mock_server.uri());
    let transcript = recognizer.transcribe(&pcm_bytes(&[1, 2, 3])).await.unwrap();
    assert_eq!(transcript, "咳嗽");
}

#[tokio::test]
async fn test_google_empty_result_is_unrecognized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech:recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&mock_server)
        .await;

    let recognizer = google(&mock_server.uri());
    let result = recognizer.transcribe(&pcm_bytes(&[0; 16])).await;

    assert_eq!(result, Err(SpeechError::Unrecognized));
    assert_eq!(SpeechError::Unrecognized.user_phrase(), "无法识别语音");
}

#[tokio::test]
async fn test_google_service_error_is_request_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech:recognize"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&mock_server)
        .await;

    let recognizer = google(&mock_server.uri());
    let err = recognizer.transcribe(&pcm_bytes(&[0; 4])).await.unwrap_err();

    assert!(matches!(err, SpeechError::Request(ref msg) if msg.contains("403")));
    assert_eq!(err.user_phrase(), "请求错误");
}

#[tokio::test]
async fn test_garbage_audio_never_reaches_the_service() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let recognizer = google(&mock_server.uri());
    let err = recognizer.transcribe(&[1, 2, 3]).await.unwrap_err();

    assert!(matches!(err, SpeechError::Audio(_)));
    assert_eq!(err.user_phrase(), "无法识别语音");
}

#[tokio::test]
async fn test_whisper_uploads_multipart_wav() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(header("Authorization", "Bearer stt-key"))
        .and(BodyContainsBytes(b"filename=\"recording.wav\""))
        .and(BodyContainsBytes(b"whisper-1"))
        .and(BodyContainsBytes(b"RIFF"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": " 胸口闷 " })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let recognizer = whisper(&mock_server.uri());
    let transcript = recognizer.transcribe(&pcm_bytes(&[5, -5, 5, -5])).await.unwrap();

    assert_eq!(transcript, "胸口闷");
}

#[tokio::test]
async fn test_whisper_blank_text_is_unrecognized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "  " })))
        .mount(&mock_server)
        .await;

    let recognizer = whisper(&mock_server.uri());
    let result = recognizer.transcribe(&pcm_bytes(&[0, 0])).await;
    assert_eq!(result, Err(SpeechError::Unrecognized));
}

#[tokio::test]
async fn test_whisper_server_error_is_request_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model unavailable"))
        .mount(&mock_server)
        .await;

    let recognizer = whisper(&mock_server.uri());
    let result = recognizer.transcribe(&pcm_bytes(&[0, 0])).await;
    assert!(matches!(result, Err(SpeechError::Request(_))));
}

#[tokio::test]
async fn test_build_recognizer_honours_base_url_override() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/speech:recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{ "alternatives": [{ "transcript": "头晕" }] }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let section = SpeechSection {
        enabled: true,
        provider: SpeechProviderKind::Google,
        api_key_env: "UNUSED".to_string(),
        base_url: Some(mock_server.uri()),
        language: "zh-CN".to_string(),
        model: None,
        sample_rate: 16000,
        timeout_secs: 5,
    };

    let recognizer = build_recognizer(&section, "k".to_string()).unwrap();
    assert_eq!(recognizer.name(), "google");
    assert_eq!(recognizer.transcribe(&pcm_bytes(&[7, 7])).await.unwrap(), "头晕");
}
