//! HTTP route tests
//!
//! Exercises the warp filter tree in-process with `warp::test`, covering
//! both form encodings, speech uploads, rejections and the status routes.


use std::sync::Arc;
use test_helpers::{multipart_body, multipart_content_type, pcm_bytes, FormPart};
use triage_assistant::conversation::Conversation;
use triage_assistant::server::{routes, AppState};
use triage_assistant::speech::{SpeechError, SpeechRecognizer};
use triage_assistant::testing::{MockLlmProvider, MockSpeechRecognizer};
use triage_assistant::triage::prompts::SYSTEM_MESSAGE;
use triage_assistant::triage::{TriageEngine, TriageSettings};
use warp::http::StatusCode;

fn state_with(
    replies: &[&str],
    speech: Option<Arc<dyn SpeechRecognizer>>,
    max_upload_bytes: u64,
) -> Arc<AppState> {
    let llm = MockLlmProvider::new(replies.iter().map(|r| r.to_string()).collect());
    Arc::new(AppState::new(
        TriageEngine::new(Arc::new(llm), TriageSettings::default()),
        Conversation::shared(SYSTEM_MESSAGE),
        speech,
        max_upload_bytes,
    ))
}

fn json_body(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).expect("response should be JSON")
}

#[tokio::test]
async fn test_index_serves_chat_page() {
    let filter = routes(state_with(&[], None, 1024));

    let response = warp::test::request().method("GET").path("/").reply(&filter).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    let page = String::from_utf8(response.body().to_vec()).unwrap();
    assert!(page.contains("智能导诊助手"));
}

#[tokio::test]
async fn test_multipart_text_submission() {
    let state = state_with(&["False|问", "哪里痛？"], None, 1024 * 1024);
    let filter = routes(state.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", multipart_content_type())
        .body(multipart_body(&[FormPart::Text("text_input", "我肚子痛")]))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.body());
    assert_eq!(body["result"], "哪里痛？");
    assert_eq!(body["outcome"], "question");
    assert_eq!(state.conversation().lock().await.len(), 3);
}

#[tokio::test]
async fn test_urlencoded_text_submission() {
    let filter = routes(state_with(&["False|问", "多久了？"], None, 1024 * 1024));

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("text_input=%E5%A4%B4%E7%97%9B")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response.body())["result"], "多久了？");
}

#[tokio::test]
async fn test_patient_info_submission_gets_welcome() {
    let filter = routes(state_with(&[], None, 1024 * 1024));

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", multipart_content_type())
        .body(multipart_body(&[FormPart::Text(
            "text_input",
            "患者基本信息：\n- 性别：男\n- 年龄：60岁",
        )]))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.body());
    assert_eq!(body["outcome"], "intake");
    assert_eq!(
        body["result"],
        "感谢您提供基本信息。请详细描述您目前的主要症状和不适感。"
    );
}

#[tokio::test]
async fn test_audio_submission_is_transcribed() {
    let recognizer = Arc::new(MockSpeechRecognizer::transcript("我喉咙痛"));
    let state = state_with(&["False|问", "有发烧吗？"], Some(recognizer.clone()), 1024 * 1024);
    let filter = routes(state.clone());
    let audio = pcm_bytes(&[0, 10, -10, 0]);

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", multipart_content_type())
        .body(multipart_body(&[FormPart::File(
            "audio_input",
            "recording.wav",
            &audio,
        )]))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response.body())["result"], "有发烧吗？");
    assert_eq!(recognizer.received().await, vec![audio]);
    assert_eq!(
        state.conversation().lock().await.messages()[1].content,
        "我喉咙痛"
    );
}

#[tokio::test]
async fn test_unrecognized_audio_is_fed_as_phrase() {
    let recognizer = Arc::new(MockSpeechRecognizer::failing(SpeechError::Request(
        "timeout".to_string(),
    )));
    let state = state_with(&["False|问", "请再说一次"], Some(recognizer), 1024 * 1024);
    let filter = routes(state.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", multipart_content_type())
        .body(multipart_body(&[FormPart::File(
            "audio_input",
            "recording.wav",
            &pcm_bytes(&[1]),
        )]))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        state.conversation().lock().await.messages()[1].content,
        "请求错误"
    );
}

#[tokio::test]
async fn test_text_wins_when_both_fields_sent() {
    let recognizer = Arc::new(MockSpeechRecognizer::transcript("语音"));
    let state = state_with(&["False|问", "好的"], Some(recognizer.clone()), 1024 * 1024);
    let filter = routes(state.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", multipart_content_type())
        .body(multipart_body(&[
            FormPart::File("audio_input", "recording.wav", &pcm_bytes(&[1, 2])),
            FormPart::Text("text_input", "文字"),
        ]))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(recognizer.received().await.is_empty());
    assert_eq!(state.conversation().lock().await.messages()[1].content, "文字");
}

#[tokio::test]
async fn test_submission_without_known_fields_is_rejected() {
    let state = state_with(&[], None, 1024 * 1024);
    let filter = routes(state.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", multipart_content_type())
        .body(multipart_body(&[FormPart::Text("comment", "hello")]))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response.body())["error"], "无效的输入方式");
    assert_eq!(state.conversation().lock().await.len(), 1);
}

#[tokio::test]
async fn test_audio_without_speech_backend_is_rejected() {
    let filter = routes(state_with(&[], None, 1024 * 1024));

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", multipart_content_type())
        .body(multipart_body(&[FormPart::File(
            "audio_input",
            "recording.wav",
            &pcm_bytes(&[1, 2]),
        )]))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response.body())["error"], "语音识别未启用");
}

#[tokio::test]
async fn test_json_body_is_rejected_as_invalid_input() {
    let filter = routes(state_with(&[], None, 1024 * 1024));

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", "application/json")
        .body(r#"{"text_input":"头痛"}"#)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response.body())["error"], "无效的输入方式");
}

#[tokio::test]
async fn test_oversized_urlencoded_body_is_rejected() {
    let filter = routes(state_with(&[], None, 16));

    let response = warp::test::request()
        .method("POST")
        .path("/submit")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!("text_input={}", "a".repeat(64)))
        .reply(&filter)
        .await;

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_reset_clears_conversation() {
    let state = state_with(&[], None, 1024);
    state.conversation().lock().await.push_user("旧的对话");
    let filter = routes(state.clone());

    let response = warp::test::request()
        .method("POST")
        .path("/reset")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.body());
    assert_eq!(body["result"], "ok");
    let conversation = state.conversation().lock().await;
    assert_eq!(conversation.len(), 1);
    assert_eq!(body["conversation_id"], conversation.id().to_string());
}

#[tokio::test]
async fn test_health_reports_conversation_state() {
    let filter = routes(state_with(&[], None, 1024));

    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.body());
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "triage-assistant");
    assert_eq!(body["llm_provider"], "mock");
    assert_eq!(body["message_count"], 1);
    assert_eq!(body["busy"], false);
    assert!(body["speech_provider"].is_null());
}

#[tokio::test]
async fn test_metrics_route_returns_snapshot() {
    let filter = routes(state_with(&[], None, 1024));

    let response = warp::test::request()
        .method("GET")
        .path("/metrics")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.body());
    assert!(body["submissions"]["text"].is_u64());
    assert!(body["llm"]["completeness_checks"].is_u64());
    assert!(body["consultations"]["completed"].is_u64());
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let filter = routes(state_with(&[], None, 1024));

    let response = warp::test::request()
        .method("GET")
        .path("/nope")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_submit_is_method_not_allowed() {
    let filter = routes(state_with(&[], None, 1024));

    let response = warp::test::request()
        .method("GET")
        .path("/submit")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
