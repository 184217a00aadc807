//! HTTP front end
//!
//! Serves the chat page and accepts patient turns as typed text or a
//! recorded clip:
//! - `GET /` - embedded chat UI
//! - `POST /submit` - multipart or urlencoded form with `text_input` or `audio_input`
//! - `POST /reset` - start a new consultation
//! - `GET /health` - liveness and conversation summary
//! - `GET /metrics` - counters snapshot

pub mod form;
pub mod state;
pub mod ui;

use crate::error::TriageError;
use crate::observability::metrics::metrics;
use crate::triage::prompts::INVALID_INPUT_METHOD;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

pub use form::MalformedForm;
pub use state::{AppState, HealthStatus, Submission};

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// All routes, with rejections rendered as JSON
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::html(ui::INDEX_HTML));

    let submit = warp::path("submit")
        .and(warp::path::end())
        .and(warp::post())
        .and(form::submission(state.max_upload_bytes()))
        .and(with_state(state.clone()))
        .and_then(handle_submit);

    let reset = warp::path("reset")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(|state: Arc<AppState>| async move {
            let conversation_id = state.reset().await;
            Ok::<_, Infallible>(warp::reply::json(&json!({
                "result": "ok",
                "conversation_id": conversation_id,
            })))
        });

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(|state: Arc<AppState>| warp::reply::json(&state.health()));

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&metrics().get_metrics()));

    index
        .or(submit)
        .or(reset)
        .or(health)
        .or(metrics_route)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

async fn handle_submit(
    submission: Submission,
    state: Arc<AppState>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    match state.submit(submission).await {
        Ok(reply) => Ok(warp::reply::with_status(
            warp::reply::json(&json!({ "result": reply.text, "outcome": reply.outcome })),
            StatusCode::OK,
        )),
        Err(TriageError::InvalidInput { message }) => {
            Ok(error_reply(StatusCode::BAD_REQUEST, &message))
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Submission failed");
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.public_message(),
            ))
        }
    }
}

fn error_reply(status: StatusCode, message: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(MalformedForm(detail)) = err.find() {
        warn!(detail = %detail, "Rejected malformed submission");
        metrics().submission_rejected();
        (StatusCode::BAD_REQUEST, INVALID_INPUT_METHOD.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        metrics().submission_rejected();
        (StatusCode::PAYLOAD_TOO_LARGE, "upload too large".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some()
        || err.find::<warp::reject::MissingHeader>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::LengthRequired>().is_some()
        || err.find::<warp::body::BodyDeserializeError>().is_some()
    {
        metrics().submission_rejected();
        (StatusCode::BAD_REQUEST, INVALID_INPUT_METHOD.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        error!(rejection = ?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    };

    Ok(error_reply(status, &message))
}

/// Bind and serve until `shutdown` resolves
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), TriageError> {
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| TriageError::internal_error(format!("failed to bind {addr}: {e}")))?;

    info!(address = %bound, "Triage server listening");
    server.await;
    info!("Triage server stopped");
    Ok(())
}
