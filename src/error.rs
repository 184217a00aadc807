//! Error types for the triage service
//!
//! Layer-specific errors (`ConfigError`, `LlmError`, `SpeechError`) convert
//! into `TriageError`. Anything that leaves the process as JSON goes through
//! [`sanitize_error_message`] first.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Main error type for triage operations
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("LLM provider error: {0}")]
    Llm(#[from] crate::llm::provider::LlmError),

    #[error("Speech recognition error: {0}")]
    Speech(#[from] crate::speech::SpeechError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl TriageError {
    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Short machine-readable category for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::Llm(_) => "llm",
            TriageError::Speech(_) => "speech",
            TriageError::Config(_) => "config",
            TriageError::InvalidInput { .. } => "invalid_input",
            TriageError::InternalError { .. } => "internal",
        }
    }

    /// Error text safe to return to a browser
    pub fn public_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Redact credentials and sensitive paths, then cap the length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN.replace_all(message, "${1}=***").to_string();
    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_ERROR_MESSAGE_LEN - truncate_suffix.len();
        // Chinese model output is multi-byte; never split a character
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for triage operations
pub type TriageResult<T> = Result<T, TriageError>;
