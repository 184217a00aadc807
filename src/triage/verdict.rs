//! Parsing of the completeness judge's `flag|message` reply

use thiserror::Error;

/// Outcome of a completeness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletenessVerdict {
    pub complete: bool,
    /// Confirmation text when complete, otherwise the next question to ask
    pub message: String,
}

/// The judge answered without the `|` separator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("completeness reply has no '|' separator: {0:?}")]
pub struct MalformedVerdict(pub String);

impl CompletenessVerdict {
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self {
            complete: false,
            message: message.into(),
        }
    }

    /// Split on the first `|`; only a case-insensitive `true` flag completes.
    /// The reply is trimmed as a whole, so `True |` is not a `true` flag.
    pub fn parse(reply: &str) -> Result<Self, MalformedVerdict> {
        let trimmed = reply.trim();
        let (flag, message) = trimmed
            .split_once('|')
            .ok_or_else(|| MalformedVerdict(trimmed.to_string()))?;

        Ok(Self {
            complete: flag.eq_ignore_ascii_case("true"),
            message: message.trim().to_string(),
        })
    }
}
