//! Triage consultation logic
//!
//! Prompt templates, completeness verdict parsing, record post-processing
//! and the engine that ties them to an LLM provider.

pub mod engine;
pub mod prompts;
pub mod record;
pub mod verdict;

pub use engine::{TriageEngine, TriageOutcome, TriageReply, TriageSettings};
pub use verdict::CompletenessVerdict;
