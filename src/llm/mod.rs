//! LLM provider abstraction layer
//!
//! Provider-agnostic interface for the chat completion calls that drive
//! completeness checks, follow-up questions and record generation.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
