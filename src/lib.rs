//! Triage Assistant
//!
//! A web medical triage chatbot. Patients describe their symptoms by text
//! or voice, a chat model asks follow-up questions until the history is
//! complete, then writes a structured medical record.
//!
//! # Overview
//!
//! - [`conversation`]: the single shared consultation history
//! - [`triage`]: prompts, completeness verdicts and the turn engine
//! - [`llm`]: OpenAI-compatible chat completion client (Moonshot by default)
//! - [`speech`]: speech-to-text backends for recorded clips
//! - [`server`]: warp routes and the embedded browser client
//! - [`config`], [`error`], [`observability`]: ambient plumbing
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use triage_assistant::conversation::Conversation;
//! use triage_assistant::testing::MockLlmProvider;
//! use triage_assistant::triage::{prompts, TriageEngine, TriageOutcome, TriageSettings};
//!
//! # tokio_test::block_on(async {
//! let llm = MockLlmProvider::new(vec!["False|缺少病程".into(), "症状持续多久了？".into()]);
//! let engine = TriageEngine::new(Arc::new(llm), TriageSettings::default());
//! let mut conversation = Conversation::new(prompts::SYSTEM_MESSAGE);
//!
//! let reply = engine.respond(&mut conversation, "我头痛").await;
//! assert_eq!(reply.outcome, TriageOutcome::Question);
//! assert_eq!(reply.text, "症状持续多久了？");
//! # });
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod observability;
pub mod server;
pub mod speech;
pub mod testing;
pub mod triage;

pub use config::TriageConfig;
pub use conversation::{Conversation, SharedConversation};
pub use error::{TriageError, TriageResult};
pub use server::AppState;
pub use triage::{TriageEngine, TriageOutcome, TriageReply, TriageSettings};
