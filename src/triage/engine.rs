//! Consultation turn processing
//!
//! Each patient message goes through the same sequence: record it, ask the
//! completeness judge, then either write the medical record and close the
//! consultation or ask the model for the next follow-up question.

use crate::config::{PromptTemperatures, TriageConfig};
use crate::conversation::Conversation;
use crate::error::TriageResult;
use crate::llm::provider::{CompletionRequest, LlmError, LlmProvider};
use crate::observability::metrics::metrics;
use crate::triage::prompts::{self, PATIENT_INFO_MARKER};
use crate::triage::record::html_to_markdown;
use crate::triage::verdict::CompletenessVerdict;
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tunables of the consultation flow
#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub model: String,
    pub temperatures: PromptTemperatures,
    pub min_messages: usize,
}

impl From<&TriageConfig> for TriageSettings {
    fn from(config: &TriageConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperatures: config.llm.temperatures,
            min_messages: config.triage.min_messages,
        }
    }
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            model: "moonshot-v1-8k".to_string(),
            temperatures: PromptTemperatures::default(),
            min_messages: 10,
        }
    }
}

/// What a turn did to the consultation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageOutcome {
    /// Demographics recorded, patient asked for symptoms
    Intake,
    /// A follow-up question was asked
    Question,
    /// The record was written and the conversation reset
    Completed,
    /// The follow-up question could not be produced
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageReply {
    pub text: String,
    pub outcome: TriageOutcome,
}

impl TriageReply {
    fn new(text: impl Into<String>, outcome: TriageOutcome) -> Self {
        Self {
            text: text.into(),
            outcome,
        }
    }
}

pub struct TriageEngine {
    llm: Arc<dyn LlmProvider>,
    settings: TriageSettings,
}

impl TriageEngine {
    pub fn new(llm: Arc<dyn LlmProvider>, settings: TriageSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> &TriageSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.llm.name()
    }

    /// Process one patient message against the conversation
    ///
    /// Never fails: model errors degrade into the canned replies the
    /// patient would otherwise see as a broken page.
    #[tracing::instrument(
        name = "triage_turn",
        skip_all,
        fields(conversation_id = %conversation.id(), message_count = conversation.len())
    )]
    pub async fn respond(&self, conversation: &mut Conversation, query: &str) -> TriageReply {
        if query.contains(PATIENT_INFO_MARKER) {
            conversation.push_user(query);
            conversation.push_assistant(prompts::WELCOME_MESSAGE);
            info!(outcome = "intake", "Patient demographics recorded");
            return TriageReply::new(prompts::WELCOME_MESSAGE, TriageOutcome::Intake);
        }

        conversation.push_user(query);
        let transcript = conversation.transcript();
        let verdict = self.check_completeness(&transcript).await;

        if verdict.complete && conversation.len() >= self.settings.min_messages {
            let visit_time = Local::now().format("%Y-%m-%d %H:%M").to_string();
            let record = self.generate_record(&transcript, &visit_time).await;
            let result = prompts::completion_message(&record);
            conversation.push_assistant(result.clone());

            info!(
                outcome = "completed",
                messages = conversation.len(),
                user_turns = conversation.user_turns(),
                "Consultation finished, medical record generated"
            );
            conversation.reset();
            metrics().consultation_completed();
            return TriageReply::new(result, TriageOutcome::Completed);
        }

        if verdict.complete {
            debug!(
                messages = conversation.len(),
                min_messages = self.settings.min_messages,
                "Judge reported complete before minimum length, continuing"
            );
        }

        match self.next_question(&transcript).await {
            Ok(question) => {
                conversation.push_assistant(question.clone());
                info!(outcome = "question", question = %question, "Follow-up question asked");
                TriageReply::new(question, TriageOutcome::Question)
            }
            Err(e) => {
                error!(error = %e, "Failed to generate follow-up question");
                TriageReply::new(prompts::APOLOGY_MESSAGE, TriageOutcome::Failed)
            }
        }
    }

    /// Ask the judge whether enough has been collected
    pub async fn check_completeness(&self, transcript: &str) -> CompletenessVerdict {
        metrics().completeness_checked();
        let reply = self
            .ask(
                "completeness",
                prompts::COMPLETENESS_PROMPT,
                prompts::completeness_user_prompt(transcript),
                self.settings.temperatures.completeness,
            )
            .await;

        let parsed = reply.map_err(|e| e.to_string()).and_then(|text| {
            CompletenessVerdict::parse(&text).map_err(|e| e.to_string())
        });

        match parsed {
            Ok(verdict) => {
                debug!(
                    complete = verdict.complete,
                    message = %verdict.message,
                    "Completeness verdict"
                );
                verdict
            }
            Err(e) => {
                error!(error = %e, "Completeness check failed, falling back");
                CompletenessVerdict::incomplete(prompts::FALLBACK_QUESTION)
            }
        }
    }

    /// Generate the next follow-up question
    pub async fn next_question(&self, transcript: &str) -> TriageResult<String> {
        let question = self
            .ask(
                "next_question",
                prompts::NEXT_QUESTION_PROMPT,
                prompts::next_question_user_prompt(transcript),
                self.settings.temperatures.question,
            )
            .await?;
        metrics().question_asked();
        Ok(question)
    }

    /// Write the outpatient record, or the placeholder when the model fails
    pub async fn generate_record(&self, transcript: &str, visit_time: &str) -> String {
        let reply = self
            .ask(
                "record",
                prompts::RECORD_PROMPT,
                prompts::record_user_prompt(transcript, visit_time),
                self.settings.temperatures.record,
            )
            .await;

        match reply {
            Ok(record) => {
                metrics().record_generated();
                html_to_markdown(&record)
            }
            Err(e) => {
                error!(error = %e, "Failed to generate medical record");
                prompts::RECORD_UNAVAILABLE.to_string()
            }
        }
    }

    async fn ask(
        &self,
        prompt_name: &str,
        system_prompt: &str,
        user_prompt: String,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest::from_prompts(
            self.settings.model.clone(),
            system_prompt,
            user_prompt,
            temperature,
        )
        .with_metadata("prompt", prompt_name);

        let response = self.llm.complete(request).await.map_err(|e| {
            metrics().llm_call_failed();
            warn!(prompt = prompt_name, provider = self.llm.name(), error = %e, "LLM call failed");
            e
        })?;

        response.text().map(|text| text.to_string()).map_err(|e| {
            metrics().llm_call_failed();
            e
        })
    }
}
