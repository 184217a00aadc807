//! Thread-safe metrics collection
//!
//! Atomic counters for submissions, transcription and model calls, shared
//! process-wide and exported as JSON by the `/metrics` route.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

pub struct MetricsCollector {
    started_at: u64,

    text_submissions: AtomicU64,
    audio_submissions: AtomicU64,
    rejected_submissions: AtomicU64,

    transcriptions_succeeded: AtomicU64,
    transcriptions_failed: AtomicU64,

    completeness_checks: AtomicU64,
    questions_asked: AtomicU64,
    records_generated: AtomicU64,
    llm_failures: AtomicU64,

    consultations_completed: AtomicU64,
    consultations_reset: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub submissions: SubmissionMetrics,
    pub speech: SpeechMetrics,
    pub llm: LlmMetrics,
    pub consultations: ConsultationMetrics,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmissionMetrics {
    pub text: u64,
    pub audio: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpeechMetrics {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LlmMetrics {
    pub completeness_checks: u64,
    pub questions_asked: u64,
    pub records_generated: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConsultationMetrics {
    pub completed: u64,
    pub reset: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started_at: current_timestamp(),
            text_submissions: AtomicU64::new(0),
            audio_submissions: AtomicU64::new(0),
            rejected_submissions: AtomicU64::new(0),
            transcriptions_succeeded: AtomicU64::new(0),
            transcriptions_failed: AtomicU64::new(0),
            completeness_checks: AtomicU64::new(0),
            questions_asked: AtomicU64::new(0),
            records_generated: AtomicU64::new(0),
            llm_failures: AtomicU64::new(0),
            consultations_completed: AtomicU64::new(0),
            consultations_reset: AtomicU64::new(0),
        }
    }

    pub fn text_submitted(&self) {
        self.text_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn audio_submitted(&self) {
        self.audio_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submission_rejected(&self) {
        self.rejected_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transcription_succeeded(&self) {
        self.transcriptions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transcription_failed(&self) {
        self.transcriptions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completeness_checked(&self) {
        self.completeness_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn question_asked(&self) {
        self.questions_asked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generated(&self) {
        self.records_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn llm_call_failed(&self) {
        self.llm_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn consultation_completed(&self) {
        self.consultations_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn consultation_reset(&self) {
        self.consultations_reset.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        current_timestamp().saturating_sub(self.started_at)
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            submissions: SubmissionMetrics {
                text: self.text_submissions.load(Ordering::Relaxed),
                audio: self.audio_submissions.load(Ordering::Relaxed),
                rejected: self.rejected_submissions.load(Ordering::Relaxed),
            },
            speech: SpeechMetrics {
                succeeded: self.transcriptions_succeeded.load(Ordering::Relaxed),
                failed: self.transcriptions_failed.load(Ordering::Relaxed),
            },
            llm: LlmMetrics {
                completeness_checks: self.completeness_checks.load(Ordering::Relaxed),
                questions_asked: self.questions_asked.load(Ordering::Relaxed),
                records_generated: self.records_generated.load(Ordering::Relaxed),
                failures: self.llm_failures.load(Ordering::Relaxed),
            },
            consultations: ConsultationMetrics {
                completed: self.consultations_completed.load(Ordering::Relaxed),
                reset: self.consultations_reset.load(Ordering::Relaxed),
            },
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
