//! Session records: what happened across the attempts of one request.
//!
//! Sessions are the unit handed to [`sinks`](crate::sinks) for recording
//! and the source of the caller-facing [`GenerationResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flow::CampaignFlow;
use crate::validation::ValidationReport;

/// Terminal disposition of a generation session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// A valid flow meeting the grade floor was produced.
    Ready,
    /// Attempts ran out; the best parsed flow ships with its defects listed.
    Partial,
    /// No attempt ever produced a parseable flow.
    Failed,
}

/// Everything recorded about one attempt, success or not.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationAttempt {
    /// 1-based.
    pub number: u32,
    pub started_at: DateTime<Utc>,
    /// The fully rendered prompt sent for this attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Raw model output; `None` when transport failed before a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    pub parse_succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ValidationReport>,
    /// Human-readable description of the local failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Whether the auto-corrector changed the flow during this attempt.
    pub corrected: bool,
}

impl GenerationAttempt {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            started_at: Utc::now(),
            prompt: None,
            raw_output: None,
            parse_succeeded: false,
            report: None,
            failure: None,
            corrected: false,
        }
    }
}

/// Full record of one generation request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationSession {
    pub id: Uuid,
    pub description: String,
    pub template_hints: Vec<String>,
    pub attempts: Vec<GenerationAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_flow: Option<CampaignFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_report: Option<ValidationReport>,
    pub status: SessionStatus,
}

impl GenerationSession {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            template_hints: Vec::new(),
            attempts: Vec::new(),
            final_flow: None,
            final_report: None,
            status: SessionStatus::Failed,
        }
    }
}

/// Caller-facing summary numbers for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub attempts: u32,
    pub duration_ms: u64,
    pub template_hits: usize,
    pub corrected: bool,
}

/// What the engine returns to its caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_flow: Option<CampaignFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    pub status: SessionStatus,
    pub metadata: GenerationMetadata,
}

impl GenerationResult {
    /// `true` for any outcome that carries a usable flow.
    #[must_use]
    pub fn has_flow(&self) -> bool {
        self.campaign_flow.is_some()
    }
}
