//! The per-request state machine: request, parse, validate, correct,
//! regenerate, finalize.
//!
//! One orchestrator instance serves exactly one request and owns no shared
//! state, so concurrent requests cannot interfere. Local failures (timeouts,
//! unparseable output, validation errors) are recorded on the attempt and
//! converted into feedback for the next one; only an empty description is
//! refused outright.

use miette::Diagnostic;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::client::{GenerationClient, PromptContext, TransportError};
use super::config::EngineConfig;
use super::parser::parse_flow;
use super::prompts::{feedback_lines, render_prompt};
use super::session::{
    GenerationAttempt, GenerationMetadata, GenerationResult, GenerationSession, SessionStatus,
};
use super::templates::TemplateSearch;
use crate::flow::CampaignFlow;
use crate::validation::{FlowOptions, ValidationReport, corrector, validate_flow_concurrent};

/// Requests the engine refuses without attempting generation.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("campaign description is empty")]
    #[diagnostic(
        code(flowsmith::engine::empty_description),
        help("Provide a short prose description of the campaign to generate.")
    )]
    EmptyDescription,
}

/// Where the state machine currently is; used for structured logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Init,
    Requesting,
    Parsing,
    Validating,
    Correcting,
    Regenerating,
    Finalizing,
}

/// Best candidate seen so far: fewest errors wins, score breaks ties.
struct Candidate {
    flow: CampaignFlow,
    report: ValidationReport,
}

impl Candidate {
    fn rank(&self) -> (usize, std::cmp::Reverse<u8>) {
        (
            self.report.error_count(),
            std::cmp::Reverse(self.report.quality_score),
        )
    }
}

pub struct Orchestrator<'a> {
    client: &'a dyn GenerationClient,
    templates: &'a dyn TemplateSearch,
    config: &'a EngineConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        client: &'a dyn GenerationClient,
        templates: &'a dyn TemplateSearch,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            client,
            templates,
            config,
        }
    }

    /// Drive one request to a terminal status.
    pub async fn run(
        &self,
        description: &str,
    ) -> Result<(GenerationSession, GenerationResult), EngineError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(EngineError::EmptyDescription);
        }

        let started = Instant::now();
        let mut session = GenerationSession::new(description);
        let options = FlowOptions {
            loop_policy: self.config.loop_policy,
        };
        debug!(session_id = %session.id, phase = ?Phase::Init, "session opened");

        session.template_hints = self.fetch_template_hints(description).await;
        let template_hits = session.template_hints.len();

        let mut feedback: Vec<String> = Vec::new();
        let mut best: Option<Candidate> = None;
        let mut corrected_any = false;

        for number in 1..=self.config.max_attempts {
            if number > 1 {
                let delay = self.config.backoff_delay(number - 1);
                debug!(session_id = %session.id, phase = ?Phase::Regenerating, ?delay, "backing off before retry");
                tokio::time::sleep(delay).await;
            }

            let mut attempt = GenerationAttempt::new(number);
            let context = PromptContext {
                description: description.to_string(),
                feedback: feedback.clone(),
                template_hints: session.template_hints.clone(),
                attempt: number,
            };
            attempt.prompt = Some(render_prompt(&context));

            debug!(session_id = %session.id, phase = ?Phase::Requesting, attempt = number, "requesting generation");
            let raw = match self.request(&context).await {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(session_id = %session.id, attempt = number, %error, "transport failure");
                    attempt.failure = Some(error.to_string());
                    session.attempts.push(attempt);
                    continue;
                }
            };
            attempt.raw_output = Some(raw.clone());

            debug!(session_id = %session.id, phase = ?Phase::Parsing, attempt = number, "parsing model output");
            let mut flow = match parse_flow(&raw) {
                Ok(flow) => flow,
                Err(error) => {
                    warn!(session_id = %session.id, attempt = number, %error, "unparseable output");
                    attempt.failure = Some(error.to_string());
                    feedback =
                        vec![format!("The previous response was not valid JSON: {error}")];
                    session.attempts.push(attempt);
                    continue;
                }
            };
            attempt.parse_succeeded = true;

            debug!(session_id = %session.id, phase = ?Phase::Validating, attempt = number, "validating flow");
            let mut report = validate_flow_concurrent(&flow, &options).await;

            if report.has_errors() {
                debug!(session_id = %session.id, phase = ?Phase::Correcting, attempt = number,
                       errors = report.error_count(), "attempting auto-correction");
                let correction = corrector::correct(&flow, &report.issues);
                if correction.fixed_anything() {
                    flow = correction.flow;
                    report = validate_flow_concurrent(&flow, &options).await;
                    attempt.corrected = true;
                    corrected_any = true;
                }
            }

            attempt.report = Some(report.clone());
            session.attempts.push(attempt);

            let candidate = Candidate { flow, report };
            if best
                .as_ref()
                .is_none_or(|current| candidate.rank() < current.rank())
            {
                best = Some(candidate);
            }

            let accepted = best.as_ref().is_some_and(|c| {
                c.report.is_valid && c.report.grade >= self.config.min_grade
            });
            if accepted {
                break;
            }
            if let Some(report) = session
                .attempts
                .last()
                .and_then(|a| a.report.as_ref())
            {
                feedback = feedback_lines(report);
            }
        }

        debug!(session_id = %session.id, phase = ?Phase::Finalizing, "closing session");
        session.status = match &best {
            Some(candidate)
                if candidate.report.is_valid && candidate.report.grade >= self.config.min_grade =>
            {
                SessionStatus::Ready
            }
            Some(_) => SessionStatus::Partial,
            None => SessionStatus::Failed,
        };
        if let Some(candidate) = best {
            session.final_flow = Some(candidate.flow);
            session.final_report = Some(candidate.report);
        }

        let metadata = GenerationMetadata {
            attempts: session.attempts.len() as u32,
            duration_ms: started.elapsed().as_millis() as u64,
            template_hits,
            corrected: corrected_any,
        };
        let result = GenerationResult {
            campaign_flow: session.final_flow.clone(),
            validation: session.final_report.clone(),
            status: session.status,
            metadata,
        };
        info!(
            session_id = %session.id,
            status = ?session.status,
            attempts = result.metadata.attempts,
            "session finished"
        );
        Ok((session, result))
    }

    async fn request(&self, context: &PromptContext) -> Result<String, TransportError> {
        match tokio::time::timeout(self.config.request_timeout, self.client.generate(context))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                after: self.config.request_timeout,
            }),
        }
    }

    /// One best-effort template lookup; failures never abort the request.
    async fn fetch_template_hints(&self, description: &str) -> Vec<String> {
        let search = self.templates.search(description);
        match tokio::time::timeout(self.config.template_timeout, search).await {
            Ok(Ok(snippets)) => snippets
                .into_iter()
                .map(|s| format!("{}: {}", s.title, s.body))
                .collect(),
            Ok(Err(error)) => {
                warn!(%error, "template search failed; continuing without hints");
                Vec::new()
            }
            Err(_) => {
                warn!("template search timed out; continuing without hints");
                Vec::new()
            }
        }
    }
}
