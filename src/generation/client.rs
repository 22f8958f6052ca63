//! Collaborator seam for the text-generation model.
//!
//! The engine never talks to a provider directly; it drives an opaque
//! [`GenerationClient`] capability. Deadlines and retries are the
//! orchestrator's job, so implementations stay simple: one request in, one
//! raw string (hopefully JSON) out.

use async_trait::async_trait;
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failures from the model or template collaborators.
///
/// These are the retryable errors: the orchestrator backs off and asks
/// again, up to its attempt ceiling.
#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("generation request timed out after {after:?}")]
    #[diagnostic(
        code(flowsmith::transport::timeout),
        help("Raise FLOWSMITH_REQUEST_TIMEOUT_MS or check provider latency.")
    )]
    Timeout { after: Duration },

    #[error("generation backend unavailable: {message}")]
    #[diagnostic(code(flowsmith::transport::unavailable))]
    Unavailable { message: String },
}

impl TransportError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Everything a client needs to render one generation request.
#[derive(Clone, Debug)]
pub struct PromptContext {
    /// The user's campaign description, verbatim.
    pub description: String,
    /// Validator feedback from prior attempts, one line per issue.
    pub feedback: Vec<String>,
    /// Template snippets retrieved for this description, possibly empty.
    pub template_hints: Vec<String>,
    /// 1-based attempt number.
    pub attempt: u32,
}

impl PromptContext {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            feedback: Vec::new(),
            template_hints: Vec::new(),
            attempt: 1,
        }
    }
}

/// An opaque capability that turns a prompt into raw model output.
///
/// Implementations must not retry internally; the orchestrator owns the
/// retry budget and would otherwise multiply attempts.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, context: &PromptContext) -> Result<String, TransportError>;
}
