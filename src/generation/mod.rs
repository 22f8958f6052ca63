//! Model-driven flow generation: prompt assembly, output parsing, and the
//! bounded-retry orchestration loop.
//!
//! The model and the template library are opaque async capabilities
//! ([`GenerationClient`], [`TemplateSearch`]); everything else here is
//! deterministic plumbing around them.

pub mod client;
pub mod config;
pub mod engine;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod session;
pub mod templates;

pub use client::{GenerationClient, PromptContext, TransportError};
pub use config::EngineConfig;
pub use engine::{GenerationEngine, GenerationEngineBuilder};
pub use orchestrator::{EngineError, Orchestrator, Phase};
pub use parser::{ParseError, parse_flow};
pub use prompts::{feedback_lines, render_prompt};
pub use session::{
    GenerationAttempt, GenerationMetadata, GenerationResult, GenerationSession, SessionStatus,
};
pub use templates::{NoTemplates, TemplateSearch, TemplateSnippet};
