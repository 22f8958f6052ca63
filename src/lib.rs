//! # Flowsmith: Campaign-Flow Generation & Validation Engine
//!
//! Flowsmith turns prose campaign descriptions into validated campaign-flow
//! graphs via an LLM collaborator, and independently validates flows from
//! any source. The model is treated as an unreliable component: every
//! response is parsed defensively, validated in layers, auto-corrected where
//! a repair is unambiguous, and regenerated with feedback when it is not.
//!
//! ## Core Concepts
//!
//! - **Flows**: directed graphs of typed steps connected by events
//!   ([`flow`])
//! - **Validation layers**: schema, graph structure, quality scoring,
//!   deterministic correction, and advisory optimization suggestions
//!   ([`validation`])
//! - **Orchestration**: a bounded-retry state machine around an opaque
//!   generation client ([`generation`])
//! - **Sinks**: fire-and-forget session recording ([`sinks`])
//!
//! ## Validating a Flow
//!
//! ```
//! use flowsmith::flow::{CampaignFlow, Event, EventType, Step, StepType};
//! use flowsmith::validation::{validate_flow, FlowOptions};
//! use serde_json::json;
//!
//! let hello = Step::new("m1", StepType::Message)
//!     .with_field("messageText", json!("Hey {{first_name}}, welcome!"))
//!     .with_event(Event::new("e1", EventType::Default, "end"));
//! let flow = CampaignFlow::new("m1", vec![hello, Step::new("end", StepType::End)]);
//!
//! let report = validate_flow(&flow, &FlowOptions::default());
//! assert!(report.is_valid);
//! assert_eq!(report.grade.to_string(), "A");
//! ```
//!
//! ## Generating a Flow
//!
//! ```no_run
//! use std::sync::Arc;
//! use flowsmith::generation::{GenerationEngine, GenerationClient};
//!
//! # async fn demo(client: Arc<dyn GenerationClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = GenerationEngine::builder(client).build();
//! let result = engine.generate("Win back customers idle for 30 days").await?;
//! println!("status: {:?}", result.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`flow`] - Wire-contract flow model and read-only graph operations
//! - [`validation`] - Validation layers, quality scoring, auto-correction
//! - [`generation`] - Generation client seam, parsing, orchestration, engine
//! - [`sinks`] - Session recording targets
//! - [`reporting`] - Human-readable report rendering and tracing setup

pub mod flow;
pub mod generation;
pub mod reporting;
pub mod sinks;
pub mod validation;
