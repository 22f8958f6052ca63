//! The public generation surface.
//!
//! [`GenerationEngine`] owns the collaborators and the concurrency budget.
//! Each `generate` call takes a semaphore permit (bounding outbound model
//! load), runs one fresh [`Orchestrator`](super::orchestrator::Orchestrator)
//! over the request, and hands the finished session to the configured sinks
//! without waiting on them.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use super::client::GenerationClient;
use super::config::EngineConfig;
use super::orchestrator::{EngineError, Orchestrator};
use super::session::GenerationResult;
use super::templates::{NoTemplates, TemplateSearch};
use crate::flow::CampaignFlow;
use crate::sinks::SessionSink;
use crate::validation::{
    FlowOptions, OptimizationSuggestion, ValidationReport, suggest_optimizations, validate_flow,
};

pub struct GenerationEngine {
    client: Arc<dyn GenerationClient>,
    templates: Arc<dyn TemplateSearch>,
    sinks: Vec<Arc<dyn SessionSink>>,
    config: EngineConfig,
    permits: Arc<Semaphore>,
}

impl GenerationEngine {
    /// Start building an engine around a generation client.
    pub fn builder(client: Arc<dyn GenerationClient>) -> GenerationEngineBuilder {
        GenerationEngineBuilder {
            client,
            templates: Arc::new(NoTemplates),
            sinks: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Generate a campaign flow from a prose description.
    #[instrument(skip(self), fields(description_len = description.len()))]
    pub async fn generate(&self, description: &str) -> Result<GenerationResult, EngineError> {
        // The semaphore is never closed; acquisition only fails after that.
        let _permit = self.permits.acquire().await.ok();

        let orchestrator = Orchestrator::new(&*self.client, &*self.templates, &self.config);
        let (session, result) = orchestrator.run(description).await?;

        if !self.sinks.is_empty() {
            let sinks = self.sinks.clone();
            tokio::spawn(async move {
                for sink in sinks {
                    if let Err(error) = sink.record(&session) {
                        warn!(%error, "session sink failed");
                    }
                }
            });
        }
        Ok(result)
    }

    /// Validate an existing flow with the engine's policy, no generation.
    ///
    /// The verdict is produced by the same layers the orchestrator runs, so
    /// pre-existing flows and generated ones are judged identically.
    #[must_use]
    pub fn validate(&self, flow: &CampaignFlow) -> ValidationReport {
        let options = FlowOptions {
            loop_policy: self.config.loop_policy,
        };
        validate_flow(flow, &options)
    }

    /// Suggest improvements for an existing flow, highest priority first.
    ///
    /// Advisory only; the suggestions never change the validation verdict.
    #[must_use]
    pub fn optimize(&self, flow: &CampaignFlow) -> Vec<OptimizationSuggestion> {
        suggest_optimizations(flow)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

pub struct GenerationEngineBuilder {
    client: Arc<dyn GenerationClient>,
    templates: Arc<dyn TemplateSearch>,
    sinks: Vec<Arc<dyn SessionSink>>,
    config: EngineConfig,
}

impl GenerationEngineBuilder {
    #[must_use]
    pub fn with_templates(mut self, templates: Arc<dyn TemplateSearch>) -> Self {
        self.templates = templates;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn SessionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn build(self) -> GenerationEngine {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        GenerationEngine {
            client: self.client,
            templates: self.templates,
            sinks: self.sinks,
            config: self.config,
            permits,
        }
    }
}
