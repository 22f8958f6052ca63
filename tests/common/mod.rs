//! Shared stubs and fixtures for the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use flowsmith::generation::{
    GenerationClient, PromptContext, TemplateSearch, TemplateSnippet, TransportError,
};

/// Client that replays a fixed script of responses, one per attempt, and
/// records every prompt context it saw.
pub struct ScriptedClient {
    script: Mutex<Vec<Result<String, String>>>,
    seen: Mutex<Vec<PromptContext>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A client that always answers with the same body.
    pub fn always(body: &str) -> Self {
        Self::new(vec![Ok(body.to_string()); 8])
    }

    pub fn prompts(&self) -> Vec<PromptContext> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, context: &PromptContext) -> Result<String, TransportError> {
        self.seen.lock().unwrap().push(context.clone());
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(TransportError::unavailable("script exhausted"));
        }
        script.remove(0).map_err(TransportError::unavailable)
    }
}

/// Client that never answers within any reasonable deadline.
pub struct SlowClient {
    pub delay: Duration,
    pub body: String,
}

#[async_trait]
impl GenerationClient for SlowClient {
    async fn generate(&self, _context: &PromptContext) -> Result<String, TransportError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.body.clone())
    }
}

/// Template search that always fails.
pub struct FailingTemplates;

#[async_trait]
impl TemplateSearch for FailingTemplates {
    async fn search(&self, _description: &str) -> Result<Vec<TemplateSnippet>, TransportError> {
        Err(TransportError::unavailable("template index offline"))
    }
}

/// Template search returning a fixed snippet list.
pub struct StaticTemplates(pub Vec<TemplateSnippet>);

#[async_trait]
impl TemplateSearch for StaticTemplates {
    async fn search(&self, _description: &str) -> Result<Vec<TemplateSnippet>, TransportError> {
        Ok(self.0.clone())
    }
}

/// The minimal valid flow used across suites.
pub const VALID_FLOW: &str = r#"{
    "initialStepID": "m1",
    "steps": [
        {"id": "m1", "type": "message", "active": true, "parameters": {},
         "messageText": "Hey {{first_name}}, welcome aboard!",
         "events": [{"id": "e1", "type": "default", "nextStepID": "end"}]},
        {"id": "end", "type": "end", "active": true, "parameters": {}, "events": []}
    ]
}"#;

/// Flow with a dangling reference that no deterministic repair can fix.
pub const DANGLING_FLOW: &str = r#"{
    "initialStepID": "m1",
    "steps": [
        {"id": "m1", "type": "message", "active": true, "parameters": {},
         "messageText": "Hey {{first_name}}!",
         "events": [{"id": "e1", "type": "default", "nextStepID": "missing"}]},
        {"id": "end", "type": "end", "active": true, "parameters": {}, "events": []}
    ]
}"#;

/// Flow whose only defects (missing flags, lowercase period) the corrector
/// fixes without help from the model.
pub const CORRECTABLE_FLOW: &str = r#"{
    "initialStepID": "m1",
    "steps": [
        {"id": "m1", "type": "message",
         "messageText": "Hey {{first_name}}, your order shipped!",
         "events": [{"id": "e1", "type": "default", "nextStepID": "d1"}]},
        {"id": "d1", "type": "delay", "time": "24", "period": "hours",
         "events": [{"id": "e2", "type": "default", "nextStepID": "end"}]},
        {"id": "end", "type": "end", "events": []}
    ]
}"#;
