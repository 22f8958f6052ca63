//! Orchestrator and engine paths with deterministic stub collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use flowsmith::generation::{
    EngineConfig, EngineError, GenerationEngine, SessionStatus, TemplateSnippet,
};
use flowsmith::sinks::MemorySink;
use flowsmith::validation::Grade;

use common::{FailingTemplates, ScriptedClient, SlowClient, StaticTemplates};

fn fast_config() -> EngineConfig {
    EngineConfig {
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(4),
        request_timeout: Duration::from_millis(200),
        template_timeout: Duration::from_millis(50),
        ..EngineConfig::default()
    }
}

fn engine_with(client: ScriptedClient) -> (GenerationEngine, Arc<ScriptedClient>) {
    let client = Arc::new(client);
    let engine = GenerationEngine::builder(client.clone())
        .with_config(fast_config())
        .build();
    (engine, client)
}

#[tokio::test]
async fn first_attempt_success_is_ready() {
    let (engine, client) = engine_with(ScriptedClient::always(common::VALID_FLOW));
    let result = engine.generate("welcome new subscribers").await.unwrap();

    assert_eq!(result.status, SessionStatus::Ready);
    assert_eq!(result.metadata.attempts, 1);
    assert!(!result.metadata.corrected);
    let report = result.validation.unwrap();
    assert!(report.is_valid);
    assert_eq!(report.grade, Grade::A);
    assert_eq!(client.prompts().len(), 1);
}

#[tokio::test]
async fn correctable_defects_resolve_within_one_attempt() {
    let (engine, _) = engine_with(ScriptedClient::always(common::CORRECTABLE_FLOW));
    let result = engine.generate("order shipped notification").await.unwrap();

    assert_eq!(result.status, SessionStatus::Ready);
    assert_eq!(result.metadata.attempts, 1);
    assert!(result.metadata.corrected);
    let flow = result.campaign_flow.unwrap();
    assert_eq!(flow.steps[0].active, Some(true));
}

#[tokio::test]
async fn feedback_from_a_failed_attempt_reaches_the_next_prompt() {
    let (engine, client) = engine_with(ScriptedClient::new(vec![
        Ok(common::DANGLING_FLOW.to_string()),
        Ok(common::VALID_FLOW.to_string()),
    ]));
    let result = engine.generate("winback campaign").await.unwrap();

    assert_eq!(result.status, SessionStatus::Ready);
    assert_eq!(result.metadata.attempts, 2);

    let prompts = client.prompts();
    assert!(prompts[0].feedback.is_empty());
    assert!(
        prompts[1]
            .feedback
            .iter()
            .any(|line| line.contains("DANGLING_REFERENCE"))
    );
    assert_eq!(prompts[1].attempt, 2);
}

#[tokio::test]
async fn exhaustion_with_a_parsed_flow_is_partial() {
    let (engine, _) = engine_with(ScriptedClient::always(common::DANGLING_FLOW));
    let result = engine.generate("broken campaign").await.unwrap();

    assert_eq!(result.status, SessionStatus::Partial);
    assert_eq!(result.metadata.attempts, 3);
    assert!(result.has_flow());
    let report = result.validation.unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.error_count(), 1);
}

#[tokio::test]
async fn never_parsing_output_is_failed() {
    let (engine, _) = engine_with(ScriptedClient::always("I cannot help with that."));
    let result = engine.generate("anything").await.unwrap();

    assert_eq!(result.status, SessionStatus::Failed);
    assert_eq!(result.metadata.attempts, 3);
    assert!(!result.has_flow());
    assert!(result.validation.is_none());
}

#[tokio::test]
async fn empty_description_is_refused_without_attempts() {
    let (engine, client) = engine_with(ScriptedClient::always(common::VALID_FLOW));
    let error = engine.generate("   ").await.unwrap_err();
    assert!(matches!(error, EngineError::EmptyDescription));
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn request_timeout_counts_as_a_failed_attempt() {
    let client = Arc::new(SlowClient {
        delay: Duration::from_secs(60),
        body: common::VALID_FLOW.to_string(),
    });
    let config = EngineConfig {
        max_attempts: 2,
        request_timeout: Duration::from_millis(20),
        backoff_base: Duration::from_millis(1),
        backoff_cap: Duration::from_millis(2),
        ..EngineConfig::default()
    };
    let engine = GenerationEngine::builder(client).with_config(config).build();
    let result = engine.generate("slow provider").await.unwrap();

    assert_eq!(result.status, SessionStatus::Failed);
    assert_eq!(result.metadata.attempts, 2);
}

#[tokio::test]
async fn template_failure_degrades_to_unassisted_prompt() {
    let client = Arc::new(ScriptedClient::always(common::VALID_FLOW));
    let engine = GenerationEngine::builder(client.clone())
        .with_templates(Arc::new(FailingTemplates))
        .with_config(fast_config())
        .build();
    let result = engine.generate("flash sale").await.unwrap();

    assert_eq!(result.status, SessionStatus::Ready);
    assert_eq!(result.metadata.template_hits, 0);
    assert!(client.prompts()[0].template_hints.is_empty());
}

#[tokio::test]
async fn template_hints_reach_the_prompt() {
    let client = Arc::new(ScriptedClient::always(common::VALID_FLOW));
    let templates = StaticTemplates(vec![TemplateSnippet::new(
        "Winback",
        "message, delay 3 days, purchase offer, end",
        0.92,
    )]);
    let engine = GenerationEngine::builder(client.clone())
        .with_templates(Arc::new(templates))
        .with_config(fast_config())
        .build();
    let result = engine.generate("winback idle customers").await.unwrap();

    assert_eq!(result.metadata.template_hits, 1);
    assert!(client.prompts()[0].template_hints[0].starts_with("Winback:"));
}

#[tokio::test]
async fn engine_suggests_optimizations_for_existing_flows() {
    let (engine, _) = engine_with(ScriptedClient::always(common::VALID_FLOW));
    let flow: flowsmith::flow::CampaignFlow = serde_json::from_str(common::VALID_FLOW).unwrap();

    let suggestions = engine.optimize(&flow);
    assert!(!suggestions.is_empty());
    assert!(
        suggestions
            .iter()
            .any(|s| s.title == "Add clear CTA to first message"
                && s.step_id.as_deref() == Some("m1"))
    );
    // Highest priority first.
    assert_eq!(suggestions[0].priority, flowsmith::validation::Rating::High);
}

#[tokio::test]
async fn rendered_prompts_are_recorded_on_attempts() {
    let sink = MemorySink::new();
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(common::DANGLING_FLOW.to_string()),
        Ok(common::VALID_FLOW.to_string()),
    ]));
    let engine = GenerationEngine::builder(client)
        .with_config(fast_config())
        .with_sink(Arc::new(sink.clone()))
        .build();
    engine.generate("winback campaign").await.unwrap();

    for _ in 0..50 {
        if !sink.snapshot().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let sessions = sink.snapshot();
    let attempts = &sessions[0].attempts;
    assert_eq!(attempts.len(), 2);

    let first = attempts[0].prompt.as_deref().unwrap();
    assert!(first.contains("winback campaign"));
    assert!(!first.contains("DANGLING_REFERENCE"));

    let second = attempts[1].prompt.as_deref().unwrap();
    assert!(second.contains("winback campaign"));
    assert!(second.contains("DANGLING_REFERENCE"));
}

#[tokio::test]
async fn finished_sessions_reach_the_sinks() {
    let sink = MemorySink::new();
    let client = Arc::new(ScriptedClient::always(common::VALID_FLOW));
    let engine = GenerationEngine::builder(client)
        .with_config(fast_config())
        .with_sink(Arc::new(sink.clone()))
        .build();
    engine.generate("welcome series").await.unwrap();

    // Recording is fire-and-forget; give the spawned task a moment.
    for _ in 0..50 {
        if !sink.snapshot().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let sessions = sink.snapshot();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Ready);
    assert_eq!(sessions[0].attempts.len(), 1);
    assert!(sessions[0].final_flow.is_some());
}
