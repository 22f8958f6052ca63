//! Multi-layer flow validation: schema, graph structure, quality, and
//! deterministic auto-correction.
//!
//! The layers are pure functions over an immutable flow snapshot:
//!
//! 1. [`schema::check_schema`] — per-step required fields and enum values;
//! 2. [`flow_checks::check_flow`] — id uniqueness, referential integrity,
//!    reachability, termination, terminal rules;
//! 3. [`quality::score_quality`] — SMS best practices, score and grade;
//! 4. [`corrector::correct`] — content-free repairs, applied separately.
//!
//! [`optimizer::suggest_optimizations`] sits outside the verdict entirely:
//! it proposes prioritized improvements for flows that may already be valid.
//!
//! [`validate_flow`] assembles layers 1-3 into a [`ValidationReport`]; the
//! generation engine calls the same function, so external callers see
//! identical verdicts.

pub mod corrector;
pub mod flow_checks;
pub mod optimizer;
pub mod quality;
pub mod report;
pub mod schema;

pub use corrector::{Correction, correct};
pub use flow_checks::{FlowOptions, LoopPolicy, check_flow};
pub use optimizer::{
    OptimizationCategory, OptimizationSuggestion, Rating, suggest_optimizations,
};
pub use quality::{QualityOutcome, score_quality};
pub use report::{Grade, IssueCode, Severity, ValidationIssue, ValidationReport};
pub use schema::check_schema;

use crate::flow::CampaignFlow;

/// Run all read-only validation layers and assemble one report.
#[must_use]
pub fn validate_flow(flow: &CampaignFlow, options: &FlowOptions) -> ValidationReport {
    let mut issues = check_schema(flow);
    issues.extend(check_flow(flow, options));
    let quality = score_quality(flow);
    ValidationReport::new(issues, quality.score, quality.suggestions)
}

/// Concurrent variant for hot paths: the layers are read-only over the same
/// snapshot, so they can run as parallel futures without coordination.
pub async fn validate_flow_concurrent(
    flow: &CampaignFlow,
    options: &FlowOptions,
) -> ValidationReport {
    let (mut issues, flow_issues, quality) = tokio::join!(
        async { check_schema(flow) },
        async { check_flow(flow, options) },
        async { score_quality(flow) },
    );
    issues.extend(flow_issues);
    ValidationReport::new(issues, quality.score, quality.suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Event, EventType, Step, StepType};
    use serde_json::json;

    fn demo_flow() -> CampaignFlow {
        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi {{first_name}}"))
            .with_event(Event::new("e1", EventType::Default, "end"));
        CampaignFlow::new("m1", vec![step, Step::new("end", StepType::End)])
    }

    #[test]
    fn facade_merges_all_layers() {
        let report = validate_flow(&demo_flow(), &FlowOptions::default());
        // Only the missing active/parameters warnings remain.
        assert!(report.is_valid);
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 4);
        assert_eq!(report.quality_score, 100);
        assert_eq!(report.grade, Grade::A);
    }

    #[tokio::test]
    async fn concurrent_facade_matches_sequential() {
        let flow = demo_flow();
        let options = FlowOptions::default();
        let sequential = validate_flow(&flow, &options);
        let concurrent = validate_flow_concurrent(&flow, &options).await;
        assert_eq!(sequential, concurrent);
    }
}
