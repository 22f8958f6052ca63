//! Layer-three quality scoring: SMS campaign best practices.
//!
//! Never blocks a flow. Findings surface as score deductions and
//! human-readable suggestions, not validation issues.

use super::report::Grade;
use crate::flow::{CampaignFlow, EventType, FlowGraph, Step, StepType};

/// Message bodies past this length render as multi-part SMS; allowed only
/// when the copy carries an explicit continuation marker.
const SMS_SOFT_LIMIT: usize = 160;

const LONG_MESSAGE_PENALTY: u32 = 10;
const IMPERSONAL_PROMO_PENALTY: u32 = 5;
const NO_END_AFTER_PURCHASE_PENALTY: u32 = 15;
const MISSING_NOREPLY_PENALTY: u32 = 5;

/// Outcome of the best-practices pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualityOutcome {
    pub score: u8,
    pub grade: Grade,
    pub suggestions: Vec<String>,
}

/// Score a flow against SMS best practices, starting from 100.
///
/// Deductions apply per offending step, in step order, with the rule order
/// fixed, so the outcome is deterministic. The score clamps to `0..=100`.
#[must_use]
pub fn score_quality(flow: &CampaignFlow) -> QualityOutcome {
    let mut deducted: u32 = 0;
    let mut suggestions = Vec::new();
    let graph = FlowGraph::new(flow).ok();

    for step in &flow.steps {
        if let Some(body) = message_body(step) {
            if body.chars().count() > SMS_SOFT_LIMIT && !has_continuation_marker(body) {
                deducted += LONG_MESSAGE_PENALTY;
                suggestions.push(format!(
                    "Step {:?}: message exceeds {SMS_SOFT_LIMIT} characters; shorten it or add an explicit continuation marker",
                    step.id
                ));
            }
            if is_promotional(step, body) && !has_personalization_token(body) {
                deducted += IMPERSONAL_PROMO_PENALTY;
                suggestions.push(format!(
                    "Step {:?}: promotional message has no personalization token such as {{{{first_name}}}}",
                    step.id
                ));
            }
        }

        if matches!(step.kind, StepType::Purchase | StepType::PurchaseOffer) {
            let reaches_end = graph.as_ref().is_some_and(|g| {
                g.reachable_from(&step.id)
                    .iter()
                    .any(|id| g.step_by_id(id).is_some_and(|s| s.kind.is_end()))
            });
            if !reaches_end {
                deducted += NO_END_AFTER_PURCHASE_PENALTY;
                suggestions.push(format!(
                    "Step {:?}: no end step is reachable after the purchase; close the flow explicitly",
                    step.id
                ));
            }
        }

        let has_reply = step.events.iter().any(|e| e.kind == EventType::Reply);
        let has_noreply = step.events.iter().any(|e| e.kind == EventType::NoReply);
        if has_reply && !has_noreply {
            deducted += MISSING_NOREPLY_PENALTY;
            suggestions.push(format!(
                "Step {:?}: reply branch has no noreply fallback; silent recipients will stall here",
                step.id
            ));
        }
    }

    let score = 100u32.saturating_sub(deducted) as u8;
    QualityOutcome {
        score,
        grade: Grade::from_score(score),
        suggestions,
    }
}

fn message_body(step: &Step) -> Option<&str> {
    match step.kind {
        StepType::Message | StepType::ProductChoice | StepType::PurchaseOffer => {
            step.str_field("messageText")
        }
        _ => None,
    }
}

fn has_continuation_marker(body: &str) -> bool {
    body.contains("...") || body.contains('\u{2026}')
}

fn has_personalization_token(body: &str) -> bool {
    body.find("{{")
        .zip(body.rfind("}}"))
        .is_some_and(|(open, close)| open + 2 <= close)
}

fn is_promotional(step: &Step, body: &str) -> bool {
    if step
        .str_field("discountType")
        .is_some_and(|d| !d.is_empty() && d != "none")
    {
        return true;
    }
    let folded = body.to_lowercase();
    folded.contains("discount")
        || folded.contains("sale")
        || folded.contains("% off")
        || folded.contains("promo")
        || folded.contains("coupon")
}
