//! Layer-four auto-correction: deterministic, content-free repairs.
//!
//! The corrector only applies fixes with exactly one right answer: default
//! flags, canonical enum casing, synthesized event ids. It never invents
//! business content (message copy, intents, targets), so anything needing a
//! creative decision stays in `remaining` and flows back to the model as
//! feedback.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use super::flow_checks::{FlowOptions, check_flow};
use super::report::ValidationIssue;
use super::schema::{CART_SOURCES, PRODUCT_SELECTION, SPLIT_ACTIONS, check_schema};
use crate::flow::{CampaignFlow, EventType, StepType, TimePeriod, TimeUnit};

/// A corrected flow snapshot plus the partition of the input issues.
#[derive(Clone, Debug)]
pub struct Correction {
    pub flow: CampaignFlow,
    /// Input issues that no longer reproduce against the corrected flow.
    pub resolved: Vec<ValidationIssue>,
    /// Input issues the corrector could not fix.
    pub remaining: Vec<ValidationIssue>,
}

impl Correction {
    #[must_use]
    pub fn fixed_anything(&self) -> bool {
        !self.resolved.is_empty()
    }
}

/// Apply every safe repair to a copy of `flow`, then re-validate and split
/// `issues` into resolved and remaining. Idempotent: correcting an already
/// corrected flow changes nothing.
#[must_use]
pub fn correct(flow: &CampaignFlow, issues: &[ValidationIssue]) -> Correction {
    let mut fixed = flow.clone();
    let mut synthesized: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();

    for step in &mut fixed.steps {
        if step.active.is_none() {
            step.active = Some(true);
        }
        if step.parameters.is_none() {
            step.parameters = Some(serde_json::Map::new());
        }
        normalize_payload_enums(step);

        let step_id = step.id.clone();
        for (index, event) in step.events.iter_mut().enumerate() {
            if event.id.is_empty() {
                event.id = synthesize_event_id(&step_id, index);
                synthesized
                    .entry(step_id.clone())
                    .or_default()
                    .insert(event.id.clone());
            }
            if event.kind == EventType::Reply && event.description.is_none() {
                event.description = Some(String::new());
            }
            if let Some(after) = event.after.as_mut() {
                normalize_after_unit(after);
            }
            if let Some(action) = event.action.as_mut() {
                normalize_in_place(action, &SPLIT_ACTIONS);
            }
        }
    }

    // Re-run the structural validators and keep only the input issues that
    // still reproduce. Keys are (code, step, event); messages may differ.
    // An issue surviving under a synthesized event id is also keyed under
    // the original empty id, so input issues on unnamed events are not
    // mistaken for fixed ones.
    let mut still_present = FxHashSet::default();
    let revalidated = check_schema(&fixed)
        .into_iter()
        .chain(check_flow(&fixed, &FlowOptions::default()));
    for issue in revalidated {
        if let (Some(step), Some(event)) = (&issue.step_id, &issue.event_id)
            && synthesized.get(step).is_some_and(|ids| ids.contains(event))
        {
            still_present.insert((issue.code, issue.step_id.clone(), Some(String::new())));
        }
        still_present.insert(issue_key(&issue));
    }

    let (remaining, resolved) = issues
        .iter()
        .cloned()
        .partition(|issue| still_present.contains(&issue_key(issue)));

    Correction {
        flow: fixed,
        resolved,
        remaining,
    }
}

fn issue_key(issue: &ValidationIssue) -> (super::report::IssueCode, Option<String>, Option<String>) {
    (issue.code, issue.step_id.clone(), issue.event_id.clone())
}

fn normalize_payload_enums(step: &mut crate::flow::Step) {
    match step.kind {
        StepType::Delay | StepType::RateLimit | StepType::Limit => {
            if let Some(Value::String(period)) = step.fields.get_mut("period")
                && TimePeriod::from_canonical(period).is_none()
                && let Ok(parsed) = period.parse::<TimePeriod>()
            {
                *period = parsed.as_str().to_string();
            }
        }
        StepType::NoReply => {
            if let Some(after) = step.fields.get_mut("after") {
                normalize_after_unit(after);
            }
        }
        StepType::Split | StepType::SplitGroup | StepType::SplitRange => {
            if let Some(Value::String(action)) = step.fields.get_mut("action") {
                normalize_in_place(action, &SPLIT_ACTIONS);
            }
        }
        StepType::ProductChoice => {
            if let Some(Value::String(selection)) = step.fields.get_mut("productSelection") {
                normalize_in_place(selection, &PRODUCT_SELECTION);
            }
        }
        StepType::PurchaseOffer | StepType::Purchase => {
            if let Some(Value::String(source)) = step.fields.get_mut("cartSource") {
                normalize_in_place(source, &CART_SOURCES);
            }
        }
        _ => {}
    }
}

/// Rewrite `value` to its canonical member when it only differs by case.
fn normalize_in_place(value: &mut String, allowed: &[&str]) {
    if allowed.contains(&value.as_str()) {
        return;
    }
    let folded = value.trim().to_ascii_lowercase();
    if let Some(canonical) = allowed.iter().find(|a| **a == folded) {
        *value = (*canonical).to_string();
    }
}

fn normalize_after_unit(after: &mut Value) {
    if let Some(Value::String(unit)) = after.get_mut("unit")
        && TimeUnit::from_canonical(unit).is_none()
        && let Ok(parsed) = unit.parse::<TimeUnit>()
    {
        *unit = parsed.as_str().to_string();
    }
}

/// Deterministic id for an event missing one: FNV-1a over the step id and
/// event position, rendered as `ev-xxxxxxxx`.
fn synthesize_event_id(step_id: &str, index: usize) -> String {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for byte in step_id.bytes().chain([b'#']).chain(index.to_le_bytes()) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("ev-{hash:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Event, Step};
    use serde_json::json;

    #[test]
    fn fills_flags_and_parameters() {
        let flow = CampaignFlow::new("e", vec![Step::new("e", StepType::End)]);
        let issues = check_schema(&flow);
        assert_eq!(issues.len(), 2);

        let correction = correct(&flow, &issues);
        assert_eq!(correction.flow.steps[0].active, Some(true));
        assert!(correction.flow.steps[0].parameters.is_some());
        assert_eq!(correction.resolved.len(), 2);
        assert!(correction.remaining.is_empty());
    }

    #[test]
    fn normalizes_enum_casing() {
        let delay = Step::new("d", StepType::Delay)
            .with_field("time", json!("24"))
            .with_field("period", json!("hours"));
        let purchase =
            Step::new("p", StepType::Purchase).with_field("cartSource", json!("Latest"));
        let flow = CampaignFlow::new("d", vec![delay, purchase]);

        let correction = correct(&flow, &check_schema(&flow));
        assert_eq!(
            correction.flow.steps[0].str_field("period"),
            Some("Hours")
        );
        assert_eq!(
            correction.flow.steps[1].str_field("cartSource"),
            Some("latest")
        );
    }

    #[test]
    fn leaves_invalid_enum_values_alone() {
        let purchase =
            Step::new("p", StepType::Purchase).with_field("cartSource", json!("shopping-cart"));
        let flow = CampaignFlow::new("p", vec![purchase]);
        let issues = check_schema(&flow);

        let correction = correct(&flow, &issues);
        assert_eq!(
            correction.flow.steps[0].str_field("cartSource"),
            Some("shopping-cart")
        );
        assert!(
            correction
                .remaining
                .iter()
                .any(|i| i.step_id.as_deref() == Some("p") && i.is_error())
        );
    }

    #[test]
    fn synthesizes_stable_event_ids() {
        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new("", EventType::Default, "end"));
        let flow = CampaignFlow::new("m1", vec![step, Step::new("end", StepType::End)]);

        let first = correct(&flow, &check_schema(&flow));
        let second = correct(&flow, &check_schema(&flow));
        let id = &first.flow.steps[0].events[0].id;
        assert!(id.starts_with("ev-"));
        assert_eq!(id.len(), 11);
        assert_eq!(id, &second.flow.steps[0].events[0].id);
    }

    #[test]
    fn unfixable_event_issues_survive_id_synthesis() {
        use super::super::report::IssueCode;
        use super::super::validate_flow;

        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new("", EventType::Reply, "end"));
        let flow = CampaignFlow::new("m1", vec![step, Step::new("end", StepType::End)]);
        let report = validate_flow(&flow, &FlowOptions::default());

        let correction = correct(&flow, &report.issues);
        let event = &correction.flow.steps[0].events[0];
        assert!(event.id.starts_with("ev-"));
        assert!(event.intent.is_none());
        // The missing intent needs content the corrector cannot invent;
        // renaming the event must not count as resolving it.
        assert!(
            correction
                .remaining
                .iter()
                .any(|i| i.code == IssueCode::EventFieldMissing)
        );
        assert!(
            correction
                .resolved
                .iter()
                .all(|i| i.code != IssueCode::EventFieldMissing)
        );
    }

    #[test]
    fn defaults_reply_description_to_empty() {
        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new("r", EventType::Reply, "end").with_intent("yes"));
        let flow = CampaignFlow::new("m1", vec![step, Step::new("end", StepType::End)]);

        let correction = correct(&flow, &[]);
        assert_eq!(
            correction.flow.steps[0].events[0].description.as_deref(),
            Some("")
        );
    }

    #[test]
    fn correction_is_idempotent() {
        let delay = Step::new("d", StepType::Delay)
            .with_field("time", json!("2"))
            .with_field("period", json!("days"))
            .with_event(Event::new("", EventType::Default, "end"));
        let flow = CampaignFlow::new("d", vec![delay, Step::new("end", StepType::End)]);

        let once = correct(&flow, &check_schema(&flow));
        let twice = correct(&once.flow, &check_schema(&once.flow));
        assert_eq!(once.flow, twice.flow);
        assert!(twice.resolved.is_empty());
    }

    #[test]
    fn dangling_references_stay_in_remaining() {
        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new("e1", EventType::Default, "nowhere"));
        let flow = CampaignFlow::new("m1", vec![step]);
        let issues = check_flow(&flow, &FlowOptions::default());

        let correction = correct(&flow, &issues);
        assert!(!correction.fixed_anything());
        assert_eq!(correction.remaining.len(), issues.len());
    }
}
