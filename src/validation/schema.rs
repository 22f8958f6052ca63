//! Layer-one schema validation: per-step required fields and enum values.
//!
//! Purely structural. Graph-level rules (reachability, termination,
//! referential integrity) live in [`flow_checks`](super::flow_checks).

use serde_json::Value;

use super::report::{IssueCode, ValidationIssue};
use crate::flow::{CampaignFlow, Step, StepType, TimePeriod};

/// Wire-contract enum values for payload fields that are plain strings.
pub(crate) const CART_SOURCES: [&str; 2] = ["manual", "latest"];
pub(crate) const PRODUCT_SELECTION: [&str; 2] = ["automatically", "manually"];
pub(crate) const SPLIT_ACTIONS: [&str; 2] = ["include", "exclude"];

/// Validate every step's payload against the FlowBuilder field contract.
///
/// Missing required fields report [`IssueCode::SchemaFieldMissing`]; fields
/// that are present but mistyped, empty, or outside their enumeration report
/// [`IssueCode::SchemaFieldType`]. Output order follows step order, so the
/// report is deterministic.
#[must_use]
pub fn check_schema(flow: &CampaignFlow) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (index, step) in flow.steps.iter().enumerate() {
        check_step(step, index, &mut issues);
    }
    issues
}

fn check_step(step: &Step, index: usize, issues: &mut Vec<ValidationIssue>) {
    if step.id.is_empty() {
        issues.push(ValidationIssue::error(
            IssueCode::SchemaFieldMissing,
            format!("step at position {index} has no id"),
        ));
    }

    let mut ctx = StepChecker { step, issues };
    match step.kind {
        StepType::Message => {
            ctx.require_nonempty_str("messageText");
        }
        StepType::Delay => {
            ctx.require_numeric_str("time");
            ctx.require_period("period");
        }
        StepType::Segment => {
            ctx.require_nonempty_array("conditions");
        }
        StepType::Schedule => {}
        StepType::Experiment => {
            ctx.require_nonempty_str("experimentName");
        }
        StepType::RateLimit | StepType::Limit => {
            ctx.require_numeric_str("occurrences");
            ctx.require_numeric_str("timespan");
            ctx.require_period("period");
        }
        StepType::Reply => {
            ctx.require_nonempty_str("intent");
        }
        StepType::NoReply => {
            ctx.require_after("after");
        }
        StepType::Split | StepType::SplitGroup | StepType::SplitRange => {
            ctx.require_nonempty_str("action");
        }
        StepType::Property => {
            ctx.require_properties("properties");
        }
        StepType::ProductChoice => {
            ctx.require_nonempty_str("messageText");
            ctx.require_enum("productSelection", &PRODUCT_SELECTION);
        }
        StepType::PurchaseOffer => {
            ctx.require_nonempty_str("messageText");
            ctx.require_enum("cartSource", &CART_SOURCES);
        }
        StepType::Purchase => {
            ctx.require_enum("cartSource", &CART_SOURCES);
        }
        // Events on end steps are a flow-level rule, not a schema one.
        StepType::End => {}
    }

    if step.active.is_none() {
        issues.push(
            ValidationIssue::warning(
                IssueCode::SchemaFieldMissing,
                format!("step {:?} has no active flag", step.id),
            )
            .for_step(&step.id),
        );
    }
    if step.parameters.is_none() {
        issues.push(
            ValidationIssue::warning(
                IssueCode::SchemaFieldMissing,
                format!("step {:?} has no parameters object", step.id),
            )
            .for_step(&step.id),
        );
    }
    for (event_index, event) in step.events.iter().enumerate() {
        if event.id.is_empty() {
            issues.push(
                ValidationIssue::error(
                    IssueCode::SchemaFieldMissing,
                    format!(
                        "event at position {event_index} of step {:?} has no id",
                        step.id
                    ),
                )
                .for_step(&step.id),
            );
        }
    }
}

/// Per-step helper so each rule reports with the right step id attached.
struct StepChecker<'a> {
    step: &'a Step,
    issues: &'a mut Vec<ValidationIssue>,
}

impl StepChecker<'_> {
    fn missing(&mut self, field: &str) {
        self.issues.push(
            ValidationIssue::error(
                IssueCode::SchemaFieldMissing,
                format!(
                    "{} step {:?} is missing required field {field:?}",
                    self.step.kind, self.step.id
                ),
            )
            .for_step(&self.step.id),
        );
    }

    fn mistyped(&mut self, field: &str, expected: &str) {
        self.issues.push(
            ValidationIssue::error(
                IssueCode::SchemaFieldType,
                format!(
                    "{} step {:?} field {field:?} must be {expected}",
                    self.step.kind, self.step.id
                ),
            )
            .for_step(&self.step.id),
        );
    }

    fn require_nonempty_str(&mut self, field: &str) {
        match self.step.field(field) {
            None => self.missing(field),
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(_) => self.mistyped(field, "a non-empty string"),
        }
    }

    /// The FlowBuilder wire contract carries numeric quantities as strings
    /// (`"time": "24"`).
    fn require_numeric_str(&mut self, field: &str) {
        match self.step.field(field) {
            None => self.missing(field),
            Some(Value::String(s)) if s.trim().parse::<f64>().is_ok() => {}
            Some(_) => self.mistyped(field, "a numeric string"),
        }
    }

    fn require_period(&mut self, field: &str) {
        match self.step.field(field) {
            None => self.missing(field),
            Some(Value::String(s)) if TimePeriod::from_canonical(s).is_some() => {}
            Some(_) => self.mistyped(field, "one of Seconds, Minutes, Hours, Days"),
        }
    }

    fn require_enum(&mut self, field: &str, allowed: &[&str]) {
        match self.step.field(field) {
            None => self.missing(field),
            Some(Value::String(s)) if allowed.contains(&s.as_str()) => {}
            Some(_) => {
                let expected = format!("one of {}", allowed.join(", "));
                self.mistyped(field, &expected);
            }
        }
    }

    fn require_nonempty_array(&mut self, field: &str) {
        match self.step.field(field) {
            None => self.missing(field),
            Some(Value::Array(items)) if !items.is_empty() => {}
            Some(_) => self.mistyped(field, "a non-empty array"),
        }
    }

    fn require_properties(&mut self, field: &str) {
        match self.step.field(field) {
            None => self.missing(field),
            Some(Value::Array(items)) if !items.is_empty() => {
                let well_formed = items.iter().all(|item| {
                    item.as_object()
                        .is_some_and(|o| o.contains_key("name") && o.contains_key("value"))
                });
                if !well_formed {
                    self.mistyped(field, "an array of {name, value} objects");
                }
            }
            Some(_) => self.mistyped(field, "a non-empty array"),
        }
    }

    fn require_after(&mut self, field: &str) {
        match self.step.field(field) {
            None => self.missing(field),
            Some(value) if crate::flow::AfterWindow::from_value(value).is_some() => {}
            Some(_) => self.mistyped(field, "an object with a positive value and a unit"),
        }
    }
}
