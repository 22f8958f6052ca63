//! Prompt assembly for generation requests.

use super::client::PromptContext;
use crate::validation::{ValidationIssue, ValidationReport};

const SYSTEM_PREAMBLE: &str = "\
You are a campaign-flow designer for an SMS marketing platform. \
Produce exactly one JSON object describing the campaign flow and nothing \
else: no prose, no markdown fences.";

const WIRE_REMINDER: &str = "\
The JSON object must contain \"initialStepID\" and a \"steps\" array. Every \
step has \"id\", \"type\", \"active\", \"parameters\" and an \"events\" array; \
every event has \"id\", \"type\" and \"nextStepID\". Step types: message, \
segment, delay, schedule, experiment, rate_limit, limit, reply, no_reply, \
split, split_group, split_range, property, product_choice, purchase_offer, \
purchase, end. Event types: reply, noreply, split, default. Every path must \
reach an end step.";

/// Render the full prompt for one attempt.
#[must_use]
pub fn render_prompt(context: &PromptContext) -> String {
    let mut prompt = String::new();
    prompt.push_str(SYSTEM_PREAMBLE);
    prompt.push_str("\n\n");
    prompt.push_str(WIRE_REMINDER);

    if !context.template_hints.is_empty() {
        prompt.push_str("\n\nProven templates for similar campaigns:\n");
        for hint in &context.template_hints {
            prompt.push_str("- ");
            prompt.push_str(hint);
            prompt.push('\n');
        }
    }

    if !context.feedback.is_empty() {
        prompt.push_str("\n\nYour previous attempt had these problems; fix all of them:\n");
        for line in &context.feedback {
            prompt.push_str("- ");
            prompt.push_str(line);
            prompt.push('\n');
        }
    }

    prompt.push_str("\n\nCampaign description:\n");
    prompt.push_str(&context.description);
    prompt
}

/// One feedback line per issue, in report order, for the next prompt.
#[must_use]
pub fn feedback_lines(report: &ValidationReport) -> Vec<String> {
    report.issues.iter().map(feedback_line).collect()
}

fn feedback_line(issue: &ValidationIssue) -> String {
    match (&issue.step_id, &issue.event_id) {
        (Some(step), Some(event)) => {
            format!("{}: {} (step {step:?}, event {event:?})", issue.code, issue.message)
        }
        (Some(step), None) => format!("{}: {} (step {step:?})", issue.code, issue.message),
        _ => format!("{}: {}", issue.code, issue.message),
    }
}
