//! Parsing of raw model output into a [`CampaignFlow`].
//!
//! Models wrap JSON in prose and markdown fences, truncate closing braces,
//! and occasionally return no JSON at all. The policy here is strict parse
//! first, then exactly one bounded textual repair pass and one re-parse.
//! Anything still unparseable is the orchestrator's problem (regenerate
//! with feedback), never a crash.

use miette::Diagnostic;
use thiserror::Error;

use crate::flow::CampaignFlow;

/// Why raw model output could not become a flow.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    /// Both the strict parse and the repaired re-parse failed.
    #[error("model output is not valid flow JSON: {source}")]
    #[diagnostic(
        code(flowsmith::parse::invalid_json),
        help("The repaired candidate is preserved for the attempt record.")
    )]
    InvalidJson {
        source: serde_json::Error,
        /// What the repair pass produced, kept for diagnostics.
        repaired: String,
    },

    /// The output contains no `{...}` region at all.
    #[error("model output contains no JSON object")]
    #[diagnostic(code(flowsmith::parse::no_json_found))]
    NoJsonFound,
}

/// Parse raw model output, repairing common wrapping damage once.
pub fn parse_flow(raw: &str) -> Result<CampaignFlow, ParseError> {
    if let Ok(flow) = serde_json::from_str::<CampaignFlow>(raw) {
        return Ok(flow);
    }

    let candidate = extract_json(raw).ok_or(ParseError::NoJsonFound)?;
    let repaired = balance_delimiters(candidate);
    serde_json::from_str(&repaired).map_err(|source| ParseError::InvalidJson { source, repaired })
}

/// Strip markdown fences and prose: keep the outermost `{...}` region.
fn extract_json(raw: &str) -> Option<&str> {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline.
        text = stripped
            .split_once('\n')
            .map_or(stripped, |(_, rest)| rest);
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }
    let start = text.find('{')?;
    let end = text.rfind('}').map_or(text.len(), |i| i + 1);
    if end <= start {
        // An opening brace after the last closing one: keep the tail and
        // let the balancer close it.
        return Some(&text[start..]);
    }
    Some(&text[start..end])
}

/// Append the closing delimiters a truncated response dropped.
///
/// Scans outside string literals, tracking nesting; unmatched openers get
/// closed in reverse order. Already-balanced input passes through verbatim.
fn balance_delimiters(candidate: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in candidate.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut repaired = String::with_capacity(candidate.len() + stack.len() + 1);
    repaired.push_str(candidate);
    if in_string {
        repaired.push('"');
    }
    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }
    repaired
}
