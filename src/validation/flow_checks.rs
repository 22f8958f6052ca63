//! Layer-two flow validation: graph-level structure and termination.
//!
//! Rules run in a fixed order over steps in insertion order, so repeated
//! validation of the same flow produces byte-identical reports.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use super::report::{IssueCode, Severity, ValidationIssue};
use super::schema::SPLIT_ACTIONS;
use crate::flow::{CampaignFlow, EventType, FlowGraph, StepType};

/// Severity assigned to cycle findings.
///
/// Cycles through delay or scheduling steps are sometimes intentional
/// (drip campaigns), so the default only warns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopPolicy {
    #[default]
    Warn,
    Error,
}

impl LoopPolicy {
    fn severity(self) -> Severity {
        match self {
            LoopPolicy::Warn => Severity::Warning,
            LoopPolicy::Error => Severity::Error,
        }
    }
}

/// Knobs for the flow validator.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlowOptions {
    pub loop_policy: LoopPolicy,
}

/// Validate graph-level rules: id uniqueness, referential integrity, event
/// shape, terminal steps, reachability, termination, and segment branching.
#[must_use]
pub fn check_flow(flow: &CampaignFlow, options: &FlowOptions) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let has_duplicates = check_uniqueness(flow, &mut issues);
    let has_dangling = check_references(flow, &mut issues);
    check_event_shapes(flow, &mut issues);
    check_terminals(flow, &mut issues);

    // Traversal checks need an unambiguous index; with duplicate ids any
    // reachability or loop finding would be guesswork.
    if !has_duplicates {
        if let Ok(graph) = FlowGraph::new(flow) {
            check_reachability(flow, &graph, &mut issues);
            // With dangling edges the real path structure is unknown, and a
            // termination finding would just restate the dangling reference.
            if !has_dangling {
                check_termination(flow, &graph, options, &mut issues);
            }
        }
    }
    check_segment_branches(flow, &mut issues);

    issues
}

fn check_uniqueness(flow: &CampaignFlow, issues: &mut Vec<ValidationIssue>) -> bool {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for id in flow.step_ids() {
        *counts.entry(id).or_default() += 1;
    }
    let mut reported = FxHashSet::default();
    for id in flow.step_ids() {
        let count = counts[id];
        if count > 1 && reported.insert(id) {
            issues.push(
                ValidationIssue::error(
                    IssueCode::DuplicateId,
                    format!("step id {id:?} is used by {count} steps"),
                )
                .for_step(id),
            );
        }
    }

    // Event ids only need to be unique within their own step.
    for step in &flow.steps {
        let mut seen = FxHashSet::default();
        for event in &step.events {
            if !event.id.is_empty() && !seen.insert(event.id.as_str()) {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::DuplicateId,
                        format!(
                            "event id {:?} is used more than once in step {:?}",
                            event.id, step.id
                        ),
                    )
                    .for_step(&step.id)
                    .for_event(&event.id),
                );
            }
        }
    }

    !reported.is_empty()
}

fn check_references(flow: &CampaignFlow, issues: &mut Vec<ValidationIssue>) -> bool {
    let mut found = false;
    let known: FxHashSet<&str> = flow.step_ids().collect();

    if !known.contains(flow.initial_step_id.as_str()) {
        found = true;
        let shown = if flow.initial_step_id.is_empty() {
            "initialStepID is empty".to_string()
        } else {
            format!(
                "initialStepID {:?} does not match any step",
                flow.initial_step_id
            )
        };
        issues.push(ValidationIssue::error(IssueCode::DanglingReference, shown));
    }

    for step in &flow.steps {
        for event in &step.events {
            if !known.contains(event.next_step_id.as_str()) {
                found = true;
                let shown = if event.next_step_id.is_empty() {
                    format!("event {:?} of step {:?} has no nextStepID", event.id, step.id)
                } else {
                    format!(
                        "event {:?} of step {:?} points to unknown step {:?}",
                        event.id, step.id, event.next_step_id
                    )
                };
                issues.push(
                    ValidationIssue::error(IssueCode::DanglingReference, shown)
                        .for_step(&step.id)
                        .for_event(&event.id),
                );
            }
        }
    }
    found
}

fn check_event_shapes(flow: &CampaignFlow, issues: &mut Vec<ValidationIssue>) {
    for step in &flow.steps {
        for event in &step.events {
            let missing: Option<String> = match event.kind {
                EventType::Reply => event
                    .intent
                    .as_deref()
                    .is_none_or(|s| s.trim().is_empty())
                    .then(|| format!("reply event {:?} has no intent", event.id)),
                EventType::NoReply => event
                    .after_window()
                    .is_none()
                    .then(|| format!("noreply event {:?} has no valid wait window", event.id)),
                EventType::Split => {
                    let label_ok = event.label.as_deref().is_some_and(|s| !s.trim().is_empty());
                    let action_ok = event
                        .action
                        .as_deref()
                        .is_some_and(|s| SPLIT_ACTIONS.contains(&s));
                    (!label_ok || !action_ok).then(|| {
                        format!(
                            "split event {:?} needs a label and an include/exclude action",
                            event.id
                        )
                    })
                }
                EventType::Default => None,
            };
            if let Some(message) = missing {
                issues.push(
                    ValidationIssue::error(IssueCode::EventFieldMissing, message)
                        .for_step(&step.id)
                        .for_event(&event.id),
                );
            }
        }
    }
}

fn check_terminals(flow: &CampaignFlow, issues: &mut Vec<ValidationIssue>) {
    for step in &flow.steps {
        if step.kind.is_end() && !step.events.is_empty() {
            issues.push(
                ValidationIssue::error(
                    IssueCode::EndHasEvents,
                    format!(
                        "end step {:?} has {} outgoing events",
                        step.id,
                        step.events.len()
                    ),
                )
                .for_step(&step.id),
            );
        }
    }
}

fn check_reachability(
    flow: &CampaignFlow,
    graph: &FlowGraph<'_>,
    issues: &mut Vec<ValidationIssue>,
) {
    let reached = graph.reachable_from(&flow.initial_step_id);
    for step in &flow.steps {
        if !reached.contains(step.id.as_str()) {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::UnreachableStep,
                    format!("step {:?} is not reachable from the entry point", step.id),
                )
                .for_step(&step.id),
            );
        }
    }
}

/// Cycle detection plus end-reachability.
///
/// A back edge during DFS flags the revisited step as a possible loop (once
/// per step). Separately, if any step reachable from the entry point cannot
/// reach an `end` step, every walk through it runs forever or stalls, so a
/// single unterminated-path warning names the first such step.
fn check_termination(
    flow: &CampaignFlow,
    graph: &FlowGraph<'_>,
    options: &FlowOptions,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut looped: Vec<&str> = Vec::new();
    let mut flagged = FxHashSet::default();
    let mut visited = FxHashSet::default();
    let mut on_path = FxHashSet::default();
    // Explicit stack: (step id, next event index to expand).
    let mut stack: Vec<(&str, usize)> = Vec::new();

    if graph.contains(flow.initial_step_id.as_str()) {
        let start = flow.initial_step_id.as_str();
        visited.insert(start);
        on_path.insert(start);
        stack.push((start, 0));
    }
    while let Some((id, cursor)) = stack.pop() {
        let events = match graph.outgoing_events(id) {
            Ok(events) => events,
            Err(_) => continue,
        };
        let Some(event) = events.get(cursor) else {
            on_path.remove(id);
            continue;
        };
        stack.push((id, cursor + 1));
        let Some(next) = graph.step_by_id(&event.next_step_id) else {
            continue;
        };
        let next_id = next.id.as_str();
        if on_path.contains(next_id) {
            if flagged.insert(next_id) {
                looped.push(next_id);
            }
        } else if visited.insert(next_id) {
            on_path.insert(next_id);
            stack.push((next_id, 0));
        }
    }

    // Deterministic output: loop findings in step insertion order.
    for step in &flow.steps {
        if !flagged.contains(step.id.as_str()) {
            continue;
        }
        let severity = options.loop_policy.severity();
        let issue = ValidationIssue {
            severity,
            code: IssueCode::PossibleInfiniteLoop,
            step_id: Some(step.id.clone()),
            event_id: None,
            message: format!("step {:?} can be revisited along a cycle", step.id),
        };
        issues.push(issue);
    }

    let can_reach_end = end_reaching_steps(flow, graph);
    let reached = graph.reachable_from(&flow.initial_step_id);
    let stranded = flow
        .steps
        .iter()
        .find(|s| reached.contains(s.id.as_str()) && !can_reach_end.contains(s.id.as_str()));
    if let Some(step) = stranded {
        // A warning like the loop finding: reminder-style cycles that never
        // close are suspicious but intentionally shippable.
        issues.push(
            ValidationIssue::warning(
                IssueCode::UnterminatedPath,
                format!("no path from step {:?} reaches an end step", step.id),
            )
            .for_step(&step.id),
        );
    }
}

/// Steps from which some `end` step is reachable (BFS over reverse edges).
fn end_reaching_steps<'a>(flow: &'a CampaignFlow, graph: &FlowGraph<'a>) -> FxHashSet<&'a str> {
    let mut incoming: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for step in &flow.steps {
        for event in &step.events {
            if graph.contains(&event.next_step_id) {
                incoming
                    .entry(event.next_step_id.as_str())
                    .or_default()
                    .push(step.id.as_str());
            }
        }
    }

    let mut reaching = FxHashSet::default();
    let mut queue = VecDeque::new();
    for step in &flow.steps {
        if step.kind.is_end() && reaching.insert(step.id.as_str()) {
            queue.push_back(step.id.as_str());
        }
    }
    while let Some(id) = queue.pop_front() {
        if let Some(sources) = incoming.get(id) {
            for &source in sources {
                if reaching.insert(source) {
                    queue.push_back(source);
                }
            }
        }
    }
    reaching
}

fn check_segment_branches(flow: &CampaignFlow, issues: &mut Vec<ValidationIssue>) {
    for step in &flow.steps {
        if step.kind != StepType::Segment {
            continue;
        }
        let splits: Vec<_> = step
            .events
            .iter()
            .filter(|e| e.kind == EventType::Split)
            .collect();
        if splits.is_empty() {
            continue;
        }
        let has_include = splits.iter().any(|e| e.action.as_deref() == Some("include"));
        let has_exclude = splits.iter().any(|e| e.action.as_deref() == Some("exclude"));
        if splits.len() < 2 || !has_include || !has_exclude {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::SegmentBranchMismatch,
                    format!(
                        "segment step {:?} splits without complementary include/exclude branches",
                        step.id
                    ),
                )
                .for_step(&step.id),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Event, Step, TimeUnit};
    use serde_json::json;

    fn issues_for(flow: &CampaignFlow) -> Vec<ValidationIssue> {
        check_flow(flow, &FlowOptions::default())
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<IssueCode> {
        issues.iter().map(|i| i.code).collect()
    }

    fn message_to(id: &str, next: &str) -> Step {
        Step::new(id, StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new(format!("{id}-out"), EventType::Default, next))
    }

    #[test]
    fn valid_linear_flow_is_clean() {
        let flow = CampaignFlow::new(
            "m1",
            vec![message_to("m1", "end"), Step::new("end", StepType::End)],
        );
        assert!(issues_for(&flow).is_empty());
    }

    #[test]
    fn duplicate_ids_suppress_graph_checks() {
        let flow = CampaignFlow::new(
            "a",
            vec![
                message_to("a", "a"),
                Step::new("a", StepType::End),
                Step::new("orphan", StepType::End),
            ],
        );
        let issues = issues_for(&flow);
        assert!(codes(&issues).contains(&IssueCode::DuplicateId));
        assert!(!codes(&issues).contains(&IssueCode::UnreachableStep));
        assert!(!codes(&issues).contains(&IssueCode::PossibleInfiniteLoop));
    }

    #[test]
    fn duplicate_event_ids_within_a_step_are_errors() {
        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new("e1", EventType::Default, "end"))
            .with_event(Event::new("e1", EventType::Default, "end"));
        let flow = CampaignFlow::new("m1", vec![step, Step::new("end", StepType::End)]);
        let issues = issues_for(&flow);
        let dup = issues
            .iter()
            .find(|i| i.code == IssueCode::DuplicateId)
            .unwrap();
        assert!(dup.is_error());
        assert_eq!(dup.step_id.as_deref(), Some("m1"));
        assert_eq!(dup.event_id.as_deref(), Some("e1"));
    }

    #[test]
    fn dangling_references_cover_entry_and_events() {
        let flow = CampaignFlow::new("ghost", vec![message_to("m1", "nowhere")]);
        let issues = issues_for(&flow);
        let dangling: Vec<_> = issues
            .iter()
            .filter(|i| i.code == IssueCode::DanglingReference)
            .collect();
        assert_eq!(dangling.len(), 2);
        assert_eq!(dangling[0].step_id, None);
        assert_eq!(dangling[1].step_id.as_deref(), Some("m1"));
    }

    #[test]
    fn event_shape_rules() {
        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new("r", EventType::Reply, "end"))
            .with_event(Event::new("n", EventType::NoReply, "end"))
            .with_event(Event::new("s", EventType::Split, "end"));
        let flow = CampaignFlow::new("m1", vec![step, Step::new("end", StepType::End)]);
        let issues = issues_for(&flow);
        let shapes: Vec<_> = issues
            .iter()
            .filter(|i| i.code == IssueCode::EventFieldMissing)
            .collect();
        assert_eq!(shapes.len(), 3);

        let step = Step::new("m1", StepType::Message)
            .with_field("messageText", json!("hi"))
            .with_event(Event::new("r", EventType::Reply, "end").with_intent("interested"))
            .with_event(Event::new("n", EventType::NoReply, "end").with_after(24.0, TimeUnit::Hours))
            .with_event(Event::new("s", EventType::Split, "end").with_split("vip", "include"));
        let flow = CampaignFlow::new("m1", vec![step, Step::new("end", StepType::End)]);
        assert!(
            issues_for(&flow)
                .iter()
                .all(|i| i.code != IssueCode::EventFieldMissing)
        );
    }

    #[test]
    fn end_steps_must_be_terminal() {
        let end = Step::new("end", StepType::End)
            .with_event(Event::new("oops", EventType::Default, "end"));
        let flow = CampaignFlow::new("end", vec![end]);
        assert!(codes(&issues_for(&flow)).contains(&IssueCode::EndHasEvents));
    }

    #[test]
    fn orphan_steps_warn_unreachable() {
        let flow = CampaignFlow::new(
            "m1",
            vec![
                message_to("m1", "end"),
                Step::new("end", StepType::End),
                message_to("orphan", "end"),
            ],
        );
        let issues = issues_for(&flow);
        let orphan = issues
            .iter()
            .find(|i| i.code == IssueCode::UnreachableStep)
            .unwrap();
        assert_eq!(orphan.step_id.as_deref(), Some("orphan"));
        assert_eq!(orphan.severity, Severity::Warning);
    }

    #[test]
    fn cycle_with_exit_warns_by_default() {
        // m1 -> m2 -> m1, with m2 also branching to end.
        let m2 = Step::new("m2", StepType::Message)
            .with_field("messageText", json!("again"))
            .with_event(Event::new("back", EventType::Default, "m1"))
            .with_event(Event::new("done", EventType::Default, "end"));
        let flow = CampaignFlow::new(
            "m1",
            vec![message_to("m1", "m2"), m2, Step::new("end", StepType::End)],
        );
        let issues = issues_for(&flow);
        let loops: Vec<_> = issues
            .iter()
            .filter(|i| i.code == IssueCode::PossibleInfiniteLoop)
            .collect();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].severity, Severity::Warning);
        assert!(!codes(&issues).contains(&IssueCode::UnterminatedPath));

        let strict = check_flow(
            &flow,
            &FlowOptions {
                loop_policy: LoopPolicy::Error,
            },
        );
        assert!(
            strict
                .iter()
                .any(|i| i.code == IssueCode::PossibleInfiniteLoop && i.is_error())
        );
    }

    #[test]
    fn cycle_without_exit_is_unterminated() {
        let flow = CampaignFlow::new(
            "m1",
            vec![message_to("m1", "m2"), message_to("m2", "m1")],
        );
        let issues = issues_for(&flow);
        assert!(codes(&issues).contains(&IssueCode::PossibleInfiniteLoop));
        let stranded = issues
            .iter()
            .find(|i| i.code == IssueCode::UnterminatedPath)
            .unwrap();
        assert_eq!(stranded.severity, Severity::Warning);
        assert_eq!(stranded.step_id.as_deref(), Some("m1"));
    }

    #[test]
    fn segment_needs_complementary_branches() {
        let seg = Step::new("seg", StepType::Segment)
            .with_field("conditions", json!([{"field": "vip"}]))
            .with_event(Event::new("s1", EventType::Split, "end").with_split("vip", "include"));
        let flow = CampaignFlow::new("seg", vec![seg, Step::new("end", StepType::End)]);
        let issues = issues_for(&flow);
        assert!(codes(&issues).contains(&IssueCode::SegmentBranchMismatch));

        let seg = Step::new("seg", StepType::Segment)
            .with_field("conditions", json!([{"field": "vip"}]))
            .with_event(Event::new("s1", EventType::Split, "end").with_split("vip", "include"))
            .with_event(Event::new("s2", EventType::Split, "end").with_split("rest", "exclude"));
        let flow = CampaignFlow::new("seg", vec![seg, Step::new("end", StepType::End)]);
        assert!(
            issues_for(&flow)
                .iter()
                .all(|i| i.code != IssueCode::SegmentBranchMismatch)
        );
    }

    #[test]
    fn output_is_deterministic() {
        let flow = CampaignFlow::new(
            "ghost",
            vec![
                message_to("m1", "nowhere"),
                message_to("m1", "also-nowhere"),
                Step::new("end", StepType::End),
            ],
        );
        let first = serde_json::to_string(&issues_for(&flow)).unwrap();
        for _ in 0..5 {
            assert_eq!(serde_json::to_string(&issues_for(&flow)).unwrap(), first);
        }
    }
}
