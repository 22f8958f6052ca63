//! Read-only graph operations over a [`CampaignFlow`].
//!
//! [`FlowGraph`] indexes a flow once and answers lookup and traversal
//! queries without ever mutating or dropping data. Inconsistencies that
//! make the index ambiguous (duplicate step ids) surface as
//! [`MalformedGraphError`] at construction time.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use thiserror::Error;

use super::model::{CampaignFlow, Event, Step};

/// Access-time inconsistencies in a flow graph.
#[derive(Debug, Error, Diagnostic)]
pub enum MalformedGraphError {
    /// Two steps share the same id, so lookups would be ambiguous.
    #[error("duplicate step id: {id:?}")]
    #[diagnostic(
        code(flowsmith::graph::duplicate_step_id),
        help("Step ids must be unique within a flow.")
    )]
    DuplicateStepId { id: String },

    /// A traversal was asked to start from an id that is not in the flow.
    #[error("unknown step id: {id:?}")]
    #[diagnostic(code(flowsmith::graph::unknown_step_id))]
    UnknownStepId { id: String },
}

/// Immutable index over a flow's steps and `nextStepID` edges.
#[derive(Debug)]
pub struct FlowGraph<'a> {
    flow: &'a CampaignFlow,
    by_id: FxHashMap<&'a str, &'a Step>,
}

impl<'a> FlowGraph<'a> {
    /// Build the index, rejecting flows with duplicate step ids.
    pub fn new(flow: &'a CampaignFlow) -> Result<Self, MalformedGraphError> {
        let mut by_id = FxHashMap::default();
        for step in &flow.steps {
            if by_id.insert(step.id.as_str(), step).is_some() {
                return Err(MalformedGraphError::DuplicateStepId {
                    id: step.id.clone(),
                });
            }
        }
        Ok(Self { flow, by_id })
    }

    #[must_use]
    pub fn step_by_id(&self, id: &str) -> Option<&'a Step> {
        self.by_id.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flow.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flow.steps.is_empty()
    }

    /// Outgoing events of a step.
    pub fn outgoing_events(&self, step_id: &str) -> Result<&'a [Event], MalformedGraphError> {
        self.step_by_id(step_id)
            .map(|step| step.events.as_slice())
            .ok_or_else(|| MalformedGraphError::UnknownStepId {
                id: step_id.to_string(),
            })
    }

    /// All step ids reachable from `start` by following `nextStepID` edges
    /// (BFS, `start` included when it exists). Edges pointing outside the
    /// flow are ignored here; the flow validator reports them separately.
    #[must_use]
    pub fn reachable_from(&self, start: &str) -> FxHashSet<&'a str> {
        let mut reached = FxHashSet::default();
        let mut queue = VecDeque::new();
        if let Some(step) = self.step_by_id(start) {
            reached.insert(step.id.as_str());
            queue.push_back(step);
        }
        while let Some(step) = queue.pop_front() {
            for event in &step.events {
                if let Some(next) = self.step_by_id(&event.next_step_id)
                    && reached.insert(next.id.as_str())
                {
                    queue.push_back(next);
                }
            }
        }
        reached
    }

    /// Every id the flow refers to: the entry point plus all `nextStepID`
    /// targets, whether or not they resolve.
    #[must_use]
    pub fn all_referenced_ids(&self) -> FxHashSet<&'a str> {
        let mut ids = FxHashSet::default();
        if !self.flow.initial_step_id.is_empty() {
            ids.insert(self.flow.initial_step_id.as_str());
        }
        for step in &self.flow.steps {
            for event in &step.events {
                if !event.next_step_id.is_empty() {
                    ids.insert(event.next_step_id.as_str());
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::model::{Event, EventType, StepType};

    fn linear_flow() -> CampaignFlow {
        CampaignFlow::new(
            "a",
            vec![
                Step::new("a", StepType::Message)
                    .with_event(Event::new("e1", EventType::Default, "b")),
                Step::new("b", StepType::Delay)
                    .with_event(Event::new("e1", EventType::Default, "end")),
                Step::new("end", StepType::End),
                Step::new("orphan", StepType::Message),
            ],
        )
    }

    #[test]
    fn duplicate_ids_fail_construction() {
        let flow = CampaignFlow::new(
            "x",
            vec![Step::new("x", StepType::Message), Step::new("x", StepType::End)],
        );
        let err = FlowGraph::new(&flow).unwrap_err();
        assert!(matches!(err, MalformedGraphError::DuplicateStepId { id } if id == "x"));
    }

    #[test]
    fn reachability_excludes_orphans() {
        let flow = linear_flow();
        let graph = FlowGraph::new(&flow).unwrap();
        let reached = graph.reachable_from("a");
        assert_eq!(reached.len(), 3);
        assert!(reached.contains("end"));
        assert!(!reached.contains("orphan"));
    }

    #[test]
    fn reachable_from_unknown_start_is_empty() {
        let flow = linear_flow();
        let graph = FlowGraph::new(&flow).unwrap();
        assert!(graph.reachable_from("missing").is_empty());
    }

    #[test]
    fn outgoing_events_rejects_unknown_ids() {
        let flow = linear_flow();
        let graph = FlowGraph::new(&flow).unwrap();
        assert_eq!(graph.outgoing_events("a").unwrap().len(), 1);
        assert!(graph.outgoing_events("nope").is_err());
    }

    #[test]
    fn referenced_ids_include_dangling_targets() {
        let mut flow = linear_flow();
        flow.steps[0].events[0].next_step_id = "ghost".into();
        let graph = FlowGraph::new(&flow).unwrap();
        let ids = graph.all_referenced_ids();
        assert!(ids.contains("ghost"));
        assert!(ids.contains("a"));
    }
}
