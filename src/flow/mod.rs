//! Campaign flow data model and read-only graph operations.
//!
//! A [`CampaignFlow`] is a directed graph of typed [`Step`]s connected by
//! [`Event`]s. The types in [`model`] are the wire contract consumed by the
//! downstream execution engine; [`graph`] layers read-only traversal on top
//! without ever mutating or dropping data.

pub mod graph;
pub mod model;

pub use graph::{FlowGraph, MalformedGraphError};
pub use model::{
    AfterWindow, CampaignFlow, Event, EventType, Step, StepType, TimePeriod, TimeUnit,
    UnknownEnumError,
};
