//! Wire-contract types for campaign flows.
//!
//! Field names and enum values here are consumed byte-for-byte by the
//! downstream flow execution engine (`initialStepID`, `nextStepID`,
//! `messageText`, ...). Step payloads are kept as a flattened raw map rather
//! than fully typed structs: the model output that feeds this engine is
//! untrusted, and a mistyped payload field must surface as a validation
//! issue with a step id attached, not as a parse failure for the whole
//! document. Dispatch stays compile-checked through the closed [`StepType`]
//! and [`EventType`] enums.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a `type` tag (or an enum-valued payload field) names a value
/// outside the closed FlowBuilder enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Closed enumeration of step types understood by the flow builder.
///
/// The wire form is the lowercase snake_case name (`"rate_limit"`,
/// `"purchase_offer"`, ...). Parsing is case-insensitive so that sloppy
/// model output (`"Message"`) still lands on the canonical tag; anything
/// outside the enumeration is rejected at parse time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepType {
    Message,
    Segment,
    Delay,
    Schedule,
    Experiment,
    RateLimit,
    Limit,
    Reply,
    NoReply,
    Split,
    SplitGroup,
    SplitRange,
    Property,
    ProductChoice,
    PurchaseOffer,
    Purchase,
    End,
}

impl StepType {
    pub const ALL: [StepType; 17] = [
        StepType::Message,
        StepType::Segment,
        StepType::Delay,
        StepType::Schedule,
        StepType::Experiment,
        StepType::RateLimit,
        StepType::Limit,
        StepType::Reply,
        StepType::NoReply,
        StepType::Split,
        StepType::SplitGroup,
        StepType::SplitRange,
        StepType::Property,
        StepType::ProductChoice,
        StepType::PurchaseOffer,
        StepType::Purchase,
        StepType::End,
    ];

    /// Canonical wire spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Message => "message",
            StepType::Segment => "segment",
            StepType::Delay => "delay",
            StepType::Schedule => "schedule",
            StepType::Experiment => "experiment",
            StepType::RateLimit => "rate_limit",
            StepType::Limit => "limit",
            StepType::Reply => "reply",
            StepType::NoReply => "no_reply",
            StepType::Split => "split",
            StepType::SplitGroup => "split_group",
            StepType::SplitRange => "split_range",
            StepType::Property => "property",
            StepType::ProductChoice => "product_choice",
            StepType::PurchaseOffer => "purchase_offer",
            StepType::Purchase => "purchase",
            StepType::End => "end",
        }
    }

    /// Returns `true` if this is a terminal [`End`](Self::End) step.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = UnknownEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_ascii_lowercase();
        let parsed = match folded.as_str() {
            "message" => StepType::Message,
            "segment" => StepType::Segment,
            "delay" => StepType::Delay,
            "schedule" => StepType::Schedule,
            "experiment" => StepType::Experiment,
            "rate_limit" | "ratelimit" => StepType::RateLimit,
            "limit" => StepType::Limit,
            "reply" => StepType::Reply,
            "no_reply" | "noreply" => StepType::NoReply,
            "split" => StepType::Split,
            "split_group" => StepType::SplitGroup,
            "split_range" => StepType::SplitRange,
            "property" => StepType::Property,
            "product_choice" => StepType::ProductChoice,
            "purchase_offer" => StepType::PurchaseOffer,
            "purchase" => StepType::Purchase,
            "end" => StepType::End,
            _ => return Err(UnknownEnumError::new("step type", s)),
        };
        Ok(parsed)
    }
}

impl TryFrom<String> for StepType {
    type Error = UnknownEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StepType> for String {
    fn from(value: StepType) -> Self {
        value.as_str().to_string()
    }
}

/// Trigger semantics carried by an outgoing edge.
///
/// Note the asymmetry inherited from the FlowBuilder contract: the *step*
/// type is spelled `"no_reply"` while the *event* type is spelled
/// `"noreply"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EventType {
    Reply,
    NoReply,
    Split,
    Default,
}

impl EventType {
    /// Canonical wire spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Reply => "reply",
            EventType::NoReply => "noreply",
            EventType::Split => "split",
            EventType::Default => "default",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_ascii_lowercase();
        let parsed = match folded.as_str() {
            "reply" => EventType::Reply,
            "noreply" | "no_reply" => EventType::NoReply,
            "split" => EventType::Split,
            "default" => EventType::Default,
            _ => return Err(UnknownEnumError::new("event type", s)),
        };
        Ok(parsed)
    }
}

impl TryFrom<String> for EventType {
    type Error = UnknownEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

/// Time period for `delay`, `rate_limit` and `limit` payloads.
///
/// Capitalized on the wire (`"Hours"`), unlike [`TimeUnit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimePeriod {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 4] = [
        TimePeriod::Seconds,
        TimePeriod::Minutes,
        TimePeriod::Hours,
        TimePeriod::Days,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Seconds => "Seconds",
            TimePeriod::Minutes => "Minutes",
            TimePeriod::Hours => "Hours",
            TimePeriod::Days => "Days",
        }
    }

    /// Exact-spelling check against the wire contract.
    #[must_use]
    pub fn from_canonical(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }
}

impl FromStr for TimePeriod {
    type Err = UnknownEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().to_ascii_lowercase() == folded)
            .ok_or_else(|| UnknownEnumError::new("time period", s))
    }
}

/// Time unit for `noreply` wait windows. Lowercase on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 4] = [
        TimeUnit::Seconds,
        TimeUnit::Minutes,
        TimeUnit::Hours,
        TimeUnit::Days,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }

    /// Exact-spelling check against the wire contract.
    #[must_use]
    pub fn from_canonical(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|u| u.as_str() == s)
    }
}

impl FromStr for TimeUnit {
    type Err = UnknownEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|u| u.as_str() == folded)
            .ok_or_else(|| UnknownEnumError::new("time unit", s))
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `noreply` wait window: `{"value": 24, "unit": "hours"}`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AfterWindow {
    pub value: f64,
    pub unit: TimeUnit,
}

impl AfterWindow {
    /// Tolerant extraction from a raw payload value.
    ///
    /// Accepts a numeric or numeric-string `value` and any casing of `unit`;
    /// returns `None` when the shape is wrong or the value is not positive.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let raw = obj.get("value")?;
        let value = raw
            .as_f64()
            .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))?;
        let unit: TimeUnit = obj.get("unit")?.as_str()?.parse().ok()?;
        (value > 0.0 && value.is_finite()).then_some(Self { value, unit })
    }

    #[must_use]
    pub fn as_hours(&self) -> f64 {
        match self.unit {
            TimeUnit::Seconds => self.value / 3600.0,
            TimeUnit::Minutes => self.value / 60.0,
            TimeUnit::Hours => self.value,
            TimeUnit::Days => self.value * 24.0,
        }
    }
}

/// A labeled outgoing edge from a [`Step`].
///
/// `active` and the type-specific fields stay optional in the model: the
/// validators report what is missing, and the auto-corrector fills in the
/// unambiguous defaults. A missing `id` deserializes as the empty string
/// and is synthesized deterministically during correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(rename = "nextStepID", default)]
    pub next_step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        kind: EventType,
        next_step_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            next_step_id: next_step_id.into(),
            active: None,
            intent: None,
            description: None,
            label: None,
            action: None,
            after: None,
        }
    }

    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    #[must_use]
    pub fn with_after(mut self, value: f64, unit: TimeUnit) -> Self {
        self.after = Some(serde_json::json!({ "value": value, "unit": unit.as_str() }));
        self
    }

    #[must_use]
    pub fn with_split(mut self, label: impl Into<String>, action: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self.action = Some(action.into());
        self
    }

    /// Missing `active` defaults to true downstream.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    /// Parsed wait window, if the `after` payload is well-formed.
    #[must_use]
    pub fn after_window(&self) -> Option<AfterWindow> {
        self.after.as_ref().and_then(AfterWindow::from_value)
    }
}

/// A typed unit of campaign behavior.
///
/// The type-specific payload (`messageText`, `time`/`period`, `conditions`,
/// ...) lives in the flattened `fields` map; see the module docs for why it
/// is not statically typed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Step {
    pub fn new(id: impl Into<String>, kind: StepType) -> Self {
        Self {
            id: id.into(),
            kind,
            active: None,
            parameters: None,
            events: Vec::new(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Missing `active` defaults to true downstream.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String payload field, or `None` when absent or not a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// The generated campaign artifact: a directed graph of steps.
///
/// Step order is irrelevant to the graph semantics but preserved for
/// deterministic serialization and validation output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampaignFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "initialStepID", default)]
    pub initial_step_id: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl CampaignFlow {
    pub fn new(initial_step_id: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: None,
            description: None,
            initial_step_id: initial_step_id.into(),
            steps,
        }
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }
}
