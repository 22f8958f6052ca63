//! Validation outcome types: issues, grades, and the aggregate report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How badly an issue compromises the flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The flow cannot be safely executed.
    Error,
    /// The flow works but deviates from expected shape or practice.
    Warning,
}

/// Machine-readable issue classification.
///
/// The wire spelling (SCREAMING_SNAKE_CASE) is part of the report contract
/// consumed by downstream dashboards; never rename a variant's serialized
/// form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    SchemaFieldMissing,
    SchemaFieldType,
    DuplicateId,
    DanglingReference,
    EventFieldMissing,
    EndHasEvents,
    UnreachableStep,
    PossibleInfiniteLoop,
    UnterminatedPath,
    SegmentBranchMismatch,
}

impl IssueCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::SchemaFieldMissing => "SCHEMA_FIELD_MISSING",
            IssueCode::SchemaFieldType => "SCHEMA_FIELD_TYPE",
            IssueCode::DuplicateId => "DUPLICATE_ID",
            IssueCode::DanglingReference => "DANGLING_REFERENCE",
            IssueCode::EventFieldMissing => "EVENT_FIELD_MISSING",
            IssueCode::EndHasEvents => "END_HAS_EVENTS",
            IssueCode::UnreachableStep => "UNREACHABLE_STEP",
            IssueCode::PossibleInfiniteLoop => "POSSIBLE_INFINITE_LOOP",
            IssueCode::UnterminatedPath => "UNTERMINATED_PATH",
            IssueCode::SegmentBranchMismatch => "SEGMENT_BRANCH_MISMATCH",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding produced by one of the validation layers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            step_id: None,
            event_id: None,
            message: message.into(),
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            step_id: None,
            event_id: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    #[must_use]
    pub fn for_event(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(step_id) = &self.step_id {
            write!(f, " (step {step_id:?}")?;
            if let Some(event_id) = &self.event_id {
                write!(f, ", event {event_id:?}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Letter grade derived from the quality score.
///
/// Declared worst-first so the derived `Ord` ranks `A` highest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
}

impl Grade {
    /// Standard cutoffs: A >= 90, B >= 80, C >= 70, D >= 60.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Grade {
    type Err = crate::flow::UnknownEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            _ => Err(crate::flow::UnknownEnumError {
                kind: "grade",
                value: s.to_string(),
            }),
        }
    }
}

/// Aggregate outcome of all validation layers over one flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// `true` iff no error-severity issue was found.
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub quality_score: u8,
    pub grade: Grade,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn new(issues: Vec<ValidationIssue>, quality_score: u8, suggestions: Vec<String>) -> Self {
        let is_valid = !issues.iter().any(ValidationIssue::is_error);
        Self {
            is_valid,
            issues,
            quality_score,
            grade: Grade::from_score(quality_score),
            suggestions,
        }
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.is_valid
    }
}
