//! Human-readable rendering of validation reports, plus tracing setup.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::validation::{Severity, ValidationReport};

pub const ERROR_COLOR: &str = "\x1b[31m"; // red
pub const WARNING_COLOR: &str = "\x1b[33m"; // yellow
pub const GRADE_COLOR: &str = "\x1b[32m"; // green
pub const RESET_COLOR: &str = "\x1b[0m";

/// Whether [`render_report`] emits ANSI color codes.
///
/// `Auto` (the default) colors only when stderr is a terminal; `Plain` is
/// the right choice when the block is headed for a log file or a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    #[default]
    Auto,
    Colored,
    Plain,
}

impl FormatterMode {
    /// Resolve `Auto` to a concrete mode from the current stderr.
    pub fn auto_detect() -> Self {
        if std::io::stderr().is_terminal() {
            FormatterMode::Colored
        } else {
            FormatterMode::Plain
        }
    }

    /// `Auto` re-checks the terminal every time, so a redirected stderr
    /// switches the output to plain without any caller involvement.
    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// Render a validation report as a short human-readable block.
#[must_use]
pub fn render_report(report: &ValidationReport, mode: FormatterMode) -> String {
    let colored = mode.is_colored();
    let color = |code: &'static str| if colored { code } else { "" };
    let reset = if colored { RESET_COLOR } else { "" };

    let mut out = String::new();
    out.push_str(&format!(
        "{}Quality: {}/100 (grade {}){}\n",
        color(GRADE_COLOR),
        report.quality_score,
        report.grade,
        reset
    ));
    out.push_str(&format!(
        "Verdict: {} ({} errors, {} warnings)\n",
        if report.is_valid { "valid" } else { "invalid" },
        report.error_count(),
        report.warning_count()
    ));
    for issue in &report.issues {
        let (tint, tag) = match issue.severity {
            Severity::Error => (color(ERROR_COLOR), "error"),
            Severity::Warning => (color(WARNING_COLOR), "warning"),
        };
        out.push_str(&format!("  {tint}{tag}{reset} {issue}\n"));
    }
    for suggestion in &report.suggestions {
        out.push_str(&format!("  hint: {suggestion}\n"));
    }
    out
}

/// Install a global tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call more than once; only the first call wins.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{IssueCode, ValidationIssue};

    fn sample_report() -> ValidationReport {
        ValidationReport::new(
            vec![
                ValidationIssue::error(IssueCode::DanglingReference, "event points nowhere")
                    .for_step("m1")
                    .for_event("e1"),
                ValidationIssue::warning(IssueCode::UnreachableStep, "orphan step").for_step("x"),
            ],
            72,
            vec!["close the flow with an end step".into()],
        )
    }

    #[test]
    fn plain_mode_has_no_ansi_codes() {
        let rendered = render_report(&sample_report(), FormatterMode::Plain);
        assert!(!rendered.contains('\x1b'));
        assert!(rendered.contains("Quality: 72/100 (grade C)"));
        assert!(rendered.contains("1 errors, 1 warnings"));
        assert!(rendered.contains("DANGLING_REFERENCE"));
        assert!(rendered.contains("hint: close the flow"));
    }

    #[test]
    fn colored_mode_wraps_severities() {
        let rendered = render_report(&sample_report(), FormatterMode::Colored);
        assert!(rendered.contains(ERROR_COLOR));
        assert!(rendered.contains(WARNING_COLOR));
        assert!(rendered.contains(RESET_COLOR));
    }
}
