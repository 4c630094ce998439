//! Ariadne-based rendering for type errors.
//!
//! Each diagnostic renders with an error code, a terse message, a labeled
//! source span, and the stack of enclosing contexts (`In function ...`)
//! reproduced bottom-up the way conventional compilers print them. A
//! serializable summary form is provided for driver/LSP consumers.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use larch_common::{LineIndex, Position, Span};
use serde::Serialize;

use crate::error::{Diagnostic, TypeError};

/// Rendering options.
#[derive(Clone, Debug)]
pub struct DiagnosticOptions {
    pub color: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: false }
    }
}

// ── Error codes ────────────────────────────────────────────────────────

/// Assign a stable code to each error kind.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::OccursCheck { .. } => "E0002",
        TypeError::NoInstance { .. } => "E0003",
        TypeError::OverlappingInstances { .. } => "E0004",
        TypeError::AmbiguousType { .. } => "E0005",
        TypeError::MissingMethod { .. } => "E0006",
        TypeError::MethodNotInClass { .. } => "E0007",
        TypeError::DuplicateMethod { .. } => "E0008",
        TypeError::EscapingSkolem { .. } => "E0009",
        TypeError::UnboundVariable { .. } => "E0010",
        TypeError::NotAFunction { .. } => "E0011",
        TypeError::ClauseArityMismatch { .. } => "E0012",
        TypeError::NoSuchClass { .. } => "E0013",
        TypeError::ClassArityMismatch { .. } => "E0014",
        TypeError::NoSuchFamily { .. } => "E0015",
        TypeError::FamilyArityMismatch { .. } => "E0016",
        TypeError::UnboundFamilyRhsVar { .. } => "E0017",
        TypeError::GivenInstanceCollision { .. } => "E0018",
        TypeError::UnsolvedConstraint { .. } => "E0019",
    }
}

/// The short label placed on the primary span.
fn primary_label(err: &TypeError) -> String {
    match err {
        TypeError::Mismatch { expected, found } => {
            format!("expected `{}`, found `{}`", expected, found)
        }
        TypeError::OccursCheck { .. } => "recursive type here".to_string(),
        TypeError::NoInstance { pred } => format!("no instance for `{}`", pred),
        TypeError::OverlappingInstances { pred, .. } => {
            format!("ambiguous instance choice for `{}`", pred)
        }
        TypeError::AmbiguousType { pred } => {
            format!("`{}` constrains no known type", pred)
        }
        TypeError::UnboundVariable { .. } => "not found in this scope".to_string(),
        TypeError::NotAFunction { ty } => format!("`{}` is not a function", ty),
        TypeError::EscapingSkolem { var, .. } => {
            format!("`{}` would escape its scope", var)
        }
        TypeError::UnsolvedConstraint { pred } => {
            format!("could not deduce `{}`", pred)
        }
        other => format!("{}", other),
    }
}

/// The range the primary label attaches to: the diagnostic's own span, or
/// the whole file when inference had no span to record.
fn primary_range(span: Option<Span>, source_len: usize) -> Range<usize> {
    match span {
        Some(s) => s.label_range(source_len),
        None => 0..source_len,
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Render one diagnostic to a formatted string.
pub fn render_diagnostic(
    diag: &Diagnostic,
    source: &str,
    _filename: &str,
    options: &DiagnosticOptions,
) -> String {
    let config = Config::default().with_color(options.color);
    let range = primary_range(diag.span, source.len());

    let mut builder = Report::build(ReportKind::Error, range.clone())
        .with_code(error_code(&diag.error))
        .with_message(format!("{}", diag.error))
        .with_config(config)
        .with_label(
            Label::new(range)
                .with_message(primary_label(&diag.error))
                .with_color(Color::Red),
        );

    let mut notes: Vec<String> = Vec::new();
    if let TypeError::OverlappingInstances { candidates, .. } = &diag.error {
        for c in candidates {
            notes.push(format!("matching instance: `{}`", c));
        }
    }
    // Context notes render innermost-first, the way the checker pushed them.
    notes.extend(diag.notes.iter().rev().cloned());
    if !notes.is_empty() {
        builder = builder.with_note(notes.join("\n"));
    }

    let mut buf = Vec::new();
    let cache = Source::from(source);
    builder
        .finish()
        .write(cache, &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

/// Render every diagnostic in order.
pub fn render_all(
    diags: &[Diagnostic],
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> Vec<String> {
    diags
        .iter()
        .map(|d| render_diagnostic(d, source, filename, options))
        .collect()
}

// ── Machine-readable export ────────────────────────────────────────────

/// A flattened, serializable view of a diagnostic.
#[derive(Debug, Serialize)]
pub struct DiagnosticSummary {
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
    /// Line/column of the span start, when a line index is available.
    pub position: Option<Position>,
    pub notes: Vec<String>,
}

impl DiagnosticSummary {
    pub fn new(diag: &Diagnostic, line_index: Option<&LineIndex>) -> DiagnosticSummary {
        let position = match (diag.span, line_index) {
            (Some(span), Some(idx)) => Some(idx.position(span.lo)),
            _ => None,
        };
        DiagnosticSummary {
            code: error_code(&diag.error),
            message: format!("{}", diag.error),
            span: diag.span,
            position,
            notes: diag.notes.clone(),
        }
    }
}

/// Serialize diagnostics to a JSON array for driver consumers.
pub fn diagnostics_to_json(diags: &[Diagnostic], source: Option<&str>) -> String {
    let index = source.map(LineIndex::new);
    let summaries: Vec<DiagnosticSummary> = diags
        .iter()
        .map(|d| DiagnosticSummary::new(d, index.as_ref()))
        .collect();
    serde_json::to_string_pretty(&summaries).expect("diagnostic summaries serialize")
}
