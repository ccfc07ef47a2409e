//! Ariadne-based rendering of checker diagnostics.
//!
//! The message line is exactly the diagnostic's message; the label under
//! the failing expression and the optional help line add context. When a
//! failure was exposed by a widening, a second label points at the
//! assignment that widened the variable.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use quartz_common::{LineIndex, Location};

use crate::config::CheckConfig;
use crate::error::{AnalysisError, Diagnostic, DiagnosticKind};

// ── Error Codes ────────────────────────────────────────────────────────

/// Assign a unique error code to each diagnostic kind.
pub fn error_code(kind: &DiagnosticKind) -> &'static str {
    match kind {
        DiagnosticKind::UndefinedLocalOrMethod { .. } => "E0001",
        DiagnosticKind::UndefinedMethod { .. } => "E0002",
        DiagnosticKind::WrongNumberOfArguments { .. } => "E0003",
        DiagnosticKind::NoOverloadMatches { .. } => "E0004",
        DiagnosticKind::ExternalArgTypeMismatch { .. } => "E0005",
        DiagnosticKind::ExternalArgModeMismatch { .. } => "E0006",
        DiagnosticKind::UninitializedConstant { .. } => "E0007",
        DiagnosticKind::SuperclassMismatch { .. } => "E0008",
        DiagnosticKind::InstanceVarOutsideClass => "E0009",
        DiagnosticKind::InstanceVarInValueType { .. } => "E0010",
        DiagnosticKind::InvalidControlFlow { .. } => "E0011",
        DiagnosticKind::GenericArgumentRequired { .. } => "E0012",
        DiagnosticKind::WrongTypeArgumentCount { .. } => "E0013",
        DiagnosticKind::PointerOfNonVariable => "E0014",
        DiagnosticKind::BlockNotAccepted { .. } => "E0015",
        DiagnosticKind::OpAssignBeforeDefinition { .. } => "E0016",
    }
}

// ── Labels and Help ────────────────────────────────────────────────────

/// The primary label text and an optional fix suggestion.
fn describe(kind: &DiagnosticKind) -> (String, Option<String>) {
    match kind {
        DiagnosticKind::UndefinedLocalOrMethod { name } => (
            format!("`{}` is neither a local variable nor a method here", name),
            Some(format!("assign `{}` before this point or define `def {}`", name, name)),
        ),
        DiagnosticKind::UndefinedMethod { name, owner } => match owner {
            Some(owner) => (format!("{} has no method `{}`", owner, name), None),
            None => (format!("no method `{}` is visible here", name), None),
        },
        DiagnosticKind::WrongNumberOfArguments {
            given, expected, ..
        } => {
            let help = if *given < expected.min {
                format!("missing {} argument(s)", expected.min - given)
            } else {
                format!("{} extra argument(s)", given - expected.max)
            };
            (format!("expected {} argument(s)", expected), Some(help))
        }
        DiagnosticKind::NoOverloadMatches { name, args } => {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            (
                format!("no overload of `{}` accepts ({})", name, args.join(", ")),
                Some("every member of a union argument must match some overload".to_string()),
            )
        }
        DiagnosticKind::ExternalArgTypeMismatch {
            expected, actual, ..
        } => (
            format!("found {}", actual),
            Some(format!("the parameter is declared as {}", expected)),
        ),
        DiagnosticKind::ExternalArgModeMismatch { .. } => (
            "passed by value".to_string(),
            Some("write `out var` to let the function assign the variable".to_string()),
        ),
        DiagnosticKind::UninitializedConstant { name } => {
            (format!("`{}` is not declared", name), None)
        }
        DiagnosticKind::SuperclassMismatch {
            class, existing, ..
        } => (
            "superclass given here".to_string(),
            Some(format!("`{}` already inherits from {}", class, existing)),
        ),
        DiagnosticKind::InstanceVarOutsideClass => (
            "no enclosing class".to_string(),
            Some("instance variables can only be used inside class methods".to_string()),
        ),
        DiagnosticKind::InstanceVarInValueType { class } => (
            format!("{} is a value type", class),
            Some("value types are copied and cannot hold instance variables".to_string()),
        ),
        DiagnosticKind::InvalidControlFlow { .. } => ("not inside a loop".to_string(), None),
        DiagnosticKind::GenericArgumentRequired { class, method } => (
            "type argument missing".to_string(),
            Some(format!("write `{}(Type).{}(size)`", class, method)),
        ),
        DiagnosticKind::WrongTypeArgumentCount { expected, .. } => {
            (format!("expected {} type argument(s)", expected), None)
        }
        DiagnosticKind::PointerOfNonVariable => ("not a variable".to_string(), None),
        DiagnosticKind::BlockNotAccepted { .. } => ("block given here".to_string(), None),
        DiagnosticKind::OpAssignBeforeDefinition { op, name } => (
            format!("`{}` is not defined yet", name),
            Some(format!("assign `{}` before using `{}`", name, op)),
        ),
    }
}

// ── Span Helpers ───────────────────────────────────────────────────────

/// Byte range covering the token that starts at `loc`.
fn location_range(loc: &Location, index: &LineIndex, source: &str) -> Range<usize> {
    let len = source.len();
    let Some(start) = index.offset(loc.line, loc.column) else {
        return 0..len.min(1);
    };
    let start = start as usize;
    let token = source
        .get(start..)
        .unwrap_or("")
        .char_indices()
        .take_while(|(_, c)| c.is_alphanumeric() || matches!(c, '_' | '@'))
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    // Ariadne needs a non-empty span wherever the source allows one.
    let end = (start + token.max(1)).min(len);
    start..end
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Render a diagnostic into a formatted string using ariadne.
///
/// The output is colorless for consistent test snapshots.
pub fn render_diagnostic(diagnostic: &Diagnostic, source: &str, filename: &str) -> String {
    let config = Config::default().with_color(false);
    let index = LineIndex::new(source);
    let span = location_range(&diagnostic.location, &index, source);
    let (label, help) = describe(&diagnostic.kind);

    let mut builder = Report::build(ReportKind::Error, (filename, span.clone()))
        .with_code(error_code(&diagnostic.kind))
        .with_message(diagnostic.message())
        .with_config(config)
        .with_label(
            Label::new((filename, span))
                .with_message(label)
                .with_color(Color::Red),
        );

    if let Some(related) = &diagnostic.related {
        if related.file == diagnostic.location.file && related.is_known() {
            let range = location_range(related, &index, source);
            builder.add_label(
                Label::new((filename, range))
                    .with_message("the variable was widened here")
                    .with_color(Color::Blue),
            );
        }
    }
    if let Some(help) = help {
        builder.set_help(help);
    }

    let report = builder.finish();
    let mut buf = Vec::new();
    report
        .write((filename, Source::from(source)), &mut buf)
        .expect("writing a diagnostic to memory cannot fail");
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render any analysis failure. Internal errors have no source position
/// and render as a single line.
pub fn render_error(error: &AnalysisError, source: &str, config: &CheckConfig) -> String {
    match error {
        AnalysisError::Diagnostic(diagnostic) => {
            let filename = config
                .file_name
                .clone()
                .unwrap_or_else(|| diagnostic.location.file.to_string());
            render_diagnostic(diagnostic, source, &filename)
        }
        AnalysisError::IterationLimit { .. } => format!("error: {}\n", error),
    }
}
