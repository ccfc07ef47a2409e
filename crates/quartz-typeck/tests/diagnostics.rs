//! Rendering tests for Quartz checker diagnostics.
//!
//! Each test triggers a specific error, renders it through the ariadne
//! pipeline and checks the pieces that matter: the exact message line, the
//! error code, the labels and the help text. Messages are pinned with
//! inline snapshots.

use quartz_ast::build::*;
use quartz_ast::Item;
use quartz_typeck::config::CheckConfig;
use quartz_typeck::diagnostics::{error_code, render_diagnostic, render_error};
use quartz_typeck::error::{AnalysisError, Diagnostic};

// ── Helpers ────────────────────────────────────────────────────────────

fn first_error(items: Vec<Item>) -> Diagnostic {
    let program = program(items);
    match quartz_typeck::check(&program) {
        Err(AnalysisError::Diagnostic(diagnostic)) => diagnostic,
        other => panic!("expected a diagnostic, got {:?}", other.map(|r| r.result_type)),
    }
}

fn render(items: Vec<Item>, source: &str) -> String {
    render_diagnostic(&first_error(items), source, "test.qz")
}

// ── Messages ───────────────────────────────────────────────────────────

#[test]
fn test_message_undefined_local() {
    let diagnostic = first_error(vec![ident("something").into()]);
    insta::assert_snapshot!(diagnostic.message(), @"undefined local variable or method 'something'");
}

#[test]
fn test_message_wrong_arity() {
    let diagnostic = first_error(vec![
        def("foo", vec![param("x")], vec![ident("x")]).into(),
        ident("foo").into(),
    ]);
    insta::assert_snapshot!(diagnostic.message(), @"wrong number of arguments for 'foo' (0 for 1)");
}

#[test]
fn test_message_arity_range() {
    let diagnostic = first_error(vec![
        def("foo", vec![param("x"), param_default("y", int(1))], vec![]).into(),
        call("foo", vec![int(1), int(2), int(3)]).into(),
    ]);
    insta::assert_snapshot!(diagnostic.message(), @"wrong number of arguments for 'foo' (3 for 1..2)");
}

#[test]
fn test_message_external_mismatch() {
    let diagnostic = first_error(vec![
        lib("Foo", vec![fun("foo", vec![fun_param("x", ty("Char"))], None)]).into(),
        call_on(path("Foo"), "foo", vec![int(1)]).into(),
    ]);
    insta::assert_snapshot!(diagnostic.message(), @"argument #1 to Foo.foo must be Char, not Int");
}

#[test]
fn test_message_value_class_ivar() {
    let diagnostic = first_error(vec![
        class("Int", None, vec![def("foo", vec![], vec![assign_ivar("a", int(1))])]).into(),
        call_on(int(2), "foo", vec![]).into(),
    ]);
    insta::assert_snapshot!(diagnostic.message(), @"can't use instance variables inside Int");
}

#[test]
fn test_message_op_assign() {
    let diagnostic = first_error(vec![op_assign("a", "*", int(2)).into()]);
    insta::assert_snapshot!(diagnostic.message(), @"'*=' before definition of 'a'");
}

// ── Rendering ──────────────────────────────────────────────────────────

#[test]
fn test_render_contains_message_and_code() {
    let source = "1.foo";
    let output = render(vec![call_on(int(1), "foo", vec![]).at(1, 1).into()], source);
    assert!(output.contains("undefined method 'foo' for Int"), "{}", output);
    assert!(output.contains("E0002"), "{}", output);
    assert!(output.contains("Int has no method `foo`"), "{}", output);
    assert!(output.contains("test.qz"), "{}", output);
}

#[test]
fn test_render_shows_help() {
    let source = "something";
    let output = render(vec![ident("something").at(1, 1).into()], source);
    assert!(output.to_lowercase().contains("help"), "{}", output);
    assert!(output.contains("def something"), "{}", output);
}

#[test]
fn test_render_points_at_widening() {
    let source = "lib Lib\nf = 'a'\nLib.bar(f)\nf = 1";
    let diagnostic = first_error(vec![
        lib("Lib", vec![fun("bar", vec![fun_param("c", ty("Char"))], None)])
            .at(1, 1)
            .into(),
        assign("f", char('a')).at(2, 1).into(),
        call_on(path("Lib"), "bar", vec![ident("f")]).at(3, 1).into(),
        assign("f", int(1)).at(4, 1).into(),
    ]);
    let output = render_diagnostic(&diagnostic, source, "test.qz");
    assert!(
        output.contains("argument #1 to Lib.bar must be Char, not Char | Int"),
        "{}",
        output
    );
    assert!(output.contains("the variable was widened here"), "{}", output);
}

#[test]
fn test_render_error_uses_configured_file_name() {
    let diagnostic = first_error(vec![ident("x").at(1, 1).into()]);
    let config = CheckConfig {
        file_name: Some("main.qz".to_string()),
        ..CheckConfig::default()
    };
    let output = render_error(&AnalysisError::Diagnostic(diagnostic), "x", &config);
    assert!(output.contains("main.qz"), "{}", output);
    assert!(!output.contains("test.qz"), "{}", output);
}

#[test]
fn test_render_internal_error_is_one_line() {
    let output = render_error(
        &AnalysisError::IterationLimit { limit: 3 },
        "",
        &CheckConfig::default(),
    );
    insta::assert_snapshot!(output.trim_end(), @"error: internal error: inference did not reach a fixpoint within 3 checks");
}

#[test]
fn test_error_codes_follow_kind() {
    let undefined = first_error(vec![ident("x").into()]);
    let arity = first_error(vec![
        def("f", vec![param("x")], vec![]).into(),
        call("f", vec![]).into(),
    ]);
    assert_eq!(error_code(&undefined.kind), "E0001");
    assert_eq!(error_code(&arity.kind), "E0003");
}
