//! Integration tests for rejected programs.
//!
//! Each test builds a program tree, runs `quartz_typeck::check()` and
//! asserts on the single diagnostic it reports. Messages are compared
//! exactly: they are part of the checker's contract.

use quartz_ast::build::*;
use quartz_ast::Item;
use quartz_typeck::error::{AnalysisError, Diagnostic, DiagnosticKind};
use quartz_typeck::ty::Ty;

// ── Helpers ────────────────────────────────────────────────────────────

/// Check a program that must be rejected and return its diagnostic.
fn check_err(items: Vec<Item>) -> Diagnostic {
    let program = program(items);
    match quartz_typeck::check(&program) {
        Ok(result) => panic!(
            "expected an error, got result type {:?}",
            result.result_type
        ),
        Err(AnalysisError::Diagnostic(diagnostic)) => diagnostic,
        Err(other) => panic!("expected a diagnostic, got: {}", other),
    }
}

/// Assert the program is rejected with exactly `expected` as its message.
fn assert_error(items: Vec<Item>, expected: &str) {
    let diagnostic = check_err(items);
    assert_eq!(
        diagnostic.message(),
        expected,
        "unexpected diagnostic: {:?}",
        diagnostic
    );
}

fn class_with(name: &str, superclass: Option<&str>, defs: Vec<Vec<quartz_ast::Def>>) -> Item {
    class(name, superclass, defs.concat()).into()
}

// ── Name Resolution ────────────────────────────────────────────────────

#[test]
fn test_undefined_local_inside_called_method() {
    assert_error(
        vec![
            def("foo", vec![], vec![assign("a", ident("something"))]).into(),
            def("bar", vec![], vec![ident("foo")]).into(),
            ident("bar").into(),
        ],
        "undefined local variable or method 'something'",
    );
}

#[test]
fn test_undefined_method_with_parens() {
    assert_error(vec![call("foo", vec![]).into()], "undefined method 'foo'");
}

#[test]
fn test_bare_identifier_reports_arity() {
    assert_error(
        vec![
            def("foo", vec![param("x")], vec![ident("x")]).into(),
            ident("foo").into(),
        ],
        "wrong number of arguments for 'foo' (0 for 1)",
    );
}

#[test]
fn test_class_method_not_visible_at_top_level() {
    assert_error(
        vec![
            class_with("Int", None, vec![vec![def("foo", vec![], vec![int(1)])]]),
            ident("foo").into(),
        ],
        "undefined local variable or method 'foo'",
    );
}

#[test]
fn test_undefined_method_names_receiver() {
    assert_error(
        vec![call_on(int(1), "foo", vec![]).into()],
        "undefined method 'foo' for Int",
    );
}

#[test]
fn test_undefined_method_on_class_receiver() {
    assert_error(
        vec![
            class_with("Foo", None, vec![]),
            call_on(path("Foo"), "bar", vec![]).into(),
        ],
        "undefined method 'bar' for Foo:Class",
    );
}

#[test]
fn test_undefined_constant_receiver() {
    assert_error(
        vec![call_on(path("Foo"), "new", vec![]).into()],
        "uninitialized constant Foo",
    );
}

#[test]
fn test_out_outside_external_call_needs_variable() {
    assert_error(
        vec![out("a").into()],
        "undefined local variable or method 'a'",
    );
}

// ── Classes ────────────────────────────────────────────────────────────

#[test]
fn test_unknown_superclass() {
    assert_error(
        vec![class_with("Foo", Some("Bar"), vec![])],
        "uninitialized constant Bar",
    );
}

#[test]
fn test_superclass_mismatch() {
    assert_error(
        vec![
            class_with("Foo", None, vec![]),
            class_with("Bar", None, vec![]),
            class_with("Foo", Some("Bar"), vec![]),
        ],
        "superclass mismatch for class Foo (Bar for Object)",
    );
}

#[test]
fn test_reopening_without_superclass_is_fine() {
    let program = program(vec![
        class_with("Bar", None, vec![]),
        class_with("Foo", Some("Bar"), vec![]),
        class_with("Foo", None, vec![vec![def("foo", vec![], vec![int(1)])]]),
        call_on(call_on(path("Foo"), "new", vec![]), "foo", vec![]).into(),
    ]);
    let result = quartz_typeck::check(&program).unwrap();
    assert_eq!(result.result_type, Some(Ty::int()));
}

#[test]
fn test_new_without_initialize_takes_no_arguments() {
    assert_error(
        vec![
            class_with("Foo", None, vec![]),
            call_on(path("Foo"), "new", vec![int(1)]).into(),
        ],
        "wrong number of arguments for 'new' (1 for 0)",
    );
}

#[test]
fn test_wrong_type_argument_count() {
    let diagnostic = check_err(vec![call_on(
        generic_path("Pointer", vec![ty("Int"), ty("Char")]),
        "malloc",
        vec![int(1)],
    )
    .into()]);
    assert!(matches!(
        diagnostic.kind,
        DiagnosticKind::WrongTypeArgumentCount { given: 2, expected: 1, .. }
    ));
}

// ── Instance Variables ─────────────────────────────────────────────────

#[test]
fn test_ivar_at_top_level() {
    assert_error(
        vec![
            def("foo", vec![], vec![assign_ivar("a", int(1))]).into(),
            ident("foo").into(),
        ],
        "can't use instance variables at the top level",
    );
}

#[test]
fn test_ivar_inside_value_class() {
    assert_error(
        vec![
            class_with(
                "Int",
                None,
                vec![vec![def("foo", vec![], vec![assign_ivar("a", int(1))])]],
            ),
            call_on(int(2), "foo", vec![]).into(),
        ],
        "can't use instance variables inside Int",
    );
}

#[test]
fn test_ivar_inside_struct() {
    assert_error(
        vec![
            struct_(
                "Point",
                vec![def("initialize", vec![], vec![assign_ivar("x", int(0))])],
            )
            .into(),
            call_on(path("Point"), "new", vec![]).into(),
        ],
        "can't use instance variables inside Point",
    );
}

// ── Overloads ──────────────────────────────────────────────────────────

#[test]
fn test_primitive_overload_mismatch() {
    let diagnostic = check_err(vec![binop(int(1), "+", char('a')).into()]);
    assert_eq!(diagnostic.message(), "no overload matches");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::NoOverloadMatches {
            name: "+".to_string(),
            args: vec![Ty::char()],
        }
    );
}

#[test]
fn test_union_argument_must_match_for_every_member() {
    let diagnostic = check_err(vec![
        def("foo", vec![param_typed("x", ty("Int"))], vec![]).into(),
        call("foo", vec![or(int(1), double(1.5))]).into(),
    ]);
    assert_eq!(diagnostic.message(), "no overload matches");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::NoOverloadMatches {
            name: "foo".to_string(),
            args: vec![Ty::double()],
        }
    );
}

#[test]
fn test_union_argument_order_does_not_matter() {
    let diagnostic = check_err(vec![
        def("foo", vec![param_typed("x", ty("Int"))], vec![]).into(),
        call("foo", vec![or(double(1.5), int(1))]).into(),
    ]);
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::NoOverloadMatches {
            name: "foo".to_string(),
            args: vec![Ty::double()],
        }
    );
}

#[test]
fn test_two_union_arguments_distribute() {
    assert_error(
        vec![
            def(
                "foo",
                vec![param_typed("x", ty("Int")), param_typed("y", ty("Int"))],
                vec![],
            )
            .into(),
            def(
                "foo",
                vec![param_typed("x", ty("Int")), param_typed("y", ty("Double"))],
                vec![],
            )
            .into(),
            call(
                "foo",
                vec![or(int(1), char('a')), or(int(1), double(1.5))],
            )
            .into(),
        ],
        "no overload matches",
    );
}

#[test]
fn test_union_receiver_needs_method_on_every_member() {
    assert_error(
        vec![
            class_with("Foo", None, vec![]),
            class_with("Bar", Some("Foo"), vec![vec![def("foo", vec![], vec![nil()])]]),
            assign(
                "x",
                or(
                    call_on(path("Foo"), "new", vec![]),
                    call_on(path("Bar"), "new", vec![]),
                ),
            )
            .into(),
            call_on(ident("x"), "foo", vec![]).into(),
        ],
        "undefined method 'foo' for Foo",
    );
}

#[test]
fn test_arity_is_checked_across_all_overloads() {
    assert_error(
        vec![
            def("foo", vec![param("x")], vec![]).into(),
            def("foo", vec![param("x"), param("y")], vec![]).into(),
            call("foo", vec![]).into(),
        ],
        "wrong number of arguments for 'foo' (0 for 1)",
    );
}

// ── External Functions ─────────────────────────────────────────────────

fn lib_foo(params: Vec<quartz_ast::FunParam>) -> Item {
    lib("Foo", vec![fun("foo", params, None)]).into()
}

#[test]
fn test_external_argument_type() {
    assert_error(
        vec![
            lib_foo(vec![fun_param("x", ty("Char"))]),
            call_on(path("Foo"), "foo", vec![int(1)]).into(),
        ],
        "argument #1 to Foo.foo must be Char, not Int",
    );
}

#[test]
fn test_external_out_parameter_needs_out() {
    assert_error(
        vec![
            lib("Foo", vec![fun("x", vec![fun_out("c", ty("Int"))], None)]).into(),
            assign("a", int(1)).into(),
            call_on(path("Foo"), "x", vec![ident("a")]).into(),
        ],
        "argument #1 to Foo.x must be passed as 'out'",
    );
}

#[test]
fn test_external_arity() {
    assert_error(
        vec![
            lib_foo(vec![fun_param("x", ty("Char"))]),
            call_on(path("Foo"), "foo", vec![]).into(),
        ],
        "wrong number of arguments for 'foo' (0 for 1)",
    );
}

#[test]
fn test_unknown_external_function() {
    assert_error(
        vec![
            lib_foo(vec![]),
            call_on(path("Foo"), "bar", vec![]).into(),
        ],
        "undefined method 'bar' for Foo",
    );
}

#[test]
fn test_external_parameter_type_must_exist() {
    assert_error(
        vec![lib_foo(vec![fun_param("x", ty("Missing"))])],
        "uninitialized constant Missing",
    );
}

// ── Intrinsics ─────────────────────────────────────────────────────────

#[test]
fn test_ptr_of_non_variable() {
    assert_error(
        vec![call_on(ident("a"), "ptr", vec![]).into()],
        "can only get 'ptr' of variable or instance variable",
    );
}

#[test]
fn test_ptr_of_literal() {
    let diagnostic = check_err(vec![call_on(int(1), "ptr", vec![]).into()]);
    assert_eq!(diagnostic.kind, DiagnosticKind::PointerOfNonVariable);
}

#[test]
fn test_ptr_takes_no_arguments() {
    assert_error(
        vec![
            assign("a", int(1)).into(),
            call_on(ident("a"), "ptr", vec![int(1)]).into(),
        ],
        "wrong number of arguments for 'ptr' (1 for 0)",
    );
}

#[test]
fn test_ptr_takes_no_block() {
    assert_error(
        vec![
            assign("a", int(1)).into(),
            with_block(call_on(ident("a"), "ptr", vec![]), &[], vec![]).into(),
        ],
        "'ptr' can't receive a block",
    );
}

#[test]
fn test_malloc_without_type_argument() {
    assert_error(
        vec![call_on(path("Pointer"), "malloc", vec![int(1)]).into()],
        "can't malloc pointer without type, use Pointer(Type).malloc(size)",
    );
}

// ── Control Flow and Assignment ────────────────────────────────────────

#[test]
fn test_break_outside_loop() {
    assert_error(vec![break_().into()], "Invalid break");
}

#[test]
fn test_next_outside_loop_inside_method() {
    assert_error(
        vec![
            def("foo", vec![], vec![next_()]).into(),
            ident("foo").into(),
        ],
        "Invalid next",
    );
}

#[test]
fn test_op_assign_before_definition() {
    assert_error(
        vec![op_assign("a", "+", int(1)).into()],
        "'+=' before definition of 'a'",
    );
}

// ── Reporting ──────────────────────────────────────────────────────────

#[test]
fn test_first_error_in_source_order_wins() {
    let diagnostic = check_err(vec![
        def("foo", vec![], vec![ident("inner")]).into(),
        ident("outer").into(),
        ident("foo").into(),
    ]);
    assert_eq!(
        diagnostic.message(),
        "undefined local variable or method 'inner'"
    );
    assert_eq!(diagnostic.location.line, 1);
}

#[test]
fn test_diagnostic_points_at_failing_expression() {
    let diagnostic = check_err(vec![
        assign("a", int(1)).into(),
        call_on(ident("a"), "foo", vec![]).at(2, 3).into(),
    ]);
    assert_eq!(diagnostic.location.line, 2);
    assert_eq!(diagnostic.location.column, 3);
    assert_eq!(&*diagnostic.location.file, "test.qz");
}

#[test]
fn test_uncalled_method_is_not_checked() {
    let program = program(vec![
        def("foo", vec![], vec![ident("missing")]).into(),
        int(1).into(),
    ]);
    assert!(quartz_typeck::check(&program).is_ok());
}

// ── Never-Assigned Variables ───────────────────────────────────────────

#[test]
fn test_call_on_unassigned_ivar_is_checked_against_nil() {
    let diagnostic = check_err(vec![
        class(
            "Foo",
            None,
            vec![def("foo", vec![], vec![call_on(ivar("a"), "bar", vec![])])],
        )
        .into(),
        call_on(call_on(path("Foo"), "new", vec![]), "foo", vec![]).into(),
    ]);
    assert_eq!(diagnostic.message(), "undefined method 'bar' for Nil");
    assert_eq!(diagnostic.related, None);
}

#[test]
fn test_unassigned_ivar_passed_as_argument() {
    assert_error(
        vec![
            def("twice", vec![param_typed("x", ty("Int"))], vec![]).into(),
            class(
                "Foo",
                None,
                vec![def("foo", vec![], vec![call("twice", vec![ivar("a")])])],
            )
            .into(),
            call_on(call_on(path("Foo"), "new", vec![]), "foo", vec![]).into(),
        ],
        "no overload matches",
    );
}

#[test]
fn test_call_on_unassigned_block_parameter() {
    assert_error(
        vec![
            def("run", vec![], vec![]).into(),
            with_block(
                call("run", vec![]),
                &["x"],
                vec![call_on(ident("x"), "no_such_method", vec![])],
            )
            .into(),
        ],
        "undefined method 'no_such_method' for Nil",
    );
}
