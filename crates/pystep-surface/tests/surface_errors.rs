//! One rejection case per `BuildError` variant (SPEC_FULL §10.6), exercising
//! the IR-builder contract's reject-rather-than-normalize stance described
//! in this crate's module docs.

use pystep_core::error::BuildError;
use pystep_surface::lower;

#[test]
fn missing_else_is_rejected() {
    let err = lower("if x:\n    y = 1\npass\n").unwrap_err();
    assert!(matches!(err, BuildError::IfWithoutElse { .. }));
}

#[test]
fn elif_is_rejected_as_if_without_else() {
    let err = lower("if x:\n    y = 1\nelif z:\n    y = 2\nelse:\n    y = 3\n").unwrap_err();
    assert!(matches!(err, BuildError::IfWithoutElse { .. }));
}

#[test]
fn call_nested_in_expression_is_rejected() {
    let err = lower("x = f(1) + 1\n").unwrap_err();
    assert!(matches!(err, BuildError::CallInExpression { .. }));
}

#[test]
fn call_as_argument_is_also_rejected() {
    let err = lower("x = f(g(1))\n").unwrap_err();
    assert!(matches!(err, BuildError::CallInExpression { .. }));
}

#[test]
fn return_without_value_is_rejected() {
    let err = lower("def f():\n    return\n").unwrap_err();
    assert!(matches!(err, BuildError::ReturnWithoutValue { .. }));
}

#[test]
fn multi_target_assign_is_rejected() {
    let err = lower("x = y = 1\n").unwrap_err();
    assert!(matches!(err, BuildError::BadAssignTarget { .. }));
}

#[test]
fn subscript_assign_target_is_rejected() {
    let err = lower("x[0] = 1\n").unwrap_err();
    assert!(matches!(err, BuildError::BadAssignTarget { .. }));
}

#[test]
fn for_loop_is_rejected_as_unsupported() {
    let err = lower("for x in y:\n    pass\n").unwrap_err();
    assert!(matches!(err, BuildError::Unsupported { .. }));
}

#[test]
fn class_def_is_rejected_as_unsupported() {
    let err = lower("class C:\n    pass\n").unwrap_err();
    assert!(matches!(err, BuildError::Unsupported { .. }));
}

#[test]
fn aug_assign_is_rejected_as_unsupported() {
    let err = lower("x += 1\n").unwrap_err();
    assert!(matches!(err, BuildError::Unsupported { .. }));
}

#[test]
fn lambda_is_rejected_as_unsupported() {
    let err = lower("x = lambda: 1\n").unwrap_err();
    assert!(matches!(err, BuildError::Unsupported { .. }));
}

#[test]
fn default_parameter_is_rejected_as_unsupported() {
    let err = lower("def f(x=1):\n    return x\n").unwrap_err();
    assert!(matches!(err, BuildError::Unsupported { .. }));
}

#[test]
fn varargs_are_rejected_as_unsupported() {
    let err = lower("def f(*args):\n    return args\n").unwrap_err();
    assert!(matches!(err, BuildError::Unsupported { .. }));
}

#[test]
fn global_conflicting_with_nonlocal_is_a_scope_conflict() {
    let source = "\
def outer():
    def inner():
        nonlocal n
        global n
        return n
    n = 1
    return inner
";
    let err = lower(source).unwrap_err();
    assert!(matches!(err, BuildError::ScopeConflict { .. }));
}

#[test]
fn nonlocal_conflicting_with_global_is_also_a_scope_conflict() {
    let source = "\
def outer():
    def inner():
        global n
        nonlocal n
        return n
    n = 1
    return inner
";
    let err = lower(source).unwrap_err();
    assert!(matches!(err, BuildError::ScopeConflict { .. }));
}

#[test]
fn syntax_error_is_reported_as_unsupported() {
    let err = lower("def f(:\n").unwrap_err();
    assert!(matches!(err, BuildError::Unsupported { .. }));
}
