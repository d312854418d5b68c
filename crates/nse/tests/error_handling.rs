//! `try`/result wrapping (spec §5, §8 scenario 6): `try` never propagates an
//! error outward, instead wrapping the outcome as a tagged `result` value.

use nse::{equals, Interpreter, Value};
use pretty_assertions::assert_eq;

#[test]
fn try_wraps_a_domain_error_instead_of_raising() {
    let mut interp = Interpreter::new();
    let result = interp.eval_str("test", "(try (/ 1 0))").unwrap_or_else(|e| panic!("try itself raised: {e}"));
    let kind = interp
        .eval_str("test", "(match (try (/ 1 0)) ((error (k m f t)) k))")
        .unwrap_or_else(|e| panic!("eval failed: {e}"));
    match kind {
        Value::Symbol(s) => assert_eq!(s.name.as_ref(), "domain-error"),
        other => panic!("expected the error kind symbol, got {other}"),
    }
    // The outer `try` result is itself a tagged `error` value, not a raised error.
    assert!(!matches!(result, Value::Undefined));
}

#[test]
fn try_wraps_a_successful_result_as_ok() {
    let src = "(match (try (+ 1 2)) ((ok v) v))";
    let result = Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"));
    assert!(equals(&result, &Value::I64(3)).is_equal());
}

#[test]
fn try_captures_the_call_stack_at_the_point_of_the_error() {
    let mut interp = Interpreter::new();
    let trace = interp
        .eval_str("test", "(match (try (/ 1 0)) ((error (k m f t)) t))")
        .unwrap_or_else(|e| panic!("eval failed: {e}"));
    let Value::Vector(frames) = trace else { panic!("expected the trace vector, got {trace}") };
    let callees: Vec<String> = frames
        .0
        .iter()
        .map(|f| match f {
            Value::String(s) => s.to_string(),
            other => panic!("expected a callee-name string in the trace, got {other}"),
        })
        .collect();
    // The `try`'d form is itself syntax-wrapped (a `<form>` frame), then `/`
    // pushes a `<native>` frame before raising.
    assert_eq!(callees, vec!["<form>".to_string(), "<native>".to_string()]);
}

#[test]
fn try_never_propagates_an_error_to_its_caller() {
    let mut interp = Interpreter::new();
    assert!(interp.eval_str("test", "(try (/ 1 0))").is_ok());
    // Without `try`, the same division does raise.
    assert!(interp.eval_str("test", "(/ 1 0)").is_err());
}
