//! Multimethod dispatch (spec §4.8, §8 scenario 3).

use nse::{equals, Interpreter, Value};

#[test]
fn dispatches_on_first_argument_type() {
    let src = r#"
        (def-generic (describe x))
        (def-method (describe (x ^i64)) "int")
        (def-method (describe (x ^string)) "str")
        (list (describe 1) (describe "a"))
    "#;
    let mut interp = Interpreter::new();
    let result = interp.eval_str("test", src).unwrap();
    let expected = interp.eval_str("test", r#"'("int" "str")"#).unwrap();
    assert!(equals(&result, &expected).is_equal());
}

#[test]
fn no_matching_method_raises_domain_error() {
    let src = r#"
        (def-generic (describe x))
        (def-method (describe (x ^i64)) "int")
        (describe "unhandled")
    "#;
    let mut interp = Interpreter::new();
    let err = interp.eval_str("test", src).unwrap_err();
    assert_eq!(err.kind, nse::ExcType::DomainError);
}

#[test]
fn more_specific_method_wins_when_both_match() {
    let src = r#"
        (def-generic (speak x))
        (def-method (speak (x ^any)) "generic")
        (def-method (speak (x ^i64)) "specific")
        (speak 1)
    "#;
    let result = Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"));
    assert!(equals(&result, &Value::String(std::rc::Rc::from("specific"))).is_equal());
}
