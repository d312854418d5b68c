//! Pattern matching, data destructuring, and parameter-binder grammar
//! (spec §4.4, §8 scenario 2).

use nse::{equals, Interpreter, Value};

fn eval(src: &str) -> Value {
    Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"))
}

#[test]
fn destructures_a_two_field_data_constructor() {
    let src = "(def-data (pair a b) (cons (fst ^a) (snd ^b))) (match (cons 1 \"x\") ((cons a b) b))";
    let result = eval(src);
    assert!(equals(&result, &Value::String(std::rc::Rc::from("x"))).is_equal());
}

#[test]
fn match_falls_through_to_a_later_case_on_mismatch() {
    let src = "(match 2 (1 \"one\") (2 \"two\") (3 \"three\"))";
    let result = eval(src);
    assert!(equals(&result, &Value::String(std::rc::Rc::from("two"))).is_equal());
}

#[test]
fn match_with_no_matching_case_raises_pattern_error() {
    let mut interp = Interpreter::new();
    let err = interp.eval_str("test", "(match 5 (1 \"one\"))").unwrap_err();
    assert_eq!(err.kind, nse::ExcType::PatternError);
}

#[test]
fn rest_parameter_collects_remaining_arguments() {
    let mut interp = Interpreter::new();
    interp.eval_str("test", "(def (pack &rest xs) xs)").unwrap();
    let result = interp.eval_str("test", "(pack 1 2 3)").unwrap();
    let expected = interp.eval_str("test", "'(1 2 3)").unwrap();
    assert!(equals(&result, &expected).is_equal());
}

#[test]
fn optional_parameter_falls_back_to_its_default_expression() {
    let src = "(def (greet &opt (who \"world\")) who) (greet)";
    let result = eval(src);
    assert!(equals(&result, &Value::String(std::rc::Rc::from("world"))).is_equal());
}
