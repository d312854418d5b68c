//! Reader boundary behaviors (spec §4.3, §4.10).

use nse::{ExcType, Interpreter, Value};

#[test]
fn a_decimal_point_always_reads_as_a_float_even_with_a_zero_fraction() {
    let result = Interpreter::new().eval_str("test", "1.0").unwrap_or_else(|e| panic!("eval failed: {e}"));
    match result {
        Value::F64(f) => assert_eq!(f, 1.0),
        other => panic!("expected a float literal, got {other}"),
    }
}

#[test]
fn an_integer_literal_without_a_decimal_point_reads_as_an_integer() {
    let result = Interpreter::new().eval_str("test", "1").unwrap_or_else(|e| panic!("eval failed: {e}"));
    match result {
        Value::I64(i) => assert_eq!(i, 1),
        other => panic!("expected an integer literal, got {other}"),
    }
}

#[test]
fn a_bare_type_quote_in_constructor_field_position_is_a_syntax_error() {
    // Constructor fields need the `(name ^type)` shape; a bare `^type` alone
    // is neither a field-name symbol nor that two-element form.
    let mut interp = Interpreter::new();
    let err = interp.eval_str("test", "(def-data thing (mk ^i64))").unwrap_err();
    assert_eq!(err.kind, ExcType::SyntaxError);
}
