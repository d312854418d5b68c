//! Compound type-quotes and instance-typed constructor fields (spec §4.10):
//! `^(generic-name param…)` resolves to an `Instance` type, and a
//! constructor field declared with one only accepts an actual that is an
//! instance of the same generic with equivalent parameters.

use nse::{equals, Interpreter, Value};

fn eval(src: &str) -> Value {
    Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"))
}

#[test]
fn instance_formal_accepts_a_matching_instance() {
    let src = "
        (def-data (wrap a) (wrap (val ^a)))
        (def-data holder (mk (w ^(wrap i64))))
        (match (mk (wrap 5)) ((mk (wrap v)) v))
    ";
    let result = eval(src);
    assert!(equals(&result, &Value::I64(5)).is_equal());
}

#[test]
fn instance_formal_rejects_a_mismatched_instance() {
    let mut interp = Interpreter::new();
    interp.eval_str("test", "(def-data (wrap a) (wrap (val ^a)))").unwrap();
    interp.eval_str("test", "(def-data holder (mk (w ^(wrap i64))))").unwrap();
    let err = interp.eval_str("test", "(mk (wrap \"x\"))").unwrap_err();
    assert_eq!(err.kind, nse::ExcType::DomainError);
}
