//! Closure capture (spec §8 scenario 1, and mutual-recursion boundary law).

use nse::{equals, Interpreter, Value};

fn eval(src: &str) -> Value {
    Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"))
}

#[test]
fn closure_captures_enclosing_let_binding() {
    let result = eval("(let [(x 10)] ((fn () x)))");
    assert!(equals(&result, &Value::I64(10)).is_equal());
}

#[test]
fn mutually_recursive_let_closures_observe_each_other() {
    let src = "(let [(f (fn (n) (if (= n 0) 0 (g (- n 1))))) (g (fn (n) (f n)))] (f 3))";
    let result = eval(src);
    assert!(equals(&result, &Value::I64(0)).is_equal());
}

#[test]
fn scope_does_not_leak_bindings_introduced_inside_a_form() {
    let mut interp = Interpreter::new();
    interp.eval_str("test", "(let [(x 1)] x)").unwrap();
    let err = interp.eval_str("test", "x").unwrap_err();
    assert_eq!(err.kind, nse::ExcType::NameError);
}
