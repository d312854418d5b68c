//! Tail-call rewriting (spec §4.9, §8 scenario 4): a self-recursive `def` in
//! tail position must not grow the native call stack.

use nse::{equals, Interpreter, Value};

#[test]
fn tail_recursive_def_runs_to_completion_without_overflow() {
    let src = "(def (count n) (if (= n 0) \"done\" (count (- n 1)))) (count 100000)";
    let result = Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"));
    assert!(equals(&result, &Value::String(std::rc::Rc::from("done"))).is_equal());
}

#[test]
fn tail_recursion_through_an_if_else_branch_also_loops() {
    let src = "(def (sum n acc) (if (= n 0) acc (sum (- n 1) (+ acc n)))) (sum 10000 0)";
    let result = Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"));
    assert!(equals(&result, &Value::I64(50_005_000)).is_equal());
}
