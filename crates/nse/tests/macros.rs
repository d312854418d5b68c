//! Macro expansion and hygiene (spec §8 scenario 5): a macro body is spliced
//! in unevaluated, so each occurrence of a captured expression re-evaluates
//! independently rather than sharing a single evaluated result.

use nse::{equals, Interpreter, Value};

#[test]
fn macro_argument_is_re_evaluated_at_each_use_site() {
    let src = "(def-macro (twice x) (list 'do x x)) (let [(c 0)] (twice (let [] (+ c 1))))";
    let result = Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"));
    assert!(equals(&result, &Value::I64(1)).is_equal());
}

#[test]
fn macro_expands_before_its_arguments_are_evaluated() {
    // `when` rewrites to `(if cond (do body…) ())`; if `body` were evaluated
    // eagerly before expansion, this would raise a name-error for `boom`.
    let src = r#"
        (def-macro (when cond body) (list 'if cond body))
        (when false boom)
    "#;
    let result = Interpreter::new().eval_str("test", src).unwrap_or_else(|e| panic!("eval failed: {e}"));
    assert!(equals(&result, &Value::Unit).is_equal());
}
