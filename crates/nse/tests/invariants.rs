//! Invariants and round-trip laws named across the spec but not exercised by
//! any single feature test: vector-bounds checking (spec §4.6), instance
//! interning identity (spec §4.10), subtype reflexivity (spec §4.2), and the
//! syntax/print/read round trip (spec §3, §4.7).

use std::rc::Rc;

use nse::{equals, ExcType, Interpreter, Value};

#[test]
fn indexing_a_vector_out_of_bounds_raises_a_domain_error() {
    let mut interp = Interpreter::new();
    interp.eval_str("test", "(def v '(10 20 30))").unwrap();
    let err = interp.eval_str("test", "(v 5)").unwrap_err();
    assert_eq!(err.kind, ExcType::DomainError);
}

#[test]
fn get_instance_interns_by_generic_and_parameters() {
    let interp = Interpreter::new();
    let g = interp.types.create_generic(1, None);
    let a = interp.types.get_instance(&g, &[interp.types.i64_.clone()]).unwrap();
    let b = interp.types.get_instance(&g, &[interp.types.i64_.clone()]).unwrap();
    assert!(Rc::ptr_eq(&a, &b), "same (generic, params) must intern to the same `Type`");

    let c = interp.types.get_instance(&g, &[interp.types.string.clone()]).unwrap();
    assert!(!Rc::ptr_eq(&a, &c), "different parameters must intern to distinct `Type`s");
}

#[test]
fn is_subtype_of_is_reflexive_and_any_is_a_top_type() {
    let interp = Interpreter::new();
    assert!(interp.types.is_subtype_of(&interp.types.i64_, &interp.types.i64_));
    assert!(interp.types.is_subtype_of(&interp.types.string, &interp.types.string));
    assert!(interp.types.is_subtype_of(&interp.types.i64_, &interp.types.any));
    assert!(interp.types.is_subtype_of(&interp.types.string, &interp.types.any));
}

#[test]
fn printing_then_reading_a_scalar_round_trips() {
    for v in [Value::I64(-7), Value::String(Rc::from("hello, world"))] {
        let printed = v.to_string();
        let reread = Interpreter::new()
            .eval_str("test", &printed)
            .unwrap_or_else(|e| panic!("failed to re-read printed form `{printed}`: {e}"));
        assert!(equals(&v, &reread).is_equal(), "`{v}` did not round-trip through print+read, got `{reread}`");
    }
}

#[test]
fn reading_the_same_quoted_form_twice_yields_structurally_equal_data() {
    let a = Interpreter::new().eval_str("test", "'(1 2 \"three\")").unwrap_or_else(|e| panic!("eval failed: {e}"));
    let b = Interpreter::new().eval_str("test", "'(1 2 \"three\")").unwrap_or_else(|e| panic!("eval failed: {e}"));
    assert!(equals(&a, &b).is_equal(), "reading is deterministic: the same source must parse to an equal datum");
}
