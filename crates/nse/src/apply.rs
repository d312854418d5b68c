//! The applicator (spec §4.6).
//!
//! Grounded on `ouros::function`'s call-dispatch shape (native vs. closure
//! vs. builtin-callable), generalized to NSE's four callable shapes (native
//! function pointer, closure, generic function, indexable vector).

use std::rc::Rc;

use crate::{
    error::{RunError, RunResult, StackFrame},
    interp::Interpreter,
    object::ClosureData,
    scope::Scope,
    value::{peek, Value},
};

/// Applies `callee` to `args` (spec §4.6). Argument evaluation, if any, has
/// already happened by the time this is called — `apply` only dispatches on
/// the callee's shape.
pub fn apply(interp: &mut Interpreter, callee: &Value, args: &[Value]) -> RunResult<Value> {
    match peek(callee) {
        Value::FunctionPointer(f) => {
            interp.errors.push_frame(StackFrame { callee: "<native>".to_string(), args: args.to_vec(), form: None });
            let f = Rc::clone(f);
            let result = f(interp, args);
            if result.is_ok() {
                interp.errors.pop_frame();
            }
            result
        }
        Value::Closure(c) => apply_closure(interp, &Rc::clone(c), args),
        Value::GenericFunction(g) => crate::generic::dispatch(interp, &Rc::clone(g), args),
        Value::Vector(v) if args.len() == 1 => {
            if let Value::I64(i) = peek(&args[0]) {
                if *i >= 0 && (*i as usize) < v.0.len() {
                    Ok(v.0[*i as usize].clone())
                } else {
                    Err(RunError::domain(format!("index {i} out of bounds for vector of length {}", v.0.len())))
                }
            } else {
                Err(RunError::domain("not a function"))
            }
        }
        _ => Err(RunError::domain("not a function")),
    }
}

fn apply_closure(interp: &mut Interpreter, c: &Rc<ClosureData>, args: &[Value]) -> RunResult<Value> {
    let name = c.name.borrow().as_ref().map_or_else(|| "<closure>".to_string(), |s| s.name.to_string());
    interp.errors.push_frame(StackFrame { callee: name, args: args.to_vec(), form: None });

    let Value::Vector(formals) = peek(&c.params) else {
        return Err(RunError::syntax("closure parameter list must be a vector"));
    };
    let formals = Rc::clone(formals);
    let captured = c.captured.clone();

    let scope = {
        let mut eval_cb = |s: &Scope, expr: &Value| crate::eval::eval(interp, s, expr);
        crate::pattern::assign_parameters(&captured, &formals.0, args, &mut eval_cb)
    };
    let scope = match scope {
        Ok(s) => s,
        Err(e) => return Err(e),
    };

    let result = crate::eval::eval_body(interp, &scope, &c.body);
    if result.is_ok() {
        interp.errors.pop_frame();
    }
    result
}
