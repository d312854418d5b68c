//! The special-form evaluator (spec §4.7), tail-call rewriting (spec §4.9),
//! and the macro expander.
//!
//! Grounded on `ouros::expressions`'s big-match-on-node-kind shape for
//! `eval`/`eval_slice`, re-pointed from Python's statement/expression grammar
//! to NSE's much smaller special-form set. `try`/error-capture is grounded on
//! `ouros::exception_private`'s snapshot-the-stack-then-clear pattern.

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{RunError, RunResult, StackFrame},
    interp::Interpreter,
    object::{ClosureData, DataValue, GenericFunctionData, VectorData},
    scope::Scope,
    symbol::Symbol,
    types::Type,
    value::{peek, Value},
};

/// Evaluates `expr` in `scope` (spec §4.7 `eval`).
pub fn eval(interp: &mut Interpreter, scope: &Scope, expr: &Value) -> RunResult<Value> {
    if let Value::Syntax(s) = expr {
        interp.errors.push_frame(StackFrame { callee: "<form>".to_string(), args: Vec::new(), form: Some(expr.clone()) });
        let result = eval(interp, scope, &s.inner);
        if result.is_ok() {
            interp.errors.pop_frame();
        }
        return result;
    }
    match expr {
        Value::Unit | Value::Undefined | Value::I64(_) | Value::F64(_) | Value::String(_) | Value::Keyword(_) => {
            Ok(expr.clone())
        }
        // Quote yields its payload verbatim, unevaluated: `'x` (or `(quote
        // x)`) is the datum `x`, not a further-wrapped box. `Value::Quote`
        // as a *stored* value only survives where it is never run back
        // through `eval` (e.g. inside an unevaluated pattern).
        Value::Quote(inner) => Ok((**inner).clone()),
        Value::TypeQuote(inner) => crate::data::eval_type_expr(interp, &scope.module(), inner).map(Value::Type),
        Value::Symbol(s) => eval_symbol(interp, scope, s),
        Value::Vector(_) => eval_slice(interp, scope, expr),
        other => Ok(other.clone()),
    }
}

fn eval_symbol(interp: &mut Interpreter, scope: &Scope, s: &Symbol) -> RunResult<Value> {
    let _ = interp;
    let v = scope.get(s).ok_or_else(|| RunError::name(format!("undefined symbol `{s}`")))?;
    if let Value::GenericFunction(g) = &v {
        if g.context.borrow().is_none() {
            let g2 = GenericFunctionData {
                name: g.name.clone(),
                context: RefCell::new(Some(scope.module())),
                min_arity: g.min_arity,
                variadic: g.variadic,
                type_parameters: g.type_parameters,
                param_type_indices: g.param_type_indices.clone(),
            };
            return Ok(Value::GenericFunction(Rc::new(g2)));
        }
    }
    Ok(v)
}

/// Evaluates a sequence of forms as a block: each element, except a
/// `(let sym expr)` statement which threads a new binding through the rest
/// of the block (spec §4.7 `do`; applied uniformly to every block context —
/// `do`, closure/method bodies, `let` bodies, `match` case bodies — since
/// the spec describes it as a property of block evaluation generally).
pub fn eval_body(interp: &mut Interpreter, scope: &Scope, body: &[Value]) -> RunResult<Value> {
    let mut cur = scope.clone();
    let mut result = Value::Unit;
    for stmt in body {
        if let Value::Vector(v) = peek(stmt) {
            if v.0.len() == 3 {
                if let Value::Symbol(head) = peek(&v.0[0]) {
                    if head.name.as_ref() == "let" {
                        if let Value::Symbol(name) = peek(&v.0[1]) {
                            let value = eval(interp, &cur, &v.0[2])?;
                            cur = cur.push(name.clone(), value.clone());
                            result = value;
                            continue;
                        }
                    }
                }
            }
        }
        result = eval(interp, &cur, stmt)?;
    }
    Ok(result)
}

fn eval_slice(interp: &mut Interpreter, scope: &Scope, form: &Value) -> RunResult<Value> {
    let Value::Vector(v) = peek(form) else {
        return Err(RunError::syntax("expected a vector call form"));
    };
    if v.0.is_empty() {
        return Ok(Value::Unit);
    }
    let head = v.0[0].clone();
    let tail: Vec<Value> = v.0[1..].to_vec();

    if let Value::Symbol(s) = peek(&head).clone() {
        if let Some(home) = s.home.borrow().clone() {
            let found = home.borrow().macro_defs.get(&s);
            if let Some(mac) = found {
                let expanded = crate::apply::apply(interp, &mac, &tail)?;
                return eval(interp, scope, &expanded);
            }
        }
        match s.name.as_ref() {
            "if" => return sf_if(interp, scope, &tail),
            "let" => return sf_let(interp, scope, &tail),
            "match" => return sf_match(interp, scope, &tail),
            "do" => return eval_body(interp, scope, &tail),
            "fn" => return sf_fn(scope, &tail),
            "try" => return sf_try(interp, scope, &tail),
            "loop" => return sf_loop(interp, scope, &tail),
            "recur" | "continue" => return sf_continue(interp, scope, &tail),
            "def" => return sf_def(interp, scope, &tail),
            "def-macro" => return sf_def_macro(scope, &tail),
            "def-data" => return sf_def_data(interp, scope, &tail),
            "def-read-macro" => return sf_def_read_macro(interp, scope, &tail),
            "def-generic" => return sf_def_generic(scope, &tail),
            "def-method" => return sf_def_method(interp, scope, &tail),
            "quote" => return sf_quote(&tail),
            "backquote" => return sf_backquote(interp, scope, &tail),
            "unquote" => return Err(RunError::syntax("`unquote` used outside `backquote`")),
            "splice" => return Err(RunError::syntax("`splice` used outside `backquote`")),
            _ => {}
        }
    }

    let callee = eval(interp, scope, &head)?;
    let mut args = Vec::with_capacity(tail.len());
    for a in &tail {
        args.push(eval(interp, scope, a)?);
    }
    crate::apply::apply(interp, &callee, &args)
}

fn truthy(v: &Value) -> bool {
    matches!(peek(v), Value::Data(d) if d.tag.name.as_ref() == "true")
}

fn sf_if(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.len() < 2 || tail.len() > 3 {
        return Err(RunError::syntax("`if` expects (if cond then [else])"));
    }
    let c = eval(interp, scope, &tail[0])?;
    if truthy(&c) {
        eval(interp, scope, &tail[1])
    } else if tail.len() == 3 {
        eval(interp, scope, &tail[2])
    } else {
        Ok(Value::Unit)
    }
}

fn sf_let(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`let` expects ([bindings…]) body…"));
    }
    let Value::Vector(bindings) = peek(&tail[0]) else {
        return Err(RunError::syntax("`let` bindings must be a vector"));
    };
    let mut cur = scope.clone();

    // Pre-install weak bindings (holding `undefined`) for every bare-symbol
    // pattern so initializer closures may capture themselves or siblings
    // before those siblings' own initializers run (spec §5/§9).
    for b in &bindings.0 {
        let Value::Vector(pair) = peek(b) else {
            return Err(RunError::syntax("each `let` binding must be [pattern expr]"));
        };
        if pair.0.len() != 2 {
            return Err(RunError::syntax("each `let` binding must be [pattern expr]"));
        }
        if let Value::Symbol(s) = peek(&pair.0[0]) {
            cur = cur.push_binding(s.clone(), Value::Undefined, true);
        }
    }

    for b in &bindings.0 {
        let Value::Vector(pair) = peek(b) else { unreachable!() };
        let value = eval(interp, &cur, &pair.0[1])?;
        let pat = &pair.0[0];
        if let Value::Symbol(s) = peek(pat) {
            if let Some(binding) = cur.find_binding(s) {
                Scope::set(&binding, value.clone());
            }
            cur = cur.push(s.clone(), value);
        } else {
            match crate::pattern::match_pattern(&cur, pat, &value)? {
                Some(s2) => cur = s2,
                None => return Err(RunError::pattern("pattern match failed")),
            }
        }
    }
    eval_body(interp, &cur, &tail[1..])
}

fn sf_match(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`match` expects expr (pattern body…)…"));
    }
    let value = eval(interp, scope, &tail[0])?;
    for case in &tail[1..] {
        let Value::Vector(c) = peek(case) else {
            return Err(RunError::syntax("each `match` case must be (pattern body…)"));
        };
        if c.0.is_empty() {
            return Err(RunError::syntax("each `match` case must be (pattern body…)"));
        }
        if let Some(s2) = crate::pattern::match_pattern(scope, &c.0[0], &value)? {
            return eval_body(interp, &s2, &c.0[1..]);
        }
    }
    Err(RunError::pattern("no match"))
}

fn sf_fn(scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`fn` expects (params) body…"));
    }
    let params = tail[0].clone();
    let mut body = tail[1..].to_vec();
    let mut doc = None;
    if body.len() > 1 {
        if let Value::String(s) = peek(&body[0]) {
            doc = Some(Rc::clone(s));
            body.remove(0);
        }
    }
    Ok(Value::Closure(Rc::new(ClosureData {
        captured: scope.clone(),
        params,
        body,
        doc: RefCell::new(doc),
        name: RefCell::new(None),
    })))
}

fn sf_try(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.len() != 1 {
        return Err(RunError::syntax("`try` expects exactly one expression"));
    }
    let depth_before = interp.errors.trace().len();
    match eval(interp, scope, &tail[0]) {
        Ok(v) => {
            interp.errors.clear();
            Ok(make_ok(interp, v))
        }
        Err(e) => {
            while interp.errors.trace().len() > depth_before {
                interp.errors.pop_frame();
            }
            Ok(make_error(interp, e))
        }
    }
}

fn make_ok(interp: &mut Interpreter, v: Value) -> Value {
    let ok_sym = intern_lang(interp, "ok");
    let elem_ty = interp.types.get_type(&v);
    let result_generic = interp.types.result.clone();
    let ty = interp.types.get_unary_instance(&result_generic, &elem_ty).unwrap_or_else(|_| interp.types.any.clone());
    Value::Data(Rc::new(DataValue { ty, tag: ok_sym, fields: vec![v] }))
}

fn make_error(interp: &mut Interpreter, e: RunError) -> Value {
    let error_sym = intern_lang(interp, "error");
    let kind_sym = intern_lang(interp, &e.kind.to_string());
    let trace_items: Vec<Value> =
        e.stack_trace.iter().map(|f| Value::String(Rc::from(f.callee.as_str()))).collect();
    let info = Value::Vector(Rc::new(VectorData(vec![
        Value::Symbol(kind_sym),
        Value::String(Rc::from(e.message.as_str())),
        e.form.clone().unwrap_or(Value::Unit),
        Value::Vector(Rc::new(VectorData(trace_items))),
    ])));
    let ty = interp.types.get_poly_instance(&interp.types.result.clone());
    Value::Data(Rc::new(DataValue { ty, tag: error_sym, fields: vec![info] }))
}

fn intern_lang(interp: &mut Interpreter, name: &str) -> Symbol {
    let lang = interp.modules.get_or_create("lang");
    let sym = lang.borrow_mut().internal.intern(&lang, name);
    sym
}

fn sf_loop(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`loop` expects (params) body…"));
    }
    let Value::Vector(params) = peek(&tail[0]) else {
        return Err(RunError::syntax("`loop` parameter list must be a vector"));
    };
    let params = Rc::clone(params);
    let mut cur = scope.clone();
    loop {
        let result = eval_body(interp, &cur, &tail[1..])?;
        let continue_args = match peek(&result) {
            Value::Continue(args) => Some(Rc::clone(args)),
            _ => None,
        };
        let Some(args) = continue_args else {
            return Ok(result);
        };
        if args.len() != params.0.len() {
            return Err(RunError::domain("`continue` argument count does not match `loop` parameters"));
        }
        let mut next = scope.clone();
        for (p, a) in params.0.iter().zip(args.iter()) {
            let Value::Symbol(s) = peek(p) else {
                return Err(RunError::syntax("`loop` parameters must be bare symbols"));
            };
            next = next.push(s.clone(), a.clone());
        }
        cur = next;
    }
}

fn sf_continue(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    let mut args = Vec::with_capacity(tail.len());
    for a in tail {
        args.push(eval(interp, scope, a)?);
    }
    Ok(Value::Continue(Rc::from(args)))
}

fn sf_def(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`def` expects a symbol or (name params…)"));
    }
    match peek(&tail[0]).clone() {
        Value::Symbol(name) => {
            if tail.len() != 2 {
                return Err(RunError::syntax("`def` expects (def sym expr)"));
            }
            let value = eval(interp, scope, &tail[1])?;
            let home = name
                .home
                .borrow()
                .clone()
                .ok_or_else(|| RunError::name("cannot `def` an uninterned symbol"))?;
            home.borrow_mut().defs.set(name, value);
            Ok(Value::Unit)
        }
        Value::Vector(sig) => {
            let Value::Symbol(name) = peek(&sig.0[0]).clone() else {
                return Err(RunError::syntax("expected a function name"));
            };
            let params = Value::Vector(Rc::new(VectorData(sig.0[1..].to_vec())));
            let mut body = tail[1..].to_vec();
            let mut doc = None;
            if body.len() > 1 {
                if let Value::String(s) = peek(&body[0]) {
                    doc = Some(Rc::clone(s));
                    body.remove(0);
                }
            }
            let rewritten = rewrite_tail_calls(&name, &params, body);
            let closure = ClosureData {
                captured: scope.clone(),
                params,
                body: rewritten,
                doc: RefCell::new(doc),
                name: RefCell::new(Some(name.clone())),
            };
            let home = name
                .home
                .borrow()
                .clone()
                .ok_or_else(|| RunError::name("cannot `def` an uninterned symbol"))?;
            home.borrow_mut().defs.set(name, Value::Closure(Rc::new(closure)));
            Ok(Value::Unit)
        }
        _ => Err(RunError::syntax("`def` expects a symbol or (name params…)")),
    }
}

fn sf_def_macro(scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`def-macro` expects (name params…) body…"));
    }
    let Value::Vector(sig) = peek(&tail[0]) else {
        return Err(RunError::syntax("`def-macro` expects (name params…) body…"));
    };
    let Value::Symbol(name) = peek(&sig.0[0]).clone() else {
        return Err(RunError::syntax("expected a macro name"));
    };
    let params = Value::Vector(Rc::new(VectorData(sig.0[1..].to_vec())));
    let body = tail[1..].to_vec();
    let closure = ClosureData {
        captured: scope.clone(),
        params,
        body,
        doc: RefCell::new(None),
        name: RefCell::new(Some(name.clone())),
    };
    let home = name.home.borrow().clone().ok_or_else(|| RunError::name("cannot `def-macro` an uninterned symbol"))?;
    home.borrow_mut().macro_defs.set(name, Value::Closure(Rc::new(closure)));
    Ok(Value::Unit)
}

fn sf_def_read_macro(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.len() != 2 {
        return Err(RunError::syntax("`def-read-macro` expects (def-read-macro sym expr)"));
    }
    let Value::Symbol(name) = peek(&tail[0]).clone() else {
        return Err(RunError::syntax("expected a one-character symbol"));
    };
    let value = eval(interp, scope, &tail[1])?;
    scope.module().borrow_mut().read_macro_defs.set(name, value);
    Ok(Value::Unit)
}

fn sf_def_generic(scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`def-generic` expects (name params…)"));
    }
    let Value::Vector(sig) = peek(&tail[0]) else {
        return Err(RunError::syntax("`def-generic` expects (name params…)"));
    };
    let Value::Symbol(name) = peek(&sig.0[0]).clone() else {
        return Err(RunError::syntax("expected a generic function name"));
    };
    let params = Value::Vector(Rc::new(VectorData(sig.0[1..].to_vec())));
    let (min_arity, variadic) = crate::pattern::closure_arity(&params);
    let gdata = GenericFunctionData {
        name: name.clone(),
        context: RefCell::new(None),
        min_arity,
        variadic,
        type_parameters: 0,
        param_type_indices: vec![-1; sig.0.len().saturating_sub(1)],
    };
    let home = name.home.borrow().clone().ok_or_else(|| RunError::name("cannot `def-generic` an uninterned symbol"))?;
    home.borrow_mut().defs.set(name, Value::GenericFunction(Rc::new(gdata)));
    Ok(Value::Unit)
}

fn sf_def_method(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`def-method` expects (name params…) body…"));
    }
    let Value::Vector(sig) = peek(&tail[0]) else {
        return Err(RunError::syntax("`def-method` expects (name params…) body…"));
    };
    let Value::Symbol(name) = peek(&sig.0[0]).clone() else {
        return Err(RunError::syntax("expected a generic function name"));
    };
    let home = name.home.borrow().clone().ok_or_else(|| RunError::name("cannot `def-method` on an uninterned symbol"))?;
    let generic_fn = home.borrow().defs.get(&name);
    let Some(Value::GenericFunction(_)) = generic_fn else {
        return Err(RunError::name(format!("`{}` is not a declared generic function", name.name)));
    };

    let mut param_types: Vec<Type> = Vec::new();
    let mut params_for_closure: Vec<Value> = Vec::new();
    for p in &sig.0[1..] {
        match peek(p) {
            Value::Symbol(s) if s.name.as_ref() == "&rest" => params_for_closure.push(p.clone()),
            Value::Vector(pair) if pair.0.len() == 2 => {
                let Value::Symbol(_) = peek(&pair.0[0]) else {
                    return Err(RunError::syntax("expected (symbol ^type)"));
                };
                let Value::TypeQuote(texpr) = peek(&pair.0[1]) else {
                    return Err(RunError::syntax("expected (symbol ^type)"));
                };
                let ty = crate::data::eval_type_expr(interp, &home, texpr)?;
                param_types.push(ty);
                params_for_closure.push(pair.0[0].clone());
            }
            _ => return Err(RunError::syntax("expected (symbol ^type) or `&rest`")),
        }
    }
    let body = tail[1..].to_vec();
    let params_vec = Value::Vector(Rc::new(VectorData(params_for_closure)));
    let closure = Value::Closure(Rc::new(ClosureData {
        captured: scope.clone(),
        params: params_vec,
        body,
        doc: RefCell::new(None),
        name: RefCell::new(Some(name.clone())),
    }));
    let first_type = param_types.first().cloned().unwrap_or_else(|| interp.types.any.clone());
    home.borrow_mut().methods.add(name, first_type, crate::module::MethodEntry { param_types, implementation: closure });
    Ok(Value::Unit)
}

fn sf_def_data(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.is_empty() {
        return Err(RunError::syntax("`def-data` expects a name or (name var…), then constructors"));
    }
    let module = scope.module();
    match peek(&tail[0]).clone() {
        Value::Symbol(name) => {
            crate::data::define_data(interp, &module, &name, &tail[1..])?;
            Ok(Value::Unit)
        }
        Value::Vector(sig) if !sig.0.is_empty() => {
            let Value::Symbol(name) = peek(&sig.0[0]).clone() else {
                return Err(RunError::syntax("expected a type name"));
            };
            let mut vars = Vec::with_capacity(sig.0.len() - 1);
            for v in &sig.0[1..] {
                let Value::Symbol(s) = peek(v) else {
                    return Err(RunError::syntax("expected a type-variable symbol"));
                };
                vars.push(s.clone());
            }
            crate::data::define_generic_data(interp, &module, &name, &vars, &tail[1..])?;
            Ok(Value::Unit)
        }
        _ => Err(RunError::syntax("`def-data` expects a name or (name var…)")),
    }
}

fn sf_quote(tail: &[Value]) -> RunResult<Value> {
    if tail.len() != 1 {
        return Err(RunError::syntax("`quote` expects exactly one argument"));
    }
    Ok(tail[0].clone())
}

fn sf_backquote(interp: &mut Interpreter, scope: &Scope, tail: &[Value]) -> RunResult<Value> {
    if tail.len() != 1 {
        return Err(RunError::syntax("`backquote` expects exactly one argument"));
    }
    backquote_walk(interp, scope, &tail[0])
}

fn backquote_walk(interp: &mut Interpreter, scope: &Scope, expr: &Value) -> RunResult<Value> {
    let Value::Vector(v) = peek(expr) else {
        return Ok(expr.clone());
    };
    if v.0.is_empty() {
        return Ok(expr.clone());
    }
    if let Value::Symbol(s) = peek(&v.0[0]) {
        if s.name.as_ref() == "unquote" && v.0.len() == 2 {
            return eval(interp, scope, &v.0[1]);
        }
    }
    let mut out = Vec::with_capacity(v.0.len());
    for item in &v.0 {
        if let Value::Vector(iv) = peek(item) {
            if let Some(Value::Symbol(s)) = iv.0.first().map(peek) {
                if s.name.as_ref() == "splice" && iv.0.len() == 2 {
                    let spliced = eval(interp, scope, &iv.0[1])?;
                    let Value::Vector(sv) = peek(&spliced) else {
                        return Err(RunError::domain("`splice` must evaluate to a vector"));
                    };
                    out.extend(sv.0.iter().cloned());
                    continue;
                }
            }
        }
        out.push(backquote_walk(interp, scope, item)?);
    }
    Ok(Value::Vector(Rc::new(VectorData(out))))
}

/// Rewrites tail-position self-recursive calls into `continue`s wrapped in
/// an enclosing `loop` (spec §4.9).
fn rewrite_tail_calls(name: &Symbol, params: &Value, body: Vec<Value>) -> Vec<Value> {
    if body.is_empty() {
        return body;
    }
    let mut new_body = body;
    let last = new_body.len() - 1;
    new_body[last] = rewrite_tail_expr(name, new_body[last].clone());
    let mut loop_form = vec![Value::Symbol(crate::symbol::uninterned("loop")), params.clone()];
    loop_form.extend(new_body);
    vec![Value::Vector(Rc::new(VectorData(loop_form)))]
}

fn rewrite_tail_expr(name: &Symbol, expr: Value) -> Value {
    let Value::Vector(v) = peek(&expr) else {
        return expr;
    };
    if v.0.is_empty() {
        return expr;
    }
    let Value::Symbol(head) = peek(&v.0[0]) else {
        return expr;
    };
    if head.name.as_ref() == "if" {
        let mut items = v.0.clone();
        if items.len() >= 3 {
            items[2] = rewrite_tail_expr(name, items[2].clone());
        }
        if items.len() == 4 {
            items[3] = rewrite_tail_expr(name, items[3].clone());
        }
        return Value::Vector(Rc::new(VectorData(items)));
    }
    if Rc::ptr_eq(head, name) {
        let mut items = v.0.clone();
        items[0] = Value::Symbol(crate::symbol::uninterned("continue"));
        return Value::Vector(Rc::new(VectorData(items)));
    }
    expr
}
