//! Pattern matcher and formal-parameter binder (spec §4.4).
//!
//! Grounded on `ouros::signature::Signature`'s parameter-classification
//! approach (classify the formal list once, then bind) for the *shape* of
//! `assign_parameters`, generalized from Python's `/`, `*args`, keyword-only,
//! `**kwargs` grammar to NSE's `&opt`/`&key`/`&rest`/`&match` grammar.
//! `match_pattern` itself is grounded directly on spec §4.4's pattern-shape
//! table and `nse-v/special.c`'s `match` special form.

use crate::{
    error::{RunError, RunResult},
    scope::Scope,
    value::{equals, peek, EqResult, Value},
};

/// Evaluates a default-value expression in the scope populated so far. Kept
/// as a callback rather than a direct call into `crate::eval` to avoid a
/// hard module dependency from the pattern binder onto the evaluator.
/// `FnMut` (not `Fn`) because the callback closes over `&mut Interpreter`.
pub type EvalFn<'a> = dyn FnMut(&Scope, &Value) -> RunResult<Value> + 'a;

/// Attempts to match `pattern` against `actual`, extending `scope` with any
/// symbols the pattern binds. Returns `Ok(None)` on a plain mismatch (the
/// caller decides whether that is "try the next `match` case" or a hard
/// `pattern-error`); returns `Err` only for genuine evaluation errors (e.g. a
/// literal pattern's equality check raising).
pub fn match_pattern(scope: &Scope, pattern: &Value, actual: &Value) -> RunResult<Option<Scope>> {
    match peek(pattern) {
        Value::Symbol(s) => Ok(Some(scope.push(s.clone(), actual.clone()))),
        Value::Quote(inner) => match_quoted(scope, inner, actual),
        Value::Vector(items) => match_vector(scope, &items.0, actual),
        Value::Unit => Ok(bool_opt(matches!(peek(actual), Value::Unit), scope)),
        Value::I64(_) | Value::F64(_) | Value::String(_) | Value::Keyword(_) => {
            match equals(pattern, actual) {
                EqResult::Equal => Ok(Some(scope.clone())),
                EqResult::NotEqual => Ok(None),
                EqResult::Error(e) => Err(e),
            }
        }
        _ => Err(RunError::pattern("value is not a valid pattern")),
    }
}

fn bool_opt(ok: bool, scope: &Scope) -> Option<Scope> {
    if ok { Some(scope.clone()) } else { None }
}

/// `'s` (quoted symbol): matches a zero-field data value tagged `s`. `'x`
/// for any other literal `x`: requires `equals(x, actual) == equal`.
fn match_quoted(scope: &Scope, inner: &Value, actual: &Value) -> RunResult<Option<Scope>> {
    if let Value::Symbol(tag) = peek(inner) {
        if let Value::Data(d) = peek(actual) {
            return Ok(bool_opt(d.tag.name == tag.name && d.fields.is_empty(), scope));
        }
        return Ok(None);
    }
    match equals(inner, actual) {
        EqResult::Equal => Ok(Some(scope.clone())),
        EqResult::NotEqual => Ok(None),
        EqResult::Error(e) => Err(e),
    }
}

/// `[s f1 .. fn]` against a data value whose tag equals `s`, field-by-field;
/// otherwise an ordinary pointwise vector-vs-vector match.
fn match_vector(scope: &Scope, items: &[Value], actual: &Value) -> RunResult<Option<Scope>> {
    if let Some(Value::Symbol(tag)) = items.first().map(peek) {
        if let Value::Data(d) = peek(actual) {
            if d.tag.name != tag.name {
                return Ok(None);
            }
            if d.fields.len() != items.len() - 1 {
                return Ok(None);
            }
            let mut cur = scope.clone();
            for (p, a) in items[1..].iter().zip(d.fields.iter()) {
                match match_pattern(&cur, p, a)? {
                    Some(s) => cur = s,
                    None => return Ok(None),
                }
            }
            return Ok(Some(cur));
        }
    }
    let Value::Vector(actual_items) = peek(actual) else { return Ok(None) };
    if actual_items.0.len() != items.len() {
        return Ok(None);
    }
    let mut cur = scope.clone();
    for (p, a) in items.iter().zip(actual_items.0.iter()) {
        match match_pattern(&cur, p, a)? {
            Some(s) => cur = s,
            None => return Ok(None),
        }
    }
    Ok(Some(cur))
}

fn marker_name(v: &Value) -> Option<&str> {
    match peek(v) {
        Value::Symbol(s) => Some(&s.name),
        _ => None,
    }
}

/// `(min_arity, variadic)` for a closure's formal-parameter list, used by
/// `TypeRegistry::get_type` to compute a closure's `func` type (spec §4.2).
#[must_use]
pub fn closure_arity(params: &Value) -> (usize, bool) {
    let Value::Vector(items) = peek(params) else { return (0, false) };
    let mut min_arity = 0usize;
    let mut variadic = false;
    for item in &items.0 {
        match marker_name(item) {
            Some("&opt" | "&key") => break,
            Some("&rest") => {
                variadic = true;
                break;
            }
            Some("&match") => {
                min_arity += 1;
            }
            _ => min_arity += 1,
        }
    }
    (min_arity, variadic)
}

/// Binds `actuals` against a formal-parameter vector (spec §4.4
/// `assign_parameters`), extending `scope`.
pub fn assign_parameters(scope: &Scope, formals: &[Value], actuals: &[Value], eval: &mut EvalFn<'_>) -> RunResult<Scope> {
    let mut cur = scope.clone();
    let mut fi = 0usize;
    let mut ai = 0usize;

    // Plain positional / `&match` prefix, until a marker switches mode.
    while fi < formals.len() {
        match marker_name(&formals[fi]) {
            Some("&opt") => {
                fi += 1;
                return bind_opt(&cur, formals, fi, actuals, ai, eval);
            }
            Some("&key") => {
                fi += 1;
                return bind_key(&cur, &formals[fi..], &actuals[ai..], eval);
            }
            Some("&rest") => {
                fi += 1;
                return bind_rest(&cur, &formals[fi..], &actuals[ai..]);
            }
            Some("&match") => {
                fi += 1;
                if fi >= formals.len() {
                    return Err(RunError::syntax("`&match` must be followed by a pattern"));
                }
                if ai >= actuals.len() {
                    return Err(RunError::domain("too few parameters"));
                }
                match match_pattern(&cur, &formals[fi], &actuals[ai])? {
                    Some(s) => cur = s,
                    None => return Err(RunError::pattern("pattern match failed")),
                }
                fi += 1;
                ai += 1;
            }
            _ => {
                let Value::Symbol(s) = peek(&formals[fi]) else {
                    return Err(RunError::syntax("expected a symbol"));
                };
                if ai >= actuals.len() {
                    return Err(RunError::domain("too few parameters"));
                }
                cur = cur.push(s.clone(), actuals[ai].clone());
                fi += 1;
                ai += 1;
            }
        }
    }
    if ai != actuals.len() {
        return Err(RunError::domain("too many parameters"));
    }
    Ok(cur)
}

fn opt_formal(v: &Value) -> RunResult<(crate::symbol::Symbol, Option<Value>)> {
    match peek(v) {
        Value::Symbol(s) => Ok((s.clone(), None)),
        Value::Vector(items) if items.0.len() == 2 => {
            let Value::Symbol(s) = peek(&items.0[0]) else {
                return Err(RunError::syntax("expected (SYMBOL EXPR)"));
            };
            Ok((s.clone(), Some(items.0[1].clone())))
        }
        _ => Err(RunError::syntax("expected (SYMBOL EXPR)")),
    }
}

fn bind_opt(
    scope: &Scope,
    formals: &[Value],
    mut fi: usize,
    actuals: &[Value],
    mut ai: usize,
    eval: &mut EvalFn<'_>,
) -> RunResult<Scope> {
    let mut cur = scope.clone();
    while fi < formals.len() {
        match marker_name(&formals[fi]) {
            Some("&key") => return bind_key(&cur, &formals[fi + 1..], &actuals[ai.min(actuals.len())..], eval),
            Some("&rest") => return bind_rest(&cur, &formals[fi + 1..], &actuals[ai.min(actuals.len())..]),
            _ => {
                let (sym, default) = opt_formal(&formals[fi])?;
                let value = if ai < actuals.len() {
                    let v = actuals[ai].clone();
                    ai += 1;
                    v
                } else if let Some(expr) = default {
                    eval(&cur, &expr)?
                } else {
                    return Err(RunError::domain("too few parameters"));
                };
                cur = cur.push(sym, value);
                fi += 1;
            }
        }
    }
    if ai != actuals.len() {
        return Err(RunError::domain("too many parameters"));
    }
    Ok(cur)
}

fn bind_rest(scope: &Scope, formals: &[Value], actuals: &[Value]) -> RunResult<Scope> {
    let Some(name) = formals.first() else {
        return Err(RunError::syntax("`&rest` must be followed by exactly one symbol"));
    };
    if formals.len() != 1 {
        return Err(RunError::syntax("`&rest` must be followed by exactly one symbol"));
    }
    let Value::Symbol(sym) = peek(name) else {
        return Err(RunError::syntax("expected a symbol"));
    };
    let rest = Value::Vector(std::rc::Rc::new(crate::object::VectorData(actuals.to_vec())));
    Ok(scope.push(sym.clone(), rest))
}

fn bind_key(scope: &Scope, formals: &[Value], actuals: &[Value], eval: &mut EvalFn<'_>) -> RunResult<Scope> {
    if actuals.len() % 2 != 0 {
        return Err(RunError::domain("keyword arguments must come in :keyword value pairs"));
    }
    let mut seen = std::collections::HashSet::new();
    let mut provided: std::collections::HashMap<String, Value> = std::collections::HashMap::new();
    let mut i = 0usize;
    while i < actuals.len() {
        let Value::Keyword(k) = peek(&actuals[i]) else {
            return Err(RunError::domain("expected a keyword argument name"));
        };
        let key_name = k.name.to_string();
        if !seen.insert(key_name.clone()) {
            return Err(RunError::domain(format!("duplicate named parameter `{key_name}`")));
        }
        provided.insert(key_name, actuals[i + 1].clone());
        i += 2;
    }
    let mut known = std::collections::HashSet::new();
    let mut cur = scope.clone();
    for formal in formals {
        let (sym, default) = opt_formal(formal)?;
        known.insert(sym.name.to_string());
        let value = if let Some(v) = provided.get(sym.name.as_ref()) {
            v.clone()
        } else if let Some(expr) = default {
            eval(&cur, &expr)?
        } else {
            return Err(RunError::domain(format!("missing named parameter `{}`", sym.name)));
        };
        cur = cur.push(sym, value);
    }
    for key in provided.keys() {
        if !known.contains(key) {
            return Err(RunError::domain(format!("unknown named parameter `{key}`")));
        }
    }
    Ok(cur)
}
