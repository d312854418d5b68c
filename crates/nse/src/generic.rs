//! Multimethod dispatch (spec §4.8).
//!
//! Grounded on `module.rs`'s `MethodRegistry` (the storage this dispatches
//! against) and `types.rs`'s subtyping/unification (the comparisons it runs);
//! the dispatch *algorithm* itself has no teacher analogue (Python has no
//! multiple dispatch) and is built directly from the spec's description.

use std::rc::Rc;

use crate::{
    error::{RunError, RunResult},
    interp::Interpreter,
    module::MethodEntry,
    object::GenericFunctionData,
    types::{Type, TypeKind},
    value::Value,
};

/// Runs a generic-function call: builds the type-parameter vector, looks up
/// candidate methods by the first argument's type and its supertype chain,
/// and applies the most specific matching method.
pub fn dispatch(interp: &mut Interpreter, g: &Rc<GenericFunctionData>, args: &[Value]) -> RunResult<Value> {
    if args.len() < g.min_arity {
        return Err(RunError::domain(format!("`{}` expects at least {} argument(s), got {}", g.name, g.min_arity, args.len())));
    }
    let Some(context) = g.context.borrow().clone() else {
        return Err(RunError::name(format!("`{}` has no context module", g.name)));
    };

    build_type_parameters(interp, g, args);

    let arg_types: Vec<Type> = args.iter().map(|a| interp.types.get_type(a)).collect();
    let t0 = arg_types.first().cloned().unwrap_or_else(|| interp.types.any.clone());

    let mut candidates: Vec<MethodEntry> = Vec::new();
    {
        let module = context.borrow();
        for t in interp.types.super_chain(&t0) {
            if let Some(entries) = module.methods.lookup(&g.name, &t) {
                candidates.extend(entries.iter().cloned());
            }
            if let TypeKind::Instance { generic, .. } = &t.kind {
                let poly = interp.types.get_poly_instance(generic);
                if let Some(entries) = module.methods.lookup(&g.name, &poly) {
                    candidates.extend(entries.iter().cloned());
                }
            }
        }
    }

    let matching: Vec<&MethodEntry> =
        candidates.iter().filter(|c| params_match(interp, &c.param_types, &arg_types)).collect();
    if matching.is_empty() {
        let type_names: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
        return Err(RunError::domain(format!("no method matching types ({}) found", type_names.join(" "))));
    }
    let chosen = select_most_specific(interp, &matching);
    crate::apply::apply(interp, &chosen.implementation, args)
}

/// Unifies each argument's type into the generic function's type-parameter
/// slots (spec §4.8 step 2-3); currently a no-op for the zero-type-parameter
/// generics `def-generic` produces (see DESIGN.md), kept so a future
/// type-parametric `def-generic` extension has a seam to unify into.
fn build_type_parameters(interp: &mut Interpreter, g: &GenericFunctionData, args: &[Value]) {
    if g.type_parameters == 0 {
        return;
    }
    let mut slots: Vec<Option<Type>> = vec![None; g.type_parameters];
    for (i, arg) in args.iter().enumerate() {
        let idx = if i < g.param_type_indices.len() {
            g.param_type_indices[i]
        } else if g.variadic {
            *g.param_type_indices.last().unwrap_or(&-1)
        } else {
            -1
        };
        if idx < 0 {
            continue;
        }
        let t = interp.types.get_type(arg);
        let slot = &mut slots[idx as usize];
        *slot = Some(match slot.take() {
            Some(existing) => interp.types.unify_types(&existing, &t),
            None => t,
        });
    }
}

fn params_match(interp: &Interpreter, params: &[Type], args: &[Type]) -> bool {
    if params.len() == args.len() {
        return params.iter().zip(args).all(|(p, a)| interp.types.is_subtype_of(a, p));
    }
    if !params.is_empty() && params.len() < args.len() {
        let (head, rest) = params.split_at(params.len() - 1);
        let last = &rest[0];
        return head.iter().zip(args).all(|(p, a)| interp.types.is_subtype_of(a, p))
            && args[head.len()..].iter().all(|a| interp.types.is_subtype_of(a, last));
    }
    false
}

/// Prefers an entry whose declared parameter types are pointwise subtypes of
/// every other matching candidate's; first-encountered wins when no total
/// order exists (spec §4.8, documented as implementation-defined — see
/// DESIGN.md).
fn select_most_specific<'a>(interp: &Interpreter, candidates: &[&'a MethodEntry]) -> &'a MethodEntry {
    'outer: for cand in candidates {
        for other in candidates {
            if std::ptr::eq(*cand, *other) {
                continue;
            }
            if !interp.types.are_subtypes_of(&cand.param_types, &other.param_types) {
                continue 'outer;
            }
        }
        return cand;
    }
    candidates[0]
}
