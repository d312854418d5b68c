//! `def-data` type and constructor compilation (spec §4.10).
//!
//! Grounded on `nse-v/type.h`'s generic/instance machinery (reused from
//! `types.rs`) plus `ouros::object`'s pattern of compiling a declaration into
//! a native closure; there is no direct teacher analogue for algebraic data
//! types (Python has no `def-data`), so the constructor-compilation shape is
//! carried over from how the teacher turns a declarative form into a
//! `NativeFn` closed over precomputed metadata.

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{RunError, RunResult},
    interp::Interpreter,
    module::Module,
    object::{DataValue, NativeFn},
    symbol::Symbol,
    types::{GenericType, Type, TypeKind},
    value::{peek, Value},
};

/// Resolves a type expression (the inner value of a `^type` type-quote) in
/// `module`'s type namespace, falling back to the `lang` module's type
/// namespace for built-ins (spec §6: every module shares the built-in type
/// vocabulary without an explicit import).
///
/// `(generic-name param…)` applies a generic type to concrete parameter
/// types, producing an `Instance` (spec §4.10's instance formal), mirroring
/// `nse-v/special.c`'s `apply_generic_type`.
pub fn eval_type_expr(interp: &mut Interpreter, module: &Rc<RefCell<Module>>, expr: &Value) -> RunResult<Type> {
    match peek(expr) {
        Value::Symbol(s) => {
            if let Some(t) = module.borrow().type_defs.get(s) {
                return as_type(t);
            }
            let lang = interp.modules.get_or_create("lang");
            if let Some(t) = lang.borrow().type_defs.get(s) {
                return as_type(t);
            }
            Err(RunError::name(format!("no such type `{}`", s.name)))
        }
        Value::Type(t) => Ok(Rc::clone(t)),
        Value::Vector(items) => {
            let Some(head) = items.0.first() else {
                return Err(RunError::syntax("expected a generic type name followed by parameters"));
            };
            let head_ty = eval_type_expr(interp, module, head)?;
            let TypeKind::PolyInstance { generic } = &head_ty.kind else {
                return Err(RunError::domain(format!("`{head_ty}` is not a generic type")));
            };
            let generic = generic.clone();
            let mut params = Vec::with_capacity(items.0.len() - 1);
            for p in &items.0[1..] {
                params.push(eval_type_expr(interp, module, p)?);
            }
            interp.types.get_instance(&generic, &params)
        }
        _ => Err(RunError::syntax("expected a type expression")),
    }
}

fn as_type(v: Value) -> RunResult<Type> {
    match v {
        Value::Type(t) => Ok(t),
        _ => Err(RunError::domain("type namespace binding is not a type")),
    }
}

/// `(def-data name ctor…)`: a fresh simple type under `any`.
pub fn define_data(interp: &mut Interpreter, module: &Rc<RefCell<Module>>, name: &Symbol, ctors: &[Value]) -> RunResult<()> {
    let ty = interp.types.create_simple_type(None);
    *ty.name.borrow_mut() = Some(Rc::clone(name));
    module.borrow_mut().type_defs.set(Rc::clone(name), Value::Type(Rc::clone(&ty)));
    for ctor in ctors {
        define_constructor(interp, module, &ty, None, &[], ctor)?;
    }
    Ok(())
}

/// `(def-data (name var…) ctor…)`: a fresh generic type of arity
/// `vars.len()`, with each variable registered as a polymorphic-variable
/// type in the type namespace for the constructor bodies to reference.
pub fn define_generic_data(
    interp: &mut Interpreter,
    module: &Rc<RefCell<Module>>,
    name: &Symbol,
    vars: &[Symbol],
    ctors: &[Value],
) -> RunResult<()> {
    let g = interp.types.create_generic(vars.len(), None);
    *g.name.borrow_mut() = Some(Rc::clone(name));
    let poly = interp.types.get_poly_instance(&g);
    module.borrow_mut().type_defs.set(Rc::clone(name), Value::Type(poly));

    let mut poly_vars = Vec::with_capacity(vars.len());
    for (i, v) in vars.iter().enumerate() {
        let pv = interp.types.create_poly_var(&g, i);
        module.borrow_mut().type_defs.set(Rc::clone(v), Value::Type(Rc::clone(&pv)));
        poly_vars.push(pv);
    }

    let declared = interp.types.get_poly_instance(&g);
    for ctor in ctors {
        define_constructor(interp, module, &declared, Some(&g), &poly_vars, ctor)?;
    }
    Ok(())
}

fn parse_field_spec(
    interp: &mut Interpreter,
    module: &Rc<RefCell<Module>>,
    field: &Value,
) -> RunResult<(Symbol, Type)> {
    match peek(field) {
        Value::Symbol(s) => Ok((s.clone(), interp.types.any.clone())),
        Value::Vector(pair) if pair.0.len() == 2 => {
            let Value::Symbol(s) = peek(&pair.0[0]) else {
                return Err(RunError::syntax("expected (SYMBOL ^TYPE) in a constructor field"));
            };
            let Value::TypeQuote(texpr) = peek(&pair.0[1]) else {
                return Err(RunError::syntax("a list of exactly one element with a type in field position must be written (SYMBOL ^TYPE)"));
            };
            let ty = eval_type_expr(interp, module, texpr)?;
            Ok((s.clone(), ty))
        }
        _ => Err(RunError::syntax("expected a field name or (SYMBOL ^TYPE)")),
    }
}

fn define_constructor(
    interp: &mut Interpreter,
    module: &Rc<RefCell<Module>>,
    declared_ty: &Type,
    generic: Option<&GenericType>,
    poly_vars: &[Type],
    ctor: &Value,
) -> RunResult<()> {
    let _ = poly_vars;
    match peek(ctor) {
        Value::Symbol(tag) => {
            let value = Value::Data(Rc::new(DataValue { ty: Rc::clone(declared_ty), tag: tag.clone(), fields: Vec::new() }));
            let home = tag.home.borrow().clone().unwrap_or_else(|| Rc::clone(module));
            home.borrow_mut().defs.set(tag.clone(), value);
            Ok(())
        }
        Value::Vector(items) if !items.0.is_empty() => {
            let Value::Symbol(tag) = peek(&items.0[0]) else {
                return Err(RunError::syntax("expected a constructor tag symbol"));
            };
            let mut field_specs = Vec::with_capacity(items.0.len() - 1);
            for f in &items.0[1..] {
                field_specs.push(parse_field_spec(interp, module, f)?);
            }
            let arity = field_specs.len();
            let tag_sym = tag.clone();
            let gen = generic.cloned();
            let declared = Rc::clone(declared_ty);
            let native: NativeFn = Rc::new(move |interp, args| {
                if args.len() != arity {
                    return Err(RunError::domain(format!("`{}` expects {arity} field(s), got {}", tag_sym.name, args.len())));
                }
                let mut bound: Vec<Option<Type>> = vec![None; gen.as_ref().map_or(0, |g| g.arity)];
                for ((_, expected), actual) in field_specs.iter().zip(args.iter()) {
                    check_field(interp, expected, actual, gen.as_ref(), &mut bound)?;
                }
                let final_ty = if let Some(g) = &gen {
                    if bound.iter().all(Option::is_none) {
                        interp.types.get_poly_instance(g)
                    } else {
                        let params: Vec<Type> =
                            bound.iter().map(|b| b.clone().unwrap_or_else(|| interp.types.any.clone())).collect();
                        interp.types.get_instance(g, &params)?
                    }
                } else {
                    Rc::clone(&declared)
                };
                Ok(Value::Data(Rc::new(DataValue { ty: final_ty, tag: tag_sym.clone(), fields: args.to_vec() })))
            });
            let home = tag.home.borrow().clone().unwrap_or_else(|| Rc::clone(module));
            home.borrow_mut().defs.set(tag.clone(), Value::FunctionPointer(native));
            Ok(())
        }
        _ => Err(RunError::syntax("expected a bare tag symbol or (tag field…)")),
    }
}

/// Sub-typing check for one constructor field (spec §4.10).
fn check_field(
    interp: &mut Interpreter,
    expected: &Type,
    actual: &Value,
    generic: Option<&GenericType>,
    bound: &mut [Option<Type>],
) -> RunResult<()> {
    let actual_ty = interp.types.get_type(actual);
    match &expected.kind {
        TypeKind::PolyVar { generic: vg, index } if generic.is_some_and(|g| Rc::ptr_eq(vg, g)) => {
            if let Some(existing) = &bound[*index] {
                if !interp.types.is_subtype_of(&actual_ty, existing) {
                    return Err(RunError::domain("field value is not a subtype of the already-bound type variable"));
                }
            } else {
                bound[*index] = Some(actual_ty);
            }
            Ok(())
        }
        TypeKind::Instance { generic: eg, params } => {
            if let TypeKind::Instance { generic: ag, params: aparams } = &actual_ty.kind {
                if Rc::ptr_eq(eg, ag)
                    && interp.types.are_subtypes_of(aparams, params)
                    && interp.types.are_subtypes_of(params, aparams)
                {
                    return Ok(());
                }
            }
            Err(RunError::domain(format!("field value is not an instance of `{expected}`")))
        }
        _ => {
            if interp.types.is_subtype_of(&actual_ty, expected) {
                Ok(())
            } else {
                Err(RunError::domain(format!("field value has type `{actual_ty}`, expected a subtype of `{expected}`")))
            }
        }
    }
}
