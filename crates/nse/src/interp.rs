//! The top-level interpreter: module/type registries, error state, output
//! sinks, and the bootstrap of the `lang` module (spec §3/§5/§6).
//!
//! Grounded on how `ouros::run`/the teacher's top-level runtime struct ties
//! together its heap, namespace registry, and I/O sinks into one object
//! threaded through evaluation; re-pointed from Python's single global
//! namespace to NSE's `lang`-module bootstrap (built-in types, `true`/`false`,
//! and the handful of illustrative natives spec §1 allows so the scenarios in
//! spec §8 run end to end).

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{RunError, RunResult},
    io::{PrintWriter, StdErr, StdOut},
    module::ModuleRegistry,
    object::DataValue,
    scope::Scope,
    types::TypeRegistry,
    value::{peek, Value},
};

/// Owns every piece of process-wide (really: per-`Interpreter`) state spec §5
/// describes as such: the module registry, the type lattice, the error/
/// call-stack state, and the output sinks. The sinks sit behind a `RefCell`
/// because native functions receive `&Interpreter` (spec §3: "native function
/// of (argument vector, dynamic scope) -> value" — natives don't get to
/// mutate the dynamic scope wholesale, just write through it).
pub struct Interpreter {
    pub modules: ModuleRegistry,
    pub types: TypeRegistry,
    pub errors: crate::error::ErrorState,
    pub stdout: RefCell<Box<dyn PrintWriter>>,
    pub stderr: RefCell<Box<dyn PrintWriter>>,
}

impl Interpreter {
    #[must_use]
    pub fn new() -> Self {
        let mut interp = Self {
            modules: ModuleRegistry::new(),
            types: TypeRegistry::new(),
            errors: crate::error::ErrorState::new(),
            stdout: RefCell::new(Box::new(StdOut)),
            stderr: RefCell::new(Box::new(StdErr)),
        };
        interp.bootstrap_lang();
        interp
    }

    /// Registers the built-in type vocabulary, `true`/`false`, and a handful
    /// of illustrative arithmetic/list natives into the `lang` module (spec
    /// §1 Non-goals: "a handful of illustrative natives are still registered
    /// ... purely so the test scenarios in spec §8 run end to end; this is
    /// *not* a general primitive library").
    fn bootstrap_lang(&mut self) {
        let lang = self.modules.get_or_create("lang");
        self.modules.get_or_create("keyword");

        macro_rules! bind_type {
            ($name:expr, $ty:expr) => {{
                let sym = lang.borrow_mut().internal.intern(&lang, $name);
                *$ty.name.borrow_mut() = Some(sym.clone());
                lang.borrow_mut().type_defs.set(sym.clone(), Value::Type($ty.clone()));
                lang.borrow_mut().export(&sym);
            }};
        }
        bind_type!("any", self.types.any);
        bind_type!("unit", self.types.unit);
        bind_type!("bool", self.types.bool_);
        bind_type!("num", self.types.num);
        bind_type!("int", self.types.int);
        bind_type!("float", self.types.float);
        bind_type!("i64", self.types.i64_);
        bind_type!("f64", self.types.f64_);
        bind_type!("string", self.types.string);
        bind_type!("symbol", self.types.symbol);
        bind_type!("keyword", self.types.keyword);
        bind_type!("syntax", self.types.syntax);
        bind_type!("type", self.types.type_);
        bind_type!("func", self.types.func);
        bind_type!("scope", self.types.scope);
        bind_type!("stream", self.types.stream);
        bind_type!("continue", self.types.continue_);
        bind_type!("generic-type", self.types.generic_type);

        macro_rules! bind_generic {
            ($name:expr, $g:expr) => {{
                let sym = lang.borrow_mut().internal.intern(&lang, $name);
                *$g.name.borrow_mut() = Some(sym.clone());
                let poly = self.types.get_poly_instance(&$g);
                lang.borrow_mut().type_defs.set(sym.clone(), Value::Type(poly));
                lang.borrow_mut().export(&sym);
            }};
        }
        bind_generic!("result", self.types.result);
        bind_generic!("vector", self.types.vector);
        bind_generic!("vector-slice", self.types.vector_slice);
        bind_generic!("list", self.types.list);
        bind_generic!("weak", self.types.weak);
        bind_generic!("hash-map", self.types.hash_map);
        bind_generic!("entry", self.types.entry);

        let true_sym = lang.borrow_mut().internal.intern(&lang, "true");
        let false_sym = lang.borrow_mut().internal.intern(&lang, "false");
        let bool_ty = self.types.bool_.clone();
        lang.borrow_mut().defs.set(
            true_sym.clone(),
            Value::Data(Rc::new(DataValue { ty: bool_ty.clone(), tag: true_sym.clone(), fields: Vec::new() })),
        );
        lang.borrow_mut().defs.set(
            false_sym.clone(),
            Value::Data(Rc::new(DataValue { ty: bool_ty, tag: false_sym.clone(), fields: Vec::new() })),
        );
        lang.borrow_mut().export(&true_sym);
        lang.borrow_mut().export(&false_sym);

        self.bootstrap_natives(&lang);
    }

    fn bootstrap_natives(&mut self, lang: &Rc<std::cell::RefCell<crate::module::Module>>) {
        let mut def_native = |interp: &mut Self, name: &str, f: crate::object::NativeFn| {
            let sym = lang.borrow_mut().internal.intern(lang, name);
            lang.borrow_mut().export(&sym);
            lang.borrow_mut().defs.set(sym, Value::FunctionPointer(f));
            let _ = interp;
        };

        def_native(self, "+", Rc::new(|_, args| num_fold(args, 0, i64::checked_add, |a, b| a + b)));
        def_native(self, "-", Rc::new(|_, args| num_fold_sub(args)));
        def_native(self, "*", Rc::new(|_, args| num_fold(args, 1, i64::checked_mul, |a, b| a * b)));
        def_native(self, "/", Rc::new(|_, args| num_div(args)));
        def_native(self, "=", Rc::new(|interp, args| cmp_chain(interp, args, |o| o == std::cmp::Ordering::Equal)));
        def_native(self, "<", Rc::new(|interp, args| cmp_chain(interp, args, |o| o == std::cmp::Ordering::Less)));
        def_native(self, "<=", Rc::new(|interp, args| cmp_chain(interp, args, |o| o != std::cmp::Ordering::Greater)));
        def_native(self, ">", Rc::new(|interp, args| cmp_chain(interp, args, |o| o == std::cmp::Ordering::Greater)));
        def_native(self, ">=", Rc::new(|interp, args| cmp_chain(interp, args, |o| o != std::cmp::Ordering::Less)));
        def_native(self, "list", Rc::new(|_, args| Ok(Value::List(crate::object::ListNode::from_vec(args.to_vec())))));
        def_native(
            self,
            "print",
            Rc::new(|interp, args| {
                let mut out = String::new();
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&a.to_string());
                }
                out.push('\n');
                interp.stdout.borrow_mut().write_str(&out)?;
                Ok(Value::Unit)
            }),
        );
    }

    /// Loads and evaluates every top-level form in `source` inside a fresh
    /// module named `module_name` that imports `lang`, returning the value of
    /// the last form (spec §6's "module-loading operation").
    pub fn eval_str(&mut self, module_name: &str, source: &str) -> RunResult<Value> {
        let lang = self.modules.get_or_create("lang");
        let module = self.modules.get_or_create(module_name);
        if !Rc::ptr_eq(&module, &lang) {
            crate::module::use_module(&module, &lang);
        }
        let forms = crate::reader::read_all(self, &module, module_name, source)?;
        let scope = Scope::root(module);
        let mut result = Value::Unit;
        for form in &forms {
            result = crate::eval::eval(self, &scope, form)?;
        }
        Ok(result)
    }

    /// Reads `path` from disk and evaluates it as a fresh module named after
    /// the file stem (spec §6).
    pub fn load_file(&mut self, path: &str) -> RunResult<Value> {
        let source = std::fs::read_to_string(path).map_err(|e| RunError::io(e.to_string()))?;
        let name = std::path::Path::new(path).file_stem().and_then(|s| s.to_str()).unwrap_or("main");
        self.eval_str(name, &source)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn as_nums(args: &[Value]) -> RunResult<Vec<Value>> {
    args.iter()
        .map(|a| match peek(a) {
            Value::I64(_) | Value::F64(_) => Ok(a.clone()),
            other => Err(RunError::domain(format!("expected a number, got `{other}`"))),
        })
        .collect()
}

fn num_fold(
    args: &[Value],
    identity: i64,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> RunResult<Value> {
    let args = as_nums(args)?;
    if args.iter().any(|a| matches!(peek(a), Value::F64(_))) {
        let mut acc = identity as f64;
        for a in &args {
            acc = float_op(acc, as_f64(a));
        }
        return Ok(Value::F64(acc));
    }
    let mut acc = identity;
    for a in &args {
        let Value::I64(i) = peek(a) else { unreachable!() };
        acc = int_op(acc, *i).ok_or_else(|| RunError::domain("integer overflow"))?;
    }
    Ok(Value::I64(acc))
}

fn num_fold_sub(args: &[Value]) -> RunResult<Value> {
    let args = as_nums(args)?;
    if args.is_empty() {
        return Err(RunError::domain("`-` expects at least one argument"));
    }
    if args.len() == 1 {
        return match peek(&args[0]) {
            Value::I64(i) => Ok(Value::I64(-i)),
            Value::F64(f) => Ok(Value::F64(-f)),
            _ => unreachable!(),
        };
    }
    if args.iter().any(|a| matches!(peek(a), Value::F64(_))) {
        let mut acc = as_f64(&args[0]);
        for a in &args[1..] {
            acc -= as_f64(a);
        }
        return Ok(Value::F64(acc));
    }
    let Value::I64(mut acc) = peek(&args[0]).clone() else { unreachable!() };
    for a in &args[1..] {
        let Value::I64(i) = peek(a) else { unreachable!() };
        acc = acc.checked_sub(*i).ok_or_else(|| RunError::domain("integer overflow"))?;
    }
    Ok(Value::I64(acc))
}

fn num_div(args: &[Value]) -> RunResult<Value> {
    let args = as_nums(args)?;
    if args.len() != 2 {
        return Err(RunError::domain("`/` expects exactly two arguments"));
    }
    match (peek(&args[0]), peek(&args[1])) {
        (Value::I64(a), Value::I64(b)) => {
            if *b == 0 {
                return Err(RunError::domain("division by zero"));
            }
            Ok(Value::I64(a / b))
        }
        _ => Ok(Value::F64(as_f64(&args[0]) / as_f64(&args[1]))),
    }
}

fn as_f64(v: &Value) -> f64 {
    use num_traits::ToPrimitive;
    match peek(v) {
        Value::I64(i) => i.to_f64().unwrap_or(f64::NAN),
        Value::F64(f) => *f,
        _ => unreachable!(),
    }
}

fn cmp_chain(interp: &Interpreter, args: &[Value], pred: impl Fn(std::cmp::Ordering) -> bool) -> RunResult<Value> {
    let args = as_nums(args)?;
    for w in args.windows(2) {
        let ord = as_f64(&w[0]).partial_cmp(&as_f64(&w[1])).ok_or_else(|| RunError::domain("cannot compare NaN"))?;
        if !pred(ord) {
            return Ok(lang_bool(interp, false));
        }
    }
    Ok(lang_bool(interp, true))
}

/// Looks up the bootstrapped `true`/`false` data value by name (spec §3: the
/// only well-formed truthy/falsy values a native comparison may return).
fn lang_bool(interp: &Interpreter, v: bool) -> Value {
    let name = if v { "true" } else { "false" };
    let lang = interp.modules.get("lang").expect("lang module bootstrapped");
    let sym = lang.borrow().internal.get(name).expect("true/false bootstrapped");
    lang.borrow().defs.get(&sym).expect("true/false bootstrapped")
}
