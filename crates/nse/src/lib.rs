//! NSE: a dynamically-typed Lisp-family language with first-class syntax, a
//! parametric type lattice, algebraic data types, pattern matching,
//! multimethods, and user-definable read macros. See `SPEC_FULL.md` at the
//! workspace root for the full specification.
#![expect(clippy::module_name_repetitions, reason = "Value/ValueKind-style naming matches the teacher")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked at call sites")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors the lattice's i64/f64 split")]
#![expect(clippy::manual_let_else, reason = "some dispatch paths stay explicit")]
#![expect(clippy::unnecessary_wraps, reason = "dispatch signatures are uniform across special forms")]
#![expect(clippy::too_many_arguments, reason = "a few constructor-compilation helpers stay wide")]
#![expect(clippy::type_complexity, reason = "the type lattice's interning maps are intentionally rich")]

mod apply;
mod data;
mod error;
mod eval;
mod generic;
mod interp;
mod io;
mod module;
mod object;
mod pattern;
mod reader;
mod scope;
mod symbol;
mod types;
mod value;

pub use crate::{
    error::{ExcType, RunError, RunResult, StackFrame},
    interp::Interpreter,
    io::{CollectStringPrint, NoPrint, PrintWriter, StdErr, StdOut},
    module::{Module, ModuleRegistry},
    scope::Scope,
    symbol::{Symbol, SymbolTable},
    types::{GenericType, Type, TypeRegistry},
    value::{equals, EqResult, Value},
};
