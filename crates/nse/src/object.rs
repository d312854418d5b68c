//! Heap-bearing payload structs referenced from `Value`.
//!
//! Grounded on how `ouros::types` separates "payload struct" from the
//! top-level value enum (e.g. `ouros::types::Dict`, `Set`): each NSE
//! reference-type value variant gets its own small struct here, owned via
//! `Rc`/`Rc<RefCell<_>>` per spec §9's "standard shared-ownership facility"
//! design note.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    interp::Interpreter,
    module::Module,
    scope::{Binding, Scope},
    symbol::Symbol,
    types::Type,
    value::Value,
};

/// A source position: file name plus inclusive start/exclusive end
/// line/column, used by `Syntax` wrappers (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: Rc<str>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

/// The payload of a `Value::Syntax`: the wrapped value plus its source span.
#[derive(Debug)]
pub struct SyntaxData {
    pub inner: Value,
    pub span: SourceSpan,
}

/// Singly-linked list node (spec §3 `list`). The empty list is represented as
/// `Value::List(None)`.
#[derive(Debug)]
pub struct ListNode {
    pub head: Value,
    pub tail: Option<Rc<ListNode>>,
}

impl ListNode {
    #[must_use]
    pub fn from_vec(items: Vec<Value>) -> Option<Rc<Self>> {
        let mut tail = None;
        for head in items.into_iter().rev() {
            tail = Some(Rc::new(ListNode { head, tail }));
        }
        tail
    }

    #[must_use]
    pub fn to_vec(mut node: Option<&Rc<ListNode>>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(n) = node {
            out.push(n.head.clone());
            node = n.tail.as_ref();
        }
        out
    }
}

/// Immutable indexed sequence.
#[derive(Debug)]
pub struct VectorData(pub Vec<Value>);

/// Shared view `(offset, length)` into a vector.
#[derive(Debug)]
pub struct VectorSliceData {
    pub base: Rc<VectorData>,
    pub offset: usize,
    pub len: usize,
}

/// Backing storage shared by `array`, `array slice`, and `array buffer`
/// values: a single growable `Vec<Value>` behind a `RefCell`. `array` and
/// `array buffer` both own the whole storage; `array slice` views a window
/// of someone else's storage. This collapses three C structs into one Rust
/// shape, noted as a simplification in DESIGN.md.
pub type MutSeq = Rc<RefCell<Vec<Value>>>;

#[derive(Debug)]
pub struct ArraySliceData {
    pub base: MutSeq,
    pub offset: usize,
    pub len: usize,
}

/// Keyed container; keys hashed/compared by value equality (spec §3).
/// Backed by `indexmap` for deterministic iteration order, per SPEC_FULL's
/// ambient-stack note.
#[derive(Debug, Default)]
pub struct HashMapData(pub IndexMap<HashKey, Value>);

/// Wraps a `Value` for use as an `IndexMap` key: hashing and equality follow
/// the same structural rules as `value::equals`, collapsing the error case
/// (which cannot occur for a key already stored in a live map, per spec's
/// "undefined never appears in a container cell of a live value" invariant)
/// to "not equal".
#[derive(Debug, Clone)]
pub struct HashKey(pub Value);

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        crate::value::structural_eq(&self.0, &other.0)
    }
}
impl Eq for HashKey {}
impl std::hash::Hash for HashKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        crate::value::hash_value(&self.0, state);
    }
}

/// Instance of a user-defined algebraic type (spec §3/§4.10).
#[derive(Debug)]
pub struct DataValue {
    pub ty: Type,
    pub tag: Symbol,
    pub fields: Vec<Value>,
}

/// Captured lexical scope, formal parameter list (as read syntax), and body
/// forms for a `(fn ...)` or `(def (name ...) ...)` closure (spec §3).
#[derive(Debug)]
pub struct ClosureData {
    pub captured: Scope,
    pub params: Value,
    pub body: Vec<Value>,
    pub doc: RefCell<Option<Rc<str>>>,
    pub name: RefCell<Option<Symbol>>,
}

/// Generic function metadata (spec §3): minimum arity, variadic flag,
/// number of type parameters, and a map from argument position to
/// type-parameter index (`-1` -> does not contribute).
#[derive(Debug)]
pub struct GenericFunctionData {
    pub name: Symbol,
    pub context: RefCell<Option<Rc<RefCell<Module>>>>,
    pub min_arity: usize,
    pub variadic: bool,
    pub type_parameters: usize,
    pub param_type_indices: Vec<i32>,
}

/// Opaque native value: a type descriptor plus an arbitrary Rust payload.
/// The payload's own `Drop` impl realizes spec's "destructor function which
/// runs on final drop" without needing an explicit function pointer field or
/// any `unsafe` pointer arithmetic.
pub struct PointerData {
    pub descriptor: Type,
    pub payload: Box<dyn std::any::Any>,
}

impl fmt::Debug for PointerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointerData({})", self.descriptor)
    }
}

/// Native callable: `(argument slice, interpreter) -> value`, matching spec
/// §3's "native function of (argument vector, dynamic scope) -> value". The
/// interpreter stands in for "dynamic scope": natives need access to the
/// type registry, module registry, and error state, all of which live there.
pub type NativeFn = Rc<dyn Fn(&Interpreter, &[Value]) -> crate::error::RunResult<Value>>;

/// Non-owning reference to a scope binding (spec §3 `weak reference`). Used
/// both for the user-visible `(weak T)` container and, internally, to tie
/// the knot for mutually recursive `let`/`def` closures (spec §9).
pub type WeakBinding = std::rc::Weak<Binding>;
