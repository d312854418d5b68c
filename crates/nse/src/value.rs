//! The tagged value representation (spec §3) and `equals` (spec §4.1).
//!
//! Grounded on `ouros::value`'s `Value` enum shape (a tagged union with
//! immediate variants stored inline and heap-bearing variants stored behind
//! a handle) but realized with `Rc`/`Rc<RefCell<_>>` directly instead of an
//! arena + manual refcounting (spec §9's design note): `Value` derives
//! `Clone` and that *is* `copy_value`; an ordinary `Drop` is `delete_value`.

use std::{cell::RefCell, fmt, hash::Hasher, rc::Rc};

use crate::{
    object::{
        ArraySliceData, DataValue, GenericFunctionData, HashMapData, ListNode, MutSeq, NativeFn, PointerData,
        SyntaxData, VectorData, VectorSliceData, WeakBinding,
    },
    symbol::Symbol,
    types::Type,
};

/// Primary value type. See spec §3 for the full variant list and invariants.
#[derive(Clone)]
pub enum Value {
    Unit,
    /// The error marker. Never a legitimate value of a computation that
    /// succeeded (spec §3 invariant).
    Undefined,
    I64(i64),
    F64(f64),
    String(Rc<str>),
    Symbol(Symbol),
    /// Symbol-like, always interned in the shared `keyword` module.
    Keyword(Symbol),
    Vector(Rc<VectorData>),
    VectorSlice(Rc<VectorSliceData>),
    Array(MutSeq),
    ArraySlice(Rc<ArraySliceData>),
    ArrayBuffer(MutSeq),
    /// The empty list is `List(None)`.
    List(Option<Rc<ListNode>>),
    HashMap(Rc<RefCell<HashMapData>>),
    Quote(Rc<Value>),
    TypeQuote(Rc<Value>),
    /// Wraps an argument vector used by tail-call rewriting (spec §4.9).
    Continue(Rc<[Value]>),
    Data(Rc<DataValue>),
    /// Source-position wrapper. Appears only in the read tree and during
    /// macro-body evaluation.
    Syntax(Rc<SyntaxData>),
    Closure(Rc<ClosureData>),
    GenericFunction(Rc<GenericFunctionData>),
    WeakRef(WeakBinding),
    Pointer(Rc<PointerData>),
    FunctionPointer(NativeFn),
    Type(Type),
}

use crate::object::ClosureData;

/// Result of `equals`: a third `Error` case makes failure contagious without
/// forcing every call site to unwrap a `Result` for what is usually a
/// boolean question (spec §4.1).
pub enum EqResult {
    Equal,
    NotEqual,
    Error(crate::error::RunError),
}

impl EqResult {
    #[must_use]
    pub fn is_equal(&self) -> bool {
        matches!(self, EqResult::Equal)
    }
}

/// Peeks through `Syntax` wrappers. Idempotent per spec §3 invariant: peeking
/// through syntax yields the quoted value exactly once (i.e. syntax wrappers
/// never nest in practice, but this helper is safe either way).
#[must_use]
pub fn peek<'a>(v: &'a Value) -> &'a Value {
    match v {
        Value::Syntax(s) => peek(&s.inner),
        _ => v,
    }
}

/// Deep structural equality per spec §4.1.
#[must_use]
pub fn equals(a: &Value, b: &Value) -> EqResult {
    let a = peek(a);
    let b = peek(b);
    if matches!(a, Value::Undefined) || matches!(b, Value::Undefined) {
        return EqResult::Error(crate::error::RunError::domain("cannot compare undefined"));
    }
    // `a.type != b.type` returns not-equal before any type-specific
    // comparison (`nse-v/value.c:62-64`): `i64`/`f64`, `vector`/`vector-slice`,
    // and the array family never cross-compare, matching variant is checked
    // first for every case below.
    match (a, b) {
        (Value::Unit, Value::Unit) => EqResult::Equal,
        (Value::I64(x), Value::I64(y)) => bool_eq(x == y),
        (Value::F64(x), Value::F64(y)) => bool_eq(x == y),
        (Value::String(x), Value::String(y)) => bool_eq(x.as_bytes() == y.as_bytes()),
        (Value::Symbol(x), Value::Symbol(y)) | (Value::Keyword(x), Value::Keyword(y)) => {
            bool_eq(Rc::ptr_eq(x, y))
        }
        (Value::Vector(x), Value::Vector(y)) => vec_eq(&x.0, &y.0),
        (Value::VectorSlice(x), Value::VectorSlice(y)) => {
            vec_eq(&x.base.0[x.offset..x.offset + x.len], &y.base.0[y.offset..y.offset + y.len])
        }
        (Value::List(x), Value::List(y)) => vec_eq(&ListNode::to_vec(x.as_ref()), &ListNode::to_vec(y.as_ref())),
        (Value::Quote(x), Value::Quote(y)) | (Value::TypeQuote(x), Value::TypeQuote(y)) => equals(x, y),
        (Value::Data(x), Value::Data(y)) => {
            if !Rc::ptr_eq(&x.ty, &y.ty) || !Rc::ptr_eq(&x.tag, &y.tag) {
                return EqResult::NotEqual;
            }
            vec_eq(&x.fields, &y.fields)
        }
        (Value::Type(x), Value::Type(y)) => bool_eq(Rc::ptr_eq(x, y)),
        (Value::Closure(x), Value::Closure(y)) => bool_eq(Rc::ptr_eq(x, y)),
        (Value::FunctionPointer(x), Value::FunctionPointer(y)) => bool_eq(Rc::ptr_eq(x, y)),
        (Value::Pointer(x), Value::Pointer(y)) => bool_eq(Rc::ptr_eq(x, y)),
        (Value::GenericFunction(x), Value::GenericFunction(y)) => bool_eq(Rc::ptr_eq(x, y)),
        (Value::HashMap(x), Value::HashMap(y)) => bool_eq(Rc::ptr_eq(x, y)),
        // `nse-v/value.c:91-94`: the array family never compares, matching
        // variant or not.
        (Value::Array(_), Value::Array(_))
        | (Value::ArrayBuffer(_), Value::ArrayBuffer(_))
        | (Value::ArraySlice(_), Value::ArraySlice(_)) => {
            EqResult::Error(crate::error::RunError::domain("array values cannot be compared"))
        }
        _ => EqResult::NotEqual,
    }
}

fn bool_eq(b: bool) -> EqResult {
    if b { EqResult::Equal } else { EqResult::NotEqual }
}

fn vec_eq(a: &[Value], b: &[Value]) -> EqResult {
    if a.len() != b.len() {
        return EqResult::NotEqual;
    }
    for (x, y) in a.iter().zip(b) {
        match equals(x, y) {
            EqResult::Equal => {}
            EqResult::NotEqual => return EqResult::NotEqual,
            err @ EqResult::Error(_) => return err,
        }
    }
    EqResult::Equal
}

/// Non-failing structural equality used for hash-map keys (spec's invariant
/// that undefined never appears in a live container makes the error case
/// here unreachable in practice).
#[must_use]
pub fn structural_eq(a: &Value, b: &Value) -> bool {
    equals(a, b).is_equal()
}

/// Hash consistent with `structural_eq`, used by `HashKey`.
pub fn hash_value<H: Hasher>(v: &Value, state: &mut H) {
    let v = peek(v);
    match v {
        Value::Unit => 0u8.hash(state),
        Value::Undefined => 1u8.hash(state),
        Value::I64(i) => {
            2u8.hash(state);
            i.hash(state);
        }
        Value::F64(f) => {
            9u8.hash(state);
            f.to_bits().hash(state);
        }
        Value::String(s) => {
            3u8.hash(state);
            s.as_bytes().hash(state);
        }
        Value::Symbol(s) | Value::Keyword(s) => {
            4u8.hash(state);
            (std::rc::Rc::as_ptr(s) as usize).hash(state);
        }
        Value::Vector(v) => {
            5u8.hash(state);
            for e in &v.0 {
                hash_value(e, state);
            }
        }
        Value::VectorSlice(v) => {
            5u8.hash(state);
            for e in &v.base.0[v.offset..v.offset + v.len] {
                hash_value(e, state);
            }
        }
        Value::List(l) => {
            6u8.hash(state);
            for e in ListNode::to_vec(l.as_ref()) {
                hash_value(&e, state);
            }
        }
        Value::Quote(x) | Value::TypeQuote(x) => hash_value(x, state),
        Value::Data(d) => {
            7u8.hash(state);
            (std::rc::Rc::as_ptr(&d.ty) as usize).hash(state);
            (std::rc::Rc::as_ptr(&d.tag) as usize).hash(state);
            for f in &d.fields {
                hash_value(f, state);
            }
        }
        _ => use_identity_hash(v, state),
    }
}

use std::hash::Hash;

fn use_identity_hash<H: Hasher>(v: &Value, state: &mut H) {
    8u8.hash(state);
    match v {
        Value::Closure(x) => (std::rc::Rc::as_ptr(x) as *const () as usize).hash(state),
        Value::GenericFunction(x) => (std::rc::Rc::as_ptr(x) as *const () as usize).hash(state),
        Value::Pointer(x) => (std::rc::Rc::as_ptr(x) as *const () as usize).hash(state),
        Value::HashMap(x) => (std::rc::Rc::as_ptr(x) as *const () as usize).hash(state),
        Value::Array(x) | Value::ArrayBuffer(x) => (std::rc::Rc::as_ptr(x) as *const () as usize).hash(state),
        Value::Type(x) => (std::rc::Rc::as_ptr(x) as *const () as usize).hash(state),
        _ => 0usize.hash(state),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Undefined => write!(f, "#undefined"),
            Value::I64(i) => write!(f, "{i}"),
            Value::F64(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Keyword(s) => write!(f, ":{s}"),
            Value::Vector(v) => write_seq(f, &v.0),
            Value::VectorSlice(v) => write_seq(f, &v.base.0[v.offset..v.offset + v.len]),
            Value::Array(a) | Value::ArrayBuffer(a) => write_seq(f, &a.borrow()),
            Value::ArraySlice(a) => write_seq(f, &a.base.borrow()[a.offset..a.offset + a.len]),
            Value::List(l) => {
                write!(f, "(")?;
                let items = ListNode::to_vec(l.as_ref());
                for (i, e) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Value::HashMap(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.borrow().0.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} {v}", k.0)?;
                }
                write!(f, "}}")
            }
            Value::Quote(x) => write!(f, "'{x}"),
            Value::TypeQuote(x) => write!(f, "^{x}"),
            Value::Continue(args) => write_seq(f, args),
            Value::Data(d) => {
                write!(f, "({}", d.tag)?;
                for field in &d.fields {
                    write!(f, " {field}")?;
                }
                write!(f, ")")
            }
            Value::Syntax(s) => write!(f, "{}", s.inner),
            Value::Closure(c) => {
                write!(f, "#<closure {}>", c.name.borrow().as_ref().map_or_else(|| "anonymous".to_string(), |n| n.to_string()))
            }
            Value::GenericFunction(g) => write!(f, "#<generic-function {}>", g.name),
            Value::WeakRef(_) => write!(f, "#<weak>"),
            Value::Pointer(p) => write!(f, "#<pointer {}>", p.descriptor),
            Value::FunctionPointer(_) => write!(f, "#<native-function>"),
            Value::Type(t) => write!(f, "{t}"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, e) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{e}")?;
    }
    write!(f, "]")
}
