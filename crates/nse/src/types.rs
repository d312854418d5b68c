//! The parametric type lattice: concrete and generic types, instance
//! interning, function-arity types, subtyping, and unification.
//!
//! Grounded on `nse-v/type.h`/`type.c` (the normative original-source type
//! system) for exact semantics, re-expressed with `Rc`-based interning tables
//! instead of hand-rolled reference counts (spec §9's design note). The
//! per-process (really: per-`Interpreter`) interning tables live in
//! `TypeRegistry`, owned by `crate::interp::Interpreter`.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    rc::{Rc, Weak},
};

use crate::{
    error::{RunResult, RunError},
    symbol::Symbol,
};

/// A concrete or generic-variable type node. Interned: two types with
/// identical structure are the same `Rc` (spec §3 "Type identity is by
/// pointer").
#[derive(Debug)]
pub struct TypeData {
    pub kind: TypeKind,
    pub super_type: RefCell<Option<Type>>,
    pub name: RefCell<Option<Symbol>>,
}

pub type Type = Rc<TypeData>;

#[derive(Debug)]
pub enum TypeKind {
    /// A named or anonymous simple type with an optional supertype.
    Simple,
    /// `(min_arity, variadic)`, interned singleton per pair.
    FunctionArity { min_arity: usize, variadic: bool },
    /// `G[T1..Tn]`, interned per `(generic, params)`.
    Instance { generic: GenericType, params: Rc<[Type]> },
    /// The uninstantiated form `G[?,...,?]`, one singleton per generic.
    PolyInstance { generic: GenericType },
    /// Placeholder for parameter `index` of `generic`, used inside generic
    /// type bodies.
    PolyVar { generic: GenericType, index: usize },
}

/// A generic type: arity, optional name/supertype, and a weak-valued
/// instance cache (spec §3: "weak-valued map of its instances").
#[derive(Debug)]
pub struct GenericData {
    pub arity: usize,
    pub name: RefCell<Option<Symbol>>,
    pub super_type: RefCell<Option<Type>>,
    instances: RefCell<Vec<(Rc<[Type]>, Weak<TypeData>)>>,
    poly_instance: RefCell<Weak<TypeData>>,
}

pub type GenericType = Rc<GenericData>;

fn ptr_eq_type(a: &Type, b: &Type) -> bool {
    Rc::ptr_eq(a, b)
}

fn params_eq(a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| ptr_eq_type(x, y))
}

/// Built-in singleton types and generics, created once at startup (spec §4.2
/// invariant).
#[derive(Debug)]
pub struct TypeRegistry {
    pub nothing: Type,
    pub any: Type,
    pub unit: Type,
    pub bool_: Type,
    pub num: Type,
    pub int: Type,
    pub float: Type,
    pub i64_: Type,
    pub f64_: Type,
    pub string: Type,
    pub symbol: Type,
    pub keyword: Type,
    pub syntax: Type,
    pub type_: Type,
    pub func: Type,
    pub scope: Type,
    pub stream: Type,
    pub continue_: Type,
    pub generic_type: Type,

    pub result: GenericType,
    pub vector: GenericType,
    pub vector_slice: GenericType,
    pub list: GenericType,
    pub weak: GenericType,
    pub hash_map: GenericType,
    pub entry: GenericType,

    func_types: RefCell<HashMap<(usize, bool), Type>>,
}

fn simple(super_type: Option<&Type>) -> Type {
    Rc::new(TypeData {
        kind: TypeKind::Simple,
        super_type: RefCell::new(super_type.cloned()),
        name: RefCell::new(None),
    })
}

fn generic(arity: usize, super_type: Option<&Type>) -> GenericType {
    Rc::new(GenericData {
        arity,
        name: RefCell::new(None),
        super_type: RefCell::new(super_type.cloned()),
        instances: RefCell::new(Vec::new()),
        poly_instance: RefCell::new(Weak::new()),
    })
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        let any = simple(None);
        let unit = simple(Some(&any));
        let bool_ = simple(Some(&any));
        let num = simple(Some(&any));
        let int = simple(Some(&num));
        let float = simple(Some(&num));
        let i64_ = simple(Some(&int));
        let f64_ = simple(Some(&float));
        let string = simple(Some(&any));
        let symbol = simple(Some(&any));
        let keyword = simple(Some(&any));
        let syntax = simple(Some(&any));
        let type_ = simple(Some(&any));
        let func = simple(Some(&any));
        let scope = simple(Some(&any));
        let stream = simple(Some(&any));
        let continue_ = simple(Some(&any));
        let generic_type = simple(Some(&any));
        // `nothing` has no supertype of its own; it is a subtype of every
        // type by special-casing in `is_subtype_of` rather than by walking a
        // super chain (it sits "below" the lattice, not inside it).
        let nothing = simple(None);

        let result = generic(1, Some(&any));
        let vector = generic(1, Some(&any));
        let vector_slice = generic(1, Some(&any));
        let list = generic(1, Some(&any));
        let weak = generic(1, Some(&any));
        let hash_map = generic(2, Some(&any));
        let entry = generic(2, Some(&any));

        Self {
            nothing,
            any,
            unit,
            bool_,
            num,
            int,
            float,
            i64_,
            f64_,
            string,
            symbol,
            keyword,
            syntax,
            type_,
            func,
            scope,
            stream,
            continue_,
            generic_type,
            result,
            vector,
            vector_slice,
            list,
            weak,
            hash_map,
            entry,
            func_types: RefCell::new(HashMap::new()),
        }
    }

    /// Creates a fresh simple type under `super_type` (`def-data`, non-generic
    /// case). `None` means the new type's supertype is `any`.
    #[must_use]
    pub fn create_simple_type(&self, super_type: Option<&Type>) -> Type {
        simple(Some(super_type.unwrap_or(&self.any)))
    }

    #[must_use]
    pub fn create_generic(&self, arity: usize, super_type: Option<&Type>) -> GenericType {
        generic(arity, Some(super_type.unwrap_or(&self.any)))
    }

    #[must_use]
    pub fn create_poly_var(&self, g: &GenericType, index: usize) -> Type {
        Rc::new(TypeData {
            kind: TypeKind::PolyVar { generic: Rc::clone(g), index },
            super_type: RefCell::new(Some(self.any.clone())),
            name: RefCell::new(None),
        })
    }

    /// Intern-or-create `G[params]`. Errors if `params.len() != arity(G)`.
    pub fn get_instance(&self, g: &GenericType, params: &[Type]) -> RunResult<Type> {
        if params.len() != g.arity {
            return Err(RunError::domain(format!(
                "generic type expects {} parameter(s), got {}",
                g.arity,
                params.len()
            )));
        }
        let mut instances = g.instances.borrow_mut();
        instances.retain(|(_, w)| w.strong_count() > 0);
        if let Some((_, weak)) = instances.iter().find(|(p, _)| params_eq(p, params)) {
            if let Some(existing) = weak.upgrade() {
                return Ok(existing);
            }
        }
        let params_rc: Rc<[Type]> = Rc::from(params.to_vec().into_boxed_slice());
        let t = Rc::new(TypeData {
            kind: TypeKind::Instance { generic: Rc::clone(g), params: Rc::clone(&params_rc) },
            super_type: RefCell::new(Some(
                g.super_type.borrow().clone().unwrap_or_else(|| self.any.clone()),
            )),
            name: RefCell::new(g.name.borrow().clone()),
        });
        instances.push((params_rc, Rc::downgrade(&t)));
        Ok(t)
    }

    pub fn get_unary_instance(&self, g: &GenericType, param: &Type) -> RunResult<Type> {
        self.get_instance(g, std::slice::from_ref(param))
    }

    /// Singleton "uninstantiated" form `G[?,...,?]`.
    #[must_use]
    pub fn get_poly_instance(&self, g: &GenericType) -> Type {
        if let Some(existing) = g.poly_instance.borrow().upgrade() {
            return existing;
        }
        let t = Rc::new(TypeData {
            kind: TypeKind::PolyInstance { generic: Rc::clone(g) },
            super_type: RefCell::new(Some(
                g.super_type.borrow().clone().unwrap_or_else(|| self.any.clone()),
            )),
            name: RefCell::new(g.name.borrow().clone()),
        });
        *g.poly_instance.borrow_mut() = Rc::downgrade(&t);
        t
    }

    /// Interned by `(min_arity, variadic)`.
    #[must_use]
    pub fn get_func_type(&self, min_arity: usize, variadic: bool) -> Type {
        if let Some(existing) = self.func_types.borrow().get(&(min_arity, variadic)) {
            return Rc::clone(existing);
        }
        let t = Rc::new(TypeData {
            kind: TypeKind::FunctionArity { min_arity, variadic },
            super_type: RefCell::new(Some(self.func.clone())),
            name: RefCell::new(None),
        });
        self.func_types.borrow_mut().insert((min_arity, variadic), Rc::clone(&t));
        t
    }

    /// `true` if `a` is a subtype of or equal to `b`.
    #[must_use]
    pub fn is_subtype_of(&self, a: &Type, b: &Type) -> bool {
        if ptr_eq_type(a, &self.nothing) {
            return true;
        }
        let mut cur = Rc::clone(a);
        loop {
            if ptr_eq_type(&cur, b) {
                return true;
            }
            // A polymorphic instance of G is a supertype of any instance of G.
            if let TypeKind::PolyInstance { generic: bg } = &b.kind {
                if let TypeKind::Instance { generic: cg, .. } = &cur.kind {
                    if Rc::ptr_eq(bg, cg) {
                        return true;
                    }
                }
            }
            let next = cur.super_type.borrow().clone();
            match next {
                Some(s) if !ptr_eq_type(&s, &cur) => cur = s,
                _ => return false,
            }
        }
    }

    /// Pointwise subtype test over two equal-length type vectors.
    #[must_use]
    pub fn are_subtypes_of(&self, a: &[Type], b: &[Type]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        if params_eq(a, b) {
            return true;
        }
        a.iter().zip(b).all(|(x, y)| self.is_subtype_of(x, y))
    }

    pub(crate) fn super_chain(&self, t: &Type) -> Vec<Type> {
        let mut chain = vec![Rc::clone(t)];
        let mut cur = Rc::clone(t);
        while let Some(s) = cur.super_type.borrow().clone() {
            if ptr_eq_type(&s, &cur) {
                break;
            }
            chain.push(Rc::clone(&s));
            cur = s;
        }
        chain
    }

    /// Nearest common ancestor of `a` and `b`, falling back to `any`.
    #[must_use]
    pub fn unify_types(&self, a: &Type, b: &Type) -> Type {
        if ptr_eq_type(a, b) {
            return Rc::clone(a);
        }
        // Polymorphic and concrete instances of the same generic unify to
        // the concrete one.
        if let (TypeKind::PolyInstance { generic: ga }, TypeKind::Instance { generic: gb, .. }) = (&a.kind, &b.kind) {
            if Rc::ptr_eq(ga, gb) {
                return Rc::clone(b);
            }
        }
        if let (TypeKind::Instance { generic: ga, .. }, TypeKind::PolyInstance { generic: gb }) = (&a.kind, &b.kind) {
            if Rc::ptr_eq(ga, gb) {
                return Rc::clone(a);
            }
        }
        let a_chain = self.super_chain(a);
        for cand in self.super_chain(b) {
            if a_chain.iter().any(|t| ptr_eq_type(t, &cand)) {
                return cand;
            }
        }
        self.any.clone()
    }

    /// Substitutes occurrences of `g`'s polymorphic variables in `t` with
    /// `params`, recursing into instance parameter vectors.
    #[must_use]
    pub fn instantiate_type(&self, t: &Type, g: &GenericType, params: &[Type]) -> Type {
        match &t.kind {
            TypeKind::PolyVar { generic: vg, index } if Rc::ptr_eq(vg, g) => {
                params.get(*index).cloned().unwrap_or_else(|| self.any.clone())
            }
            TypeKind::Instance { generic: ig, params: iparams } => {
                let new_params: Vec<Type> =
                    iparams.iter().map(|p| self.instantiate_type(p, g, params)).collect();
                if params_eq(&new_params, iparams) {
                    Rc::clone(t)
                } else {
                    self.get_instance(ig, &new_params).unwrap_or_else(|_| self.any.clone())
                }
            }
            _ => Rc::clone(t),
        }
    }

    /// Returns the type of a runtime value (`nse-v/type.h`'s `get_type`).
    /// Containers whose type depends on contents (spec §3: "A list's `type`
    /// field is computed as `(list T)` where T is the unification of element
    /// types") unify element types on the fly rather than caching a type on
    /// the value itself.
    #[must_use]
    pub fn get_type(&self, v: &crate::value::Value) -> Type {
        use crate::value::Value;
        match crate::value::peek(v) {
            Value::Unit => self.unit.clone(),
            Value::Undefined => self.any.clone(),
            Value::I64(_) => self.i64_.clone(),
            Value::F64(_) => self.f64_.clone(),
            Value::String(_) => self.string.clone(),
            Value::Symbol(_) => self.symbol.clone(),
            Value::Keyword(_) => self.keyword.clone(),
            Value::Vector(vec) => {
                let elem = self.unify_all(vec.0.iter());
                self.get_unary_instance(&self.vector, &elem).unwrap_or_else(|_| self.any.clone())
            }
            Value::VectorSlice(s) => {
                let elem = self.unify_all(s.base.0[s.offset..s.offset + s.len].iter());
                self.get_unary_instance(&self.vector_slice, &elem).unwrap_or_else(|_| self.any.clone())
            }
            Value::Array(a) | Value::ArrayBuffer(a) => {
                let elem = self.unify_all(a.borrow().iter());
                self.get_unary_instance(&self.vector, &elem).unwrap_or_else(|_| self.any.clone())
            }
            Value::ArraySlice(s) => {
                let elem = self.unify_all(s.base.borrow()[s.offset..s.offset + s.len].iter());
                self.get_unary_instance(&self.vector, &elem).unwrap_or_else(|_| self.any.clone())
            }
            Value::List(l) => {
                let items = crate::object::ListNode::to_vec(l.as_ref());
                let elem = self.unify_all(items.iter());
                self.get_unary_instance(&self.list, &elem).unwrap_or_else(|_| self.any.clone())
            }
            Value::HashMap(m) => {
                let b = m.borrow();
                let key = self.unify_all(b.0.keys().map(|k| &k.0));
                let val = self.unify_all(b.0.values());
                self.get_instance(&self.hash_map, &[key, val]).unwrap_or_else(|_| self.any.clone())
            }
            Value::Quote(_) | Value::TypeQuote(_) => self.any.clone(),
            Value::Continue(_) => self.continue_.clone(),
            Value::Data(d) => Rc::clone(&d.ty),
            Value::Syntax(_) => self.syntax.clone(),
            Value::Closure(c) => {
                let (min_arity, variadic) = crate::pattern::closure_arity(&c.params);
                self.get_func_type(min_arity, variadic)
            }
            Value::GenericFunction(g) => self.get_func_type(g.min_arity, g.variadic),
            Value::WeakRef(w) => {
                let inner = w.upgrade().map_or_else(|| self.nothing.clone(), |b| self.get_type(&b.value.borrow()));
                self.get_unary_instance(&self.weak, &inner).unwrap_or_else(|_| self.any.clone())
            }
            Value::Pointer(p) => Rc::clone(&p.descriptor),
            Value::FunctionPointer(_) => self.func.clone(),
            Value::Type(_) => self.type_.clone(),
        }
    }

    fn unify_all<'a>(&self, mut it: impl Iterator<Item = &'a crate::value::Value>) -> Type {
        let Some(first) = it.next() else { return self.any.clone() };
        let mut acc = self.get_type(first);
        for v in it {
            acc = self.unify_types(&acc, &self.get_type(v));
        }
        acc
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name.borrow().as_ref() {
            return write!(f, "{name}");
        }
        match &self.kind {
            TypeKind::Simple => write!(f, "<type>"),
            TypeKind::FunctionArity { min_arity, variadic } => {
                write!(f, "(func {min_arity}{})", if *variadic { "+" } else { "" })
            }
            TypeKind::Instance { generic, params } => {
                let gname = generic.name.borrow();
                write!(f, "{}[", gname.as_ref().map_or("<generic>".to_string(), ToString::to_string))?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, "]")
            }
            TypeKind::PolyInstance { generic } => {
                let gname = generic.name.borrow();
                write!(f, "{}[?]", gname.as_ref().map_or("<generic>".to_string(), ToString::to_string))
            }
            TypeKind::PolyVar { index, .. } => write!(f, "?{index}"),
        }
    }
}

/// Hashing/equality helper for using `Type` as a `HashMap` key by identity,
/// used by the method registry (spec §4.5/§4.8).
#[derive(Debug, Clone)]
pub struct TypeKey(pub Type);

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        ptr_eq_type(&self.0, &other.0)
    }
}
impl Eq for TypeKey {}
impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}
