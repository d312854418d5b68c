//! Modules: per-module namespaces, symbol interning, and the multimethod
//! registry (spec §3/§4.5).

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use ahash::AHashMap;

use crate::{
    symbol::{Symbol, SymbolTable},
    types::{Type, TypeKey},
    value::Value,
};

/// A namespace is one of the four per-module symbol tables. Keyed directly
/// by `Symbol` (pointer identity), since lookup never needs to cross
/// modules: "Namespace lookup of a symbol `s` in module `m` consults only
/// `m`'s namespaces (no global fallback)" (spec §3).
#[derive(Debug, Default)]
pub struct NamespaceMap(AHashMap<Symbol, Value>);

impl NamespaceMap {
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<Value> {
        self.0.get(symbol).cloned()
    }

    /// Installs `value` under `symbol`. A fresh definition in `defs` deletes
    /// any prior binding of the same symbol (spec §4.5): in the `Rc` world
    /// this just means the old `Value` is replaced and its `Rc`s drop
    /// naturally once nothing else references them.
    pub fn set(&mut self, symbol: Symbol, value: Value) {
        self.0.insert(symbol, value);
    }

    pub fn remove(&mut self, symbol: &Symbol) {
        self.0.remove(symbol);
    }
}

/// One registered method: its declared parameter types plus the callable
/// implementation (a closure or native, spec §4.8).
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub param_types: Vec<Type>,
    pub implementation: Value,
}

/// Keyed by `(function name, first-parameter type)`; each entry is a linked
/// list (here: `Vec`, appended in declaration order, spec §9's "linear scan
/// over a linked list") of candidate methods (spec §4.5/§4.8).
#[derive(Debug, Default)]
pub struct MethodRegistry(HashMap<(Symbol, TypeKey), Vec<MethodEntry>>);

impl MethodRegistry {
    pub fn add(&mut self, name: Symbol, first_type: Type, entry: MethodEntry) {
        self.0.entry((name, TypeKey(first_type))).or_default().push(entry);
    }

    #[must_use]
    pub fn lookup(&self, name: &Symbol, first_type: &Type) -> Option<&[MethodEntry]> {
        self.0.get(&(Rc::clone(name), TypeKey(Rc::clone(first_type)))).map(Vec::as_slice)
    }

    /// Unions another registry's entries into this one (spec §3: "Imports
    /// ... union the method registry").
    pub fn union_from(&mut self, other: &MethodRegistry) {
        for (key, entries) in &other.0 {
            self.0.entry(key.clone()).or_default().extend(entries.iter().cloned());
        }
    }
}

/// A module: name plus four namespaces, internal/external symbol tables,
/// and a method registry (spec §3).
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub defs: NamespaceMap,
    pub macro_defs: NamespaceMap,
    pub type_defs: NamespaceMap,
    pub read_macro_defs: NamespaceMap,
    /// This module's own interning table, a.k.a. its internal symbol table:
    /// every symbol usable unqualified here, whether defined locally or
    /// imported.
    pub internal: SymbolTable,
    /// The subset of `internal` this module exports, by name (spec §3:
    /// "Imports copy external symbols from source to destination's internal
    /// table").
    pub external: AHashMap<String, Symbol>,
    pub methods: MethodRegistry,
}

impl Module {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defs: NamespaceMap::default(),
            macro_defs: NamespaceMap::default(),
            type_defs: NamespaceMap::default(),
            read_macro_defs: NamespaceMap::default(),
            internal: SymbolTable::new(),
            external: AHashMap::default(),
            methods: MethodRegistry::default(),
        }
    }

    /// Marks `symbol` as exported under its own name.
    pub fn export(&mut self, symbol: &Symbol) {
        self.external.insert(symbol.name.to_string(), Rc::clone(symbol));
    }
}

/// Process-wide (per-`Interpreter`) registry mapping module names to
/// modules, lazily initialized (spec §3: "`lang` ... and `keyword` module
/// are created on first use").
#[derive(Debug, Default)]
pub struct ModuleRegistry(AHashMap<String, Rc<RefCell<Module>>>);

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the module named `name`, creating it (empty) on first use.
    pub fn get_or_create(&mut self, name: &str) -> Rc<RefCell<Module>> {
        if let Some(m) = self.0.get(name) {
            return Rc::clone(m);
        }
        let module = Rc::new(RefCell::new(Module::new(name)));
        self.0.insert(name.to_string(), Rc::clone(&module));
        module
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<RefCell<Module>>> {
        self.0.get(name).cloned()
    }

    pub fn insert(&mut self, name: &str, module: Rc<RefCell<Module>>) {
        self.0.insert(name.to_string(), module);
    }
}

/// Copies `source`'s external symbols into `dest`'s internal table and
/// unions the method registry (spec §3 "imports").
pub fn use_module(dest: &Rc<RefCell<Module>>, source: &Rc<RefCell<Module>>) {
    let (names, values): (Vec<_>, Vec<_>) = {
        let src = source.borrow();
        let names: Vec<String> = src.external.keys().cloned().collect();
        let values: Vec<Symbol> = names.iter().map(|n| src.external[n].clone()).collect();
        (names, values)
    };
    {
        let mut d = dest.borrow_mut();
        for (name, sym) in names.iter().zip(values.iter()) {
            d.internal.insert_existing(name, Rc::clone(sym));
        }
    }
    let methods = source.borrow().methods_clone();
    dest.borrow_mut().methods.union_from(&methods);
}

impl Module {
    fn methods_clone(&self) -> MethodRegistry {
        let mut out = MethodRegistry::default();
        out.union_from(&self.methods);
        out
    }
}
