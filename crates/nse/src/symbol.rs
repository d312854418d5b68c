//! Symbols and per-module interning.
//!
//! Grounded on `ouros::intern`'s string-interner shape, generalized: NSE
//! interns *symbols* (not raw strings) per `(module, name)` pair, as spec §3
//! requires ("pointer-equal within a (module, name) pair"). Uninterned
//! symbols (`#:name`, spec §4.3) skip the table entirely.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use crate::module::Module;

/// The backing data of an interned or uninterned symbol.
///
/// Identity is by pointer (`Rc::ptr_eq`): `intern(module, "foo") ==
/// intern(module, "foo")` holds because both calls return the *same* `Rc`.
#[derive(Debug)]
pub struct SymbolData {
    pub name: Rc<str>,
    /// Home module. `None` for uninterned symbols (`#:name`) and for
    /// keywords read before the shared keyword module exists.
    pub home: RefCell<Option<Rc<RefCell<Module>>>>,
}

pub type Symbol = Rc<SymbolData>;

impl PartialEq for SymbolData {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}
impl Eq for SymbolData {}

impl std::hash::Hash for SymbolData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (std::ptr::from_ref(self) as usize).hash(state);
    }
}

impl fmt::Display for SymbolData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Per-module symbol table: `name -> Symbol`. Lives on `Module` (spec §3:
/// "Interning is idempotent"). A fresh `Module` starts with an empty table;
/// `intern` both creates-or-finds the entry and registers home-module
/// backlink at first creation.
#[derive(Debug, Default)]
pub struct SymbolTable(HashMap<Rc<str>, Symbol>);

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name` in `home`'s table, creating the entry on first use.
    pub fn intern(&mut self, home: &Rc<RefCell<Module>>, name: &str) -> Symbol {
        if let Some(sym) = self.0.get(name) {
            return Rc::clone(sym);
        }
        let sym: Symbol = Rc::new(SymbolData {
            name: Rc::from(name),
            home: RefCell::new(Some(Rc::clone(home))),
        });
        self.0.insert(Rc::clone(&sym.name), Rc::clone(&sym));
        sym
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.0.get(name).cloned()
    }

    /// Registers an already-interned symbol (from another module's external
    /// table) as usable unqualified here, without changing its home module.
    pub fn insert_existing(&mut self, name: &str, symbol: Symbol) {
        self.0.insert(Rc::from(name), symbol);
    }
}

/// Creates a fresh uninterned symbol (`#:name`, spec §4.3). Has no home
/// module and is never shared via any table.
#[must_use]
pub fn uninterned(name: &str) -> Symbol {
    Rc::new(SymbolData { name: Rc::from(name), home: RefCell::new(None) })
}
