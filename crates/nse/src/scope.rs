//! Lexical scope frames and bindings (spec §3/§4.5).

use std::{cell::RefCell, rc::Rc};

use crate::{module::Module, symbol::Symbol, value::Value};

/// A binding holds a value and a strong/weak flag. Weak bindings are used to
/// tie the knot for closures that refer to themselves or each other in
/// `let` (spec §3).
#[derive(Debug)]
pub struct Binding {
    pub value: RefCell<Value>,
    pub weak: bool,
}

/// A scope is a linked stack of frames. Each frame holds an optional
/// `symbol -> binding` entry plus a back-pointer to the previous frame and a
/// reference to the current module (spec §3).
#[derive(Debug, Clone)]
pub struct Scope(Rc<Frame>);

#[derive(Debug)]
struct Frame {
    entry: Option<(Symbol, Rc<Binding>)>,
    parent: Option<Scope>,
    module: Rc<RefCell<Module>>,
}

impl Scope {
    /// Creates a root scope for `module` with no bindings (a `use_module`
    /// scope per spec §3: "has its current-module slot set and no enclosing
    /// frame").
    #[must_use]
    pub fn root(module: Rc<RefCell<Module>>) -> Self {
        Self(Rc::new(Frame { entry: None, parent: None, module }))
    }

    #[must_use]
    pub fn module(&self) -> Rc<RefCell<Module>> {
        Rc::clone(&self.0.module)
    }

    /// Pushes a fresh frame binding `symbol` to `value`, returning the new
    /// scope. The caller retains the old scope value (the frame chain above
    /// any earlier scope reference is unaffected, satisfying spec's "scope
    /// pop releases exactly the frames above the pop point" by construction:
    /// nothing is ever mutated, only extended).
    #[must_use]
    pub fn push(&self, symbol: Symbol, value: Value) -> Self {
        self.push_binding(symbol, value, false)
    }

    #[must_use]
    pub fn push_binding(&self, symbol: Symbol, value: Value, weak: bool) -> Self {
        let binding = Rc::new(Binding { value: RefCell::new(value), weak });
        Self(Rc::new(Frame {
            entry: Some((symbol, binding)),
            parent: Some(self.clone()),
            module: Rc::clone(&self.0.module),
        }))
    }

    /// Looks up `symbol` by walking frames, then falling back to the current
    /// module's value namespace (spec §4.5 `scope_get`).
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<Value> {
        let mut frame = self.0.clone();
        loop {
            if let Some((s, b)) = &frame.entry {
                if Rc::ptr_eq(s, symbol) {
                    return Some(b.value.borrow().clone());
                }
            }
            match &frame.parent {
                Some(p) => frame = p.0.clone(),
                None => break,
            }
        }
        frame.module.borrow().defs.get(symbol)
    }

    /// Finds the nearest frame binding `symbol`, without falling back to the
    /// module namespace. Used by `set!`-like operations on weak bindings.
    #[must_use]
    pub fn find_binding(&self, symbol: &Symbol) -> Option<Rc<Binding>> {
        let mut frame = self.0.clone();
        loop {
            if let Some((s, b)) = &frame.entry {
                if Rc::ptr_eq(s, symbol) {
                    return Some(Rc::clone(b));
                }
            }
            match &frame.parent {
                Some(p) => frame = p.0.clone(),
                None => return None,
            }
        }
    }

    /// Overwrites the value of an existing binding found by `find_binding`
    /// (spec §4.5 `scope_set`: "updates a frame (weak-tie for mutually
    /// recursive closures)").
    pub fn set(binding: &Rc<Binding>, value: Value) {
        *binding.value.borrow_mut() = value;
    }
}
