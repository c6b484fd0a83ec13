//! Lexical scopes.
//!
//! A [`Scope`] is a shared, mutable symbol table. The [`ScopeChain`] is the
//! stack of active scopes, outermost (global) first. Closures capture a
//! flattened copy of every scope above the global one; the copy is itself a
//! shared `Scope`, so mutations made by one call of the closure are seen by
//! the next.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{SymbolRef, Value};

#[derive(Debug, Clone, Default)]
pub struct Scope(Rc<RefCell<HashMap<SymbolRef, Value>>>);

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sym: &SymbolRef) -> Option<Value> {
        self.0.borrow().get(sym).cloned()
    }

    pub fn contains(&self, sym: &SymbolRef) -> bool {
        self.0.borrow().contains_key(sym)
    }

    pub fn insert(&self, sym: SymbolRef, value: Value) {
        self.0.borrow_mut().insert(sym, value);
    }

    /// Overwrite an existing binding; returns false if the symbol isn't bound here
    pub fn set(&self, sym: &SymbolRef, value: Value) -> bool {
        match self.0.borrow_mut().get_mut(sym) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Sorted `(name, value)` pairs, for display
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut result: Vec<_> = self
            .0
            .borrow()
            .iter()
            .map(|(sym, value)| (sym.to_string(), value.clone()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// Stack of scopes; index 0 is the global scope and is never popped
#[derive(Debug)]
pub(crate) struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    pub(crate) fn new() -> Self {
        ScopeChain {
            scopes: vec![Scope::new()],
        }
    }

    pub(crate) fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub(crate) fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub(crate) fn current(&self) -> &Scope {
        // Never empty: the global scope is installed at construction and never popped
        &self.scopes[self.scopes.len() - 1]
    }

    pub(crate) fn global(&self) -> &Scope {
        &self.scopes[0]
    }

    pub(crate) fn get(&self, sym: &SymbolRef) -> Option<Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(sym))
    }

    /// Mutate the innermost scope holding `sym`
    pub(crate) fn set(&self, sym: &SymbolRef, value: Value) -> bool {
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.contains(sym))
            .is_some_and(|scope| scope.set(sym, value))
    }

    /// Flatten every non-global scope into one fresh scope, innermost wins
    pub(crate) fn capture(&self) -> Scope {
        let captured = Scope::new();
        for scope in self.scopes.iter().skip(1) {
            for (sym, value) in scope.0.borrow().iter() {
                captured.insert(sym.clone(), value.clone());
            }
        }
        captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::val;

    #[test]
    fn test_lookup_walks_outward_and_set_hits_innermost() {
        let x = SymbolRef::new("X", false, true);
        let mut chain = ScopeChain::new();
        chain.global().insert(x.clone(), val(1));

        let inner = Scope::new();
        inner.insert(x.clone(), val(2));
        chain.push(Scope::new());
        chain.push(inner.clone());
        assert_eq!(chain.get(&x), Some(val(2)));

        assert!(chain.set(&x, val(3)));
        assert_eq!(inner.get(&x), Some(val(3)));
        assert_eq!(chain.global().get(&x), Some(val(1)));

        chain.pop();
        assert_eq!(chain.get(&x), Some(val(1)));

        let unbound = SymbolRef::new("Y", false, true);
        assert!(!chain.set(&unbound, val(0)));
    }

    #[test]
    fn test_capture_flattens_non_global_scopes() {
        let (a, b) = (SymbolRef::new("A", false, true), SymbolRef::new("B", false, true));
        let mut chain = ScopeChain::new();
        chain.global().insert(a.clone(), val("global"));

        let outer = Scope::new();
        outer.insert(a.clone(), val("outer"));
        outer.insert(b.clone(), val("outer"));
        let inner = Scope::new();
        inner.insert(a.clone(), val("inner"));
        chain.push(outer);
        chain.push(inner);

        let captured = chain.capture();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured.get(&a), Some(val("inner")));
        assert_eq!(captured.get(&b), Some(val("outer")));

        // The global scope is never popped
        chain.pop();
        chain.pop();
        assert!(chain.pop().is_none());
        assert_eq!(chain.depth(), 1);
    }
}
