//! Named symbol containers.
//!
//! A namespace maps names to symbols. A subset of those symbols is exported and
//! becomes visible to other namespaces through [`Namespace::use_namespace`] and
//! [`Namespace::import`]. Locked namespaces refuse new symbols through
//! [`Namespace::intern`] but still accept explicit definitions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::Error;
use crate::ast::{SymbolRef, Value};

/// Shared handle to a namespace, as stored in the registry and in values
pub type NamespaceRef = Rc<RefCell<Namespace>>;

#[derive(Debug)]
pub struct Namespace {
    name: String,
    interned: HashMap<String, SymbolRef>,
    exported: HashMap<String, SymbolRef>,
    can_intern: bool,
    keywords: bool,
    uses: Vec<String>,
}

impl Namespace {
    pub fn new(name: impl Into<String>, can_intern: bool) -> Self {
        Namespace {
            name: name.into(),
            interned: HashMap::new(),
            exported: HashMap::new(),
            can_intern,
            keywords: false,
            uses: Vec::new(),
        }
    }

    /// Namespace whose symbols are keywords: reserved and exported on creation
    pub(crate) fn keyword_namespace(name: impl Into<String>) -> Self {
        Namespace {
            keywords: true,
            ..Namespace::new(name, true)
        }
    }

    pub fn into_ref(self) -> NamespaceRef {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// False for locked namespaces
    pub fn can_intern(&self) -> bool {
        self.can_intern
    }

    pub fn is_keyword_namespace(&self) -> bool {
        self.keywords
    }

    pub fn find_symbol(&self, name: &str) -> Option<SymbolRef> {
        self.interned.get(name).cloned()
    }

    pub fn find_exported_symbol(&self, name: &str) -> Option<SymbolRef> {
        self.exported.get(name).cloned()
    }

    /// Return the existing symbol for `name` or create a fresh one.
    /// Fails on a locked namespace when the symbol does not exist yet.
    pub fn intern(&mut self, name: &str) -> Result<SymbolRef, Error> {
        if let Some(sym) = self.interned.get(name) {
            return Ok(sym.clone());
        }
        if !self.can_intern {
            return Err(Error::NamespaceError(format!(
                "can't intern {name} in locked namespace {}",
                self.name
            )));
        }
        let sym = if self.keywords {
            SymbolRef::keyword(name)
        } else {
            SymbolRef::new(name, false, true)
        };
        self.interned.insert(name.to_string(), sym.clone());
        if self.keywords {
            self.exported.insert(name.to_string(), sym.clone());
        }
        Ok(sym)
    }

    /// Always create a new symbol, replacing any existing binding of the name
    pub fn define_symbol(
        &mut self,
        name: &str,
        reserved: bool,
        value: Option<Value>,
        export: bool,
    ) -> SymbolRef {
        let sym = match value {
            Some(value) => SymbolRef::with_value(name, reserved, value),
            None => SymbolRef::new(name, reserved, true),
        };
        self.add(sym.clone(), export);
        sym
    }

    /// Add an existing symbol under its own name
    pub fn add(&mut self, sym: SymbolRef, export: bool) {
        let name = sym.name().to_string();
        if export {
            self.exported.insert(name.clone(), sym.clone());
        }
        self.interned.insert(name, sym);
    }

    /// Export an interned symbol by name
    pub fn export(&mut self, name: &str) -> Result<SymbolRef, Error> {
        let sym = self.find_symbol(name).ok_or_else(|| {
            Error::NamespaceError(format!("{name} is not interned in {}", self.name))
        })?;
        self.exported.insert(name.to_string(), sym.clone());
        Ok(sym)
    }

    /// Make every exported symbol of `other` visible here, by reference
    pub fn use_namespace(&mut self, other: &Namespace) {
        for (name, sym) in &other.exported {
            self.interned.insert(name.clone(), sym.clone());
        }
        if !self.uses.iter().any(|used| used == other.name()) {
            self.uses.push(other.name().to_string());
        }
    }

    /// Whether [`Namespace::use_namespace`] was called with the named namespace
    pub fn uses(&self, name: &str) -> bool {
        self.uses.iter().any(|used| used == name)
    }

    /// Make a single exported symbol of `other` visible here
    pub fn import(&mut self, name: &str, other: &Namespace) -> bool {
        match other.exported.get(name) {
            Some(sym) => {
                self.interned.insert(name.to_string(), sym.clone());
                true
            }
            None => false,
        }
    }

    /// Replace an inherited symbol with a fresh local one
    pub fn shadow(&mut self, name: &str) -> SymbolRef {
        self.define_symbol(name, false, None, false)
    }

    pub fn exported_symbols(&self) -> impl Iterator<Item = &SymbolRef> {
        self.exported.values()
    }

    pub fn interned_symbols(&self) -> impl Iterator<Item = &SymbolRef> {
        self.interned.values()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_use_sees_only_exports() {
        let mut a = Namespace::new("A", true);
        let public = a.intern("PUBLIC").unwrap();
        a.intern("PRIVATE").unwrap();
        a.export("PUBLIC").unwrap();

        let mut b = Namespace::new("B", true);
        b.use_namespace(&a);
        assert!(b.uses("A"));
        assert_eq!(b.find_symbol("PUBLIC"), Some(public.clone()));
        assert_eq!(b.find_symbol("PRIVATE"), None);

        // Interning an unseen name in B creates B's own symbol
        let private_b = b.intern("PRIVATE").unwrap();
        assert_ne!(Some(private_b), a.find_symbol("PRIVATE"));

        // Shadowing replaces the inherited symbol
        let shadowed = b.shadow("PUBLIC");
        assert_ne!(shadowed, public);
        assert_eq!(b.intern("PUBLIC").unwrap(), shadowed);
    }

    #[test]
    fn test_import_and_export_errors() {
        let mut a = Namespace::new("A", true);
        a.intern("X").unwrap();
        let mut b = Namespace::new("B", true);
        assert!(!b.import("X", &a));
        a.export("X").unwrap();
        assert!(b.import("X", &a));
        assert!(matches!(a.export("MISSING"), Err(Error::NamespaceError(_))));
    }

    #[test]
    fn test_locked_and_keyword_namespaces() {
        let mut locked = Namespace::new("LOCKED", false);
        assert!(locked.intern("X").is_err());
        let defined = locked.define_symbol("X", true, None, true);
        assert!(defined.is_reserved());
        assert_eq!(locked.intern("X").unwrap(), defined);

        // Self-valued symbols keep the requested reservation
        let constant = locked.define_symbol("ON", true, Some(Value::True), true);
        assert!(constant.is_reserved());
        assert_eq!(constant.value(), Some(&Value::True));
        let open = locked.define_symbol("OFF", false, Some(Value::Nil), true);
        assert!(!open.is_reserved());
        assert_eq!(open.value(), Some(&Value::Nil));

        let mut keywords = Namespace::keyword_namespace("KEYWORD");
        let key = keywords.intern("KEY").unwrap();
        assert!(key.is_keyword() && key.is_reserved());
        assert_eq!(keywords.find_exported_symbol("KEY"), Some(key));
    }

    proptest! {
        #[test]
        fn prop_intern_is_idempotent(name in "[A-Z][A-Z0-9-]{0,12}") {
            let mut first = Namespace::new("FIRST", true);
            let mut second = Namespace::new("SECOND", true);
            let a = first.intern(&name).unwrap();
            prop_assert_eq!(first.intern(&name).unwrap(), a.clone());
            prop_assert_ne!(second.intern(&name).unwrap(), a);
        }
    }
}
