//! This module defines the core object model of the interpreter. The main enum,
//! [`Value`], covers every runtime object: the `NIL` and `T` singletons, symbols,
//! cons cells, numbers, strings, characters, collections, functions and
//! namespaces. The same type is used for data and for unevaluated code.
//!
//! Symbols compare by identity: two symbols with the same name interned in
//! different namespaces are different binding targets. Cons cells are shared and
//! mutable in place, so a mutation through one alias is visible through all of
//! them. Helpers such as [`ListBuilder`], [`Value::iter`] and [`Value::list_info`]
//! cover the list plumbing used by the evaluator and the builtins.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

use crate::Error;
use crate::collections::{Array, Dictionary, HashTable};
use crate::evaluator::function::Function;
use crate::namespace::NamespaceRef;

/// Type alias for integer values in interpreter
pub(crate) type NumberType = i64;

/// Numbers: a small tower of 64-bit integers and floats
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(NumberType),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(n) => n == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    /// Identity-level equality: same representation and same value
    pub fn eql(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }

    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// A named token. Identity, not the name, is the binding key.
#[derive(Debug)]
pub struct Symbol {
    name: String,
    reserved: bool,
    interned: bool,
    keyword: bool,
    /// Self-referencing value: the reader yields this value in place of the symbol
    value: Option<Value>,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reserved symbols can't be bound, assigned or used as parameters
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    pub fn is_interned(&self) -> bool {
        self.interned
    }

    pub fn is_keyword(&self) -> bool {
        self.keyword
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// Shared handle to a [`Symbol`], hashed and compared by address
#[derive(Clone)]
pub struct SymbolRef(Rc<Symbol>);

impl SymbolRef {
    pub fn new(name: impl Into<String>, reserved: bool, interned: bool) -> Self {
        SymbolRef(Rc::new(Symbol {
            name: name.into(),
            reserved,
            interned,
            keyword: false,
            value: None,
        }))
    }

    pub(crate) fn with_value(name: impl Into<String>, reserved: bool, value: Value) -> Self {
        SymbolRef(Rc::new(Symbol {
            name: name.into(),
            reserved,
            interned: true,
            keyword: false,
            value: Some(value),
        }))
    }

    pub(crate) fn keyword(name: impl Into<String>) -> Self {
        SymbolRef(Rc::new(Symbol {
            name: name.into(),
            reserved: true,
            interned: true,
            keyword: true,
            value: None,
        }))
    }

    /// A symbol created outside of any namespace (gensym)
    pub fn uninterned(name: impl Into<String>) -> Self {
        Self::new(name, false, false)
    }
}

impl Deref for SymbolRef {
    type Target = Symbol;

    fn deref(&self) -> &Symbol {
        &self.0
    }
}

impl PartialEq for SymbolRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SymbolRef {}

impl Hash for SymbolRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({self})")
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keyword {
            write!(f, ":{}", self.name)
        } else if self.interned {
            write!(f, "{}", self.name)
        } else {
            write!(f, "#:{}", self.name)
        }
    }
}

/// The universal pair. Both halves are mutable in place.
#[derive(Debug)]
pub struct Cons {
    car: RefCell<Value>,
    cdr: RefCell<Value>,
}

impl Cons {
    pub fn new(car: Value, cdr: Value) -> Rc<Cons> {
        Rc::new(Cons {
            car: RefCell::new(car),
            cdr: RefCell::new(cdr),
        })
    }

    pub fn car(&self) -> Value {
        self.car.borrow().clone()
    }

    pub fn cdr(&self) -> Value {
        self.cdr.borrow().clone()
    }

    pub fn set_car(&self, value: Value) {
        *self.car.borrow_mut() = value;
    }

    pub fn set_cdr(&self, value: Value) {
        *self.cdr.borrow_mut() = value;
    }

    /// Move both halves that hold cells onto `pending`, leaving `NIL` behind
    fn detach_cells(&mut self, pending: &mut Vec<Rc<Cons>>) {
        for half in [self.car.get_mut(), self.cdr.get_mut()] {
            match std::mem::replace(half, Value::Nil) {
                Value::Cons(cell) => pending.push(cell),
                other => *half = other,
            }
        }
    }
}

/// Long lists are freed iteratively so dropping them can't exhaust the stack
impl Drop for Cons {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_cells(&mut pending);
        while let Some(cell) = pending.pop() {
            // Cells still shared elsewhere stay alive; their owners free them later
            if let Some(mut cell) = Rc::into_inner(cell) {
                cell.detach_cells(&mut pending);
            }
        }
    }
}

/// Core object type in interpreter
///
/// To build values in code and tests, use the helper functions:
/// - `val(42)` for atoms, `nil()` for the empty list
/// - `val(vec![val(1), val("two")])` for lists
#[derive(Clone)]
pub enum Value {
    /// The empty list and the false value
    Nil,
    /// The canonical true value
    True,
    Symbol(SymbolRef),
    Cons(Rc<Cons>),
    Number(Number),
    String(Rc<str>),
    Character(char),
    Array(Rc<RefCell<Array>>),
    Dictionary(Rc<RefCell<Dictionary>>),
    HashTable(Rc<RefCell<HashTable>>),
    Function(Rc<Function>),
    Namespace(NamespaceRef),
}

impl Value {
    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Cons(Cons::new(car, cdr))
    }

    /// Build a fresh proper list from the given elements
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        let mut builder = ListBuilder::new();
        for item in items {
            builder.push(item);
        }
        builder.finish()
    }

    pub fn from_bool(b: bool) -> Value {
        if b { Value::True } else { Value::Nil }
    }

    pub fn int(n: NumberType) -> Value {
        Value::Number(Number::Int(n))
    }

    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except `NIL` counts as true
    pub fn is_true(&self) -> bool {
        !self.is_nil()
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::Nil | Value::Cons(_))
    }

    pub fn as_symbol(&self) -> Option<&SymbolRef> {
        match self {
            Value::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn as_cons(&self) -> Option<&Rc<Cons>> {
        match self {
            Value::Cons(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(fun) => Some(fun),
            _ => None,
        }
    }

    pub fn car(&self) -> Option<Value> {
        self.as_cons().map(|cell| cell.car())
    }

    pub fn cdr(&self) -> Option<Value> {
        self.as_cons().map(|cell| cell.cdr())
    }

    /// Iterate over the elements of a list. Iteration stops at the first
    /// non-cons tail, so a dotted tail is never yielded.
    pub fn iter(&self) -> ListIter {
        ListIter {
            current: self.clone(),
        }
    }

    /// Return `(proper, length)`: whether the list ends in `NIL` and how many
    /// cells it has. Atoms other than `NIL` are improper lists of length 0.
    pub fn list_info(&self) -> (bool, usize) {
        let mut length = 0;
        let mut current = self.clone();
        loop {
            match current {
                Value::Nil => return (true, length),
                Value::Cons(cell) => {
                    length += 1;
                    current = cell.cdr();
                }
                _ => return (false, length),
            }
        }
    }

    pub fn nth(&self, index: usize) -> Option<Value> {
        self.iter().nth(index)
    }

    /// Cons cell holding the element at `index`, used for in-place assignment
    pub(crate) fn nth_cell(&self, index: usize) -> Option<Rc<Cons>> {
        let mut current = self.clone();
        for _ in 0..index {
            current = current.cdr()?;
        }
        current.as_cons().cloned()
    }

    /// Collect the elements of a proper list, rejecting dotted lists
    pub fn to_vec(&self) -> Result<Vec<Value>, Error> {
        let (proper, _) = self.list_info();
        if !proper {
            return Err(Error::TypeError(format!("expected a proper list, got {self}")));
        }
        Ok(self.iter().collect())
    }

    /// Name used by `TYPE-OF` and in type errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "NULL",
            Value::True => "BOOLEAN",
            Value::Symbol(_) => "SYMBOL",
            Value::Cons(_) => "CONS",
            Value::Number(_) => "NUMBER",
            Value::String(_) => "STRING",
            Value::Character(_) => "CHARACTER",
            Value::Array(_) => "ARRAY",
            Value::Dictionary(_) => "DICTIONARY",
            Value::HashTable(_) => "HASHTABLE",
            Value::Function(_) => "FUNCTION",
            Value::Namespace(_) => "NAMESPACE",
        }
    }

    /// Identity equality: same object, or same immediate value
    pub fn eql(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) | (Value::True, Value::True) => true,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Cons(a), Value::Cons(b)) => Rc::ptr_eq(a, b),
            (Value::Number(a), Value::Number(b)) => a.eql(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Dictionary(a), Value::Dictionary(b)) => Rc::ptr_eq(a, b),
            (Value::HashTable(a), Value::HashTable(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Namespace(a), Value::Namespace(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Structural equality: lists, arrays and dictionaries compare element-wise,
    /// numbers compare numerically
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Cons(_), Value::Cons(_)) => {
                let mut a = self.clone();
                let mut b = other.clone();
                loop {
                    match (&a, &b) {
                        (Value::Cons(x), Value::Cons(y)) => {
                            if Rc::ptr_eq(x, y) {
                                return true;
                            }
                            if !x.car().equal(&y.car()) {
                                return false;
                            }
                            let (next_a, next_b) = (x.cdr(), y.cdr());
                            a = next_a;
                            b = next_b;
                        }
                        _ => return a.equal(&b),
                    }
                }
            }
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || a.borrow().equal(&b.borrow())
            }
            (Value::Dictionary(a), Value::Dictionary(b)) => {
                Rc::ptr_eq(a, b) || a.borrow().equal(&b.borrow())
            }
            _ => self.eql(other),
        }
    }

    /// Ordering for numbers, strings and characters
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.compare(*b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Character(a), Value::Character(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Iterator over the elements of a cons list
pub struct ListIter {
    current: Value,
}

impl Iterator for ListIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (car, cdr) = match &self.current {
            Value::Cons(cell) => (cell.car(), cell.cdr()),
            _ => return None,
        };
        self.current = cdr;
        Some(car)
    }
}

/// Appends to the tail of a fresh list without re-walking it
#[derive(Default)]
pub struct ListBuilder {
    head: Option<Rc<Cons>>,
    tail: Option<Rc<Cons>>,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        let cell = Cons::new(value, Value::Nil);
        match &self.tail {
            Some(tail) => tail.set_cdr(Value::Cons(Rc::clone(&cell))),
            None => self.head = Some(Rc::clone(&cell)),
        }
        self.tail = Some(cell);
    }

    /// Push copies of every element of `list`; the source cells are not shared
    pub fn append(&mut self, list: &Value) {
        for item in list.iter() {
            self.push(item);
        }
    }

    pub fn finish(self) -> Value {
        self.finish_with_tail(Value::Nil)
    }

    /// Terminate the list with `tail`, producing a dotted list for non-NIL atoms
    pub fn finish_with_tail(self, tail: Value) -> Value {
        match (self.head, self.tail) {
            (Some(head), Some(last)) => {
                last.set_cdr(tail);
                Value::Cons(head)
            }
            _ => tail,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::True => write!(f, "True"),
            Value::Symbol(sym) => write!(f, "{sym:?}"),
            Value::Cons(_) => write!(f, "List({self})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Character(c) => write!(f, "Character({c:?})"),
            Value::Array(_) => write!(f, "Array({self})"),
            Value::Dictionary(_) => write!(f, "Dictionary({self})"),
            Value::HashTable(_) => write!(f, "HashTable({self})"),
            Value::Function(fun) => write!(f, "Function({fun})"),
            Value::Namespace(_) => write!(f, "Namespace({self})"),
        }
    }
}

fn character_name(c: char) -> Option<&'static str> {
    match c {
        ' ' => Some("Space"),
        '\n' => Some("Newline"),
        '\t' => Some("Tab"),
        '\r' => Some("Return"),
        '\u{8}' => Some("Backspace"),
        '\u{c}' => Some("Page"),
        _ => None,
    }
}

impl Value {
    fn write_list(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut current = self.clone();
        let mut first = true;
        loop {
            match current {
                Value::Cons(cell) => {
                    if !first {
                        write!(f, " ")?;
                    }
                    first = false;
                    write!(f, "{}", cell.car())?;
                    current = cell.cdr();
                }
                Value::Nil => break,
                tail => {
                    write!(f, " . {tail}")?;
                    break;
                }
            }
        }
        write!(f, ")")
    }
}

/// Deepest container nesting the printer descends into
const MAX_PRINT_DEPTH: usize = 256;

thread_local! {
    static PRINT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Print a nested container, eliding it past [`MAX_PRINT_DEPTH`] so that
/// self-containing structures still print
fn write_nested(
    f: &mut fmt::Formatter<'_>,
    write: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    let depth = PRINT_DEPTH.get();
    if depth >= MAX_PRINT_DEPTH {
        return write!(f, "...");
    }
    PRINT_DEPTH.set(depth + 1);
    let result = write(f);
    PRINT_DEPTH.set(depth);
    result
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "NIL"),
            Value::True => write!(f, "T"),
            Value::Symbol(sym) => write!(f, "{sym}"),
            Value::Cons(_) => write_nested(f, |f| self.write_list(f)),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Character(c) => match character_name(*c) {
                Some(name) => write!(f, "#\\{name}"),
                None => write!(f, "#\\{c}"),
            },
            Value::Array(array) => write_nested(f, |f| write!(f, "{}", array.borrow())),
            Value::Dictionary(dict) => write_nested(f, |f| write!(f, "{}", dict.borrow())),
            Value::HashTable(table) => write_nested(f, |f| write!(f, "{}", table.borrow())),
            Value::Function(fun) => write!(f, "{fun}"),
            Value::Namespace(ns) => write!(f, "#<The {} namespace>", ns.borrow().name()),
        }
    }
}

/// Structural equality, so that test assertions read naturally
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Character(c)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

impl From<SymbolRef> for Value {
    fn from(sym: SymbolRef) -> Self {
        Value::Symbol(sym)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(Number::Int(n as NumberType))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType); // Special case - no casting
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);
impl_from_integer!(usize);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into))
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::list(arr.into_iter().map(Into::into))
    }
}

/// Helper function for creating Values - works great in mixed lists!
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating empty lists (nil)
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Value {
    Value::Nil
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_list_helpers() {
        let list = val([1, 2, 3]);
        assert_eq!(list.list_info(), (true, 3));
        assert_eq!(list.nth(1), Some(val(2)));
        assert_eq!(list.nth(3), None);
        assert_eq!(list.to_vec().unwrap(), vec![val(1), val(2), val(3)]);

        let dotted = Value::cons(val(1), val(2));
        assert_eq!(dotted.list_info(), (false, 1));
        assert!(dotted.to_vec().is_err());
        assert_eq!(format!("{dotted}"), "(1 . 2)");

        assert_eq!(nil().list_info(), (true, 0));
        assert_eq!(val(5).list_info(), (false, 0));
    }

    #[test]
    fn test_list_builder_copies_appended_cells() {
        let source = val([1, 2]);
        let mut builder = ListBuilder::new();
        builder.push(val(0));
        builder.append(&source);
        let built = builder.finish();
        assert_eq!(built, val([0, 1, 2]));

        // Mutating the built list leaves the source untouched
        built.nth_cell(1).unwrap().set_car(val(99));
        assert_eq!(source, val([1, 2]));

        let dotted = ListBuilder::new().finish_with_tail(val(7));
        assert_eq!(dotted, val(7));
    }

    #[test]
    fn test_dropping_long_lists() {
        let mut list = nil();
        for i in 0..1_000_000 {
            list = Value::cons(val(i), list);
        }
        assert_eq!(list.list_info(), (true, 1_000_000));
        drop(list);

        // Nested through the car as well as the cdr
        let mut nested = nil();
        for _ in 0..1_000_000 {
            nested = Value::cons(nested, nil());
        }
        drop(nested);

        // Cells still referenced elsewhere survive the drop of the head
        let tail = val([2, 3]);
        let head = Value::cons(val(1), tail.clone());
        drop(head);
        assert_eq!(tail, val([2, 3]));
    }

    #[test]
    fn test_printing_self_containing_values() {
        let list = val([1, 2]);
        let Value::Cons(cell) = &list else {
            unreachable!()
        };
        cell.set_car(list.clone());
        let printed = format!("{list}");
        assert!(printed.starts_with("(((("));
        assert!(printed.contains("..."));
        assert!(printed.ends_with(" 2) 2)"));
        // Break the cycle so the cells are freed
        cell.set_car(nil());
        assert_eq!(format!("{list}"), "(NIL 2)");
    }

    #[test]
    fn test_cons_mutation_is_shared_by_aliases() {
        let list = val([1, 2, 3]);
        let alias = list.clone();
        list.as_cons().unwrap().set_car(val("changed"));
        assert_eq!(alias.car(), Some(val("changed")));
        assert!(list.eql(&alias));
    }

    #[test]
    fn test_equality_flavours() {
        let a = val([1, 2, 3]);
        let b = val([1, 2, 3]);
        assert!(a.equal(&b));
        assert!(!a.eql(&b));

        assert!(val(1).eql(&val(1)));
        assert!(!val(1).eql(&val(1.0)));
        assert!(val(1).equal(&val(1.0)));
        assert!(val("x").eql(&val("x")));

        let s1 = SymbolRef::new("X", false, true);
        let s2 = SymbolRef::new("X", false, true);
        assert!(!Value::Symbol(s1.clone()).eql(&Value::Symbol(s2)));
        assert!(Value::Symbol(s1.clone()).eql(&Value::Symbol(s1)));

        assert_eq!(val(1).compare(&val(2.5)), Some(Ordering::Less));
        assert_eq!(val("b").compare(&val("a")), Some(Ordering::Greater));
        assert_eq!(val(1).compare(&val("a")), None);
    }

    #[test]
    fn test_display() {
        let cases = vec![
            (nil(), "NIL"),
            (Value::True, "T"),
            (val(42), "42"),
            (val(2.0), "2.0"),
            (val(2.5), "2.5"),
            (val("a\"b"), "\"a\\\"b\""),
            (val('x'), "#\\x"),
            (val(' '), "#\\Space"),
            (val(vec![val(1), val(vec![val(2), val(3)]), nil()]), "(1 (2 3) NIL)"),
            (Value::Symbol(SymbolRef::uninterned("G1")), "#:G1"),
            (Value::Symbol(SymbolRef::keyword("KEY")), ":KEY"),
        ];
        for (value, expected) in cases {
            assert_eq!(format!("{value}"), expected);
        }
    }

    proptest! {
        #[test]
        fn prop_list_roundtrip(items in proptest::collection::vec(any::<i64>(), 0..32)) {
            let list = Value::list(items.iter().copied().map(Value::int));
            prop_assert_eq!(list.list_info(), (true, items.len()));
            let back: Vec<i64> = list
                .iter()
                .map(|v| match v {
                    Value::Number(Number::Int(n)) => n,
                    _ => unreachable!(),
                })
                .collect();
            prop_assert_eq!(back, items);
        }
    }
}
