//! Collection types and the generic access contract.
//!
//! Arrays, dictionaries and hash tables all implement [`Collection`], which is
//! what `ELT`, `LENGTH` and `MAP` dispatch through. Lists and strings take part
//! through the free functions [`access`], [`assign`], [`length`] and [`entries`]
//! so that callers can treat every sequence-like value uniformly.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::ast::{Number, SymbolRef, Value};

/// Generic read/write contract shared by all collection types
pub trait Collection {
    /// Read the element stored under `key`
    fn access(&self, key: &Value) -> Result<Value, Error>;
    /// Store `value` under `key`
    fn assign(&mut self, key: &Value, value: Value) -> Result<(), Error>;
    fn length(&self) -> usize;
    /// `(element, key)` pairs in iteration order
    fn entries(&self) -> Vec<(Value, Value)>;
}

fn index_of(key: &Value, length: usize) -> Result<usize, Error> {
    match key {
        Value::Number(Number::Int(n)) => usize::try_from(*n)
            .ok()
            .filter(|index| *index < length)
            .ok_or_else(|| Error::EvalError(format!("index {n} out of bounds"))),
        other => Err(Error::TypeError(format!(
            "index must be an integer, got {other}"
        ))),
    }
}

/// Fixed-size vector of values
#[derive(Debug, Clone, Default)]
pub struct Array {
    items: Vec<Value>,
}

impl Array {
    pub fn new(items: Vec<Value>) -> Self {
        Array { items }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub(crate) fn equal(&self, other: &Array) -> bool {
        self.items.len() == other.items.len()
            && self.items.iter().zip(&other.items).all(|(a, b)| a.equal(b))
    }
}

impl Collection for Array {
    fn access(&self, key: &Value) -> Result<Value, Error> {
        let index = index_of(key, self.items.len())?;
        Ok(self.items[index].clone())
    }

    fn assign(&mut self, key: &Value, value: Value) -> Result<(), Error> {
        let index = index_of(key, self.items.len())?;
        self.items[index] = value;
        Ok(())
    }

    fn length(&self) -> usize {
        self.items.len()
    }

    fn entries(&self) -> Vec<(Value, Value)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.clone(), Value::from(index)))
            .collect()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "]")
    }
}

/// Association table keyed by structural equality; any value may be a key
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Vec<(Value, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.equal(key))
    }

    pub(crate) fn equal(&self, other: &Dictionary) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(key, value)| {
                other
                    .position(key)
                    .is_some_and(|index| other.entries[index].1.equal(value))
            })
    }
}

impl Collection for Dictionary {
    /// Missing keys read as `NIL`
    fn access(&self, key: &Value) -> Result<Value, Error> {
        Ok(self
            .position(key)
            .map_or(Value::Nil, |index| self.entries[index].1.clone()))
    }

    fn assign(&mut self, key: &Value, value: Value) -> Result<(), Error> {
        match self.position(key) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((key.clone(), value)),
        }
        Ok(())
    }

    fn length(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<(Value, Value)> {
        self.entries
            .iter()
            .map(|(key, value)| (value.clone(), key.clone()))
            .collect()
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(dictionary")?;
        for (key, value) in &self.entries {
            write!(f, " ({key} {value})")?;
        }
        write!(f, ")")
    }
}

/// Hashable projection of a key value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HashKey {
    Nil,
    True,
    Symbol(SymbolRef),
    Int(i64),
    Float(u64),
    String(Rc<str>),
    Character(char),
}

impl TryFrom<&Value> for HashKey {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Nil => Ok(HashKey::Nil),
            Value::True => Ok(HashKey::True),
            Value::Symbol(sym) => Ok(HashKey::Symbol(sym.clone())),
            Value::Number(Number::Int(n)) => Ok(HashKey::Int(*n)),
            Value::Number(Number::Float(x)) => Ok(HashKey::Float(x.to_bits())),
            Value::String(s) => Ok(HashKey::String(Rc::clone(s))),
            Value::Character(c) => Ok(HashKey::Character(*c)),
            other => Err(Error::TypeError(format!(
                "hashtable key must be comparable, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Hash table keyed by atoms (symbols, numbers, strings, characters)
#[derive(Debug, Clone, Default)]
pub struct HashTable {
    table: HashMap<HashKey, (Value, Value)>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collection for HashTable {
    /// Missing keys read as `NIL`
    fn access(&self, key: &Value) -> Result<Value, Error> {
        let hash_key = HashKey::try_from(key)?;
        Ok(self
            .table
            .get(&hash_key)
            .map_or(Value::Nil, |(_, value)| value.clone()))
    }

    fn assign(&mut self, key: &Value, value: Value) -> Result<(), Error> {
        let hash_key = HashKey::try_from(key)?;
        self.table.insert(hash_key, (key.clone(), value));
        Ok(())
    }

    fn length(&self) -> usize {
        self.table.len()
    }

    fn entries(&self) -> Vec<(Value, Value)> {
        self.table
            .values()
            .map(|(key, value)| (value.clone(), key.clone()))
            .collect()
    }
}

impl fmt::Display for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(hashtable")?;
        for (key, value) in self.table.values() {
            write!(f, " ({key} {value})")?;
        }
        write!(f, ")")
    }
}

fn not_a_collection(value: &Value) -> Error {
    Error::TypeError(format!("expected a collection, got {}", value.type_name()))
}

/// Read `target[key]` for any collection, list or string
pub fn access(target: &Value, key: &Value) -> Result<Value, Error> {
    match target {
        Value::Array(array) => array.borrow().access(key),
        Value::Dictionary(dict) => dict.borrow().access(key),
        Value::HashTable(table) => table.borrow().access(key),
        Value::Nil | Value::Cons(_) => {
            let (_, len) = target.list_info();
            let index = index_of(key, len)?;
            target
                .nth(index)
                .ok_or_else(|| Error::EvalError(format!("index {index} out of bounds")))
        }
        Value::String(s) => {
            let index = index_of(key, s.chars().count())?;
            s.chars()
                .nth(index)
                .map(Value::Character)
                .ok_or_else(|| Error::EvalError(format!("index {index} out of bounds")))
        }
        other => Err(not_a_collection(other)),
    }
}

/// Store `value` at `target[key]`. List cells are mutated in place.
pub fn assign(target: &Value, key: &Value, value: Value) -> Result<(), Error> {
    match target {
        Value::Array(array) => array.borrow_mut().assign(key, value),
        Value::Dictionary(dict) => dict.borrow_mut().assign(key, value),
        Value::HashTable(table) => table.borrow_mut().assign(key, value),
        Value::Nil | Value::Cons(_) => {
            let (_, len) = target.list_info();
            let index = index_of(key, len)?;
            let cell = target
                .nth_cell(index)
                .ok_or_else(|| Error::EvalError(format!("index {index} out of bounds")))?;
            cell.set_car(value);
            Ok(())
        }
        Value::String(_) => Err(Error::TypeError("strings are immutable".into())),
        other => Err(not_a_collection(other)),
    }
}

pub fn length(target: &Value) -> Result<usize, Error> {
    match target {
        Value::Array(array) => Ok(array.borrow().length()),
        Value::Dictionary(dict) => Ok(dict.borrow().length()),
        Value::HashTable(table) => Ok(table.borrow().length()),
        Value::Nil | Value::Cons(_) => Ok(target.list_info().1),
        Value::String(s) => Ok(s.chars().count()),
        other => Err(not_a_collection(other)),
    }
}

/// `(element, key)` pairs of any collection, list or string
pub fn entries(target: &Value) -> Result<Vec<(Value, Value)>, Error> {
    match target {
        Value::Array(array) => Ok(array.borrow().entries()),
        Value::Dictionary(dict) => Ok(dict.borrow().entries()),
        Value::HashTable(table) => Ok(table.borrow().entries()),
        Value::Nil | Value::Cons(_) => Ok(target
            .iter()
            .enumerate()
            .map(|(index, item)| (item, Value::from(index)))
            .collect()),
        Value::String(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(index, c)| (Value::Character(c), Value::from(index)))
            .collect()),
        other => Err(not_a_collection(other)),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, val};
    use std::cell::RefCell;

    fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(Array::new(items))))
    }

    #[test]
    fn test_array_access_and_assign() {
        let arr = array(vec![val(1), val(2), val(3)]);
        assert_eq!(access(&arr, &val(0)).unwrap(), val(1));
        assign(&arr, &val(2), val("x")).unwrap();
        assert_eq!(access(&arr, &val(2)).unwrap(), val("x"));
        assert_eq!(length(&arr).unwrap(), 3);

        assert!(matches!(access(&arr, &val(3)), Err(Error::EvalError(_))));
        assert!(matches!(access(&arr, &val(-1)), Err(Error::EvalError(_))));
        assert!(matches!(access(&arr, &val("a")), Err(Error::TypeError(_))));
        assert_eq!(format!("{arr}"), "[1 2 \"x\"]");
    }

    #[test]
    fn test_dictionary_uses_structural_keys() {
        let dict = Value::Dictionary(Rc::new(RefCell::new(Dictionary::new())));
        assign(&dict, &val([1, 2]), val("pair")).unwrap();
        assert_eq!(access(&dict, &val([1, 2])).unwrap(), val("pair"));
        assert_eq!(access(&dict, &val("missing")).unwrap(), nil());

        assign(&dict, &val([1, 2]), val("again")).unwrap();
        assert_eq!(length(&dict).unwrap(), 1);
    }

    #[test]
    fn test_hashtable_rejects_compound_keys() {
        let table = Value::HashTable(Rc::new(RefCell::new(HashTable::new())));
        assign(&table, &val("k"), val(1)).unwrap();
        assign(&table, &val(7), val(2)).unwrap();
        assert_eq!(access(&table, &val("k")).unwrap(), val(1));
        assert_eq!(access(&table, &val(7)).unwrap(), val(2));
        assert_eq!(access(&table, &val(7.0)).unwrap(), nil());
        assert!(matches!(
            assign(&table, &val([1]), val(3)),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_list_and_string_access() {
        let list = val([10, 20, 30]);
        let alias = list.clone();
        assign(&list, &val(1), val(99)).unwrap();
        assert_eq!(access(&alias, &val(1)).unwrap(), val(99));
        assert!(access(&nil(), &val(0)).is_err());

        let s = val("héllo");
        assert_eq!(access(&s, &val(1)).unwrap(), val('é'));
        assert_eq!(length(&s).unwrap(), 5);
        assert!(assign(&s, &val(0), val('x')).is_err());

        let pairs = entries(&list).unwrap();
        assert_eq!(pairs[2], (val(30), val(2)));
        assert!(length(&val(5)).is_err());
    }
}
