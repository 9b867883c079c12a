// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{fmt, rc::Rc};

use im::Vector;

use crate::{
    promise::{Iter, Promise},
    resolve::resolve,
    stdlib::Function,
};

/// Any value that can be bound in an environment: a concrete scalar, a container of values, a
/// built-in function, or a deferred computation that has not yet been resolved.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    List(Vector<Value>),
    Map(MapValue),
    Function(Function),
    Deferred(Promise),
}
impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(Rc::from(value.into()))
    }
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Self::Deferred(promise) => Some(promise),
            _ => None,
        }
    }
    pub fn as_sequence(&self) -> Option<&Rc<Iter>> {
        match self {
            Self::Deferred(Promise::Sequence(node)) => Some(node),
            _ => None,
        }
    }
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "NoneType",
            Self::Boolean(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "dict",
            Self::Function(_) => "builtin_function",
            Self::Deferred(Promise::Symbol(_)) => "Symbol",
            Self::Deferred(Promise::Expression(_)) => "Expression",
            Self::Deferred(Promise::Call(_)) => "LazyCall",
            Self::Deferred(Promise::Sequence(_)) => "Iter",
        }
    }
    /// Symbolic representation of the value that never forces any deferred part of it.
    pub fn quoted(&self) -> String {
        format!("{:?}", self)
    }
    /// Text as written by `print` and `str`: strings without quotes, anything else as displayed.
    pub fn to_text(&self) -> String {
        match self {
            Self::String(value) => String::from(&**value),
            _ => format!("{}", self),
        }
    }
}
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            (Self::List(left), Self::List(right)) => left == right,
            (Self::Map(left), Self::Map(right)) => left == right,
            (Self::Function(left), Self::Function(right)) => left == right,
            (Self::Deferred(left), Self::Deferred(right)) => left.ptr_eq(right),
            _ => false,
        }
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "None"),
            Self::Boolean(value) => write!(f, "{}", if *value { "True" } else { "False" }),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::String(value) => write!(f, "{:?}", value),
            Self::List(items) => write!(
                f,
                "[{}]",
                items
                    .iter()
                    .map(|item| format!("{}", item))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Map(map) => write!(
                f,
                "{{{}}}",
                map.iter()
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Function(function) => fmt::Display::fmt(function, f),
            // Sequences may be unbounded, so only the head is forced
            Self::Deferred(Promise::Sequence(node)) => match resolve(node.head()) {
                Ok(head) => write!(f, "Iter({}, ...)", head),
                Err(err) => write!(f, "Iter(<{}>, ...)", err),
            },
            Self::Deferred(_) => match resolve(self) {
                Ok(value) => fmt::Display::fmt(&value, f),
                Err(err) => write!(f, "<{}>", err),
            },
        }
    }
}
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::List(items) => write!(
                f,
                "[{}]",
                items
                    .iter()
                    .map(|item| format!("{:?}", item))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Map(map) => write!(
                f,
                "{{{}}}",
                map.iter()
                    .map(|(key, value)| format!("{:?}: {:?}", key, value))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Deferred(promise) => fmt::Debug::fmt(promise, f),
            _ => fmt::Display::fmt(self, f),
        }
    }
}
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Nil
    }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Rc::from(value))
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}
impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::list(items)
    }
}
impl From<MapValue> for Value {
    fn from(value: MapValue) -> Self {
        Self::Map(value)
    }
}
impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Self::Function(value)
    }
}
impl From<Promise> for Value {
    fn from(value: Promise) -> Self {
        Self::Deferred(value)
    }
}

/// Insertion-ordered mapping; inserting a key equal to an existing key replaces that entry.
#[derive(Clone, Default, PartialEq)]
pub struct MapValue {
    entries: Vector<(Value, Value)>,
}
impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_entries(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        entries
            .into_iter()
            .fold(Self::new(), |mut map, (key, value)| {
                map.insert(key, value);
                map
            })
    }
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter().position(|(existing, _)| *existing == key) {
            Some(index) => {
                self.entries.set(index, (key, value));
            }
            None => self.entries.push_back((key, value)),
        }
    }
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }
}
