//! Loosely-typed value graph understood by both binary converters.
//!
//! A [`Value`] keeps its static Rust width (`U16` stays `U16`) because the
//! codecs pick type codes from the runtime shape, not from the magnitude
//! alone. Homogeneous containers ([`Array`], [`Map`] with a fixed layout)
//! declare their element kind once and validate it on construction.

use crate::error::{ProtocolError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// String-keyed parameter map carried by requests, responses and events.
pub type Parameters = BTreeMap<String, Value>;

/// Runtime shape of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    Timestamp,
    String,
    Bytes,
    Array,
    List,
    Map { fixed_keys: bool, fixed_values: bool },
    Ext,
}

impl ValueKind {
    /// Whether a homogeneous container of this kind may hold `Null` items.
    pub fn is_nullable(self) -> bool {
        matches!(
            self,
            ValueKind::Decimal
                | ValueKind::String
                | ValueKind::Bytes
                | ValueKind::Array
                | ValueKind::List
                | ValueKind::Map { .. }
        )
    }

    /// Human-readable name, used in error messages and logs
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Char => "char",
            ValueKind::I8 => "i8",
            ValueKind::U8 => "u8",
            ValueKind::I16 => "i16",
            ValueKind::U16 => "u16",
            ValueKind::I32 => "i32",
            ValueKind::U32 => "u32",
            ValueKind::I64 => "i64",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::Decimal => "decimal",
            ValueKind::Timestamp => "timestamp",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Array => "array",
            ValueKind::List => "list",
            ValueKind::Map { .. } => "map",
            ValueKind::Ext => "ext",
        }
    }

    /// Checks that `value` may be stored in a container declared with this kind.
    fn admits(self, value: &Value) -> bool {
        let kind = value.kind();
        kind == self || (kind == ValueKind::Null && self.is_nullable())
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Decimal number kept in its textual form, e.g. `-12.50`
    Decimal(String),
    /// Date/time as signed 100ns ticks
    Timestamp(i64),
    String(String),
    Bytes(Vec<u8>),
    /// Homogeneous sequence
    Array(Array),
    /// Heterogeneous sequence
    List(Vec<Value>),
    Map(Map),
    /// MessagePack extension: application type and raw data
    Ext(i8, Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Char(_) => ValueKind::Char,
            Value::I8(_) => ValueKind::I8,
            Value::U8(_) => ValueKind::U8,
            Value::I16(_) => ValueKind::I16,
            Value::U16(_) => ValueKind::U16,
            Value::I32(_) => ValueKind::I32,
            Value::U32(_) => ValueKind::U32,
            Value::I64(_) => ValueKind::I64,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Array(_) => ValueKind::Array,
            Value::List(_) => ValueKind::List,
            Value::Map(map) => map.kind(),
            Value::Ext(..) => ValueKind::Ext,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Reads any integer variant as `i64`, failing when it does not fit.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::U8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Reads any non-negative integer variant as `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v),
            _ => self.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values the way a codec round-trip preserves them.
    ///
    /// `==` is structural: `U32(5)` differs from `U8(5)` and an [`Array`]
    /// differs from a `List`. A MessagePack round-trip narrows integers,
    /// turns arrays into lists and drops map layouts, so this relation
    /// compares integers by value, floats by value, sequences item by item
    /// regardless of homogeneity, and maps entry by entry regardless of
    /// layout. Everything else falls back to `==`.
    pub fn equivalent(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_i128(), other.as_i128()) {
            return a == b;
        }
        match (self, other) {
            (Value::F32(a), Value::F64(b)) | (Value::F64(b), Value::F32(a)) => f64::from(*a) == *b,
            (Value::Array(_) | Value::List(_), Value::Array(_) | Value::List(_)) => {
                let (a, b) = (self.sequence_items(), other.sequence_items());
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
            }
            (Value::Map(a), Value::Map(b)) => a.equivalent(b),
            _ => self == other,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::U64(v) => Some(v.into()),
            _ => self.as_i64().map(i128::from),
        }
    }

    fn sequence_items(&self) -> &[Value] {
        match self {
            Value::Array(array) => array.items(),
            Value::List(items) => items,
            _ => &[],
        }
    }

    /// Builds a `Decimal` value after checking its textual form.
    pub fn decimal(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !is_valid_decimal(&text) {
            return Err(ProtocolError::InvalidValue(format!(
                "not a decimal number: {text:?}"
            )));
        }
        Ok(Value::Decimal(text))
    }
}

/// Optional sign, at least one digit, at most one decimal point.
pub(crate) fn is_valid_decimal(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    let mut seen_digit = false;
    let mut seen_point = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    seen_digit
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    bool => Bool,
    char => Char,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    Array => Array,
    Map => Map,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Homogeneous sequence: every item shares one declared kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    kind: ValueKind,
    items: Vec<Value>,
}

impl Array {
    /// Creates an array, rejecting items whose kind differs from `kind`.
    ///
    /// `Null` items are accepted only for nullable kinds.
    pub fn new(kind: ValueKind, items: Vec<Value>) -> Result<Self> {
        if let Some(bad) = items.iter().find(|item| !kind.admits(item)) {
            return Err(ProtocolError::InvalidValue(format!(
                "{} item in array of {kind}",
                bad.kind()
            )));
        }
        Ok(Self { kind, items })
    }

    /// Collects primitive values into an array of their common kind.
    pub fn of<T: Into<Value>>(kind: ValueKind, items: impl IntoIterator<Item = T>) -> Result<Self> {
        Self::new(kind, items.into_iter().map(Into::into).collect())
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// How the keys or the values of a [`Map`] are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Every entry has this kind; the type code is written once
    Fixed(ValueKind),
    /// Each entry carries its own type code
    Dynamic,
}

impl Layout {
    pub fn is_fixed(self) -> bool {
        matches!(self, Layout::Fixed(_))
    }

    fn admits(self, value: &Value) -> bool {
        match self {
            Layout::Fixed(kind) => kind.admits(value),
            Layout::Dynamic => true,
        }
    }
}

/// Dictionary with independently laid out keys and values.
///
/// Entries keep insertion order; the wire format preserves it.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    keys: Layout,
    values: Layout,
    entries: Vec<(Value, Value)>,
}

impl Map {
    pub fn new(keys: Layout, values: Layout, entries: Vec<(Value, Value)>) -> Result<Self> {
        for (key, value) in &entries {
            if !keys.admits(key) {
                return Err(ProtocolError::InvalidValue(format!(
                    "{} key in map with {keys:?} keys",
                    key.kind()
                )));
            }
            if !values.admits(value) {
                return Err(ProtocolError::InvalidValue(format!(
                    "{} value in map with {values:?} values",
                    value.kind()
                )));
            }
        }
        Ok(Self {
            keys,
            values,
            entries,
        })
    }

    /// A map where both keys and values describe themselves.
    pub fn dynamic(entries: Vec<(Value, Value)>) -> Self {
        Self {
            keys: Layout::Dynamic,
            values: Layout::Dynamic,
            entries,
        }
    }

    /// Parameter maps always use fixed string keys and dynamic values.
    pub fn from_parameters(params: &Parameters) -> Self {
        Self {
            keys: Layout::Fixed(ValueKind::String),
            values: Layout::Dynamic,
            entries: params
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                .collect(),
        }
    }

    /// Converts back into parameters; every key must be a string.
    pub fn into_parameters(self) -> Result<Parameters> {
        self.entries
            .into_iter()
            .map(|(key, value)| match key {
                Value::String(k) => Ok((k, value)),
                other => Err(ProtocolError::InvalidValue(format!(
                    "parameter key must be a string, got {}",
                    other.kind()
                ))),
            })
            .collect()
    }

    pub fn kind(&self) -> ValueKind {
        ValueKind::Map {
            fixed_keys: self.keys.is_fixed(),
            fixed_values: self.values.is_fixed(),
        }
    }

    pub fn keys(&self) -> Layout {
        self.keys
    }

    pub fn values(&self) -> Layout {
        self.values
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }

    /// Entry-wise [`Value::equivalent`], ignoring both layouts.
    pub fn equivalent(&self, other: &Map) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((k1, v1), (k2, v2))| k1.equivalent(k2) && v1.equivalent(v2))
    }

    /// Looks up the first entry whose key is the given string.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
