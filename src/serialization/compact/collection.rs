//! Sequence and dictionary formatters.
//!
//! Every collection body is built from *sections*: a run of items laid out
//! either with one shared type code (`Layout::Fixed`) or with a type code per
//! item (`Layout::Dynamic`). A section carries no count of its own. Arrays and
//! lists write one count followed by one section; dictionaries write one count
//! followed by a key section and a value section.

use super::codes;
use super::formatter::{by_code, by_kind, mismatch, Formatter};
use super::varint::{length_size, read_length, write_length};
use super::{read_value, unsupported, value_len, write_value};
use crate::error::{ProtocolError, Result};
use crate::serialization::reader::ByteReader;
use crate::serialization::value::{Array, Layout, Map, Value, ValueKind};
use bytes::{BufMut, BytesMut};

fn fixed_formatter(kind: ValueKind) -> Result<&'static dyn Formatter> {
    by_kind(kind).ok_or_else(|| unsupported(kind))
}

fn section_len<'v>(layout: Layout, mut items: impl Iterator<Item = &'v Value>) -> Result<usize> {
    match layout {
        Layout::Fixed(kind) => {
            let formatter = fixed_formatter(kind)?;
            items.try_fold(1, |total, item| -> Result<usize> {
                Ok(total + formatter.payload_len(item)?)
            })
        }
        Layout::Dynamic => {
            items.try_fold(0, |total, item| -> Result<usize> { Ok(total + value_len(item)?) })
        }
    }
}

fn write_section<'v>(
    layout: Layout,
    mut items: impl Iterator<Item = &'v Value>,
    dst: &mut BytesMut,
) -> Result<()> {
    match layout {
        Layout::Fixed(kind) => {
            let formatter = fixed_formatter(kind)?;
            dst.put_u8(formatter.type_code());
            items.try_for_each(|item| formatter.write_payload(item, dst))
        }
        Layout::Dynamic => items.try_for_each(|item| write_value(item, dst)),
    }
}

fn read_fixed_section(src: &mut ByteReader<'_>, count: usize) -> Result<(ValueKind, Vec<Value>)> {
    let code = src.read_u8()?;
    let formatter = by_code(code).ok_or(ProtocolError::UnknownTypeCode {
        codec: super::CODEC_NAME,
        code,
    })?;
    let mut items = Vec::with_capacity(src.capacity_hint(count));
    for _ in 0..count {
        items.push(formatter.read_payload(src)?);
    }
    Ok((formatter.kind(), items))
}

fn read_dynamic_section(src: &mut ByteReader<'_>, count: usize) -> Result<Vec<Value>> {
    let mut items = Vec::with_capacity(src.capacity_hint(count));
    for _ in 0..count {
        items.push(read_value(src)?);
    }
    Ok(items)
}

fn read_section(
    src: &mut ByteReader<'_>,
    fixed: bool,
    count: usize,
) -> Result<(Layout, Vec<Value>)> {
    if fixed {
        let (kind, items) = read_fixed_section(src, count)?;
        Ok((Layout::Fixed(kind), items))
    } else {
        Ok((Layout::Dynamic, read_dynamic_section(src, count)?))
    }
}

/// Reads a nullable count, then runs `body` one nesting level deeper.
fn read_nested(
    src: &mut ByteReader<'_>,
    body: impl FnOnce(&mut ByteReader<'_>, usize) -> Result<Value>,
) -> Result<Value> {
    let Some(count) = read_length(src)? else {
        return Ok(Value::Null);
    };
    src.enter()?;
    let value = body(src, count);
    src.leave();
    value
}

fn invalid_as_malformed(err: ProtocolError) -> ProtocolError {
    match err {
        ProtocolError::InvalidValue(msg) => ProtocolError::Malformed(msg),
        other => other,
    }
}

/// Homogeneous sequence: count, shared element code, raw payloads.
pub(crate) struct ArrayFormatter;

impl Formatter for ArrayFormatter {
    fn type_code(&self) -> u8 {
        codes::ARRAY
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Array
    }

    fn payload_len(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Null => length_size(None),
            Value::Array(array) => Ok(length_size(Some(array.len()))?
                + section_len(Layout::Fixed(array.kind()), array.items().iter())?),
            other => Err(mismatch(ValueKind::Array, other)),
        }
    }

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        match value {
            Value::Null => write_length(dst, None),
            Value::Array(array) => {
                write_length(dst, Some(array.len()))?;
                write_section(Layout::Fixed(array.kind()), array.items().iter(), dst)
            }
            other => Err(mismatch(ValueKind::Array, other)),
        }
    }

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        read_nested(src, |src, count| {
            let (kind, items) = read_fixed_section(src, count)?;
            Array::new(kind, items)
                .map(Value::Array)
                .map_err(invalid_as_malformed)
        })
    }
}

/// Heterogeneous sequence: count, then type code + payload per item.
pub(crate) struct ListFormatter;

impl Formatter for ListFormatter {
    fn type_code(&self) -> u8 {
        codes::LIST
    }

    fn kind(&self) -> ValueKind {
        ValueKind::List
    }

    fn payload_len(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Null => length_size(None),
            Value::List(items) => {
                Ok(length_size(Some(items.len()))? + section_len(Layout::Dynamic, items.iter())?)
            }
            other => Err(mismatch(ValueKind::List, other)),
        }
    }

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        match value {
            Value::Null => write_length(dst, None),
            Value::List(items) => {
                write_length(dst, Some(items.len()))?;
                write_section(Layout::Dynamic, items.iter(), dst)
            }
            other => Err(mismatch(ValueKind::List, other)),
        }
    }

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        read_nested(src, |src, count| {
            read_dynamic_section(src, count).map(Value::List)
        })
    }
}

/// One dictionary encoder for all four key/value layout combinations.
pub(crate) struct MapFormatter {
    code: u8,
    fixed_keys: bool,
    fixed_values: bool,
}

impl MapFormatter {
    pub(crate) const fn new(code: u8, fixed_keys: bool, fixed_values: bool) -> Self {
        Self {
            code,
            fixed_keys,
            fixed_values,
        }
    }

    fn map<'v>(&self, value: &'v Value) -> Result<Option<&'v Map>> {
        match value {
            Value::Null => Ok(None),
            Value::Map(map) if map.kind() == self.kind() => Ok(Some(map)),
            other => Err(mismatch(self.kind(), other)),
        }
    }
}

impl Formatter for MapFormatter {
    fn type_code(&self) -> u8 {
        self.code
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Map {
            fixed_keys: self.fixed_keys,
            fixed_values: self.fixed_values,
        }
    }

    fn payload_len(&self, value: &Value) -> Result<usize> {
        let Some(map) = self.map(value)? else {
            return length_size(None);
        };
        let entries = map.entries();
        Ok(length_size(Some(entries.len()))?
            + section_len(map.keys(), entries.iter().map(|(k, _)| k))?
            + section_len(map.values(), entries.iter().map(|(_, v)| v))?)
    }

    fn write_payload(&self, value: &Value, dst: &mut BytesMut) -> Result<()> {
        let Some(map) = self.map(value)? else {
            return write_length(dst, None);
        };
        let entries = map.entries();
        write_length(dst, Some(entries.len()))?;
        write_section(map.keys(), entries.iter().map(|(k, _)| k), dst)?;
        write_section(map.values(), entries.iter().map(|(_, v)| v), dst)
    }

    fn read_payload(&self, src: &mut ByteReader<'_>) -> Result<Value> {
        read_nested(src, |src, count| {
            let (keys, key_items) = read_section(src, self.fixed_keys, count)?;
            let (values, value_items) = read_section(src, self.fixed_values, count)?;
            let entries = key_items.into_iter().zip(value_items).collect();
            Map::new(keys, values, entries)
                .map(Value::Map)
                .map_err(invalid_as_malformed)
        })
    }
}
