use super::{codes, CODEC_NAME};
use crate::error::{ProtocolError, Result};
use crate::serialization::value::Value;
use bytes::{BufMut, BytesMut};

/// Largest length any MessagePack header can carry
const MAX_LEN: usize = u32::MAX as usize;

fn unsupported(value: &Value) -> ProtocolError {
    ProtocolError::UnsupportedType {
        codec: CODEC_NAME,
        kind: value.kind().name().to_string(),
    }
}

fn check_len(len: usize) -> Result<()> {
    if len > MAX_LEN {
        return Err(ProtocolError::CapacityExceeded { len, max: MAX_LEN });
    }
    Ok(())
}

pub(super) fn value_len(value: &Value) -> Result<usize> {
    let len = match value {
        Value::Null | Value::Bool(_) => 1,
        Value::I8(v) => signed_len((*v).into()),
        Value::I16(v) => signed_len((*v).into()),
        Value::I32(v) => signed_len((*v).into()),
        Value::I64(v) => signed_len(*v),
        Value::U8(v) => unsigned_len((*v).into()),
        Value::U16(v) => unsigned_len((*v).into()),
        Value::U32(v) => unsigned_len((*v).into()),
        Value::U64(v) => unsigned_len(*v),
        Value::F32(_) => 5,
        Value::F64(_) => 9,
        Value::String(s) => str_header_len(s.len())? + s.len(),
        Value::Bytes(b) => bin_header_len(b.len())? + b.len(),
        Value::Ext(_, data) => ext_header_len(data.len())? + data.len(),
        Value::Array(array) => sequence_len(array.items())?,
        Value::List(items) => sequence_len(items)?,
        Value::Map(map) => {
            let entries = map.entries();
            entries.iter().try_fold(
                container_header_len(entries.len())?,
                |total, (k, v)| -> Result<usize> { Ok(total + value_len(k)? + value_len(v)?) },
            )?
        }
        Value::Char(_) | Value::Decimal(_) | Value::Timestamp(_) => {
            return Err(unsupported(value))
        }
    };
    Ok(len)
}

pub(super) fn write_value(value: &Value, dst: &mut BytesMut) -> Result<()> {
    match value {
        Value::Null => dst.put_u8(codes::NIL),
        Value::Bool(false) => dst.put_u8(codes::FALSE),
        Value::Bool(true) => dst.put_u8(codes::TRUE),
        Value::I8(v) => write_signed((*v).into(), dst),
        Value::I16(v) => write_signed((*v).into(), dst),
        Value::I32(v) => write_signed((*v).into(), dst),
        Value::I64(v) => write_signed(*v, dst),
        Value::U8(v) => write_unsigned((*v).into(), dst),
        Value::U16(v) => write_unsigned((*v).into(), dst),
        Value::U32(v) => write_unsigned((*v).into(), dst),
        Value::U64(v) => write_unsigned(*v, dst),
        Value::F32(v) => {
            dst.put_u8(codes::FLOAT32);
            dst.put_f32(*v);
        }
        Value::F64(v) => {
            dst.put_u8(codes::FLOAT64);
            dst.put_f64(*v);
        }
        Value::String(s) => {
            write_str_header(s.len(), dst)?;
            dst.put_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            write_bin_header(b.len(), dst)?;
            dst.put_slice(b);
        }
        Value::Ext(ty, data) => {
            write_ext_header(*ty, data.len(), dst)?;
            dst.put_slice(data);
        }
        Value::Array(array) => write_sequence(array.items(), dst)?,
        Value::List(items) => write_sequence(items, dst)?,
        Value::Map(map) => {
            let entries = map.entries();
            write_container_header(codes::FIXMAP, codes::MAP16, codes::MAP32, entries.len(), dst)?;
            for (key, value) in entries {
                write_value(key, dst)?;
                write_value(value, dst)?;
            }
        }
        Value::Char(_) | Value::Decimal(_) | Value::Timestamp(_) => {
            return Err(unsupported(value))
        }
    }
    Ok(())
}

fn sequence_len(items: &[Value]) -> Result<usize> {
    items.iter().try_fold(
        container_header_len(items.len())?,
        |total, item| -> Result<usize> { Ok(total + value_len(item)?) },
    )
}

fn write_sequence(items: &[Value], dst: &mut BytesMut) -> Result<()> {
    write_container_header(codes::FIXARRAY, codes::ARRAY16, codes::ARRAY32, items.len(), dst)?;
    items.iter().try_for_each(|item| write_value(item, dst))
}

// Integers

/// Positive fixint, negative fixint, then int8/16/32/64 by range.
fn signed_len(v: i64) -> usize {
    // Both fixint families apply to signed values, as in standard
    // MessagePack: 0..=127 is a positive fixint and -32..=-1 a negative one.
    if (-32..=127).contains(&v) {
        1
    } else if i8::try_from(v).is_ok() {
        2
    } else if i16::try_from(v).is_ok() {
        3
    } else if i32::try_from(v).is_ok() {
        5
    } else {
        9
    }
}

fn write_signed(v: i64, dst: &mut BytesMut) {
    match signed_len(v) {
        1 => dst.put_i8(v as i8),
        2 => {
            dst.put_u8(codes::INT8);
            dst.put_i8(v as i8);
        }
        3 => {
            dst.put_u8(codes::INT16);
            dst.put_i16(v as i16);
        }
        5 => {
            dst.put_u8(codes::INT32);
            dst.put_i32(v as i32);
        }
        _ => {
            dst.put_u8(codes::INT64);
            dst.put_i64(v);
        }
    }
}

/// Positive fixint, then uint8/16/32/64 by range.
fn unsigned_len(v: u64) -> usize {
    if v <= u64::from(codes::POSITIVE_FIXINT_MAX) {
        1
    } else if u8::try_from(v).is_ok() {
        2
    } else if u16::try_from(v).is_ok() {
        3
    } else if u32::try_from(v).is_ok() {
        5
    } else {
        9
    }
}

fn write_unsigned(v: u64, dst: &mut BytesMut) {
    match unsigned_len(v) {
        1 => dst.put_u8(v as u8),
        2 => {
            dst.put_u8(codes::UINT8);
            dst.put_u8(v as u8);
        }
        3 => {
            dst.put_u8(codes::UINT16);
            dst.put_u16(v as u16);
        }
        5 => {
            dst.put_u8(codes::UINT32);
            dst.put_u32(v as u32);
        }
        _ => {
            dst.put_u8(codes::UINT64);
            dst.put_u64(v);
        }
    }
}

// Headers

fn str_header_len(len: usize) -> Result<usize> {
    check_len(len)?;
    Ok(if len <= codes::FIXSTR_MAX {
        1
    } else if len <= u8::MAX as usize {
        2
    } else if len <= u16::MAX as usize {
        3
    } else {
        5
    })
}

fn write_str_header(len: usize, dst: &mut BytesMut) -> Result<()> {
    match str_header_len(len)? {
        1 => dst.put_u8(codes::FIXSTR | len as u8),
        2 => {
            dst.put_u8(codes::STR8);
            dst.put_u8(len as u8);
        }
        3 => {
            dst.put_u8(codes::STR16);
            dst.put_u16(len as u16);
        }
        _ => {
            dst.put_u8(codes::STR32);
            dst.put_u32(len as u32);
        }
    }
    Ok(())
}

fn bin_header_len(len: usize) -> Result<usize> {
    check_len(len)?;
    Ok(if len <= u8::MAX as usize {
        2
    } else if len <= u16::MAX as usize {
        3
    } else {
        5
    })
}

fn write_bin_header(len: usize, dst: &mut BytesMut) -> Result<()> {
    match bin_header_len(len)? {
        2 => {
            dst.put_u8(codes::BIN8);
            dst.put_u8(len as u8);
        }
        3 => {
            dst.put_u8(codes::BIN16);
            dst.put_u16(len as u16);
        }
        _ => {
            dst.put_u8(codes::BIN32);
            dst.put_u32(len as u32);
        }
    }
    Ok(())
}

fn container_header_len(count: usize) -> Result<usize> {
    check_len(count)?;
    Ok(if count <= codes::FIX_CONTAINER_MAX {
        1
    } else if count <= u16::MAX as usize {
        3
    } else {
        5
    })
}

fn write_container_header(
    fix: u8,
    code16: u8,
    code32: u8,
    count: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    match container_header_len(count)? {
        1 => dst.put_u8(fix | count as u8),
        3 => {
            dst.put_u8(code16);
            dst.put_u16(count as u16);
        }
        _ => {
            dst.put_u8(code32);
            dst.put_u32(count as u32);
        }
    }
    Ok(())
}

/// Fixed forms for 1/2/4/8 byte payloads, otherwise ext8/16/32.
/// A 3 byte payload therefore always takes ext8.
fn fixext_code(len: usize) -> Option<u8> {
    match len {
        1 => Some(codes::FIXEXT1),
        2 => Some(codes::FIXEXT2),
        4 => Some(codes::FIXEXT4),
        8 => Some(codes::FIXEXT8),
        _ => None,
    }
}

fn ext_header_len(len: usize) -> Result<usize> {
    check_len(len)?;
    Ok(if fixext_code(len).is_some() {
        2
    } else if len <= u8::MAX as usize {
        3
    } else if len <= u16::MAX as usize {
        4
    } else {
        6
    })
}

fn write_ext_header(ty: i8, len: usize, dst: &mut BytesMut) -> Result<()> {
    if let Some(code) = fixext_code(len) {
        dst.put_u8(code);
    } else {
        match ext_header_len(len)? {
            3 => {
                dst.put_u8(codes::EXT8);
                dst.put_u8(len as u8);
            }
            4 => {
                dst.put_u8(codes::EXT16);
                dst.put_u16(len as u16);
            }
            _ => {
                dst.put_u8(codes::EXT32);
                dst.put_u32(len as u32);
            }
        }
    }
    dst.put_i8(ty);
    Ok(())
}
