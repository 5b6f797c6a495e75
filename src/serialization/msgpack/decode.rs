use super::{codes, CODEC_NAME};
use crate::error::{ProtocolError, Result};
use crate::serialization::reader::ByteReader;
use crate::serialization::value::{Map, Value};

pub(super) fn read_value(src: &mut ByteReader<'_>) -> Result<Value> {
    let code = src.read_u8()?;
    let value = match code {
        0x00..=codes::POSITIVE_FIXINT_MAX => Value::U8(code),
        0x80..=0x8f => read_map(src, (code & 0x0f) as usize)?,
        0x90..=0x9f => read_list(src, (code & 0x0f) as usize)?,
        0xa0..=0xbf => read_string(src, (code & 0x1f) as usize)?,
        codes::NIL => Value::Null,
        codes::FALSE => Value::Bool(false),
        codes::TRUE => Value::Bool(true),
        codes::BIN8 => {
            let len = usize::from(src.read_u8()?);
            read_binary(src, len)?
        }
        codes::BIN16 => {
            let len = usize::from(src.read_u16()?);
            read_binary(src, len)?
        }
        codes::BIN32 => {
            let len = src.read_u32()? as usize;
            read_binary(src, len)?
        }
        codes::EXT8 => {
            let len = usize::from(src.read_u8()?);
            read_ext(src, len)?
        }
        codes::EXT16 => {
            let len = usize::from(src.read_u16()?);
            read_ext(src, len)?
        }
        codes::EXT32 => {
            let len = src.read_u32()? as usize;
            read_ext(src, len)?
        }
        codes::FLOAT32 => Value::F32(src.read_f32()?),
        codes::FLOAT64 => Value::F64(src.read_f64()?),
        codes::UINT8 => Value::U8(src.read_u8()?),
        codes::UINT16 => Value::U16(src.read_u16()?),
        codes::UINT32 => Value::U32(src.read_u32()?),
        codes::UINT64 => Value::U64(src.read_u64()?),
        codes::INT8 => Value::I8(src.read_i8()?),
        codes::INT16 => Value::I16(src.read_i16()?),
        codes::INT32 => Value::I32(src.read_i32()?),
        codes::INT64 => Value::I64(src.read_i64()?),
        codes::FIXEXT1 => read_ext(src, 1)?,
        codes::FIXEXT2 => read_ext(src, 2)?,
        codes::FIXEXT4 => read_ext(src, 4)?,
        codes::FIXEXT8 => read_ext(src, 8)?,
        codes::FIXEXT16 => read_ext(src, 16)?,
        codes::STR8 => {
            let len = usize::from(src.read_u8()?);
            read_string(src, len)?
        }
        codes::STR16 => {
            let len = usize::from(src.read_u16()?);
            read_string(src, len)?
        }
        codes::STR32 => {
            let len = src.read_u32()? as usize;
            read_string(src, len)?
        }
        codes::ARRAY16 => {
            let len = usize::from(src.read_u16()?);
            read_list(src, len)?
        }
        codes::ARRAY32 => {
            let len = src.read_u32()? as usize;
            read_list(src, len)?
        }
        codes::MAP16 => {
            let len = usize::from(src.read_u16()?);
            read_map(src, len)?
        }
        codes::MAP32 => {
            let len = src.read_u32()? as usize;
            read_map(src, len)?
        }
        codes::NEGATIVE_FIXINT_MIN..=0xff => Value::I8(code as i8),
        codes::NEVER_USED => {
            return Err(ProtocolError::UnknownTypeCode {
                codec: CODEC_NAME,
                code,
            })
        }
    };
    Ok(value)
}

fn read_string(src: &mut ByteReader<'_>, len: usize) -> Result<Value> {
    Ok(Value::String(src.read_str(len)?.to_string()))
}

fn read_binary(src: &mut ByteReader<'_>, len: usize) -> Result<Value> {
    Ok(Value::Bytes(src.read_bytes(len)?.to_vec()))
}

fn read_ext(src: &mut ByteReader<'_>, len: usize) -> Result<Value> {
    let ty = src.read_i8()?;
    Ok(Value::Ext(ty, src.read_bytes(len)?.to_vec()))
}

fn read_list(src: &mut ByteReader<'_>, count: usize) -> Result<Value> {
    src.enter()?;
    let mut items = Vec::with_capacity(src.capacity_hint(count));
    let result = (0..count).try_for_each(|_| -> Result<()> {
        items.push(read_value(src)?);
        Ok(())
    });
    src.leave();
    result.map(|()| Value::List(items))
}

fn read_map(src: &mut ByteReader<'_>, count: usize) -> Result<Value> {
    src.enter()?;
    let mut entries = Vec::with_capacity(src.capacity_hint(count));
    let result = (0..count).try_for_each(|_| -> Result<()> {
        let key = read_value(src)?;
        let value = read_value(src)?;
        entries.push((key, value));
        Ok(())
    });
    src.leave();
    result.map(|()| Value::Map(Map::dynamic(entries)))
}
