use crate::dex::error::DexError;
use crate::dex::{read_sized_field, read_u1, read_uleb128};
use crate::fail;

pub const VALUE_BYTE: u8 = 0x00;
pub const VALUE_SHORT: u8 = 0x02;
pub const VALUE_CHAR: u8 = 0x03;
pub const VALUE_INT: u8 = 0x04;
pub const VALUE_LONG: u8 = 0x06;
pub const VALUE_FLOAT: u8 = 0x10;
pub const VALUE_DOUBLE: u8 = 0x11;
pub const VALUE_METHOD_TYPE: u8 = 0x15;
pub const VALUE_METHOD_HANDLE: u8 = 0x16;
pub const VALUE_STRING: u8 = 0x17;
pub const VALUE_TYPE: u8 = 0x18;
pub const VALUE_FIELD: u8 = 0x19;
pub const VALUE_METHOD: u8 = 0x1a;
pub const VALUE_ENUM: u8 = 0x1b;
pub const VALUE_ARRAY: u8 = 0x1c;
pub const VALUE_ANNOTATION: u8 = 0x1d;
pub const VALUE_NULL: u8 = 0x1e;
pub const VALUE_BOOLEAN: u8 = 0x1f;

/// encoded_annotation: a type reference and its name/value pairs, still holding raw pool indices.
#[derive(Debug, PartialEq, Clone)]
pub struct EncodedAnnotation {
    pub type_idx: u32,
    pub elements: Vec<AnnotationElement>,
}

impl EncodedAnnotation {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<EncodedAnnotation, DexError> {
        let type_idx = read_uleb128(bytes, ix)?;
        let size = read_uleb128(bytes, ix)? as usize;
        let mut elements = Vec::with_capacity(size.min(256));

        for _ in 0..size {
            elements.push(AnnotationElement::read(bytes, ix)?);
        }

        Ok(EncodedAnnotation { type_idx, elements })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct AnnotationElement {
    pub name_idx: u32,
    pub value: EncodedValue,
}

impl AnnotationElement {
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<AnnotationElement, DexError> {
        let name_idx = read_uleb128(bytes, ix)?;
        let value = EncodedValue::read(bytes, ix)?;

        Ok(AnnotationElement { name_idx, value })
    }
}

/// encoded_value with pool references left as indices; see `parser::DecodedValue` for the resolved form.
#[derive(Debug, PartialEq, Clone)]
pub enum EncodedValue {
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    MethodType(u32),
    MethodHandle(u32),
    String(u32),
    Type(u32),
    Field(u32),
    Method(u32),
    Enum(u32),
    Array(Vec<EncodedValue>),
    Annotation(EncodedAnnotation),
    Null,
    Boolean(bool),
}

impl EncodedValue
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<EncodedValue, DexError> {
        let header_byte = read_u1(bytes, ix)?;
        let value_arg = header_byte >> 5;
        let value_type = header_byte & 0x1F;
        let size = (value_arg + 1) as usize;

        match value_type {
            VALUE_BYTE => Ok(EncodedValue::Byte(read_signed(bytes, ix, size, 1)? as i8)),
            VALUE_SHORT => Ok(EncodedValue::Short(read_signed(bytes, ix, size, 2)? as i16)),
            VALUE_CHAR => Ok(EncodedValue::Char(read_unsigned(bytes, ix, size, 2)? as u16)),
            VALUE_INT => Ok(EncodedValue::Int(read_signed(bytes, ix, size, 4)? as i32)),
            VALUE_LONG => Ok(EncodedValue::Long(read_signed(bytes, ix, size, 8)?)),
            VALUE_FLOAT => {
                let buf = read_sized_field(bytes, ix, size, 4, true)?;
                Ok(EncodedValue::Float(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])))
            },
            VALUE_DOUBLE => {
                let buf = read_sized_field(bytes, ix, size, 8, true)?;
                Ok(EncodedValue::Double(f64::from_le_bytes(buf)))
            },
            VALUE_METHOD_TYPE => Ok(EncodedValue::MethodType(read_index(bytes, ix, size)?)),
            VALUE_METHOD_HANDLE => Ok(EncodedValue::MethodHandle(read_index(bytes, ix, size)?)),
            VALUE_STRING => Ok(EncodedValue::String(read_index(bytes, ix, size)?)),
            VALUE_TYPE => Ok(EncodedValue::Type(read_index(bytes, ix, size)?)),
            VALUE_FIELD => Ok(EncodedValue::Field(read_index(bytes, ix, size)?)),
            VALUE_METHOD => Ok(EncodedValue::Method(read_index(bytes, ix, size)?)),
            VALUE_ENUM => Ok(EncodedValue::Enum(read_index(bytes, ix, size)?)),
            VALUE_ARRAY => Ok(EncodedValue::Array(read_encoded_array(bytes, ix)?)),
            VALUE_ANNOTATION => Ok(EncodedValue::Annotation(EncodedAnnotation::read(bytes, ix)?)),
            VALUE_NULL => Ok(EncodedValue::Null),
            VALUE_BOOLEAN => Ok(EncodedValue::Boolean(value_arg != 0)),
            _ => fail!(UnsupportedEncodedValueTag, "Unknown EncodedValue type 0x{:02x} at index {}", value_type, *ix - 1),
        }
    }
}

/// Little-endian, sign-extended from the top bit of the last byte read.
fn read_signed(bytes: &[u8], ix: &mut usize, size: usize, width: usize) -> Result<i64, DexError> {
    let buf = read_sized_field(bytes, ix, size, width, false)?;
    let shift = 64 - 8 * size as u32;
    Ok((i64::from_le_bytes(buf) << shift) >> shift)
}

/// Little-endian, zero-extended.
fn read_unsigned(bytes: &[u8], ix: &mut usize, size: usize, width: usize) -> Result<u64, DexError> {
    let buf = read_sized_field(bytes, ix, size, width, false)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_index(bytes: &[u8], ix: &mut usize, size: usize) -> Result<u32, DexError> {
    Ok(read_unsigned(bytes, ix, size, 4)? as u32)
}

pub fn read_encoded_array(bytes: &[u8], ix: &mut usize) -> Result<Vec<EncodedValue>, DexError>
{
    let size = read_uleb128(bytes, ix)? as usize;

    let mut values = Vec::with_capacity(size.min(256));
    for _ in 0..size
    {
        values.push(EncodedValue::read(bytes, ix)?);
    }

    Ok(values)
}
