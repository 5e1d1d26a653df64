//! Read-only access to the dex container format.
//!
//! Every reader takes the whole segment buffer plus a cursor index, and advances the
//! cursor past what it consumed. All reads are bounds-checked.

#[macro_use]
pub mod error;

pub mod annotations;
pub mod class_data;
pub mod dex_file;
pub mod encoded_values;
pub(crate) mod leb;

pub use crate::dex::dex_file::DexFile;

use crate::dex::error::DexError;
use crate::dex::leb::decode_uleb128;
use crate::fail;

// Basic type reading
pub(crate) fn read_u1(bytes: &[u8], ix: &mut usize) -> Result<u8, DexError>
{
    if bytes.len() < *ix + 1
    {
        fail!(MalformedContainer, "Unexpected end of stream reading u1 at index {}", *ix);
    }
    let result = bytes[*ix];
    *ix += 1;
    Ok(result)
}

pub(crate) fn read_u2(bytes: &[u8], ix: &mut usize) -> Result<u16, DexError>
{
    if bytes.len() < *ix + 2
    {
        fail!(MalformedContainer, "Unexpected end of stream reading u2 at index {}", *ix);
    }
    let result = ((bytes[*ix + 1] as u16) << 8) | (bytes[*ix] as u16);
    *ix += 2;
    Ok(result)
}

pub(crate) fn read_u4(bytes: &[u8], ix: &mut usize) -> Result<u32, DexError>
{
    if bytes.len() < *ix + 4
    {
        fail!(MalformedContainer, "Unexpected end of stream reading u4 at index {}", *ix);
    }
    let result =
        ((bytes[*ix + 3] as u32) << 24) | ((bytes[*ix + 2] as u32) << 16) | ((bytes[*ix + 1] as u32) << 8) | (bytes[*ix] as u32);
    *ix += 4;
    Ok(result)
}

pub(crate) fn read_uleb128(bytes: &[u8], ix: &mut usize) -> Result<u32, DexError>
{
    if *ix > bytes.len()
    {
        fail!(MalformedContainer, "Unexpected end of stream reading uleb128 at index {}", *ix);
    }
    let (val, size) = decode_uleb128(&bytes[*ix..])?;
    *ix += size;
    Ok(val)
}

pub(crate) fn read_x(bytes: &[u8], ix: &mut usize, length: usize) -> Result<Vec<u8>, DexError>
{
    if *ix <= bytes.len() && bytes.len() - *ix >= length
    {
        let v = bytes[*ix..*ix + length].to_vec();
        *ix += length;
        Ok(v)
    }
    else
    {
        fail!(MalformedContainer, "buffer too short for {} byte array read at index {}", length, *ix)
    }
}

/// Read bytes up to (not including) a NUL terminator, consuming the terminator.
pub(crate) fn read_cstring_bytes(bytes: &[u8], ix: &mut usize) -> Result<Vec<u8>, DexError>
{
    let mut v = vec![];
    loop
    {
        let u = read_u1(bytes, ix)?;
        if u != 0 { v.push(u); }
        else { break; }
    }
    Ok(v)
}

/// Copy `size` bytes into a zero-filled buffer that is `width` bytes wide.
///
/// With `right_justify` unset the bytes land at the low end (little-endian integers,
/// which the caller then sign- or zero-extends). With it set they land at the high end,
/// which is how encoded floats and doubles drop their low-order bytes.
pub(crate) fn read_sized_field(bytes: &[u8], ix: &mut usize, size: usize, width: usize, right_justify: bool) -> Result<[u8; 8], DexError>
{
    if size == 0 || size > width || width > 8
    {
        fail!(MalformedContainer, "Invalid encoded value size {} for a {} byte field", size, width);
    }
    let raw = read_x(bytes, ix, size)?;
    let mut buf = [0u8; 8];
    let start = if right_justify { width - size } else { 0 };
    buf[start..start + size].copy_from_slice(&raw);
    Ok(buf)
}

#[cfg(test)]
pub(crate) fn write_u1(buffer: &mut Vec<u8>, val: u8) -> usize
{
    buffer.push(val);
    1
}

#[cfg(test)]
pub(crate) fn write_u2(buffer: &mut Vec<u8>, val: u16) -> usize
{
    buffer.push(val as u8);
    buffer.push((val >> 8) as u8);
    2
}

#[cfg(test)]
pub(crate) fn write_u4(buffer: &mut Vec<u8>, val: u32) -> usize
{
    for i in 0..4
    {
        buffer.push((val >> (i * 8)) as u8);
    }
    4
}

#[cfg(test)]
pub(crate) fn write_uleb128(buffer: &mut Vec<u8>, val: u32) -> usize
{
    let encoded = crate::dex::leb::encode_uleb128(val);
    let c = encoded.len();
    buffer.extend(encoded);
    c
}

#[cfg(test)]
pub(crate) fn write_x(buffer: &mut Vec<u8>, val: &[u8]) -> usize
{
    let len = val.len();
    buffer.extend(val);
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::error::DexErrorKind;

    #[test]
    fn reads_little_endian()
    {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0xCD, 0xAB, 0x7F];
        let mut ix = 0;
        assert_eq!(read_u4(&bytes, &mut ix).unwrap(), 0x12345678);
        assert_eq!(read_u2(&bytes, &mut ix).unwrap(), 0xABCD);
        assert_eq!(read_u1(&bytes, &mut ix).unwrap(), 0x7F);
        assert_eq!(ix, bytes.len());
    }

    #[test]
    fn out_of_bounds_is_malformed_container()
    {
        let bytes = [0x01, 0x02, 0x03];
        let mut ix = 0;
        let e = read_u4(&bytes, &mut ix).unwrap_err();
        assert_eq!(e.kind(), DexErrorKind::MalformedContainer);
        assert_eq!(ix, 0);

        let mut ix = 10;
        assert!(read_uleb128(&bytes, &mut ix).is_err());
        let mut ix = 10;
        assert!(read_x(&bytes, &mut ix, 1).is_err());
    }

    #[test]
    fn cstring_stops_at_terminator()
    {
        let bytes = b"abc\0def\0";
        let mut ix = 0;
        assert_eq!(read_cstring_bytes(bytes, &mut ix).unwrap(), b"abc".to_vec());
        assert_eq!(ix, 4);
        assert_eq!(read_cstring_bytes(bytes, &mut ix).unwrap(), b"def".to_vec());

        let mut ix = 0;
        assert!(read_cstring_bytes(b"no terminator", &mut ix).is_err());
    }

    #[test]
    fn sized_field_padding()
    {
        let bytes = [0x3E, 0x80];
        let mut ix = 0;
        let low = read_sized_field(&bytes, &mut ix, 1, 4, false).unwrap();
        assert_eq!(&low[..4], &[0x3E, 0, 0, 0]);

        let mut ix = 0;
        let high = read_sized_field(&bytes, &mut ix, 2, 4, true).unwrap();
        assert_eq!(&high[..4], &[0, 0, 0x3E, 0x80]);
        assert_eq!(ix, 2);

        let mut ix = 0;
        assert!(read_sized_field(&bytes, &mut ix, 5, 4, false).is_err());
    }
}
