use crate::dex::error::DexError;
use crate::fail;

/// Decode an unsigned LEB128 value, returning the value and the number of bytes consumed.
///
/// Dex uleb128 values are 32-bit, so valid encodings are at most 5 bytes long.
pub(crate) fn decode_uleb128(encoded: &[u8]) -> Result<(u32, usize), DexError> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;

    for (count, &byte) in encoded.iter().enumerate() {
        let low = (byte & 0x7F) as u32;
        // bits beyond 32 on the 5th byte are dropped
        value |= low.wrapping_shl(shift);

        if byte & 0x80 == 0 {
            return Ok((value, count + 1));
        }
        if count == 4 {
            fail!(MalformedVarint, "invalid LEB128 sequence: continuation bit set on 5th byte");
        }
        shift += 7;
    }

    fail!(MalformedContainer, "Unexpected end of stream reading uleb128 ({} bytes available)", encoded.len())
}

#[cfg(test)]
pub(crate) fn encode_uleb128(value: u32) -> Vec<u8> {
    let mut result = Vec::new();
    let mut remaining = value;

    loop {
        let mut byte = (remaining & 0x7F) as u8;
        remaining >>= 7;

        if remaining != 0 {
            byte |= 0x80;
        }

        result.push(byte);

        if remaining == 0 {
            break;
        }
    }

    result
}
