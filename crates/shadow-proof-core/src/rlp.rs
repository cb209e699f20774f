//! Ethereum recursive-length-prefix codec.
//!
//! Decoding is strict: truncated items, trailing bytes and non-canonical length
//! prefixes are all rejected, so any accepted encoding re-encodes to itself.

use alloc::{vec, vec::Vec};

use crate::bytes::minimal_be_bytes;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RlpError {
    Truncated,
    TrailingBytes,
    NonCanonical,
    LengthOverflow,
    ExpectedList,
}

impl RlpError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Truncated => "rlp item extends past end of input",
            Self::TrailingBytes => "unexpected bytes after rlp item",
            Self::NonCanonical => "non-canonical rlp length prefix",
            Self::LengthOverflow => "rlp length does not fit in usize",
            Self::ExpectedList => "expected rlp list",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RlpItem {
    pub is_list: bool,
    pub payload_offset: usize,
    pub payload_len: usize,
    pub total_len: usize,
}

/// One decoded element of a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RlpField<'a> {
    pub is_list: bool,
    /// Payload bytes (string content, or list body).
    pub payload: &'a [u8],
    /// Full encoding including the prefix.
    pub raw: &'a [u8],
}

pub fn decode_item(input: &[u8], offset: usize) -> Result<RlpItem, RlpError> {
    let prefix = *input.get(offset).ok_or(RlpError::Truncated)?;

    let item = match prefix {
        0x00..=0x7f => RlpItem {
            is_list: false,
            payload_offset: offset,
            payload_len: 1,
            total_len: 1,
        },
        0x80..=0xb7 => {
            let len = (prefix - 0x80) as usize;
            if len == 1 && input.get(offset + 1).is_some_and(|b| *b < 0x80) {
                return Err(RlpError::NonCanonical);
            }
            short_item(false, offset, len)
        }
        0xb8..=0xbf => long_item(input, false, offset, (prefix - 0xb7) as usize)?,
        0xc0..=0xf7 => short_item(true, offset, (prefix - 0xc0) as usize),
        0xf8..=0xff => long_item(input, true, offset, (prefix - 0xf7) as usize)?,
    };

    let end = item
        .payload_offset
        .checked_add(item.payload_len)
        .ok_or(RlpError::LengthOverflow)?;
    if end > input.len() {
        return Err(RlpError::Truncated);
    }
    Ok(item)
}

fn short_item(is_list: bool, offset: usize, len: usize) -> RlpItem {
    RlpItem {
        is_list,
        payload_offset: offset + 1,
        payload_len: len,
        total_len: 1 + len,
    }
}

fn long_item(input: &[u8], is_list: bool, offset: usize, len_of_len: usize) -> Result<RlpItem, RlpError> {
    let len_offset = offset + 1;
    let len_bytes = input
        .get(len_offset..len_offset + len_of_len)
        .ok_or(RlpError::Truncated)?;
    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonical);
    }
    let len = read_be_usize(len_bytes)?;
    if len <= 55 {
        return Err(RlpError::NonCanonical);
    }
    Ok(RlpItem {
        is_list,
        payload_offset: len_offset + len_of_len,
        payload_len: len,
        total_len: (1 + len_of_len)
            .checked_add(len)
            .ok_or(RlpError::LengthOverflow)?,
    })
}

/// Decodes `input` as exactly one list and returns its elements.
pub fn decode_list(input: &[u8]) -> Result<Vec<RlpField<'_>>, RlpError> {
    let top = decode_item(input, 0)?;
    if !top.is_list {
        return Err(RlpError::ExpectedList);
    }
    if top.total_len != input.len() {
        return Err(RlpError::TrailingBytes);
    }

    let mut out = Vec::new();
    let mut cursor = top.payload_offset;
    let end = top.payload_offset + top.payload_len;

    while cursor < end {
        let item = decode_item(input, cursor)?;
        let item_end = cursor + item.total_len;
        if item_end > end {
            return Err(RlpError::Truncated);
        }
        out.push(RlpField {
            is_list: item.is_list,
            payload: &input[item.payload_offset..item.payload_offset + item.payload_len],
            raw: &input[cursor..item_end],
        });
        cursor = item_end;
    }

    Ok(out)
}

pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] <= 0x7f {
        return vec![data[0]];
    }
    let mut out = length_prefix(0x80, 0xb7, data.len());
    out.extend_from_slice(data);
    out
}

/// Encodes an unsigned integer in minimal big-endian form (zero is `0x80`).
pub fn encode_uint(value: u128) -> Vec<u8> {
    encode_bytes(&minimal_be_bytes(value))
}

/// Wraps already-encoded items in a list.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len: usize = items.iter().map(|it| it.len()).sum();
    let mut out = length_prefix(0xc0, 0xf7, payload_len);
    for it in items {
        out.extend_from_slice(it);
    }
    out
}

fn length_prefix(short_base: u8, long_base: u8, len: usize) -> Vec<u8> {
    if len <= 55 {
        let mut out = Vec::with_capacity(1 + len);
        out.push(short_base + len as u8);
        return out;
    }
    let len_bytes = minimal_be_bytes(len as u128);
    let mut out = Vec::with_capacity(1 + len_bytes.len() + len);
    out.push(long_base + len_bytes.len() as u8);
    out.extend_from_slice(&len_bytes);
    out
}

fn read_be_usize(input: &[u8]) -> Result<usize, RlpError> {
    if input.is_empty() || input.len() > core::mem::size_of::<usize>() {
        return Err(RlpError::LengthOverflow);
    }
    let mut out = 0usize;
    for b in input {
        out = out
            .checked_mul(256)
            .and_then(|v| v.checked_add(*b as usize))
            .ok_or(RlpError::LengthOverflow)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_empty() {
        assert_eq!(encode_bytes(&[]), vec![0x80]);
        assert_eq!(encode_uint(0), vec![0x80]);
    }

    #[test]
    fn encode_single_byte() {
        assert_eq!(encode_bytes(&[0x42]), vec![0x42]);
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(encode_uint(0x0400), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn encode_long_string() {
        let data = [0xaa; 56];
        let encoded = encode_bytes(&data);
        assert_eq!(&encoded[..2], &[0xb8, 56]);
        assert_eq!(encoded.len(), 58);
    }

    #[test]
    fn encode_list_of_two() {
        let list = encode_list(&[encode_bytes(&[0x01]), encode_bytes(&[0x02])]);
        assert_eq!(list, vec![0xc2, 0x01, 0x02]);
    }

    #[test]
    fn decode_nested_list_keeps_raw_encoding() {
        let inner = encode_list(&[encode_bytes(b"dog")]);
        let outer = encode_list(&[encode_bytes(b"cat"), inner.clone()]);
        let fields = decode_list(&outer).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].payload, b"cat");
        assert!(!fields[0].is_list);
        assert!(fields[1].is_list);
        assert_eq!(fields[1].raw, &inner[..]);
    }

    #[test]
    fn decode_long_list() {
        let items: Vec<Vec<u8>> = (0..20).map(|_| encode_bytes(b"abcd")).collect();
        let encoded = encode_list(&items);
        assert_eq!(encoded[0], 0xf8);
        let fields = decode_list(&encoded).unwrap();
        assert_eq!(fields.len(), 20);
        assert!(fields.iter().all(|f| f.payload == b"abcd"));
    }

    #[test]
    fn rejects_truncated_and_trailing() {
        assert_eq!(decode_list(&[0xc3, 0x01, 0x02]), Err(RlpError::Truncated));
        assert_eq!(decode_list(&[0xc1, 0x01, 0x02]), Err(RlpError::TrailingBytes));
        assert_eq!(decode_list(&[0x83, b'd', b'o', b'g']), Err(RlpError::ExpectedList));
        assert_eq!(decode_list(&[]), Err(RlpError::Truncated));
    }

    #[test]
    fn rejects_non_canonical_prefixes() {
        // single byte below 0x80 wrapped in a string prefix
        assert_eq!(decode_item(&[0x81, 0x05], 0), Err(RlpError::NonCanonical));
        // long form for a short payload
        let mut long_short = vec![0xb8, 0x03];
        long_short.extend_from_slice(b"dog");
        assert_eq!(decode_item(&long_short, 0), Err(RlpError::NonCanonical));
        // leading zero in length bytes
        let mut padded_len = vec![0xb9, 0x00, 0x38];
        padded_len.extend_from_slice(&[0u8; 56]);
        assert_eq!(decode_item(&padded_len, 0), Err(RlpError::NonCanonical));
    }
}
