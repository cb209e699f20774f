//! Fixed-width integer/byte conversions, hex codec and hash wrappers.

use alloc::{format, string::String, vec::Vec};
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

use crate::error::{ClaimValidationError, InputFault};

pub fn u64_to_bytes32(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

pub fn u128_to_bytes32(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Reads a big-endian 32-byte word as `u128`; `None` if the high half is non-zero.
pub fn u128_from_bytes32(word: &[u8; 32]) -> Option<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return None;
    }
    Some(u128::from_be_bytes(copy_array::<16>(&word[16..])))
}

/// Big-endian bytes with leading zeros stripped; zero becomes the empty string.
pub fn minimal_be_bytes(value: u128) -> Vec<u8> {
    let raw = value.to_be_bytes();
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    raw[start..].to_vec()
}

/// Zero-pads (or truncates) a label to one 32-byte word.
pub fn pad_label(label: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = core::cmp::min(32, label.len());
    out[..n].copy_from_slice(&label[..n]);
    out
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.finalize().into()
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(data);
    let mut out = [0u8; 32];
    keccak.finalize(&mut out);
    out
}

pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decodes a `0x`-prefixed hex string of exactly `N` bytes.
pub fn decode_hex_fixed<const N: usize>(value: &str) -> Result<[u8; N], ClaimValidationError> {
    let stripped = strip_hex_prefix(value).ok_or(InputFault::HexEncoding)?;
    if stripped.len() != N * 2 {
        return Err(InputFault::HexEncoding.into());
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(stripped, &mut out).map_err(|_| InputFault::HexEncoding)?;
    Ok(out)
}

pub fn strip_hex_prefix(value: &str) -> Option<&str> {
    value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))
}

pub fn secret_from_slice(bytes: &[u8]) -> Result<[u8; 32], ClaimValidationError> {
    if bytes.len() != 32 {
        return Err(InputFault::SecretLength.into());
    }
    Ok(copy_array::<32>(bytes))
}

pub fn address_from_slice(bytes: &[u8]) -> Result<[u8; 20], ClaimValidationError> {
    if bytes.len() != 20 {
        return Err(InputFault::RecipientLength.into());
    }
    Ok(copy_array::<20>(bytes))
}

pub(crate) fn copy_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(&[])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            hex::encode(sha256(&[])),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn words_are_big_endian() {
        let word = u64_to_bytes32(0x0102);
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert!(word[..30].iter().all(|b| *b == 0));
        assert_eq!(u128_from_bytes32(&u128_to_bytes32(u128::MAX)), Some(u128::MAX));

        let mut high = [0u8; 32];
        high[0] = 1;
        assert_eq!(u128_from_bytes32(&high), None);
    }

    #[test]
    fn minimal_bytes_strip_leading_zeros() {
        assert!(minimal_be_bytes(0).is_empty());
        assert_eq!(minimal_be_bytes(0x01_00), [0x01, 0x00]);
        assert_eq!(minimal_be_bytes(0xff), [0xff]);
    }

    #[test]
    fn label_padding_truncates_long_labels() {
        let padded = pad_label(b"shadow.pow.v1");
        assert_eq!(&padded[..13], b"shadow.pow.v1");
        assert!(padded[13..].iter().all(|b| *b == 0));

        let long = [b'x'; 40];
        assert_eq!(pad_label(&long), [b'x'; 32]);
    }

    #[test]
    fn hex_requires_prefix_and_width() {
        let ok = decode_hex_fixed::<2>("0xabCD").unwrap();
        assert_eq!(ok, [0xab, 0xcd]);
        assert!(decode_hex_fixed::<2>("abcd").is_err());
        assert!(decode_hex_fixed::<2>("0xabc").is_err());
        assert!(decode_hex_fixed::<2>("0xzzzz").is_err());
        assert_eq!(encode_hex(&ok), "0xabcd");
    }

    #[test]
    fn width_checked_entry_points() {
        assert!(secret_from_slice(&[0u8; 32]).is_ok());
        assert_eq!(
            secret_from_slice(&[0u8; 31]),
            Err(ClaimValidationError::MalformedInput(InputFault::SecretLength))
        );
        assert!(address_from_slice(&[0u8; 20]).is_ok());
        assert_eq!(
            address_from_slice(&[0u8; 32]),
            Err(ClaimValidationError::MalformedInput(InputFault::RecipientLength))
        );
    }
}
