//! Canonical 87-element public-input layout shared by proofs and the on-chain verifier.

use crate::{
    bytes::u128_to_bytes32,
    error::{ClaimValidationError, InputFault},
};
use sha2::{Digest, Sha256};

pub const PUBLIC_INPUTS_LEN: usize = 87;

pub const BLOCK_NUMBER_INDEX: usize = 0;
pub const BLOCK_HASH_OFFSET: usize = 1;
pub const CHAIN_ID_INDEX: usize = 33;
pub const AMOUNT_INDEX: usize = 34;
pub const RECIPIENT_OFFSET: usize = 35;
pub const NULLIFIER_OFFSET: usize = 55;

/// Largest block number representable as `uint48`.
pub const MAX_BLOCK_NUMBER: u64 = (1 << 48) - 1;

/// Public claim parameters. The block hash is not part of this: the verifying side
/// resolves it from its checkpoint oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicInput {
    pub block_number: u64,
    pub chain_id: u64,
    pub amount: u128,
    pub recipient: [u8; 20],
    pub nullifier: [u8; 32],
}

impl PublicInput {
    pub fn check(&self) -> Result<(), ClaimValidationError> {
        if self.block_number > MAX_BLOCK_NUMBER {
            return Err(InputFault::BlockNumberRange.into());
        }
        Ok(())
    }
}

/// The flattened public-input array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicInputs([u128; PUBLIC_INPUTS_LEN]);

impl PublicInputs {
    pub fn encode(input: &PublicInput, block_hash: &[u8; 32]) -> Self {
        let mut out = [0u128; PUBLIC_INPUTS_LEN];
        out[BLOCK_NUMBER_INDEX] = input.block_number as u128;
        for (slot, b) in out[BLOCK_HASH_OFFSET..CHAIN_ID_INDEX].iter_mut().zip(block_hash) {
            *slot = *b as u128;
        }
        out[CHAIN_ID_INDEX] = input.chain_id as u128;
        out[AMOUNT_INDEX] = input.amount;
        for (slot, b) in out[RECIPIENT_OFFSET..NULLIFIER_OFFSET].iter_mut().zip(&input.recipient) {
            *slot = *b as u128;
        }
        for (slot, b) in out[NULLIFIER_OFFSET..].iter_mut().zip(&input.nullifier) {
            *slot = *b as u128;
        }
        Self(out)
    }

    /// Accepts exactly 87 elements with every byte slot in `0..=255`.
    pub fn from_elements(elements: &[u128]) -> Result<Self, ClaimValidationError> {
        if elements.len() != PUBLIC_INPUTS_LEN {
            return Err(ClaimValidationError::PublicInputShape);
        }
        let mut byte_slots = elements[BLOCK_HASH_OFFSET..CHAIN_ID_INDEX]
            .iter()
            .chain(&elements[RECIPIENT_OFFSET..]);
        if byte_slots.any(|v| *v > 0xff) {
            return Err(ClaimValidationError::PublicInputShape);
        }
        if elements[BLOCK_NUMBER_INDEX] > u64::MAX as u128 || elements[CHAIN_ID_INDEX] > u64::MAX as u128 {
            return Err(ClaimValidationError::PublicInputShape);
        }

        let mut out = [0u128; PUBLIC_INPUTS_LEN];
        out.copy_from_slice(elements);
        Ok(Self(out))
    }

    /// Splits the array back into the public parameters and the block hash.
    pub fn decode(&self) -> (PublicInput, [u8; 32]) {
        let e = &self.0;
        let mut block_hash = [0u8; 32];
        let mut recipient = [0u8; 20];
        let mut nullifier = [0u8; 32];
        for (i, b) in block_hash.iter_mut().enumerate() {
            *b = e[BLOCK_HASH_OFFSET + i] as u8;
        }
        for (i, b) in recipient.iter_mut().enumerate() {
            *b = e[RECIPIENT_OFFSET + i] as u8;
        }
        for (i, b) in nullifier.iter_mut().enumerate() {
            *b = e[NULLIFIER_OFFSET + i] as u8;
        }

        let input = PublicInput {
            block_number: e[BLOCK_NUMBER_INDEX] as u64,
            chain_id: e[CHAIN_ID_INDEX] as u64,
            amount: e[AMOUNT_INDEX],
            recipient,
            nullifier,
        };
        (input, block_hash)
    }

    pub fn as_elements(&self) -> &[u128; PUBLIC_INPUTS_LEN] {
        &self.0
    }

    /// SHA-256 over every element as a 32-byte big-endian word.
    pub fn digest(&self) -> [u8; 32] {
        let mut h = Sha256::new();
        for v in self.0 {
            h.update(u128_to_bytes32(v));
        }
        h.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (PublicInput, [u8; 32]) {
        let input = PublicInput {
            block_number: 4_200_000,
            chain_id: 167013,
            amount: 1_000_000_000_000_000_000,
            recipient: core::array::from_fn(|i| i as u8 + 1),
            nullifier: core::array::from_fn(|i| 0xff - i as u8),
        };
        let block_hash = core::array::from_fn(|i| (i * 7) as u8);
        (input, block_hash)
    }

    #[test]
    fn layout_matches_index_table() {
        let (input, block_hash) = sample();
        let e = PublicInputs::encode(&input, &block_hash);
        let e = e.as_elements();
        assert_eq!(e.len(), 87);
        assert_eq!(e[0], 4_200_000);
        assert_eq!(e[1], block_hash[0] as u128);
        assert_eq!(e[32], block_hash[31] as u128);
        assert_eq!(e[33], 167013);
        assert_eq!(e[34], 1_000_000_000_000_000_000);
        assert_eq!(e[35], 1);
        assert_eq!(e[54], 20);
        assert_eq!(e[55], 0xff);
        assert_eq!(e[86], 0xff - 31);
    }

    #[test]
    fn decode_inverts_encode() {
        let (input, block_hash) = sample();
        let encoded = PublicInputs::encode(&input, &block_hash);
        assert_eq!(encoded.decode(), (input, block_hash));
        assert_eq!(PublicInputs::from_elements(encoded.as_elements()).unwrap(), encoded);
    }

    #[test]
    fn extra_elements_rejected() {
        let (input, block_hash) = sample();
        let mut elements = PublicInputs::encode(&input, &block_hash).as_elements().to_vec();
        // note index appended
        elements.push(0);
        assert_eq!(
            PublicInputs::from_elements(&elements),
            Err(ClaimValidationError::PublicInputShape)
        );
        elements.truncate(86);
        assert_eq!(
            PublicInputs::from_elements(&elements),
            Err(ClaimValidationError::PublicInputShape)
        );
    }

    #[test]
    fn out_of_range_byte_slot_rejected() {
        let (input, block_hash) = sample();
        let mut elements = PublicInputs::encode(&input, &block_hash).as_elements().to_vec();
        elements[60] = 256;
        assert_eq!(
            PublicInputs::from_elements(&elements),
            Err(ClaimValidationError::PublicInputShape)
        );
    }

    #[test]
    fn block_number_range() {
        let (mut input, _) = sample();
        input.block_number = MAX_BLOCK_NUMBER;
        assert!(input.check().is_ok());
        input.block_number += 1;
        assert_eq!(
            input.check(),
            Err(ClaimValidationError::MalformedInput(InputFault::BlockNumberRange))
        );
    }

    #[test]
    fn digest_covers_every_element() {
        let (input, block_hash) = sample();
        let a = PublicInputs::encode(&input, &block_hash);
        let mut words = alloc::vec::Vec::new();
        for v in a.as_elements() {
            words.extend_from_slice(&u128_to_bytes32(*v));
        }
        assert_eq!(a.digest(), crate::bytes::sha256(&words));

        let mut other = input;
        other.nullifier[31] ^= 1;
        assert_ne!(a.digest(), PublicInputs::encode(&other, &block_hash).digest());
    }
}
