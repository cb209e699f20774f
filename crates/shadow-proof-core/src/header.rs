//! Block header codec and header-to-block-hash binding.

use alloc::vec::Vec;

use crate::{
    bytes::{copy_array, keccak256},
    config::ProtocolConfig,
    error::{ClaimValidationError, InputFault, ProofFault},
    rlp::{self, RlpField},
};

const LEGACY_FIELD_COUNT: usize = 15;
const MAX_FIELD_COUNT: usize = 21;

/// An Ethereum block header. Fork-specific trailing fields are encoded only when present,
/// in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub parent_hash: [u8; 32],
    pub ommers_hash: [u8; 32],
    pub beneficiary: [u8; 20],
    pub state_root: [u8; 32],
    pub transactions_root: [u8; 32],
    pub receipts_root: [u8; 32],
    pub logs_bloom: Vec<u8>,
    pub difficulty: u128,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    pub mix_hash: [u8; 32],
    pub nonce: [u8; 8],
    pub base_fee_per_gas: Option<u128>,
    pub withdrawals_root: Option<[u8; 32]>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<[u8; 32]>,
    pub requests_hash: Option<[u8; 32]>,
}

/// The header values the account verifier needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderFields {
    pub number: u64,
    pub state_root: [u8; 32],
}

impl BlockHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut fields = Vec::with_capacity(MAX_FIELD_COUNT);
        fields.push(rlp::encode_bytes(&self.parent_hash));
        fields.push(rlp::encode_bytes(&self.ommers_hash));
        fields.push(rlp::encode_bytes(&self.beneficiary));
        fields.push(rlp::encode_bytes(&self.state_root));
        fields.push(rlp::encode_bytes(&self.transactions_root));
        fields.push(rlp::encode_bytes(&self.receipts_root));
        fields.push(rlp::encode_bytes(&self.logs_bloom));
        fields.push(rlp::encode_uint(self.difficulty));
        fields.push(rlp::encode_uint(self.number as u128));
        fields.push(rlp::encode_uint(self.gas_limit as u128));
        fields.push(rlp::encode_uint(self.gas_used as u128));
        fields.push(rlp::encode_uint(self.timestamp as u128));
        fields.push(rlp::encode_bytes(&self.extra_data));
        fields.push(rlp::encode_bytes(&self.mix_hash));
        fields.push(rlp::encode_bytes(&self.nonce));

        if let Some(fee) = self.base_fee_per_gas {
            fields.push(rlp::encode_uint(fee));
        }
        if let Some(root) = self.withdrawals_root {
            fields.push(rlp::encode_bytes(&root));
        }
        if let Some(used) = self.blob_gas_used {
            fields.push(rlp::encode_uint(used as u128));
        }
        if let Some(excess) = self.excess_blob_gas {
            fields.push(rlp::encode_uint(excess as u128));
        }
        if let Some(root) = self.parent_beacon_block_root {
            fields.push(rlp::encode_bytes(&root));
        }
        if let Some(hash) = self.requests_hash {
            fields.push(rlp::encode_bytes(&hash));
        }

        rlp::encode_list(&fields)
    }

    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.encode())
    }

    pub fn fields(&self) -> HeaderFields {
        HeaderFields {
            number: self.number,
            state_root: self.state_root,
        }
    }

    pub fn decode(encoded: &[u8]) -> Result<Self, ClaimValidationError> {
        let fields = rlp::decode_list(encoded).map_err(|_| ProofFault::HeaderEncoding)?;
        if fields.len() < LEGACY_FIELD_COUNT || fields.len() > MAX_FIELD_COUNT {
            return Err(ProofFault::HeaderEncoding.into());
        }
        let opt = |i: usize| fields.get(i);

        Ok(Self {
            parent_hash: fixed(&fields[0])?,
            ommers_hash: fixed(&fields[1])?,
            beneficiary: fixed(&fields[2])?,
            state_root: fixed(&fields[3])?,
            transactions_root: fixed(&fields[4])?,
            receipts_root: fixed(&fields[5])?,
            logs_bloom: fixed::<256>(&fields[6])?.to_vec(),
            difficulty: uint(&fields[7], 16)?,
            number: uint(&fields[8], 8)? as u64,
            gas_limit: uint(&fields[9], 8)? as u64,
            gas_used: uint(&fields[10], 8)? as u64,
            timestamp: uint(&fields[11], 8)? as u64,
            extra_data: string(&fields[12])?.to_vec(),
            mix_hash: fixed(&fields[13])?,
            nonce: fixed(&fields[14])?,
            base_fee_per_gas: opt(15).map(|f| uint(f, 16)).transpose()?,
            withdrawals_root: opt(16).map(|f| fixed::<32>(f)).transpose()?,
            blob_gas_used: opt(17).map(|f| uint(f, 8).map(|v| v as u64)).transpose()?,
            excess_blob_gas: opt(18).map(|f| uint(f, 8).map(|v| v as u64)).transpose()?,
            parent_beacon_block_root: opt(19).map(|f| fixed::<32>(f)).transpose()?,
            requests_hash: opt(20).map(|f| fixed::<32>(f)).transpose()?,
        })
    }
}

fn string<'a>(field: &RlpField<'a>) -> Result<&'a [u8], ClaimValidationError> {
    if field.is_list {
        return Err(ProofFault::HeaderEncoding.into());
    }
    Ok(field.payload)
}

fn fixed<const N: usize>(field: &RlpField<'_>) -> Result<[u8; N], ClaimValidationError> {
    let payload = string(field)?;
    if payload.len() != N {
        return Err(ProofFault::HeaderEncoding.into());
    }
    Ok(copy_array::<N>(payload))
}

fn uint(field: &RlpField<'_>, max_width: usize) -> Result<u128, ClaimValidationError> {
    let payload = string(field)?;
    if payload.len() > max_width || payload.first() == Some(&0) {
        return Err(ProofFault::HeaderEncoding.into());
    }
    let mut buf = [0u8; 16];
    buf[16 - payload.len()..].copy_from_slice(payload);
    Ok(u128::from_be_bytes(buf))
}

/// Checks that raw header bytes hash to `expected_hash` and extracts the state root
/// and block number.
pub fn verify_header(
    config: &ProtocolConfig,
    header_rlp: &[u8],
    expected_hash: &[u8; 32],
) -> Result<HeaderFields, ClaimValidationError> {
    if header_rlp.len() > config.max_header_bytes {
        return Err(InputFault::HeaderTooLarge.into());
    }
    if keccak256(header_rlp) != *expected_hash {
        return Err(ClaimValidationError::BlockHashMismatch);
    }
    Ok(BlockHeader::decode(header_rlp)?.fields())
}

/// Structured counterpart of [`verify_header`].
pub fn verify_header_binding(
    header: &BlockHeader,
    expected_hash: &[u8; 32],
) -> Result<HeaderFields, ClaimValidationError> {
    if header.hash() != *expected_hash {
        return Err(ClaimValidationError::BlockHashMismatch);
    }
    Ok(header.fields())
}
