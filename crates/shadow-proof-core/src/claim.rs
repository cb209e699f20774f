//! The claim statement: everything a proof of a single note claim attests to.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::{
    bounded::BoundedBytes,
    bytes::copy_array,
    config::{ProtocolConfig, MAX_HEADER_BYTES},
    derive::{
        compute_notes_hash, compute_pow_digest, compute_recipient_hash, derive_nullifier,
        derive_target_address, pow_digest_is_valid, NoteSlots,
    },
    error::{ClaimValidationError, InputFault},
    header::verify_header,
    mpt::{verify_account_balance, AccountProof},
    public_inputs::{PublicInput, PublicInputs},
};

/// Witness for one note claim. The first five fields are public.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInput {
    pub block_number: u64,
    pub block_hash: [u8; 32],
    pub chain_id: u64,
    pub amount: u128,
    pub recipient: [u8; 20],

    pub note_index: u32,
    pub secret: [u8; 32],
    pub note_count: u32,
    pub amounts: Vec<u128>,
    pub recipient_hashes: Vec<[u8; 32]>,
    pub block_header_rlp: Vec<u8>,
    pub proof_depth: u32,
    pub proof_nodes: Vec<Vec<u8>>,
    pub proof_node_lengths: Vec<u32>,
}

/// Public output of a successful claim evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimJournal {
    pub block_number: u64,
    pub block_hash: [u8; 32],
    pub chain_id: u64,
    pub amount: u128,
    pub recipient: [u8; 20],
    pub nullifier: [u8; 32],
}

impl ClaimJournal {
    pub fn public_input(&self) -> PublicInput {
        PublicInput {
            block_number: self.block_number,
            chain_id: self.chain_id,
            amount: self.amount,
            recipient: self.recipient,
            nullifier: self.nullifier,
        }
    }

    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs::encode(&self.public_input(), &self.block_hash)
    }
}

pub fn evaluate_claim(
    config: &ProtocolConfig,
    input: &ClaimInput,
) -> Result<ClaimJournal, ClaimValidationError> {
    config.check()?;

    let note_count = input.note_count as usize;
    let note_index = input.note_index as usize;

    let slots = NoteSlots::from_parts(config, note_count, &input.amounts, &input.recipient_hashes)?;
    if note_index >= note_count {
        return Err(InputFault::NoteIndex.into());
    }
    if slots.amount(note_index) != Some(input.amount) {
        return Err(InputFault::SelectedAmountMismatch.into());
    }
    if slots.recipient_hash(note_index) != Some(&compute_recipient_hash(&input.recipient)) {
        return Err(InputFault::RecipientHashMismatch.into());
    }
    let total_amount = slots.check_amounts(config)?;

    let proof = AccountProof::from_parts(
        config,
        input.proof_depth,
        &input.proof_nodes,
        &input.proof_node_lengths,
    )?;
    if input.block_header_rlp.len() > config.max_header_bytes {
        return Err(InputFault::HeaderTooLarge.into());
    }
    let header_rlp = BoundedBytes::<MAX_HEADER_BYTES>::from_slice(&input.block_header_rlp)
        .ok_or(InputFault::HeaderTooLarge)?;

    let public = PublicInput {
        block_number: input.block_number,
        chain_id: input.chain_id,
        amount: input.amount,
        recipient: input.recipient,
        nullifier: [0u8; 32],
    };
    public.check()?;

    if !pow_digest_is_valid(config, &compute_pow_digest(&input.secret)) {
        return Err(ClaimValidationError::InvalidPowDigest);
    }

    let header = verify_header(config, header_rlp.as_slice(), &input.block_hash)?;
    if header.number != input.block_number {
        return Err(InputFault::BlockNumberMismatch.into());
    }

    let notes_hash = compute_notes_hash(&slots);
    let target_address = derive_target_address(&input.secret, input.chain_id, &notes_hash);
    verify_account_balance(&header.state_root, &target_address, &proof, total_amount)?;

    let nullifier = derive_nullifier(&input.secret, input.chain_id, input.note_index);

    Ok(ClaimJournal {
        block_number: input.block_number,
        block_hash: input.block_hash,
        chain_id: input.chain_id,
        amount: input.amount,
        recipient: input.recipient,
        nullifier,
    })
}

pub const PACKED_JOURNAL_LEN: usize = 116;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedJournalError {
    pub expected: usize,
    pub actual: usize,
}

impl PackedJournalError {
    pub const fn invalid_length(actual: usize) -> Self {
        Self {
            expected: PACKED_JOURNAL_LEN,
            actual,
        }
    }
}

impl core::fmt::Display for PackedJournalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "invalid packed journal length: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

pub fn pack_journal(journal: &ClaimJournal) -> [u8; PACKED_JOURNAL_LEN] {
    let mut out = [0u8; PACKED_JOURNAL_LEN];

    out[0..8].copy_from_slice(&journal.block_number.to_le_bytes());
    out[8..40].copy_from_slice(&journal.block_hash);
    out[40..48].copy_from_slice(&journal.chain_id.to_le_bytes());
    out[48..64].copy_from_slice(&journal.amount.to_le_bytes());
    out[64..84].copy_from_slice(&journal.recipient);
    out[84..116].copy_from_slice(&journal.nullifier);

    out
}

pub fn unpack_journal(bytes: &[u8]) -> Result<ClaimJournal, PackedJournalError> {
    if bytes.len() != PACKED_JOURNAL_LEN {
        return Err(PackedJournalError::invalid_length(bytes.len()));
    }

    Ok(ClaimJournal {
        block_number: u64::from_le_bytes(copy_array::<8>(&bytes[0..8])),
        block_hash: copy_array::<32>(&bytes[8..40]),
        chain_id: u64::from_le_bytes(copy_array::<8>(&bytes[40..48])),
        amount: u128::from_le_bytes(copy_array::<16>(&bytes[48..64])),
        recipient: copy_array::<20>(&bytes[64..84]),
        nullifier: copy_array::<32>(&bytes[84..116]),
    })
}
