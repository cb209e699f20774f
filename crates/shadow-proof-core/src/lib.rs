#![no_std]

//! Shadow claim statement: commitment derivation, header and account-proof
//! verification, public-input binding and the packed journal.
//!
//! Everything here is pure and allocation-bounded so the same code runs in a zkVM
//! guest and in the off-chain witness builder.

extern crate alloc;

pub mod bounded;
pub mod bytes;
pub mod claim;
pub mod config;
pub mod derive;
pub mod error;
pub mod header;
pub mod mpt;
pub mod public_inputs;
pub mod rlp;

pub use claim::{
    evaluate_claim, pack_journal, unpack_journal, ClaimInput, ClaimJournal, PackedJournalError,
    PACKED_JOURNAL_LEN,
};
pub use config::{ProtocolConfig, MAX_HEADER_BYTES, MAX_NODE_BYTES, MAX_NOTES, MAX_PROOF_DEPTH};
pub use derive::{
    compute_notes_hash, compute_pow_digest, compute_recipient_hash, derive_nullifier,
    derive_target_address, find_valid_secret, pow_digest_is_valid, Domain, Note, NoteSlots,
    PowSolution,
};
pub use error::{ClaimValidationError, InputFault, ProofFault};
pub use header::{verify_header, BlockHeader, HeaderFields};
pub use mpt::{verify_account_balance, verify_account_proof, Account, AccountProof};
pub use public_inputs::{PublicInput, PublicInputs, PUBLIC_INPUTS_LEN};
