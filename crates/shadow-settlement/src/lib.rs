//! Claim settlement: the stateful side of the protocol.
//!
//! A claim is checked against a checkpoint oracle and a proof verifier, then the
//! note's nullifier is consumed and the payout minted as one atomic step. The
//! collaborators are traits in [`ports`]; [`memory`] has in-process adapters.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod ports;
pub mod settlement;

pub use error::SettlementError;
pub use ledger::{ConsumedRecord, NullifierLedger};
pub use memory::{InMemoryCheckpoints, InMemoryIssuance, InMemoryVerifier};
pub use ports::{CheckpointOracle, IssuanceSink, MintError, Payout, ProofVerifier};
pub use settlement::{split_fee, ClaimProof, ClaimReceipt, Settlement, SettlementConfig, FEE_DIVISOR};
