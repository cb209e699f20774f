//! Collaborators the settlement layer delegates to.
//!
//! Implementations:
//! - in-memory adapters in [`crate::memory`] for tests and demos
//! - chain-backed adapters live with the deployment, outside this crate

use shadow_proof_core::PublicInputs;
use thiserror::Error;

/// Canonical block hashes keyed by block number.
///
/// The settlement layer trusts the oracle's finality and does no checks of its own.
pub trait CheckpointOracle: Send + Sync {
    fn block_hash(&self, block_number: u64) -> Option<[u8; 32]>;
}

/// Opaque proof-system verifier.
pub trait ProofVerifier: Send + Sync {
    /// Whether `seal` proves the claim statement identified by `image_id` for `public_inputs`.
    fn verify(&self, seal: &[u8], image_id: &[u8; 32], public_inputs: &PublicInputs) -> bool;
}

/// One transfer out of the issuance sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub recipient: [u8; 20],
    pub amount: u128,
}

/// Value issuance. Only the settlement component calls this.
pub trait IssuanceSink: Send + Sync {
    /// Mint every payout or none of them.
    fn mint_batch(&self, payouts: &[Payout]) -> Result<(), MintError>;

    fn mint(&self, recipient: [u8; 20], amount: u128) -> Result<(), MintError> {
        self.mint_batch(&[Payout { recipient, amount }])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MintError {
    #[error("issuance rejected: {0}")]
    Rejected(String),

    #[error("balance overflow for {0}")]
    Overflow(String),
}
