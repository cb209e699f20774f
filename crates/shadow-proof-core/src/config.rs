use crate::error::{ClaimValidationError, InputFault};

/// Compiled slot capacity for notes. Every notes hash covers exactly this many slots.
pub const MAX_NOTES: usize = 5;
/// Compiled capacity for account proof nodes.
pub const MAX_PROOF_DEPTH: usize = 64;
/// Compiled capacity for a single account proof node.
pub const MAX_NODE_BYTES: usize = 4096;
/// Compiled capacity for an RLP block header.
pub const MAX_HEADER_BYTES: usize = 1024;

const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// Versioned protocol parameters, passed explicitly to derivation and verification.
///
/// The claim statement and the deposit tooling declare different total caps; both
/// presets are kept so that each ceiling is enforced where it is declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub version: u32,
    pub max_notes: usize,
    pub max_total_wei: u128,
    /// Number of trailing zero bytes a pow digest must have.
    pub pow_zero_bytes: usize,
    pub max_proof_depth: usize,
    pub max_node_bytes: usize,
    pub max_header_bytes: usize,
}

impl ProtocolConfig {
    /// Parameters enforced by claim evaluation (32 ETH ceiling).
    pub const CLAIM_V1: Self = Self {
        version: 1,
        max_notes: MAX_NOTES,
        max_total_wei: 32 * ONE_ETHER,
        pow_zero_bytes: 3,
        max_proof_depth: MAX_PROOF_DEPTH,
        max_node_bytes: MAX_NODE_BYTES,
        max_header_bytes: MAX_HEADER_BYTES,
    };

    /// Parameters enforced by deposit creation and deposit-file validation (8 ETH ceiling).
    pub const DEPOSIT_V1: Self = Self {
        max_total_wei: 8 * ONE_ETHER,
        ..Self::CLAIM_V1
    };

    pub const fn check(&self) -> Result<(), ClaimValidationError> {
        if self.max_notes == 0
            || self.max_notes > MAX_NOTES
            || self.pow_zero_bytes > 32
            || self.max_proof_depth == 0
            || self.max_proof_depth > MAX_PROOF_DEPTH
            || self.max_node_bytes > MAX_NODE_BYTES
            || self.max_header_bytes > MAX_HEADER_BYTES
        {
            return Err(ClaimValidationError::MalformedInput(InputFault::InvalidConfig));
        }
        Ok(())
    }
}
