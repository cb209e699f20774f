use thiserror::Error;

use crate::ports::MintError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("malformed claim: {0}")]
    MalformedInput(String),

    #[error("public inputs must be exactly 87 in-range elements")]
    PublicInputShape,

    #[error("chain id mismatch: settlement runs on {expected}, claim is for {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("nullifier already consumed: {0}")]
    NullifierAlreadyConsumed(String),

    #[error("a claim for nullifier {0} is already being settled")]
    ClaimInProgress(String),

    #[error("no checkpoint for block {0}")]
    CheckpointNotFound(u64),

    #[error("checkpointed block hash for block {0} does not match the proof")]
    StateRootMismatch(u64),

    #[error("proof verification failed")]
    ProofVerificationFailed,

    #[error("mint rejected: {0}")]
    MintRejected(#[from] MintError),
}

impl SettlementError {
    /// Terminal errors must not be retried with the same (secret, note index).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NullifierAlreadyConsumed(_) | Self::ProofVerificationFailed
        )
    }

    /// Shape errors are raised before any oracle or verifier call.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Self::MalformedInput(_) | Self::PublicInputShape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(SettlementError::ProofVerificationFailed.is_terminal());
        assert!(SettlementError::NullifierAlreadyConsumed("0x00".into()).is_terminal());
        assert!(!SettlementError::CheckpointNotFound(1).is_terminal());
        assert!(!SettlementError::StateRootMismatch(1).is_terminal());
        assert!(!SettlementError::ClaimInProgress("0x00".into()).is_terminal());
        assert!(!SettlementError::MintRejected(MintError::Rejected("paused".into())).is_terminal());
    }

    #[test]
    fn shape_classification() {
        assert!(SettlementError::PublicInputShape.is_shape_error());
        assert!(SettlementError::MalformedInput("x".into()).is_shape_error());
        assert!(!SettlementError::ChainIdMismatch { expected: 1, actual: 2 }.is_shape_error());
    }
}
