//! The claim state machine.

use shadow_proof_core::{bytes::encode_hex, unpack_journal, PublicInput, PublicInputs};
use tracing::{info, warn};

use crate::{
    error::SettlementError,
    ledger::{ConsumedRecord, NullifierLedger},
    ports::{CheckpointOracle, IssuanceSink, Payout, ProofVerifier},
};

/// Claims pay `amount / FEE_DIVISOR` to the fee collector.
pub const FEE_DIVISOR: u128 = 1000;

/// Returns `(net, fee)`.
pub fn split_fee(amount: u128) -> (u128, u128) {
    let fee = amount / FEE_DIVISOR;
    (amount - fee, fee)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    pub chain_id: u64,
    /// Identifies the claim statement to the verifier.
    pub image_id: [u8; 32],
    pub fee_collector: [u8; 20],
}

/// A submitted proof: the opaque seal and the packed journal it commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimProof {
    pub seal: Vec<u8>,
    pub journal: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub nullifier: [u8; 32],
    pub recipient: [u8; 20],
    pub net: u128,
    pub fee: u128,
    pub fee_collector: [u8; 20],
}

pub struct Settlement<O, V, M> {
    config: SettlementConfig,
    oracle: O,
    verifier: V,
    issuance: M,
    ledger: NullifierLedger,
}

impl<O, V, M> Settlement<O, V, M>
where
    O: CheckpointOracle,
    V: ProofVerifier,
    M: IssuanceSink,
{
    pub fn new(config: SettlementConfig, oracle: O, verifier: V, issuance: M) -> Self {
        Self {
            config,
            oracle,
            verifier,
            issuance,
            ledger: NullifierLedger::new(),
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn issuance(&self) -> &M {
        &self.issuance
    }

    pub fn ledger(&self) -> &NullifierLedger {
        &self.ledger
    }

    pub fn is_consumed(&self, nullifier: &[u8; 32]) -> bool {
        self.ledger.is_consumed(nullifier)
    }

    /// Settle one note claim.
    ///
    /// On error nothing is consumed and nothing is minted.
    pub fn claim(
        &self,
        proof: &ClaimProof,
        input: &PublicInput,
    ) -> Result<ClaimReceipt, SettlementError> {
        let result = self.settle(proof, input, None);
        self.log_outcome(input, &result);
        result
    }

    /// Settle a claim given as the flattened 87-element array.
    ///
    /// The array's block hash slots must agree with the checkpoint as well.
    pub fn claim_elements(
        &self,
        proof: &ClaimProof,
        elements: &[u128],
    ) -> Result<ClaimReceipt, SettlementError> {
        let public_inputs = match PublicInputs::from_elements(elements) {
            Ok(p) => p,
            Err(_) => {
                warn!(elements = elements.len(), "claim rejected: public input shape");
                return Err(SettlementError::PublicInputShape);
            }
        };
        let (input, block_hash) = public_inputs.decode();
        let result = self.settle(proof, &input, Some(block_hash));
        self.log_outcome(&input, &result);
        result
    }

    fn log_outcome(&self, input: &PublicInput, result: &Result<ClaimReceipt, SettlementError>) {
        match result {
            Ok(receipt) => info!(
                nullifier = %encode_hex(&receipt.nullifier),
                recipient = %encode_hex(&receipt.recipient),
                block_number = input.block_number,
                net = %receipt.net,
                fee = %receipt.fee,
                "claim settled"
            ),
            Err(err) => warn!(
                nullifier = %encode_hex(&input.nullifier),
                block_number = input.block_number,
                terminal = err.is_terminal(),
                error = %err,
                "claim rejected"
            ),
        }
    }

    /// Only the pure shape checks run before the replay check, so a consumed
    /// nullifier always reports `NullifierAlreadyConsumed`.
    fn settle(
        &self,
        proof: &ClaimProof,
        input: &PublicInput,
        claimed_block_hash: Option<[u8; 32]>,
    ) -> Result<ClaimReceipt, SettlementError> {
        input
            .check()
            .map_err(|e| SettlementError::MalformedInput(e.as_str().to_string()))?;
        if input.amount == 0 {
            return Err(SettlementError::MalformedInput("claim amount is zero".to_string()));
        }

        // The ledger re-checks when consuming.
        if self.ledger.is_consumed(&input.nullifier) {
            return Err(SettlementError::NullifierAlreadyConsumed(encode_hex(&input.nullifier)));
        }

        if input.chain_id != self.config.chain_id {
            return Err(SettlementError::ChainIdMismatch {
                expected: self.config.chain_id,
                actual: input.chain_id,
            });
        }

        let block_hash = self
            .oracle
            .block_hash(input.block_number)
            .ok_or(SettlementError::CheckpointNotFound(input.block_number))?;
        if claimed_block_hash.is_some_and(|claimed| claimed != block_hash) {
            return Err(SettlementError::StateRootMismatch(input.block_number));
        }

        let journal = unpack_journal(&proof.journal)
            .map_err(|e| SettlementError::MalformedInput(e.to_string()))?;
        if journal.block_hash != block_hash {
            return Err(SettlementError::StateRootMismatch(input.block_number));
        }
        if journal.public_input() != *input {
            return Err(SettlementError::ProofVerificationFailed);
        }

        let public_inputs = PublicInputs::encode(input, &block_hash);
        if !self
            .verifier
            .verify(&proof.seal, &self.config.image_id, &public_inputs)
        {
            return Err(SettlementError::ProofVerificationFailed);
        }

        let (net, fee) = split_fee(input.amount);
        let payouts: Vec<Payout> = [
            Payout {
                recipient: input.recipient,
                amount: net,
            },
            Payout {
                recipient: self.config.fee_collector,
                amount: fee,
            },
        ]
        .into_iter()
        .filter(|p| p.amount > 0)
        .collect();

        let record = ConsumedRecord {
            block_number: input.block_number,
            recipient: input.recipient,
            amount: input.amount,
        };
        self.ledger.consume_with(input.nullifier, record, || {
            self.issuance.mint_batch(&payouts)?;
            Ok(())
        })?;

        Ok(ClaimReceipt {
            nullifier: input.nullifier,
            recipient: input.recipient,
            net,
            fee,
            fee_collector: self.config.fee_collector,
        })
    }
}
