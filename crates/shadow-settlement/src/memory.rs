//! In-process adapters for the settlement ports.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, PoisonError, RwLock,
    },
};

use shadow_proof_core::{bytes::encode_hex, PublicInputs};

use crate::ports::{CheckpointOracle, IssuanceSink, MintError, Payout, ProofVerifier};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Block hashes registered by hand.
#[derive(Debug, Default)]
pub struct InMemoryCheckpoints {
    hashes: RwLock<HashMap<u64, [u8; 32]>>,
}

impl InMemoryCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, block_number: u64, block_hash: [u8; 32]) {
        self.hashes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(block_number, block_hash);
    }
}

impl FromIterator<(u64, [u8; 32])> for InMemoryCheckpoints {
    fn from_iter<I: IntoIterator<Item = (u64, [u8; 32])>>(iter: I) -> Self {
        Self {
            hashes: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl CheckpointOracle for InMemoryCheckpoints {
    fn block_hash(&self, block_number: u64) -> Option<[u8; 32]> {
        self.hashes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&block_number)
            .copied()
    }
}

/// Accepts a seal only for statements approved beforehand.
///
/// Stands in for a real verifier: tests approve the public inputs a proof was
/// produced for, and any other statement fails.
#[derive(Debug, Default)]
pub struct InMemoryVerifier {
    approved: Mutex<HashSet<([u8; 32], [u8; 32])>>,
}

impl InMemoryVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approve(&self, image_id: [u8; 32], public_inputs: &PublicInputs) {
        lock(&self.approved).insert((image_id, public_inputs.digest()));
    }
}

impl ProofVerifier for InMemoryVerifier {
    fn verify(&self, seal: &[u8], image_id: &[u8; 32], public_inputs: &PublicInputs) -> bool {
        !seal.is_empty() && lock(&self.approved).contains(&(*image_id, public_inputs.digest()))
    }
}

/// Balance book with a switch that makes every mint fail.
#[derive(Debug, Default)]
pub struct InMemoryIssuance {
    balances: Mutex<HashMap<[u8; 20], u128>>,
    mints: Mutex<Vec<Payout>>,
    rejecting: AtomicBool,
}

impl InMemoryIssuance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &[u8; 20]) -> u128 {
        lock(&self.balances).get(account).copied().unwrap_or(0)
    }

    /// Every payout minted so far, in order.
    pub fn mints(&self) -> Vec<Payout> {
        lock(&self.mints).clone()
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }
}

impl IssuanceSink for InMemoryIssuance {
    fn mint_batch(&self, payouts: &[Payout]) -> Result<(), MintError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(MintError::Rejected("issuance is paused".to_string()));
        }

        let mut balances = lock(&self.balances);
        let mut staged: HashMap<[u8; 20], u128> = HashMap::new();
        for payout in payouts {
            let current = match staged.get(&payout.recipient) {
                Some(v) => *v,
                None => balances.get(&payout.recipient).copied().unwrap_or(0),
            };
            let next = current
                .checked_add(payout.amount)
                .ok_or_else(|| MintError::Overflow(encode_hex(&payout.recipient)))?;
            staged.insert(payout.recipient, next);
        }

        balances.extend(staged);
        lock(&self.mints).extend_from_slice(payouts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_proof_core::PublicInput;

    fn inputs(amount: u128) -> PublicInputs {
        PublicInputs::encode(
            &PublicInput {
                block_number: 1,
                chain_id: 167013,
                amount,
                recipient: [0x11; 20],
                nullifier: [0x22; 32],
            },
            &[0x33; 32],
        )
    }

    #[test]
    fn checkpoints_lookup() {
        let oracle: InMemoryCheckpoints = [(5, [0xaa; 32])].into_iter().collect();
        assert_eq!(oracle.block_hash(5), Some([0xaa; 32]));
        assert_eq!(oracle.block_hash(6), None);
        oracle.insert(6, [0xbb; 32]);
        assert_eq!(oracle.block_hash(6), Some([0xbb; 32]));
    }

    #[test]
    fn verifier_accepts_only_approved_statements() {
        let verifier = InMemoryVerifier::new();
        verifier.approve([1; 32], &inputs(10));
        assert!(verifier.verify(b"seal", &[1; 32], &inputs(10)));
        assert!(!verifier.verify(b"seal", &[2; 32], &inputs(10)));
        assert!(!verifier.verify(b"seal", &[1; 32], &inputs(11)));
        assert!(!verifier.verify(b"", &[1; 32], &inputs(10)));
    }

    #[test]
    fn batch_mint_is_all_or_nothing() {
        let sink = InMemoryIssuance::new();
        sink.mint([0x11; 20], u128::MAX - 1).unwrap();

        let err = sink
            .mint_batch(&[
                Payout { recipient: [0x22; 20], amount: 5 },
                Payout { recipient: [0x11; 20], amount: 2 },
            ])
            .unwrap_err();
        assert!(matches!(err, MintError::Overflow(_)));
        assert_eq!(sink.balance_of(&[0x22; 20]), 0);
        assert_eq!(sink.mints().len(), 1);

        sink.set_rejecting(true);
        assert!(sink.mint([0x22; 20], 1).is_err());
        sink.set_rejecting(false);
        sink.mint([0x22; 20], 1).unwrap();
        assert_eq!(sink.balance_of(&[0x22; 20]), 1);
    }
}
