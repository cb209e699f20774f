//! Append-only nullifier ledger.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use shadow_proof_core::bytes::encode_hex;

use crate::error::SettlementError;

/// What a consumed nullifier paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub block_number: u64,
    pub recipient: [u8; 20],
    pub amount: u128,
}

#[derive(Debug, Default)]
struct LedgerState {
    consumed: HashMap<[u8; 32], ConsumedRecord>,
    /// Nullifiers whose side effects are running right now.
    pending: HashSet<[u8; 32]>,
}

/// Nullifiers move from unclaimed to consumed exactly once. There is no removal.
///
/// Exclusion is per nullifier: claims on different nullifiers settle concurrently.
#[derive(Debug, Default)]
pub struct NullifierLedger {
    state: Mutex<LedgerState>,
}

impl NullifierLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_consumed(&self, nullifier: &[u8; 32]) -> bool {
        self.lock().consumed.contains_key(nullifier)
    }

    pub fn record(&self, nullifier: &[u8; 32]) -> Option<ConsumedRecord> {
        self.lock().consumed.get(nullifier).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().consumed.is_empty()
    }

    /// Consume `nullifier` if `f` succeeds.
    ///
    /// The nullifier is reserved while `f` runs, so two claims of it cannot both
    /// reach their side effects; the second gets `ClaimInProgress`. If `f` fails
    /// (or panics) the reservation is dropped and the ledger is left untouched.
    pub fn consume_with<T>(
        &self,
        nullifier: [u8; 32],
        record: ConsumedRecord,
        f: impl FnOnce() -> Result<T, SettlementError>,
    ) -> Result<T, SettlementError> {
        let mut reservation = self.reserve(nullifier)?;
        let out = f()?;
        reservation.commit = Some(record);
        Ok(out)
    }

    fn reserve(&self, nullifier: [u8; 32]) -> Result<Reservation<'_>, SettlementError> {
        let mut state = self.lock();
        if state.consumed.contains_key(&nullifier) {
            return Err(SettlementError::NullifierAlreadyConsumed(encode_hex(&nullifier)));
        }
        if !state.pending.insert(nullifier) {
            return Err(SettlementError::ClaimInProgress(encode_hex(&nullifier)));
        }
        Ok(Reservation {
            ledger: self,
            nullifier,
            commit: None,
        })
    }

    // Every critical section is a plain map update, so a poisoned lock still
    // guards consistent state.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A pending nullifier. Dropping it releases the nullifier, consuming it if committed.
struct Reservation<'a> {
    ledger: &'a NullifierLedger,
    nullifier: [u8; 32],
    commit: Option<ConsumedRecord>,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut state = self.ledger.lock();
        state.pending.remove(&self.nullifier);
        if let Some(record) = self.commit.take() {
            state.consumed.insert(self.nullifier, record);
        }
    }
}
