//! Commitment and derivation engine: recipient hashes, notes hash, target address,
//! nullifiers and the proof-of-work gate.

use serde::{Deserialize, Serialize};

use crate::{
    bytes::{pad_label, sha256, u128_to_bytes32, u64_to_bytes32},
    config::{ProtocolConfig, MAX_NOTES},
    error::{ClaimValidationError, InputFault},
};

/// Domain-separation labels. Every hash in the protocol is prefixed with exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    Recipient,
    Address,
    Nullifier,
    Pow,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Self::Recipient, Self::Address, Self::Nullifier, Self::Pow];

    pub const fn label(self) -> &'static [u8] {
        match self {
            Self::Recipient => b"shadow.recipient.v1",
            Self::Address => b"shadow.address.v1",
            Self::Nullifier => b"shadow.nullifier.v1",
            Self::Pow => b"shadow.pow.v1",
        }
    }

    pub fn padded(self) -> [u8; 32] {
        pad_label(self.label())
    }
}

/// A single note. Labels are not part of any hash and live only in deposit files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub recipient: [u8; 20],
    pub amount: u128,
}

/// Fixed-capacity note slots. Slots at or past `count` are always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteSlots {
    count: usize,
    amounts: [u128; MAX_NOTES],
    recipient_hashes: [[u8; 32]; MAX_NOTES],
}

impl NoteSlots {
    pub fn from_notes(config: &ProtocolConfig, notes: &[Note]) -> Result<Self, ClaimValidationError> {
        check_note_count(config, notes.len())?;
        let mut slots = Self::empty(notes.len());
        for (i, note) in notes.iter().enumerate() {
            slots.amounts[i] = note.amount;
            slots.recipient_hashes[i] = compute_recipient_hash(&note.recipient);
        }
        Ok(slots)
    }

    /// Builds slots from parallel arrays, ignoring anything past `count`.
    pub fn from_parts(
        config: &ProtocolConfig,
        count: usize,
        amounts: &[u128],
        recipient_hashes: &[[u8; 32]],
    ) -> Result<Self, ClaimValidationError> {
        check_note_count(config, count)?;
        if amounts.len() < count || recipient_hashes.len() < count {
            return Err(InputFault::ArrayShape.into());
        }
        let mut slots = Self::empty(count);
        slots.amounts[..count].copy_from_slice(&amounts[..count]);
        slots.recipient_hashes[..count].copy_from_slice(&recipient_hashes[..count]);
        Ok(slots)
    }

    fn empty(count: usize) -> Self {
        Self {
            count,
            amounts: [0; MAX_NOTES],
            recipient_hashes: [[0; 32]; MAX_NOTES],
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn amount(&self, index: usize) -> Option<u128> {
        (index < self.count).then(|| self.amounts[index])
    }

    pub fn recipient_hash(&self, index: usize) -> Option<&[u8; 32]> {
        (index < self.count).then(|| &self.recipient_hashes[index])
    }

    /// Checked sum of the active amounts.
    pub fn total(&self) -> Option<u128> {
        self.amounts[..self.count]
            .iter()
            .try_fold(0u128, |acc, amt| acc.checked_add(*amt))
    }

    /// Every active amount is non-zero and the total is within the configured cap.
    pub fn check_amounts(&self, config: &ProtocolConfig) -> Result<u128, ClaimValidationError> {
        if self.amounts[..self.count].iter().any(|amt| *amt == 0) {
            return Err(InputFault::ZeroAmount.into());
        }
        match self.total() {
            Some(total) if total <= config.max_total_wei => Ok(total),
            _ => Err(InputFault::TotalAmountExceeded.into()),
        }
    }
}

fn check_note_count(config: &ProtocolConfig, count: usize) -> Result<(), ClaimValidationError> {
    if count == 0 || count > config.max_notes {
        return Err(InputFault::NoteCount.into());
    }
    Ok(())
}

pub fn compute_recipient_hash(recipient: &[u8; 20]) -> [u8; 32] {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(&Domain::Recipient.padded());
    input[44..].copy_from_slice(recipient);
    sha256(&input)
}

/// SHA-256 over all `MAX_NOTES` slots of `amount || recipientHash`, inactive slots zeroed.
pub fn compute_notes_hash(slots: &NoteSlots) -> [u8; 32] {
    let mut buf = [0u8; MAX_NOTES * 64];
    for i in 0..MAX_NOTES {
        let start = i * 64;
        buf[start..start + 32].copy_from_slice(&u128_to_bytes32(slots.amounts[i]));
        buf[start + 32..start + 64].copy_from_slice(&slots.recipient_hashes[i]);
    }
    sha256(&buf)
}

pub fn derive_target_address(secret: &[u8; 32], chain_id: u64, notes_hash: &[u8; 32]) -> [u8; 20] {
    let hash = domain_hash(Domain::Address, chain_id, secret, notes_hash);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..32]);
    out
}

pub fn derive_nullifier(secret: &[u8; 32], chain_id: u64, note_index: u32) -> [u8; 32] {
    domain_hash(
        Domain::Nullifier,
        chain_id,
        secret,
        &u64_to_bytes32(note_index as u64),
    )
}

fn domain_hash(domain: Domain, chain_id: u64, secret: &[u8; 32], tail: &[u8; 32]) -> [u8; 32] {
    let mut input = [0u8; 128];
    input[..32].copy_from_slice(&domain.padded());
    input[32..64].copy_from_slice(&u64_to_bytes32(chain_id));
    input[64..96].copy_from_slice(secret);
    input[96..128].copy_from_slice(tail);
    sha256(&input)
}

pub fn compute_pow_digest(secret: &[u8; 32]) -> [u8; 32] {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(&Domain::Pow.padded());
    input[32..64].copy_from_slice(secret);
    sha256(&input)
}

pub fn pow_digest_is_valid(config: &ProtocolConfig, digest: &[u8; 32]) -> bool {
    let zeros = core::cmp::min(config.pow_zero_bytes, 32);
    digest[32 - zeros..].iter().all(|b| *b == 0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowSolution {
    pub secret: [u8; 32],
    pub digest: [u8; 32],
    /// Number of candidates tried, including the successful one.
    pub attempts: u64,
}

/// Linear search for a secret whose pow digest meets the target.
///
/// Candidate `k` is `sha256(seed_material)` with bytes `24..32` XORed with `k` as a
/// big-endian `u64`.
pub fn find_valid_secret(
    config: &ProtocolConfig,
    seed_material: &[u8],
    max_attempts: u64,
) -> Result<PowSolution, ClaimValidationError> {
    let base = sha256(seed_material);

    for attempt in 0..max_attempts {
        let mut candidate = base;
        for (slot, counter) in candidate[24..].iter_mut().zip(attempt.to_be_bytes()) {
            *slot ^= counter;
        }
        let digest = compute_pow_digest(&candidate);
        if pow_digest_is_valid(config, &digest) {
            return Ok(PowSolution {
                secret: candidate,
                digest,
                attempts: attempt + 1,
            });
        }
    }

    Err(ClaimValidationError::PowNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 32] = [0x8c; 32];
    const CHAIN_ID: u64 = 167013;

    fn note(byte: u8, amount: u128) -> Note {
        Note {
            recipient: [byte; 20],
            amount,
        }
    }

    #[test]
    fn labels_are_distinct_and_padded() {
        for (i, a) in Domain::ALL.iter().enumerate() {
            for b in Domain::ALL.iter().skip(i + 1) {
                assert_ne!(a.padded(), b.padded());
            }
            let padded = a.padded();
            assert_eq!(&padded[..a.label().len()], a.label());
            assert!(padded[a.label().len()..].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn swapped_labels_are_incompatible() {
        let index_word = u64_to_bytes32(0);
        let nullifier = derive_nullifier(&SECRET, CHAIN_ID, 0);
        let with_address_label = domain_hash(Domain::Address, CHAIN_ID, &SECRET, &index_word);
        assert_ne!(nullifier, with_address_label);

        let notes_hash = [0x42; 32];
        let target = derive_target_address(&SECRET, CHAIN_ID, &notes_hash);
        let with_nullifier_label = domain_hash(Domain::Nullifier, CHAIN_ID, &SECRET, &notes_hash);
        assert_ne!(&target[..], &with_nullifier_label[12..]);
    }

    #[test]
    fn recipient_hash_left_pads_address() {
        let recipient = [0x11; 20];
        let mut expected_input = [0u8; 64];
        expected_input[..19].copy_from_slice(b"shadow.recipient.v1");
        expected_input[44..].copy_from_slice(&recipient);
        assert_eq!(compute_recipient_hash(&recipient), sha256(&expected_input));
    }

    #[test]
    fn derivations_are_deterministic() {
        let slots = NoteSlots::from_notes(&ProtocolConfig::CLAIM_V1, &[note(1, 10), note(2, 20)]).unwrap();
        let h1 = compute_notes_hash(&slots);
        let h2 = compute_notes_hash(&slots);
        assert_eq!(h1, h2);
        assert_eq!(
            derive_target_address(&SECRET, CHAIN_ID, &h1),
            derive_target_address(&SECRET, CHAIN_ID, &h2)
        );
        assert_ne!(
            derive_nullifier(&SECRET, CHAIN_ID, 0),
            derive_nullifier(&SECRET, CHAIN_ID, 1)
        );
        assert_ne!(
            derive_nullifier(&SECRET, CHAIN_ID, 0),
            derive_nullifier(&SECRET, CHAIN_ID + 1, 0)
        );
    }

    #[test]
    fn tail_slots_cannot_influence_notes_hash() {
        let cfg = ProtocolConfig::CLAIM_V1;
        let hashes = [compute_recipient_hash(&[1; 20]); MAX_NOTES];

        let clean = NoteSlots::from_parts(&cfg, 1, &[10], &hashes[..1]).unwrap();
        let dirty = NoteSlots::from_parts(&cfg, 1, &[10, 99, 98, 97, 96], &hashes).unwrap();
        assert_eq!(clean, dirty);
        assert_eq!(compute_notes_hash(&clean), compute_notes_hash(&dirty));

        let full = NoteSlots::from_parts(&cfg, MAX_NOTES, &[10, 99, 98, 97, 96], &hashes).unwrap();
        assert_ne!(compute_notes_hash(&full), compute_notes_hash(&clean));

        let mut amounts = [10, 99, 98, 97, 96];
        amounts[4] = 1;
        let changed_last = NoteSlots::from_parts(&cfg, MAX_NOTES, &amounts, &hashes).unwrap();
        assert_ne!(compute_notes_hash(&full), compute_notes_hash(&changed_last));
    }

    #[test]
    fn single_note_hash_matches_zero_padded_buffer() {
        let slots = NoteSlots::from_notes(&ProtocolConfig::CLAIM_V1, &[note(7, 5)]).unwrap();
        let mut buf = [0u8; MAX_NOTES * 64];
        buf[..32].copy_from_slice(&u128_to_bytes32(5));
        buf[32..64].copy_from_slice(&compute_recipient_hash(&[7; 20]));
        assert_eq!(compute_notes_hash(&slots), sha256(&buf));
    }

    #[test]
    fn note_count_bounds() {
        let cfg = ProtocolConfig::CLAIM_V1;
        assert_eq!(
            NoteSlots::from_notes(&cfg, &[]),
            Err(ClaimValidationError::MalformedInput(InputFault::NoteCount))
        );
        let six = [note(1, 1); MAX_NOTES + 1];
        assert_eq!(
            NoteSlots::from_notes(&cfg, &six),
            Err(ClaimValidationError::MalformedInput(InputFault::NoteCount))
        );
        assert_eq!(
            NoteSlots::from_parts(&cfg, 2, &[1], &[[0; 32]; 2]),
            Err(ClaimValidationError::MalformedInput(InputFault::ArrayShape))
        );
    }

    #[test]
    fn amount_checks_follow_config_cap() {
        let eight_eth = 8_000_000_000_000_000_000u128;
        let slots = NoteSlots::from_notes(
            &ProtocolConfig::CLAIM_V1,
            &[note(1, eight_eth), note(2, 1)],
        )
        .unwrap();
        assert_eq!(slots.check_amounts(&ProtocolConfig::CLAIM_V1), Ok(eight_eth + 1));
        assert_eq!(
            slots.check_amounts(&ProtocolConfig::DEPOSIT_V1),
            Err(ClaimValidationError::MalformedInput(InputFault::TotalAmountExceeded))
        );

        let zero = NoteSlots::from_notes(&ProtocolConfig::CLAIM_V1, &[note(1, 0)]).unwrap();
        assert_eq!(
            zero.check_amounts(&ProtocolConfig::CLAIM_V1),
            Err(ClaimValidationError::MalformedInput(InputFault::ZeroAmount))
        );

        let overflow =
            NoteSlots::from_notes(&ProtocolConfig::CLAIM_V1, &[note(1, u128::MAX), note(2, 1)]).unwrap();
        assert_eq!(overflow.total(), None);
        assert!(overflow.check_amounts(&ProtocolConfig::CLAIM_V1).is_err());
    }

    #[test]
    fn pow_validity_is_trailing_zero_bytes() {
        let cfg = ProtocolConfig::CLAIM_V1;
        let mut digest = [0xff; 32];
        assert!(!pow_digest_is_valid(&cfg, &digest));
        digest[29] = 0;
        digest[30] = 0;
        digest[31] = 0;
        assert!(pow_digest_is_valid(&cfg, &digest));
        digest[29] = 1;
        assert!(!pow_digest_is_valid(&cfg, &digest));
    }

    #[test]
    fn search_returns_only_valid_secrets() {
        let easy = ProtocolConfig {
            pow_zero_bytes: 1,
            ..ProtocolConfig::CLAIM_V1
        };
        let solution = find_valid_secret(&easy, b"unit-test-seed", 10_000).unwrap();
        assert!(pow_digest_is_valid(&easy, &compute_pow_digest(&solution.secret)));
        assert_eq!(solution.digest, compute_pow_digest(&solution.secret));
        assert!(solution.attempts >= 1);

        let base = sha256(b"unit-test-seed");
        assert_eq!(solution.secret[..24], base[..24]);
    }

    #[test]
    fn search_gives_up_after_budget() {
        assert_eq!(
            find_valid_secret(&ProtocolConfig::CLAIM_V1, b"unit-test-seed", 3),
            Err(ClaimValidationError::PowNotFound)
        );
        assert_eq!(
            find_valid_secret(&ProtocolConfig::CLAIM_V1, b"unit-test-seed", 0),
            Err(ClaimValidationError::PowNotFound)
        );
    }
}
