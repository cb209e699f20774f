//! Deposit file loading, validation, and derivation utilities.
//!
//! Handles the v2 deposit file format:
//! ```json
//! {
//!   "version": "v2",
//!   "chainId": "167013",
//!   "secret": "0x...",
//!   "notes": [{ "recipient": "0x...", "amount": "123", "label": "..." }],
//!   "targetAddress": "0x..."
//! }
//! ```

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use shadow_proof_core::{
    bytes::encode_hex, compute_notes_hash, compute_pow_digest, derive_nullifier,
    derive_target_address, pow_digest_is_valid, Note, NoteSlots, ProtocolConfig,
};
use tracing::debug;

use crate::{parse_address, parse_bytes32};

pub const DEPOSIT_VERSION: &str = "v2";
pub const MAX_LABEL_LEN: usize = 64;

/// A parsed deposit file (v2 schema).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositFile {
    pub version: String,
    pub chain_id: String,
    pub secret: String,
    pub notes: Vec<DepositNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A single note within a deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositNote {
    pub recipient: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Everything derivable from a deposit's secret and notes.
#[derive(Debug, Clone)]
pub struct DerivedDepositInfo {
    pub chain_id: u64,
    pub secret: [u8; 32],
    pub target_address: [u8; 20],
    pub notes_hash: [u8; 32],
    pub notes: Vec<DerivedNoteInfo>,
    /// Total amount across all notes (in wei).
    pub total_amount: u128,
    pub pow_digest: [u8; 32],
    pub pow_valid: bool,
}

impl DerivedDepositInfo {
    pub fn amounts(&self) -> Vec<u128> {
        self.notes.iter().map(|n| n.amount).collect()
    }

    pub fn recipient_hashes(&self) -> Vec<[u8; 32]> {
        self.notes.iter().map(|n| n.recipient_hash).collect()
    }
}

/// Per-note derived information.
#[derive(Debug, Clone)]
pub struct DerivedNoteInfo {
    pub index: u32,
    pub recipient: [u8; 20],
    pub amount: u128,
    pub label: Option<String>,
    pub nullifier: [u8; 32],
    pub recipient_hash: [u8; 32],
}

pub fn load_deposit(path: &Path) -> Result<DepositFile> {
    let raw =
        fs::read(path).with_context(|| format!("failed reading deposit {}", path.display()))?;
    let deposit: DepositFile = serde_json::from_slice(&raw)
        .with_context(|| format!("failed parsing deposit JSON {}", path.display()))?;
    Ok(deposit)
}

/// Validate a deposit file against the v2 schema and the given protocol limits.
pub fn validate_deposit(config: &ProtocolConfig, deposit: &DepositFile) -> Result<()> {
    if deposit.version != DEPOSIT_VERSION {
        bail!(
            "unsupported deposit version: {} (expected {DEPOSIT_VERSION})",
            deposit.version
        );
    }

    if deposit.chain_id.is_empty() || !deposit.chain_id.chars().all(|c| c.is_ascii_digit()) {
        bail!("invalid chainId: must be a decimal number string");
    }
    deposit
        .chain_id
        .parse::<u64>()
        .context("chainId does not fit in u64")?;

    parse_bytes32(&deposit.secret).context("invalid secret")?;

    if deposit.notes.is_empty() || deposit.notes.len() > config.max_notes {
        bail!(
            "invalid note count: {} (must be 1..={})",
            deposit.notes.len(),
            config.max_notes
        );
    }

    let mut total: u128 = 0;
    for (i, note) in deposit.notes.iter().enumerate() {
        parse_address(&note.recipient).with_context(|| format!("invalid recipient in note {i}"))?;

        let amount = parse_decimal_amount(&note.amount)
            .with_context(|| format!("invalid amount in note {i}: {}", note.amount))?;
        if amount == 0 {
            bail!("note {i} amount must be non-zero");
        }
        total = total.checked_add(amount).context("total amount overflow")?;

        if let Some(ref label) = note.label {
            check_label(label).with_context(|| format!("invalid label in note {i}"))?;
        }
    }

    if total > config.max_total_wei {
        bail!(
            "total amount {total} exceeds limit of {} wei",
            config.max_total_wei
        );
    }

    if let Some(ref addr) = deposit.target_address {
        parse_address(addr).context("invalid targetAddress")?;
    }

    Ok(())
}

/// Validate `deposit` and derive its target address, nullifiers and pow status.
///
/// A `targetAddress` present in the file must equal the derived one.
pub fn derive_deposit_info(config: &ProtocolConfig, deposit: &DepositFile) -> Result<DerivedDepositInfo> {
    validate_deposit(config, deposit)?;

    let chain_id: u64 = deposit.chain_id.parse().context("chainId is not a valid u64")?;
    let secret = parse_bytes32(&deposit.secret)?;

    let mut notes = Vec::with_capacity(deposit.notes.len());
    for note in &deposit.notes {
        notes.push(Note {
            recipient: parse_address(&note.recipient)?,
            amount: parse_decimal_amount(&note.amount)?,
        });
    }

    let slots = NoteSlots::from_notes(config, &notes)
        .map_err(|e| anyhow!("invalid notes: {}", e.as_str()))?;
    let total_amount = slots
        .check_amounts(config)
        .map_err(|e| anyhow!("invalid notes: {}", e.as_str()))?;
    let notes_hash = compute_notes_hash(&slots);
    let target_address = derive_target_address(&secret, chain_id, &notes_hash);

    if let Some(ref expected_addr) = deposit.target_address {
        let expected = parse_address(expected_addr)?;
        if expected != target_address {
            bail!(
                "targetAddress mismatch: file says {} but derived {}",
                encode_hex(&expected),
                encode_hex(&target_address)
            );
        }
    }

    let derived_notes = deposit
        .notes
        .iter()
        .zip(&notes)
        .enumerate()
        .map(|(i, (raw, note))| DerivedNoteInfo {
            index: i as u32,
            recipient: note.recipient,
            amount: note.amount,
            label: raw.label.clone(),
            nullifier: derive_nullifier(&secret, chain_id, i as u32),
            recipient_hash: *slots.recipient_hash(i).unwrap_or(&[0u8; 32]),
        })
        .collect();

    let pow_digest = compute_pow_digest(&secret);
    let pow_valid = pow_digest_is_valid(config, &pow_digest);
    debug!(
        target_address = %encode_hex(&target_address),
        notes = notes.len(),
        pow_valid,
        "derived deposit"
    );

    Ok(DerivedDepositInfo {
        chain_id,
        secret,
        target_address,
        notes_hash,
        notes: derived_notes,
        total_amount,
        pow_digest,
        pow_valid,
    })
}

pub(crate) fn check_label(label: &str) -> Result<()> {
    if label.chars().count() > MAX_LABEL_LEN {
        bail!("label exceeds {MAX_LABEL_LEN} characters");
    }
    Ok(())
}

/// Digits only: no sign, no hex, no whitespace.
pub(crate) fn parse_decimal_amount(value: &str) -> Result<u128> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        bail!("amount must be a decimal number string");
    }
    value.parse::<u128>().context("amount does not fit in u128")
}

// ---------------------------------------------------------------------------
// Filename utilities
// ---------------------------------------------------------------------------

/// Format: `deposit-<first4hex>-<last4hex>-<YYYYMMDDTHHMMSS>.json`
pub fn deposit_filename(target_address: &[u8; 20], timestamp: &str) -> String {
    let hex_addr = hex::encode(target_address);
    let first4 = &hex_addr[..4];
    let last4 = &hex_addr[hex_addr.len() - 4..];
    format!("deposit-{first4}-{last4}-{timestamp}.json")
}

/// Name of a proof generated from `deposit_file` at `timestamp`:
/// `deposit-ffe8-fde9-20260224T214613.json` becomes
/// `deposit-ffe8-fde9-20260224T214613.proof-<timestamp>.json`.
pub fn proof_filename(deposit_file: &str, timestamp: &str) -> String {
    let stem = deposit_file.strip_suffix(".json").unwrap_or(deposit_file);
    format!("{stem}.proof-{timestamp}.json")
}

/// Compact UTC timestamp for filenames: `YYYYMMDDTHHMMSS`.
pub fn timestamp_now() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    format_timestamp_secs(now.as_secs())
}

pub fn format_timestamp_secs(unix_secs: u64) -> String {
    let days = unix_secs / 86400;
    let time_of_day = unix_secs % 86400;

    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = civil_from_days(days as i64);

    format!("{year:04}{month:02}{day:02}T{hours:02}{minutes:02}{seconds:02}")
}

// Howard Hinnant's days-to-civil algorithm.
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as i32, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0x8c4d3df220b9aa338eafbe43871a800a9ef971fc7242c4d0de98e056cc8c7bfa";

    fn deposit(notes: Vec<DepositNote>) -> DepositFile {
        DepositFile {
            version: "v2".into(),
            chain_id: "167013".into(),
            secret: SECRET.into(),
            notes,
            target_address: None,
            created: None,
            comment: None,
        }
    }

    fn note(recipient: &str, amount: &str) -> DepositNote {
        DepositNote {
            recipient: recipient.into(),
            amount: amount.into(),
            label: None,
        }
    }

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    #[test]
    fn deposit_filename_format() {
        let mut addr = [0u8; 20];
        addr[0] = 0xff;
        addr[1] = 0xe8;
        addr[18] = 0xfd;
        addr[19] = 0xe9;
        let name = deposit_filename(&addr, "20260224T214613");
        assert_eq!(name, "deposit-ffe8-fde9-20260224T214613.json");
    }

    #[test]
    fn proof_filename_keeps_deposit_stem() {
        assert_eq!(
            proof_filename("deposit-ffe8-fde9-20260224T214613.json", "20260225T103000"),
            "deposit-ffe8-fde9-20260224T214613.proof-20260225T103000.json"
        );
        assert_eq!(proof_filename("custom", "20260225T103000"), "custom.proof-20260225T103000.json");
    }

    #[test]
    fn validate_accepts_good_deposit() {
        let mut d = deposit(vec![note(ALICE, "1230000000000")]);
        d.notes[0].label = Some("example".into());
        validate_deposit(&ProtocolConfig::DEPOSIT_V1, &d).unwrap();
    }

    #[test]
    fn validate_rejects_schema_violations() {
        let cfg = ProtocolConfig::DEPOSIT_V1;

        let mut d = deposit(vec![note(ALICE, "100")]);
        d.version = "v1".into();
        assert!(validate_deposit(&cfg, &d).is_err());

        assert!(validate_deposit(&cfg, &deposit(vec![])).is_err());
        assert!(validate_deposit(&cfg, &deposit(vec![note(ALICE, "1"); 6])).is_err());
        assert!(validate_deposit(&cfg, &deposit(vec![note(ALICE, "0")])).is_err());
        assert!(validate_deposit(&cfg, &deposit(vec![note(ALICE, "0x10")])).is_err());
        assert!(validate_deposit(&cfg, &deposit(vec![note("0x1111", "1")])).is_err());

        let mut d = deposit(vec![note(ALICE, "1")]);
        d.chain_id = "0xa".into();
        assert!(validate_deposit(&cfg, &d).is_err());

        let mut d = deposit(vec![note(ALICE, "1")]);
        d.secret = "0x1234".into();
        assert!(validate_deposit(&cfg, &d).is_err());

        let mut d = deposit(vec![note(ALICE, "1")]);
        d.notes[0].label = Some("x".repeat(65));
        assert!(validate_deposit(&cfg, &d).is_err());
    }

    #[test]
    fn deposit_cap_is_tighter_than_claim_cap() {
        let d = deposit(vec![
            note(ALICE, "5000000000000000000"),
            note(BOB, "4000000000000000000"),
        ]);
        assert!(validate_deposit(&ProtocolConfig::DEPOSIT_V1, &d).is_err());
        validate_deposit(&ProtocolConfig::CLAIM_V1, &d).unwrap();
    }

    #[test]
    fn derive_matches_core_vector() {
        let d = deposit(vec![note(ALICE, "1230000000000")]);
        let info = derive_deposit_info(&ProtocolConfig::DEPOSIT_V1, &d).unwrap();
        assert_eq!(
            encode_hex(&info.target_address),
            "0x324ff700bbb44e0cd5342c6d65e4c68014e76b43"
        );
        assert_eq!(info.total_amount, 1230000000000);
        assert!(!info.pow_valid);
    }

    #[test]
    fn derive_computes_per_note_values() {
        let mut d = deposit(vec![note(ALICE, "1230000000000"), note(BOB, "4560000000000")]);
        d.notes[0].label = Some("note #0".into());

        let info = derive_deposit_info(&ProtocolConfig::DEPOSIT_V1, &d).unwrap();
        assert_eq!(info.chain_id, 167013);
        assert_eq!(info.notes.len(), 2);
        assert_eq!(info.total_amount, 1230000000000 + 4560000000000);
        assert_eq!(info.notes[1].index, 1);
        assert_eq!(info.notes[0].label.as_deref(), Some("note #0"));
        assert_ne!(info.notes[0].nullifier, info.notes[1].nullifier);
        assert_eq!(info.amounts(), vec![1230000000000, 4560000000000]);
        assert_eq!(info.recipient_hashes().len(), 2);
    }

    #[test]
    fn derive_checks_declared_target_address() {
        let mut d = deposit(vec![note(ALICE, "1230000000000")]);
        d.target_address = Some("0x0000000000000000000000000000000000000001".into());
        assert!(derive_deposit_info(&ProtocolConfig::DEPOSIT_V1, &d).is_err());

        d.target_address = Some("0x324ff700bbb44e0cd5342c6d65e4c68014e76b43".into());
        derive_deposit_info(&ProtocolConfig::DEPOSIT_V1, &d).unwrap();
    }

    #[test]
    fn format_timestamp_secs_known_dates() {
        assert_eq!(format_timestamp_secs(0), "19700101T000000");
        assert_eq!(format_timestamp_secs(1771969573), "20260224T214613");
    }
}
