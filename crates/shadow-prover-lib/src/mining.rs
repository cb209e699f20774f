//! Deposit creation: search for a pow-valid secret and derive its target address.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use rand::RngCore;
use shadow_proof_core::{
    bytes::encode_hex, compute_notes_hash, derive_target_address, find_valid_secret, Note,
    NoteSlots, ProtocolConfig,
};
use tracing::info;

use crate::{
    deposit::{
        check_label, deposit_filename, parse_decimal_amount, timestamp_now, validate_deposit,
        DepositFile, DepositNote, DEPOSIT_VERSION,
    },
    parse_address, write_json,
};

pub const DEFAULT_MAX_ATTEMPTS: u64 = 1 << 28;

pub struct MineRequest {
    pub chain_id: u64,
    pub notes: Vec<MineNote>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MineNote {
    pub recipient: [u8; 20],
    pub amount: u128,
    pub label: Option<String>,
}

/// Parses `<recipient>:<amount>[:label]`.
impl FromStr for MineNote {
    type Err = anyhow::Error;

    fn from_str(spec: &str) -> Result<Self> {
        let mut parts = spec.splitn(3, ':');
        let recipient = parts.next().unwrap_or_default();
        let amount = parts
            .next()
            .ok_or_else(|| anyhow!("note must be <recipient>:<amount>[:label], got {spec}"))?;
        let label = parts.next().map(str::to_string);
        if let Some(label) = &label {
            check_label(label)?;
        }

        Ok(Self {
            recipient: parse_address(recipient).context("invalid note recipient")?,
            amount: parse_decimal_amount(amount)
                .with_context(|| format!("invalid note amount: {amount}"))?,
            label,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MineResult {
    pub secret: [u8; 32],
    pub target_address: [u8; 20],
    pub notes_hash: [u8; 32],
    pub pow_digest: [u8; 32],
    pub attempts: u64,
}

/// Search for a pow-valid secret for the requested notes.
pub fn mine_deposit(config: &ProtocolConfig, req: &MineRequest, max_attempts: u64) -> Result<MineResult> {
    for (i, note) in req.notes.iter().enumerate() {
        if let Some(label) = &note.label {
            check_label(label).with_context(|| format!("invalid label in note {i}"))?;
        }
    }
    let notes: Vec<Note> = req
        .notes
        .iter()
        .map(|n| Note {
            recipient: n.recipient,
            amount: n.amount,
        })
        .collect();
    let slots = NoteSlots::from_notes(config, &notes)
        .map_err(|e| anyhow!("invalid deposit notes: {}", e.as_str()))?;
    let total = slots
        .check_amounts(config)
        .map_err(|e| anyhow!("invalid deposit notes: {}", e.as_str()))?;
    let notes_hash = compute_notes_hash(&slots);

    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);

    let solution = find_valid_secret(config, &seed, max_attempts)
        .map_err(|e| anyhow!("{} after {max_attempts} attempts", e.as_str()))?;
    let target_address = derive_target_address(&solution.secret, req.chain_id, &notes_hash);

    info!(
        chain_id = req.chain_id,
        notes = notes.len(),
        total = %total,
        attempts = solution.attempts,
        target_address = %encode_hex(&target_address),
        "mined deposit secret"
    );

    Ok(MineResult {
        secret: solution.secret,
        target_address,
        notes_hash,
        pow_digest: solution.digest,
        attempts: solution.attempts,
    })
}

/// Write a v2 deposit file into `workspace` and return its path.
///
/// The file is validated against `config` first, so every written deposit loads back.
pub fn write_deposit_file(
    config: &ProtocolConfig,
    workspace: &Path,
    req: &MineRequest,
    mined: &MineResult,
    comment: Option<&str>,
) -> Result<PathBuf> {
    if !workspace.is_dir() {
        bail!("workspace is not a directory: {}", workspace.display());
    }
    let timestamp = timestamp_now();
    let path = workspace.join(deposit_filename(&mined.target_address, &timestamp));

    let deposit = DepositFile {
        version: DEPOSIT_VERSION.to_string(),
        chain_id: req.chain_id.to_string(),
        secret: encode_hex(&mined.secret),
        notes: req
            .notes
            .iter()
            .map(|n| DepositNote {
                recipient: encode_hex(&n.recipient),
                amount: n.amount.to_string(),
                label: n.label.clone(),
            })
            .collect(),
        target_address: Some(encode_hex(&mined.target_address)),
        created: Some(timestamp),
        comment: comment.map(str::to_string),
    };

    validate_deposit(config, &deposit).context("refusing to write an invalid deposit")?;
    write_json(&path, &deposit)?;
    info!(path = %path.display(), "wrote deposit file");
    Ok(path)
}
