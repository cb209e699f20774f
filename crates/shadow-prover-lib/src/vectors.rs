//! Conformance vectors: fixed secrets, notes and chain ids with their expected
//! digests, shared by every implementation of the claim statement.

use std::{fs, path::Path};

use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use shadow_proof_core::{
    bytes::encode_hex, compute_notes_hash, compute_pow_digest, compute_recipient_hash,
    derive_nullifier, derive_target_address, find_valid_secret, pow_digest_is_valid, Note,
    NoteSlots, ProtocolConfig,
};
use tracing::debug;

use crate::{parse_address, parse_bytes32};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorFile {
    pub version: String,
    pub max_notes: usize,
    pub cases: Vec<VectorCase>,
    pub pow_search: PowSearchVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorCase {
    pub name: String,
    pub secret: String,
    pub chain_id: String,
    pub notes: Vec<VectorNote>,
    pub recipient_hashes: Vec<String>,
    pub notes_hash: String,
    pub target_address: String,
    pub nullifiers: Vec<String>,
    pub pow_digest: String,
    pub pow_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorNote {
    pub recipient: String,
    pub amount: String,
}

/// `find_valid_secret` over `seedMaterial` succeeds after exactly `attempts` candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowSearchVector {
    pub seed_material: String,
    pub attempts: u64,
    pub secret: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorReport {
    pub cases: usize,
    pub checks: usize,
}

pub fn load_vectors(path: &Path) -> Result<VectorFile> {
    let raw = fs::read(path).with_context(|| format!("failed reading vectors {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed parsing vectors {}", path.display()))
}

/// Run every vector. Fails on the first mismatch, naming the case and the value.
pub fn check_vectors(config: &ProtocolConfig, file: &VectorFile) -> Result<VectorReport> {
    ensure!(
        file.max_notes == config.max_notes,
        "vectors were generated for maxNotes={}, config has {}",
        file.max_notes,
        config.max_notes
    );

    let mut report = VectorReport::default();
    for case in &file.cases {
        report.checks += check_case(config, case).with_context(|| format!("vector case {}", case.name))?;
        report.cases += 1;
        debug!(case = %case.name, "vector case passed");
    }

    let search = &file.pow_search;
    let solution = find_valid_secret(config, search.seed_material.as_bytes(), search.attempts)
        .map_err(|e| anyhow!("pow search vector: {}", e.as_str()))?;
    ensure!(
        solution.secret == parse_bytes32(&search.secret)? && solution.attempts == search.attempts,
        "pow search vector: found {} after {} attempts",
        encode_hex(&solution.secret),
        solution.attempts
    );
    report.checks += 1;

    Ok(report)
}

fn check_case(config: &ProtocolConfig, case: &VectorCase) -> Result<usize> {
    let secret = parse_bytes32(&case.secret)?;
    let chain_id: u64 = case
        .chain_id
        .parse()
        .with_context(|| format!("invalid chainId: {}", case.chain_id))?;
    let notes = case
        .notes
        .iter()
        .map(|n| {
            Ok(Note {
                recipient: parse_address(&n.recipient)?,
                amount: n
                    .amount
                    .parse()
                    .with_context(|| format!("invalid amount: {}", n.amount))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    ensure!(
        case.recipient_hashes.len() == notes.len() && case.nullifiers.len() == notes.len(),
        "expected one recipient hash and one nullifier per note"
    );

    let mut checks = 0;
    for (i, (note, expected)) in notes.iter().zip(&case.recipient_hashes).enumerate() {
        let actual = encode_hex(&compute_recipient_hash(&note.recipient));
        ensure!(&actual == expected, "recipient hash {i}: got {actual}, expected {expected}");
        checks += 1;
    }

    let slots = NoteSlots::from_notes(config, &notes).map_err(|e| anyhow!("{}", e.as_str()))?;
    let notes_hash = compute_notes_hash(&slots);
    let actual = encode_hex(&notes_hash);
    ensure!(actual == case.notes_hash, "notes hash: got {actual}, expected {}", case.notes_hash);

    let actual = encode_hex(&derive_target_address(&secret, chain_id, &notes_hash));
    ensure!(
        actual == case.target_address,
        "target address: got {actual}, expected {}",
        case.target_address
    );
    checks += 2;

    for (i, expected) in case.nullifiers.iter().enumerate() {
        let actual = encode_hex(&derive_nullifier(&secret, chain_id, i as u32));
        ensure!(&actual == expected, "nullifier {i}: got {actual}, expected {expected}");
        checks += 1;
    }

    let digest = compute_pow_digest(&secret);
    let actual = encode_hex(&digest);
    ensure!(actual == case.pow_digest, "pow digest: got {actual}, expected {}", case.pow_digest);
    ensure!(
        pow_digest_is_valid(config, &digest) == case.pow_valid,
        "pow validity: expected {}",
        case.pow_valid
    );
    checks += 2;

    Ok(checks)
}
