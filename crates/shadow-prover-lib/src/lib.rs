//! Shadow prover library: the off-chain side of a claim.
//!
//! Turns deposit files and saved chain snapshots into claim witnesses, evaluates
//! them with the same statement the proving guest runs, and reads and writes the
//! JSON and binary artifacts shared with the CLI.

pub mod deposit;
pub mod mining;
pub mod proof_file;
pub mod snapshot;
pub mod vectors;
pub mod witness;

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use shadow_proof_core::{bytes::decode_hex_fixed, evaluate_claim, ClaimInput, ClaimJournal, ProtocolConfig};
use tracing::{debug, info};

pub use deposit::{derive_deposit_info, load_deposit, validate_deposit, DepositFile, DerivedDepositInfo};
pub use mining::{mine_deposit, write_deposit_file, MineNote, MineRequest, MineResult};
pub use proof_file::{ProofFile, ProofPayload};
pub use snapshot::{load_snapshot, StateSnapshot};
pub use vectors::{check_vectors, load_vectors, VectorFile, VectorReport};
pub use witness::build_claim_input;

/// Validate and evaluate a claim input without running the prover.
///
/// Returns the journal a proof of this input would commit to.
pub fn inspect_claim(config: &ProtocolConfig, input: &ClaimInput) -> Result<ClaimJournal> {
    let journal =
        evaluate_claim(config, input).map_err(|e| anyhow!("claim evaluation failed: {}", e.as_str()))?;
    info!(
        block_number = journal.block_number,
        note_index = input.note_index,
        amount = %journal.amount,
        "claim evaluated"
    );
    Ok(journal)
}

/// Write a value as pretty-printed JSON to a file.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let encoded = serde_json::to_vec_pretty(value).context("failed encoding json")?;
    fs::write(path, encoded).with_context(|| format!("failed writing json {}", path.display()))?;
    Ok(())
}

/// Write a claim witness in the binary (bincode) form handed to the prover.
pub fn write_witness(path: &Path, input: &ClaimInput) -> Result<()> {
    ensure_parent(path)?;
    let bytes = bincode::serialize(input).context("failed serializing claim input")?;
    fs::write(path, bytes).with_context(|| format!("failed writing witness {}", path.display()))?;
    debug!(path = %path.display(), "wrote witness");
    Ok(())
}

pub fn read_witness(path: &Path) -> Result<ClaimInput> {
    let bytes = fs::read(path).with_context(|| format!("failed reading witness {}", path.display()))?;
    bincode::deserialize(&bytes).context("failed deserializing claim input")
}

// ---------------------------------------------------------------------------
// Legacy input parsing
// ---------------------------------------------------------------------------

/// Legacy claim input format: every scalar and byte is a decimal string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyClaimInput {
    pub block_number: String,
    pub block_hash: Vec<String>,
    pub block_header_rlp: Vec<String>,
    pub chain_id: String,
    pub note_index: String,
    pub amount: String,
    pub recipient: Vec<String>,
    pub secret: Vec<String>,
    pub note_count: String,
    pub amounts: Vec<String>,
    pub recipient_hashes: Vec<Vec<String>>,
    pub proof_depth: String,
    pub proof_nodes: Vec<Vec<String>>,
    pub proof_node_lengths: Vec<String>,
}

/// Load a claim input from a JSON file (native or legacy format).
pub fn load_claim_input(path: &Path) -> Result<ClaimInput> {
    let raw = fs::read(path).with_context(|| format!("failed reading input {}", path.display()))?;

    if let Ok(native) = serde_json::from_slice::<ClaimInput>(&raw) {
        return Ok(native);
    }

    let legacy: LegacyClaimInput = serde_json::from_slice(&raw)
        .with_context(|| format!("failed parsing input as legacy format: {}", path.display()))?;
    legacy_to_input(legacy)
}

/// Convert a legacy claim input to the native format.
///
/// Proof nodes may be zero-padded past their declared length; the padding is dropped.
pub fn legacy_to_input(legacy: LegacyClaimInput) -> Result<ClaimInput> {
    let note_count = parse_uint::<u32>(&legacy.note_count)?;
    let proof_depth = parse_uint::<u32>(&legacy.proof_depth)?;
    let max_notes = ProtocolConfig::CLAIM_V1.max_notes;

    if note_count == 0 || note_count as usize > max_notes {
        bail!("noteCount must be in [1, {max_notes}]");
    }

    if legacy.amounts.len() < note_count as usize {
        bail!("amounts length is smaller than noteCount");
    }
    if legacy.recipient_hashes.len() < note_count as usize {
        bail!("recipientHashes length is smaller than noteCount");
    }
    if legacy.proof_nodes.len() < proof_depth as usize {
        bail!("proofNodes length is smaller than proofDepth");
    }
    if legacy.proof_node_lengths.len() < proof_depth as usize {
        bail!("proofNodeLengths length is smaller than proofDepth");
    }

    let amounts = legacy.amounts[..note_count as usize]
        .iter()
        .map(|v| parse_uint::<u128>(v))
        .collect::<Result<Vec<_>>>()?;
    let recipient_hashes = legacy.recipient_hashes[..note_count as usize]
        .iter()
        .map(|v| parse_fixed_u8_array::<32>(v))
        .collect::<Result<Vec<_>>>()?;

    let mut proof_nodes = Vec::with_capacity(proof_depth as usize);
    let mut proof_node_lengths = Vec::with_capacity(proof_depth as usize);
    for i in 0..proof_depth as usize {
        let declared_len = parse_uint::<u32>(&legacy.proof_node_lengths[i])?;
        let full_node = &legacy.proof_nodes[i];
        if full_node.len() < declared_len as usize {
            bail!("proof node {i} shorter than declared length");
        }
        proof_nodes.push(parse_u8_vec(&full_node[..declared_len as usize])?);
        proof_node_lengths.push(declared_len);
    }

    Ok(ClaimInput {
        block_number: parse_uint::<u64>(&legacy.block_number)?,
        block_hash: parse_fixed_u8_array::<32>(&legacy.block_hash)?,
        chain_id: parse_uint::<u64>(&legacy.chain_id)?,
        amount: parse_uint::<u128>(&legacy.amount)?,
        recipient: parse_fixed_u8_array::<20>(&legacy.recipient)?,
        note_index: parse_uint::<u32>(&legacy.note_index)?,
        secret: parse_fixed_u8_array::<32>(&legacy.secret)?,
        note_count,
        amounts,
        recipient_hashes,
        block_header_rlp: parse_u8_vec(&legacy.block_header_rlp)?,
        proof_depth,
        proof_nodes,
        proof_node_lengths,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("path has no parent: {}", path.display()))?;
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(parent)
        .with_context(|| format!("failed creating parent dir {}", parent.display()))?;
    Ok(())
}

pub(crate) fn parse_bytes32(value: &str) -> Result<[u8; 32]> {
    decode_hex_fixed::<32>(value)
        .map_err(|e| anyhow!("{}: expected 0x-prefixed 32 bytes, got {value}", e.as_str()))
}

pub(crate) fn parse_address(value: &str) -> Result<[u8; 20]> {
    decode_hex_fixed::<20>(value)
        .map_err(|e| anyhow!("{}: expected 0x-prefixed 20-byte address, got {value}", e.as_str()))
}

fn parse_u8_vec(values: &[String]) -> Result<Vec<u8>> {
    values.iter().map(|v| parse_u8(v)).collect()
}

fn parse_fixed_u8_array<const N: usize>(values: &[String]) -> Result<[u8; N]> {
    if values.len() != N {
        bail!("expected {} elements, got {}", N, values.len());
    }
    let mut out = [0u8; N];
    for (i, value) in values.iter().enumerate() {
        out[i] = parse_u8(value)?;
    }
    Ok(out)
}

fn parse_u8(value: &str) -> Result<u8> {
    let n = value
        .parse::<u16>()
        .with_context(|| format!("invalid u8 value: {value}"))?;
    u8::try_from(n).map_err(|_| anyhow!("u8 out of range: {value}"))
}

/// Decimal or 0x-prefixed hex, narrowed to `T`.
fn parse_uint<T: TryFrom<u128>>(value: &str) -> Result<T> {
    let wide = match value.strip_prefix("0x") {
        Some(digits) => u128::from_str_radix(digits, 16),
        None => value.parse::<u128>(),
    }
    .with_context(|| format!("invalid integer: {value}"))?;
    T::try_from(wide).map_err(|_| anyhow!("integer out of range for {}: {value}", std::any::type_name::<T>()))
}
