//! State snapshots read from saved JSON-RPC payloads.
//!
//! A snapshot file holds the `eth_getBlockByNumber` result and the `eth_getProof`
//! result for the deposit's target address:
//! ```json
//! { "block": { "number": "0x...", "stateRoot": "0x...", ... },
//!   "proof": { "balance": "0x...", "accountProof": ["0x...", ...] } }
//! ```

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shadow_proof_core::{
    bytes::{encode_hex, keccak256},
    BlockHeader,
};
use tracing::debug;

/// Block object as returned by `eth_getBlockByNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockJson {
    pub parent_hash: String,
    pub sha3_uncles: String,
    pub miner: String,
    pub state_root: String,
    pub transactions_root: String,
    pub receipts_root: String,
    pub logs_bloom: String,
    pub difficulty: String,
    pub number: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub timestamp: String,
    pub extra_data: String,
    pub mix_hash: String,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<String>,
    /// Hash reported by the node; checked against the re-encoded header when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl BlockJson {
    pub fn to_header(&self) -> Result<BlockHeader> {
        Ok(BlockHeader {
            parent_hash: fixed_hex(&self.parent_hash).context("parentHash")?,
            ommers_hash: fixed_hex(&self.sha3_uncles).context("sha3Uncles")?,
            beneficiary: fixed_hex(&self.miner).context("miner")?,
            state_root: fixed_hex(&self.state_root).context("stateRoot")?,
            transactions_root: fixed_hex(&self.transactions_root).context("transactionsRoot")?,
            receipts_root: fixed_hex(&self.receipts_root).context("receiptsRoot")?,
            logs_bloom: fixed_hex::<256>(&self.logs_bloom).context("logsBloom")?.to_vec(),
            difficulty: quantity(&self.difficulty).context("difficulty")?,
            number: quantity_u64(&self.number).context("number")?,
            gas_limit: quantity_u64(&self.gas_limit).context("gasLimit")?,
            gas_used: quantity_u64(&self.gas_used).context("gasUsed")?,
            timestamp: quantity_u64(&self.timestamp).context("timestamp")?,
            extra_data: hex_bytes(&self.extra_data).context("extraData")?,
            mix_hash: fixed_hex(&self.mix_hash).context("mixHash")?,
            nonce: fixed_hex(&self.nonce).context("nonce")?,
            base_fee_per_gas: self
                .base_fee_per_gas
                .as_deref()
                .map(quantity)
                .transpose()
                .context("baseFeePerGas")?,
            withdrawals_root: opt_fixed(&self.withdrawals_root).context("withdrawalsRoot")?,
            blob_gas_used: self
                .blob_gas_used
                .as_deref()
                .map(quantity_u64)
                .transpose()
                .context("blobGasUsed")?,
            excess_blob_gas: self
                .excess_blob_gas
                .as_deref()
                .map(quantity_u64)
                .transpose()
                .context("excessBlobGas")?,
            parent_beacon_block_root: opt_fixed(&self.parent_beacon_block_root)
                .context("parentBeaconBlockRoot")?,
            requests_hash: opt_fixed(&self.requests_hash).context("requestsHash")?,
        })
    }
}

impl From<&BlockHeader> for BlockJson {
    fn from(header: &BlockHeader) -> Self {
        Self {
            parent_hash: encode_hex(&header.parent_hash),
            sha3_uncles: encode_hex(&header.ommers_hash),
            miner: encode_hex(&header.beneficiary),
            state_root: encode_hex(&header.state_root),
            transactions_root: encode_hex(&header.transactions_root),
            receipts_root: encode_hex(&header.receipts_root),
            logs_bloom: encode_hex(&header.logs_bloom),
            difficulty: format!("{:#x}", header.difficulty),
            number: format!("{:#x}", header.number),
            gas_limit: format!("{:#x}", header.gas_limit),
            gas_used: format!("{:#x}", header.gas_used),
            timestamp: format!("{:#x}", header.timestamp),
            extra_data: encode_hex(&header.extra_data),
            mix_hash: encode_hex(&header.mix_hash),
            nonce: encode_hex(&header.nonce),
            base_fee_per_gas: header.base_fee_per_gas.map(|v| format!("{v:#x}")),
            withdrawals_root: header.withdrawals_root.map(|v| encode_hex(&v)),
            blob_gas_used: header.blob_gas_used.map(|v| format!("{v:#x}")),
            excess_blob_gas: header.excess_blob_gas.map(|v| format!("{v:#x}")),
            parent_beacon_block_root: header.parent_beacon_block_root.map(|v| encode_hex(&v)),
            requests_hash: header.requests_hash.map(|v| encode_hex(&v)),
            hash: Some(encode_hex(&header.hash())),
        }
    }
}

/// Result object of `eth_getProof`. Storage proofs are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProofJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub balance: String,
    pub account_proof: Vec<String>,
}

impl AccountProofJson {
    pub fn proof_nodes(&self) -> Result<Vec<Vec<u8>>> {
        self.account_proof
            .iter()
            .enumerate()
            .map(|(i, node)| hex_bytes(node).with_context(|| format!("proof node {i}")))
            .collect()
    }

    /// Balance as a big-endian 256-bit word.
    pub fn balance_word(&self) -> Result<[u8; 32]> {
        let raw = quantity_bytes(&self.balance).context("balance")?;
        if raw.len() > 32 {
            bail!("balance exceeds 256 bits");
        }
        let mut out = [0u8; 32];
        out[32 - raw.len()..].copy_from_slice(&raw);
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub block: BlockJson,
    pub proof: AccountProofJson,
}

/// Header and account proof for one block, ready for witness assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub header_rlp: Vec<u8>,
    pub block_hash: [u8; 32],
    pub block_number: u64,
    pub state_root: [u8; 32],
    pub proof_nodes: Vec<Vec<u8>>,
    /// Node-reported balance; informational, the proof is authoritative.
    pub reported_balance: [u8; 32],
}

impl StateSnapshot {
    pub fn from_json(block: &BlockJson, proof: &AccountProofJson) -> Result<Self> {
        let header = block.to_header()?;
        let header_rlp = header.encode();
        let block_hash = keccak256(&header_rlp);

        if let Some(reported) = &block.hash {
            let reported: [u8; 32] = fixed_hex(reported).context("block hash")?;
            if reported != block_hash {
                bail!(
                    "block hash mismatch: node reports {} but header RLP hashes to {}",
                    encode_hex(&reported),
                    encode_hex(&block_hash)
                );
            }
        }

        let proof_nodes = proof.proof_nodes()?;
        if proof_nodes.is_empty() {
            bail!("account proof is empty; target address may not exist on-chain");
        }

        debug!(
            block_number = header.number,
            block_hash = %encode_hex(&block_hash),
            proof_depth = proof_nodes.len(),
            "loaded state snapshot"
        );

        Ok(Self {
            header_rlp,
            block_hash,
            block_number: header.number,
            state_root: header.state_root,
            proof_nodes,
            reported_balance: proof.balance_word()?,
        })
    }
}

pub fn load_snapshot(path: &Path) -> Result<StateSnapshot> {
    let raw = fs::read(path).with_context(|| format!("failed reading snapshot {}", path.display()))?;
    let file: SnapshotFile = serde_json::from_slice(&raw)
        .with_context(|| format!("failed parsing snapshot JSON {}", path.display()))?;
    StateSnapshot::from_json(&file.block, &file.proof)
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

// ---------------------------------------------------------------------------
// Hex / quantity parsing helpers
// ---------------------------------------------------------------------------

fn strip(value: &str) -> Result<&str> {
    shadow_proof_core::bytes::strip_hex_prefix(value)
        .with_context(|| format!("expected 0x-prefixed hex, got {value}"))
}

fn hex_bytes(value: &str) -> Result<Vec<u8>> {
    hex::decode(strip(value)?).with_context(|| format!("invalid hex data: {value}"))
}

fn fixed_hex<const N: usize>(value: &str) -> Result<[u8; N]> {
    let bytes = hex_bytes(value)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("expected {N} bytes, got {}", b.len()))
}

fn opt_fixed(value: &Option<String>) -> Result<Option<[u8; 32]>> {
    value.as_deref().map(fixed_hex::<32>).transpose()
}

/// Minimal big-endian bytes of a JSON-RPC quantity (`0x0` is empty).
fn quantity_bytes(value: &str) -> Result<Vec<u8>> {
    let digits = strip(value)?.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(Vec::new());
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    hex::decode(padded).with_context(|| format!("invalid hex quantity: {value}"))
}

fn quantity(value: &str) -> Result<u128> {
    let raw = quantity_bytes(value)?;
    if raw.len() > 16 {
        bail!("quantity exceeds 128 bits: {value}");
    }
    let mut buf = [0u8; 16];
    buf[16 - raw.len()..].copy_from_slice(&raw);
    Ok(u128::from_be_bytes(buf))
}

fn quantity_u64(value: &str) -> Result<u64> {
    u64::try_from(quantity(value)?).with_context(|| format!("quantity exceeds 64 bits: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> BlockHeader {
        BlockHeader {
            parent_hash: [0x11; 32],
            ommers_hash: [0x1d; 32],
            beneficiary: [0x22; 20],
            state_root: [0xab; 32],
            transactions_root: [0x33; 32],
            receipts_root: [0x44; 32],
            logs_bloom: vec![0u8; 256],
            difficulty: 0,
            number: 4_200_000,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: 1_771_969_573,
            extra_data: Vec::new(),
            mix_hash: [0x55; 32],
            nonce: [0u8; 8],
            base_fee_per_gas: Some(7),
            withdrawals_root: Some([0x66; 32]),
            blob_gas_used: Some(0),
            excess_blob_gas: Some(0),
            parent_beacon_block_root: Some([0x77; 32]),
            requests_hash: None,
        }
    }

    fn proof_json() -> AccountProofJson {
        AccountProofJson {
            address: None,
            balance: "0x14d1120d7b160000".into(),
            account_proof: vec!["0xc0".into()],
        }
    }

    #[test]
    fn quantities_are_minimal() {
        assert!(quantity_bytes("0x0").unwrap().is_empty());
        assert_eq!(quantity_bytes("0x100").unwrap(), vec![0x01, 0x00]);
        assert_eq!(quantity("0xff").unwrap(), 255);
        assert!(quantity("12").is_err());
        assert!(quantity_u64("0x10000000000000000").is_err());
    }

    #[test]
    fn block_json_round_trips_header() {
        let header = header();
        let json = BlockJson::from(&header);
        assert_eq!(json.to_header().unwrap(), header);

        let snapshot = StateSnapshot::from_json(&json, &proof_json()).unwrap();
        assert_eq!(snapshot.block_hash, header.hash());
        assert_eq!(snapshot.block_number, 4_200_000);
        assert_eq!(snapshot.state_root, [0xab; 32]);
        assert_eq!(&snapshot.reported_balance[24..], &1_500_000_000_000_000_000u64.to_be_bytes());
    }

    #[test]
    fn reported_hash_must_match() {
        let mut json = BlockJson::from(&header());
        json.hash = Some(encode_hex(&[0u8; 32]));
        assert!(StateSnapshot::from_json(&json, &proof_json()).is_err());

        json.hash = None;
        assert!(StateSnapshot::from_json(&json, &proof_json()).is_ok());
    }

    #[test]
    fn empty_proof_rejected() {
        let json = BlockJson::from(&header());
        let mut proof = proof_json();
        proof.account_proof.clear();
        assert!(StateSnapshot::from_json(&json, &proof).is_err());
    }

    #[test]
    fn snapshot_file_parses_camel_case() {
        let file = SnapshotFile {
            block: BlockJson::from(&header()),
            proof: proof_json(),
        };
        let text = serde_json::to_string(&file).unwrap();
        assert!(text.contains("\"stateRoot\""));
        assert!(text.contains("\"accountProof\""));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, text).unwrap();
        assert_eq!(load_snapshot(&path).unwrap().block_hash, header().hash());
    }
}
