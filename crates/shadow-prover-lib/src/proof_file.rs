//! v2 proof files: one note's public inputs plus the proof payload.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use shadow_proof_core::{
    bytes::encode_hex, pack_journal, unpack_journal, ClaimJournal, PublicInputs, PUBLIC_INPUTS_LEN,
};

use crate::{deposit::proof_filename, parse_address, parse_bytes32, write_json};

pub const PROOF_FILE_VERSION: &str = "v2";

/// Receipt kind recorded when the file carries no seal yet.
pub const UNPROVEN_RECEIPT_KIND: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPayload {
    pub receipt_kind: String,
    /// 0x-prefixed seal bytes.
    pub seal: String,
    /// 0x-prefixed packed journal bytes.
    pub journal: String,
}

impl ProofPayload {
    pub fn unproven(journal: &ClaimJournal) -> Self {
        Self {
            receipt_kind: UNPROVEN_RECEIPT_KIND.to_string(),
            seal: "0x".to_string(),
            journal: encode_hex(&pack_journal(journal)),
        }
    }

    pub fn seal_bytes(&self) -> Result<Vec<u8>> {
        decode_hex_vec(&self.seal).context("invalid seal hex")
    }

    pub fn journal_bytes(&self) -> Result<Vec<u8>> {
        decode_hex_vec(&self.journal).context("invalid journal hex")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofFile {
    pub version: String,
    pub deposit_file: String,
    pub block_number: String,
    pub block_hash: String,
    pub chain_id: String,
    pub note_index: u32,
    pub amount: String,
    pub recipient: String,
    pub nullifier: String,
    /// The 87 public-input elements as decimal strings.
    pub public_inputs: Vec<String>,
    pub proof: ProofPayload,
}

impl ProofFile {
    pub fn from_journal(
        deposit_file: &str,
        note_index: u32,
        journal: &ClaimJournal,
        proof: ProofPayload,
    ) -> Self {
        Self {
            version: PROOF_FILE_VERSION.to_string(),
            deposit_file: deposit_file.to_string(),
            block_number: journal.block_number.to_string(),
            block_hash: encode_hex(&journal.block_hash),
            chain_id: journal.chain_id.to_string(),
            note_index,
            amount: journal.amount.to_string(),
            recipient: encode_hex(&journal.recipient),
            nullifier: encode_hex(&journal.nullifier),
            public_inputs: journal
                .public_inputs()
                .as_elements()
                .iter()
                .map(|v| v.to_string())
                .collect(),
            proof,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed reading proof {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("failed parsing proof JSON {}", path.display()))
    }

    /// Write into `dir`, named after the deposit file and `timestamp`.
    pub fn write_to_dir(&self, dir: &Path, timestamp: &str) -> Result<PathBuf> {
        if !dir.is_dir() {
            bail!("not a directory: {}", dir.display());
        }
        let path = dir.join(proof_filename(&self.deposit_file, timestamp));
        write_json(&path, self)?;
        Ok(path)
    }

    pub fn public_inputs(&self) -> Result<PublicInputs> {
        let mut elements = Vec::with_capacity(self.public_inputs.len());
        for (i, value) in self.public_inputs.iter().enumerate() {
            elements.push(
                value
                    .parse::<u128>()
                    .with_context(|| format!("publicInputs[{i}] is not a decimal u128: {value}"))?,
            );
        }
        PublicInputs::from_elements(&elements).map_err(|e| {
            anyhow!(
                "{} (got {} elements, expected {PUBLIC_INPUTS_LEN})",
                e.as_str(),
                elements.len()
            )
        })
    }

    /// Check that every scalar field agrees with the public-input array and the journal.
    pub fn validate(&self) -> Result<ClaimJournal> {
        if self.version != PROOF_FILE_VERSION {
            bail!(
                "unsupported proof file version: {} (expected {PROOF_FILE_VERSION})",
                self.version
            );
        }

        let (public, block_hash) = self.public_inputs()?.decode();
        public.check().map_err(|e| anyhow!("publicInputs: {}", e.as_str()))?;
        let journal = ClaimJournal {
            block_number: public.block_number,
            block_hash,
            chain_id: public.chain_id,
            amount: public.amount,
            recipient: public.recipient,
            nullifier: public.nullifier,
        };

        ensure!(
            self.block_number.parse::<u64>().ok() == Some(journal.block_number),
            "blockNumber does not match publicInputs"
        );
        ensure!(
            parse_bytes32(&self.block_hash)? == journal.block_hash,
            "blockHash does not match publicInputs"
        );
        ensure!(
            self.chain_id.parse::<u64>().ok() == Some(journal.chain_id),
            "chainId does not match publicInputs"
        );
        ensure!(
            self.amount.parse::<u128>().ok() == Some(journal.amount),
            "amount does not match publicInputs"
        );
        ensure!(
            parse_address(&self.recipient)? == journal.recipient,
            "recipient does not match publicInputs"
        );
        ensure!(
            parse_bytes32(&self.nullifier)? == journal.nullifier,
            "nullifier does not match publicInputs"
        );

        let packed = self.proof.journal_bytes()?;
        if !packed.is_empty() {
            let committed = unpack_journal(&packed).map_err(|e| anyhow!("{e}"))?;
            ensure!(committed == journal, "proof journal does not match publicInputs");
        }
        self.proof.seal_bytes()?;

        Ok(journal)
    }
}

fn decode_hex_vec(value: &str) -> Result<Vec<u8>> {
    let stripped = shadow_proof_core::bytes::strip_hex_prefix(value)
        .ok_or_else(|| anyhow!("expected 0x prefix"))?;
    Ok(hex::decode(stripped)?)
}
