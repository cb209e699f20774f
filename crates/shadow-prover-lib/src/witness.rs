//! Claim witness assembly from a derived deposit and a state snapshot.

use anyhow::{bail, Result};
use shadow_proof_core::{bytes::encode_hex, mpt::balance_gte, ClaimInput};
use tracing::warn;

use crate::{deposit::DerivedDepositInfo, snapshot::StateSnapshot};

/// Build the `ClaimInput` for note `note_index` of a deposit.
pub fn build_claim_input(
    info: &DerivedDepositInfo,
    note_index: u32,
    snapshot: &StateSnapshot,
) -> Result<ClaimInput> {
    let Some(note) = info.notes.get(note_index as usize) else {
        bail!(
            "note index {note_index} out of range (deposit has {} notes)",
            info.notes.len()
        );
    };
    if snapshot.proof_nodes.is_empty() {
        bail!("empty account proof");
    }

    if !balance_gte(&snapshot.reported_balance, info.total_amount) {
        warn!(
            target_address = %encode_hex(&info.target_address),
            total = %info.total_amount,
            "reported balance is below the deposit total; the claim will not verify"
        );
    }

    Ok(ClaimInput {
        block_number: snapshot.block_number,
        block_hash: snapshot.block_hash,
        chain_id: info.chain_id,
        amount: note.amount,
        recipient: note.recipient,
        note_index,
        secret: info.secret,
        note_count: info.notes.len() as u32,
        amounts: info.amounts(),
        recipient_hashes: info.recipient_hashes(),
        block_header_rlp: snapshot.header_rlp.clone(),
        proof_depth: snapshot.proof_nodes.len() as u32,
        proof_node_lengths: snapshot.proof_nodes.iter().map(|n| n.len() as u32).collect(),
        proof_nodes: snapshot.proof_nodes.clone(),
    })
}
