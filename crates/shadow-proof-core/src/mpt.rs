//! Merkle-Patricia-Trie account proof verification.

use alloc::vec::Vec;

use crate::{
    bounded::BoundedBytes,
    bytes::{copy_array, keccak256},
    config::{ProtocolConfig, MAX_NODE_BYTES},
    error::{ClaimValidationError, InputFault, ProofFault},
    rlp::{self, RlpField},
};

const BRANCH_ITEMS: usize = 17;
const KEY_NIBBLES: usize = 64;

/// An ordered account proof, root node first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountProof {
    nodes: Vec<BoundedBytes<MAX_NODE_BYTES>>,
}

impl AccountProof {
    /// Builds a proof from the witness arrays, checking the declared shape.
    pub fn from_parts(
        config: &ProtocolConfig,
        depth: u32,
        nodes: &[Vec<u8>],
        lengths: &[u32],
    ) -> Result<Self, ClaimValidationError> {
        let depth = depth as usize;
        if depth == 0 {
            return Err(ProofFault::EmptyProof.into());
        }
        if depth > config.max_proof_depth {
            return Err(ClaimValidationError::ProofTooDeep);
        }
        if nodes.len() != depth || lengths.len() != depth {
            return Err(InputFault::ProofShape.into());
        }

        let mut out = Vec::with_capacity(depth);
        for (node, declared) in nodes.iter().zip(lengths) {
            if node.len() != *declared as usize {
                return Err(InputFault::ProofShape.into());
            }
            if node.len() > config.max_node_bytes {
                return Err(InputFault::NodeTooLarge.into());
            }
            out.push(BoundedBytes::from_slice(node).ok_or(InputFault::NodeTooLarge)?);
        }
        Ok(Self { nodes: out })
    }

    pub fn from_nodes(config: &ProtocolConfig, nodes: &[Vec<u8>]) -> Result<Self, ClaimValidationError> {
        let lengths: Vec<u32> = nodes.iter().map(|n| n.len() as u32).collect();
        Self::from_parts(config, nodes.len() as u32, nodes, &lengths)
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> Option<&[u8]> {
        self.nodes.get(index).map(|n| n.as_slice())
    }
}

/// A decoded state-trie account leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    /// Big-endian 256-bit balance.
    pub balance: [u8; 32],
    pub storage_root: [u8; 32],
    pub code_hash: [u8; 32],
}

impl Account {
    pub fn decode(encoded: &[u8]) -> Result<Self, ClaimValidationError> {
        let fields = rlp::decode_list(encoded).map_err(|_| ProofFault::AccountEncoding)?;
        if fields.len() != 4 || fields.iter().any(|f| f.is_list) {
            return Err(ProofFault::AccountEncoding.into());
        }

        let nonce_raw = fields[0].payload;
        let balance_raw = fields[1].payload;
        if nonce_raw.len() > 8 || balance_raw.len() > 32 {
            return Err(ProofFault::AccountEncoding.into());
        }
        if nonce_raw.first() == Some(&0) || balance_raw.first() == Some(&0) {
            return Err(ProofFault::AccountEncoding.into());
        }
        if fields[2].payload.len() != 32 || fields[3].payload.len() != 32 {
            return Err(ProofFault::AccountEncoding.into());
        }

        let mut nonce = [0u8; 8];
        nonce[8 - nonce_raw.len()..].copy_from_slice(nonce_raw);
        let mut balance = [0u8; 32];
        balance[32 - balance_raw.len()..].copy_from_slice(balance_raw);

        Ok(Self {
            nonce: u64::from_be_bytes(nonce),
            balance,
            storage_root: copy_array::<32>(fields[2].payload),
            code_hash: copy_array::<32>(fields[3].payload),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let start = self.balance.iter().position(|b| *b != 0).unwrap_or(32);
        rlp::encode_list(&[
            rlp::encode_uint(self.nonce as u128),
            rlp::encode_bytes(&self.balance[start..]),
            rlp::encode_bytes(&self.storage_root),
            rlp::encode_bytes(&self.code_hash),
        ])
    }
}

/// Walks `proof` from `state_root` along `keccak256(address)` and returns the account leaf.
pub fn verify_account_proof(
    state_root: &[u8; 32],
    address: &[u8; 20],
    proof: &AccountProof,
) -> Result<Account, ClaimValidationError> {
    let key = key_nibbles(address);
    let mut key_index = 0usize;
    let mut expected = NodeRef::Hash(state_root);
    let depth = proof.depth();

    for (i, node) in proof.nodes.iter().enumerate() {
        let node = node.as_slice();
        if !expected.matches(node) {
            return Err(ProofFault::NodeReference.into());
        }

        let items = rlp::decode_list(node).map_err(|_| ProofFault::RlpEncoding)?;
        let is_last = i + 1 == depth;

        match items.len() {
            BRANCH_ITEMS => {
                if key_index == KEY_NIBBLES {
                    return leaf_value(&items[16], is_last);
                }
                let child = &items[key[key_index] as usize];
                expected = NodeRef::from_field(child)?;
                key_index += 1;
            }
            2 => {
                if items[0].is_list {
                    return Err(ProofFault::TrieNode.into());
                }
                let (is_leaf, path) = decode_compact_path(items[0].payload)?;
                let end = key_index + path.len();
                if end > KEY_NIBBLES || key[key_index..end] != path[..] {
                    return Err(ProofFault::TriePath.into());
                }
                key_index = end;

                if is_leaf {
                    if key_index != KEY_NIBBLES {
                        return Err(ProofFault::TriePath.into());
                    }
                    return leaf_value(&items[1], is_last);
                }
                expected = NodeRef::from_field(&items[1])?;
                if matches!(expected, NodeRef::Empty) {
                    return Err(ProofFault::TriePath.into());
                }
            }
            _ => return Err(ProofFault::TrieNode.into()),
        }
    }

    Err(ProofFault::MissingAccount.into())
}

/// Verifies the proof and requires `balance >= required`.
pub fn verify_account_balance(
    state_root: &[u8; 32],
    address: &[u8; 20],
    proof: &AccountProof,
    required: u128,
) -> Result<Account, ClaimValidationError> {
    let account = verify_account_proof(state_root, address, proof)?;
    if !balance_gte(&account.balance, required) {
        return Err(ClaimValidationError::InsufficientBalance);
    }
    Ok(account)
}

/// Exact comparison of a 256-bit big-endian balance against a 128-bit total.
pub fn balance_gte(balance: &[u8; 32], total: u128) -> bool {
    if balance[..16].iter().any(|b| *b != 0) {
        return true;
    }
    u128::from_be_bytes(copy_array::<16>(&balance[16..])) >= total
}

pub fn key_nibbles(address: &[u8; 20]) -> [u8; KEY_NIBBLES] {
    let hash = keccak256(address);
    let mut out = [0u8; KEY_NIBBLES];
    for (i, b) in hash.iter().enumerate() {
        out[2 * i] = b >> 4;
        out[2 * i + 1] = b & 0x0f;
    }
    out
}

/// Hex-prefix encoding of a nibble path.
pub fn encode_compact_path(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd = nibbles.len() % 2 == 1;
    let flag = (if is_leaf { 2 } else { 0 }) | (odd as u8);
    let mut out = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if odd {
        out.push((flag << 4) | nibbles[0]);
        &nibbles[1..]
    } else {
        out.push(flag << 4);
        nibbles
    };
    for pair in rest.chunks(2) {
        out.push((pair[0] << 4) | pair[1]);
    }
    out
}

fn decode_compact_path(encoded: &[u8]) -> Result<(bool, Vec<u8>), ClaimValidationError> {
    let first = *encoded.first().ok_or(ProofFault::TriePath)?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(ProofFault::TriePath.into());
    }
    let is_leaf = flag & 0x2 != 0;
    let is_odd = flag & 0x1 != 0;

    let mut nibbles = Vec::with_capacity(encoded.len() * 2);
    if is_odd {
        nibbles.push(first & 0x0f);
    } else if first & 0x0f != 0 {
        return Err(ProofFault::TriePath.into());
    }
    for b in &encoded[1..] {
        nibbles.push(b >> 4);
        nibbles.push(b & 0x0f);
    }
    Ok((is_leaf, nibbles))
}

fn leaf_value(field: &RlpField<'_>, is_last: bool) -> Result<Account, ClaimValidationError> {
    if field.is_list || field.payload.is_empty() {
        return Err(ProofFault::MissingAccount.into());
    }
    if !is_last {
        return Err(ProofFault::TriePath.into());
    }
    Account::decode(field.payload)
}

enum NodeRef<'a> {
    Empty,
    Hash(&'a [u8; 32]),
    Embedded(&'a [u8]),
}

impl<'a> NodeRef<'a> {
    fn from_field(field: &RlpField<'a>) -> Result<Self, ClaimValidationError> {
        if field.is_list {
            return Ok(Self::Embedded(field.raw));
        }
        match field.payload.len() {
            0 => Ok(Self::Empty),
            32 => field
                .payload
                .try_into()
                .map(Self::Hash)
                .map_err(|_| ProofFault::TrieNode.into()),
            _ => Err(ProofFault::TrieNode.into()),
        }
    }

    fn matches(&self, node: &[u8]) -> bool {
        match self {
            Self::Empty => false,
            Self::Hash(hash) => keccak256(node) == **hash,
            Self::Embedded(raw) => *raw == node,
        }
    }
}
