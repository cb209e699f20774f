use serde::Deserialize;
use shadow_proof_core::{
    bytes::{decode_hex_fixed, encode_hex},
    compute_notes_hash, compute_pow_digest, compute_recipient_hash, derive_nullifier,
    derive_target_address, find_valid_secret, pow_digest_is_valid, Note, NoteSlots,
    ProtocolConfig,
};

const VECTORS: &str = include_str!("../../../testdata/vectors.json");

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorFile {
    version: String,
    max_notes: usize,
    cases: Vec<VectorCase>,
    pow_search: PowSearch,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorCase {
    name: String,
    secret: String,
    chain_id: String,
    notes: Vec<VectorNote>,
    recipient_hashes: Vec<String>,
    notes_hash: String,
    target_address: String,
    nullifiers: Vec<String>,
    pow_digest: String,
    pow_valid: bool,
}

#[derive(Deserialize)]
struct VectorNote {
    recipient: String,
    amount: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PowSearch {
    seed_material: String,
    attempts: u64,
    secret: String,
}

fn load() -> VectorFile {
    serde_json::from_str(VECTORS).expect("vectors.json parses")
}

#[test]
fn vector_file_header() {
    let file = load();
    assert_eq!(file.version, "v1");
    assert_eq!(file.max_notes, shadow_proof_core::MAX_NOTES);
    assert!(!file.cases.is_empty());
}

#[test]
fn derivations_match_vectors() {
    let cfg = ProtocolConfig::CLAIM_V1;
    for case in load().cases {
        let secret: [u8; 32] = decode_hex_fixed(&case.secret).unwrap();
        let chain_id: u64 = case.chain_id.parse().unwrap();
        let notes: Vec<Note> = case
            .notes
            .iter()
            .map(|n| Note {
                recipient: decode_hex_fixed(&n.recipient).unwrap(),
                amount: n.amount.parse().unwrap(),
            })
            .collect();

        for (note, expected) in notes.iter().zip(&case.recipient_hashes) {
            assert_eq!(
                &encode_hex(&compute_recipient_hash(&note.recipient)),
                expected,
                "{}: recipient hash",
                case.name
            );
        }

        let slots = NoteSlots::from_notes(&cfg, &notes).unwrap();
        let notes_hash = compute_notes_hash(&slots);
        assert_eq!(encode_hex(&notes_hash), case.notes_hash, "{}: notes hash", case.name);
        assert_eq!(
            encode_hex(&derive_target_address(&secret, chain_id, &notes_hash)),
            case.target_address,
            "{}: target address",
            case.name
        );

        assert_eq!(case.nullifiers.len(), notes.len());
        for (i, expected) in case.nullifiers.iter().enumerate() {
            assert_eq!(
                &encode_hex(&derive_nullifier(&secret, chain_id, i as u32)),
                expected,
                "{}: nullifier {i}",
                case.name
            );
        }

        let digest = compute_pow_digest(&secret);
        assert_eq!(encode_hex(&digest), case.pow_digest, "{}: pow digest", case.name);
        assert_eq!(pow_digest_is_valid(&cfg, &digest), case.pow_valid, "{}", case.name);
    }
}

#[test]
fn pow_search_matches_vector() {
    let search = load().pow_search;
    let cfg = ProtocolConfig::CLAIM_V1;

    let solution = find_valid_secret(&cfg, search.seed_material.as_bytes(), search.attempts).unwrap();
    assert_eq!(encode_hex(&solution.secret), search.secret);
    assert_eq!(solution.attempts, search.attempts);

    assert!(find_valid_secret(&cfg, search.seed_material.as_bytes(), search.attempts - 1).is_err());
}
