use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shadow_proof_core::{bytes::encode_hex, ClaimInput, ClaimJournal, ProtocolConfig};
use shadow_prover_lib::{
    build_claim_input, check_vectors, derive_deposit_info,
    deposit::timestamp_now,
    inspect_claim, load_claim_input, load_deposit, load_snapshot, load_vectors, mine_deposit,
    mining::DEFAULT_MAX_ATTEMPTS,
    read_witness, write_deposit_file, write_json, write_witness, MineNote, MineRequest, ProofFile,
    ProofPayload,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "shadow-cli")]
#[command(about = "Create Shadow deposits and check claims locally")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mine a pow-valid secret and write a new deposit file.
    Mine {
        #[arg(long, env = "SHADOW_CHAIN_ID")]
        chain_id: u64,
        /// `<recipient>:<amount>[:label]`, repeat once per note.
        #[arg(long = "note", required = true)]
        notes: Vec<MineNote>,
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
        #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u64,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Print the values derived from a deposit file.
    Derive {
        #[arg(long)]
        deposit: PathBuf,
    },
    /// Evaluate a note claim against a saved chain snapshot.
    Inspect {
        #[arg(long)]
        deposit: PathBuf,
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long = "note", default_value_t = 0)]
        note_index: u32,
        /// Write an unproven v2 proof file here (a directory gets a generated name).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write the binary claim witness handed to the prover.
        #[arg(long)]
        witness: Option<PathBuf>,
    },
    /// Evaluate a claim witness (native or legacy JSON, or a binary witness).
    CheckInput {
        #[arg(long)]
        input: PathBuf,
    },
    /// Validate a v2 proof file.
    CheckProof {
        #[arg(long)]
        proof: PathBuf,
    },
    /// Run the conformance vectors against this build.
    Vectors {
        #[arg(long, default_value = "testdata/vectors.json")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shadow_cli=info,shadow_prover_lib=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Mine {
            chain_id,
            notes,
            workspace,
            max_attempts,
            comment,
        } => cmd_mine(chain_id, notes, &workspace, max_attempts, comment.as_deref()),
        Command::Derive { deposit } => cmd_derive(&deposit),
        Command::Inspect {
            deposit,
            snapshot,
            note_index,
            out,
            witness,
        } => cmd_inspect(&deposit, &snapshot, note_index, out.as_deref(), witness.as_deref()),
        Command::CheckInput { input } => cmd_check_input(&input),
        Command::CheckProof { proof } => cmd_check_proof(&proof),
        Command::Vectors { file } => cmd_vectors(&file),
    }
}

fn cmd_mine(
    chain_id: u64,
    notes: Vec<MineNote>,
    workspace: &Path,
    max_attempts: u64,
    comment: Option<&str>,
) -> Result<()> {
    let req = MineRequest { chain_id, notes };
    let mined = mine_deposit(&ProtocolConfig::DEPOSIT_V1, &req, max_attempts)?;
    let path = write_deposit_file(&ProtocolConfig::DEPOSIT_V1, workspace, &req, &mined, comment)?;

    println!("Deposit: {}", path.display());
    println!("targetAddress: {}", encode_hex(&mined.target_address));
    println!("notesHash: {}", encode_hex(&mined.notes_hash));
    println!("powDigest: {}", encode_hex(&mined.pow_digest));
    println!("attempts: {}", mined.attempts);
    Ok(())
}

fn cmd_derive(deposit_path: &Path) -> Result<()> {
    let deposit = load_deposit(deposit_path)?;
    let info = derive_deposit_info(&ProtocolConfig::DEPOSIT_V1, &deposit)?;

    println!("chainId: {}", info.chain_id);
    println!("targetAddress: {}", encode_hex(&info.target_address));
    println!("notesHash: {}", encode_hex(&info.notes_hash));
    println!("totalAmount: {}", info.total_amount);
    println!("powDigest: {} (valid: {})", encode_hex(&info.pow_digest), info.pow_valid);
    for note in &info.notes {
        println!(
            "note[{}]: {} -> {} nullifier {}{}",
            note.index,
            note.amount,
            encode_hex(&note.recipient),
            encode_hex(&note.nullifier),
            note.label
                .as_deref()
                .map(|l| format!(" ({l})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_inspect(
    deposit_path: &Path,
    snapshot_path: &Path,
    note_index: u32,
    out: Option<&Path>,
    witness: Option<&Path>,
) -> Result<()> {
    let deposit = load_deposit(deposit_path)?;
    // Claims are checked against the claim ceiling, not the deposit-creation one.
    let info = derive_deposit_info(&ProtocolConfig::CLAIM_V1, &deposit)?;
    if !info.pow_valid {
        bail!("deposit secret does not satisfy the pow target; it cannot be claimed");
    }
    let snapshot = load_snapshot(snapshot_path)?;
    let input = build_claim_input(&info, note_index, &snapshot)?;
    let journal = inspect_claim(&ProtocolConfig::CLAIM_V1, &input)?;

    println!("Claim validated: note {note_index} of {}", deposit_path.display());
    print_journal(&journal);

    if let Some(path) = witness {
        write_witness(path, &input)?;
        println!("Witness: {}", path.display());
    }

    if let Some(out) = out {
        let deposit_name = deposit_path
            .file_name()
            .and_then(|n| n.to_str())
            .context("deposit path has no file name")?;
        let file = ProofFile::from_journal(
            deposit_name,
            note_index,
            &journal,
            ProofPayload::unproven(&journal),
        );
        let path = if out.is_dir() {
            file.write_to_dir(out, &timestamp_now())?
        } else {
            write_json(out, &file)?;
            out.to_path_buf()
        };
        info!(path = %path.display(), "wrote proof file");
        println!("Proof file: {}", path.display());
    }
    Ok(())
}

fn cmd_check_input(input_path: &Path) -> Result<()> {
    let input: ClaimInput = if input_path.extension().is_some_and(|e| e == "bin") {
        read_witness(input_path)?
    } else {
        load_claim_input(input_path)?
    };
    let journal = inspect_claim(&ProtocolConfig::CLAIM_V1, &input)?;

    println!("Input validated: {}", input_path.display());
    // noteIndex is a private witness; it is not part of the public journal.
    println!("noteIndex: {}", input.note_index);
    print_journal(&journal);
    Ok(())
}

fn cmd_check_proof(proof_path: &Path) -> Result<()> {
    let file = ProofFile::load(proof_path)?;
    let journal = file
        .validate()
        .with_context(|| format!("invalid proof file {}", proof_path.display()))?;

    println!("Proof file valid: {}", proof_path.display());
    println!("receiptKind: {}", file.proof.receipt_kind);
    println!("noteIndex: {}", file.note_index);
    print_journal(&journal);
    Ok(())
}

fn cmd_vectors(path: &Path) -> Result<()> {
    let file = load_vectors(path)?;
    let report = check_vectors(&ProtocolConfig::CLAIM_V1, &file)?;
    println!(
        "Vectors passed: {} cases, {} checks ({})",
        report.cases,
        report.checks,
        path.display()
    );
    Ok(())
}

fn print_journal(journal: &ClaimJournal) {
    println!("blockNumber: {}", journal.block_number);
    println!("blockHash: {}", encode_hex(&journal.block_hash));
    println!("chainId: {}", journal.chain_id);
    println!("amount: {}", journal.amount);
    println!("recipient: {}", encode_hex(&journal.recipient));
    println!("nullifier: {}", encode_hex(&journal.nullifier));
    println!(
        "publicInputsDigest: 0x{}",
        hex::encode(journal.public_inputs().digest())
    );
}
