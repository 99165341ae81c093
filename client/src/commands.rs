//! Subcommand handlers.
//!
//! Each handler does its own I/O and returns `anyhow::Result` so failures
//! reach the user with the context of what was being attempted. Signed
//! artifacts are exchanged between commands as one line of upper-case hex
//! holding the wire encoding.

use anyhow::{bail, Context, Result};
use rand::RngCore;
use serde_json::json;
use std::path::Path;
use tracing::info;

use tessera_protocol::config::ClientConfig;
use tessera_protocol::crypto::{KeyFile, Pkcs8KeyDecryptor, TxSignature, WalletKeypair};
use tessera_protocol::network::{AnnouncerClient, RepeaterClient, WireMessage};
use tessera_protocol::transaction::{
    batch, build_proposal, sign_transaction, Transaction, TransactionBuilder,
};

use crate::cli::{CheckArgs, KeyArgs, KeygenArgs, ProposeArgs, SignArgs, SubmitArgs};

/// Length of a generated nonce.
const RANDOM_NONCE_BYTES: usize = 16;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decrypts the key file named in `args`.
fn unlock(args: &KeyArgs) -> Result<WalletKeypair> {
    let key_file = KeyFile::load(&args.key)
        .with_context(|| format!("failed to load key file {}", args.key.display()))?;
    key_file
        .unlock(&Pkcs8KeyDecryptor, args.passphrase.as_bytes())
        .with_context(|| format!("failed to unlock key file {}", args.key.display()))
}

/// Hex when it decodes as hex, otherwise the text's own bytes.
fn bytes_from_text(text: &str) -> Vec<u8> {
    let trimmed = text.strip_prefix("0x").unwrap_or(text);
    match hex::decode(trimmed) {
        Ok(bytes) if !trimmed.is_empty() => bytes,
        _ => text.as_bytes().to_vec(),
    }
}

/// Writes `bytes` as a line of hex to `out`, or stdout when `None`.
fn emit_hex(bytes: &[u8], out: Option<&Path>) -> Result<()> {
    let line = hex::encode_upper(bytes);
    match out {
        Some(path) => std::fs::write(path, format!("{}\n", line))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", line);
            Ok(())
        }
    }
}

/// Reads a signed transaction written by [`sign`].
pub fn read_transaction(path: &Path) -> Result<Transaction> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let bytes = hex::decode(text.trim())
        .with_context(|| format!("{} is not a hex-encoded transaction", path.display()))?;
    Transaction::from_wire(&bytes)
        .with_context(|| format!("{} does not hold a valid transaction", path.display()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `tessera keygen`
pub fn keygen(args: &KeygenArgs) -> Result<()> {
    if args.out.exists() {
        bail!("refusing to overwrite existing file {}", args.out.display());
    }
    if args.passphrase.is_empty() {
        bail!("passphrase must not be empty");
    }

    let keypair = WalletKeypair::generate();
    let key_file = KeyFile::seal(&keypair, args.passphrase.as_bytes())
        .context("failed to encrypt the new key")?;
    key_file
        .save(&args.out)
        .with_context(|| format!("failed to save key file {}", args.out.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&args.out, std::fs::Permissions::from_mode(0o600))?;
    }

    info!(address = %keypair.address(), path = %args.out.display(), "wallet key generated");
    println!("{}", keypair.address());
    Ok(())
}

/// `tessera sign`
pub fn sign(args: &SignArgs) -> Result<Transaction> {
    let keypair = unlock(&args.key)?;

    let builder = TransactionBuilder::new(args.operation).transfers(args.transfers.iter().cloned());
    let builder = match &args.nonce {
        Some(text) => builder.nonce_text(text),
        None => {
            let mut nonce = vec![0u8; RANDOM_NONCE_BYTES];
            rand::thread_rng().fill_bytes(&mut nonce);
            builder.nonce(nonce)
        }
    };
    let unsigned = builder.build().context("invalid transaction")?;
    let signed = sign_transaction(&unsigned, &keypair).context("failed to sign transaction")?;

    emit_hex(&signed.to_wire()?, args.out.as_deref())?;
    if let Some(sig) = signed.signature() {
        info!(signature = %sig, "transaction signed");
    }
    Ok(signed)
}

/// `tessera propose`
pub fn propose(args: &ProposeArgs) -> Result<()> {
    let keypair = unlock(&args.key)?;
    let payload = bytes_from_text(&args.data);

    let proposal = build_proposal(&args.oracle, &payload, &keypair.address(), &keypair)
        .with_context(|| format!("failed to build proposal for {}", args.oracle))?;

    emit_hex(&proposal.to_wire()?, args.out.as_deref())
}

/// `tessera submit`
pub async fn submit(args: &SubmitArgs, config: &ClientConfig) -> Result<()> {
    let transactions = args
        .transactions
        .iter()
        .map(|path| read_transaction(path))
        .collect::<Result<Vec<_>>>()?;
    let signatures: Vec<String> = transactions
        .iter()
        .filter_map(|tx| tx.signature().map(TxSignature::to_hex))
        .collect();

    let envelope = batch(transactions).context("cannot batch transactions")?;

    let mut announcer = AnnouncerClient::connect(config)
        .await
        .with_context(|| format!("failed to connect to announcer {}", config.announcer_endpoint))?;
    let ack = announcer
        .submit(&envelope)
        .await
        .context("envelope submission failed")?;

    let output = json!({
        "submitted": signatures,
        "acknowledgment": hex::encode_upper(ack.as_bytes()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// `tessera check`
pub async fn check(args: &CheckArgs, config: &ClientConfig) -> Result<()> {
    let signature = TxSignature::from_hex(&args.signature)
        .with_context(|| format!("{:?} is not a hex signature", args.signature))?;

    let mut repeater = RepeaterClient::connect(config)
        .await
        .with_context(|| format!("failed to connect to repeater {}", config.repeater_endpoint))?;

    let output = if args.height_only {
        let height = repeater.check_transaction(&signature).await?;
        json!({ "signature": signature.to_hex(), "height": height })
    } else {
        let inclusion = repeater.confirm_inclusion(&signature).await?;
        json!({
            "signature": signature.to_hex(),
            "height": inclusion.height,
            "index": inclusion.index,
            "block_hash": inclusion.block.hash_hex(),
            "block_time": inclusion.block.block_time,
            "transactions": inclusion.block.transactions.len(),
        })
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
