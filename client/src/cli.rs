//! # CLI Interface
//!
//! Command-line structure for `tessera` using `clap` derive. Network
//! settings come from an optional JSON config file and can be overridden
//! per flag or through `TESSERA_*` environment variables.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tessera_protocol::config::ClientConfig;
use tessera_protocol::transaction::{Operation, Transfer};

/// Tessera wallet client.
///
/// Signs transactions and oracle proposals, submits them to a shard's
/// announcer, and asks the shard's repeater where they were finalized.
#[derive(Parser, Debug)]
#[command(
    name = "tessera",
    about = "Tessera wallet client",
    version,
    propagate_version = true
)]
pub struct TesseraCli {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Log output format.
    #[arg(long, global = true, env = "TESSERA_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a wallet key and write it as an encrypted key file.
    Keygen(KeygenArgs),
    /// Build and sign a transaction. Prints the signed transaction as hex.
    Sign(SignArgs),
    /// Build and sign an oracle proposal. Prints the proposal as hex.
    Propose(ProposeArgs),
    /// Submit signed transactions to the announcer in one envelope.
    Submit(SubmitArgs),
    /// Ask the repeater which block holds a transaction and fetch it.
    Check(CheckArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Where the shard lives. Flags win over the config file.
#[derive(Args, Debug, Default)]
pub struct NetworkArgs {
    /// Path to a JSON client config file.
    #[arg(long, short = 'c', global = true, env = "TESSERA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Announcer endpoint, `host:port`.
    #[arg(long, global = true, env = "TESSERA_ANNOUNCER")]
    pub announcer: Option<String>,

    /// Repeater endpoint, `host:port`.
    #[arg(long, global = true, env = "TESSERA_REPEATER")]
    pub repeater: Option<String>,

    /// Shard identifier used in query URIs.
    #[arg(long, global = true, env = "TESSERA_SHARD")]
    pub shard: Option<String>,

    /// Receive timeout per request, in milliseconds.
    #[arg(long, global = true, env = "TESSERA_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,
}

impl NetworkArgs {
    /// Lays the flag overrides on top of `base`.
    pub fn apply(&self, mut base: ClientConfig) -> ClientConfig {
        if let Some(endpoint) = &self.announcer {
            base.announcer_endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &self.repeater {
            base.repeater_endpoint = endpoint.clone();
        }
        if let Some(shard) = &self.shard {
            base.shard = shard.clone();
        }
        if let Some(ms) = self.timeout_ms {
            base.request_timeout_ms = ms;
        }
        base
    }
}

/// Location and passphrase of an encrypted key file.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Encrypted key file written by `tessera keygen`.
    #[arg(long, short = 'k', env = "TESSERA_KEY_FILE")]
    pub key: PathBuf,

    /// Passphrase protecting the key file.
    #[arg(long, env = "TESSERA_PASSPHRASE", hide_env_values = true)]
    pub passphrase: String,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Where to write the key file. Refuses to overwrite.
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    /// Passphrase to encrypt the new key with.
    #[arg(long, env = "TESSERA_PASSPHRASE", hide_env_values = true)]
    pub passphrase: String,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Operation: create, modify, exchange, delete, or its numeric code.
    #[arg(long, default_value = "exchange")]
    pub operation: Operation,

    /// Transfer as `ADDRESS:COIN:AMOUNT[:DELAY]`. Repeat for each leg.
    #[arg(long = "transfer", short = 't', required = true)]
    pub transfers: Vec<Transfer>,

    /// Nonce, as hex or plain text. Random 16 bytes when omitted.
    #[arg(long)]
    pub nonce: Option<String>,

    /// Write the signed transaction here instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProposeArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Fully-qualified oracle name, e.g. `prices.btc_usd`.
    #[arg(long)]
    pub oracle: String,

    /// Payload, as hex or plain text.
    #[arg(long)]
    pub data: String,

    /// Write the proposal here instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Files holding signed transactions, as written by `tessera sign`.
    #[arg(required = true)]
    pub transactions: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// DER signature of the transaction, hex.
    pub signature: String,

    /// Only report the block height; do not fetch the block.
    #[arg(long)]
    pub height_only: bool,
}
