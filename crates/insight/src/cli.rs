use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use insight_core::BalanceKind;

/// Query an Insight blockchain explorer API from the command line.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Base URL of the API, including the trailing `/`.
    #[arg(
        long,
        default_value = "http://127.0.0.1:3001/insight-api/",
        env = "INSIGHT_API_URL"
    )]
    pub api_url: String,

    /// Username for Basic or Digest authentication.
    #[arg(long, env = "INSIGHT_API_USER")]
    pub user: Option<String>,

    /// Password for Basic or Digest authentication.
    #[arg(long, env = "INSIGHT_API_PASS")]
    pub pass: Option<String>,

    /// Send credentials with HTTP Basic authentication.
    #[arg(long)]
    pub basic_auth: bool,

    /// Answer HTTP Digest challenges. Wins over --basic-auth.
    #[arg(long)]
    pub digest_auth: bool,

    /// Per-request timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Retry failed requests with exponential backoff until they succeed
    /// or Ctrl-C is pressed.
    #[arg(long)]
    pub retry: bool,

    /// Log every failed attempt and the wait before the next one.
    #[arg(long)]
    pub verbose_retry: bool,

    /// First wait between retries, in milliseconds.
    #[arg(long, default_value = "1000")]
    pub initial_backoff_ms: u64,

    /// Factor applied to the wait after each failed attempt.
    #[arg(long, default_value = "2.0")]
    pub backoff_multiplier: f64,

    /// Ceiling for the wait between retries, in seconds.
    #[arg(long, default_value = "60")]
    pub max_backoff_secs: u64,

    /// Client-side cap on outbound requests per second.
    #[arg(long)]
    pub requests_per_second: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show a block by hash.
    Block { hash: String },

    /// Print the hash of the main-chain block at a height.
    BlockHash { height: u64 },

    /// Print a serialized block as hex.
    RawBlock { hash: String },

    /// List block summaries for one UTC day (today by default).
    Blocks {
        #[arg(long, default_value = "10")]
        limit: u32,

        /// Day to list, as YYYY-MM-DD.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show a transaction by id.
    Tx { txid: String },

    /// Print a serialized transaction as hex.
    RawTx { txid: String },

    /// Show an address summary.
    Address {
        address: String,

        /// Omit the transaction id list.
        #[arg(long, conflicts_with_all = ["from", "to"])]
        no_tx_list: bool,

        #[arg(long)]
        from: Option<u64>,

        #[arg(long)]
        to: Option<u64>,
    },

    /// Print one of the plain-text address amounts.
    Balance {
        address: String,

        #[arg(long, value_enum, default_value_t = AmountKind::Balance)]
        kind: AmountKind,

        /// Print bitcoin instead of satoshis.
        #[arg(long)]
        btc: bool,
    },

    /// List unspent outputs of one or more addresses.
    Utxo {
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// List every transaction touching one or more addresses.
    History {
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Print the net value a transaction moved into an address.
    Gain { txid: String, address: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AmountKind {
    Balance,
    TotalReceived,
    TotalSent,
    Unconfirmed,
}

impl From<AmountKind> for BalanceKind {
    fn from(kind: AmountKind) -> Self {
        match kind {
            AmountKind::Balance => BalanceKind::Balance,
            AmountKind::TotalReceived => BalanceKind::TotalReceived,
            AmountKind::TotalSent => BalanceKind::TotalSent,
            AmountKind::Unconfirmed => BalanceKind::UnconfirmedBalance,
        }
    }
}
