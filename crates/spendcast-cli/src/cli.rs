//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendcast - Spending trends and next-period forecasts
#[derive(Parser)]
#[command(name = "spendcast")]
#[command(about = "Per-category spending trends and forecasts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "spendcast.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SPENDCAST_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Trend configuration file (weights, thresholds, lookbacks)
    ///
    /// Falls back to the user override file, then to built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and create the first user
    Init {
        /// Name of the user to create
        #[arg(long, default_value = "default")]
        user: String,
    },

    /// List users
    Users,

    /// List a user's categories
    Categories {
        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Only show one kind: income or expense
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Import transactions from CSV (Date,Description,Amount[,Category])
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Account name
        #[arg(short, long, default_value = "Default")]
        account: String,

        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Skip keyword categorization of uncategorized expenses
        #[arg(long)]
        no_categorize: bool,
    },

    /// List recent transactions
    Transactions {
        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// List accounts or record an account balance
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Show per-category spending trends with next-period forecast
    Trends {
        /// Period unit: day, week, month
        #[arg(short, long)]
        period: String,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show income, expenses and net income
    Summary {
        /// Start date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show spending by expense category
    Spending {
        /// Start date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show monthly income, expenses and savings rate
    Cashflow {
        /// Trailing months to include
        #[arg(short, long, default_value = "12")]
        months: u32,

        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, requests need a Bearer API key from SPENDCAST_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// User that owns every request when authentication is disabled
        #[arg(short, long, default_value = "1")]
        user: i64,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List accounts with their balances
    List {
        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,
    },

    /// Record the current balance of an account
    SetBalance {
        /// Account name
        account: String,

        /// Balance (negative for money owed)
        #[arg(allow_hyphen_values = true)]
        balance: f64,

        /// User ID
        #[arg(short, long, default_value = "1")]
        user: i64,
    },
}
