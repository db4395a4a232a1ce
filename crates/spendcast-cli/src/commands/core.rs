//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Resolve the trend configuration
//! - `cmd_init` - Initialize the database
//! - `cmd_users` / `cmd_categories` / `cmd_transactions_list` - Listings
//! - `cmd_accounts_list` / `cmd_accounts_set_balance` - Account balances

use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::config::default_config_path;
use spendcast_core::models::{CategoryKind, Transaction};
use spendcast_core::{db::Database, TrendConfig};
use tracing::debug;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load trend configuration: --config path, then user override, then defaults
pub fn load_config(path: Option<&Path>) -> Result<TrendConfig> {
    let config = TrendConfig::load(path).context("Failed to load trend configuration")?;
    debug!(
        explicit = ?path,
        override_path = ?default_config_path(),
        "Loaded trend configuration"
    );
    Ok(config)
}

pub fn cmd_init(db_path: &Path, user_name: &str, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let user_id = db
        .upsert_user(user_name)
        .context("Failed to create default user")?;
    println!("   User: {} (id {})", user_name, user_id);

    if no_encrypt || !db.is_encrypted()? {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!(
        "  1. Import transactions: spendcast import --file statement.csv --user {}",
        user_id
    );
    println!(
        "  2. See trends: spendcast trends --period month --user {}",
        user_id
    );

    Ok(())
}

pub fn cmd_users(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users yet. Run 'spendcast init' to create one.");
        return Ok(());
    }

    println!("👤 Users");
    println!("   {:>4}  {:<24} Created", "ID", "Name");
    println!("   ─────────────────────────────────────────────");
    for user in users {
        println!(
            "   {:>4}  {:<24} {}",
            user.id,
            super::truncate(&user.name, 24),
            user.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub fn cmd_categories(db: &Database, user_id: i64, kind: Option<&str>) -> Result<()> {
    let kind: Option<CategoryKind> = kind
        .map(|k| k.parse().map_err(|e: String| anyhow::anyhow!(e)))
        .transpose()?;

    db.require_user(user_id)?;
    let categories = db.list_categories(user_id, kind)?;

    if categories.is_empty() {
        println!("No categories found. Import transactions first.");
        return Ok(());
    }

    println!("🏷️  Categories");
    for category in categories {
        println!(
            "   {:>4}  {:<8} {}",
            category.id, category.kind.as_str(), category.name
        );
    }

    Ok(())
}

pub fn cmd_transactions_list(db: &Database, user_id: i64, limit: i64) -> Result<Vec<Transaction>> {
    db.require_user(user_id)?;
    let transactions = db.list_transactions(user_id, None, None, limit)?;

    if transactions.is_empty() {
        println!("No transactions found. Import a CSV first.");
        return Ok(transactions);
    }

    println!("📋 Recent transactions");
    for tx in &transactions {
        let sign = match tx.kind {
            CategoryKind::Income => '+',
            CategoryKind::Expense => '-',
        };
        println!(
            "   {}  {}${:>10.2}  {}",
            tx.occurred_at.date(),
            sign,
            tx.amount,
            super::truncate(&tx.description, 40)
        );
    }

    Ok(transactions)
}

pub fn cmd_accounts_list(db: &Database, user_id: i64) -> Result<()> {
    db.require_user(user_id)?;
    let accounts = db.list_accounts(user_id)?;

    if accounts.is_empty() {
        println!("No accounts found. Import transactions first.");
        return Ok(());
    }

    println!("🏦 Accounts");
    let mut total = 0.0;
    for account in &accounts {
        println!("   {:<24} ${:>12.2}", account.name, account.balance);
        total += account.balance;
    }
    println!("   ─────────────────────────────────────");
    println!("   {:<24} ${:>12.2}", "Total", total);

    Ok(())
}

pub fn cmd_accounts_set_balance(
    db: &Database,
    user_id: i64,
    account_name: &str,
    balance: f64,
) -> Result<()> {
    db.require_user(user_id)?;
    db.set_account_balance(user_id, account_name, balance)?;

    println!("✅ {} balance set to ${:.2}", account_name, balance);
    Ok(())
}
