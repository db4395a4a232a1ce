//! CSV import command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::{db::Database, import::parse_csv, models::ImportStats};
use tracing::info;

/// Import a CSV, then move uncategorized expenses to keyword categories
/// unless `categorize` is false
pub fn cmd_import(
    db: &Database,
    file: &Path,
    account_name: &str,
    user_id: i64,
    categorize: bool,
) -> Result<ImportStats> {
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    let user = db.require_user(user_id)?;

    println!("📥 Importing {} for {}...", file.display(), user.name);

    let parsed = parse_csv(csv_file).context("Failed to parse CSV")?;
    let account_id = db.upsert_account(user_id, account_name)?;

    let mut stats = db.import_transactions(user_id, account_id, &parsed.rows)?;
    stats.invalid = parsed.invalid;
    if categorize {
        stats.categorized = db.auto_categorize(user_id)?;
    }

    info!(
        user_id,
        account = account_name,
        imported = stats.imported,
        skipped = stats.skipped,
        invalid = stats.invalid,
        categorized = stats.categorized,
        "Import finished"
    );

    println!();
    println!("📊 Import Results");
    println!("   ─────────────────────────────");
    println!("   Imported:           {}", stats.imported);
    println!("   Skipped (dupes):    {}", stats.skipped);
    if stats.invalid > 0 {
        println!("   ⚠️  Invalid rows:    {}", stats.invalid);
    }
    if stats.categories_created > 0 {
        println!("   New categories:     {}", stats.categories_created);
    }
    if stats.categorized > 0 {
        println!("   Auto-categorized:   {}", stats.categorized);
    }
    println!("✅ Import complete!");

    Ok(stats)
}
