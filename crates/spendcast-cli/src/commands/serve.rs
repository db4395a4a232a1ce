//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use spendcast_core::TrendConfig;
use spendcast_server::{parse_api_keys, ServerConfig, API_KEYS_ENV};

use super::open_db;

/// Options for `spendcast serve`
pub struct ServeOptions {
    pub no_auth: bool,
    pub default_user_id: i64,
    pub allowed_origins: Vec<String>,
    pub trends: TrendConfig,
}

/// Build the server configuration from CLI options and the raw API key list
pub fn build_server_config(options: ServeOptions, api_keys: &str) -> Result<ServerConfig> {
    let api_keys = parse_api_keys(api_keys)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Invalid {}", API_KEYS_ENV))?;

    Ok(ServerConfig {
        require_auth: !options.no_auth,
        allowed_origins: options.allowed_origins,
        api_keys,
        default_user_id: options.default_user_id,
        trends: options.trends,
    })
}

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    options: ServeOptions,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Spendcast web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let config = build_server_config(options, &std::env::var(API_KEYS_ENV).unwrap_or_default())?;

    if !config.require_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
        println!("      All requests act as user {}", config.default_user_id);
    } else if config.api_keys.is_empty() {
        println!("   ⚠️  No API keys configured - set {} (key:user_id,...)", API_KEYS_ENV);
    } else {
        println!(
            "   🔑 API keys: {} configured ({})",
            config.api_keys.len(),
            API_KEYS_ENV
        );
    }
    if !config.allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", config.allowed_origins.join(", "));
    }

    println!();

    let db = open_db(db_path, no_encrypt)?;
    spendcast_server::serve(db, host, port, config).await
}
