//! Spendcast CLI - Spending trends and forecasts
//!
//! Usage:
//!   spendcast init                          Initialize database
//!   spendcast import --file CSV             Import transactions
//!   spendcast trends --period month         Per-category trends with forecast
//!   spendcast cashflow --months 12          Monthly income vs expenses
//!   spendcast serve --port 3000             Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init { user } => commands::cmd_init(&cli.db, &user, cli.no_encrypt),
        Commands::Users => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_users(&db)
        }
        Commands::Categories { user, kind } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_categories(&db, user, kind.as_deref())
        }
        Commands::Import {
            file,
            account,
            user,
            no_categorize,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file, &account, user, !no_categorize).map(|_| ())
        }
        Commands::Transactions { user, limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_transactions_list(&db, user, limit).map(|_| ())
        }
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_accounts_list(&db, 1),
                Some(AccountsAction::List { user }) => commands::cmd_accounts_list(&db, user),
                Some(AccountsAction::SetBalance {
                    account,
                    balance,
                    user,
                }) => commands::cmd_accounts_set_balance(&db, user, &account, balance),
            }
        }
        Commands::Trends {
            period,
            date,
            user,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_trends(&db, config, user, &period, date.as_deref(), json)
                .await
                .map(|_| ())
        }
        Commands::Summary {
            from,
            to,
            user,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_summary(&db, user, from.as_deref(), to.as_deref(), json)
        }
        Commands::Spending {
            from,
            to,
            user,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_spending(&db, user, from.as_deref(), to.as_deref(), json)
        }
        Commands::Cashflow { months, user, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_cashflow(&db, user, months, json).map(|_| ())
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            user,
            allowed_origins,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let options = commands::ServeOptions {
                no_auth,
                default_user_id: user,
                allowed_origins,
                trends: config,
            };
            commands::cmd_serve(&cli.db, &host, port, options, cli.no_encrypt).await
        }
    }
}
