mod cli;
mod commands;
mod config;
mod render;

use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use tracing::debug;

use parley_db::Database;
use parley_view::{Cache, MessageStore, ViewContext};

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    if cli.command.needs_remote() && config.functions_url.is_none() {
        bail!("PARLEY_FUNCTIONS_URL must be set for this command");
    }

    let db = Arc::new(Database::open(&config.db_path)?);
    let (ctx, mut notices) = ViewContext::new(
        config.user_id.clone(),
        config.language.clone(),
        MessageStore::new(),
        Cache::new(db),
        config.backend()?,
    );
    debug!(user_id = %config.user_id, language = %config.language, "context ready");

    let result = commands::run(cli.command, ctx).await;

    while let Ok(notice) = notices.try_recv() {
        render::notice(&notice);
    }
    result
}
