mod api;
mod app;
mod auth;
mod cache;
mod commands;
mod config;
mod derived;
mod event;
mod logging;
mod query;
mod ui;
mod validation;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "i9s")]
#[command(about = "A terminal dashboard for an inventory and point-of-sale API, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/i9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the inventory API, overriding the config file
  #[arg(short, long)]
  api_url: Option<String>,

  /// View to open at startup
  #[arg(short, long, default_value = "dashboard")]
  view: String,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Logging is optional; the UI works without it
  let _log_guard = match logging::init() {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("warning: {}", e);
      None
    }
  };

  let config = config::Config::load(args.config.as_deref())?.apply_overrides(args.api_url);

  let initial_view = app::VIEW_COMMANDS
    .iter()
    .copied()
    .find(|name| commands::find(&args.view).is_some_and(|cmd| cmd.name == *name))
    .ok_or_else(|| {
      eyre!(
        "Unknown view '{}'. Expected one of: {}",
        args.view,
        app::VIEW_COMMANDS.join(", ")
      )
    })?;

  info!(base_url = %config.api.base_url, view = initial_view, "starting i9s");

  let client = api::ApiClient::from_config(&config)?;
  let query_cache = match config.cache.max_age() {
    Some(max_age) => cache::QueryCache::new().with_max_age(max_age),
    None => cache::QueryCache::new(),
  };
  let api = api::CachedApiClient::new(client, query_cache);
  let auth = auth::AuthGate::from_env(config::Config::get_admin_password());

  let mut app = app::App::new(config, api, auth, initial_view);
  app.run().await?;

  Ok(())
}
