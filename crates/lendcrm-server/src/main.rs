//! lendcrm server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API under `/api`.
//!
//! # Creating the first admin
//!
//! Admin accounts cannot be created through the API. Bootstrap one with:
//!
//! ```text
//! cargo run -p lendcrm-server -- --create-admin root
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use lendcrm_api::{AppState, api_router, auth::hash_password};
use lendcrm_core::admin;
use lendcrm_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "lendcrm API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create an admin with this username (password read from stdin) and exit.
  #[arg(long, value_name = "USERNAME")]
  create_admin: Option<String>,
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LENDCRM_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:              String,
  #[serde(default = "default_port")]
  port:              u16,
  #[serde(default = "default_store_path")]
  store_path:        PathBuf,
  #[serde(default = "default_session_ttl_hours")]
  session_ttl_hours: u32,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3001 }

fn default_store_path() -> PathBuf { PathBuf::from("lendcrm.db") }

fn default_session_ttl_hours() -> u32 { 12 }

fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("LENDCRM"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = rpassword_or_stdin()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = load_config(cli.config)?;
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: bootstrap an admin and exit.
  if let Some(username) = cli.create_admin {
    let password = rpassword_or_stdin()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("{e}"))?;
    let user = admin::bootstrap_admin(&store, &username, hash)
      .await
      .with_context(|| format!("failed to create admin {username:?}"))?;
    println!("created admin {} (id {})", user.username, user.id);
    return Ok(());
  }

  let state = AppState::new(Arc::new(store), server_cfg.session_ttl_hours);
  let app = Router::new().nest("/api", api_router(state));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin (no echo).
fn rpassword_or_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']).to_string();
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  Ok(password)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
