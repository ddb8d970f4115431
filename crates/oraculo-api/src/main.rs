//! oraculo-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! local SQLite store, and serves the JSON API. Local state is served
//! immediately; the startup merge against the cloud snapshot runs in the
//! background.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth.password_hash` in
//! config.toml:
//!
//! ```text
//! cargo run -p oraculo-api --bin oraculo-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::Router;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use oraculo_api::{AppState, ServerConfig, api_router};
use oraculo_assistant::Assistant;
use oraculo_store_sqlite::SqliteStore;
use oraculo_sync::{HttpRemote, SyncEngine};

#[derive(Parser)]
#[command(author, version, about = "Oráculo bid-management server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
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
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ORACULO"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the local store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // Remote snapshot store; absent means offline mode.
  let remote = match &server_cfg.remote {
    Some(cfg) => Some(Arc::new(
      HttpRemote::new(cfg.clone()).context("failed to build remote client")?,
    )),
    None => {
      tracing::info!("no remote configured; cloud sync disabled");
      None
    }
  };
  let engine = Arc::new(SyncEngine::new(store.clone(), remote));

  // Assistant gateway; absent means the endpoints answer 503.
  let assistant = match server_cfg.assistant.clone() {
    Some(cfg) => Some(Assistant::new(cfg).context("failed to build assistant")?),
    None => None,
  };

  let state = AppState {
    store,
    engine: engine.clone(),
    assistant,
    auth: server_cfg.auth.clone().map(Arc::new),
    default_operator: server_cfg.default_operator.clone(),
  };

  // Startup merge: local state is already being served when this lands.
  tokio::spawn(async move {
    match engine.sync_from_remote().await {
      Ok(true) => tracing::info!("startup merge applied the cloud snapshot"),
      Ok(false) => {
        tracing::info!("no cloud snapshot merged; local state is authoritative");
      }
      Err(e) => tracing::error!(error = %e, "startup merge could not persist"),
    }
  });

  let app = Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
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
