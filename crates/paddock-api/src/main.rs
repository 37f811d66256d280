//! paddock server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `PADDOCK_*` environment variables, opens the SQLite store, and serves the
//! REST API. Two admin subcommands manage accounts outside the API:
//!
//! ```text
//! paddock create-superuser --email admin@example.com   # password on stdin
//! paddock delete-user --email rider@example.com
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use paddock_api::{AppState, ServerConfig, auth, error::ApiError};
use paddock_core::{store::PaddockStore, user::normalize_email};
use paddock_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Paddock telemetry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create a staff superuser; the password is read from stdin.
  CreateSuperuser {
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    name:  String,
  },
  /// Delete an account with all of its horses and readings.
  DeleteUser {
    #[arg(long)]
    email: String,
  },
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

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store = SqliteStore::open(&server_cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.database_path))?;

  let state = AppState::new(store, server_cfg);

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(state).await,
    Command::CreateSuperuser { email, name } => create_superuser(&state, &email, &name).await,
    Command::DeleteUser { email } => delete_user(&state, &email).await,
  }
}

async fn serve(state: AppState<SqliteStore>) -> anyhow::Result<()> {
  let address = format!("{}:{}", state.config.host, state.config.port);
  let app = paddock_api::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn create_superuser(
  state: &AppState<SqliteStore>,
  email: &str,
  name: &str,
) -> anyhow::Result<()> {
  let password = read_password()?;
  let user = auth::create_account(&*state.store, email, &password, name, true)
    .await
    .map_err(describe)?;
  println!("created superuser {} (id {})", user.email, user.id);
  Ok(())
}

async fn delete_user(state: &AppState<SqliteStore>, email: &str) -> anyhow::Result<()> {
  let email = normalize_email(email).context("invalid email")?;
  let user = state
    .store
    .find_user_by_email(email.clone())
    .await?
    .with_context(|| format!("no user with email {email}"))?;

  // Image files are not covered by the database cascade.
  let images: Vec<String> = state
    .store
    .list_horses(user.id)
    .await?
    .into_iter()
    .filter_map(|h| h.image)
    .collect();

  state.store.delete_user(user.id).await?;
  for image in &images {
    state.media.remove(image).await;
  }
  println!("deleted user {email}");
  Ok(())
}

/// Turn an API error into a message fit for the terminal.
fn describe(e: ApiError) -> anyhow::Error {
  match e {
    ApiError::Validation(errors) => anyhow::anyhow!("{errors}"),
    other => anyhow::anyhow!("{other}"),
  }
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
