//! # Mostrador Back Office
//!
//! Command layer for the store's back office: catalog, clients and
//! suppliers, sale and purchase drafts, settings and reports.
//!
//! ## Module Organization
//! ```text
//! mostrador_backoffice/
//! ├── lib.rs          ◄─── Startup helpers (logging, db path, state)
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState
//! │   ├── db.rs       ◄─── Database wrapper
//! │   ├── drafts.rs   ◄─── Sale and purchase drafts
//! │   └── config.rs   ◄─── Effective settings
//! ├── commands/       ◄─── One module per command group
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing
//! 2. Determine database path (`MOSTRADOR_DB_PATH` or app data directory)
//! 3. Connect to database and run migrations
//! 4. Load settings and start empty drafts

pub mod commands;
pub mod error;
pub mod state;

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mostrador_db::{DbConfig, DbError};
use state::AppState;

/// Environment variable overriding the database file location.
pub const DB_PATH_ENV: &str = "MOSTRADOR_DB_PATH";

/// Failures before the first command can run.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Could not determine app data directory")]
    NoDataDir,

    #[error("Could not create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default `info,mostrador=debug,sqlx=warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mostrador=debug,sqlx=warn"));

    // A second call (tests, embedding hosts) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.mostrador.backoffice/mostrador.db`
/// - **Windows**: `%APPDATA%\mostrador\backoffice\data\mostrador.db`
/// - **Linux**: `~/.local/share/backoffice/mostrador.db`
pub fn database_path() -> Result<PathBuf, StartupError> {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let dirs = ProjectDirs::from("com", "mostrador", "backoffice").ok_or(StartupError::NoDataDir)?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("mostrador.db"))
}

/// Opens the database at [`database_path`] and builds the state.
pub async fn open_state() -> Result<AppState, StartupError> {
    let path = database_path()?;
    info!(?path, "Opening database");

    Ok(AppState::open(DbConfig::new(path)).await?)
}
