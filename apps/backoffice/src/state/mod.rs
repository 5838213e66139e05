//! # State Module
//!
//! Application state shared by the back-office commands.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │                          AppState                                       │
//! │          ┌──────────────────┼──────────────────┐                       │
//! │          ▼                  ▼                  ▼                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐              │
//! │  │   DbState    │  │  DraftState  │  │   ConfigState    │              │
//! │  │              │  │              │  │                  │              │
//! │  │  Database    │  │  Arc<Mutex<  │  │  RwLock<         │              │
//! │  │  (SQLite     │  │   sale,      │  │    Settings      │              │
//! │  │   pool)      │  │   purchase>> │  │  >               │              │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘              │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • DraftState: Mutex held only for synchronous draft operations        │
//! │  • ConfigState: RwLock, readers take snapshots                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take `&AppState` and reach for the part they need.

mod config;
mod db;
mod drafts;

pub use config::{
    ConfigState, Settings, KEY_CURRENCY_SYMBOL, KEY_LOW_STOCK, KEY_STORE_NAME, KEY_TAX_RATE,
};
pub use db::DbState;
pub use drafts::DraftState;

use mostrador_db::{Database, DbConfig, DbResult};
use tracing::info;

/// Everything a command may need.
#[derive(Debug)]
pub struct AppState {
    pub db: DbState,
    pub config: ConfigState,
    pub drafts: DraftState,
}

impl AppState {
    /// Opens the database, loads settings and starts empty drafts.
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        let db = Database::new(config).await?;
        Self::from_database(db).await
    }

    pub async fn from_database(db: Database) -> DbResult<Self> {
        let config = ConfigState::load(&db).await?;
        let settings = config.snapshot();
        info!(
            store = %settings.store_name,
            tax = %settings.tax_rate,
            "Back office state initialized"
        );

        Ok(AppState {
            db: DbState::new(db),
            drafts: DraftState::new(settings.tax_rate),
            config,
        })
    }

    pub fn db(&self) -> &Database {
        self.db.inner()
    }
}
