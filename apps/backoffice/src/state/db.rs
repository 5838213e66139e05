//! # Database State
//!
//! Wraps the `Database` handle shared by all commands.
//!
//! ## Thread Safety
//! `Database` holds a `SqlitePool`, which is thread-safe. Commands run
//! queries concurrently without explicit locking; writers are serialised by
//! SQLite itself.

use mostrador_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let products = state.db.inner().products().search("arroz", 20).await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
