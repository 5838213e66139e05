//! # mostrador-db: Database Layer for Mostrador
//!
//! SQLite persistence with sqlx: pool, migrations and repositories. All
//! stock changes happen here, inside one transaction per operation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mostrador Data Flow                              │
//! │                                                                         │
//! │  Backoffice command (save_sale)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  mostrador-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ product, party│    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ sale, purchase│    │ 001_initial  │  │   │
//! │  │   │               │    │ stock, config │    │              │  │   │
//! │  │   │               │    │ report        │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file in the platform data directory                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mostrador_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("mostrador.db")).await?;
//! let low = db.products().low_stock(5).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::config::{CompanyProfileInput, CompanyRepository, ConfigRepository};
pub use repository::party::{ClientRepository, SupplierRepository};
pub use repository::product::ProductRepository;
pub use repository::purchase::{NewPurchase, PurchaseFilter, PurchaseRepository};
pub use repository::report::{
    InventoryValuation, PaymentBreakdown, PurchaseSummary, ReportRepository, SalesSummary,
    TopProduct,
};
pub use repository::sale::{NewSale, SaleFilter, SaleRepository};
pub use repository::stock::StockRepository;
