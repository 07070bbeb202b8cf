//! # hisab-db: Database Layer for the Hisab ledger engine
//!
//! This crate provides storage for the ledger and stock engine.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hisab Data Flow                                  │
//! │                                                                         │
//! │  Orchestrator call (record_sale, record_purchase, ...)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     hisab-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ AccountRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │    │ JournalRepo   │    │ 001_initial_ │  │   │
//! │  │   │ UnitOfWork    │◄───│ StockRepo     │    │   schema.sql │  │   │
//! │  │   │ writer gate   │    │ SaleRepo ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and units of work
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per table family
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hisab_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("hisab.db")).await?;
//!
//! let mut uow = db.unit_of_work().await?;
//! let account = uow.accounts().get_active(&account_id).await?;
//! uow.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, UnitOfWork};

// Repository re-exports for convenience
pub use repository::account::AccountRepository;
pub use repository::audit::AuditRepository;
pub use repository::journal::JournalRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::{EmployeeStockRepository, StockRepository};
pub use repository::transfer::TransferRepository;
