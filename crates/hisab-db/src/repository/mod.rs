//! # Repository Module
//!
//! Table-level storage for the ledger engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories inside a Unit of Work                   │
//! │                                                                         │
//! │  Orchestrator (hisab-engine)                                           │
//! │       │                                                                 │
//! │       │  let mut uow = db.unit_of_work().await?;                        │
//! │       │  uow.accounts().apply_delta(id, -300, now).await?;              │
//! │       │  uow.journal().insert(&entry).await?;                           │
//! │       ▼                                                                 │
//! │  XxxRepository<'c> { conn: &'c mut SqliteConnection }                  │
//! │       │                                                                 │
//! │       │  Every repository borrows the unit of work's transaction,      │
//! │       │  so all writes of one operation commit or vanish together.     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`](account::AccountRepository) - Accounts, get-or-create, balance deltas
//! - [`JournalRepository`](journal::JournalRepository) - Journal entries and reversal links
//! - [`StockRepository`](stock::StockRepository) / [`EmployeeStockRepository`](stock::EmployeeStockRepository)
//! - [`ProductRepository`](product::ProductRepository) - Products, units, conversion factors
//! - [`SaleRepository`](sale::SaleRepository) - Sales, items, returns
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Purchases and items
//! - [`TransferRepository`](transfer::TransferRepository) - Stock transfers
//! - [`AuditRepository`](audit::AuditRepository) - Audit trail

pub mod account;
pub mod audit;
pub mod journal;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod stock;
pub mod transfer;
