//! # hisab-core: Pure Business Logic for the Hisab ledger engine
//!
//! This crate contains the deterministic half of the ledger & inventory
//! movement engine: money arithmetic, domain types, unit conversion and the
//! FEFO/FIFO allocation planner. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hisab Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP layer (external, not in this workspace)         │   │
//! │  │      validated request DTOs + Actor { id, name }                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 hisab-engine (orchestrators)                    │   │
//! │  │   Sale, Purchase, Transfer, Payment, Expense, Reversal          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ hisab-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   units   │  │allocation │  │   │
//! │  │   │  Account  │  │   Money   │  │ to_base   │  │   FEFO    │  │   │
//! │  │   │  Journal  │  │ mul_div   │  │ from_base │  │  planner  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    hisab-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, unit of work               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Account, JournalEntry, StockRecord, Sale, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`units`] - Unit conversion resolver (unit quantity ⇄ base quantity)
//! - [`allocation`] - FEFO/FIFO batch allocation planner
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use hisab_core::money::Money;
//!
//! let cost = Money::from_major_minor(50, 0);
//! let total = cost * 10_i64;
//! assert_eq!(total, Money::from_major_minor(500, 0));
//! ```

pub mod allocation;
pub mod error;
pub mod money;
pub mod types;
pub mod units;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Batch identifier used for products that are not tracked by batch.
///
/// Keeping a real batch row for untracked products lets the allocator run
/// one algorithm for every product.
pub const DEFAULT_BATCH: &str = "DEFAULT";

/// Default currency tag for new accounts when the caller does not supply one.
pub const DEFAULT_CURRENCY: &str = "AFN";

/// Maximum line items allowed on a single sale or purchase.
pub const MAX_DOCUMENT_ITEMS: usize = 500;
