//! # hisab-engine: Ledger & Inventory Movement Engine
//!
//! Records the money and stock effects of sales, purchases, stock
//! transfers, expenses, income, payments and returns, atomically and with
//! a reversible audit trail.
//!
//! ## Component Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           hisab-engine                                  │
//! │                                                                         │
//! │  Engine (public facade, one unit of work per call)                     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  orchestrator::{sale, returns, purchase, transfer, money}              │
//! │     │                 │                       │                         │
//! │     ▼                 ▼                       ▼                         │
//! │  allocator         journal ──────────►  ledger                         │
//! │  (stock rows)      (signed entries,     (balances,                      │
//! │                     reversal, pairing)   non-negative rule)            │
//! │     │                 │                       │                         │
//! │     └─────────────────┴──────► audit ◄────────┘                         │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                      hisab-db UnitOfWork (SQLite tx)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use hisab_core::{AccountType, Actor, Money};
//! use hisab_engine::{Engine, EngineConfig, OpenAccountRequest};
//!
//! # async fn demo() -> Result<(), hisab_engine::EngineError> {
//! let config = EngineConfig::in_memory();
//! hisab_engine::telemetry::init(&config);
//! let engine = Engine::open(config).await?;
//!
//! let actor = Actor::new("u-1", "Admin");
//! let safe = engine
//!     .open_account(
//!         &actor,
//!         &OpenAccountRequest {
//!             account_type: AccountType::Safe,
//!             ref_id: None,
//!             name: "Main Safe".to_string(),
//!             opening_balance: Money::from_major_minor(1_000, 0),
//!             currency: None,
//!         },
//!     )
//!     .await?;
//! assert!(engine.verify_balance(&safe.id).await?.is_consistent());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod requests;
pub mod telemetry;

mod allocator;
mod audit;
mod context;
mod journal;
mod ledger;
mod orchestrator;

pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use requests::*;
