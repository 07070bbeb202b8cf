//! # Error Types
//!
//! Domain-specific error types for hisab-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hisab-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hisab-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  hisab-engine errors                                                   │
//! │  └── EngineError      - What callers see (kind + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → HTTP layer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the ledger and the stock allocator.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record is absent or soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The product has no conversion factor for the requested unit.
    #[error("Unit {unit_id} is not defined for product {product_id}")]
    UnknownUnit { product_id: String, unit_id: String },

    /// Requested quantity exceeds what can be allocated.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line: 6 × product P at store
    ///      │
    ///      ▼
    /// FEFO walk: B1=3, B2=2 → available=5
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: P, holder: "store", batch: None,
    ///                     available: 5, requested: 6 }
    /// ```
    #[error("{}", insufficient_stock_message(.product_id, .holder, .batch, .available, .requested))]
    InsufficientStock {
        product_id: String,
        /// Where the stock was looked for: `warehouse`, `store`, `employee:<id>`.
        holder: String,
        batch: Option<String>,
        available: i64,
        requested: i64,
    },

    /// A cash-like account would go negative.
    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: String,
        balance: Money,
        requested: Money,
    },

    /// The operation contradicts existing state (double reversal, duplicate
    /// active account, restoring an active document, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }
}

fn insufficient_stock_message(
    product_id: &str,
    holder: &str,
    batch: &Option<String>,
    available: &i64,
    requested: &i64,
) -> String {
    match batch {
        Some(batch) => format!(
            "Insufficient stock for product {product_id} batch {batch} at {holder}: available {available}, requested {requested}"
        ),
        None => format!(
            "Insufficient stock for product {product_id} at {holder}: available {available}, requested {requested}"
        ),
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request doesn't meet requirements.
/// Raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (currency code, date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields contradict each other.
    #[error("{0}")]
    Inconsistent(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
