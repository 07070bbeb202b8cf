//! # Validation Module
//!
//! Input validation for engine requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer (external)                                        │
//! │  ├── Deserialization into typed request structs                        │
//! │  └── Authentication → Actor                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Orchestrator entry (Rust)                                    │
//! │  └── THIS MODULE: shape checks before any unit of work opens           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Inside the unit of work                                      │
//! │  ├── Account types / lifecycle                                         │
//! │  ├── Funds and stock availability                                      │
//! │  └── Partial UNIQUE indexes (SQLite)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hisab_core::validation::{validate_quantity, validate_paid_amount};
//! use hisab_core::Money;
//!
//! validate_quantity(5).unwrap();
//! validate_paid_amount(Money::from_cents(300), Money::from_cents(500)).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Actor, StockHolder};
use crate::MAX_DOCUMENT_ITEMS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (accounts, products).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a batch number when one is given.
///
/// ## Example
/// ```rust
/// use hisab_core::validation::validate_batch_number;
///
/// assert!(validate_batch_number("B20260101-1A2B3C4D").is_ok());
/// assert!(validate_batch_number("").is_err());
/// assert!(validate_batch_number("has space").is_err());
/// ```
pub fn validate_batch_number(batch: &str) -> ValidationResult<()> {
    if batch.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "batch_number".to_string(),
        });
    }

    if batch.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "batch_number".to_string(),
            max: 64,
        });
    }

    if !batch
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "batch_number".to_string(),
            reason: "must contain only letters, numbers, '-', '_' and '/'".to_string(),
        });
    }

    Ok(())
}

/// Validates a currency tag: three ASCII uppercase letters.
pub fn validate_currency(currency: &str) -> ValidationResult<()> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter uppercase code".to_string(),
        });
    }
    Ok(())
}

/// Every mutating call carries an actor with both fields set.
pub fn validate_actor(actor: &Actor) -> ValidationResult<()> {
    if actor.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "actor.id".to_string(),
        });
    }
    if actor.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "actor.name".to_string(),
        });
    }
    Ok(())
}

/// Reversals and deletes must say why.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price or cost. Zero is allowed (free goods).
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates an amount that must be strictly positive (payments,
/// expenses, transfers, adjustments).
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// `0 ≤ paid ≤ total`.
///
/// ## Example
/// ```rust
/// use hisab_core::validation::validate_paid_amount;
/// use hisab_core::Money;
///
/// assert!(validate_paid_amount(Money::from_cents(0), Money::from_cents(100)).is_ok());
/// assert!(validate_paid_amount(Money::from_cents(101), Money::from_cents(100)).is_err());
/// ```
pub fn validate_paid_amount(paid: Money, total: Money) -> ValidationResult<()> {
    if paid.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "paid".to_string(),
            min: 0,
            max: total.cents(),
        });
    }
    if paid > total {
        return Err(ValidationError::Inconsistent(format!(
            "paid amount {paid} exceeds total {total}"
        )));
    }
    Ok(())
}

// =============================================================================
// Document Validators
// =============================================================================

/// A document needs between 1 and MAX_DOCUMENT_ITEMS lines.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    if count > MAX_DOCUMENT_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_DOCUMENT_ITEMS as i64,
        });
    }
    Ok(())
}

/// A stock transfer must move between two different holders.
pub fn validate_transfer_endpoints(from: &StockHolder, to: &StockHolder) -> ValidationResult<()> {
    if from == to {
        return Err(ValidationError::Inconsistent(format!(
            "source and destination are both {}",
            from.label()
        )));
    }
    Ok(())
}

/// `price × quantity` for one document line.
///
/// ## Errors
/// `OutOfRange` when the product does not fit in cents.
pub fn line_total(field: &str, price: Money, quantity: i64) -> ValidationResult<Money> {
    price
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        })
}

/// Adds one line to a running document total.
pub fn add_line(total: Money, line: Money) -> ValidationResult<Money> {
    total.checked_add(line).ok_or_else(|| ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: i64::MAX,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
