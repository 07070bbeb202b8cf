//! # Engine Error Type
//!
//! The single error type returned by every engine operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Layering in Hisab                              │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                     │
//! │   (shape checks)     (rules)     │                                     │
//! │                                  ├──► EngineError { kind, message }    │
//! │  sqlx::Error ──────► DbError ────┘          │                          │
//! │                      (storage)              ▼                          │
//! │                                  { "code": "INSUFFICIENT_STOCK",       │
//! │                                    "message": "Insufficient stock ..." }│
//! │                                                                         │
//! │  Any error drops the unit of work → the transaction rolls back.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is retried inside the engine. Callers decide.

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use hisab_core::{CoreError, ValidationError};
use hisab_db::DbError;

/// Machine-readable failure category.
///
/// ## Serialization
/// ```json
/// "VALIDATION_FAILURE" | "NOT_FOUND" | "INSUFFICIENT_FUNDS"
/// "INSUFFICIENT_STOCK" | "CONFLICT"  | "INTERNAL"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or contradictory input.
    ValidationFailure,
    /// A referenced record is absent or soft-deleted.
    NotFound,
    /// A cashier or safe account would go negative.
    InsufficientFunds,
    /// Not enough stock in the requested holder/batch.
    InsufficientStock,
    /// The request contradicts existing state.
    Conflict,
    /// Storage failure or timeout. Details are logged, not returned.
    Internal,
}

/// Error returned from engine operations.
///
/// Serialises as `{ "code": ..., "message": ... }`.
#[derive(Debug, Clone, Serialize, Error)]
#[error("[{kind:?}] {message}")]
pub struct EngineError {
    #[serde(rename = "code")]
    pub kind: ErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EngineError {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::new(ErrorKind::ValidationFailure, message)
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::new(ErrorKind::NotFound, format!("{entity} not found: {id}"))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        EngineError::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::new(ErrorKind::Internal, message)
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::validation(err.to_string())
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        let kind = match &err {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::UnknownUnit { .. } => ErrorKind::ValidationFailure,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::ValidationFailure,
        };
        EngineError::new(kind, err.to_string())
    }
}

/// Storage errors keep their category where the caller can act on it;
/// everything else is logged and reported as `Internal`.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                EngineError::conflict(format!("{field} '{value}' already exists"))
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                EngineError::validation("Invalid reference")
            }
            DbError::Busy => EngineError::internal("Database is busy"),
            other => {
                error!("Database operation failed: {}", other);
                EngineError::internal("Database operation failed")
            }
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        error!("Snapshot serialization failed: {}", err);
        EngineError::internal("Snapshot serialization failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hisab_core::Money;

    #[test]
    fn test_serializes_as_code_and_message() {
        let err = EngineError::conflict("Entry e-1 is already reversed");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CONFLICT");
        assert_eq!(json["message"], "Entry e-1 is already reversed");
    }

    #[test]
    fn test_core_errors_keep_their_category() {
        let stock: EngineError = CoreError::InsufficientStock {
            product_id: "p".to_string(),
            holder: "store".to_string(),
            batch: None,
            available: 5,
            requested: 6,
        }
        .into();
        assert_eq!(stock.kind(), ErrorKind::InsufficientStock);
        assert!(stock.message.contains("store"));

        let funds: EngineError = CoreError::InsufficientFunds {
            account_id: "a".to_string(),
            balance: Money::from_cents(100),
            requested: Money::from_cents(200),
        }
        .into();
        assert_eq!(funds.kind(), ErrorKind::InsufficientFunds);

        let unit: EngineError = CoreError::UnknownUnit {
            product_id: "p".to_string(),
            unit_id: "box".to_string(),
        }
        .into();
        assert_eq!(unit.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn test_db_errors_hide_internals() {
        let err: EngineError = DbError::QueryFailed("near SELECT: syntax error".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.message.contains("syntax"));

        let dup: EngineError = DbError::duplicate("account", "customer/c-1").into();
        assert_eq!(dup.kind(), ErrorKind::Conflict);
    }
}
