//! # Storage Errors
//!
//! What can go wrong below the engine: a missing row, a constraint the
//! ledger schema enforces, or SQLite itself.
//!
//! ```text
//! sqlx::Error ──► DbError ──► EngineError (hisab-engine)
//!                    │
//!                    └── constraint text parsed into the table and
//!                        columns that refused the write
//! ```

use thiserror::Error;

/// Storage failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// No live row with this id. Soft-deleted rows count as missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A partial UNIQUE index refused the write: a second live account for
    /// one `(type, ref_id)`, a second stock row for one batch and holder,
    /// or a document id posted twice.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A line, entry or stock row points at a product or account that
    /// does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK in the schema failed, e.g. `quantity >= 0` on a stock row.
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    /// Another process held the write lock past `busy_timeout`.
    #[error("Database is busy")]
    Busy,

    /// The ledger file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN, COMMIT or ROLLBACK of a unit of work failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every pooled connection stayed checked out past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// `NotFound` for a repository lookup.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// `UniqueViolation` raised by a repository that checked first.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Maps SQLite's constraint message onto a variant.
    ///
    /// SQLite reports `UNIQUE constraint failed: accounts.account_type,
    /// accounts.ref_id`; the columns become `accounts(account_type, ref_id)`.
    fn from_sqlite_message(msg: &str) -> Self {
        if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
            return DbError::UniqueViolation {
                field: unique_target(columns),
                value: "unknown".to_string(),
            };
        }
        if msg.contains("FOREIGN KEY constraint failed") {
            return DbError::ForeignKeyViolation {
                message: msg.to_string(),
            };
        }
        if msg.contains("CHECK constraint failed") {
            return DbError::CheckViolation(msg.to_string());
        }
        if msg.contains("database is locked") || msg.contains("database is busy") {
            return DbError::Busy;
        }
        DbError::QueryFailed(msg.to_string())
    }
}

/// `t.a, t.b` → `t(a, b)`.
fn unique_target(columns: &str) -> String {
    let mut table = None;
    let mut names = Vec::new();
    for qualified in columns.split(',').map(str::trim) {
        match qualified.split_once('.') {
            Some((t, column)) => {
                table.get_or_insert(t);
                names.push(column);
            }
            None => names.push(qualified),
        }
    }
    match table {
        Some(table) => format!("{table}({})", names.join(", ")),
        None => names.join(", "),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_message_names_table_and_columns() {
        let err = DbError::from_sqlite_message(
            "UNIQUE constraint failed: accounts.account_type, accounts.ref_id",
        );
        match err {
            DbError::UniqueViolation { field, .. } => assert_eq!(field, "accounts(account_type, ref_id)"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_constraint_messages() {
        assert!(matches!(
            DbError::from_sqlite_message("CHECK constraint failed: quantity >= 0"),
            DbError::CheckViolation(_)
        ));
        assert!(matches!(
            DbError::from_sqlite_message("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(DbError::from_sqlite_message("database is locked"), DbError::Busy));
        assert!(matches!(
            DbError::from_sqlite_message("near \"SELEC\": syntax error"),
            DbError::QueryFailed(_)
        ));
    }
}
