//! # Account Repository
//!
//! Storage for ledger accounts.
//!
//! ## Get-or-create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT OR IGNORE INTO accounts (...)                                   │
//! │       │                                                                 │
//! │       ├── no live row for (type, ref_id) → row inserted                 │
//! │       └── live row exists → partial UNIQUE index swallows the insert    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT ... WHERE account_type = ? AND ref_id = ? AND is_deleted = 0    │
//! │                                                                         │
//! │  Two racing callers both end up with the same single row.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use hisab_core::{Account, AccountType};

/// Repository for account storage.
pub struct AccountRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AccountRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        AccountRepository { conn }
    }

    /// Inserts an account. Fails with `UniqueViolation` when a live
    /// account already holds the same `(type, ref_id)`.
    pub async fn insert(&mut self, account: &Account) -> DbResult<()> {
        debug!(id = %account.id, account_type = account.account_type.as_str(), "Inserting account");

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, account_type, ref_id, name,
                opening_balance_cents, current_balance_cents, currency,
                is_deleted, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&account.id)
        .bind(account.account_type)
        .bind(&account.ref_id)
        .bind(&account.name)
        .bind(account.opening_balance_cents)
        .bind(account.current_balance_cents)
        .bind(&account.currency)
        .bind(account.is_deleted)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.deleted_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Inserts unless a live account already holds `(type, ref_id)`.
    ///
    /// ## Returns
    /// `true` if the row was inserted.
    pub async fn insert_or_ignore(&mut self, account: &Account) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO accounts (
                id, account_type, ref_id, name,
                opening_balance_cents, current_balance_cents, currency,
                is_deleted, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, NULL)
            "#,
        )
        .bind(&account.id)
        .bind(account.account_type)
        .bind(&account.ref_id)
        .bind(&account.name)
        .bind(account.opening_balance_cents)
        .bind(account.current_balance_cents)
        .bind(&account.currency)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *self.conn)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(
            account_type = account.account_type.as_str(),
            ref_id = ?account.ref_id,
            inserted,
            "Get-or-create account"
        );
        Ok(inserted)
    }

    /// Gets an account by ID regardless of lifecycle.
    pub async fn find_by_id(&mut self, id: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(account)
    }

    /// Gets a live account by ID.
    pub async fn get_active(&mut self, id: &str) -> DbResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?1 AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found("Account", id))
    }

    /// Finds the live account for `(type, ref_id)`.
    pub async fn find_active_by_ref(
        &mut self,
        account_type: AccountType,
        ref_id: &str,
    ) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM accounts
            WHERE account_type = ?1 AND ref_id = ?2 AND is_deleted = 0
            "#,
        )
        .bind(account_type)
        .bind(ref_id)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(account)
    }

    /// Lists live accounts of one type, oldest first.
    pub async fn list_active_by_type(&mut self, account_type: AccountType) -> DbResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE account_type = ?1 AND is_deleted = 0 ORDER BY rowid",
        )
        .bind(account_type)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(accounts)
    }

    /// Adds `delta_cents` to the current balance.
    ///
    /// ## Returns
    /// The balance after the update.
    pub async fn apply_delta(
        &mut self,
        id: &str,
        delta_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        debug!(id = %id, delta_cents, "Applying balance delta");

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET current_balance_cents = current_balance_cents + ?2,
                updated_at = ?3
            WHERE id = ?1
            RETURNING current_balance_cents
            "#,
        )
        .bind(id)
        .bind(delta_cents)
        .bind(now)
        .fetch_optional(&mut *self.conn)
        .await?;

        balance.ok_or_else(|| DbError::not_found("Account", id))
    }

    /// Flips the soft-delete flag.
    pub async fn set_deleted(
        &mut self,
        id: &str,
        deleted: bool,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let deleted_at = if deleted { Some(now) } else { None };
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET is_deleted = ?2, deleted_at = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(deleted)
        .bind(deleted_at)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }
        Ok(())
    }
}
