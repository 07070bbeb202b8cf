//! # Journal Repository
//!
//! Storage for journal entries. Rows are append-only; the only update is
//! stamping reversal metadata on an entry once its counter-entry exists.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use hisab_core::{DocumentRef, JournalEntry};

/// Repository for journal entry storage.
pub struct JournalRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> JournalRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        JournalRepository { conn }
    }

    /// Appends an entry.
    pub async fn insert(&mut self, entry: &JournalEntry) -> DbResult<()> {
        debug!(
            id = %entry.id,
            account_id = %entry.account_id,
            amount_cents = entry.amount_cents,
            "Inserting journal entry"
        );

        sqlx::query(
            r#"
            INSERT INTO journal_entries (
                id, account_id, kind, amount_cents,
                reference_type, reference_id, transfer_group_id, description,
                is_reversed, reversed_by_entry_id, reversal_of_entry_id,
                reversed_at, reversed_by_name, reversal_reason,
                created_by_id, created_by_name, is_deleted, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14,
                ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account_id)
        .bind(entry.kind)
        .bind(entry.amount_cents)
        .bind(entry.reference_type)
        .bind(&entry.reference_id)
        .bind(&entry.transfer_group_id)
        .bind(&entry.description)
        .bind(entry.is_reversed)
        .bind(&entry.reversed_by_entry_id)
        .bind(&entry.reversal_of_entry_id)
        .bind(entry.reversed_at)
        .bind(&entry.reversed_by_name)
        .bind(&entry.reversal_reason)
        .bind(&entry.created_by_id)
        .bind(&entry.created_by_name)
        .bind(entry.is_deleted)
        .bind(entry.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a live entry by ID.
    pub async fn get(&mut self, id: &str) -> DbResult<JournalEntry> {
        sqlx::query_as::<_, JournalEntry>(
            "SELECT * FROM journal_entries WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| DbError::not_found("JournalEntry", id))
    }

    /// Stamps reversal metadata on `id`.
    ///
    /// ## Returns
    /// `false` if the entry was already reversed (nothing changed).
    pub async fn mark_reversed(
        &mut self,
        id: &str,
        reversed_by_entry_id: &str,
        reversed_at: DateTime<Utc>,
        reversed_by_name: &str,
        reason: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE journal_entries
            SET is_reversed = 1,
                reversed_by_entry_id = ?2,
                reversed_at = ?3,
                reversed_by_name = ?4,
                reversal_reason = ?5
            WHERE id = ?1 AND is_reversed = 0
            "#,
        )
        .bind(id)
        .bind(reversed_by_entry_id)
        .bind(reversed_at)
        .bind(reversed_by_name)
        .bind(reason)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// All live entries sharing a transfer group, in posting order.
    pub async fn list_by_transfer_group(&mut self, group_id: &str) -> DbResult<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT * FROM journal_entries
            WHERE transfer_group_id = ?1 AND is_deleted = 0
            ORDER BY rowid
            "#,
        )
        .bind(group_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(entries)
    }

    /// Legacy pairing for transfer entries posted without a group id:
    /// the oldest ungrouped, non-reversed Transfer entry by the same
    /// creator, on another account, with exactly the negated amount.
    pub async fn find_legacy_transfer_sibling(
        &mut self,
        entry: &JournalEntry,
    ) -> DbResult<Option<JournalEntry>> {
        let sibling = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT * FROM journal_entries
            WHERE kind = 'transfer'
              AND transfer_group_id IS NULL
              AND id != ?1
              AND account_id != ?2
              AND created_by_id = ?3
              AND amount_cents = ?4
              AND is_reversed = 0
              AND reversal_of_entry_id IS NULL
              AND is_deleted = 0
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.account_id)
        .bind(&entry.created_by_id)
        .bind(-entry.amount_cents)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(sibling)
    }

    /// Entries for a document that are still in effect: not reversed and
    /// not themselves counter-entries.
    pub async fn list_live_by_reference(
        &mut self,
        reference: &DocumentRef,
    ) -> DbResult<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT * FROM journal_entries
            WHERE reference_type = ?1
              AND reference_id = ?2
              AND is_reversed = 0
              AND reversal_of_entry_id IS NULL
              AND is_deleted = 0
            ORDER BY rowid
            "#,
        )
        .bind(reference.reference_type())
        .bind(reference.id())
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(entries)
    }

    /// Full history of an account, in posting order.
    pub async fn list_for_account(&mut self, account_id: &str) -> DbResult<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT * FROM journal_entries
            WHERE account_id = ?1 AND is_deleted = 0
            ORDER BY rowid
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(entries)
    }

    /// Σ amount over entries that are neither reversed nor counter-entries.
    pub async fn sum_effective(&mut self, account_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM journal_entries
            WHERE account_id = ?1
              AND is_reversed = 0
              AND reversal_of_entry_id IS NULL
              AND is_deleted = 0
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(total)
    }

    /// Σ amount over every live entry, counter-entries included.
    pub async fn sum_all(&mut self, account_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM journal_entries
            WHERE account_id = ?1 AND is_deleted = 0
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(total)
    }
}
