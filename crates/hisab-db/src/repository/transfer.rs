//! # Stock Transfer Repository

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use hisab_core::allocation::BatchDraw;
use hisab_core::StockTransfer;

/// Repository for stock transfer documents.
pub struct TransferRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TransferRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        TransferRepository { conn }
    }

    pub async fn find(&mut self, id: &str) -> DbResult<Option<StockTransfer>> {
        let transfer = sqlx::query_as::<_, StockTransfer>("SELECT * FROM stock_transfers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(transfer)
    }

    pub async fn get_active(&mut self, id: &str) -> DbResult<StockTransfer> {
        sqlx::query_as::<_, StockTransfer>(
            "SELECT * FROM stock_transfers WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| DbError::not_found("StockTransfer", id))
    }

    pub async fn insert(&mut self, transfer: &StockTransfer) -> DbResult<()> {
        debug!(
            id = %transfer.id,
            product_id = %transfer.product_id,
            base_quantity = transfer.base_quantity,
            "Inserting stock transfer"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_transfers (
                id, product_id, unit_id, quantity, base_quantity,
                from_kind, from_employee_id, to_kind, to_employee_id,
                batch_number, batches_moved, notes,
                created_by_id, created_by_name, is_deleted, deleted_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.product_id)
        .bind(&transfer.unit_id)
        .bind(transfer.quantity)
        .bind(transfer.base_quantity)
        .bind(transfer.from_kind)
        .bind(&transfer.from_employee_id)
        .bind(transfer.to_kind)
        .bind(&transfer.to_employee_id)
        .bind(&transfer.batch_number)
        .bind(Json(&transfer.batches_moved))
        .bind(&transfer.notes)
        .bind(&transfer.created_by_id)
        .bind(&transfer.created_by_name)
        .bind(transfer.is_deleted)
        .bind(transfer.deleted_at)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Stores the batches a restored transfer drew this time.
    pub async fn update_batches_moved(
        &mut self,
        id: &str,
        batches_moved: &[BatchDraw],
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE stock_transfers SET batches_moved = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(Json(batches_moved))
            .bind(now)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_deleted(&mut self, id: &str, deleted: bool, now: DateTime<Utc>) -> DbResult<()> {
        let deleted_at = if deleted { Some(now) } else { None };
        let result = sqlx::query(
            "UPDATE stock_transfers SET is_deleted = ?2, deleted_at = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(deleted)
        .bind(deleted_at)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockTransfer", id));
        }
        Ok(())
    }
}
