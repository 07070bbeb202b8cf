//! # Sale Repository
//!
//! Storage for sales, sale items and sale returns.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert_sale() + insert_item() per line, batches_used as JSON   │
//! │                                                                         │
//! │  2. (OPTIONAL) RETURN                                                  │
//! │     └── insert_return() + add_returned() on the item                   │
//! │                                                                         │
//! │  3. (OPTIONAL) DELETE                                                  │
//! │     └── set_sale_deleted(true) → items/returns deleted with it         │
//! │                                                                         │
//! │  4. (OPTIONAL) RESTORE                                                 │
//! │     └── set_sale_deleted(false)                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use hisab_core::{Sale, SaleItem, SaleReturn};

/// Repository for sale documents.
pub struct SaleRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SaleRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SaleRepository { conn }
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Gets a sale by ID regardless of lifecycle.
    pub async fn find(&mut self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(sale)
    }

    /// Gets a live sale.
    pub async fn get_active(&mut self, id: &str) -> DbResult<Sale> {
        sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1 AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    pub async fn insert_sale(&mut self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, total_cents = sale.total_cents, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer_id, employee_id, money_account_id, invoice_kind, location,
                total_cents, paid_cents, total_cost_cents, profit_cents, notes,
                created_by_id, created_by_name, is_deleted, deleted_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(&sale.employee_id)
        .bind(&sale.money_account_id)
        .bind(&sale.invoice_kind)
        .bind(sale.location)
        .bind(sale.total_cents)
        .bind(sale.paid_cents)
        .bind(sale.total_cost_cents)
        .bind(sale.profit_cents)
        .bind(&sale.notes)
        .bind(&sale.created_by_id)
        .bind(&sale.created_by_name)
        .bind(sale.is_deleted)
        .bind(sale.deleted_at)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Flips the soft-delete flag of a sale and its items.
    pub async fn set_sale_deleted(
        &mut self,
        id: &str,
        deleted: bool,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let deleted_at = if deleted { Some(now) } else { None };
        let result = sqlx::query(
            "UPDATE sales SET is_deleted = ?2, deleted_at = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(deleted)
        .bind(deleted_at)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        sqlx::query("UPDATE sale_items SET is_deleted = ?2 WHERE sale_id = ?1 AND superseded = 0")
            .bind(id)
            .bind(deleted)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    /// Rewrites the header of a sale being updated in place.
    pub async fn update_sale(&mut self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, total_cents = sale.total_cents, "Updating sale");

        sqlx::query(
            r#"
            UPDATE sales SET
                customer_id = ?2,
                employee_id = ?3,
                money_account_id = ?4,
                invoice_kind = ?5,
                location = ?6,
                total_cents = ?7,
                paid_cents = ?8,
                total_cost_cents = ?9,
                profit_cents = ?10,
                notes = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_id)
        .bind(&sale.employee_id)
        .bind(&sale.money_account_id)
        .bind(&sale.invoice_kind)
        .bind(sale.location)
        .bind(sale.total_cents)
        .bind(sale.paid_cents)
        .bind(sale.total_cost_cents)
        .bind(sale.profit_cents)
        .bind(&sale.notes)
        .bind(sale.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Items
    // =========================================================================

    pub async fn insert_item(&mut self, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, unit_id,
                quantity, base_quantity, unit_price_cents, line_total_cents,
                batch_number, batches_used, total_cost_cents, cost_price_per_unit_cents,
                profit_cents, returned_base_quantity, is_deleted, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.unit_id)
        .bind(item.quantity)
        .bind(item.base_quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .bind(&item.batch_number)
        .bind(Json(&item.batches_used))
        .bind(item.total_cost_cents)
        .bind(item.cost_price_per_unit_cents)
        .bind(item.profit_cents)
        .bind(item.returned_base_quantity)
        .bind(item.is_deleted)
        .bind(item.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Items of a sale, in line order.
    pub async fn items(&mut self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY rowid",
        )
        .bind(sale_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(items)
    }

    /// Gets a live item.
    pub async fn get_item(&mut self, id: &str) -> DbResult<SaleItem> {
        sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE id = ?1 AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found("SaleItem", id))
    }

    /// Live items of a sale, in line order.
    pub async fn live_items(&mut self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = ?1 AND is_deleted = 0 ORDER BY rowid",
        )
        .bind(sale_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(items)
    }

    /// Soft-deletes the current items of a sale (before new ones replace them).
    pub async fn delete_items(&mut self, sale_id: &str) -> DbResult<()> {
        sqlx::query("UPDATE sale_items SET is_deleted = 1, superseded = 1 WHERE sale_id = ?1 AND is_deleted = 0")
            .bind(sale_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    /// Stores the costing of a re-applied item.
    pub async fn update_item_costing(&mut self, item: &SaleItem) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sale_items SET
                batches_used = ?2,
                total_cost_cents = ?3,
                cost_price_per_unit_cents = ?4,
                profit_cents = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(Json(&item.batches_used))
        .bind(item.total_cost_cents)
        .bind(item.cost_price_per_unit_cents)
        .bind(item.profit_cents)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Adjusts `returned_base_quantity` by `delta` (negative when a return
    /// is deleted).
    pub async fn add_returned(&mut self, item_id: &str, delta: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sale_items
            SET returned_base_quantity = returned_base_quantity + ?2
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .bind(delta)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Returns
    // =========================================================================

    pub async fn insert_return(&mut self, sale_return: &SaleReturn) -> DbResult<()> {
        debug!(
            id = %sale_return.id,
            sale_item_id = %sale_return.sale_item_id,
            base_quantity = sale_return.base_quantity,
            "Inserting sale return"
        );

        sqlx::query(
            r#"
            INSERT INTO sale_returns (
                id, sale_id, sale_item_id, unit_id, quantity, base_quantity,
                value_cents, refund_cents, refund_account_id, restored_batches, reason,
                created_by_id, created_by_name, is_deleted, deleted_at, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&sale_return.id)
        .bind(&sale_return.sale_id)
        .bind(&sale_return.sale_item_id)
        .bind(&sale_return.unit_id)
        .bind(sale_return.quantity)
        .bind(sale_return.base_quantity)
        .bind(sale_return.value_cents)
        .bind(sale_return.refund_cents)
        .bind(&sale_return.refund_account_id)
        .bind(Json(&sale_return.restored_batches))
        .bind(&sale_return.reason)
        .bind(&sale_return.created_by_id)
        .bind(&sale_return.created_by_name)
        .bind(sale_return.is_deleted)
        .bind(sale_return.deleted_at)
        .bind(sale_return.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Gets a live return.
    pub async fn get_return(&mut self, id: &str) -> DbResult<SaleReturn> {
        sqlx::query_as::<_, SaleReturn>(
            "SELECT * FROM sale_returns WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| DbError::not_found("SaleReturn", id))
    }

    /// Live returns against a sale.
    pub async fn live_returns(&mut self, sale_id: &str) -> DbResult<Vec<SaleReturn>> {
        let returns = sqlx::query_as::<_, SaleReturn>(
            "SELECT * FROM sale_returns WHERE sale_id = ?1 AND is_deleted = 0 ORDER BY rowid",
        )
        .bind(sale_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(returns)
    }

    pub async fn set_return_deleted(&mut self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sale_returns SET is_deleted = 1, deleted_at = ?2 WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleReturn", id));
        }
        Ok(())
    }
}
