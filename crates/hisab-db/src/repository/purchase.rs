//! # Purchase Repository
//!
//! Storage for purchases and purchase items.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use hisab_core::{Purchase, PurchaseItem};

/// Repository for purchase documents.
pub struct PurchaseRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PurchaseRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        PurchaseRepository { conn }
    }

    /// Gets a purchase by ID regardless of lifecycle.
    pub async fn find(&mut self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(purchase)
    }

    pub async fn get_active(&mut self, id: &str) -> DbResult<Purchase> {
        sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1 AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id))
    }

    pub async fn insert_purchase(&mut self, purchase: &Purchase) -> DbResult<()> {
        debug!(id = %purchase.id, total_cents = purchase.total_cents, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, supplier_id, money_account_id, location,
                total_cents, paid_cents, notes,
                created_by_id, created_by_name, is_deleted, deleted_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.supplier_id)
        .bind(&purchase.money_account_id)
        .bind(purchase.location)
        .bind(purchase.total_cents)
        .bind(purchase.paid_cents)
        .bind(&purchase.notes)
        .bind(&purchase.created_by_id)
        .bind(&purchase.created_by_name)
        .bind(purchase.is_deleted)
        .bind(purchase.deleted_at)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn insert_item(&mut self, item: &PurchaseItem) -> DbResult<()> {
        debug!(
            purchase_id = %item.purchase_id,
            product_id = %item.product_id,
            batch = %item.batch_number,
            "Adding purchase item"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, unit_id,
                quantity, base_quantity, unit_cost_cents, line_total_cents,
                cost_per_base_unit_cents, batch_number, expiry_date, is_deleted, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&item.id)
        .bind(&item.purchase_id)
        .bind(&item.product_id)
        .bind(&item.unit_id)
        .bind(item.quantity)
        .bind(item.base_quantity)
        .bind(item.unit_cost_cents)
        .bind(item.line_total_cents)
        .bind(item.cost_per_base_unit_cents)
        .bind(&item.batch_number)
        .bind(item.expiry_date)
        .bind(item.is_deleted)
        .bind(item.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Items of a purchase, in line order.
    pub async fn items(&mut self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid",
        )
        .bind(purchase_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(items)
    }

    /// Live items of a purchase, in line order.
    pub async fn live_items(&mut self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = ?1 AND is_deleted = 0 ORDER BY rowid",
        )
        .bind(purchase_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(items)
    }

    /// Soft-deletes the current items of a purchase.
    pub async fn delete_items(&mut self, purchase_id: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE purchase_items SET is_deleted = 1, superseded = 1 WHERE purchase_id = ?1 AND is_deleted = 0",
        )
        .bind(purchase_id)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    /// Rewrites the header of a purchase being updated in place.
    pub async fn update_purchase(&mut self, purchase: &Purchase) -> DbResult<()> {
        debug!(id = %purchase.id, total_cents = purchase.total_cents, "Updating purchase");

        sqlx::query(
            r#"
            UPDATE purchases SET
                supplier_id = ?2,
                money_account_id = ?3,
                location = ?4,
                total_cents = ?5,
                paid_cents = ?6,
                notes = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.supplier_id)
        .bind(&purchase.money_account_id)
        .bind(purchase.location)
        .bind(purchase.total_cents)
        .bind(purchase.paid_cents)
        .bind(&purchase.notes)
        .bind(purchase.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Flips the soft-delete flag of a purchase and its items.
    pub async fn set_deleted(&mut self, id: &str, deleted: bool, now: DateTime<Utc>) -> DbResult<()> {
        let deleted_at = if deleted { Some(now) } else { None };
        let result = sqlx::query(
            "UPDATE purchases SET is_deleted = ?2, deleted_at = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(deleted)
        .bind(deleted_at)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        sqlx::query("UPDATE purchase_items SET is_deleted = ?2 WHERE purchase_id = ?1 AND superseded = 0")
            .bind(id)
            .bind(deleted)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }
}
