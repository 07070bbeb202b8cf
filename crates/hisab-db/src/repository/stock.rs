//! # Stock Repositories
//!
//! Storage for location stock (`stock`) and employee-carried stock
//! (`employee_stock`). Both hold one row per batch with a non-negative
//! quantity in base units; the CHECK constraint backs that up.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use hisab_core::{EmployeeStockRecord, Location, StockRecord};

// =============================================================================
// Location Stock
// =============================================================================

/// Repository for `(product, batch, location)` stock rows.
pub struct StockRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StockRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        StockRepository { conn }
    }

    /// The live row for one batch at one location.
    pub async fn find(
        &mut self,
        product_id: &str,
        batch_number: &str,
        location: Location,
    ) -> DbResult<Option<StockRecord>> {
        let record = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT * FROM stock
            WHERE product_id = ?1 AND batch_number = ?2 AND location = ?3 AND is_deleted = 0
            "#,
        )
        .bind(product_id)
        .bind(batch_number)
        .bind(location)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(record)
    }

    /// Every live batch of a product at a location, in creation order.
    pub async fn list_lots(
        &mut self,
        product_id: &str,
        location: Location,
    ) -> DbResult<Vec<StockRecord>> {
        let records = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT * FROM stock
            WHERE product_id = ?1 AND location = ?2 AND is_deleted = 0
            ORDER BY rowid
            "#,
        )
        .bind(product_id)
        .bind(location)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(records)
    }

    /// Σ quantity of a product at a location.
    pub async fn quantity_on_hand(&mut self, product_id: &str, location: Location) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0) FROM stock
            WHERE product_id = ?1 AND location = ?2 AND is_deleted = 0
            "#,
        )
        .bind(product_id)
        .bind(location)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(total)
    }

    pub async fn insert(&mut self, record: &StockRecord) -> DbResult<()> {
        debug!(
            product_id = %record.product_id,
            batch = %record.batch_number,
            location = record.location.as_str(),
            quantity = record.quantity,
            "Inserting stock record"
        );

        sqlx::query(
            r#"
            INSERT INTO stock (
                id, product_id, batch_number, location, quantity,
                cost_per_base_unit_cents, expiry_date, is_deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.id)
        .bind(&record.product_id)
        .bind(&record.batch_number)
        .bind(record.location)
        .bind(record.quantity)
        .bind(record.cost_per_base_unit_cents)
        .bind(record.expiry_date)
        .bind(record.is_deleted)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Overwrites quantity, cost and expiry of an existing row.
    pub async fn update_levels(
        &mut self,
        id: &str,
        quantity: i64,
        cost_per_base_unit_cents: i64,
        expiry_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, quantity, "Updating stock record");

        sqlx::query(
            r#"
            UPDATE stock
            SET quantity = ?2, cost_per_base_unit_cents = ?3, expiry_date = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(cost_per_base_unit_cents)
        .bind(expiry_date)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Removes `quantity` from a row if it holds at least that much.
    ///
    /// ## Returns
    /// `false` when the row holds less (nothing changed).
    pub async fn take(&mut self, id: &str, quantity: i64, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE stock
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Employee Stock
// =============================================================================

/// Repository for `(employee, product, batch)` stock rows.
pub struct EmployeeStockRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> EmployeeStockRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        EmployeeStockRepository { conn }
    }

    pub async fn find(
        &mut self,
        employee_id: &str,
        product_id: &str,
        batch_number: &str,
    ) -> DbResult<Option<EmployeeStockRecord>> {
        let record = sqlx::query_as::<_, EmployeeStockRecord>(
            r#"
            SELECT * FROM employee_stock
            WHERE employee_id = ?1 AND product_id = ?2 AND batch_number = ?3 AND is_deleted = 0
            "#,
        )
        .bind(employee_id)
        .bind(product_id)
        .bind(batch_number)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(record)
    }

    /// Every live batch of a product carried by an employee.
    pub async fn list_lots(
        &mut self,
        employee_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<EmployeeStockRecord>> {
        let records = sqlx::query_as::<_, EmployeeStockRecord>(
            r#"
            SELECT * FROM employee_stock
            WHERE employee_id = ?1 AND product_id = ?2 AND is_deleted = 0
            ORDER BY rowid
            "#,
        )
        .bind(employee_id)
        .bind(product_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(records)
    }

    pub async fn quantity_on_hand(&mut self, employee_id: &str, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0) FROM employee_stock
            WHERE employee_id = ?1 AND product_id = ?2 AND is_deleted = 0
            "#,
        )
        .bind(employee_id)
        .bind(product_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(total)
    }

    pub async fn insert(&mut self, record: &EmployeeStockRecord) -> DbResult<()> {
        debug!(
            employee_id = %record.employee_id,
            product_id = %record.product_id,
            batch = %record.batch_number,
            quantity = record.quantity,
            "Inserting employee stock record"
        );

        sqlx::query(
            r#"
            INSERT INTO employee_stock (
                id, employee_id, product_id, batch_number, quantity,
                cost_per_base_unit_cents, expiry_date, is_deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.id)
        .bind(&record.employee_id)
        .bind(&record.product_id)
        .bind(&record.batch_number)
        .bind(record.quantity)
        .bind(record.cost_per_base_unit_cents)
        .bind(record.expiry_date)
        .bind(record.is_deleted)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn update_levels(
        &mut self,
        id: &str,
        quantity: i64,
        cost_per_base_unit_cents: i64,
        expiry_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE employee_stock
            SET quantity = ?2, cost_per_base_unit_cents = ?3, expiry_date = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(cost_per_base_unit_cents)
        .bind(expiry_date)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Removes `quantity` if the row holds at least that much.
    pub async fn take(&mut self, id: &str, quantity: i64, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE employee_stock
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
