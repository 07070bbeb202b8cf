//! # Product Repository
//!
//! The slice of the catalogue the engine reads: products, units and
//! per-product conversion factors. Full catalogue CRUD lives outside the
//! engine; inserts here exist for seeding and tests.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use hisab_core::{Product, ProductUnit, Unit};

/// Repository for product lookups.
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Gets a live product.
    pub async fn get_active(&mut self, id: &str) -> DbResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1 AND is_deleted = 0")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Conversion factors of a product (base unit not necessarily listed).
    pub async fn units_for(&mut self, product_id: &str) -> DbResult<Vec<ProductUnit>> {
        let units = sqlx::query_as::<_, ProductUnit>(
            r#"
            SELECT pu.product_id, pu.unit_id, pu.factor
            FROM product_units pu
            JOIN units u ON u.id = pu.unit_id
            WHERE pu.product_id = ?1 AND u.is_deleted = 0
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(units)
    }

    pub async fn insert_unit(&mut self, unit: &Unit) -> DbResult<()> {
        debug!(id = %unit.id, name = %unit.name, "Inserting unit");

        sqlx::query("INSERT INTO units (id, name, is_deleted) VALUES (?1, ?2, ?3)")
            .bind(&unit.id)
            .bind(&unit.name)
            .bind(unit.is_deleted)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    /// Inserts a product and registers its base unit with factor 1.
    pub async fn insert(&mut self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, base_unit_id, tracks_batches, is_deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.base_unit_id)
        .bind(product.tracks_batches)
        .bind(product.is_deleted)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await?;

        self.set_factor(&ProductUnit {
            product_id: product.id.clone(),
            unit_id: product.base_unit_id.clone(),
            factor: 1,
        })
        .await
    }

    /// Registers or replaces a conversion factor.
    pub async fn set_factor(&mut self, unit: &ProductUnit) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_units (product_id, unit_id, factor)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (product_id, unit_id) DO UPDATE SET factor = excluded.factor
            "#,
        )
        .bind(&unit.product_id)
        .bind(&unit.unit_id)
        .bind(unit.factor)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }
}
