//! # Audit Repository
//!
//! Append-only audit trail, written inside the same unit of work as the
//! change it describes.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use hisab_core::AuditRecord;

pub struct AuditRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> AuditRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        AuditRepository { conn }
    }

    pub async fn insert(&mut self, record: &AuditRecord) -> DbResult<()> {
        debug!(
            entity = %record.entity_name,
            record_id = %record.record_id,
            operation = ?record.operation,
            "Writing audit record"
        );

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, entity_name, record_id, operation,
                old_snapshot, new_snapshot, reason,
                actor_id, actor_name, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&record.id)
        .bind(&record.entity_name)
        .bind(&record.record_id)
        .bind(record.operation)
        .bind(&record.old_snapshot)
        .bind(&record.new_snapshot)
        .bind(&record.reason)
        .bind(&record.actor_id)
        .bind(&record.actor_name)
        .bind(record.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// History of one record, oldest first.
    pub async fn list_for(&mut self, entity_name: &str, record_id: &str) -> DbResult<Vec<AuditRecord>> {
        let records = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT * FROM audit_log
            WHERE entity_name = ?1 AND record_id = ?2
            ORDER BY rowid
            "#,
        )
        .bind(entity_name)
        .bind(record_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(records)
    }
}
