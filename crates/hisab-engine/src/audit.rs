//! # Audit Recorder
//!
//! One record per mutated aggregate, written in the same unit of work as
//! the change. Snapshots are JSON.
//!
//! ```text
//! INSERT   old: —        new: snapshot
//! UPDATE   old: before   new: after
//! DELETE   old: before   new: —
//! RESTORE  old: —        new: snapshot
//! ```

use serde::Serialize;
use uuid::Uuid;

use hisab_core::{AuditOperation, AuditRecord};
use hisab_db::UnitOfWork;

use crate::context::Context;
use crate::error::EngineResult;

pub(crate) async fn inserted<T: Serialize>(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    entity: &str,
    record_id: &str,
    new: &T,
) -> EngineResult<()> {
    let new = serde_json::to_string(new)?;
    write(uow, ctx, entity, record_id, AuditOperation::Insert, None, Some(new)).await
}

pub(crate) async fn updated<T: Serialize>(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    entity: &str,
    record_id: &str,
    old: &T,
    new: &T,
) -> EngineResult<()> {
    let old = serde_json::to_string(old)?;
    let new = serde_json::to_string(new)?;
    write(uow, ctx, entity, record_id, AuditOperation::Update, Some(old), Some(new)).await
}

pub(crate) async fn deleted<T: Serialize>(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    entity: &str,
    record_id: &str,
    old: &T,
) -> EngineResult<()> {
    let old = serde_json::to_string(old)?;
    write(uow, ctx, entity, record_id, AuditOperation::Delete, Some(old), None).await
}

pub(crate) async fn restored<T: Serialize>(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    entity: &str,
    record_id: &str,
    new: &T,
) -> EngineResult<()> {
    let new = serde_json::to_string(new)?;
    write(uow, ctx, entity, record_id, AuditOperation::Restore, None, Some(new)).await
}

async fn write(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    entity: &str,
    record_id: &str,
    operation: AuditOperation,
    old_snapshot: Option<String>,
    new_snapshot: Option<String>,
) -> EngineResult<()> {
    let record = AuditRecord {
        id: Uuid::new_v4().to_string(),
        entity_name: entity.to_string(),
        record_id: record_id.to_string(),
        operation,
        old_snapshot,
        new_snapshot,
        reason: ctx.reason.clone(),
        actor_id: ctx.actor.id.clone(),
        actor_name: ctx.actor.name.clone(),
        created_at: ctx.now,
    };
    uow.audit().insert(&record).await?;
    Ok(())
}
