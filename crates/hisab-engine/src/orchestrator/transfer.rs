//! # Stock Transfer Orchestrator
//!
//! Moves one product between two holders. The destination receives the
//! exact batches drawn at the source, with their cost and expiry, so batch
//! identity survives the move.
//!
//! ```text
//! warehouse ──► store          FEFO at the source unless a batch is named
//! store     ──► employee:E
//! employee:E ─► warehouse      named batch, else DEFAULT
//! ```

use tracing::debug;
use uuid::Uuid;

use hisab_core::validation::{validate_batch_number, validate_quantity, validate_transfer_endpoints};
use hisab_core::{StockHolder, StockTransfer};
use hisab_db::UnitOfWork;

use super::resolve_quantity;
use crate::allocator::{self, Receipt};
use crate::audit;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::requests::StockTransferRequest;

const ENTITY: &str = "stock_transfers";

pub(crate) async fn create(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &StockTransferRequest,
) -> EngineResult<StockTransfer> {
    validate_quantity(request.quantity)?;
    validate_transfer_endpoints(&request.from, &request.to)?;
    if let Some(batch) = &request.batch_number {
        validate_batch_number(batch)?;
    }

    let (product, base_quantity) =
        resolve_quantity(uow, &request.product_id, &request.unit_id, request.quantity).await?;

    debug!(
        product_id = %product.id,
        from = %request.from.label(),
        to = %request.to.label(),
        base_quantity,
        "Transferring stock"
    );

    let draws = allocator::allocate(
        uow,
        &request.from,
        &product,
        base_quantity,
        request.batch_number.as_deref(),
        ctx.now,
    )
    .await?;
    allocator::restore(uow, &request.to, &product.id, &draws, ctx.now).await?;

    let transfer = StockTransfer {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        unit_id: request.unit_id.clone(),
        quantity: request.quantity,
        base_quantity,
        from_kind: request.from.kind(),
        from_employee_id: request.from.employee_id().map(str::to_string),
        to_kind: request.to.kind(),
        to_employee_id: request.to.employee_id().map(str::to_string),
        batch_number: request.batch_number.clone(),
        batches_moved: draws,
        notes: request.notes.clone(),
        created_by_id: ctx.actor.id.clone(),
        created_by_name: ctx.actor.name.clone(),
        is_deleted: false,
        deleted_at: None,
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    uow.transfers().insert(&transfer).await?;
    audit::inserted(uow, ctx, ENTITY, &transfer.id, &transfer).await?;

    Ok(transfer)
}

/// Moves the transferred batches back to the source.
///
/// ## Errors
/// `InsufficientStock` if the destination no longer holds them.
pub(crate) async fn delete(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    transfer_id: &str,
) -> EngineResult<StockTransfer> {
    let transfer = uow.transfers().get_active(transfer_id).await?;
    let (from, to) = endpoints(&transfer)?;

    for draw in &transfer.batches_moved {
        allocator::take_exact(uow, &to, &Receipt::from_draw(&transfer.product_id, draw), ctx.now)
            .await?;
    }
    allocator::restore(uow, &from, &transfer.product_id, &transfer.batches_moved, ctx.now).await?;

    uow.transfers().set_deleted(transfer_id, true, ctx.now).await?;
    audit::deleted(uow, ctx, ENTITY, transfer_id, &transfer).await?;

    Ok(StockTransfer {
        is_deleted: true,
        deleted_at: Some(ctx.now),
        updated_at: ctx.now,
        ..transfer
    })
}

/// Re-applies a deleted transfer against current stock.
pub(crate) async fn restore(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    transfer_id: &str,
) -> EngineResult<StockTransfer> {
    let transfer = uow
        .transfers()
        .find(transfer_id)
        .await?
        .ok_or_else(|| EngineError::not_found("StockTransfer", transfer_id))?;
    if !transfer.is_deleted {
        return Err(EngineError::conflict(format!(
            "Stock transfer {transfer_id} is not deleted"
        )));
    }
    let (from, to) = endpoints(&transfer)?;

    let product = uow.products().get_active(&transfer.product_id).await?;
    let draws = allocator::allocate(
        uow,
        &from,
        &product,
        transfer.base_quantity,
        transfer.batch_number.as_deref(),
        ctx.now,
    )
    .await?;
    allocator::restore(uow, &to, &product.id, &draws, ctx.now).await?;

    uow.transfers().update_batches_moved(transfer_id, &draws, ctx.now).await?;
    uow.transfers().set_deleted(transfer_id, false, ctx.now).await?;

    let restored = StockTransfer {
        batches_moved: draws,
        is_deleted: false,
        deleted_at: None,
        updated_at: ctx.now,
        ..transfer
    };
    audit::restored(uow, ctx, ENTITY, transfer_id, &restored).await?;
    Ok(restored)
}

fn endpoints(transfer: &StockTransfer) -> EngineResult<(StockHolder, StockHolder)> {
    match (transfer.source(), transfer.destination()) {
        (Some(from), Some(to)) => Ok((from, to)),
        _ => Err(EngineError::internal(format!(
            "Stock transfer {} has an employee endpoint without an employee id",
            transfer.id
        ))),
    }
}
