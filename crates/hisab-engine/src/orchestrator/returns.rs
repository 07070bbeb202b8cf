//! # Sale Returns
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  return q units of sale item I                                         │
//! │    q (in unit) → base; base ≤ I.base_quantity − I.returned            │
//! │    value = I.line_total × base / I.base_quantity                       │
//! │    stock back into I's batches, last drawn first                       │
//! │                                                                         │
//! │  with customer/employee:                                               │
//! │    SaleReturn −value  on the counterparty                              │
//! │    refund > 0:  Payment −refund on money account  ┐ one group          │
//! │                 Payment +refund on counterparty   ┘                    │
//! │  walk-in:                                                              │
//! │    SaleReturn −value  on the refund account (cash goes back)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deleting a return takes the stock back out of the restored batches and
//! reverses its entries.

use tracing::debug;
use uuid::Uuid;

use hisab_core::allocation::plan_return;
use hisab_core::units::UnitTable;
use hisab_core::validation::{validate_price, validate_quantity};
use hisab_core::{DocumentRef, SaleReturn, TransactionKind, ValidationError};
use hisab_db::UnitOfWork;

use super::sale_counterparty;
use crate::allocator::{self, Receipt};
use crate::audit;
use crate::context::Context;
use crate::error::EngineResult;
use crate::journal::{self, Posting};
use crate::ledger;
use crate::requests::{SaleReturnOutcome, SaleReturnRequest};

const ENTITY: &str = "sale_returns";

pub(crate) async fn create(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &SaleReturnRequest,
) -> EngineResult<SaleReturnOutcome> {
    validate_quantity(request.quantity)?;
    validate_price("refund", request.refund)?;

    let item = uow.sales().get_item(&request.sale_item_id).await?;
    let sale = uow.sales().get_active(&item.sale_id).await?;

    let product = uow.products().get_active(&item.product_id).await?;
    let units = uow.products().units_for(&product.id).await?;
    let base_quantity = UnitTable::new(&product.id, &product.base_unit_id, &units)
        .to_base(&request.unit_id, request.quantity)?;

    let returnable = item.returnable_base_quantity();
    if base_quantity > returnable {
        return Err(ValidationError::Inconsistent(format!(
            "cannot return {base_quantity} base units of item {}: {returnable} still returnable",
            item.id
        ))
        .into());
    }

    let value = item.line_total().mul_div_round(base_quantity, item.base_quantity);
    if request.refund > value {
        return Err(ValidationError::Inconsistent(format!(
            "refund {} exceeds returned value {}",
            request.refund, value
        ))
        .into());
    }

    let return_id = Uuid::new_v4().to_string();
    debug!(
        return_id = %return_id,
        sale_item_id = %item.id,
        base_quantity,
        value_cents = value.cents(),
        "Recording sale return"
    );

    let restored = plan_return(&item.batches_used, item.returned_base_quantity, base_quantity);
    allocator::restore(uow, &sale.stock_holder(), &item.product_id, &restored, ctx.now).await?;
    uow.sales().add_returned(&item.id, base_quantity).await?;

    let reference = DocumentRef::SaleReturn(return_id.clone());
    let refund_account_id = request
        .refund_account_id
        .clone()
        .unwrap_or_else(|| sale.money_account_id.clone());
    let counterparty = sale_counterparty(
        uow,
        ctx,
        sale.customer_id.as_deref(),
        sale.employee_id.as_deref(),
    )
    .await?;

    let description = format!("Return against sale {}", sale.id);
    let (refund, refund_account) = match &counterparty {
        Some(account) => {
            if value.is_positive() {
                let credit = Posting::new(&account.id, TransactionKind::SaleReturn, -value)
                    .reference(&reference)
                    .describe(description.clone());
                journal::post(uow, ctx, credit).await?;
            }
            if request.refund.is_positive() {
                ledger::require_money_account(uow, &refund_account_id).await?;
                let group_id = Uuid::new_v4().to_string();
                let payout = Posting::new(&refund_account_id, TransactionKind::Payment, -request.refund)
                    .reference(&reference)
                    .group(&group_id)
                    .describe(format!("Refund for sale {}", sale.id));
                journal::post(uow, ctx, payout).await?;
                let settle = Posting::new(&account.id, TransactionKind::Payment, request.refund)
                    .reference(&reference)
                    .group(&group_id)
                    .describe(format!("Refund for sale {}", sale.id));
                journal::post(uow, ctx, settle).await?;
                (request.refund, Some(refund_account_id))
            } else {
                (request.refund, None)
            }
        }
        None => {
            // walk-in: the full value goes back in cash
            ledger::require_money_account(uow, &refund_account_id).await?;
            if value.is_positive() {
                let payout = Posting::new(&refund_account_id, TransactionKind::SaleReturn, -value)
                    .reference(&reference)
                    .describe(description.clone());
                journal::post(uow, ctx, payout).await?;
            }
            (value, Some(refund_account_id))
        }
    };

    let sale_return = SaleReturn {
        id: return_id.clone(),
        sale_id: sale.id.clone(),
        sale_item_id: item.id.clone(),
        unit_id: request.unit_id.clone(),
        quantity: request.quantity,
        base_quantity,
        value_cents: value.cents(),
        refund_cents: refund.cents(),
        refund_account_id: refund_account,
        restored_batches: restored,
        reason: request.reason.clone(),
        created_by_id: ctx.actor.id.clone(),
        created_by_name: ctx.actor.name.clone(),
        is_deleted: false,
        deleted_at: None,
        created_at: ctx.now,
    };
    uow.sales().insert_return(&sale_return).await?;
    audit::inserted(uow, ctx, ENTITY, &return_id, &sale_return).await?;

    let item = uow.sales().get_item(&item.id).await?;
    Ok(SaleReturnOutcome { sale_return, item })
}

/// Undoes a return.
///
/// ## Errors
/// `InsufficientStock` if the returned goods were sold again.
pub(crate) async fn delete(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    return_id: &str,
) -> EngineResult<SaleReturn> {
    let sale_return = uow.sales().get_return(return_id).await?;
    let sale = uow.sales().get_active(&sale_return.sale_id).await?;
    let holder = sale.stock_holder();

    let item = uow.sales().get_item(&sale_return.sale_item_id).await?;
    for draw in &sale_return.restored_batches {
        allocator::take_exact(uow, &holder, &Receipt::from_draw(&item.product_id, draw), ctx.now)
            .await?;
    }
    uow.sales().add_returned(&item.id, -sale_return.base_quantity).await?;

    journal::reverse_reference(
        uow,
        ctx,
        &DocumentRef::SaleReturn(sale_return.id.clone()),
        &ctx.reason,
    )
    .await?;

    uow.sales().set_return_deleted(return_id, ctx.now).await?;
    audit::deleted(uow, ctx, ENTITY, return_id, &sale_return).await?;

    Ok(SaleReturn {
        is_deleted: true,
        deleted_at: Some(ctx.now),
        ..sale_return
    })
}
