//! # Sale Orchestrator
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate lines, paid ≤ total, walk-in fully paid                   │
//! │  2. money account must be a live cashier/safe/saraf                    │
//! │  3. per line: unit → base qty, allocate (employee or location FEFO),   │
//! │     cost/profit from the batches actually drawn                        │
//! │  4. insert header + items                                              │
//! │  5. journal:                                                           │
//! │       Sale     +total  on customer/employee account                    │
//! │       Payment  +paid   on money account      ┐ one group               │
//! │       Payment  −paid   on customer/employee  ┘                         │
//! │     walk-in: only Payment +paid on the money account                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delete puts the drawn batches back and reverses the sale's entries.
//! Restore and update allocate again from current stock, so costing
//! reflects what is on hand at that moment.

use tracing::debug;
use uuid::Uuid;

use hisab_core::allocation::{total_cost, weighted_unit_cost, BatchDraw};
use hisab_core::validation::{
    add_line, line_total, validate_batch_number, validate_item_count, validate_paid_amount,
    validate_price, validate_quantity,
};
use hisab_core::{
    DocumentRef, Location, Money, Sale, SaleItem, StockHolder, TransactionKind, ValidationError,
};
use hisab_db::UnitOfWork;

use super::{resolve_quantity, sale_counterparty, validate_ref};
use crate::allocator;
use crate::audit;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::journal::{self, Posting};
use crate::ledger;
use crate::requests::{SaleOutcome, SaleRequest};

const ENTITY: &str = "sales";
const DEFAULT_INVOICE_KIND: &str = "standard";

/// Records a new sale.
pub(crate) async fn create(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &SaleRequest,
) -> EngineResult<SaleOutcome> {
    let sale_id = Uuid::new_v4().to_string();
    debug!(sale_id = %sale_id, items = request.items.len(), "Creating sale");

    let (sale, items) = draft(uow, ctx, &sale_id, request).await?;

    uow.sales().insert_sale(&sale).await?;
    for item in &items {
        uow.sales().insert_item(item).await?;
    }
    post(uow, ctx, &sale).await?;

    let outcome = SaleOutcome { sale, items };
    audit::inserted(uow, ctx, ENTITY, &sale_id, &outcome).await?;
    Ok(outcome)
}

/// Soft-deletes a sale: stock goes back into the batches it came from and
/// every journal entry of the sale is reversed.
///
/// ## Errors
/// - `Conflict` while live returns exist against the sale
/// - `InsufficientFunds` if the payment already left the money account
pub(crate) async fn delete(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    sale_id: &str,
) -> EngineResult<Sale> {
    let sale = uow.sales().get_active(sale_id).await?;
    ensure_no_returns(uow, &sale).await?;

    let items = uow.sales().live_items(sale_id).await?;
    unwind(uow, ctx, &sale, &items).await?;
    uow.sales().set_sale_deleted(sale_id, true, ctx.now).await?;

    let before = SaleOutcome {
        sale: sale.clone(),
        items,
    };
    audit::deleted(uow, ctx, ENTITY, sale_id, &before).await?;

    Ok(Sale {
        is_deleted: true,
        deleted_at: Some(ctx.now),
        updated_at: ctx.now,
        ..sale
    })
}

/// Brings a deleted sale back by applying it again as new.
pub(crate) async fn restore(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    sale_id: &str,
) -> EngineResult<SaleOutcome> {
    let sale = uow
        .sales()
        .find(sale_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
    if !sale.is_deleted {
        return Err(EngineError::conflict(format!("Sale {sale_id} is not deleted")));
    }
    ledger::require_money_account(uow, &sale.money_account_id).await?;

    uow.sales().set_sale_deleted(sale_id, false, ctx.now).await?;

    let holder = sale.stock_holder();
    let mut items = uow.sales().live_items(sale_id).await?;
    for item in &mut items {
        let product = uow.products().get_active(&item.product_id).await?;
        let draws = allocator::allocate(
            uow,
            &holder,
            &product,
            item.base_quantity,
            item.batch_number.as_deref(),
            ctx.now,
        )
        .await?;
        cost_item(item, draws);
        uow.sales().update_item_costing(item).await?;
    }

    let (total_cost_cents, profit_cents) = summarize(&items);
    let sale = Sale {
        total_cost_cents,
        profit_cents,
        is_deleted: false,
        deleted_at: None,
        updated_at: ctx.now,
        ..sale
    };
    uow.sales().update_sale(&sale).await?;
    post(uow, ctx, &sale).await?;

    let outcome = SaleOutcome { sale, items };
    audit::restored(uow, ctx, ENTITY, sale_id, &outcome).await?;
    Ok(outcome)
}

/// Replaces a sale's content: the old version is undone and the new one
/// applied in the same unit of work.
pub(crate) async fn update(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    sale_id: &str,
    request: &SaleRequest,
) -> EngineResult<SaleOutcome> {
    let before = uow.sales().get_active(sale_id).await?;
    ensure_no_returns(uow, &before).await?;

    let old_items = uow.sales().live_items(sale_id).await?;
    unwind(uow, ctx, &before, &old_items).await?;
    uow.sales().delete_items(sale_id).await?;

    let (drafted, items) = draft(uow, ctx, sale_id, request).await?;
    let sale = Sale {
        created_by_id: before.created_by_id.clone(),
        created_by_name: before.created_by_name.clone(),
        created_at: before.created_at,
        ..drafted
    };
    uow.sales().update_sale(&sale).await?;
    for item in &items {
        uow.sales().insert_item(item).await?;
    }
    post(uow, ctx, &sale).await?;

    let old = SaleOutcome {
        sale: before,
        items: old_items,
    };
    let outcome = SaleOutcome { sale, items };
    audit::updated(uow, ctx, ENTITY, sale_id, &old, &outcome).await?;
    Ok(outcome)
}

// =============================================================================
// Helpers
// =============================================================================

fn validate(request: &SaleRequest) -> EngineResult<Money> {
    validate_item_count(request.items.len())?;
    validate_ref("customerId", request.customer_id.as_deref())?;
    validate_ref("employeeId", request.employee_id.as_deref())?;
    validate_ref("invoiceKind", request.invoice_kind.as_deref())?;

    let mut total = Money::zero();
    for item in &request.items {
        validate_quantity(item.quantity)?;
        validate_price("unitPrice", item.unit_price)?;
        if let Some(batch) = &item.batch_number {
            validate_batch_number(batch)?;
        }
        total = add_line(total, line_total("unitPrice", item.unit_price, item.quantity)?)?;
    }

    validate_paid_amount(request.paid, total)?;
    if request.customer_id.is_none() && request.employee_id.is_none() && request.paid != total {
        return Err(ValidationError::Inconsistent(format!(
            "walk-in sale must be paid in full: paid {}, total {}",
            request.paid, total
        ))
        .into());
    }
    Ok(total)
}

/// Validates the request, draws stock and builds the header and items.
async fn draft(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    sale_id: &str,
    request: &SaleRequest,
) -> EngineResult<(Sale, Vec<SaleItem>)> {
    let total = validate(request)?;
    ledger::require_money_account(uow, &request.money_account_id).await?;

    let location = request.location.unwrap_or(Location::Store);
    let holder = match &request.employee_id {
        Some(employee_id) => StockHolder::Employee(employee_id.clone()),
        None => StockHolder::location(location),
    };

    let mut items = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let (product, base_quantity) =
            resolve_quantity(uow, &line.product_id, &line.unit_id, line.quantity).await?;
        let draws = allocator::allocate(
            uow,
            &holder,
            &product,
            base_quantity,
            line.batch_number.as_deref(),
            ctx.now,
        )
        .await?;

        let mut item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: product.id.clone(),
            unit_id: line.unit_id.clone(),
            quantity: line.quantity,
            base_quantity,
            unit_price_cents: line.unit_price.cents(),
            line_total_cents: line_total("unitPrice", line.unit_price, line.quantity)?.cents(),
            batch_number: line.batch_number.clone(),
            batches_used: Vec::new(),
            total_cost_cents: 0,
            cost_price_per_unit_cents: 0,
            profit_cents: 0,
            returned_base_quantity: 0,
            is_deleted: false,
            created_at: ctx.now,
        };
        cost_item(&mut item, draws);
        items.push(item);
    }

    let (total_cost_cents, profit_cents) = summarize(&items);
    let sale = Sale {
        id: sale_id.to_string(),
        customer_id: request.customer_id.clone(),
        employee_id: request.employee_id.clone(),
        money_account_id: request.money_account_id.clone(),
        invoice_kind: request
            .invoice_kind
            .clone()
            .unwrap_or_else(|| DEFAULT_INVOICE_KIND.to_string()),
        location,
        total_cents: total.cents(),
        paid_cents: request.paid.cents(),
        total_cost_cents,
        profit_cents,
        notes: request.notes.clone(),
        created_by_id: ctx.actor.id.clone(),
        created_by_name: ctx.actor.name.clone(),
        is_deleted: false,
        deleted_at: None,
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    Ok((sale, items))
}

fn cost_item(item: &mut SaleItem, draws: Vec<BatchDraw>) {
    let cost = total_cost(&draws);
    item.cost_price_per_unit_cents = weighted_unit_cost(&draws).cents();
    item.total_cost_cents = cost.cents();
    item.profit_cents = (item.line_total() - cost).cents();
    item.batches_used = draws;
}

fn summarize(items: &[SaleItem]) -> (i64, i64) {
    let cost: Money = items.iter().map(SaleItem::total_cost).sum();
    let profit: Money = items.iter().map(SaleItem::profit).sum();
    (cost.cents(), profit.cents())
}

/// Posts the sale's journal entries.
async fn post(uow: &mut UnitOfWork, ctx: &Context<'_>, sale: &Sale) -> EngineResult<()> {
    let reference = DocumentRef::Sale(sale.id.clone());
    let counterparty = sale_counterparty(
        uow,
        ctx,
        sale.customer_id.as_deref(),
        sale.employee_id.as_deref(),
    )
    .await?;

    if let Some(account) = &counterparty {
        if sale.total().is_positive() {
            let posting = Posting::new(&account.id, TransactionKind::Sale, sale.total())
                .reference(&reference)
                .describe(format!("Sale {}", sale.id));
            journal::post(uow, ctx, posting).await?;
        }
    }

    if sale.paid().is_positive() {
        let group_id = Uuid::new_v4().to_string();
        let mut receipt = Posting::new(&sale.money_account_id, TransactionKind::Payment, sale.paid())
            .reference(&reference)
            .describe(format!("Payment for sale {}", sale.id));
        if counterparty.is_some() {
            receipt = receipt.group(&group_id);
        }
        journal::post(uow, ctx, receipt).await?;

        if let Some(account) = &counterparty {
            let settle = Posting::new(&account.id, TransactionKind::Payment, -sale.paid())
                .reference(&reference)
                .group(&group_id)
                .describe(format!("Payment for sale {}", sale.id));
            journal::post(uow, ctx, settle).await?;
        }
    }

    Ok(())
}

/// Puts the items' stock back and reverses the sale's live entries.
async fn unwind(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    sale: &Sale,
    items: &[SaleItem],
) -> EngineResult<()> {
    let holder = sale.stock_holder();
    for item in items {
        allocator::restore(uow, &holder, &item.product_id, &item.batches_used, ctx.now).await?;
    }
    journal::reverse_reference(uow, ctx, &DocumentRef::Sale(sale.id.clone()), &ctx.reason).await?;
    Ok(())
}

async fn ensure_no_returns(uow: &mut UnitOfWork, sale: &Sale) -> EngineResult<()> {
    let returns = uow.sales().live_returns(&sale.id).await?;
    if !returns.is_empty() {
        return Err(EngineError::conflict(format!(
            "Sale {} has {} live return(s); delete them first",
            sale.id,
            returns.len()
        )));
    }
    Ok(())
}
