//! # Purchase Orchestrator
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create                                                                │
//! │    every line received into the purchase location (default warehouse) │
//! │      batch: explicit │ DEFAULT (untracked) │ B<yyyymmdd>-<id8>         │
//! │    Purchase +total on the supplier account (created on first use)      │
//! │    paid > 0:  Payment −paid on money account  ┐ one group              │
//! │               Payment −paid on supplier       ┘                        │
//! │                                                                         │
//! │  delete   take the received quantities back out, reverse entries       │
//! │  restore  receive again, post again                                    │
//! │  update   delete + create under the same id                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Taking stock back fails with `InsufficientStock` once any of it has been
//! sold or moved on.

use tracing::debug;
use uuid::Uuid;

use hisab_core::allocation::generated_batch_number;
use hisab_core::validation::{
    add_line, line_total, validate_batch_number, validate_item_count, validate_name,
    validate_paid_amount, validate_price, validate_quantity,
};
use hisab_core::{
    AccountType, DocumentRef, Location, Money, Purchase, PurchaseItem, StockHolder,
    TransactionKind, ValidationError, DEFAULT_BATCH,
};
use hisab_db::UnitOfWork;

use super::{resolve_quantity, validate_ref};
use crate::allocator::{self, Receipt};
use crate::audit;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::journal::{self, Posting};
use crate::ledger;
use crate::requests::{PurchaseOutcome, PurchaseRequest};

const ENTITY: &str = "purchases";

/// Records a new purchase.
pub(crate) async fn create(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &PurchaseRequest,
) -> EngineResult<PurchaseOutcome> {
    let purchase_id = Uuid::new_v4().to_string();
    debug!(purchase_id = %purchase_id, items = request.items.len(), "Creating purchase");

    let (purchase, items) = draft(uow, ctx, &purchase_id, request).await?;

    uow.purchases().insert_purchase(&purchase).await?;
    for item in &items {
        uow.purchases().insert_item(item).await?;
    }
    post(uow, ctx, &purchase).await?;

    let outcome = PurchaseOutcome { purchase, items };
    audit::inserted(uow, ctx, ENTITY, &purchase_id, &outcome).await?;
    Ok(outcome)
}

/// Soft-deletes a purchase, taking its stock back out.
pub(crate) async fn delete(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    purchase_id: &str,
) -> EngineResult<Purchase> {
    let purchase = uow.purchases().get_active(purchase_id).await?;
    let items = uow.purchases().live_items(purchase_id).await?;

    unwind(uow, ctx, &purchase, &items).await?;
    uow.purchases().set_deleted(purchase_id, true, ctx.now).await?;

    let before = PurchaseOutcome {
        purchase: purchase.clone(),
        items,
    };
    audit::deleted(uow, ctx, ENTITY, purchase_id, &before).await?;

    Ok(Purchase {
        is_deleted: true,
        deleted_at: Some(ctx.now),
        updated_at: ctx.now,
        ..purchase
    })
}

/// Brings a deleted purchase back: items are received again and the
/// entries posted again.
pub(crate) async fn restore(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    purchase_id: &str,
) -> EngineResult<PurchaseOutcome> {
    let purchase = uow
        .purchases()
        .find(purchase_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Purchase", purchase_id))?;
    if !purchase.is_deleted {
        return Err(EngineError::conflict(format!(
            "Purchase {purchase_id} is not deleted"
        )));
    }

    uow.purchases().set_deleted(purchase_id, false, ctx.now).await?;

    let holder = StockHolder::location(purchase.location);
    let items = uow.purchases().live_items(purchase_id).await?;
    for item in &items {
        allocator::receive(uow, &holder, &receipt_for(item), ctx.now).await?;
    }

    let purchase = Purchase {
        is_deleted: false,
        deleted_at: None,
        updated_at: ctx.now,
        ..purchase
    };
    post(uow, ctx, &purchase).await?;

    let outcome = PurchaseOutcome { purchase, items };
    audit::restored(uow, ctx, ENTITY, purchase_id, &outcome).await?;
    Ok(outcome)
}

/// Replaces a purchase's content in one unit of work.
pub(crate) async fn update(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    purchase_id: &str,
    request: &PurchaseRequest,
) -> EngineResult<PurchaseOutcome> {
    let before = uow.purchases().get_active(purchase_id).await?;
    let old_items = uow.purchases().live_items(purchase_id).await?;

    unwind(uow, ctx, &before, &old_items).await?;
    uow.purchases().delete_items(purchase_id).await?;

    let (drafted, items) = draft(uow, ctx, purchase_id, request).await?;
    let purchase = Purchase {
        created_by_id: before.created_by_id.clone(),
        created_by_name: before.created_by_name.clone(),
        created_at: before.created_at,
        ..drafted
    };
    uow.purchases().update_purchase(&purchase).await?;
    for item in &items {
        uow.purchases().insert_item(item).await?;
    }
    post(uow, ctx, &purchase).await?;

    let old = PurchaseOutcome {
        purchase: before,
        items: old_items,
    };
    let outcome = PurchaseOutcome { purchase, items };
    audit::updated(uow, ctx, ENTITY, purchase_id, &old, &outcome).await?;
    Ok(outcome)
}

// =============================================================================
// Helpers
// =============================================================================

fn validate(request: &PurchaseRequest) -> EngineResult<Money> {
    validate_item_count(request.items.len())?;
    validate_name("supplierId", &request.supplier_id)?;
    validate_ref("moneyAccountId", request.money_account_id.as_deref())?;

    let mut total = Money::zero();
    for item in &request.items {
        validate_quantity(item.quantity)?;
        validate_price("unitCost", item.unit_cost)?;
        if let Some(batch) = &item.batch_number {
            validate_batch_number(batch)?;
        }
        total = add_line(total, line_total("unitCost", item.unit_cost, item.quantity)?)?;
    }

    validate_paid_amount(request.paid, total)?;
    if request.paid.is_positive() && request.money_account_id.is_none() {
        return Err(ValidationError::Required {
            field: "moneyAccountId".to_string(),
        }
        .into());
    }
    Ok(total)
}

/// Validates the request, receives every line and builds the documents.
async fn draft(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    purchase_id: &str,
    request: &PurchaseRequest,
) -> EngineResult<(Purchase, Vec<PurchaseItem>)> {
    let total = validate(request)?;
    if let Some(account_id) = &request.money_account_id {
        ledger::require_money_account(uow, account_id).await?;
    }

    let location = request.location.unwrap_or(Location::Warehouse);
    let holder = StockHolder::location(location);

    let mut items = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let (product, base_quantity) =
            resolve_quantity(uow, &line.product_id, &line.unit_id, line.quantity).await?;

        let item_id = Uuid::new_v4().to_string();
        let batch_number = if !product.tracks_batches {
            DEFAULT_BATCH.to_string()
        } else {
            match &line.batch_number {
                Some(batch) => batch.clone(),
                None => generated_batch_number(ctx.now.date_naive(), &item_id),
            }
        };

        let line_value = line_total("unitCost", line.unit_cost, line.quantity)?;
        let item = PurchaseItem {
            id: item_id,
            purchase_id: purchase_id.to_string(),
            product_id: product.id.clone(),
            unit_id: line.unit_id.clone(),
            quantity: line.quantity,
            base_quantity,
            unit_cost_cents: line.unit_cost.cents(),
            line_total_cents: line_value.cents(),
            cost_per_base_unit_cents: line_value.mul_div_round(1, base_quantity).cents(),
            batch_number,
            expiry_date: line.expiry_date,
            is_deleted: false,
            created_at: ctx.now,
        };
        allocator::receive(uow, &holder, &receipt_for(&item), ctx.now).await?;
        items.push(item);
    }

    let purchase = Purchase {
        id: purchase_id.to_string(),
        supplier_id: request.supplier_id.trim().to_string(),
        money_account_id: request.money_account_id.clone(),
        location,
        total_cents: total.cents(),
        paid_cents: request.paid.cents(),
        notes: request.notes.clone(),
        created_by_id: ctx.actor.id.clone(),
        created_by_name: ctx.actor.name.clone(),
        is_deleted: false,
        deleted_at: None,
        created_at: ctx.now,
        updated_at: ctx.now,
    };
    Ok((purchase, items))
}

fn receipt_for(item: &PurchaseItem) -> Receipt<'_> {
    Receipt {
        product_id: &item.product_id,
        batch_number: &item.batch_number,
        quantity: item.base_quantity,
        cost_per_base_unit: Money::from_cents(item.cost_per_base_unit_cents),
        expiry_date: item.expiry_date,
    }
}

async fn post(uow: &mut UnitOfWork, ctx: &Context<'_>, purchase: &Purchase) -> EngineResult<()> {
    let reference = DocumentRef::Purchase(purchase.id.clone());
    let supplier = ledger::get_or_create(
        uow,
        ctx,
        AccountType::Supplier,
        &purchase.supplier_id,
        &purchase.supplier_id,
        &ctx.currency,
    )
    .await?;

    if purchase.total().is_positive() {
        let posting = Posting::new(&supplier.id, TransactionKind::Purchase, purchase.total())
            .reference(&reference)
            .describe(format!("Purchase {}", purchase.id));
        journal::post(uow, ctx, posting).await?;
    }

    if purchase.paid().is_positive() {
        let money_account_id = purchase.money_account_id.as_deref().ok_or_else(|| {
            EngineError::validation(format!("Purchase {} is paid but has no money account", purchase.id))
        })?;
        ledger::require_money_account(uow, money_account_id).await?;
        ledger::assert_sufficient_funds(uow, money_account_id, purchase.paid()).await?;

        let group_id = Uuid::new_v4().to_string();
        let description = format!("Payment for purchase {}", purchase.id);
        let outflow = Posting::new(money_account_id, TransactionKind::Payment, -purchase.paid())
            .reference(&reference)
            .group(&group_id)
            .describe(description.clone());
        journal::post(uow, ctx, outflow).await?;

        let settle = Posting::new(&supplier.id, TransactionKind::Payment, -purchase.paid())
            .reference(&reference)
            .group(&group_id)
            .describe(description);
        journal::post(uow, ctx, settle).await?;
    }

    Ok(())
}

/// Takes the received stock back out and reverses the purchase's entries.
async fn unwind(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    purchase: &Purchase,
    items: &[PurchaseItem],
) -> EngineResult<()> {
    let holder = StockHolder::location(purchase.location);
    for item in items {
        allocator::take_exact(uow, &holder, &receipt_for(item), ctx.now).await?;
    }
    journal::reverse_reference(
        uow,
        ctx,
        &DocumentRef::Purchase(purchase.id.clone()),
        &ctx.reason,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::PurchaseItemRequest;

    fn request(paid: i64, money_account: Option<&str>) -> PurchaseRequest {
        PurchaseRequest {
            supplier_id: "s-1".to_string(),
            money_account_id: money_account.map(str::to_string),
            location: None,
            items: vec![PurchaseItemRequest {
                product_id: "p-1".to_string(),
                unit_id: "piece".to_string(),
                quantity: 10,
                unit_cost: Money::from_cents(5_000),
                batch_number: None,
                expiry_date: None,
            }],
            paid: Money::from_cents(paid),
            notes: None,
        }
    }

    #[test]
    fn test_paid_purchase_needs_money_account() {
        assert!(validate(&request(30_000, None)).is_err());
        assert!(validate(&request(0, None)).is_ok());
        assert_eq!(validate(&request(30_000, Some("m-1"))).unwrap().cents(), 50_000);
    }

    #[test]
    fn test_paid_cannot_exceed_total() {
        assert!(validate(&request(50_001, Some("m-1"))).is_err());
    }

    #[test]
    fn test_blank_supplier_rejected() {
        let mut blank = request(0, None);
        blank.supplier_id = "  ".to_string();
        assert!(validate(&blank).is_err());
    }
}
