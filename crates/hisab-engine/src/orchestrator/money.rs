//! # Money Movements
//!
//! Postings that have no stock side.
//!
//! ```text
//! operation        money account        counterparty / other
//! ───────────────  ───────────────────  ─────────────────────
//! expense          Expense  −amount     —
//! income           Credit   +amount     —
//! receive payment  Payment  +amount     Payment −amount
//! make payment     Payment  −amount     Payment −amount
//! transfer funds   Transfer −amount     Transfer +amount (to)
//! adjust           Credit +amount │ Debit −amount, any account
//! ```
//!
//! Two-sided movements share one transfer group id and are reversed
//! together.

use uuid::Uuid;

use hisab_core::validation::{validate_name, validate_positive_amount, validate_reason};
use hisab_core::{Account, DocumentRef, JournalEntry, Money, TransactionKind};
use hisab_db::UnitOfWork;

use crate::audit;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::journal::{self, Posting};
use crate::ledger;
use crate::requests::{
    AdjustmentDirection, AdjustmentRequest, ExpenseRequest, FundTransferRequest, GroupedEntries,
    IncomeRequest, PaymentRequest,
};

const ENTITY: &str = "journal_entries";

// =============================================================================
// Expense & Income
// =============================================================================

pub(crate) async fn record_expense(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &ExpenseRequest,
) -> EngineResult<JournalEntry> {
    validate_name("expenseId", &request.expense_id)?;
    validate_positive_amount("amount", request.amount)?;
    ledger::require_money_account(uow, &request.money_account_id).await?;

    let reference = DocumentRef::Expense(request.expense_id.clone());
    ensure_unposted(uow, &reference).await?;

    let description = request
        .description
        .clone()
        .unwrap_or_else(|| format!("Expense {}", request.expense_id));
    let posting = Posting::new(&request.money_account_id, TransactionKind::Expense, -request.amount)
        .reference(&reference)
        .describe(description);
    let entry = journal::post(uow, ctx, posting).await?;
    audit::inserted(uow, ctx, ENTITY, &entry.id, &entry).await?;
    Ok(entry)
}

pub(crate) async fn record_income(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &IncomeRequest,
) -> EngineResult<JournalEntry> {
    validate_name("incomeId", &request.income_id)?;
    validate_positive_amount("amount", request.amount)?;
    ledger::require_money_account(uow, &request.money_account_id).await?;

    let reference = DocumentRef::Income(request.income_id.clone());
    ensure_unposted(uow, &reference).await?;

    let description = request
        .description
        .clone()
        .unwrap_or_else(|| format!("Income {}", request.income_id));
    let posting = Posting::new(&request.money_account_id, TransactionKind::Credit, request.amount)
        .reference(&reference)
        .describe(description);
    let entry = journal::post(uow, ctx, posting).await?;
    audit::inserted(uow, ctx, ENTITY, &entry.id, &entry).await?;
    Ok(entry)
}

/// Undoes everything posted for an expense or income document.
///
/// ## Errors
/// `NotFound` when nothing live is posted for the reference.
pub(crate) async fn reverse_document(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    reference: &DocumentRef,
) -> EngineResult<Vec<JournalEntry>> {
    validate_reason(&ctx.reason)?;
    let counters = journal::reverse_reference(uow, ctx, reference, &ctx.reason).await?;
    if counters.is_empty() {
        let entity = match reference {
            DocumentRef::Income(_) => "Income",
            _ => "Expense",
        };
        return Err(EngineError::not_found(entity, reference.id()));
    }
    Ok(counters)
}

async fn ensure_unposted(uow: &mut UnitOfWork, reference: &DocumentRef) -> EngineResult<()> {
    let live = uow.journal().list_live_by_reference(reference).await?;
    if !live.is_empty() {
        return Err(EngineError::conflict(format!(
            "{:?} {} is already posted",
            reference.reference_type(),
            reference.id()
        )));
    }
    Ok(())
}

// =============================================================================
// Payments
// =============================================================================

/// Cash comes in from a counterparty: `+money`, `−counterparty`.
pub(crate) async fn receive_payment(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &PaymentRequest,
) -> EngineResult<GroupedEntries> {
    settle(uow, ctx, request, request.amount, "Payment received").await
}

/// Cash goes out to a counterparty: `−money` (funds checked),
/// `−counterparty`.
pub(crate) async fn make_payment(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &PaymentRequest,
) -> EngineResult<GroupedEntries> {
    settle(uow, ctx, request, -request.amount, "Payment made").await
}

async fn settle(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &PaymentRequest,
    money_delta: Money,
    label: &str,
) -> EngineResult<GroupedEntries> {
    validate_positive_amount("amount", request.amount)?;
    ledger::require_money_account(uow, &request.money_account_id).await?;
    let counterparty = require_counterparty(uow, &request.counterparty_account_id).await?;

    let group_id = Uuid::new_v4().to_string();
    let description = request
        .description
        .clone()
        .unwrap_or_else(|| format!("{label}: {}", counterparty.name));

    let money = Posting::new(&request.money_account_id, TransactionKind::Payment, money_delta)
        .group(&group_id)
        .describe(description.clone());
    let money = journal::post(uow, ctx, money).await?;

    let other = Posting::new(&counterparty.id, TransactionKind::Payment, -request.amount)
        .group(&group_id)
        .describe(description);
    let other = journal::post(uow, ctx, other).await?;

    let entries = vec![money, other];
    for entry in &entries {
        audit::inserted(uow, ctx, ENTITY, &entry.id, entry).await?;
    }
    Ok(GroupedEntries {
        transfer_group_id: group_id,
        entries,
    })
}

async fn require_counterparty(uow: &mut UnitOfWork, account_id: &str) -> EngineResult<Account> {
    let account = uow.accounts().get_active(account_id).await?;
    if account.account_type.is_money_account() {
        return Err(EngineError::validation(format!(
            "Account {} is a {} account; payments settle supplier, customer or employee accounts",
            account.id,
            account.account_type.as_str()
        )));
    }
    Ok(account)
}

// =============================================================================
// Fund Transfers & Adjustments
// =============================================================================

/// Moves money between two money accounts.
pub(crate) async fn transfer_funds(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &FundTransferRequest,
) -> EngineResult<GroupedEntries> {
    validate_positive_amount("amount", request.amount)?;
    let from = ledger::require_money_account(uow, &request.from_account_id).await?;
    let to = ledger::require_money_account(uow, &request.to_account_id).await?;

    let description = request
        .description
        .clone()
        .unwrap_or_else(|| format!("Transfer from {} to {}", from.name, to.name));
    let grouped = journal::transfer_posting(
        uow,
        ctx,
        &from.id,
        &to.id,
        request.amount,
        None,
        &description,
    )
    .await?;

    for entry in &grouped.entries {
        audit::inserted(uow, ctx, ENTITY, &entry.id, entry).await?;
    }
    Ok(grouped)
}

/// Manual correction on one account. Debits respect the non-negative rule.
pub(crate) async fn adjust(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &AdjustmentRequest,
) -> EngineResult<JournalEntry> {
    validate_positive_amount("amount", request.amount)?;
    validate_name("description", &request.description)?;

    let (kind, amount) = match request.direction {
        AdjustmentDirection::Credit => (TransactionKind::Credit, request.amount),
        AdjustmentDirection::Debit => (TransactionKind::Debit, -request.amount),
    };
    let posting = Posting::new(&request.account_id, kind, amount).describe(request.description.trim());
    let entry = journal::post(uow, ctx, posting).await?;
    audit::inserted(uow, ctx, ENTITY, &entry.id, &entry).await?;
    Ok(entry)
}
