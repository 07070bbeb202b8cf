//! # Account Ledger
//!
//! Owns account balances. Only the journal moves them, through
//! [`apply_delta`].
//!
//! ## Balance Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  type       may go negative   meaning of a positive balance            │
//! │  ─────────  ───────────────   ───────────────────────────────────────  │
//! │  cashier    NO                cash in the till                          │
//! │  safe       NO                cash in the safe                          │
//! │  saraf      yes               float held by the money changer           │
//! │  supplier   yes               we owe the supplier                       │
//! │  customer   yes               the customer owes us                      │
//! │  employee   yes               the employee owes us                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A restricted account is checked before the row is touched, so a
//! failed debit leaves no trace even inside a longer unit of work.

use tracing::debug;
use uuid::Uuid;

use hisab_core::validation::{validate_currency, validate_name};
use hisab_core::{Account, AccountType, CoreError, Money, ValidationError};
use hisab_db::UnitOfWork;

use crate::audit;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::requests::{BalanceReport, OpenAccountRequest};

const ENTITY: &str = "accounts";

/// Opens a new account.
///
/// ## Errors
/// - `ValidationFailure` for a bad name/currency or a negative opening
///   balance on a cashier/safe
/// - `Conflict` when a live account already exists for `(type, ref_id)`
pub(crate) async fn open(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    request: &OpenAccountRequest,
    default_currency: &str,
) -> EngineResult<Account> {
    validate_name("name", &request.name)?;
    let currency = request
        .currency
        .clone()
        .unwrap_or_else(|| default_currency.to_string());
    validate_currency(&currency)?;

    if request.account_type.requires_non_negative() && request.opening_balance.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "openingBalance".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    if let Some(ref_id) = &request.ref_id {
        if uow
            .accounts()
            .find_active_by_ref(request.account_type, ref_id)
            .await?
            .is_some()
        {
            return Err(EngineError::conflict(format!(
                "An active {} account already exists for {}",
                request.account_type.as_str(),
                ref_id
            )));
        }
    }

    let account = Account {
        id: Uuid::new_v4().to_string(),
        account_type: request.account_type,
        ref_id: request.ref_id.clone(),
        name: request.name.trim().to_string(),
        opening_balance_cents: request.opening_balance.cents(),
        current_balance_cents: request.opening_balance.cents(),
        currency,
        is_deleted: false,
        created_at: ctx.now,
        updated_at: ctx.now,
        deleted_at: None,
    };
    uow.accounts().insert(&account).await?;
    audit::inserted(uow, ctx, ENTITY, &account.id, &account).await?;

    Ok(account)
}

/// Returns the live account for `(type, ref_id)`, creating it with a zero
/// balance on first use. Idempotent.
pub(crate) async fn get_or_create(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    account_type: AccountType,
    ref_id: &str,
    name: &str,
    currency: &str,
) -> EngineResult<Account> {
    let candidate = Account {
        id: Uuid::new_v4().to_string(),
        account_type,
        ref_id: Some(ref_id.to_string()),
        name: name.to_string(),
        opening_balance_cents: 0,
        current_balance_cents: 0,
        currency: currency.to_string(),
        is_deleted: false,
        created_at: ctx.now,
        updated_at: ctx.now,
        deleted_at: None,
    };

    if uow.accounts().insert_or_ignore(&candidate).await? {
        debug!(account_type = account_type.as_str(), ref_id = %ref_id, "Account created on first use");
        audit::inserted(uow, ctx, ENTITY, &candidate.id, &candidate).await?;
    }

    uow.accounts()
        .find_active_by_ref(account_type, ref_id)
        .await?
        .ok_or_else(|| {
            EngineError::internal(format!(
                "{} account for {} vanished after insert",
                account_type.as_str(),
                ref_id
            ))
        })
}

/// Fails with `InsufficientFunds` when `amount` cannot leave a restricted
/// account. Unrestricted accounts always pass.
pub(crate) async fn assert_sufficient_funds(
    uow: &mut UnitOfWork,
    account_id: &str,
    amount: Money,
) -> EngineResult<()> {
    let account = uow.accounts().get_active(account_id).await?;
    check_funds(&account, amount)
}

fn check_funds(account: &Account, amount: Money) -> EngineResult<()> {
    if account.account_type.requires_non_negative() && account.current_balance() < amount {
        return Err(CoreError::InsufficientFunds {
            account_id: account.id.clone(),
            balance: account.current_balance(),
            requested: amount,
        }
        .into());
    }
    Ok(())
}

/// Adds a signed delta to a live account's balance.
///
/// ## Returns
/// The balance after the change.
pub(crate) async fn apply_delta(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    account_id: &str,
    delta: Money,
) -> EngineResult<Money> {
    let account = uow.accounts().get_active(account_id).await?;
    if delta.is_negative() {
        check_funds(&account, -delta)?;
    }

    let balance = uow
        .accounts()
        .apply_delta(account_id, delta.cents(), ctx.now)
        .await?;
    Ok(Money::from_cents(balance))
}

/// Checks that `account_id` is a live cashier, safe or saraf account.
pub(crate) async fn require_money_account(
    uow: &mut UnitOfWork,
    account_id: &str,
) -> EngineResult<Account> {
    let account = uow.accounts().get_active(account_id).await?;
    if !account.account_type.is_money_account() {
        return Err(EngineError::validation(format!(
            "Account {} is a {} account, not a money account",
            account.id,
            account.account_type.as_str()
        )));
    }
    Ok(account)
}

/// Soft-deletes an account. Its balance and history stay as they are.
pub(crate) async fn soft_delete(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    account_id: &str,
) -> EngineResult<Account> {
    let before = uow.accounts().get_active(account_id).await?;
    uow.accounts().set_deleted(account_id, true, ctx.now).await?;
    audit::deleted(uow, ctx, ENTITY, account_id, &before).await?;

    Ok(Account {
        is_deleted: true,
        deleted_at: Some(ctx.now),
        updated_at: ctx.now,
        ..before
    })
}

/// Brings a soft-deleted account back.
///
/// ## Errors
/// - `Conflict` if the account is live, or another live account already
///   holds its `(type, ref_id)`
pub(crate) async fn restore(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    account_id: &str,
) -> EngineResult<Account> {
    let account = uow
        .accounts()
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Account", account_id))?;

    if !account.is_deleted {
        return Err(EngineError::conflict(format!("Account {account_id} is not deleted")));
    }

    if let Some(ref_id) = &account.ref_id {
        if let Some(holder) = uow
            .accounts()
            .find_active_by_ref(account.account_type, ref_id)
            .await?
        {
            return Err(EngineError::conflict(format!(
                "Account {} already holds {} {}",
                holder.id,
                account.account_type.as_str(),
                ref_id
            )));
        }
    }

    uow.accounts().set_deleted(account_id, false, ctx.now).await?;
    let restored = Account {
        is_deleted: false,
        deleted_at: None,
        updated_at: ctx.now,
        ..account
    };
    audit::restored(uow, ctx, ENTITY, account_id, &restored).await?;

    Ok(restored)
}

/// Recomputes the balance invariant from the journal.
pub(crate) async fn verify_balance(uow: &mut UnitOfWork, account_id: &str) -> EngineResult<BalanceReport> {
    let account = uow
        .accounts()
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Account", account_id))?;

    let effective = uow.journal().sum_effective(account_id).await?;
    let posted = uow.journal().sum_all(account_id).await?;

    Ok(BalanceReport {
        account_id: account.id.clone(),
        opening_balance: account.opening_balance(),
        current_balance: account.current_balance(),
        effective_total: Money::from_cents(effective),
        posted_total: Money::from_cents(posted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use hisab_core::Actor;
    use hisab_db::{Database, DbConfig};

    fn actor() -> Actor {
        Actor::new("u-1", "Admin")
    }

    fn request(account_type: AccountType, ref_id: Option<&str>, opening: i64) -> OpenAccountRequest {
        OpenAccountRequest {
            account_type,
            ref_id: ref_id.map(str::to_string),
            name: "Test account".to_string(),
            opening_balance: Money::from_cents(opening),
            currency: None,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = actor();
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let first = get_or_create(&mut uow, &ctx, AccountType::Customer, "c-1", "Karim", "AFN")
            .await
            .unwrap();
        let second = get_or_create(&mut uow, &ctx, AccountType::Customer, "c-1", "Karim", "AFN")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let history = uow.audit().list_for(ENTITY, &first.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_restricted_account_never_goes_negative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = actor();
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let cashier = open(&mut uow, &ctx, &request(AccountType::Cashier, None, 10_000), "AFN")
            .await
            .unwrap();
        let err = apply_delta(&mut uow, &ctx, &cashier.id, Money::from_cents(-10_001))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

        let unchanged = uow.accounts().get_active(&cashier.id).await.unwrap();
        assert_eq!(unchanged.current_balance_cents, 10_000);

        let balance = apply_delta(&mut uow, &ctx, &cashier.id, Money::from_cents(-10_000))
            .await
            .unwrap();
        assert!(balance.is_zero());
    }

    #[tokio::test]
    async fn test_saraf_may_go_negative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = actor();
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let saraf = open(&mut uow, &ctx, &request(AccountType::Saraf, None, 0), "AFN")
            .await
            .unwrap();
        let balance = apply_delta(&mut uow, &ctx, &saraf.id, Money::from_cents(-5_000))
            .await
            .unwrap();
        assert_eq!(balance.cents(), -5_000);
    }

    #[tokio::test]
    async fn test_restore_conflicts_with_replacement_account() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = actor();
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let original = open(&mut uow, &ctx, &request(AccountType::Supplier, Some("s-1"), 0), "AFN")
            .await
            .unwrap();
        soft_delete(&mut uow, &ctx, &original.id).await.unwrap();
        let replacement = open(&mut uow, &ctx, &request(AccountType::Supplier, Some("s-1"), 0), "AFN")
            .await
            .unwrap();
        assert_ne!(original.id, replacement.id);

        let err = restore(&mut uow, &ctx, &original.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        soft_delete(&mut uow, &ctx, &replacement.id).await.unwrap();
        let restored = restore(&mut uow, &ctx, &original.id).await.unwrap();
        assert!(!restored.is_deleted);
    }

    #[tokio::test]
    async fn test_open_rejects_duplicate_ref_and_bad_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = actor();
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        open(&mut uow, &ctx, &request(AccountType::Employee, Some("e-1"), 0), "AFN")
            .await
            .unwrap();
        let dup = open(&mut uow, &ctx, &request(AccountType::Employee, Some("e-1"), 0), "AFN")
            .await
            .unwrap_err();
        assert_eq!(dup.kind(), ErrorKind::Conflict);

        let negative = open(&mut uow, &ctx, &request(AccountType::Safe, None, -1), "AFN")
            .await
            .unwrap_err();
        assert_eq!(negative.kind(), ErrorKind::ValidationFailure);
    }
}
