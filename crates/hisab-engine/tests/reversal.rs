//! Money movements and journal reversal.

mod common;

use common::{afn, Fixture};
use hisab_core::{AccountType, TransactionKind};
use hisab_engine::{
    AdjustmentDirection, AdjustmentRequest, ErrorKind, ExpenseRequest, FundTransferRequest,
    IncomeRequest, OpenAccountRequest, PaymentRequest,
};

fn expense(expense_id: &str, money_account_id: &str, amount: i64) -> ExpenseRequest {
    ExpenseRequest {
        expense_id: expense_id.to_string(),
        money_account_id: money_account_id.to_string(),
        amount: afn(amount),
        description: Some("Electricity".to_string()),
    }
}

async fn supplier(fx: &Fixture, ref_id: &str, opening: i64) -> hisab_core::Account {
    fx.engine
        .open_account(
            &fx.actor,
            &OpenAccountRequest {
                account_type: AccountType::Supplier,
                ref_id: Some(ref_id.to_string()),
                name: format!("Supplier {ref_id}"),
                opening_balance: afn(opening),
                currency: None,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_expense_reversal_restores_balance_once() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 500).await;

    let entry = fx
        .engine
        .record_expense(&fx.actor, &expense("x-1", &safe.id, 120))
        .await
        .unwrap();
    assert_eq!(entry.kind, TransactionKind::Expense);
    assert_eq!(entry.amount(), -afn(120));
    assert_eq!(fx.balance(&safe.id).await, afn(380));

    let counters = fx.engine.reverse_expense(&fx.actor, "x-1", "entered twice").await.unwrap();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters[0].amount(), afn(120));
    assert_eq!(counters[0].reversal_of_entry_id.as_deref(), Some(entry.id.as_str()));
    assert_eq!(fx.balance(&safe.id).await, afn(500));

    let err = fx
        .engine
        .reverse_entry(&fx.actor, &entry.id, "again")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = fx
        .engine
        .reverse_entry(&fx.actor, &counters[0].id, "undo the undo")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(fx.balance(&safe.id).await, afn(500));
    fx.assert_consistent(&safe.id).await;
}

#[tokio::test]
async fn test_reversing_unknown_expense_is_not_found() {
    let fx = Fixture::new().await;
    let err = fx
        .engine
        .reverse_expense(&fx.actor, "x-missing", "typo")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_expense_cannot_overdraw_and_id_posts_once() {
    let fx = Fixture::new().await;
    let cashier = fx.money_account(AccountType::Cashier, 50).await;

    let err = fx
        .engine
        .record_expense(&fx.actor, &expense("x-1", &cashier.id, 80))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(fx.balance(&cashier.id).await, afn(50));

    fx.engine
        .record_expense(&fx.actor, &expense("x-1", &cashier.id, 30))
        .await
        .unwrap();
    let err = fx
        .engine
        .record_expense(&fx.actor, &expense("x-1", &cashier.id, 10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(fx.balance(&cashier.id).await, afn(20));
}

#[tokio::test]
async fn test_income_and_reversal() {
    let fx = Fixture::new().await;
    let saraf = fx.money_account(AccountType::Saraf, 0).await;

    let entry = fx
        .engine
        .record_income(
            &fx.actor,
            &IncomeRequest {
                income_id: "i-1".to_string(),
                money_account_id: saraf.id.clone(),
                amount: afn(75),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(entry.kind, TransactionKind::Credit);
    assert_eq!(fx.balance(&saraf.id).await, afn(75));

    fx.engine.reverse_income(&fx.actor, "i-1", "bounced").await.unwrap();
    assert_eq!(fx.balance(&saraf.id).await, afn(0));
    fx.assert_consistent(&saraf.id).await;
}

#[tokio::test]
async fn test_reversing_one_transfer_leg_reverses_both() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 300).await;
    let cashier = fx.money_account(AccountType::Cashier, 0).await;

    let grouped = fx
        .engine
        .transfer_funds(
            &fx.actor,
            &FundTransferRequest {
                from_account_id: safe.id.clone(),
                to_account_id: cashier.id.clone(),
                amount: afn(100),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(grouped.entries.len(), 2);
    assert!(grouped
        .entries
        .iter()
        .all(|entry| entry.transfer_group_id.as_deref() == Some(grouped.transfer_group_id.as_str())));
    assert_eq!(fx.balance(&safe.id).await, afn(200));
    assert_eq!(fx.balance(&cashier.id).await, afn(100));

    let incoming = grouped
        .entries
        .iter()
        .find(|entry| entry.account_id == cashier.id)
        .unwrap();
    let counters = fx
        .engine
        .reverse_entry(&fx.actor, &incoming.id, "wrong drawer")
        .await
        .unwrap();
    assert_eq!(counters.len(), 2);
    assert_eq!(fx.balance(&safe.id).await, afn(300));
    assert_eq!(fx.balance(&cashier.id).await, afn(0));

    for entry in &grouped.entries {
        let err = fx
            .engine
            .reverse_entry(&fx.actor, &entry.id, "again")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
    fx.assert_consistent(&safe.id).await;
    fx.assert_consistent(&cashier.id).await;
}

#[tokio::test]
async fn test_transfer_funds_requires_money_accounts() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 300).await;
    let vendor = supplier(&fx, "s-1", 0).await;

    let err = fx
        .engine
        .transfer_funds(
            &fx.actor,
            &FundTransferRequest {
                from_account_id: safe.id.clone(),
                to_account_id: vendor.id.clone(),
                amount: afn(10),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert_eq!(fx.balance(&safe.id).await, afn(300));
}

#[tokio::test]
async fn test_payments_settle_supplier_balance() {
    let fx = Fixture::new().await;
    let cashier = fx.money_account(AccountType::Cashier, 0).await;
    let safe = fx.money_account(AccountType::Safe, 1_000).await;
    let vendor = supplier(&fx, "s-1", 400).await;

    let request = |money_account_id: &str, amount: i64| PaymentRequest {
        counterparty_account_id: vendor.id.clone(),
        money_account_id: money_account_id.to_string(),
        amount: afn(amount),
        description: None,
    };

    let err = fx
        .engine
        .make_payment(&fx.actor, &request(&cashier.id, 100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(fx.balance(&vendor.id).await, afn(400));

    let paid = fx
        .engine
        .make_payment(&fx.actor, &request(&safe.id, 250))
        .await
        .unwrap();
    assert_eq!(paid.entries.len(), 2);
    assert_eq!(fx.balance(&safe.id).await, afn(750));
    assert_eq!(fx.balance(&vendor.id).await, afn(150));

    fx.engine
        .receive_payment(&fx.actor, &request(&cashier.id, 50))
        .await
        .unwrap();
    assert_eq!(fx.balance(&cashier.id).await, afn(50));
    assert_eq!(fx.balance(&vendor.id).await, afn(100));

    let err = fx
        .engine
        .make_payment(
            &fx.actor,
            &PaymentRequest {
                counterparty_account_id: cashier.id.clone(),
                ..request(&safe.id, 10)
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    for account in [&cashier.id, &safe.id, &vendor.id] {
        fx.assert_consistent(account).await;
    }
}

#[tokio::test]
async fn test_adjustments_respect_non_negative_rule() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 40).await;

    let adjust = |direction, amount: i64, description: &str| AdjustmentRequest {
        account_id: safe.id.clone(),
        direction,
        amount: afn(amount),
        description: description.to_string(),
    };

    let entry = fx
        .engine
        .adjust_balance(&fx.actor, &adjust(AdjustmentDirection::Credit, 10, "found in drawer"))
        .await
        .unwrap();
    assert_eq!(entry.kind, TransactionKind::Credit);
    assert_eq!(fx.balance(&safe.id).await, afn(50));

    let err = fx
        .engine
        .adjust_balance(&fx.actor, &adjust(AdjustmentDirection::Debit, 60, "count short"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    let err = fx
        .engine
        .adjust_balance(&fx.actor, &adjust(AdjustmentDirection::Debit, 5, "  "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    fx.engine
        .adjust_balance(&fx.actor, &adjust(AdjustmentDirection::Debit, 50, "count short"))
        .await
        .unwrap();
    assert_eq!(fx.balance(&safe.id).await, afn(0));
    fx.assert_consistent(&safe.id).await;
}
