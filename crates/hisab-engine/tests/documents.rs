//! Document lifecycle: delete, restore, update and returns.

mod common;

use common::{afn, purchase, purchase_line, sale, sale_line, Fixture};
use hisab_core::{AccountType, AuditOperation, Location, StockHolder};
use hisab_engine::{ErrorKind, SaleReturnRequest, StockTransferRequest};

fn return_one(sale_item_id: &str, refund: i64, refund_account_id: Option<&str>) -> SaleReturnRequest {
    SaleReturnRequest {
        sale_item_id: sale_item_id.to_string(),
        unit_id: "piece".to_string(),
        quantity: 1,
        refund: afn(refund),
        refund_account_id: refund_account_id.map(str::to_string),
        reason: Some("damaged".to_string()),
    }
}

#[tokio::test]
async fn test_sale_delete_and_restore() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 0).await;
    let rice = fx.product("Rice", false).await;
    fx.engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 10, 50)], 0))
        .await
        .unwrap();

    let sold = fx
        .engine
        .create_sale(&fx.actor, &sale(Some("c-1"), &safe.id, vec![sale_line(&rice, 4, 80)], 100))
        .await
        .unwrap();
    let customer = fx.engine.account_by_ref(AccountType::Customer, "c-1").await.unwrap();
    assert_eq!(customer.current_balance(), afn(220));

    let deleted = fx
        .engine
        .delete_sale(&fx.actor, &sold.sale.id, "wrong customer")
        .await
        .unwrap();
    assert!(deleted.is_deleted);
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 10);
    assert_eq!(fx.balance(&customer.id).await, afn(0));
    assert_eq!(fx.balance(&safe.id).await, afn(0));

    let err = fx
        .engine
        .delete_sale(&fx.actor, &sold.sale.id, "again")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let restored = fx
        .engine
        .restore_sale(&fx.actor, &sold.sale.id, "right customer after all")
        .await
        .unwrap();
    assert!(!restored.sale.is_deleted);
    assert_eq!(restored.sale.profit(), afn(120));
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 6);
    assert_eq!(fx.balance(&customer.id).await, afn(220));
    assert_eq!(fx.balance(&safe.id).await, afn(100));

    let operations: Vec<_> = fx
        .engine
        .audit_trail("sales", &sold.sale.id)
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.operation)
        .collect();
    assert_eq!(
        operations,
        vec![AuditOperation::Insert, AuditOperation::Delete, AuditOperation::Restore]
    );

    fx.assert_consistent(&customer.id).await;
    fx.assert_consistent(&safe.id).await;
}

#[tokio::test]
async fn test_return_credits_customer_and_can_be_undone() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 0).await;
    let rice = fx.product("Rice", false).await;
    fx.engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 10, 50)], 0))
        .await
        .unwrap();
    let sold = fx
        .engine
        .create_sale(&fx.actor, &sale(Some("c-1"), &safe.id, vec![sale_line(&rice, 4, 80)], 100))
        .await
        .unwrap();
    let item_id = sold.items[0].id.clone();
    let customer = fx.engine.account_by_ref(AccountType::Customer, "c-1").await.unwrap();

    let returned = fx
        .engine
        .create_sale_return(&fx.actor, &return_one(&item_id, 30, None))
        .await
        .unwrap();
    assert_eq!(returned.sale_return.value(), afn(80));
    assert_eq!(returned.sale_return.refund(), afn(30));
    assert_eq!(returned.item.returned_base_quantity, 1);
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 7);
    assert_eq!(fx.balance(&customer.id).await, afn(170));
    assert_eq!(fx.balance(&safe.id).await, afn(70));

    // refund above the returned value
    let err = fx
        .engine
        .create_sale_return(&fx.actor, &return_one(&item_id, 90, None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let err = fx
        .engine
        .delete_sale(&fx.actor, &sold.sale.id, "cancel")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    fx.engine
        .delete_sale_return(&fx.actor, &returned.sale_return.id, "not damaged")
        .await
        .unwrap();
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 6);
    assert_eq!(fx.balance(&customer.id).await, afn(220));
    assert_eq!(fx.balance(&safe.id).await, afn(100));

    fx.engine
        .delete_sale(&fx.actor, &sold.sale.id, "cancel")
        .await
        .unwrap();
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 10);
    assert_eq!(fx.balance(&customer.id).await, afn(0));

    fx.assert_consistent(&customer.id).await;
    fx.assert_consistent(&safe.id).await;
}

#[tokio::test]
async fn test_walk_in_return_refunds_full_value() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 0).await;
    let rice = fx.product("Rice", false).await;
    fx.engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 5, 50)], 0))
        .await
        .unwrap();
    let sold = fx
        .engine
        .create_sale(&fx.actor, &sale(None, &safe.id, vec![sale_line(&rice, 3, 80)], 240))
        .await
        .unwrap();

    let returned = fx
        .engine
        .create_sale_return(&fx.actor, &return_one(&sold.items[0].id, 0, None))
        .await
        .unwrap();
    assert_eq!(returned.sale_return.refund(), afn(80));
    assert_eq!(returned.sale_return.refund_account_id.as_deref(), Some(safe.id.as_str()));
    assert_eq!(fx.balance(&safe.id).await, afn(160));
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 3);

    // only two of three left to return
    let mut too_many = return_one(&sold.items[0].id, 0, None);
    too_many.quantity = 3;
    let err = fx
        .engine
        .create_sale_return(&fx.actor, &too_many)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    fx.assert_consistent(&safe.id).await;
}

#[tokio::test]
async fn test_purchase_delete_restore_and_sold_stock() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 500).await;
    let rice = fx.product("Rice", false).await;

    let bought = fx
        .engine
        .create_purchase(&fx.actor, &purchase("s-1", Some(&safe.id), vec![purchase_line(&rice, 5, 50)], 100))
        .await
        .unwrap();
    let supplier = fx.engine.account_by_ref(AccountType::Supplier, "s-1").await.unwrap();
    assert_eq!(supplier.current_balance(), afn(150));
    assert_eq!(fx.balance(&safe.id).await, afn(400));

    fx.engine
        .delete_purchase(&fx.actor, &bought.purchase.id, "duplicate invoice")
        .await
        .unwrap();
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 0);
    assert_eq!(fx.balance(&supplier.id).await, afn(0));
    assert_eq!(fx.balance(&safe.id).await, afn(500));

    fx.engine
        .restore_purchase(&fx.actor, &bought.purchase.id, "not a duplicate")
        .await
        .unwrap();
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 5);
    assert_eq!(fx.balance(&supplier.id).await, afn(150));
    assert_eq!(fx.balance(&safe.id).await, afn(400));

    fx.engine
        .create_sale(&fx.actor, &sale(None, &safe.id, vec![sale_line(&rice, 3, 80)], 240))
        .await
        .unwrap();
    let err = fx
        .engine
        .delete_purchase(&fx.actor, &bought.purchase.id, "too late")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 2);

    fx.assert_consistent(&supplier.id).await;
    fx.assert_consistent(&safe.id).await;
}

#[tokio::test]
async fn test_deleting_a_purchase_restores_the_earlier_unit_cost() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 0).await;
    let rice = fx.product("Rice", false).await;

    fx.engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 10, 50)], 0))
        .await
        .unwrap();
    let pricier = fx
        .engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 10, 100)], 0))
        .await
        .unwrap();
    fx.engine
        .delete_purchase(&fx.actor, &pricier.purchase.id, "wrong supplier")
        .await
        .unwrap();
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 10);

    let sold = fx
        .engine
        .create_sale(&fx.actor, &sale(None, &safe.id, vec![sale_line(&rice, 10, 80)], 800))
        .await
        .unwrap();
    assert_eq!(sold.items[0].cost_price_per_unit_cents, afn(50).cents());
    assert_eq!(sold.sale.profit(), afn(300));
}

#[tokio::test]
async fn test_deleting_a_transfer_restores_destination_cost() {
    let fx = Fixture::new().await;
    let sugar = fx.product("Sugar", false).await;

    let mut on_shelf = purchase("s-1", None, vec![purchase_line(&sugar, 5, 10)], 0);
    on_shelf.location = Some(Location::Store);
    fx.engine.create_purchase(&fx.actor, &on_shelf).await.unwrap();
    fx.engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&sugar, 5, 30)], 0))
        .await
        .unwrap();

    let moved = fx
        .engine
        .create_stock_transfer(
            &fx.actor,
            &StockTransferRequest {
                product_id: sugar.clone(),
                unit_id: "piece".to_string(),
                quantity: 5,
                from: StockHolder::Warehouse,
                to: StockHolder::Store,
                batch_number: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    fx.engine
        .delete_stock_transfer(&fx.actor, &moved.id, "never left")
        .await
        .unwrap();

    let safe = fx.money_account(AccountType::Safe, 0).await;
    let mut from_shelf = sale(Some("c-1"), &safe.id, vec![sale_line(&sugar, 5, 15)], 0);
    from_shelf.location = Some(Location::Store);
    let sold = fx.engine.create_sale(&fx.actor, &from_shelf).await.unwrap();
    assert_eq!(sold.items[0].cost_price_per_unit_cents, afn(10).cents());
}

#[tokio::test]
async fn test_paid_purchase_needs_money_account() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", false).await;

    let err = fx
        .engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 5, 50)], 100))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 0);
}

#[tokio::test]
async fn test_updates_replace_document_content() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 0).await;
    let rice = fx.product("Rice", false).await;

    let bought = fx
        .engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 10, 50)], 0))
        .await
        .unwrap();
    let updated = fx
        .engine
        .update_purchase(
            &fx.actor,
            &bought.purchase.id,
            &purchase("s-1", None, vec![purchase_line(&rice, 12, 40)], 0),
            "supplier corrected invoice",
        )
        .await
        .unwrap();
    assert_eq!(updated.purchase.id, bought.purchase.id);
    assert_eq!(updated.purchase.total(), afn(480));
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 12);
    let supplier = fx.engine.account_by_ref(AccountType::Supplier, "s-1").await.unwrap();
    assert_eq!(supplier.current_balance(), afn(480));

    let sold = fx
        .engine
        .create_sale(&fx.actor, &sale(Some("c-1"), &safe.id, vec![sale_line(&rice, 4, 80)], 0))
        .await
        .unwrap();
    let changed = fx
        .engine
        .update_sale(
            &fx.actor,
            &sold.sale.id,
            &sale(Some("c-1"), &safe.id, vec![sale_line(&rice, 6, 80)], 100),
            "customer took two more",
        )
        .await
        .unwrap();
    assert_eq!(changed.sale.id, sold.sale.id);
    assert_eq!(changed.sale.total(), afn(480));
    assert_eq!(changed.sale.profit(), afn(240));
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 6);

    let customer = fx.engine.account_by_ref(AccountType::Customer, "c-1").await.unwrap();
    assert_eq!(customer.current_balance(), afn(380));
    assert_eq!(fx.balance(&safe.id).await, afn(100));

    let reloaded = fx.engine.sale(&sold.sale.id).await.unwrap();
    let live: Vec<_> = reloaded.items.iter().filter(|item| !item.is_deleted).collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].quantity, 6);

    for account in [&customer.id, &supplier.id, &safe.id] {
        fx.assert_consistent(account).await;
    }
}

#[tokio::test]
async fn test_employee_sells_from_carried_stock() {
    let fx = Fixture::new().await;
    let safe = fx.money_account(AccountType::Safe, 0).await;
    let rice = fx.product("Rice", false).await;
    let rider = StockHolder::Employee("e-1".to_string());

    fx.engine
        .create_purchase(&fx.actor, &purchase("s-1", None, vec![purchase_line(&rice, 10, 50)], 0))
        .await
        .unwrap();
    fx.engine
        .create_stock_transfer(
            &fx.actor,
            &StockTransferRequest {
                product_id: rice.clone(),
                unit_id: "piece".to_string(),
                quantity: 4,
                from: StockHolder::Warehouse,
                to: rider.clone(),
                batch_number: None,
                notes: Some("morning route".to_string()),
            },
        )
        .await
        .unwrap();

    let mut request = sale(None, &safe.id, vec![sale_line(&rice, 3, 80)], 0);
    request.employee_id = Some("e-1".to_string());
    let sold = fx.engine.create_sale(&fx.actor, &request).await.unwrap();
    assert_eq!(sold.sale.stock_holder(), rider);

    assert_eq!(fx.on_hand(&rider, &rice).await, 1);
    assert_eq!(fx.on_hand(&StockHolder::Warehouse, &rice).await, 6);
    let employee = fx.engine.account_by_ref(AccountType::Employee, "e-1").await.unwrap();
    assert_eq!(employee.current_balance(), afn(240));

    let err = fx.engine.create_sale(&fx.actor, &request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    assert_eq!(fx.on_hand(&rider, &rice).await, 1);
}
