//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use hisab_core::{Account, AccountType, Actor, Money, Product, ProductUnit, StockHolder, Unit};
use hisab_engine::{
    Engine, EngineConfig, OpenAccountRequest, PurchaseItemRequest, PurchaseRequest,
    SaleItemRequest, SaleRequest,
};

pub const CARTON_FACTOR: i64 = 12;

pub struct Fixture {
    pub engine: Engine,
    pub actor: Actor,
}

impl Fixture {
    /// Fresh in-memory engine with `piece` and `carton` units.
    pub async fn new() -> Self {
        let engine = Engine::open(EngineConfig::in_memory()).await.unwrap();

        let mut uow = engine.database().unit_of_work().await.unwrap();
        for (id, name) in [("piece", "Piece"), ("carton", "Carton")] {
            uow.products()
                .insert_unit(&Unit {
                    id: id.to_string(),
                    name: name.to_string(),
                    is_deleted: false,
                })
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();

        Fixture {
            engine,
            actor: Actor::new("u-1", "Admin"),
        }
    }

    /// Creates a product sold by the piece and by the carton.
    pub async fn product(&self, name: &str, tracks_batches: bool) -> String {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            base_unit_id: "piece".to_string(),
            tracks_batches,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let mut uow = self.engine.database().unit_of_work().await.unwrap();
        uow.products().insert(&product).await.unwrap();
        uow.products()
            .set_factor(&ProductUnit {
                product_id: product.id.clone(),
                unit_id: "carton".to_string(),
                factor: CARTON_FACTOR,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();

        product.id
    }

    pub async fn money_account(&self, account_type: AccountType, opening: i64) -> Account {
        self.engine
            .open_account(
                &self.actor,
                &OpenAccountRequest {
                    account_type,
                    ref_id: None,
                    name: format!("Main {}", account_type.as_str()),
                    opening_balance: afn(opening),
                    currency: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn balance(&self, account_id: &str) -> Money {
        self.engine.account(account_id).await.unwrap().current_balance()
    }

    pub async fn on_hand(&self, holder: &StockHolder, product_id: &str) -> i64 {
        self.engine.stock_on_hand(holder, product_id).await.unwrap()
    }

    pub async fn assert_consistent(&self, account_id: &str) {
        let report = self.engine.verify_balance(account_id).await.unwrap();
        assert!(report.is_consistent(), "inconsistent balance: {report:?}");
    }
}

/// Whole afghanis.
pub fn afn(major: i64) -> Money {
    Money::from_major_minor(major, 0)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

pub fn purchase_line(product_id: &str, quantity: i64, unit_cost: i64) -> PurchaseItemRequest {
    PurchaseItemRequest {
        product_id: product_id.to_string(),
        unit_id: "piece".to_string(),
        quantity,
        unit_cost: afn(unit_cost),
        batch_number: None,
        expiry_date: None,
    }
}

pub fn purchase(
    supplier_id: &str,
    money_account_id: Option<&str>,
    items: Vec<PurchaseItemRequest>,
    paid: i64,
) -> PurchaseRequest {
    PurchaseRequest {
        supplier_id: supplier_id.to_string(),
        money_account_id: money_account_id.map(str::to_string),
        location: None,
        items,
        paid: afn(paid),
        notes: None,
    }
}

pub fn sale_line(product_id: &str, quantity: i64, unit_price: i64) -> SaleItemRequest {
    SaleItemRequest {
        product_id: product_id.to_string(),
        unit_id: "piece".to_string(),
        quantity,
        unit_price: afn(unit_price),
        batch_number: None,
    }
}

/// Sale drawn from the warehouse, where purchases land by default.
pub fn sale(
    customer_id: Option<&str>,
    money_account_id: &str,
    items: Vec<SaleItemRequest>,
    paid: i64,
) -> SaleRequest {
    SaleRequest {
        customer_id: customer_id.map(str::to_string),
        employee_id: None,
        money_account_id: money_account_id.to_string(),
        invoice_kind: None,
        location: Some(hisab_core::Location::Warehouse),
        items,
        paid: afn(paid),
        notes: None,
    }
}
