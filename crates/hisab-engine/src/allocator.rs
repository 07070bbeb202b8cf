//! # Stock Allocator
//!
//! Applies stock movements to a holder: a location (`warehouse`, `store`)
//! or an employee. Planning is delegated to
//! [`hisab_core::allocation::plan_allocation`]; this module loads the
//! candidate lots and writes the result.
//!
//! ## Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  receive(batch, qty, cost, expiry)                                     │
//! │     existing row → qty += n, cost re-weighted, earliest expiry kept    │
//! │     no row       → new row                                             │
//! │                                                                         │
//! │  allocate(qty, batch?)                                                 │
//! │     plan (sentinel / explicit / FEFO) → take() each planned slice      │
//! │     short → InsufficientStock, nothing taken                           │
//! │                                                                         │
//! │  restore(draws)      → receive() each slice back at its drawn cost     │
//! │  take_exact(receipt) → undo a receive(): qty -= n, cost un-weighted    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use hisab_core::allocation::{
    merged_expiry, plan_allocation, reweighted_cost, unweighted_cost, AllocationMode, BatchDraw,
    BatchLot,
};
use hisab_core::validation::validate_quantity;
use hisab_core::{CoreError, EmployeeStockRecord, Location, Money, Product, StockHolder, StockRecord};
use hisab_db::UnitOfWork;

use crate::error::{EngineError, EngineResult};

/// One receipt into a holder.
#[derive(Debug, Clone)]
pub(crate) struct Receipt<'a> {
    pub product_id: &'a str,
    pub batch_number: &'a str,
    pub quantity: i64,
    pub cost_per_base_unit: Money,
    pub expiry_date: Option<NaiveDate>,
}

impl<'a> Receipt<'a> {
    /// Receipt that puts a drawn slice back where it came from.
    pub fn from_draw(product_id: &'a str, draw: &'a BatchDraw) -> Self {
        Receipt {
            product_id,
            batch_number: &draw.batch_number,
            quantity: draw.quantity,
            cost_per_base_unit: draw.cost_per_unit(),
            expiry_date: draw.expiry_date,
        }
    }
}

/// Adds stock to a holder, creating the batch row if needed.
pub(crate) async fn receive(
    uow: &mut UnitOfWork,
    holder: &StockHolder,
    receipt: &Receipt<'_>,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    validate_quantity(receipt.quantity)?;

    debug!(
        product_id = %receipt.product_id,
        batch = %receipt.batch_number,
        holder = %holder.label(),
        quantity = receipt.quantity,
        "Receiving stock"
    );

    match holder {
        StockHolder::Employee(employee_id) => {
            let existing = uow
                .employee_stock()
                .find(employee_id, receipt.product_id, receipt.batch_number)
                .await?;
            match existing {
                Some(record) => {
                    let (quantity, cost, expiry) = merged_levels(
                        record.quantity,
                        record.cost_per_base_unit(),
                        record.expiry_date,
                        receipt,
                    );
                    uow.employee_stock()
                        .update_levels(&record.id, quantity, cost.cents(), expiry, now)
                        .await?;
                }
                None => {
                    let record = EmployeeStockRecord {
                        id: Uuid::new_v4().to_string(),
                        employee_id: employee_id.clone(),
                        product_id: receipt.product_id.to_string(),
                        batch_number: receipt.batch_number.to_string(),
                        quantity: receipt.quantity,
                        cost_per_base_unit_cents: receipt.cost_per_base_unit.cents(),
                        expiry_date: receipt.expiry_date,
                        is_deleted: false,
                        created_at: now,
                        updated_at: now,
                    };
                    uow.employee_stock().insert(&record).await?;
                }
            }
        }
        StockHolder::Warehouse | StockHolder::Store => {
            let location = location_of(holder)?;
            let existing = uow
                .stock()
                .find(receipt.product_id, receipt.batch_number, location)
                .await?;
            match existing {
                Some(record) => {
                    let (quantity, cost, expiry) = merged_levels(
                        record.quantity,
                        record.cost_per_base_unit(),
                        record.expiry_date,
                        receipt,
                    );
                    uow.stock()
                        .update_levels(&record.id, quantity, cost.cents(), expiry, now)
                        .await?;
                }
                None => {
                    let record = StockRecord {
                        id: Uuid::new_v4().to_string(),
                        product_id: receipt.product_id.to_string(),
                        batch_number: receipt.batch_number.to_string(),
                        location,
                        quantity: receipt.quantity,
                        cost_per_base_unit_cents: receipt.cost_per_base_unit.cents(),
                        expiry_date: receipt.expiry_date,
                        is_deleted: false,
                        created_at: now,
                        updated_at: now,
                    };
                    uow.stock().insert(&record).await?;
                }
            }
        }
    }

    Ok(())
}

fn merged_levels(
    quantity: i64,
    cost: Money,
    expiry: Option<NaiveDate>,
    receipt: &Receipt<'_>,
) -> (i64, Money, Option<NaiveDate>) {
    (
        quantity + receipt.quantity,
        reweighted_cost(quantity, cost, receipt.quantity, receipt.cost_per_base_unit),
        merged_expiry(expiry, receipt.expiry_date),
    )
}

/// Draws `quantity` base units of `product` from `holder`.
///
/// Locations use FEFO unless a batch is named (or the product is not
/// batch-tracked); employees draw from the named batch or the sentinel.
///
/// ## Returns
/// The slices taken, in draw order.
pub(crate) async fn allocate(
    uow: &mut UnitOfWork,
    holder: &StockHolder,
    product: &Product,
    quantity: i64,
    requested_batch: Option<&str>,
    now: DateTime<Utc>,
) -> EngineResult<Vec<BatchDraw>> {
    // (record id, lot) per live batch, creation order
    let lots: Vec<(String, BatchLot)> = match holder {
        StockHolder::Employee(employee_id) => uow
            .employee_stock()
            .list_lots(employee_id, &product.id)
            .await?
            .iter()
            .map(|record| (record.id.clone(), BatchLot::from(record)))
            .collect(),
        StockHolder::Warehouse | StockHolder::Store => uow
            .stock()
            .list_lots(&product.id, location_of(holder)?)
            .await?
            .iter()
            .map(|record| (record.id.clone(), BatchLot::from(record)))
            .collect(),
    };

    let mode = match holder {
        StockHolder::Employee(_) => AllocationMode::for_employee(requested_batch),
        _ => AllocationMode::for_location(product.tracks_batches, requested_batch),
    };

    let candidates: Vec<BatchLot> = lots.iter().map(|(_, lot)| lot.clone()).collect();
    let plan = plan_allocation(&product.id, holder, &candidates, quantity, mode)?;

    for draw in &plan {
        let record_id = lots
            .iter()
            .find(|(_, lot)| lot.batch_number == draw.batch_number)
            .map(|(id, _)| id.as_str())
            .ok_or_else(|| {
                EngineError::internal(format!("planned batch {} has no stock row", draw.batch_number))
            })?;
        take_row(uow, holder, record_id, draw.quantity, now).await?;
    }

    debug!(
        product_id = %product.id,
        holder = %holder.label(),
        quantity,
        batches = plan.len(),
        "Allocated stock"
    );
    Ok(plan)
}

/// Puts previously drawn slices back into `holder`.
pub(crate) async fn restore(
    uow: &mut UnitOfWork,
    holder: &StockHolder,
    product_id: &str,
    draws: &[BatchDraw],
    now: DateTime<Utc>,
) -> EngineResult<()> {
    for draw in draws {
        receive(uow, holder, &Receipt::from_draw(product_id, draw), now).await?;
    }
    Ok(())
}

/// Takes back exactly what `receipt` put into one batch.
///
/// Used when a purchase, transfer or return is undone. The quantity is
/// removed and the receipt is backed out of the batch's weighted cost.
///
/// ## Errors
/// `InsufficientStock` if the batch no longer holds that much (it was
/// sold or moved on since).
pub(crate) async fn take_exact(
    uow: &mut UnitOfWork,
    holder: &StockHolder,
    receipt: &Receipt<'_>,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    // (id, quantity, cost, expiry)
    let row: Option<(String, i64, Money, Option<NaiveDate>)> = match holder {
        StockHolder::Employee(employee_id) => uow
            .employee_stock()
            .find(employee_id, receipt.product_id, receipt.batch_number)
            .await?
            .map(|record| {
                let cost = record.cost_per_base_unit();
                (record.id, record.quantity, cost, record.expiry_date)
            }),
        StockHolder::Warehouse | StockHolder::Store => uow
            .stock()
            .find(receipt.product_id, receipt.batch_number, location_of(holder)?)
            .await?
            .map(|record| {
                let cost = record.cost_per_base_unit();
                (record.id, record.quantity, cost, record.expiry_date)
            }),
    };

    let (id, available, cost, expiry) = match row {
        Some(row) if row.1 >= receipt.quantity => row,
        other => {
            return Err(CoreError::InsufficientStock {
                product_id: receipt.product_id.to_string(),
                holder: holder.label(),
                batch: Some(receipt.batch_number.to_string()),
                available: other.map(|row| row.1).unwrap_or(0),
                requested: receipt.quantity,
            }
            .into())
        }
    };

    let quantity = available - receipt.quantity;
    let cost = unweighted_cost(available, cost, receipt.quantity, receipt.cost_per_base_unit);
    debug!(
        product_id = %receipt.product_id,
        batch = %receipt.batch_number,
        holder = %holder.label(),
        quantity = receipt.quantity,
        "Taking back received stock"
    );
    match holder {
        StockHolder::Employee(_) => {
            uow.employee_stock()
                .update_levels(&id, quantity, cost.cents(), expiry, now)
                .await?
        }
        StockHolder::Warehouse | StockHolder::Store => {
            uow.stock()
                .update_levels(&id, quantity, cost.cents(), expiry, now)
                .await?
        }
    }
    Ok(())
}

/// Σ quantity of a product held by `holder`.
pub(crate) async fn on_hand(
    uow: &mut UnitOfWork,
    holder: &StockHolder,
    product_id: &str,
) -> EngineResult<i64> {
    let quantity = match holder {
        StockHolder::Employee(employee_id) => {
            uow.employee_stock().quantity_on_hand(employee_id, product_id).await?
        }
        StockHolder::Warehouse | StockHolder::Store => {
            uow.stock().quantity_on_hand(product_id, location_of(holder)?).await?
        }
    };
    Ok(quantity)
}

async fn take_row(
    uow: &mut UnitOfWork,
    holder: &StockHolder,
    record_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let taken = match holder {
        StockHolder::Employee(_) => uow.employee_stock().take(record_id, quantity, now).await?,
        StockHolder::Warehouse | StockHolder::Store => uow.stock().take(record_id, quantity, now).await?,
    };
    if !taken {
        return Err(EngineError::conflict(format!(
            "Stock row {record_id} changed during allocation"
        )));
    }
    Ok(())
}

fn location_of(holder: &StockHolder) -> EngineResult<Location> {
    match holder {
        StockHolder::Warehouse => Ok(Location::Warehouse),
        StockHolder::Store => Ok(Location::Store),
        StockHolder::Employee(id) => Err(EngineError::internal(format!(
            "employee {id} is not a location"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use hisab_core::{Unit, DEFAULT_BATCH};
    use hisab_db::{Database, DbConfig};

    fn product(tracks_batches: bool) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: "Green Tea 100g".to_string(),
            base_unit_id: "piece".to_string(),
            tracks_batches,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup(tracks_batches: bool) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = product(tracks_batches);
        let mut uow = db.unit_of_work().await.unwrap();
        uow.products()
            .insert_unit(&Unit {
                id: "piece".to_string(),
                name: "Piece".to_string(),
                is_deleted: false,
            })
            .await
            .unwrap();
        uow.products().insert(&product).await.unwrap();
        uow.commit().await.unwrap();
        (db, product)
    }

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 3, d)
    }

    #[tokio::test]
    async fn test_receive_reweights_cost_and_keeps_earliest_expiry() {
        let (db, product) = setup(true).await;
        let mut uow = db.unit_of_work().await.unwrap();
        let now = Utc::now();
        let store = StockHolder::Store;

        let first = Receipt {
            product_id: &product.id,
            batch_number: "B1",
            quantity: 10,
            cost_per_base_unit: Money::from_cents(1_000),
            expiry_date: day(10),
        };
        receive(&mut uow, &store, &first, now).await.unwrap();

        let second = Receipt {
            quantity: 30,
            cost_per_base_unit: Money::from_cents(2_000),
            expiry_date: day(20),
            ..first.clone()
        };
        receive(&mut uow, &store, &second, now).await.unwrap();

        let record = uow.stock().find(&product.id, "B1", Location::Store).await.unwrap().unwrap();
        assert_eq!(record.quantity, 40);
        // (10×1000 + 30×2000) / 40
        assert_eq!(record.cost_per_base_unit_cents, 1_750);
        assert_eq!(record.expiry_date, day(10));
    }

    #[tokio::test]
    async fn test_fefo_draw_spans_batches_in_expiry_order() {
        let (db, product) = setup(true).await;
        let mut uow = db.unit_of_work().await.unwrap();
        let now = Utc::now();
        let store = StockHolder::Store;

        for (batch, quantity, cost, expiry) in [("B2", 5, 1_200, day(10)), ("B1", 3, 1_000, day(5))] {
            let receipt = Receipt {
                product_id: &product.id,
                batch_number: batch,
                quantity,
                cost_per_base_unit: Money::from_cents(cost),
                expiry_date: expiry,
            };
            receive(&mut uow, &store, &receipt, now).await.unwrap();
        }

        let draws = allocate(&mut uow, &store, &product, 6, None, now).await.unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!((draws[0].batch_number.as_str(), draws[0].quantity), ("B1", 3));
        assert_eq!((draws[1].batch_number.as_str(), draws[1].quantity), ("B2", 3));

        assert_eq!(on_hand(&mut uow, &store, &product.id).await.unwrap(), 2);
        let b1 = uow.stock().find(&product.id, "B1", Location::Store).await.unwrap().unwrap();
        assert_eq!(b1.quantity, 0);
    }

    #[tokio::test]
    async fn test_short_draw_takes_nothing() {
        let (db, product) = setup(true).await;
        let mut uow = db.unit_of_work().await.unwrap();
        let now = Utc::now();
        let store = StockHolder::Store;

        let receipt = Receipt {
            product_id: &product.id,
            batch_number: "B1",
            quantity: 4,
            cost_per_base_unit: Money::from_cents(500),
            expiry_date: None,
        };
        receive(&mut uow, &store, &receipt, now).await.unwrap();

        let err = allocate(&mut uow, &store, &product, 5, None, now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(on_hand(&mut uow, &store, &product.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_untracked_product_uses_sentinel_batch() {
        let (db, product) = setup(false).await;
        let mut uow = db.unit_of_work().await.unwrap();
        let now = Utc::now();
        let warehouse = StockHolder::Warehouse;

        let receipt = Receipt {
            product_id: &product.id,
            batch_number: DEFAULT_BATCH,
            quantity: 12,
            cost_per_base_unit: Money::from_cents(300),
            expiry_date: None,
        };
        receive(&mut uow, &warehouse, &receipt, now).await.unwrap();

        let draws = allocate(&mut uow, &warehouse, &product, 5, Some("IGNORED"), now)
            .await
            .unwrap();
        assert_eq!(draws[0].batch_number, DEFAULT_BATCH);
        assert_eq!(on_hand(&mut uow, &warehouse, &product.id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_employee_stock_restore_and_take_exact() {
        let (db, product) = setup(true).await;
        let mut uow = db.unit_of_work().await.unwrap();
        let now = Utc::now();
        let rider = StockHolder::Employee("emp-7".to_string());

        let draws = vec![BatchDraw {
            batch_number: "B9".to_string(),
            quantity: 6,
            cost_per_unit_cents: 800,
            expiry_date: day(1),
        }];
        restore(&mut uow, &rider, &product.id, &draws, now).await.unwrap();
        assert_eq!(on_hand(&mut uow, &rider, &product.id).await.unwrap(), 6);

        let too_many = BatchDraw {
            quantity: 7,
            ..draws[0].clone()
        };
        let err = take_exact(&mut uow, &rider, &Receipt::from_draw(&product.id, &too_many), now)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        take_exact(&mut uow, &rider, &Receipt::from_draw(&product.id, &draws[0]), now)
            .await
            .unwrap();
        assert_eq!(on_hand(&mut uow, &rider, &product.id).await.unwrap(), 0);

        // employees never fall back to FEFO
        restore(&mut uow, &rider, &product.id, &draws, now).await.unwrap();
        let err = allocate(&mut uow, &rider, &product, 1, None, now).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        let drawn = allocate(&mut uow, &rider, &product, 2, Some("B9"), now).await.unwrap();
        assert_eq!(drawn[0].cost_per_unit_cents, 800);
    }

    #[tokio::test]
    async fn test_take_exact_backs_receipt_out_of_cost() {
        let (db, product) = setup(true).await;
        let mut uow = db.unit_of_work().await.unwrap();
        let now = Utc::now();
        let warehouse = StockHolder::Warehouse;

        let cheap = Receipt {
            product_id: &product.id,
            batch_number: "B1",
            quantity: 10,
            cost_per_base_unit: Money::from_cents(5_000),
            expiry_date: day(20),
        };
        let dear = Receipt {
            cost_per_base_unit: Money::from_cents(10_000),
            expiry_date: day(12),
            ..cheap.clone()
        };
        receive(&mut uow, &warehouse, &cheap, now).await.unwrap();
        receive(&mut uow, &warehouse, &dear, now).await.unwrap();

        let record = uow.stock().find(&product.id, "B1", Location::Warehouse).await.unwrap().unwrap();
        assert_eq!(record.cost_per_base_unit_cents, 7_500);
        assert_eq!(record.expiry_date, day(12));

        take_exact(&mut uow, &warehouse, &dear, now).await.unwrap();
        let record = uow.stock().find(&product.id, "B1", Location::Warehouse).await.unwrap().unwrap();
        assert_eq!(record.quantity, 10);
        assert_eq!(record.cost_per_base_unit_cents, 5_000);
    }
}
