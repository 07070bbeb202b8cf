//! # Batch Allocation Planner
//!
//! Decides which batches a draw of N base units comes from. Pure: the
//! caller loads candidate lots, this module plans, the caller applies.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Allocation Mode Selection                           │
//! │                                                                         │
//! │   product.tracks_batches == false ──► Untracked  (DEFAULT batch only)   │
//! │   requested batch given          ──► Explicit   (that batch only)       │
//! │   otherwise                      ──► Fefo                               │
//! │                                                                         │
//! │   FEFO order:                                                           │
//! │     1. expiry_date ascending, lots without expiry last                  │
//! │     2. created_at ascending (FIFO tiebreak)                             │
//! │     3. greedy: take min(remaining, lot.quantity) from each lot          │
//! │                                                                         │
//! │   All-or-nothing: if Σ available < requested → InsufficientStock and    │
//! │   an empty plan. Nothing is ever partially consumed.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use hisab_core::allocation::{plan_allocation, AllocationMode, BatchLot};
//! use hisab_core::StockHolder;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2026, 1, d);
//! let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
//! let lots = vec![
//!     BatchLot::new("B2", 5, 1200, day(10), created),
//!     BatchLot::new("B1", 3, 1000, day(5), created),
//! ];
//!
//! let plan = plan_allocation("P", &StockHolder::Store, &lots, 6, AllocationMode::Fefo).unwrap();
//! assert_eq!(plan[0].batch_number, "B1");
//! assert_eq!(plan[0].quantity, 3);
//! assert_eq!(plan[1].batch_number, "B2");
//! assert_eq!(plan[1].quantity, 3);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{EmployeeStockRecord, StockHolder, StockRecord};
use crate::DEFAULT_BATCH;

// =============================================================================
// Types
// =============================================================================

/// One slice of a draw: `quantity` base units taken from `batch_number`.
///
/// Stored on sale items, transfers and returns so the movement can be
/// undone into the exact batches it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BatchDraw {
    pub batch_number: String,
    pub quantity: i64,
    pub cost_per_unit_cents: i64,
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl BatchDraw {
    #[inline]
    pub fn cost_per_unit(&self) -> Money {
        Money::from_cents(self.cost_per_unit_cents)
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        self.cost_per_unit().multiply_quantity(self.quantity)
    }
}

/// A candidate lot the planner can draw from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLot {
    pub batch_number: String,
    pub quantity: i64,
    pub cost_per_base_unit_cents: i64,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl BatchLot {
    pub fn new(
        batch_number: impl Into<String>,
        quantity: i64,
        cost_per_base_unit_cents: i64,
        expiry_date: Option<NaiveDate>,
        created_at: DateTime<Utc>,
    ) -> Self {
        BatchLot {
            batch_number: batch_number.into(),
            quantity,
            cost_per_base_unit_cents,
            expiry_date,
            created_at,
        }
    }

    fn draw(&self, quantity: i64) -> BatchDraw {
        BatchDraw {
            batch_number: self.batch_number.clone(),
            quantity,
            cost_per_unit_cents: self.cost_per_base_unit_cents,
            expiry_date: self.expiry_date,
        }
    }
}

impl From<&StockRecord> for BatchLot {
    fn from(record: &StockRecord) -> Self {
        BatchLot::new(
            record.batch_number.clone(),
            record.quantity,
            record.cost_per_base_unit_cents,
            record.expiry_date,
            record.created_at,
        )
    }
}

impl From<&EmployeeStockRecord> for BatchLot {
    fn from(record: &EmployeeStockRecord) -> Self {
        BatchLot::new(
            record.batch_number.clone(),
            record.quantity,
            record.cost_per_base_unit_cents,
            record.expiry_date,
            record.created_at,
        )
    }
}

/// How a draw picks its batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode<'a> {
    /// Product does not track batches: the `DEFAULT` batch only.
    Untracked,
    /// Caller named a batch: that batch only.
    Explicit(&'a str),
    /// First-expiry-first-out, FIFO on ties.
    Fefo,
}

impl<'a> AllocationMode<'a> {
    /// Picks the mode for a location draw.
    pub fn for_location(tracks_batches: bool, requested_batch: Option<&'a str>) -> Self {
        match (tracks_batches, requested_batch) {
            (false, _) => AllocationMode::Untracked,
            (true, Some(batch)) => AllocationMode::Explicit(batch),
            (true, None) => AllocationMode::Fefo,
        }
    }

    /// Employee stock has no FEFO: a named batch or the sentinel.
    pub fn for_employee(requested_batch: Option<&'a str>) -> Self {
        match requested_batch {
            Some(batch) => AllocationMode::Explicit(batch),
            None => AllocationMode::Untracked,
        }
    }
}

// =============================================================================
// Planning
// =============================================================================

/// Plans a draw of `requested` base units from `lots`.
///
/// ## Errors
/// - `Validation` when `requested` is not positive
/// - `InsufficientStock` naming product, holder and batch (when known)
pub fn plan_allocation(
    product_id: &str,
    holder: &StockHolder,
    lots: &[BatchLot],
    requested: i64,
    mode: AllocationMode<'_>,
) -> CoreResult<Vec<BatchDraw>> {
    if requested <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    match mode {
        AllocationMode::Untracked => plan_single(product_id, holder, lots, requested, DEFAULT_BATCH),
        AllocationMode::Explicit(batch) => plan_single(product_id, holder, lots, requested, batch),
        AllocationMode::Fefo => plan_fefo(product_id, holder, lots, requested),
    }
}

fn plan_single(
    product_id: &str,
    holder: &StockHolder,
    lots: &[BatchLot],
    requested: i64,
    batch: &str,
) -> CoreResult<Vec<BatchDraw>> {
    let lot = lots.iter().find(|lot| lot.batch_number == batch);
    let available = lot.map(|lot| lot.quantity).unwrap_or(0);

    match lot {
        Some(lot) if available >= requested => Ok(vec![lot.draw(requested)]),
        _ => Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            holder: holder.label(),
            batch: Some(batch.to_string()),
            available,
            requested,
        }),
    }
}

fn plan_fefo(
    product_id: &str,
    holder: &StockHolder,
    lots: &[BatchLot],
    requested: i64,
) -> CoreResult<Vec<BatchDraw>> {
    let mut candidates: Vec<&BatchLot> = lots.iter().filter(|lot| lot.quantity > 0).collect();
    candidates.sort_by(|a, b| {
        a.expiry_date
            .is_none()
            .cmp(&b.expiry_date.is_none())
            .then_with(|| a.expiry_date.cmp(&b.expiry_date))
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    let available: i64 = candidates.iter().map(|lot| lot.quantity).sum();
    if available < requested {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            holder: holder.label(),
            batch: None,
            available,
            requested,
        });
    }

    let mut remaining = requested;
    let mut plan = Vec::new();
    for lot in candidates {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(lot.quantity);
        plan.push(lot.draw(take));
        remaining -= take;
    }

    Ok(plan)
}

// =============================================================================
// Costing
// =============================================================================

/// Σ(quantity × cost) over a plan.
pub fn total_cost(draws: &[BatchDraw]) -> Money {
    draws.iter().map(BatchDraw::total_cost).sum()
}

/// Weighted average cost per base unit, rounded half away from zero.
pub fn weighted_unit_cost(draws: &[BatchDraw]) -> Money {
    let quantity: i64 = draws.iter().map(|d| d.quantity).sum();
    total_cost(draws).mul_div_round(1, quantity)
}

/// Re-weights a stock record's cost when `incoming` units arrive.
///
/// `(q₀c₀ + q₁c₁) / (q₀ + q₁)`. An empty record takes the incoming cost.
pub fn reweighted_cost(
    existing_quantity: i64,
    existing_cost: Money,
    incoming_quantity: i64,
    incoming_cost: Money,
) -> Money {
    let existing_quantity = existing_quantity.max(0);
    let quantity = existing_quantity as i128 + incoming_quantity as i128;
    if existing_quantity == 0 || quantity <= 0 {
        return incoming_cost;
    }
    let value = existing_cost.cents() as i128 * existing_quantity as i128
        + incoming_cost.cents() as i128 * incoming_quantity as i128;
    Money::from_wide_ratio(value, quantity)
}

/// Backs a receipt of `outgoing` units out of a record's weighted cost.
///
/// `(q₀c₀ − q₁c₁) / (q₀ − q₁)`. When nothing would remain, or the units
/// left would carry a negative value because sales consumed the record at
/// the blended cost, the current cost is kept.
pub fn unweighted_cost(
    existing_quantity: i64,
    existing_cost: Money,
    outgoing_quantity: i64,
    outgoing_cost: Money,
) -> Money {
    let remaining = existing_quantity as i128 - outgoing_quantity.max(0) as i128;
    if remaining <= 0 {
        return existing_cost;
    }
    let value = existing_cost.cents() as i128 * existing_quantity as i128
        - outgoing_cost.cents() as i128 * outgoing_quantity.max(0) as i128;
    if value < 0 {
        return existing_cost;
    }
    Money::from_wide_ratio(value, remaining)
}

/// Expiry kept when units are added to an existing record: the earlier of
/// the two, so FEFO never sells a short-dated receipt late.
pub fn merged_expiry(existing: Option<NaiveDate>, incoming: Option<NaiveDate>) -> Option<NaiveDate> {
    match (existing, incoming) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

// =============================================================================
// Returns
// =============================================================================

/// Plans where `quantity` returned base units go back to.
///
/// Walks `draws` from the last-drawn batch backwards, skipping the
/// `already_returned` units that earlier returns put back.
pub fn plan_return(draws: &[BatchDraw], already_returned: i64, quantity: i64) -> Vec<BatchDraw> {
    let mut skip = already_returned.max(0);
    let mut remaining = quantity.max(0);
    let mut plan = Vec::new();

    for draw in draws.iter().rev() {
        if remaining == 0 {
            break;
        }
        let mut left_in_draw = draw.quantity;
        if skip > 0 {
            let skipped = skip.min(left_in_draw);
            skip -= skipped;
            left_in_draw -= skipped;
        }
        if left_in_draw == 0 {
            continue;
        }
        let take = remaining.min(left_in_draw);
        plan.push(BatchDraw {
            quantity: take,
            ..draw.clone()
        });
        remaining -= take;
    }

    plan
}

/// Batch number for a batch-tracked receipt with no batch given:
/// `B<yyyymmdd>-<first 8 chars of id>`.
pub fn generated_batch_number(date: NaiveDate, id: &str) -> String {
    let suffix: String = id
        .chars()
        .filter(|c| *c != '-')
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("B{}-{}", date.format("%Y%m%d"), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 3, d)
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, minute, 0).unwrap()
    }

    #[test]
    fn test_fefo_takes_earliest_expiry_first() {
        let lots = vec![
            BatchLot::new("B2", 5, 1200, day(10), at(0)),
            BatchLot::new("B1", 3, 1000, day(5), at(1)),
        ];

        let plan = plan_allocation("P", &StockHolder::Store, &lots, 6, AllocationMode::Fefo).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!((plan[0].batch_number.as_str(), plan[0].quantity), ("B1", 3));
        assert_eq!((plan[1].batch_number.as_str(), plan[1].quantity), ("B2", 3));
        assert_eq!(total_cost(&plan).cents(), 3 * 1000 + 3 * 1200);
        assert_eq!(weighted_unit_cost(&plan).cents(), 1100);
    }

    #[test]
    fn test_fefo_puts_undated_lots_last_and_breaks_ties_by_creation() {
        let lots = vec![
            BatchLot::new("NOEXP", 10, 100, None, at(0)),
            BatchLot::new("LATE", 2, 100, day(5), at(9)),
            BatchLot::new("EARLY", 2, 100, day(5), at(1)),
        ];

        let plan = plan_allocation("P", &StockHolder::Warehouse, &lots, 5, AllocationMode::Fefo).unwrap();
        let order: Vec<&str> = plan.iter().map(|d| d.batch_number.as_str()).collect();

        assert_eq!(order, vec!["EARLY", "LATE", "NOEXP"]);
        assert_eq!(plan[2].quantity, 1);
    }

    #[test]
    fn test_fefo_skips_empty_lots() {
        let lots = vec![
            BatchLot::new("EMPTY", 0, 100, day(1), at(0)),
            BatchLot::new("FULL", 4, 100, day(2), at(0)),
        ];
        let plan = plan_allocation("P", &StockHolder::Store, &lots, 4, AllocationMode::Fefo).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_number, "FULL");
    }

    #[test]
    fn test_fefo_shortfall_names_totals() {
        let lots = vec![
            BatchLot::new("B1", 3, 1000, day(5), at(0)),
            BatchLot::new("B2", 2, 1000, day(6), at(0)),
        ];

        let err = plan_allocation("P", &StockHolder::Store, &lots, 6, AllocationMode::Fefo).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                product_id,
                holder,
                batch,
                available,
                requested,
            } => {
                assert_eq!(product_id, "P");
                assert_eq!(holder, "store");
                assert_eq!(batch, None);
                assert_eq!(available, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_batch_draws_only_that_batch() {
        let lots = vec![
            BatchLot::new("B1", 3, 1000, day(5), at(0)),
            BatchLot::new("B2", 5, 1200, day(10), at(0)),
        ];

        let plan = plan_allocation("P", &StockHolder::Store, &lots, 4, AllocationMode::Explicit("B2")).unwrap();
        assert_eq!(plan, vec![lots[1].draw(4)]);

        let err = plan_allocation("P", &StockHolder::Store, &lots, 4, AllocationMode::Explicit("B1")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { batch: Some(ref b), available: 3, .. } if b == "B1"
        ));
    }

    #[test]
    fn test_untracked_uses_sentinel_batch() {
        let lots = vec![BatchLot::new(DEFAULT_BATCH, 7, 500, None, at(0))];
        let mode = AllocationMode::for_location(false, Some("IGNORED"));
        let plan = plan_allocation("P", &StockHolder::Store, &lots, 7, mode).unwrap();
        assert_eq!(plan[0].batch_number, DEFAULT_BATCH);

        let err = plan_allocation("P", &StockHolder::Store, &[], 1, mode).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 0, .. }));
    }

    #[test]
    fn test_employee_mode_defaults_to_sentinel() {
        assert_eq!(AllocationMode::for_employee(None), AllocationMode::Untracked);
        assert_eq!(AllocationMode::for_employee(Some("B1")), AllocationMode::Explicit("B1"));
    }

    #[test]
    fn test_non_positive_request_is_rejected() {
        let err = plan_allocation("P", &StockHolder::Store, &[], 0, AllocationMode::Fefo).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_reweighted_cost() {
        let cost = reweighted_cost(10, Money::from_cents(5000), 10, Money::from_cents(6000));
        assert_eq!(cost.cents(), 5500);

        let cost = reweighted_cost(0, Money::from_cents(5000), 4, Money::from_cents(7000));
        assert_eq!(cost.cents(), 7000);

        // (2×100 + 1×101) / 3 = 100.33 → 100
        let cost = reweighted_cost(2, Money::from_cents(100), 1, Money::from_cents(101));
        assert_eq!(cost.cents(), 100);
    }

    #[test]
    fn test_reweighted_cost_does_not_overflow_on_large_stock() {
        let cost = reweighted_cost(i64::MAX / 2, Money::from_cents(4), 1, Money::from_cents(4));
        assert_eq!(cost.cents(), 4);
    }

    #[test]
    fn test_unweighted_cost_backs_out_a_receipt() {
        // 10 @ 50.00 then 10 @ 100.00 → 20 @ 75.00; removing the second leaves 50.00
        let blended = reweighted_cost(10, Money::from_cents(5000), 10, Money::from_cents(10_000));
        assert_eq!(blended.cents(), 7500);
        let cost = unweighted_cost(20, blended, 10, Money::from_cents(10_000));
        assert_eq!(cost.cents(), 5000);

        // nothing left: cost unchanged
        assert_eq!(unweighted_cost(5, blended, 5, Money::from_cents(1)).cents(), 7500);
        // receipt worth more than what is left: cost unchanged
        assert_eq!(unweighted_cost(3, Money::from_cents(100), 2, Money::from_cents(900)).cents(), 100);
    }

    #[test]
    fn test_merged_expiry_keeps_earliest() {
        assert_eq!(merged_expiry(day(5), day(9)), day(5));
        assert_eq!(merged_expiry(day(9), day(5)), day(5));
        assert_eq!(merged_expiry(None, day(9)), day(9));
        assert_eq!(merged_expiry(day(9), None), day(9));
        assert_eq!(merged_expiry(None, None), None);
    }

    #[test]
    fn test_plan_return_walks_last_drawn_first() {
        let draws = vec![
            BatchDraw {
                batch_number: "B1".to_string(),
                quantity: 3,
                cost_per_unit_cents: 1000,
                expiry_date: day(5),
            },
            BatchDraw {
                batch_number: "B2".to_string(),
                quantity: 3,
                cost_per_unit_cents: 1200,
                expiry_date: day(10),
            },
        ];

        let first = plan_return(&draws, 0, 2);
        assert_eq!(first.len(), 1);
        assert_eq!((first[0].batch_number.as_str(), first[0].quantity), ("B2", 2));

        let second = plan_return(&draws, 2, 3);
        let slices: Vec<(&str, i64)> = second
            .iter()
            .map(|d| (d.batch_number.as_str(), d.quantity))
            .collect();
        assert_eq!(slices, vec![("B2", 1), ("B1", 2)]);
    }

    #[test]
    fn test_generated_batch_number() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            generated_batch_number(date, "1a2b3c4d-5e6f-7a8b-9c0d-112233445566"),
            "B20261019-1A2B3C4D"
        );
    }
}
