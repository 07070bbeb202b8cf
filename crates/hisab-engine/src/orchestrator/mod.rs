//! # Transaction Orchestrators
//!
//! Each orchestrator composes the ledger, the journal and the stock
//! allocator into one business operation. All of them run inside the unit
//! of work the [`Engine`](crate::Engine) opened for the call.
//!
//! ## Layout
//! ```text
//! orchestrator/
//! ├── mod.rs       ◄─── You are here (shared helpers)
//! ├── sale.rs      ◄─── Sales: create, delete, restore, update
//! ├── returns.rs   ◄─── Sale returns and their deletion
//! ├── purchase.rs  ◄─── Purchases: create, delete, restore, update
//! ├── transfer.rs  ◄─── Stock transfers between holders
//! └── money.rs     ◄─── Expenses, income, payments, fund transfers
//! ```
//!
//! ## Ordering Inside One Call
//! ```text
//! validate request ──► resolve units ──► move stock ──► post journal ──► audit
//!        │                                    │               │
//!        └── fails before any write           └── any failure drops the
//!                                                 unit of work: rollback
//! ```

pub(crate) mod money;
pub(crate) mod purchase;
pub(crate) mod returns;
pub(crate) mod sale;
pub(crate) mod transfer;

use hisab_core::units::UnitTable;
use hisab_core::validation::validate_name;
use hisab_core::{Account, AccountType, Product};
use hisab_db::UnitOfWork;

use crate::context::Context;
use crate::error::EngineResult;
use crate::ledger;

/// Loads a live product and converts `quantity` of `unit_id` into base units.
pub(crate) async fn resolve_quantity(
    uow: &mut UnitOfWork,
    product_id: &str,
    unit_id: &str,
    quantity: i64,
) -> EngineResult<(Product, i64)> {
    let product = uow.products().get_active(product_id).await?;
    let units = uow.products().units_for(product_id).await?;
    let base_quantity =
        UnitTable::new(&product.id, &product.base_unit_id, &units).to_base(unit_id, quantity)?;
    Ok((product, base_quantity))
}

/// Account a sale is booked against: the customer's, else the employee's.
/// Walk-in sales have none.
pub(crate) async fn sale_counterparty(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    customer_id: Option<&str>,
    employee_id: Option<&str>,
) -> EngineResult<Option<Account>> {
    let (account_type, ref_id) = match (customer_id, employee_id) {
        (Some(customer_id), _) => (AccountType::Customer, customer_id),
        (None, Some(employee_id)) => (AccountType::Employee, employee_id),
        (None, None) => return Ok(None),
    };
    let account = ledger::get_or_create(uow, ctx, account_type, ref_id, ref_id, &ctx.currency).await?;
    Ok(Some(account))
}

/// Rejects blank optional references before they reach storage.
pub(crate) fn validate_ref(field: &str, value: Option<&str>) -> EngineResult<()> {
    if let Some(value) = value {
        validate_name(field, value)?;
    }
    Ok(())
}
