//! # Engine
//!
//! The public entry point. Every method opens one unit of work, runs one
//! orchestrator inside it and commits; any error drops the unit of work and
//! SQLite rolls the whole call back.
//!
//! ## Call Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine.create_sale(&actor, &request)                                  │
//! │       │                                                                 │
//! │       ├── Context::new(actor, reason)      validate actor, stamp time  │
//! │       ├── timeout(operation_timeout) ─┐                                │
//! │       │                               ▼                                │
//! │       │   db.unit_of_work()    writer gate + BEGIN                     │
//! │       │   sale::create(&mut uow, &ctx, &request)                       │
//! │       │   uow.commit()         COMMIT, gate released                   │
//! │       ▼                                                                 │
//! │  Ok(SaleOutcome) │ Err(EngineError { kind, message })                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads go through a unit of work too, so they never observe a write
//! half-applied by this process.

use std::future::Future;

use tracing::{info, warn};

use hisab_core::{
    Account, AccountType, Actor, AuditRecord, DocumentRef, JournalEntry, Purchase, Sale, SaleReturn,
    StockHolder, StockTransfer,
};
use hisab_db::Database;

use crate::allocator;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::journal;
use crate::ledger;
use crate::orchestrator::{money, purchase, returns, sale, transfer};
use crate::requests::{
    AdjustmentRequest, BalanceReport, ExpenseRequest, FundTransferRequest, GroupedEntries,
    IncomeRequest, OpenAccountRequest, PaymentRequest, PurchaseOutcome, PurchaseRequest,
    SaleOutcome, SaleRequest, SaleReturnOutcome, SaleReturnRequest, StockTransferRequest,
};

/// Runs `$body` inside a fresh unit of work on `$engine` and commits.
macro_rules! in_unit_of_work {
    ($engine:expr, |$uow:ident| $body:expr) => {
        $engine
            .run(async {
                let mut $uow = $engine.db.unit_of_work().await?;
                let out = $body;
                $uow.commit().await?;
                Ok::<_, EngineError>(out)
            })
            .await
    };
}

/// Ledger & inventory movement engine.
///
/// Cloning is cheap: clones share the pool and the writer gate.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    config: EngineConfig,
}

impl Engine {
    /// Connects to the configured database and runs migrations.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database_path.display(), "Engine ready");
        Ok(Engine { db, config })
    }

    /// Wraps an already opened database.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Engine { db, config }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn context<'a>(&self, actor: &'a Actor, reason: &str) -> EngineResult<Context<'a>> {
        Ok(Context::new(actor, reason)?.with_currency(&self.config.default_currency))
    }

    async fn run<T, F>(&self, operation: F) -> EngineResult<T>
    where
        F: Future<Output = EngineResult<T>>,
    {
        match self.config.operation_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "Operation timed out; rolled back");
                    Err(EngineError::internal("Operation timed out"))
                }
            },
            None => operation.await,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn open_account(
        &self,
        actor: &Actor,
        request: &OpenAccountRequest,
    ) -> EngineResult<Account> {
        let ctx = self.context(actor, "account opened")?;
        let account = in_unit_of_work!(self, |uow| {
            ledger::open(&mut uow, &ctx, request, &self.config.default_currency).await?
        })?;
        info!(account_id = %account.id, account_type = account.account_type.as_str(), "Account opened");
        Ok(account)
    }

    pub async fn delete_account(
        &self,
        actor: &Actor,
        account_id: &str,
        reason: &str,
    ) -> EngineResult<Account> {
        let ctx = self.context(actor, reason)?;
        let account = in_unit_of_work!(self, |uow| {
            ledger::soft_delete(&mut uow, &ctx, account_id).await?
        })?;
        info!(account_id = %account_id, "Account deleted");
        Ok(account)
    }

    pub async fn restore_account(
        &self,
        actor: &Actor,
        account_id: &str,
        reason: &str,
    ) -> EngineResult<Account> {
        let ctx = self.context(actor, reason)?;
        let account = in_unit_of_work!(self, |uow| {
            ledger::restore(&mut uow, &ctx, account_id).await?
        })?;
        info!(account_id = %account_id, "Account restored");
        Ok(account)
    }

    /// Gets an account regardless of lifecycle.
    pub async fn account(&self, account_id: &str) -> EngineResult<Account> {
        in_unit_of_work!(self, |uow| {
            uow.accounts()
                .find_by_id(account_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Account", account_id))?
        })
    }

    /// The live account of a supplier, customer or employee.
    pub async fn account_by_ref(&self, account_type: AccountType, ref_id: &str) -> EngineResult<Account> {
        in_unit_of_work!(self, |uow| {
            uow.accounts()
                .find_active_by_ref(account_type, ref_id)
                .await?
                .ok_or_else(|| EngineError::not_found(account_type.as_str(), ref_id))?
        })
    }

    /// Journal history of an account, in posting order.
    pub async fn entries_for(&self, account_id: &str) -> EngineResult<Vec<JournalEntry>> {
        in_unit_of_work!(self, |uow| uow.journal().list_for_account(account_id).await?)
    }

    /// Recomputes `current == opening + Σ effective entries` for an account.
    pub async fn verify_balance(&self, account_id: &str) -> EngineResult<BalanceReport> {
        let report = in_unit_of_work!(self, |uow| {
            ledger::verify_balance(&mut uow, account_id).await?
        })?;
        if !report.is_consistent() {
            warn!(
                account_id = %account_id,
                current_cents = report.current_balance.cents(),
                effective_cents = report.effective_total.cents(),
                "Account balance does not match its journal"
            );
        }
        Ok(report)
    }

    // =========================================================================
    // Journal
    // =========================================================================

    /// Reverses one entry (and its group sibling).
    pub async fn reverse_entry(
        &self,
        actor: &Actor,
        entry_id: &str,
        reason: &str,
    ) -> EngineResult<Vec<JournalEntry>> {
        let ctx = self.context(actor, reason)?;
        let counters = in_unit_of_work!(self, |uow| {
            journal::reverse(&mut uow, &ctx, entry_id, reason).await?
        })?;
        info!(entry_id = %entry_id, counter_entries = counters.len(), "Entry reversed");
        Ok(counters)
    }

    // =========================================================================
    // Money Movements
    // =========================================================================

    pub async fn record_expense(
        &self,
        actor: &Actor,
        request: &ExpenseRequest,
    ) -> EngineResult<JournalEntry> {
        let ctx = self.context(actor, "expense recorded")?;
        let entry = in_unit_of_work!(self, |uow| {
            money::record_expense(&mut uow, &ctx, request).await?
        })?;
        info!(expense_id = %request.expense_id, amount_cents = request.amount.cents(), "Expense recorded");
        Ok(entry)
    }

    pub async fn reverse_expense(
        &self,
        actor: &Actor,
        expense_id: &str,
        reason: &str,
    ) -> EngineResult<Vec<JournalEntry>> {
        let ctx = self.context(actor, reason)?;
        let reference = DocumentRef::Expense(expense_id.to_string());
        let counters = in_unit_of_work!(self, |uow| {
            money::reverse_document(&mut uow, &ctx, &reference).await?
        })?;
        info!(expense_id = %expense_id, "Expense reversed");
        Ok(counters)
    }

    pub async fn record_income(
        &self,
        actor: &Actor,
        request: &IncomeRequest,
    ) -> EngineResult<JournalEntry> {
        let ctx = self.context(actor, "income recorded")?;
        let entry = in_unit_of_work!(self, |uow| {
            money::record_income(&mut uow, &ctx, request).await?
        })?;
        info!(income_id = %request.income_id, amount_cents = request.amount.cents(), "Income recorded");
        Ok(entry)
    }

    pub async fn reverse_income(
        &self,
        actor: &Actor,
        income_id: &str,
        reason: &str,
    ) -> EngineResult<Vec<JournalEntry>> {
        let ctx = self.context(actor, reason)?;
        let reference = DocumentRef::Income(income_id.to_string());
        let counters = in_unit_of_work!(self, |uow| {
            money::reverse_document(&mut uow, &ctx, &reference).await?
        })?;
        info!(income_id = %income_id, "Income reversed");
        Ok(counters)
    }

    pub async fn receive_payment(
        &self,
        actor: &Actor,
        request: &PaymentRequest,
    ) -> EngineResult<GroupedEntries> {
        let ctx = self.context(actor, "payment received")?;
        let grouped = in_unit_of_work!(self, |uow| {
            money::receive_payment(&mut uow, &ctx, request).await?
        })?;
        info!(group_id = %grouped.transfer_group_id, amount_cents = request.amount.cents(), "Payment received");
        Ok(grouped)
    }

    pub async fn make_payment(
        &self,
        actor: &Actor,
        request: &PaymentRequest,
    ) -> EngineResult<GroupedEntries> {
        let ctx = self.context(actor, "payment made")?;
        let grouped = in_unit_of_work!(self, |uow| {
            money::make_payment(&mut uow, &ctx, request).await?
        })?;
        info!(group_id = %grouped.transfer_group_id, amount_cents = request.amount.cents(), "Payment made");
        Ok(grouped)
    }

    pub async fn transfer_funds(
        &self,
        actor: &Actor,
        request: &FundTransferRequest,
    ) -> EngineResult<GroupedEntries> {
        let ctx = self.context(actor, "funds transferred")?;
        let grouped = in_unit_of_work!(self, |uow| {
            money::transfer_funds(&mut uow, &ctx, request).await?
        })?;
        info!(
            from = %request.from_account_id,
            to = %request.to_account_id,
            amount_cents = request.amount.cents(),
            "Funds transferred"
        );
        Ok(grouped)
    }

    pub async fn adjust_balance(
        &self,
        actor: &Actor,
        request: &AdjustmentRequest,
    ) -> EngineResult<JournalEntry> {
        let ctx = self.context(actor, &request.description)?;
        let entry = in_unit_of_work!(self, |uow| money::adjust(&mut uow, &ctx, request).await?)?;
        info!(account_id = %request.account_id, amount_cents = entry.amount_cents, "Balance adjusted");
        Ok(entry)
    }

    // =========================================================================
    // Sales
    // =========================================================================

    pub async fn create_sale(&self, actor: &Actor, request: &SaleRequest) -> EngineResult<SaleOutcome> {
        let ctx = self.context(actor, "sale created")?;
        let outcome = in_unit_of_work!(self, |uow| sale::create(&mut uow, &ctx, request).await?)?;
        info!(
            sale_id = %outcome.sale.id,
            total_cents = outcome.sale.total_cents,
            profit_cents = outcome.sale.profit_cents,
            items = outcome.items.len(),
            "Sale created"
        );
        Ok(outcome)
    }

    pub async fn update_sale(
        &self,
        actor: &Actor,
        sale_id: &str,
        request: &SaleRequest,
        reason: &str,
    ) -> EngineResult<SaleOutcome> {
        let ctx = self.context(actor, reason)?;
        let outcome = in_unit_of_work!(self, |uow| {
            sale::update(&mut uow, &ctx, sale_id, request).await?
        })?;
        info!(sale_id = %sale_id, total_cents = outcome.sale.total_cents, "Sale updated");
        Ok(outcome)
    }

    pub async fn delete_sale(&self, actor: &Actor, sale_id: &str, reason: &str) -> EngineResult<Sale> {
        let ctx = self.context(actor, reason)?;
        let deleted = in_unit_of_work!(self, |uow| sale::delete(&mut uow, &ctx, sale_id).await?)?;
        info!(sale_id = %sale_id, "Sale deleted");
        Ok(deleted)
    }

    pub async fn restore_sale(
        &self,
        actor: &Actor,
        sale_id: &str,
        reason: &str,
    ) -> EngineResult<SaleOutcome> {
        let ctx = self.context(actor, reason)?;
        let outcome = in_unit_of_work!(self, |uow| sale::restore(&mut uow, &ctx, sale_id).await?)?;
        info!(sale_id = %sale_id, "Sale restored");
        Ok(outcome)
    }

    /// A sale with all its items, regardless of lifecycle.
    pub async fn sale(&self, sale_id: &str) -> EngineResult<SaleOutcome> {
        in_unit_of_work!(self, |uow| {
            let sale = uow
                .sales()
                .find(sale_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
            let items = uow.sales().items(sale_id).await?;
            SaleOutcome { sale, items }
        })
    }

    pub async fn create_sale_return(
        &self,
        actor: &Actor,
        request: &SaleReturnRequest,
    ) -> EngineResult<SaleReturnOutcome> {
        let reason = request.reason.clone().unwrap_or_else(|| "sale return".to_string());
        let ctx = self.context(actor, &reason)?;
        let outcome = in_unit_of_work!(self, |uow| returns::create(&mut uow, &ctx, request).await?)?;
        info!(
            return_id = %outcome.sale_return.id,
            sale_id = %outcome.sale_return.sale_id,
            value_cents = outcome.sale_return.value_cents,
            "Sale return recorded"
        );
        Ok(outcome)
    }

    pub async fn delete_sale_return(
        &self,
        actor: &Actor,
        return_id: &str,
        reason: &str,
    ) -> EngineResult<SaleReturn> {
        let ctx = self.context(actor, reason)?;
        let deleted = in_unit_of_work!(self, |uow| returns::delete(&mut uow, &ctx, return_id).await?)?;
        info!(return_id = %return_id, "Sale return deleted");
        Ok(deleted)
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    pub async fn create_purchase(
        &self,
        actor: &Actor,
        request: &PurchaseRequest,
    ) -> EngineResult<PurchaseOutcome> {
        let ctx = self.context(actor, "purchase created")?;
        let outcome = in_unit_of_work!(self, |uow| purchase::create(&mut uow, &ctx, request).await?)?;
        info!(
            purchase_id = %outcome.purchase.id,
            total_cents = outcome.purchase.total_cents,
            paid_cents = outcome.purchase.paid_cents,
            items = outcome.items.len(),
            "Purchase created"
        );
        Ok(outcome)
    }

    pub async fn update_purchase(
        &self,
        actor: &Actor,
        purchase_id: &str,
        request: &PurchaseRequest,
        reason: &str,
    ) -> EngineResult<PurchaseOutcome> {
        let ctx = self.context(actor, reason)?;
        let outcome = in_unit_of_work!(self, |uow| {
            purchase::update(&mut uow, &ctx, purchase_id, request).await?
        })?;
        info!(purchase_id = %purchase_id, total_cents = outcome.purchase.total_cents, "Purchase updated");
        Ok(outcome)
    }

    pub async fn delete_purchase(
        &self,
        actor: &Actor,
        purchase_id: &str,
        reason: &str,
    ) -> EngineResult<Purchase> {
        let ctx = self.context(actor, reason)?;
        let deleted = in_unit_of_work!(self, |uow| {
            purchase::delete(&mut uow, &ctx, purchase_id).await?
        })?;
        info!(purchase_id = %purchase_id, "Purchase deleted");
        Ok(deleted)
    }

    pub async fn restore_purchase(
        &self,
        actor: &Actor,
        purchase_id: &str,
        reason: &str,
    ) -> EngineResult<PurchaseOutcome> {
        let ctx = self.context(actor, reason)?;
        let outcome = in_unit_of_work!(self, |uow| {
            purchase::restore(&mut uow, &ctx, purchase_id).await?
        })?;
        info!(purchase_id = %purchase_id, "Purchase restored");
        Ok(outcome)
    }

    /// A purchase with all its items, regardless of lifecycle.
    pub async fn purchase(&self, purchase_id: &str) -> EngineResult<PurchaseOutcome> {
        in_unit_of_work!(self, |uow| {
            let purchase = uow
                .purchases()
                .find(purchase_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Purchase", purchase_id))?;
            let items = uow.purchases().items(purchase_id).await?;
            PurchaseOutcome { purchase, items }
        })
    }

    // =========================================================================
    // Stock
    // =========================================================================

    pub async fn create_stock_transfer(
        &self,
        actor: &Actor,
        request: &StockTransferRequest,
    ) -> EngineResult<StockTransfer> {
        let ctx = self.context(actor, "stock transferred")?;
        let moved = in_unit_of_work!(self, |uow| transfer::create(&mut uow, &ctx, request).await?)?;
        info!(
            transfer_id = %moved.id,
            from = %request.from.label(),
            to = %request.to.label(),
            base_quantity = moved.base_quantity,
            "Stock transferred"
        );
        Ok(moved)
    }

    pub async fn delete_stock_transfer(
        &self,
        actor: &Actor,
        transfer_id: &str,
        reason: &str,
    ) -> EngineResult<StockTransfer> {
        let ctx = self.context(actor, reason)?;
        let deleted = in_unit_of_work!(self, |uow| {
            transfer::delete(&mut uow, &ctx, transfer_id).await?
        })?;
        info!(transfer_id = %transfer_id, "Stock transfer deleted");
        Ok(deleted)
    }

    pub async fn restore_stock_transfer(
        &self,
        actor: &Actor,
        transfer_id: &str,
        reason: &str,
    ) -> EngineResult<StockTransfer> {
        let ctx = self.context(actor, reason)?;
        let restored = in_unit_of_work!(self, |uow| {
            transfer::restore(&mut uow, &ctx, transfer_id).await?
        })?;
        info!(transfer_id = %transfer_id, "Stock transfer restored");
        Ok(restored)
    }

    /// Base units of a product held by a location or an employee.
    pub async fn stock_on_hand(&self, holder: &StockHolder, product_id: &str) -> EngineResult<i64> {
        in_unit_of_work!(self, |uow| allocator::on_hand(&mut uow, holder, product_id).await?)
    }

    // =========================================================================
    // Audit
    // =========================================================================

    /// Audit records for one row, oldest first.
    pub async fn audit_trail(&self, entity: &str, record_id: &str) -> EngineResult<Vec<AuditRecord>> {
        in_unit_of_work!(self, |uow| uow.audit().list_for(entity, record_id).await?)
    }
}
