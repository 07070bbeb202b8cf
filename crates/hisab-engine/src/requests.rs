//! # Request & Response Types
//!
//! Typed payloads for every engine operation. The HTTP layer deserialises
//! straight into these (camelCase JSON); amounts are integer minor units.
//!
//! ```json
//! {
//!   "moneyAccountId": "…",
//!   "items": [{ "productId": "…", "unitId": "carton", "quantity": 2, "unitPrice": 48000 }],
//!   "paid": 96000
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use hisab_core::{
    AccountType, JournalEntry, Location, Money, Purchase, PurchaseItem, Sale, SaleItem, SaleReturn,
    StockHolder,
};

// =============================================================================
// Accounts & Money Movements
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub account_type: AccountType,
    pub ref_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub opening_balance: Money,
    /// Falls back to the configured default currency.
    pub currency: Option<String>,
}

/// Expense paid out of a money account. `expense_id` names the external
/// expense record the entry references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRequest {
    pub expense_id: String,
    pub money_account_id: String,
    pub amount: Money,
    pub description: Option<String>,
}

/// Income received into a money account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRequest {
    pub income_id: String,
    pub money_account_id: String,
    pub amount: Money,
    pub description: Option<String>,
}

/// Settlement between a counterparty (supplier, customer, employee) and a
/// money account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub counterparty_account_id: String,
    pub money_account_id: String,
    pub amount: Money,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundTransferRequest {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: Money,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentDirection {
    /// Increases the balance.
    Credit,
    /// Decreases the balance.
    Debit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    pub account_id: String,
    pub direction: AdjustmentDirection,
    pub amount: Money,
    pub description: String,
}

/// Entries posted together under one transfer group id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedEntries {
    pub transfer_group_id: String,
    pub entries: Vec<JournalEntry>,
}

/// Recomputed balance invariant for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    pub account_id: String,
    pub opening_balance: Money,
    pub current_balance: Money,
    /// Σ entries still in effect (neither reversed nor counter-entries).
    pub effective_total: Money,
    /// Σ every live entry, counter-entries included.
    pub posted_total: Money,
}

impl BalanceReport {
    /// `current == opening + Σ effective` and reversals net to zero.
    pub fn is_consistent(&self) -> bool {
        self.current_balance == self.opening_balance + self.effective_total
            && self.effective_total == self.posted_total
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemRequest {
    pub product_id: String,
    pub unit_id: String,
    pub quantity: i64,
    /// Price per `unit_id`.
    pub unit_price: Money,
    /// Draw from this batch only.
    pub batch_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub customer_id: Option<String>,
    /// Sell from this employee's carried stock.
    pub employee_id: Option<String>,
    pub money_account_id: String,
    pub invoice_kind: Option<String>,
    /// Defaults to the store.
    pub location: Option<Location>,
    pub items: Vec<SaleItemRequest>,
    #[serde(default)]
    pub paid: Money,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOutcome {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReturnRequest {
    pub sale_item_id: String,
    pub unit_id: String,
    pub quantity: i64,
    /// Cash handed back now; the rest stays as credit.
    #[serde(default)]
    pub refund: Money,
    pub refund_account_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReturnOutcome {
    pub sale_return: SaleReturn,
    pub item: SaleItem,
}

// =============================================================================
// Purchases
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemRequest {
    pub product_id: String,
    pub unit_id: String,
    pub quantity: i64,
    /// Cost per `unit_id`.
    pub unit_cost: Money,
    /// Ignored for untracked products; generated when absent.
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub supplier_id: String,
    /// Required when `paid > 0`.
    pub money_account_id: Option<String>,
    /// Defaults to the warehouse.
    pub location: Option<Location>,
    pub items: Vec<PurchaseItemRequest>,
    #[serde(default)]
    pub paid: Money,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

// =============================================================================
// Stock Transfers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTransferRequest {
    pub product_id: String,
    pub unit_id: String,
    pub quantity: i64,
    pub from: StockHolder,
    pub to: StockHolder,
    pub batch_number: Option<String>,
    pub notes: Option<String>,
}

