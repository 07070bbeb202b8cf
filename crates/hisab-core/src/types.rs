//! # Domain Types
//!
//! Core domain types used throughout the ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │◄──│  JournalEntry   │──►│  DocumentRef    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  account_type   │   │  kind           │   │  Sale(id)       │       │
//! │  │  ref_id         │   │  amount (±)     │   │  Purchase(id)   │       │
//! │  │  opening/current│   │  reversal links │   │  Transfer(id)   │       │
//! │  └─────────────────┘   └─────────────────┘   │  Expense(id)... │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  StockRecord    │   │ EmployeeStock   │   │  Sale/Purchase  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  StockTransfer  │       │
//! │  │  product×batch× │   │  employee×      │   │  SaleReturn     │       │
//! │  │  location       │   │  product×batch  │   │  (documents)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are stored as `*_cents: i64` columns and exposed as [`Money`]
//! through accessors. Quantities are `i64` base units.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::BatchDraw;
use crate::money::Money;

// =============================================================================
// Actor
// =============================================================================

/// The authenticated identity behind a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Soft-delete lifecycle shared by every persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Deleted,
}

impl Lifecycle {
    /// Maps the persisted `is_deleted` flag.
    #[inline]
    pub const fn from_flag(is_deleted: bool) -> Self {
        if is_deleted {
            Lifecycle::Deleted
        } else {
            Lifecycle::Active
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// The closed set of ledger endpoint types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Supplier,
    Customer,
    Employee,
    /// Till drawer.
    Cashier,
    /// Back-office safe.
    Safe,
    /// Money changer / hawala float. Allowed to go negative.
    Saraf,
}

impl AccountType {
    /// Cashier, safe and saraf hold money; the others are relationships.
    pub const fn is_money_account(&self) -> bool {
        matches!(
            self,
            AccountType::Cashier | AccountType::Safe | AccountType::Saraf
        )
    }

    /// Real cash accounts whose balance may never go below zero.
    pub const fn requires_non_negative(&self) -> bool {
        matches!(self, AccountType::Cashier | AccountType::Safe)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AccountType::Supplier => "supplier",
            AccountType::Customer => "customer",
            AccountType::Employee => "employee",
            AccountType::Cashier => "cashier",
            AccountType::Safe => "safe",
            AccountType::Saraf => "saraf",
        }
    }
}

/// A ledger endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    pub id: String,
    pub account_type: AccountType,
    /// Weak reference to the supplier/customer/employee record.
    pub ref_id: Option<String>,
    pub name: String,
    pub opening_balance_cents: i64,
    pub current_balance_cents: i64,
    pub currency: String,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    #[inline]
    pub fn opening_balance(&self) -> Money {
        Money::from_cents(self.opening_balance_cents)
    }

    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_flag(self.is_deleted)
    }
}

// =============================================================================
// Journal
// =============================================================================

/// What kind of economic event a journal entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Purchase,
    Payment,
    Transfer,
    Expense,
    Credit,
    Debit,
    SaleReturn,
}

/// Discriminant of a [`DocumentRef`], as stored in `reference_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Sale,
    Purchase,
    Transfer,
    Expense,
    Income,
    SaleReturn,
}

/// The business document that caused a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DocumentRef {
    Sale(String),
    Purchase(String),
    Transfer(String),
    Expense(String),
    Income(String),
    SaleReturn(String),
}

impl DocumentRef {
    pub fn reference_type(&self) -> ReferenceType {
        match self {
            DocumentRef::Sale(_) => ReferenceType::Sale,
            DocumentRef::Purchase(_) => ReferenceType::Purchase,
            DocumentRef::Transfer(_) => ReferenceType::Transfer,
            DocumentRef::Expense(_) => ReferenceType::Expense,
            DocumentRef::Income(_) => ReferenceType::Income,
            DocumentRef::SaleReturn(_) => ReferenceType::SaleReturn,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DocumentRef::Sale(id)
            | DocumentRef::Purchase(id)
            | DocumentRef::Transfer(id)
            | DocumentRef::Expense(id)
            | DocumentRef::Income(id)
            | DocumentRef::SaleReturn(id) => id,
        }
    }

    pub fn from_parts(reference_type: ReferenceType, id: impl Into<String>) -> Self {
        let id = id.into();
        match reference_type {
            ReferenceType::Sale => DocumentRef::Sale(id),
            ReferenceType::Purchase => DocumentRef::Purchase(id),
            ReferenceType::Transfer => DocumentRef::Transfer(id),
            ReferenceType::Expense => DocumentRef::Expense(id),
            ReferenceType::Income => DocumentRef::Income(id),
            ReferenceType::SaleReturn => DocumentRef::SaleReturn(id),
        }
    }
}

/// One signed posting against one account.
///
/// Positive amounts increase the balance, negative decrease it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct JournalEntry {
    pub id: String,
    pub account_id: String,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
    /// Shared by both legs of a transfer posting.
    pub transfer_group_id: Option<String>,
    pub description: String,
    pub is_reversed: bool,
    /// Counter-entry that undid this one.
    pub reversed_by_entry_id: Option<String>,
    /// Set on counter-entries: the entry being undone.
    pub reversal_of_entry_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by_name: Option<String>,
    pub reversal_reason: Option<String>,
    pub created_by_id: String,
    pub created_by_name: String,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    pub fn reference(&self) -> Option<DocumentRef> {
        match (self.reference_type, self.reference_id.as_ref()) {
            (Some(reference_type), Some(id)) => {
                Some(DocumentRef::from_parts(reference_type, id.clone()))
            }
            _ => None,
        }
    }

    /// True for counter-entries created by a reversal.
    #[inline]
    pub fn is_reversal(&self) -> bool {
        self.reversal_of_entry_id.is_some()
    }
}

// =============================================================================
// Products & Units
// =============================================================================

/// The slice of a product the engine needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub base_unit_id: String,
    /// Untracked products live entirely in the `DEFAULT` batch.
    pub tracks_batches: bool,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A named unit of measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Unit {
    pub id: String,
    pub name: String,
    pub is_deleted: bool,
}

/// How many base units one `unit_id` of `product_id` holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductUnit {
    pub product_id: String,
    pub unit_id: String,
    pub factor: i64,
}

// =============================================================================
// Stock
// =============================================================================

/// Physical stock locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Warehouse,
    Store,
}

impl Location {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Location::Warehouse => "warehouse",
            Location::Store => "store",
        }
    }
}

/// Quantity of one product, in one batch, at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockRecord {
    pub id: String,
    pub product_id: String,
    pub batch_number: String,
    pub location: Location,
    /// Base units, never negative.
    pub quantity: i64,
    pub cost_per_base_unit_cents: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    #[inline]
    pub fn cost_per_base_unit(&self) -> Money {
        Money::from_cents(self.cost_per_base_unit_cents)
    }
}

/// Quantity of one product/batch carried by one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct EmployeeStockRecord {
    pub id: String,
    pub employee_id: String,
    pub product_id: String,
    pub batch_number: String,
    pub quantity: i64,
    pub cost_per_base_unit_cents: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl EmployeeStockRecord {
    #[inline]
    pub fn cost_per_base_unit(&self) -> Money {
        Money::from_cents(self.cost_per_base_unit_cents)
    }
}

/// Persisted discriminant of a [`StockHolder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum HolderKind {
    Warehouse,
    Store,
    Employee,
}

/// Anything that can hold stock: a location or an employee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "employeeId", rename_all = "lowercase")]
pub enum StockHolder {
    Warehouse,
    Store,
    Employee(String),
}

impl StockHolder {
    pub fn location(location: Location) -> Self {
        match location {
            Location::Warehouse => StockHolder::Warehouse,
            Location::Store => StockHolder::Store,
        }
    }

    pub fn kind(&self) -> HolderKind {
        match self {
            StockHolder::Warehouse => HolderKind::Warehouse,
            StockHolder::Store => HolderKind::Store,
            StockHolder::Employee(_) => HolderKind::Employee,
        }
    }

    pub fn employee_id(&self) -> Option<&str> {
        match self {
            StockHolder::Employee(id) => Some(id),
            _ => None,
        }
    }

    /// Rebuilds a holder from its persisted columns.
    pub fn from_parts(kind: HolderKind, employee_id: Option<&str>) -> Option<Self> {
        match (kind, employee_id) {
            (HolderKind::Warehouse, _) => Some(StockHolder::Warehouse),
            (HolderKind::Store, _) => Some(StockHolder::Store),
            (HolderKind::Employee, Some(id)) => Some(StockHolder::Employee(id.to_string())),
            (HolderKind::Employee, None) => None,
        }
    }

    /// Label used in error messages and logs.
    pub fn label(&self) -> String {
        match self {
            StockHolder::Warehouse => "warehouse".to_string(),
            StockHolder::Store => "store".to_string(),
            StockHolder::Employee(id) => format!("employee:{id}"),
        }
    }
}

// =============================================================================
// Sales
// =============================================================================

/// A sale document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub customer_id: Option<String>,
    /// Set when a riding salesman sells from carried stock.
    pub employee_id: Option<String>,
    pub money_account_id: String,
    pub invoice_kind: String,
    /// Location drawn from when no employee is attached.
    pub location: Location,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub total_cost_cents: i64,
    pub profit_cents: i64,
    pub notes: Option<String>,
    pub created_by_id: String,
    pub created_by_name: String,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }

    /// Where this sale draws stock from.
    pub fn stock_holder(&self) -> StockHolder {
        match &self.employee_id {
            Some(employee_id) => StockHolder::Employee(employee_id.clone()),
            None => StockHolder::location(self.location),
        }
    }
}

/// A sale line item.
///
/// Cost and profit come from the batches actually drawn, not from a list
/// price: one line may span several batches with different costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub unit_id: String,
    /// Quantity in `unit_id`.
    pub quantity: i64,
    pub base_quantity: i64,
    /// Price per `unit_id`.
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    /// Batch requested by the caller, if any.
    pub batch_number: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub batches_used: Vec<BatchDraw>,
    pub total_cost_cents: i64,
    /// Weighted average cost per base unit across `batches_used`.
    pub cost_price_per_unit_cents: i64,
    pub profit_cents: i64,
    pub returned_base_quantity: i64,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    #[inline]
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }

    /// Base quantity still eligible for return.
    #[inline]
    pub fn returnable_base_quantity(&self) -> i64 {
        self.base_quantity - self.returned_base_quantity
    }
}

/// Goods returned against one sale item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleReturn {
    pub id: String,
    pub sale_id: String,
    pub sale_item_id: String,
    pub unit_id: String,
    pub quantity: i64,
    pub base_quantity: i64,
    /// Sale value of the returned goods (credited to the buyer).
    pub value_cents: i64,
    /// Cash handed back immediately.
    pub refund_cents: i64,
    pub refund_account_id: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub restored_batches: Vec<BatchDraw>,
    pub reason: Option<String>,
    pub created_by_id: String,
    pub created_by_name: String,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleReturn {
    #[inline]
    pub fn value(&self) -> Money {
        Money::from_cents(self.value_cents)
    }

    #[inline]
    pub fn refund(&self) -> Money {
        Money::from_cents(self.refund_cents)
    }
}

// =============================================================================
// Purchases
// =============================================================================

/// A purchase document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: String,
    pub money_account_id: Option<String>,
    /// Location all items are received into.
    pub location: Location,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub notes: Option<String>,
    pub created_by_id: String,
    pub created_by_name: String,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }
}

/// A purchase line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub unit_id: String,
    pub quantity: i64,
    pub base_quantity: i64,
    /// Cost per `unit_id`.
    pub unit_cost_cents: i64,
    pub line_total_cents: i64,
    pub cost_per_base_unit_cents: i64,
    pub batch_number: String,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Transfers
// =============================================================================

/// A movement of one product between two holders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransfer {
    pub id: String,
    pub product_id: String,
    pub unit_id: String,
    pub quantity: i64,
    pub base_quantity: i64,
    pub from_kind: HolderKind,
    pub from_employee_id: Option<String>,
    pub to_kind: HolderKind,
    pub to_employee_id: Option<String>,
    /// Batch requested by the caller, if any.
    pub batch_number: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub batches_moved: Vec<BatchDraw>,
    pub notes: Option<String>,
    pub created_by_id: String,
    pub created_by_name: String,
    pub is_deleted: bool,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockTransfer {
    pub fn source(&self) -> Option<StockHolder> {
        StockHolder::from_parts(self.from_kind, self.from_employee_id.as_deref())
    }

    pub fn destination(&self) -> Option<StockHolder> {
        StockHolder::from_parts(self.to_kind, self.to_employee_id.as_deref())
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Audit operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditOperation {
    Insert,
    Update,
    Delete,
    Restore,
}

/// One audit trail record: enough to reconstruct a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditRecord {
    pub id: String,
    pub entity_name: String,
    pub record_id: String,
    pub operation: AuditOperation,
    /// JSON snapshot before the change.
    pub old_snapshot: Option<String>,
    /// JSON snapshot after the change.
    pub new_snapshot: Option<String>,
    pub reason: String,
    pub actor_id: String,
    pub actor_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_account_classification() {
        assert!(AccountType::Cashier.requires_non_negative());
        assert!(AccountType::Safe.requires_non_negative());
        assert!(!AccountType::Saraf.requires_non_negative());
        assert!(AccountType::Saraf.is_money_account());
        assert!(!AccountType::Supplier.is_money_account());
        assert!(!AccountType::Customer.requires_non_negative());
        assert!(!AccountType::Employee.requires_non_negative());
    }

    #[test]
    fn test_document_ref_round_trips_through_parts() {
        let reference = DocumentRef::SaleReturn("r-1".to_string());
        let rebuilt = DocumentRef::from_parts(reference.reference_type(), reference.id());
        assert_eq!(rebuilt, reference);
    }

    #[test]
    fn test_document_ref_serializes_as_tagged_union() {
        let json = serde_json::to_string(&DocumentRef::Purchase("p-9".to_string())).unwrap();
        assert_eq!(json, r#"{"type":"purchase","id":"p-9"}"#);
    }

    #[test]
    fn test_stock_holder_parts() {
        let holder = StockHolder::Employee("e-1".to_string());
        assert_eq!(holder.kind(), HolderKind::Employee);
        assert_eq!(
            StockHolder::from_parts(HolderKind::Employee, holder.employee_id()),
            Some(holder.clone())
        );
        assert_eq!(StockHolder::from_parts(HolderKind::Employee, None), None);
        assert_eq!(holder.label(), "employee:e-1");
        assert_eq!(StockHolder::location(Location::Store), StockHolder::Store);
    }

    #[test]
    fn test_lifecycle_from_flag() {
        assert_eq!(Lifecycle::from_flag(false), Lifecycle::Active);
        assert_eq!(Lifecycle::from_flag(true), Lifecycle::Deleted);
    }
}
