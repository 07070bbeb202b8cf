//! # Transaction Journal
//!
//! Append-mostly log of signed entries. An entry is never edited except to
//! stamp reversal metadata; mistakes are undone by a counter-entry.
//!
//! ## Reversal
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entry E  (+500 on A, ref sale/S1)                                     │
//! │       │                                                                 │
//! │       ▼  reverse(E, reason)                                             │
//! │  counter C (−500 on A, ref sale/S1, reversal_of = E)                   │
//! │  E.is_reversed = true, E.reversed_by = C                               │
//! │                                                                         │
//! │  reverse(E) again  → Conflict (already reversed)                       │
//! │  reverse(C)        → Conflict (C is itself a reversal)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pairing
//! Entries posted under one `transfer_group_id` are reversed together.
//! Transfer entries from before group ids existed are paired with the
//! oldest non-reversed Transfer entry by the same creator carrying the
//! exactly negated amount. An unpaired transfer is reversed alone with a
//! warning.

use tracing::{debug, warn};
use uuid::Uuid;

use hisab_core::validation::{validate_positive_amount, validate_reason};
use hisab_core::{DocumentRef, JournalEntry, Money, TransactionKind, ValidationError};
use hisab_db::UnitOfWork;

use crate::audit;
use crate::context::Context;
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::ledger;
use crate::requests::GroupedEntries;

const ENTITY: &str = "journal_entries";

/// One posting to make.
#[derive(Debug, Clone)]
pub(crate) struct Posting<'a> {
    pub account_id: &'a str,
    pub kind: TransactionKind,
    pub amount: Money,
    pub reference: Option<&'a DocumentRef>,
    pub transfer_group_id: Option<&'a str>,
    /// Set on counter-entries.
    pub reversal_of: Option<&'a str>,
    pub description: String,
}

impl<'a> Posting<'a> {
    pub fn new(account_id: &'a str, kind: TransactionKind, amount: Money) -> Self {
        Posting {
            account_id,
            kind,
            amount,
            reference: None,
            transfer_group_id: None,
            reversal_of: None,
            description: String::new(),
        }
    }

    pub fn reference(mut self, reference: &'a DocumentRef) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn group(mut self, group_id: &'a str) -> Self {
        self.transfer_group_id = Some(group_id);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Writes one entry and applies it to the account balance.
pub(crate) async fn post(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    posting: Posting<'_>,
) -> EngineResult<JournalEntry> {
    if posting.amount.is_zero() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    ledger::apply_delta(uow, ctx, posting.account_id, posting.amount).await?;

    let entry = JournalEntry {
        id: Uuid::new_v4().to_string(),
        account_id: posting.account_id.to_string(),
        kind: posting.kind,
        amount_cents: posting.amount.cents(),
        reference_type: posting.reference.map(DocumentRef::reference_type),
        reference_id: posting.reference.map(|r| r.id().to_string()),
        transfer_group_id: posting.transfer_group_id.map(str::to_string),
        description: posting.description,
        is_reversed: false,
        reversed_by_entry_id: None,
        reversal_of_entry_id: posting.reversal_of.map(str::to_string),
        reversed_at: None,
        reversed_by_name: None,
        reversal_reason: None,
        created_by_id: ctx.actor.id.clone(),
        created_by_name: ctx.actor.name.clone(),
        is_deleted: false,
        created_at: ctx.now,
    };
    uow.journal().insert(&entry).await?;

    debug!(
        entry_id = %entry.id,
        account_id = %entry.account_id,
        kind = ?entry.kind,
        amount_cents = entry.amount_cents,
        "Posted journal entry"
    );
    Ok(entry)
}

/// Posts `−amount` on `from` and `+amount` on `to` under a fresh group id.
pub(crate) async fn transfer_posting(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    from_account_id: &str,
    to_account_id: &str,
    amount: Money,
    reference: Option<&DocumentRef>,
    description: &str,
) -> EngineResult<GroupedEntries> {
    validate_positive_amount("amount", amount)?;
    if from_account_id == to_account_id {
        return Err(ValidationError::Inconsistent(
            "cannot transfer funds to the same account".to_string(),
        )
        .into());
    }

    let group_id = Uuid::new_v4().to_string();

    let mut out = Posting::new(from_account_id, TransactionKind::Transfer, -amount)
        .group(&group_id)
        .describe(description);
    let mut into = Posting::new(to_account_id, TransactionKind::Transfer, amount)
        .group(&group_id)
        .describe(description);
    if let Some(reference) = reference {
        out = out.reference(reference);
        into = into.reference(reference);
    }

    let debit = post(uow, ctx, out).await?;
    let credit = post(uow, ctx, into).await?;

    Ok(GroupedEntries {
        transfer_group_id: group_id,
        entries: vec![debit, credit],
    })
}

/// Reverses an entry, and its paired entry when it has one.
///
/// ## Returns
/// The counter-entries created, in reversal order.
///
/// ## Errors
/// - `Conflict` if the entry (or its pair) is already reversed, or the
///   entry is itself a counter-entry
/// - `InsufficientFunds` if undoing a credit would overdraw a cashier/safe
pub(crate) async fn reverse(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    entry_id: &str,
    reason: &str,
) -> EngineResult<Vec<JournalEntry>> {
    validate_reason(reason)?;

    let entry = uow.journal().get(entry_id).await?;
    ensure_reversible(&entry)?;

    let sibling = find_sibling(uow, &entry).await?;
    if let Some(sibling) = &sibling {
        ensure_reversible(sibling)?;
    }

    let mut counters = vec![reverse_one(uow, ctx, &entry, reason).await?];
    if let Some(sibling) = sibling {
        counters.push(reverse_one(uow, ctx, &sibling, reason).await?);
    }
    Ok(counters)
}

/// Reverses every entry still in effect for a document.
pub(crate) async fn reverse_reference(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    reference: &DocumentRef,
    reason: &str,
) -> EngineResult<Vec<JournalEntry>> {
    let entries = uow.journal().list_live_by_reference(reference).await?;

    let mut counters = Vec::new();
    for entry in entries {
        // pairing may already have reversed it
        let current = uow.journal().get(&entry.id).await?;
        if current.is_reversed {
            continue;
        }
        counters.extend(reverse(uow, ctx, &current.id, reason).await?);
    }
    Ok(counters)
}

fn ensure_reversible(entry: &JournalEntry) -> EngineResult<()> {
    if entry.is_reversal() {
        return Err(EngineError::conflict(format!(
            "Entry {} is a reversal and cannot be reversed",
            entry.id
        )));
    }
    if entry.is_reversed {
        return Err(EngineError::conflict(format!("Entry {} is already reversed", entry.id)));
    }
    Ok(())
}

async fn find_sibling(
    uow: &mut UnitOfWork,
    entry: &JournalEntry,
) -> EngineResult<Option<JournalEntry>> {
    if let Some(group_id) = &entry.transfer_group_id {
        let siblings = uow.journal().list_by_transfer_group(group_id).await?;
        return Ok(siblings
            .into_iter()
            .find(|other| other.id != entry.id && !other.is_reversal()));
    }

    if entry.kind != TransactionKind::Transfer {
        return Ok(None);
    }

    let sibling = uow.journal().find_legacy_transfer_sibling(entry).await?;
    if sibling.is_none() {
        warn!(entry_id = %entry.id, "Transfer entry has no sibling; reversing it alone");
    }
    Ok(sibling)
}

async fn reverse_one(
    uow: &mut UnitOfWork,
    ctx: &Context<'_>,
    entry: &JournalEntry,
    reason: &str,
) -> EngineResult<JournalEntry> {
    let reference = entry.reference();
    let posting = Posting {
        account_id: &entry.account_id,
        kind: entry.kind,
        amount: -entry.amount(),
        reference: reference.as_ref(),
        transfer_group_id: entry.transfer_group_id.as_deref(),
        reversal_of: Some(&entry.id),
        description: format!("Reversal of {}: {}", entry.id, reason),
    };
    let counter = post(uow, ctx, posting).await.map_err(|err| match err.kind() {
        ErrorKind::InsufficientFunds => EngineError::new(
            err.kind(),
            format!("Cannot reverse entry {}: {}", entry.id, err.message),
        ),
        _ => err,
    })?;

    let marked = uow
        .journal()
        .mark_reversed(&entry.id, &counter.id, ctx.now, &ctx.actor.name, reason)
        .await?;
    if !marked {
        return Err(EngineError::conflict(format!("Entry {} is already reversed", entry.id)));
    }

    let after = JournalEntry {
        is_reversed: true,
        reversed_by_entry_id: Some(counter.id.clone()),
        reversed_at: Some(ctx.now),
        reversed_by_name: Some(ctx.actor.name.clone()),
        reversal_reason: Some(reason.to_string()),
        ..entry.clone()
    };
    audit::updated(uow, ctx, ENTITY, &entry.id, entry, &after).await?;

    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use crate::requests::OpenAccountRequest;
    use hisab_core::{AccountType, Actor};
    use hisab_db::{Database, DbConfig};

    async fn open_account(
        uow: &mut UnitOfWork,
        ctx: &Context<'_>,
        account_type: AccountType,
        opening: i64,
    ) -> String {
        let request = OpenAccountRequest {
            account_type,
            ref_id: None,
            name: format!("{} account", account_type.as_str()),
            opening_balance: Money::from_cents(opening),
            currency: None,
        };
        ledger::open(uow, ctx, &request, "AFN").await.unwrap().id
    }

    async fn balance(uow: &mut UnitOfWork, id: &str) -> i64 {
        uow.accounts().get_active(id).await.unwrap().current_balance_cents
    }

    #[tokio::test]
    async fn test_reversal_restores_balance_and_links_entries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = Actor::new("u-1", "Admin");
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let safe = open_account(&mut uow, &ctx, AccountType::Safe, 10_000).await;
        let reference = DocumentRef::Income("inc-1".to_string());
        let entry = post(
            &mut uow,
            &ctx,
            Posting::new(&safe, TransactionKind::Credit, Money::from_cents(2_500)).reference(&reference),
        )
        .await
        .unwrap();
        assert_eq!(balance(&mut uow, &safe).await, 12_500);

        let counters = reverse(&mut uow, &ctx, &entry.id, "typo").await.unwrap();
        assert_eq!(counters.len(), 1);
        let counter = &counters[0];
        assert_eq!(counter.amount_cents, -2_500);
        assert_eq!(counter.reference(), Some(reference));
        assert_eq!(counter.reversal_of_entry_id.as_deref(), Some(entry.id.as_str()));
        assert_eq!(balance(&mut uow, &safe).await, 10_000);

        let original = uow.journal().get(&entry.id).await.unwrap();
        assert!(original.is_reversed);
        assert_eq!(original.reversed_by_entry_id.as_deref(), Some(counter.id.as_str()));
        assert_eq!(original.reversal_reason.as_deref(), Some("typo"));
    }

    #[tokio::test]
    async fn test_double_reversal_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = Actor::new("u-1", "Admin");
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let saraf = open_account(&mut uow, &ctx, AccountType::Saraf, 0).await;
        let entry = post(
            &mut uow,
            &ctx,
            Posting::new(&saraf, TransactionKind::Debit, Money::from_cents(-700)),
        )
        .await
        .unwrap();

        let counters = reverse(&mut uow, &ctx, &entry.id, "wrong account").await.unwrap();
        let again = reverse(&mut uow, &ctx, &entry.id, "again").await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::Conflict);

        let counter = reverse(&mut uow, &ctx, &counters[0].id, "undo the undo")
            .await
            .unwrap_err();
        assert_eq!(counter.kind(), ErrorKind::Conflict);
        assert_eq!(balance(&mut uow, &saraf).await, 0);
    }

    #[tokio::test]
    async fn test_reversing_one_transfer_leg_reverses_both() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = Actor::new("u-1", "Admin");
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let safe = open_account(&mut uow, &ctx, AccountType::Safe, 50_000).await;
        let cashier = open_account(&mut uow, &ctx, AccountType::Cashier, 0).await;

        let posted = transfer_posting(
            &mut uow,
            &ctx,
            &safe,
            &cashier,
            Money::from_cents(20_000),
            None,
            "float for the till",
        )
        .await
        .unwrap();
        assert_eq!(balance(&mut uow, &safe).await, 30_000);
        assert_eq!(balance(&mut uow, &cashier).await, 20_000);

        let credit_leg = &posted.entries[1];
        let counters = reverse(&mut uow, &ctx, &credit_leg.id, "posted twice").await.unwrap();
        assert_eq!(counters.len(), 2);
        assert_eq!(balance(&mut uow, &safe).await, 50_000);
        assert_eq!(balance(&mut uow, &cashier).await, 0);

        for entry in &posted.entries {
            assert!(uow.journal().get(&entry.id).await.unwrap().is_reversed);
        }
    }

    #[tokio::test]
    async fn test_legacy_transfer_pairs_by_creator_and_amount() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = Actor::new("u-1", "Admin");
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let saraf = open_account(&mut uow, &ctx, AccountType::Saraf, 0).await;
        let supplier = open_account(&mut uow, &ctx, AccountType::Supplier, 0).await;

        // no group id: written before grouping existed
        let out = post(
            &mut uow,
            &ctx,
            Posting::new(&saraf, TransactionKind::Transfer, Money::from_cents(-9_000)),
        )
        .await
        .unwrap();
        let into = post(
            &mut uow,
            &ctx,
            Posting::new(&supplier, TransactionKind::Transfer, Money::from_cents(9_000)),
        )
        .await
        .unwrap();

        let counters = reverse(&mut uow, &ctx, &out.id, "legacy cleanup").await.unwrap();
        assert_eq!(counters.len(), 2);
        assert!(uow.journal().get(&into.id).await.unwrap().is_reversed);
        assert_eq!(balance(&mut uow, &saraf).await, 0);
        assert_eq!(balance(&mut uow, &supplier).await, 0);
    }

    #[tokio::test]
    async fn test_legacy_transfer_never_pairs_with_a_grouped_leg() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = Actor::new("u-1", "Admin");
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let safe = open_account(&mut uow, &ctx, AccountType::Safe, 20_000).await;
        let cashier = open_account(&mut uow, &ctx, AccountType::Cashier, 0).await;
        let saraf = open_account(&mut uow, &ctx, AccountType::Saraf, 15_000).await;

        let grouped = transfer_posting(
            &mut uow,
            &ctx,
            &safe,
            &cashier,
            Money::from_cents(9_000),
            None,
            "till float",
        )
        .await
        .unwrap();
        // ungrouped, with the same creator and the negated amount of the cashier leg
        let orphan = post(
            &mut uow,
            &ctx,
            Posting::new(&saraf, TransactionKind::Transfer, Money::from_cents(-9_000)),
        )
        .await
        .unwrap();

        let counters = reverse(&mut uow, &ctx, &orphan.id, "legacy cleanup").await.unwrap();
        assert_eq!(counters.len(), 1);
        assert_eq!(balance(&mut uow, &saraf).await, 15_000);
        assert_eq!(balance(&mut uow, &cashier).await, 9_000);
        for entry in &grouped.entries {
            assert!(!uow.journal().get(&entry.id).await.unwrap().is_reversed);
        }
    }

    #[tokio::test]
    async fn test_unpaired_transfer_is_reversed_alone() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = Actor::new("u-1", "Admin");
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let saraf = open_account(&mut uow, &ctx, AccountType::Saraf, 0).await;
        let orphan = post(
            &mut uow,
            &ctx,
            Posting::new(&saraf, TransactionKind::Transfer, Money::from_cents(4_000)),
        )
        .await
        .unwrap();

        let counters = reverse(&mut uow, &ctx, &orphan.id, "orphan").await.unwrap();
        assert_eq!(counters.len(), 1);
        assert_eq!(balance(&mut uow, &saraf).await, 0);
    }

    #[tokio::test]
    async fn test_reverse_reference_undoes_every_live_entry() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let actor = Actor::new("u-1", "Admin");
        let ctx = Context::new(&actor, "test").unwrap();
        let mut uow = db.unit_of_work().await.unwrap();

        let safe = open_account(&mut uow, &ctx, AccountType::Safe, 100_000).await;
        let supplier = open_account(&mut uow, &ctx, AccountType::Supplier, 0).await;
        let reference = DocumentRef::Purchase("p-1".to_string());

        post(
            &mut uow,
            &ctx,
            Posting::new(&supplier, TransactionKind::Purchase, Money::from_cents(50_000))
                .reference(&reference),
        )
        .await
        .unwrap();
        post(
            &mut uow,
            &ctx,
            Posting::new(&safe, TransactionKind::Payment, Money::from_cents(-30_000))
                .reference(&reference),
        )
        .await
        .unwrap();

        let counters = reverse_reference(&mut uow, &ctx, &reference, "purchase deleted")
            .await
            .unwrap();
        assert_eq!(counters.len(), 2);
        assert_eq!(balance(&mut uow, &safe).await, 100_000);
        assert_eq!(balance(&mut uow, &supplier).await, 0);

        let nothing_left = reverse_reference(&mut uow, &ctx, &reference, "again").await.unwrap();
        assert!(nothing_left.is_empty());
    }
}
