//! Ledger aggregation: per-member paid, share and net totals for a period.
//!
//! Maintains the invariant: `net_balance == total_paid - total_share` for
//! every summary, and the net balances of a closed set of expenses sum to 0.

use crate::model::{Expense, ExpenseId, MemberBalance, MemberId, Split};
use crate::money::Cents;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// What a member paid, what they owe, and the difference.
///
/// # Invariants
///
/// - `net_balance == total_paid - total_share`
/// - A positive `net_balance` means the household owes this member money
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    #[serde(rename = "member")]
    pub member_id: MemberId,

    /// Sum of non-deleted expenses this member paid for.
    #[serde(rename = "paid")]
    pub total_paid: Cents,

    /// Sum of in-scope splits assigned to this member.
    #[serde(rename = "share")]
    pub total_share: Cents,

    #[serde(rename = "net")]
    pub net_balance: Cents,
}

impl MemberSummary {
    /// Creates a summary with zero totals.
    pub fn new(member_id: MemberId) -> Self {
        MemberSummary {
            member_id,
            total_paid: Cents::ZERO,
            total_share: Cents::ZERO,
            net_balance: Cents::ZERO,
        }
    }

    /// Projects the summary onto the balance the minimizer consumes.
    pub fn balance(&self) -> MemberBalance {
        MemberBalance {
            member_id: self.member_id.clone(),
            net_balance: self.net_balance,
        }
    }
}

/// Builds the default split scope: the ids of every non-deleted expense.
pub fn scope_of(expenses: &[Expense]) -> HashSet<ExpenseId> {
    expenses
        .iter()
        .filter(|e| !e.is_deleted)
        .map(|e| e.id.clone())
        .collect()
}

/// Folds expenses and splits into one summary per rostered member.
///
/// - Deleted expenses add nothing to `total_paid`
/// - Only splits whose expense is in `scope` add to `total_share`
/// - Payers and split members missing from `members` are skipped; no summary
///   is ever created for them
///
/// Output follows `members` order. A member listed twice is reported once,
/// at its first position.
pub fn compute_member_summaries(
    members: &[MemberId],
    expenses: &[Expense],
    splits: &[Split],
    scope: &HashSet<ExpenseId>,
) -> Vec<MemberSummary> {
    let mut summaries: Vec<MemberSummary> = Vec::with_capacity(members.len());
    let mut index: HashMap<&MemberId, usize> = HashMap::with_capacity(members.len());

    for member in members {
        if !index.contains_key(member) {
            index.insert(member, summaries.len());
            summaries.push(MemberSummary::new(member.clone()));
        }
    }

    for expense in expenses.iter().filter(|e| !e.is_deleted) {
        if let Some(&slot) = index.get(&expense.paid_by) {
            summaries[slot].total_paid += expense.amount;
        }
    }

    for split in splits.iter().filter(|s| scope.contains(&s.expense_id)) {
        if let Some(&slot) = index.get(&split.member_id) {
            summaries[slot].total_share += split.amount;
        }
    }

    for summary in &mut summaries {
        summary.net_balance = summary.total_paid - summary.total_share;
    }

    summaries
}

/// Like [`compute_member_summaries`], keeping only the net balances.
pub fn compute_balances(
    members: &[MemberId],
    expenses: &[Expense],
    splits: &[Split],
    scope: &HashSet<ExpenseId>,
) -> Vec<MemberBalance> {
    compute_member_summaries(members, expenses, splits, scope)
        .iter()
        .map(MemberSummary::balance)
        .collect()
}
