//! Domain records shared by the allocator, the aggregator and the minimizer.

use crate::money::Cents;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque household member identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        MemberId(id.to_string())
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque expense identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub String);

impl ExpenseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExpenseId {
    fn from(id: &str) -> Self {
        ExpenseId(id.to_string())
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recorded expense.
///
/// `amount` always equals the sum of the expense's splits; that is checked
/// when the expense is created, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: ExpenseId,
    pub paid_by: MemberId,
    pub amount: Cents,
    /// Soft-deleted expenses never count towards a balance.
    pub is_deleted: bool,
}

/// One member's part of an allocated expense, before it is attached to the
/// expense that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitShare {
    pub member_id: MemberId,
    pub amount: Cents,
    pub percentage: Option<Decimal>,
    pub shares: Option<u32>,
}

/// A member's share of a stored expense.
///
/// `percentage` and `shares` describe how the amount was chosen; balances are
/// computed from `amount` alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub expense_id: ExpenseId,
    pub member_id: MemberId,
    pub amount: Cents,
    pub percentage: Option<Decimal>,
    pub shares: Option<u32>,
}

impl Split {
    /// Attaches an allocator result to its expense.
    pub fn from_share(expense_id: ExpenseId, share: SplitShare) -> Self {
        Split {
            expense_id,
            member_id: share.member_id,
            amount: share.amount,
            percentage: share.percentage,
            shares: share.shares,
        }
    }
}

/// Net position of a member: positive is owed money, negative owes money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberBalance {
    pub member_id: MemberId,
    pub net_balance: Cents,
}

impl MemberBalance {
    pub fn new(member_id: impl Into<MemberId>, net_balance: impl Into<Cents>) -> Self {
        MemberBalance {
            member_id: member_id.into(),
            net_balance: net_balance.into(),
        }
    }
}

/// A single transfer that moves money from a debtor to a creditor.
///
/// `amount` is always strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementTransaction {
    #[serde(rename = "payer")]
    pub payer_member_id: MemberId,

    #[serde(rename = "receiver")]
    pub receiver_member_id: MemberId,

    pub amount: Cents,
}
