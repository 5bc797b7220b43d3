//! Debt minimization: turning net balances into settling transfers.
//!
//! Greedy largest-debtor to largest-creditor matching. Each step pays off at
//! least one side completely, so `n` non-zero balances settle in at most
//! `n - 1` transfers.
//!
//! The greedy walk does not search for the true minimum transfer count. That
//! problem reduces to subset partitioning and is NP-hard in general; the
//! greedy result is usually optimal, always deterministic, and runs in
//! O(n log n). Do not replace it with an exhaustive search.

use crate::model::{MemberBalance, MemberId, SettlementTransaction};
use crate::money::Cents;
use log::{debug, warn};
use std::collections::HashMap;

/// Result of minimizing a set of balances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Transfers to make, in the order the greedy walk produced them.
    pub transactions: Vec<SettlementTransaction>,

    /// Balances still non-zero after every transfer. Empty unless the input
    /// balances did not sum to zero.
    pub residuals: Vec<MemberBalance>,
}

impl Settlement {
    /// Returns `true` when every balance was fully settled.
    pub fn is_balanced(&self) -> bool {
        self.residuals.is_empty()
    }

    /// Net amount left unsettled: the sum of the original balances.
    pub fn imbalance(&self) -> Cents {
        self.residuals.iter().map(|r| r.net_balance).sum()
    }

    /// Total money moved by all transactions.
    pub fn total_transferred(&self) -> Cents {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    /// Replays the transactions onto `balances`.
    ///
    /// A payer's balance rises by the amount paid and a receiver's falls by
    /// the amount received. Members absent from `balances` are ignored.
    pub fn apply(&self, balances: &[MemberBalance]) -> Vec<MemberBalance> {
        let mut after = balances.to_vec();
        let index: HashMap<MemberId, usize> = after
            .iter()
            .enumerate()
            .map(|(i, b)| (b.member_id.clone(), i))
            .collect();

        for tx in &self.transactions {
            if let Some(&i) = index.get(&tx.payer_member_id) {
                after[i].net_balance += tx.amount;
            }
            if let Some(&i) = index.get(&tx.receiver_member_id) {
                after[i].net_balance -= tx.amount;
            }
        }

        after
    }
}

/// A debtor or creditor with the magnitude still to be settled.
#[derive(Debug)]
struct Position<'a> {
    member_id: &'a MemberId,
    remaining: Cents,
}

/// Computes the transfers that settle `balances`.
///
/// Debtors (negative balance) pay creditors (positive balance). Both sides
/// are sorted by magnitude, largest first. The sort is stable, so members
/// with equal magnitudes keep their input order; that order decides which
/// pairs are matched but never the number of transfers.
///
/// If the balances do not sum to zero the walk still terminates. What
/// cannot be settled is returned in [`Settlement::residuals`] and logged as a
/// warning, since it points at corrupt ledger input.
///
/// # Examples
///
/// ```
/// use settlement_engine::{minimize_transactions, MemberBalance};
///
/// let balances = vec![
///     MemberBalance::new("A", 1700),
///     MemberBalance::new("B", -400),
///     MemberBalance::new("C", -1300),
/// ];
/// let settlement = minimize_transactions(&balances);
/// assert_eq!(settlement.transactions.len(), 2);
/// assert!(settlement.is_balanced());
/// ```
pub fn minimize_transactions(balances: &[MemberBalance]) -> Settlement {
    let mut debtors: Vec<Position<'_>> = balances
        .iter()
        .filter(|b| b.net_balance.is_negative())
        .map(|b| Position {
            member_id: &b.member_id,
            remaining: b.net_balance.abs(),
        })
        .collect();

    let mut creditors: Vec<Position<'_>> = balances
        .iter()
        .filter(|b| b.net_balance.is_positive())
        .map(|b| Position {
            member_id: &b.member_id,
            remaining: b.net_balance,
        })
        .collect();

    // sort_by is stable
    debtors.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    creditors.sort_by(|a, b| b.remaining.cmp(&a.remaining));

    let mut transactions = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < debtors.len() && j < creditors.len() {
        let amount = debtors[i].remaining.min(creditors[j].remaining);

        if amount.is_positive() {
            debug!(
                "{} pays {} to {}",
                debtors[i].member_id, amount, creditors[j].member_id
            );
            transactions.push(SettlementTransaction {
                payer_member_id: debtors[i].member_id.clone(),
                receiver_member_id: creditors[j].member_id.clone(),
                amount,
            });
        }

        debtors[i].remaining -= amount;
        creditors[j].remaining -= amount;

        if debtors[i].remaining.is_zero() {
            i += 1;
        }
        if creditors[j].remaining.is_zero() {
            j += 1;
        }
    }

    let residuals: Vec<MemberBalance> = debtors[i..]
        .iter()
        .map(|d| MemberBalance {
            member_id: d.member_id.clone(),
            net_balance: -d.remaining,
        })
        .chain(creditors[j..].iter().map(|c| MemberBalance {
            member_id: c.member_id.clone(),
            net_balance: c.remaining,
        }))
        .collect();

    let settlement = Settlement {
        transactions,
        residuals,
    };

    if !settlement.is_balanced() {
        warn!(
            "Balances do not sum to zero: {} left unsettled across {} member(s)",
            settlement.imbalance(),
            settlement.residuals.len()
        );
    }

    settlement
}
