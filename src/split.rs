//! Split allocation: dividing one expense total among its participants.
//!
//! Percentage and share splits give each member
//! `floor(total * weight / total_weight)` and put whatever cents are left over
//! on the first member in the list with a non-zero weight, so a member
//! weighted at zero always owes exactly nothing. Equal splits give everyone
//! `floor(total / n)` and hand the `total % n` leftover cents out one each to
//! the first members, so no two equal shares differ by more than a cent.
//! Either way the shares add up to the total exactly.
//!
//! # Remainder placement
//!
//! Leftover cents are placed by list position. With a stable member order the
//! same people absorb every rounding cent across many expenses; callers that
//! care can rotate the participant list themselves.

use crate::error::{Result, SettlementError};
use crate::model::{MemberId, SplitShare};
use crate::money::Cents;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Basis points in one hundred percent.
const FULL_BASIS_POINTS: u64 = 10_000;

/// The name of a split policy, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitKind {
    #[default]
    Equal,
    Exact,
    Percentage,
    Shares,
}

impl FromStr for SplitKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "equal" => Ok(SplitKind::Equal),
            "exact" => Ok(SplitKind::Exact),
            "percentage" | "percent" => Ok(SplitKind::Percentage),
            "shares" => Ok(SplitKind::Shares),
            other => Err(format!("unknown split type '{}'", other)),
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitKind::Equal => "equal",
            SplitKind::Exact => "exact",
            SplitKind::Percentage => "percentage",
            SplitKind::Shares => "shares",
        };
        f.write_str(name)
    }
}

/// How an expense total is divided, with the per-member parameters the
/// policy needs. Parameter lists are positional and match the member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Same amount for everyone.
    Equal,

    /// Caller-chosen amounts, passed through untouched.
    Exact(Vec<Cents>),

    /// Percent of the total per member; `None` means `100 / n` each.
    Percentage(Option<Vec<Decimal>>),

    /// Integer weights per member; `None` means weight 1 each.
    Shares(Option<Vec<u32>>),
}

impl SplitPolicy {
    pub fn kind(&self) -> SplitKind {
        match self {
            SplitPolicy::Equal => SplitKind::Equal,
            SplitPolicy::Exact(_) => SplitKind::Exact,
            SplitPolicy::Percentage(_) => SplitKind::Percentage,
            SplitPolicy::Shares(_) => SplitKind::Shares,
        }
    }
}

/// Divides `total` among `members` according to `policy`.
///
/// For every policy except [`SplitPolicy::Exact`] the returned amounts sum to
/// exactly `total`. Exact amounts are returned as given; use
/// [`verify_split_sum`] before accepting them.
///
/// An empty member list produces an empty allocation. Rejecting
/// zero-participant expenses is the caller's job.
///
/// # Errors
///
/// - [`SettlementError::InvalidAmount`] if `total` is not positive
/// - [`SettlementError::ParameterCountMismatch`] if a parameter list does not
///   line up with `members`
/// - [`SettlementError::InvalidPercentages`] if explicit percentages are
///   negative, use more than two decimal places or do not total 100
/// - [`SettlementError::ZeroTotalWeight`] if every share weight is zero
///
/// # Examples
///
/// ```
/// use settlement_engine::{allocate, Cents, MemberId, SplitPolicy};
///
/// let members: Vec<MemberId> = ["a", "b", "c"].into_iter().map(MemberId::from).collect();
/// let shares = allocate(Cents::new(1000), &members, &SplitPolicy::Equal).unwrap();
/// let amounts: Vec<i64> = shares.iter().map(|s| s.amount.as_i64()).collect();
/// assert_eq!(amounts, vec![334, 333, 333]);
/// ```
pub fn allocate(
    total: Cents,
    members: &[MemberId],
    policy: &SplitPolicy,
) -> Result<Vec<SplitShare>> {
    if !total.is_positive() {
        return Err(SettlementError::InvalidAmount { amount: total });
    }
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let n = members.len();
    let shares = match policy {
        SplitPolicy::Equal => build(members, equal(total, n), |_| (None, None)),
        SplitPolicy::Exact(amounts) => {
            check_count(n, amounts.len())?;
            build(members, amounts.clone(), |_| (None, None))
        }
        SplitPolicy::Percentage(None) => {
            let each = (Decimal::ONE_HUNDRED / Decimal::from(n as u64)).round_dp(2);
            let amounts = proportional(total, &vec![1; n]);
            build(members, amounts, |_| (Some(each), None))
        }
        SplitPolicy::Percentage(Some(percentages)) => {
            check_count(n, percentages.len())?;
            let basis_points = to_basis_points(percentages)?;
            let amounts = proportional(total, &basis_points);
            build(members, amounts, |i| (Some(percentages[i]), None))
        }
        SplitPolicy::Shares(None) => {
            let amounts = proportional(total, &vec![1; n]);
            build(members, amounts, |_| (None, Some(1)))
        }
        SplitPolicy::Shares(Some(weights)) => {
            check_count(n, weights.len())?;
            if weights.iter().all(|&w| w == 0) {
                return Err(SettlementError::ZeroTotalWeight);
            }
            let wide: Vec<u64> = weights.iter().map(|&w| u64::from(w)).collect();
            let amounts = proportional(total, &wide);
            build(members, amounts, |i| (None, Some(weights[i])))
        }
    };

    Ok(shares)
}

/// Checks that allocated amounts add up to the expense total.
///
/// This is the acceptance check for exact splits. A mismatch is reported,
/// never corrected. The sum saturates, so oversized inputs are reported as a
/// mismatch instead of wrapping.
pub fn verify_split_sum(total: Cents, shares: &[SplitShare]) -> Result<()> {
    let actual = shares
        .iter()
        .fold(Cents::ZERO, |acc, s| acc.saturating_add(s.amount));
    if actual != total {
        return Err(SettlementError::SplitSumMismatch {
            expected: total,
            actual,
        });
    }
    Ok(())
}

/// `floor(total / n)` each, plus one cent for each of the first
/// `total % n` slots.
fn equal(total: Cents, n: usize) -> Vec<Cents> {
    let count = n as i64;
    let base = total.as_i64() / count;
    let remainder = (total.as_i64() % count) as usize;

    (0..n)
        .map(|i| Cents::new(if i < remainder { base + 1 } else { base }))
        .collect()
}

/// Floor-proportional allocation with the remainder on the first slot whose
/// weight is non-zero.
///
/// `total` is positive and at least one weight is non-zero.
fn proportional(total: Cents, weights: &[u64]) -> Vec<Cents> {
    let total_weight: i128 = weights.iter().map(|&w| i128::from(w)).sum();
    let cents = i128::from(total.as_i64());

    // Each quotient is at most `cents`, so it fits back into i64.
    let mut amounts: Vec<Cents> = weights
        .iter()
        .map(|&w| Cents::new((cents * i128::from(w) / total_weight) as i64))
        .collect();

    let allocated: Cents = amounts.iter().sum();
    if let Some(slot) = weights.iter().position(|&w| w > 0) {
        amounts[slot] += total - allocated;
    }
    amounts
}

fn build<F>(members: &[MemberId], amounts: Vec<Cents>, metadata: F) -> Vec<SplitShare>
where
    F: Fn(usize) -> (Option<Decimal>, Option<u32>),
{
    members
        .iter()
        .zip(amounts)
        .enumerate()
        .map(|(i, (member_id, amount))| {
            let (percentage, shares) = metadata(i);
            SplitShare {
                member_id: member_id.clone(),
                amount,
                percentage,
                shares,
            }
        })
        .collect()
}

fn check_count(members: usize, parameters: usize) -> Result<()> {
    if members != parameters {
        return Err(SettlementError::ParameterCountMismatch {
            members,
            parameters,
        });
    }
    Ok(())
}

/// Converts percentages to whole basis points, requiring a 100% total.
fn to_basis_points(percentages: &[Decimal]) -> Result<Vec<u64>> {
    let mut basis_points = Vec::with_capacity(percentages.len());

    for pct in percentages {
        if pct.is_sign_negative() && !pct.is_zero() {
            return Err(SettlementError::InvalidPercentages(format!(
                "{} is negative",
                pct
            )));
        }
        let scaled = pct.checked_mul(Decimal::ONE_HUNDRED).ok_or_else(|| {
            SettlementError::InvalidPercentages(format!("{} is out of range", pct))
        })?;
        if !scaled.fract().is_zero() {
            return Err(SettlementError::InvalidPercentages(format!(
                "{} has more than two decimal places",
                pct
            )));
        }
        let bp = scaled.to_u64().ok_or_else(|| {
            SettlementError::InvalidPercentages(format!("{} is out of range", pct))
        })?;
        basis_points.push(bp);
    }

    let sum: u64 = basis_points.iter().sum();
    if sum != FULL_BASIS_POINTS {
        let total: Decimal = percentages.iter().sum();
        return Err(SettlementError::InvalidPercentages(format!(
            "percentages total {}, expected 100",
            total
        )));
    }

    Ok(basis_points)
}
