//! Period processor.
//!
//! Reads one reporting period (roster, expenses, split parameters) from CSV,
//! applies the boundary checks, then runs allocation, aggregation and debt
//! minimization. This is the only part of the crate that performs I/O.

use crate::error::{Result, SettlementError};
use crate::ledger::{compute_member_summaries, scope_of, MemberSummary};
use crate::model::{Expense, ExpenseId, MemberBalance, MemberId, Split};
use crate::money::Cents;
use crate::record::{ParsedRecord, PeriodRecord};
use crate::settlement::{minimize_transactions, Settlement};
use crate::split::{allocate, verify_split_sum, SplitKind, SplitPolicy};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::str::FromStr;

/// A split row waiting for its expense to be allocated.
#[derive(Debug, Clone)]
struct Participant {
    member_id: MemberId,
    value: Option<String>,
    row: usize,
}

/// An expense as declared in the input, before allocation.
#[derive(Debug, Clone)]
struct PendingExpense {
    expense: Expense,
    kind: SplitKind,
    participants: Vec<Participant>,
}

/// Everything computed for one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodReport {
    /// Per-member totals, in roster order.
    pub summaries: Vec<MemberSummary>,

    /// Transfers that settle the period.
    pub settlement: Settlement,
}

impl PeriodReport {
    pub fn balances(&self) -> Vec<MemberBalance> {
        self.summaries.iter().map(MemberSummary::balance).collect()
    }
}

/// The period processing engine.
///
/// Collects the roster and the declared expenses while reading, and defers
/// split allocation until the whole period is known, since an expense's
/// participants arrive as separate rows.
///
/// # Output Ordering
///
/// Member summaries follow roster order (first appearance in the input);
/// transactions follow the minimizer's largest-first order.
pub struct SettlementEngine {
    /// Roster in declaration order.
    members: Vec<MemberId>,

    roster: HashSet<MemberId>,

    /// Declared expenses in input order.
    expenses: Vec<PendingExpense>,

    /// Position of each expense in `expenses`.
    expense_index: HashMap<ExpenseId, usize>,

    /// Sum of every accepted expense amount. Bounds every ledger total.
    period_total: Cents,
}

impl SettlementEngine {
    /// Creates a new empty engine.
    pub fn new() -> Self {
        SettlementEngine {
            members: Vec::new(),
            roster: HashSet::new(),
            expenses: Vec::new(),
            expense_index: HashMap::new(),
            period_total: Cents::ZERO,
        }
    }

    /// Reads period records from a CSV reader.
    ///
    /// Invalid records are logged at warn level and skipped.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<PeriodRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result {
                Ok(record) => match record.parse() {
                    Ok(parsed) => {
                        if let Err(e) = self.process_record(parsed, row_num) {
                            warn!("Row {}: {}", row_num, e);
                        }
                    }
                    Err(message) => {
                        let e = SettlementError::InvalidRecord {
                            row: row_num,
                            message,
                        };
                        warn!("{}", e);
                    }
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                }
            }
        }

        Ok(())
    }

    /// Applies a single parsed record.
    fn process_record(&mut self, record: ParsedRecord, row: usize) -> Result<()> {
        match record {
            ParsedRecord::Member(member_id) => {
                if self.roster.contains(&member_id) {
                    debug!("Row {}: Member {} already listed, ignoring", row, member_id);
                    return Ok(());
                }
                self.roster.insert(member_id.clone());
                self.members.push(member_id);
            }
            ParsedRecord::Expense {
                id,
                paid_by,
                amount,
                kind,
                is_deleted,
            } => {
                if self.expense_index.contains_key(&id) {
                    return Err(SettlementError::DuplicateExpenseId {
                        expense_id: id,
                        row,
                    });
                }
                if !amount.is_positive() {
                    return Err(SettlementError::InvalidAmount { amount });
                }
                if amount > Cents::MAX_AMOUNT {
                    return Err(SettlementError::AmountTooLarge {
                        amount,
                        limit: Cents::MAX_AMOUNT,
                    });
                }
                self.period_total = self
                    .period_total
                    .checked_add(amount)
                    .ok_or_else(|| SettlementError::PeriodTotalOverflow {
                        expense_id: id.clone(),
                        row,
                    })?;

                debug!(
                    "Row {}: Expense {} of {} paid by {} ({} split)",
                    row, id, amount, paid_by, kind
                );
                self.expense_index.insert(id.clone(), self.expenses.len());
                self.expenses.push(PendingExpense {
                    expense: Expense {
                        id,
                        paid_by,
                        amount,
                        is_deleted,
                    },
                    kind,
                    participants: Vec::new(),
                });
            }
            ParsedRecord::Split {
                expense_id,
                member_id,
                value,
            } => {
                let slot = match self.expense_index.get(&expense_id) {
                    Some(&slot) => slot,
                    None => {
                        return Err(SettlementError::UnknownExpense { expense_id, row });
                    }
                };
                self.expenses[slot].participants.push(Participant {
                    member_id,
                    value,
                    row,
                });
            }
        }

        Ok(())
    }

    /// Allocates every declared expense.
    ///
    /// Expenses whose allocation fails are logged at warn level and left out
    /// of the period entirely, payment included.
    fn allocate_period(&self) -> (Vec<Expense>, Vec<Split>) {
        let mut expenses = Vec::with_capacity(self.expenses.len());
        let mut splits = Vec::new();

        for pending in &self.expenses {
            let id = &pending.expense.id;
            match allocate_expense(pending) {
                Ok(allocated) if allocated.is_empty() => {
                    warn!("Expense {} has no participants, ignoring", id);
                }
                Ok(allocated) => {
                    for split in &allocated {
                        if !self.roster.contains(&split.member_id) {
                            warn!(
                                "Expense {}: participant {} is not a household member",
                                id, split.member_id
                            );
                        }
                    }
                    if !self.roster.contains(&pending.expense.paid_by) {
                        warn!(
                            "Expense {}: payer {} is not a household member",
                            id, pending.expense.paid_by
                        );
                    }
                    expenses.push(pending.expense.clone());
                    splits.extend(allocated);
                }
                Err(e) => {
                    warn!("Expense {}: {}, ignoring", id, e);
                }
            }
        }

        (expenses, splits)
    }

    /// Computes member summaries and the settlement for the period read so far.
    pub fn report(&self) -> PeriodReport {
        let (expenses, splits) = self.allocate_period();
        let scope = scope_of(&expenses);

        let summaries = compute_member_summaries(&self.members, &expenses, &splits, &scope);
        let balances: Vec<MemberBalance> =
            summaries.iter().map(MemberSummary::balance).collect();
        let settlement = minimize_transactions(&balances);

        PeriodReport {
            summaries,
            settlement,
        }
    }

    /// Writes member summaries, a blank line, then settlement transactions.
    ///
    /// All monetary values are formatted with exactly 2 decimal places.
    pub fn write_output<W: Write>(&self, mut writer: W) -> Result<()> {
        let report = self.report();

        {
            let mut csv_writer = WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut writer);
            csv_writer.write_record(["member", "paid", "share", "net"])?;
            for summary in &report.summaries {
                csv_writer.serialize(summary)?;
            }
            csv_writer.flush()?;
        }

        writeln!(writer)?;

        let mut csv_writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut writer);
        csv_writer.write_record(["payer", "receiver", "amount"])?;
        for tx in &report.settlement.transactions {
            csv_writer.serialize(tx)?;
        }
        csv_writer.flush()?;

        Ok(())
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a pending expense into splits, enforcing the exact-sum check.
fn allocate_expense(pending: &PendingExpense) -> Result<Vec<Split>> {
    let members: Vec<MemberId> = pending
        .participants
        .iter()
        .map(|p| p.member_id.clone())
        .collect();
    let policy = build_policy(pending.kind, &pending.participants)?;

    let shares = allocate(pending.expense.amount, &members, &policy)?;
    if pending.kind == SplitKind::Exact {
        verify_split_sum(pending.expense.amount, &shares)?;
    }

    Ok(shares
        .into_iter()
        .map(|share| Split::from_share(pending.expense.id.clone(), share))
        .collect())
}

/// Reads per-participant split values according to the expense's kind.
///
/// Percentage and share values are optional as a group: when every row
/// leaves the value empty the policy's default applies.
fn build_policy(kind: SplitKind, participants: &[Participant]) -> Result<SplitPolicy> {
    let all_empty = participants.iter().all(|p| p.value.is_none());

    let policy = match kind {
        SplitKind::Equal => SplitPolicy::Equal,
        SplitKind::Exact => SplitPolicy::Exact(parse_values(participants, parse_exact)?),
        SplitKind::Percentage if all_empty => SplitPolicy::Percentage(None),
        SplitKind::Percentage => SplitPolicy::Percentage(Some(parse_values(participants, |v| {
            Decimal::from_str(v).map_err(|e| e.to_string())
        })?)),
        SplitKind::Shares if all_empty => SplitPolicy::Shares(None),
        SplitKind::Shares => SplitPolicy::Shares(Some(parse_values(participants, |v| {
            v.parse::<u32>().map_err(|e| e.to_string())
        })?)),
    };

    Ok(policy)
}

/// Exact amounts are non-negative and capped like expense totals.
fn parse_exact(raw: &str) -> std::result::Result<Cents, String> {
    let amount = Cents::from_str(raw).map_err(|e| e.to_string())?;
    if amount.is_negative() {
        return Err("amount must not be negative".to_string());
    }
    if amount > Cents::MAX_AMOUNT {
        return Err(format!("amount exceeds the limit of {}", Cents::MAX_AMOUNT));
    }
    Ok(amount)
}

fn parse_values<T, F>(participants: &[Participant], parse: F) -> Result<Vec<T>>
where
    F: Fn(&str) -> std::result::Result<T, String>,
{
    participants
        .iter()
        .map(|p| {
            let raw = p.value.as_deref().ok_or_else(|| SettlementError::InvalidRecord {
                row: p.row,
                message: format!("split value for {} is required", p.member_id),
            })?;
            parse(raw).map_err(|message| SettlementError::InvalidRecord {
                row: p.row,
                message: format!("bad split value '{}': {}", raw, message),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn process_csv_str(csv: &str) -> SettlementEngine {
        let mut engine = SettlementEngine::new();
        engine.process_csv(Cursor::new(csv)).unwrap();
        engine
    }

    fn net(report: &PeriodReport) -> Vec<(String, i64)> {
        report
            .summaries
            .iter()
            .map(|s| (s.member_id.to_string(), s.net_balance.as_i64()))
            .collect()
    }

    #[test]
    fn test_equal_split_period() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
member,,B,,,
member,,C,,,
expense,1,A,30.00,equal,
split,1,A,,,
split,1,B,,,
split,1,C,,,
expense,2,B,9.00,,
split,2,A,,,
split,2,B,,,
split,2,C,,,"#;

        let report = process_csv_str(csv).report();

        assert_eq!(
            net(&report),
            vec![
                ("A".to_string(), 1700),
                ("B".to_string(), -400),
                ("C".to_string(), -1300)
            ]
        );
        assert_eq!(report.settlement.transactions.len(), 2);
        assert!(report.settlement.is_balanced());
        assert!(report
            .settlement
            .apply(&report.balances())
            .iter()
            .all(|b| b.net_balance.is_zero()));
    }

    #[test]
    fn test_exact_split_mismatch_drops_expense() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
member,,B,,,
expense,1,A,10.00,exact,
split,1,A,6.00,,
split,1,B,3.00,,
expense,2,B,4.00,exact,
split,2,A,4.00,,"#;

        let report = process_csv_str(csv).report();

        assert_eq!(
            net(&report),
            vec![("A".to_string(), -400), ("B".to_string(), 400)]
        );
    }

    #[test]
    fn test_shares_and_percentages() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
member,,B,,,
expense,1,A,12.00,shares,
split,1,A,1,,
split,1,B,2,,
expense,2,B,10.00,percentage,
split,2,A,25,,
split,2,B,75,,"#;

        let report = process_csv_str(csv).report();

        // A: paid 1200, share 400 + 250; B: paid 1000, share 800 + 750
        assert_eq!(
            net(&report),
            vec![("A".to_string(), 550), ("B".to_string(), -550)]
        );
    }

    #[test]
    fn test_deleted_expense_ignored() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
member,,B,,,
expense,1,A,100.00,equal,true
split,1,A,,,
split,1,B,,,"#;

        let report = process_csv_str(csv).report();
        assert_eq!(net(&report), vec![("A".to_string(), 0), ("B".to_string(), 0)]);
        assert!(report.settlement.transactions.is_empty());
    }

    #[test]
    fn test_duplicate_and_unknown_rows_skipped() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
member,,B,,,
member,,A,,,
expense,1,A,2.00,,
expense,1,B,50.00,,
split,1,B,,,
split,9,A,,,"#;

        let report = process_csv_str(csv).report();
        assert_eq!(
            net(&report),
            vec![("A".to_string(), 200), ("B".to_string(), -200)]
        );
    }

    #[test]
    fn test_non_positive_expense_rejected() {
        let mut engine = SettlementEngine::new();
        let err = engine
            .process_record(
                ParsedRecord::Expense {
                    id: ExpenseId::from("1"),
                    paid_by: MemberId::from("A"),
                    amount: Cents::ZERO,
                    kind: SplitKind::Equal,
                    is_deleted: false,
                },
                2,
            )
            .unwrap_err();
        assert!(matches!(err, SettlementError::InvalidAmount { .. }));
    }

    #[test]
    fn test_oversized_amounts_are_skipped() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
member,,B,,,
expense,1,A,7922816251426433759354395033,,
split,1,B,,,
expense,2,A,90000000000000000,,
split,2,B,,,
expense,3,A,90000000000000000,,
split,3,B,,,
expense,4,A,1000000000000.01,,
split,4,B,,,
expense,5,A,8.00,,
split,5,B,,,"#;

        let report = process_csv_str(csv).report();
        assert_eq!(
            net(&report),
            vec![("A".to_string(), 800), ("B".to_string(), -800)]
        );
        assert!(report.settlement.is_balanced());
    }

    #[test]
    fn test_largest_amounts_accumulate_without_overflow() {
        let mut csv =
            String::from("type,expense,member,amount,policy,deleted\nmember,,A,,,\nmember,,B,,,\n");
        for id in 0..3 {
            csv.push_str(&format!("expense,{},A,1000000000000.00,,\nsplit,{},B,,,\n", id, id));
        }

        let report = process_csv_str(&csv).report();
        let expected = 3 * Cents::MAX_AMOUNT.as_i64();
        assert_eq!(
            net(&report),
            vec![("A".to_string(), expected), ("B".to_string(), -expected)]
        );
    }

    #[test]
    fn test_period_total_overflow_rejected() {
        let mut engine = SettlementEngine::new();
        engine.period_total = Cents::new(i64::MAX - 10);

        let err = engine
            .process_record(
                ParsedRecord::Expense {
                    id: ExpenseId::from("big"),
                    paid_by: MemberId::from("A"),
                    amount: Cents::new(11),
                    kind: SplitKind::Equal,
                    is_deleted: false,
                },
                7,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::PeriodTotalOverflow { row: 7, .. }
        ));
        assert!(engine.expenses.is_empty());
    }

    #[test]
    fn test_exact_values_must_be_non_negative_and_bounded() {
        let participant = |value: &str| Participant {
            member_id: MemberId::from("A"),
            value: Some(value.to_string()),
            row: 3,
        };

        assert!(matches!(
            build_policy(SplitKind::Exact, &[participant("-1.00")]),
            Err(SettlementError::InvalidRecord { row: 3, .. })
        ));
        assert!(matches!(
            build_policy(SplitKind::Exact, &[participant("90000000000000000")]),
            Err(SettlementError::InvalidRecord { row: 3, .. })
        ));
        assert_eq!(
            build_policy(SplitKind::Exact, &[participant("2.50")]).unwrap(),
            SplitPolicy::Exact(vec![Cents::new(250)])
        );
    }

    #[test]
    fn test_partial_split_values_rejected() {
        let participants = vec![
            Participant {
                member_id: MemberId::from("A"),
                value: Some("2".to_string()),
                row: 3,
            },
            Participant {
                member_id: MemberId::from("B"),
                value: None,
                row: 4,
            },
        ];

        assert!(matches!(
            build_policy(SplitKind::Shares, &participants),
            Err(SettlementError::InvalidRecord { row: 4, .. })
        ));
        assert_eq!(
            build_policy(SplitKind::Equal, &participants).unwrap(),
            SplitPolicy::Equal
        );
    }

    #[test]
    fn test_non_member_participant_leaves_residual() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
expense,1,A,10.00,,
split,1,A,,,
split,1,guest,,,"#;

        let report = process_csv_str(csv).report();
        assert_eq!(net(&report), vec![("A".to_string(), 500)]);
        assert!(!report.settlement.is_balanced());
        assert_eq!(report.settlement.imbalance(), Cents::new(500));
    }

    #[test]
    fn test_output_format() {
        let csv = r#"type,expense,member,amount,policy,deleted
member,,A,,,
member,,B,,,
expense,1,A,10.00,,
split,1,A,,,
split,1,B,,,"#;

        let engine = process_csv_str(csv);
        let mut output = Vec::new();
        engine.write_output(&mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(
            output_str,
            "member,paid,share,net\nA,10.00,5.00,5.00\nB,0.00,5.00,-5.00\n\npayer,receiver,amount\nB,A,5.00\n"
        );
    }

    #[test]
    fn test_output_headers_without_transactions() {
        let engine = process_csv_str("type,expense,member,amount,policy,deleted\n");
        let mut output = Vec::new();
        engine.write_output(&mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "member,paid,share,net\n\npayer,receiver,amount\n"
        );
    }
}
