//! Period records for CSV parsing and internal representation.

use crate::model::{ExpenseId, MemberId};
use crate::money::Cents;
use crate::split::SplitKind;
use serde::Deserialize;
use std::str::FromStr;

/// Raw period record as read from CSV.
///
/// Columns that a record type does not use are left empty.
#[derive(Debug, Deserialize)]
pub struct PeriodRecord {
    /// Record type: member, expense, split
    #[serde(rename = "type")]
    pub record_type: String,

    /// Expense ID (expense and split rows)
    pub expense: Option<String>,

    /// Member ID: the roster member, the payer, or the split participant
    pub member: Option<String>,

    /// Expense total, or the split parameter for split rows
    pub amount: Option<String>,

    /// Split policy (expense rows)
    pub policy: Option<String>,

    /// Soft-delete flag (expense rows)
    pub deleted: Option<String>,
}

impl PeriodRecord {
    /// Parses the raw CSV record into a typed entry.
    ///
    /// Returns a short reason if the record is unusable.
    pub fn parse(&self) -> Result<ParsedRecord, String> {
        let record_type = self.record_type.trim().to_lowercase();

        match record_type.as_str() {
            "member" => Ok(ParsedRecord::Member(self.member_id()?)),
            "expense" => {
                let amount = self
                    .amount()
                    .ok_or_else(|| "expense amount is required".to_string())?;
                let amount =
                    Cents::from_str(amount).map_err(|e| format!("bad expense amount: {}", e))?;
                let kind = SplitKind::from_str(self.policy.as_deref().unwrap_or(""))?;

                Ok(ParsedRecord::Expense {
                    id: self.expense_id()?,
                    paid_by: self.member_id()?,
                    amount,
                    kind,
                    is_deleted: self.is_deleted()?,
                })
            }
            "split" => Ok(ParsedRecord::Split {
                expense_id: self.expense_id()?,
                member_id: self.member_id()?,
                value: self.amount().map(str::to_string),
            }),
            other => Err(format!("unknown record type '{}'", other)),
        }
    }

    fn member_id(&self) -> Result<MemberId, String> {
        non_empty(&self.member)
            .map(MemberId::from)
            .ok_or_else(|| "member is required".to_string())
    }

    fn expense_id(&self) -> Result<ExpenseId, String> {
        non_empty(&self.expense)
            .map(ExpenseId::from)
            .ok_or_else(|| "expense id is required".to_string())
    }

    fn amount(&self) -> Option<&str> {
        non_empty(&self.amount)
    }

    fn is_deleted(&self) -> Result<bool, String> {
        match non_empty(&self.deleted).map(str::to_lowercase).as_deref() {
            None | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => Err(format!("bad deleted flag '{}'", other)),
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A parsed period record ready for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRecord {
    /// Adds a member to the period's roster.
    Member(MemberId),

    /// Declares an expense; its participants follow as split rows.
    Expense {
        id: ExpenseId,
        paid_by: MemberId,
        amount: Cents,
        kind: SplitKind,
        is_deleted: bool,
    },

    /// Adds a participant to an expense. `value` is interpreted according
    /// to the expense's split kind.
    Split {
        expense_id: ExpenseId,
        member_id: MemberId,
        value: Option<String>,
    },
}
