//! Error types for the settlement engine.

use crate::model::ExpenseId;
use crate::money::Cents;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SettlementError>;

/// Errors that can occur while allocating, aggregating or reading a period.
///
/// An empty participant list and a balance set that does not sum to zero are
/// deliberately absent: the first yields an empty result, the second is
/// reported through [`crate::Settlement::residuals`].
#[derive(Error, Debug)]
pub enum SettlementError {
    /// Allocator total was zero or negative
    #[error("Expense amount must be positive, got {amount}")]
    InvalidAmount { amount: Cents },

    /// Amount read from input is larger than [`Cents::MAX_AMOUNT`]
    #[error("Amount {amount} exceeds the limit of {limit}")]
    AmountTooLarge { amount: Cents, limit: Cents },

    /// Accepting an expense would overflow the period's running total
    #[error("Expense {expense_id} at row {row} overflows the period total")]
    PeriodTotalOverflow { expense_id: ExpenseId, row: usize },

    /// Exact split amounts do not add up to the expense total
    #[error("Split amounts ({actual}) must equal total ({expected})")]
    SplitSumMismatch { expected: Cents, actual: Cents },

    /// Policy parameters were not given one-per-member
    #[error("Expected {members} split parameters, got {parameters}")]
    ParameterCountMismatch { members: usize, parameters: usize },

    /// Explicit percentages are negative, too precise or do not total 100
    #[error("Invalid percentages: {0}")]
    InvalidPercentages(String),

    /// Every share weight was zero
    #[error("Share weights must not all be zero")]
    ZeroTotalWeight,

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid period record
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Duplicate expense ID
    #[error("Duplicate expense ID {expense_id} at row {row}")]
    DuplicateExpenseId { expense_id: ExpenseId, row: usize },

    /// Split row references an expense that was never declared
    #[error("Split at row {row} references unknown expense {expense_id}")]
    UnknownExpense { expense_id: ExpenseId, row: usize },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: settlement-engine <period.csv | ->")]
    MissingArgument,
}
