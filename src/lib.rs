//! # Settlement Engine
//!
//! Splits shared household expenses, folds them into per-member balances,
//! and computes the transfers that bring every balance back to zero.
//!
//! ## Design Principles
//!
//! - **Integer money**: every amount is whole cents ([`Cents`]); decimal
//!   input is rounded to the nearest cent at the boundary
//! - **Exact splits**: allocated shares always sum to the expense total
//! - **Pure core**: [`allocate`], [`compute_member_summaries`] and
//!   [`minimize_transactions`] hold no state and perform no I/O
//! - **Deterministic output**: roster order for balances, stable
//!   largest-first order for transactions
//!
//! ## Example
//!
//! ```no_run
//! use settlement_engine::SettlementEngine;
//! use std::io::Cursor;
//!
//! let csv = "type,expense,member,amount,policy,deleted\n\
//!            member,,alice,,,\nmember,,bob,,,\n\
//!            expense,1,alice,30.00,equal,\nsplit,1,alice,,,\nsplit,1,bob,,,\n";
//! let mut engine = SettlementEngine::new();
//! engine.process_csv(Cursor::new(csv)).unwrap();
//! engine.write_output(std::io::stdout()).unwrap();
//! ```

pub mod engine;
pub mod error;
pub mod ledger;
pub mod model;
pub mod money;
pub mod record;
pub mod settlement;
pub mod split;

pub use engine::{PeriodReport, SettlementEngine};
pub use error::{Result, SettlementError};
pub use ledger::{compute_balances, compute_member_summaries, scope_of, MemberSummary};
pub use model::{
    Expense, ExpenseId, MemberBalance, MemberId, SettlementTransaction, Split, SplitShare,
};
pub use money::{Cents, ParseCentsError};
pub use record::{ParsedRecord, PeriodRecord};
pub use settlement::{minimize_transactions, Settlement};
pub use split::{allocate, verify_split_sum, SplitKind, SplitPolicy};
