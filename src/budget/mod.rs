//! Participatory-budget voting
//!
//! Budget proposals carry a vote count and the set of citizens who currently
//! have an active vote. The single mutation is an atomic per-proposal vote
//! toggle; see [`ledger::VoteLedger`].

mod ledger;
mod models;
mod store;

pub use ledger::VoteLedger;
pub use models::{BallotEntry, BudgetProposal, BudgetStatus};
pub use store::{BudgetSnapshot, BudgetStore, MemoryBudgetStore, PgBudgetStore, VoteOp};
