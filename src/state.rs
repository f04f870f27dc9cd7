//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::budget::{PgBudgetStore, VoteLedger};
use crate::forum::ForumService;
use crate::grievance::GrievanceService;
use crate::transparency::TransparencyService;
use crate::users::UserService;
use deadpool_postgres::Pool;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Account service
    pub users: UserService,

    /// Participatory-budget vote ledger (atomic per-proposal vote toggles)
    pub budgets: VoteLedger<PgBudgetStore>,

    /// Grievance submission and triage
    pub grievances: GrievanceService,

    /// Discussion forum
    pub forum: ForumService,

    /// Fund transparency and politician tracker
    pub transparency: TransparencyService,
}

impl AppState {
    /// Create new application state from the database pool
    pub fn new(pool: Pool) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            budgets: VoteLedger::new(PgBudgetStore::new(pool.clone())),
            grievances: GrievanceService::new(pool.clone()),
            forum: ForumService::new(pool.clone()),
            transparency: TransparencyService::new(pool),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
