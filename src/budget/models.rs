//! Budget proposal data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Proposal voting status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Accepting votes
    Open,
    /// Vote state frozen by an administrator
    Closed,
}

impl Default for BudgetStatus {
    fn default() -> Self {
        BudgetStatus::Open
    }
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Open => "open",
            BudgetStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(BudgetStatus::Open),
            "closed" => Some(BudgetStatus::Closed),
            _ => None,
        }
    }
}

/// A participatory-budget proposal.
///
/// Invariant: `vote_count == voters.len()` after every successful mutation.
/// All mutation of the pair goes through the vote ledger's atomic commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProposal {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: BudgetStatus,
    pub vote_count: i64,
    pub voters: HashSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl BudgetProposal {
    pub fn new(title: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            status: BudgetStatus::Open,
            vote_count: 0,
            voters: HashSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// A proposal as rendered on the ballot, with the caller's own vote state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotEntry {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: BudgetStatus,
    pub vote_count: i64,
    pub has_voted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_proposal_starts_open_and_empty() {
        let p = BudgetProposal::new("Ward 12 road repair".to_string(), "Resurfacing".to_string());
        assert_eq!(p.status, BudgetStatus::Open);
        assert_eq!(p.vote_count, 0);
        assert!(p.voters.is_empty());
    }

    #[test]
    fn test_status_string_round_trip() {
        assert_eq!(BudgetStatus::parse("open"), Some(BudgetStatus::Open));
        assert_eq!(BudgetStatus::parse("closed"), Some(BudgetStatus::Closed));
        assert_eq!(BudgetStatus::parse("draft"), None);
        assert_eq!(BudgetStatus::Closed.as_str(), "closed");
    }
}
