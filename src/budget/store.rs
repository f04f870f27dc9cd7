//! Budget proposal storage
//!
//! The vote ledger talks to storage through [`BudgetStore`]: a point-read of a
//! versioned proposal snapshot, a compare-and-swap commit that applies a voter
//! membership change and the matching count change together, and lifecycle
//! CRUD. Two implementations: PostgreSQL for production and an in-memory
//! versioned store with the same commit semantics.

use crate::budget::models::{BudgetProposal, BudgetStatus};
use crate::error::AppError;
use chrono::Utc;
use deadpool_postgres::Pool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Direction of a vote toggle commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOp {
    Cast,
    Withdraw,
}

/// A proposal read together with its storage version token.
///
/// The version advances on every committed mutation (vote commits and status
/// changes alike), so a commit conditioned on a stale version always fails.
#[derive(Debug, Clone)]
pub struct BudgetSnapshot {
    pub proposal: BudgetProposal,
    pub version: i64,
}

/// Storage contract for the vote ledger
#[allow(async_fn_in_trait)]
pub trait BudgetStore {
    async fn create(&self, proposal: BudgetProposal) -> Result<BudgetProposal, AppError>;

    /// Consistent point-read of one proposal with its current version
    async fn fetch(&self, id: Uuid) -> Result<Option<BudgetSnapshot>, AppError>;

    /// All proposals, newest first
    async fn list(&self) -> Result<Vec<BudgetSnapshot>, AppError>;

    /// Commit one vote toggle if and only if the proposal is still open and
    /// its version equals `expected_version`. Membership and count change in
    /// the same commit; returns `false` when the version (or status) moved.
    async fn commit_vote(
        &self,
        id: Uuid,
        expected_version: i64,
        voter: Uuid,
        op: VoteOp,
        new_count: i64,
    ) -> Result<bool, AppError>;

    /// Freeze a proposal's vote state. Bumps the version so in-flight
    /// optimistic commits lose the swap. Returns `false` if the proposal
    /// does not exist.
    async fn close(&self, id: Uuid) -> Result<bool, AppError>;

    /// Remove a proposal and its vote state. Returns `false` if absent.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// Thread-safe in-memory store with versioned compare-and-swap commits.
///
/// The concurrency substrate for tests and a reference for the commit
/// contract; production uses [`PgBudgetStore`].
#[derive(Clone, Default)]
pub struct MemoryBudgetStore {
    proposals: Arc<RwLock<HashMap<Uuid, BudgetSnapshot>>>,
}

impl MemoryBudgetStore {
    pub fn new() -> Self {
        Self {
            proposals: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl BudgetStore for MemoryBudgetStore {
    async fn create(&self, proposal: BudgetProposal) -> Result<BudgetProposal, AppError> {
        let mut proposals = self.proposals.write().await;
        let id = proposal.id;
        proposals.insert(
            id,
            BudgetSnapshot {
                proposal: proposal.clone(),
                version: 0,
            },
        );
        Ok(proposal)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<BudgetSnapshot>, AppError> {
        let proposals = self.proposals.read().await;
        Ok(proposals.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<BudgetSnapshot>, AppError> {
        let proposals = self.proposals.read().await;
        let mut all: Vec<BudgetSnapshot> = proposals.values().cloned().collect();
        all.sort_by(|a, b| b.proposal.created_at.cmp(&a.proposal.created_at));
        Ok(all)
    }

    async fn commit_vote(
        &self,
        id: Uuid,
        expected_version: i64,
        voter: Uuid,
        op: VoteOp,
        new_count: i64,
    ) -> Result<bool, AppError> {
        let mut proposals = self.proposals.write().await;
        let entry = match proposals.get_mut(&id) {
            Some(entry) => entry,
            None => return Ok(false),
        };

        if entry.version != expected_version || entry.proposal.status != BudgetStatus::Open {
            return Ok(false);
        }

        match op {
            VoteOp::Cast => entry.proposal.voters.insert(voter),
            VoteOp::Withdraw => entry.proposal.voters.remove(&voter),
        };
        entry.proposal.vote_count = new_count;
        entry.version += 1;

        debug_assert_eq!(entry.proposal.vote_count as usize, entry.proposal.voters.len());
        Ok(true)
    }

    async fn close(&self, id: Uuid) -> Result<bool, AppError> {
        let mut proposals = self.proposals.write().await;
        match proposals.get_mut(&id) {
            Some(entry) => {
                entry.proposal.status = BudgetStatus::Closed;
                entry.version += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut proposals = self.proposals.write().await;
        Ok(proposals.remove(&id).is_some())
    }
}

// =============================================================================
// PostgreSQL store
// =============================================================================

/// PostgreSQL-backed store.
///
/// Voter membership lives in `budget_votes` (primary key `(budget_id,
/// user_id)` gives set semantics); the count and version live on the
/// `budgets` row. A vote commit runs in one transaction: the version swap
/// on the row, then the membership insert/delete.
pub struct PgBudgetStore {
    pool: Pool,
}

impl PgBudgetStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn snapshot_from_row(row: &tokio_postgres::Row) -> Result<BudgetSnapshot, AppError> {
        let status_str: String = row.get("status");
        let status = BudgetStatus::parse(&status_str)
            .ok_or_else(|| AppError::Internal(format!("Unknown budget status: {}", status_str)))?;
        let voters: Vec<Uuid> = row.get("voters");

        Ok(BudgetSnapshot {
            proposal: BudgetProposal {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                status,
                vote_count: row.get("vote_count"),
                voters: voters.into_iter().collect(),
                created_at: row.get("created_at"),
            },
            version: row.get("version"),
        })
    }
}

const SNAPSHOT_QUERY: &str = "SELECT b.id, b.title, b.description, b.status, b.vote_count, \
     b.version, b.created_at, \
     COALESCE(ARRAY_AGG(v.user_id) FILTER (WHERE v.user_id IS NOT NULL), '{}') AS voters \
     FROM budgets b \
     LEFT JOIN budget_votes v ON v.budget_id = b.id";

impl BudgetStore for PgBudgetStore {
    async fn create(&self, proposal: BudgetProposal) -> Result<BudgetProposal, AppError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO budgets (id, title, description, status, vote_count, version, created_at) \
                 VALUES ($1, $2, $3, $4, $5, 0, $6)",
                &[
                    &proposal.id,
                    &proposal.title,
                    &proposal.description,
                    &proposal.status.as_str(),
                    &proposal.vote_count,
                    &proposal.created_at,
                ],
            )
            .await?;
        Ok(proposal)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<BudgetSnapshot>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("{} WHERE b.id = $1 GROUP BY b.id", SNAPSHOT_QUERY);
        let row = client.query_opt(sql.as_str(), &[&id]).await?;

        row.as_ref().map(Self::snapshot_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<BudgetSnapshot>, AppError> {
        let client = self.pool.get().await?;
        let sql = format!("{} GROUP BY b.id ORDER BY b.created_at DESC", SNAPSHOT_QUERY);
        let rows = client.query(sql.as_str(), &[]).await?;

        rows.iter().map(Self::snapshot_from_row).collect()
    }

    async fn commit_vote(
        &self,
        id: Uuid,
        expected_version: i64,
        voter: Uuid,
        op: VoteOp,
        new_count: i64,
    ) -> Result<bool, AppError> {
        let mut client = self.pool.get().await?;
        let txn = client.transaction().await?;

        let swapped = txn
            .execute(
                "UPDATE budgets SET vote_count = $3, version = version + 1 \
                 WHERE id = $1 AND version = $2 AND status = 'open'",
                &[&id, &expected_version, &new_count],
            )
            .await?;

        if swapped == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        match op {
            VoteOp::Cast => {
                txn.execute(
                    "INSERT INTO budget_votes (budget_id, user_id, cast_at) VALUES ($1, $2, $3)",
                    &[&id, &voter, &Utc::now()],
                )
                .await?;
            }
            VoteOp::Withdraw => {
                txn.execute(
                    "DELETE FROM budget_votes WHERE budget_id = $1 AND user_id = $2",
                    &[&id, &voter],
                )
                .await?;
            }
        }

        txn.commit().await?;
        Ok(true)
    }

    async fn close(&self, id: Uuid) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE budgets SET status = 'closed', version = version + 1 WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut client = self.pool.get().await?;
        let txn = client.transaction().await?;
        txn.execute("DELETE FROM budget_votes WHERE budget_id = $1", &[&id])
            .await?;
        let deleted = txn.execute("DELETE FROM budgets WHERE id = $1", &[&id]).await?;
        txn.commit().await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_commit_requires_current_version() {
        let store = MemoryBudgetStore::new();
        let p = store
            .create(BudgetProposal::new("Park".into(), "New ward park".into()))
            .await
            .unwrap();
        let voter = Uuid::new_v4();

        assert!(store.commit_vote(p.id, 0, voter, VoteOp::Cast, 1).await.unwrap());
        // Stale version must lose the swap
        assert!(!store.commit_vote(p.id, 0, voter, VoteOp::Withdraw, 0).await.unwrap());

        let snap = store.fetch(p.id).await.unwrap().unwrap();
        assert_eq!(snap.version, 1);
        assert_eq!(snap.proposal.vote_count, 1);
        assert!(snap.proposal.voters.contains(&voter));
    }

    #[tokio::test]
    async fn test_close_bumps_version() {
        let store = MemoryBudgetStore::new();
        let p = store
            .create(BudgetProposal::new("Drain".into(), "Storm drains".into()))
            .await
            .unwrap();

        let before = store.fetch(p.id).await.unwrap().unwrap();
        assert!(store.close(p.id).await.unwrap());
        let after = store.fetch(p.id).await.unwrap().unwrap();

        assert_eq!(after.proposal.status, BudgetStatus::Closed);
        assert!(after.version > before.version);

        // A commit prepared against the pre-close snapshot must fail
        let voter = Uuid::new_v4();
        assert!(!store
            .commit_vote(p.id, before.version, voter, VoteOp::Cast, 1)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_vote_state() {
        let store = MemoryBudgetStore::new();
        let p = store
            .create(BudgetProposal::new("Lights".into(), "Street lighting".into()))
            .await
            .unwrap();

        assert!(store.delete(p.id).await.unwrap());
        assert!(store.fetch(p.id).await.unwrap().is_none());
        assert!(!store.delete(p.id).await.unwrap());
    }
}
