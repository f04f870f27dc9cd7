//! The vote ledger
//!
//! Per-proposal vote state (count + voter set) with one mutation: an atomic
//! vote toggle. The read-check-write sequence runs as an optimistic
//! transaction against the backing store: read a versioned snapshot, decide,
//! then commit conditioned on that version. A lost swap is retried from a
//! fresh read, a bounded number of times.

use crate::budget::models::{BallotEntry, BudgetProposal, BudgetStatus};
use crate::budget::store::{BudgetSnapshot, BudgetStore, VoteOp};
use crate::error::AppError;
use tracing::{debug, warn};
use uuid::Uuid;

/// Commit attempts before giving up with `Contention`
const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Vote ledger over a replaceable store
pub struct VoteLedger<S> {
    store: S,
}

impl<S: BudgetStore> VoteLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a new proposal (administrator action). Opens with an empty
    /// voter set and a zero count.
    pub async fn create(
        &self,
        title: String,
        description: String,
    ) -> Result<BudgetProposal, AppError> {
        self.store.create(BudgetProposal::new(title, description)).await
    }

    /// Flip whether `voter` is counted on `proposal_id`.
    ///
    /// `believed_voted` is the caller's last-known vote state. It selects
    /// withdraw-vs-cast semantics but is never trusted as ground truth: when
    /// it disagrees with the stored voter set (the caller double-clicked, or
    /// raced another session) the toggle is a benign no-op that returns the
    /// current count.
    ///
    /// Returns the proposal's vote count after the operation.
    pub async fn toggle_vote(
        &self,
        proposal_id: Uuid,
        voter: Uuid,
        believed_voted: bool,
    ) -> Result<i64, AppError> {
        if voter.is_nil() {
            return Err(AppError::Unauthorized(
                "You must be signed in to vote".to_string(),
            ));
        }

        for attempt in 0..MAX_COMMIT_ATTEMPTS {
            let snapshot = self
                .store
                .fetch(proposal_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Budget proposal {} not found", proposal_id))
                })?;

            if snapshot.proposal.status == BudgetStatus::Closed {
                return Err(AppError::VotingClosed(
                    "Voting on this budget proposal is closed".to_string(),
                ));
            }

            let has_voted = snapshot.proposal.voters.contains(&voter);
            if has_voted != believed_voted {
                // Stale belief: another request already applied this toggle.
                debug!(%proposal_id, %voter, "vote toggle no-op: stale believed state");
                return Ok(snapshot.proposal.vote_count);
            }

            let (op, new_count) = if has_voted {
                (VoteOp::Withdraw, snapshot.proposal.vote_count - 1)
            } else {
                (VoteOp::Cast, snapshot.proposal.vote_count + 1)
            };

            if self
                .store
                .commit_vote(proposal_id, snapshot.version, voter, op, new_count)
                .await?
            {
                debug!(%proposal_id, %voter, ?op, new_count, "vote committed");
                return Ok(new_count);
            }

            // Version moved underneath us; re-read and try again.
            debug!(%proposal_id, %voter, attempt, "vote commit lost the swap, retrying");
        }

        warn!(%proposal_id, %voter, "vote toggle exhausted {} commit attempts", MAX_COMMIT_ATTEMPTS);
        Err(AppError::Contention(
            "The proposal is receiving heavy voting traffic, please try again".to_string(),
        ))
    }

    /// All proposals with the viewer's own vote state, newest first
    pub async fn ballot(&self, viewer: Option<Uuid>) -> Result<Vec<BallotEntry>, AppError> {
        let snapshots = self.store.list().await?;
        Ok(snapshots
            .into_iter()
            .map(|BudgetSnapshot { proposal, .. }| BallotEntry {
                has_voted: viewer.map_or(false, |v| proposal.voters.contains(&v)),
                id: proposal.id,
                title: proposal.title,
                description: proposal.description,
                status: proposal.status,
                vote_count: proposal.vote_count,
            })
            .collect())
    }

    /// Fetch one proposal
    pub async fn get(&self, id: Uuid) -> Result<BudgetProposal, AppError> {
        self.store
            .fetch(id)
            .await?
            .map(|s| s.proposal)
            .ok_or_else(|| AppError::NotFound(format!("Budget proposal {} not found", id)))
    }

    /// Freeze voting on a proposal (administrator action)
    pub async fn close(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.close(id).await? {
            return Err(AppError::NotFound(format!("Budget proposal {} not found", id)));
        }
        Ok(())
    }

    /// Delete a proposal and its vote state (administrator action)
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("Budget proposal {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::store::MemoryBudgetStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn ledger() -> VoteLedger<MemoryBudgetStore> {
        VoteLedger::new(MemoryBudgetStore::new())
    }

    async fn assert_invariant(ledger: &VoteLedger<MemoryBudgetStore>, id: Uuid) {
        let p = ledger.get(id).await.unwrap();
        assert_eq!(p.vote_count as usize, p.voters.len());
    }

    #[tokio::test]
    async fn test_cast_withdraw_round_trip() {
        let ledger = ledger();
        let p = ledger
            .create("Ward library".into(), "Reading room extension".into())
            .await
            .unwrap();
        let u1 = Uuid::new_v4();

        assert_eq!(ledger.toggle_vote(p.id, u1, false).await.unwrap(), 1);
        assert_invariant(&ledger, p.id).await;
        assert!(ledger.get(p.id).await.unwrap().voters.contains(&u1));

        assert_eq!(ledger.toggle_vote(p.id, u1, true).await.unwrap(), 0);
        assert_invariant(&ledger, p.id).await;
        assert!(ledger.get(p.id).await.unwrap().voters.is_empty());

        // Stale belief (u1 no longer in the voter set): benign no-op
        assert_eq!(ledger.toggle_vote(p.id, u1, true).await.unwrap(), 0);
        assert_invariant(&ledger, p.id).await;
    }

    #[tokio::test]
    async fn test_duplicate_cast_is_noop() {
        let ledger = ledger();
        let p = ledger.create("Bus shelter".into(), "Two stops".into()).await.unwrap();
        let u = Uuid::new_v4();

        assert_eq!(ledger.toggle_vote(p.id, u, false).await.unwrap(), 1);
        // Double-click: believes it has not voted, but it has
        assert_eq!(ledger.toggle_vote(p.id, u, false).await.unwrap(), 1);

        let proposal = ledger.get(p.id).await.unwrap();
        assert_eq!(proposal.vote_count, 1);
        assert_eq!(proposal.voters.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_proposal_rejects_votes_without_mutation() {
        let ledger = ledger();
        let p = ledger.create("Footbridge".into(), "Canal crossing".into()).await.unwrap();
        let u1 = Uuid::new_v4();
        ledger.toggle_vote(p.id, u1, false).await.unwrap();

        ledger.close(p.id).await.unwrap();

        let u2 = Uuid::new_v4();
        let err = ledger.toggle_vote(p.id, u2, false).await.unwrap_err();
        assert!(matches!(err, AppError::VotingClosed(_)));

        // Withdrawal is rejected too; frozen state is untouched
        let err = ledger.toggle_vote(p.id, u1, true).await.unwrap_err();
        assert!(matches!(err, AppError::VotingClosed(_)));

        let proposal = ledger.get(p.id).await.unwrap();
        assert_eq!(proposal.vote_count, 1);
        assert!(proposal.voters.contains(&u1));
    }

    #[tokio::test]
    async fn test_unknown_proposal_is_not_found() {
        let ledger = ledger();
        let err = ledger
            .toggle_vote(Uuid::new_v4(), Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_nil_voter_is_unauthenticated() {
        let ledger = ledger();
        let p = ledger.create("Clinic".into(), "Evening hours".into()).await.unwrap();
        let err = ledger.toggle_vote(p.id, Uuid::nil(), false).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_many_voters_keep_invariant() {
        let ledger = ledger();
        let p = ledger.create("Market".into(), "Vendor stalls".into()).await.unwrap();

        let voters: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();
        for (i, v) in voters.iter().enumerate() {
            let count = ledger.toggle_vote(p.id, *v, false).await.unwrap();
            assert_eq!(count, i as i64 + 1);
        }
        // Half withdraw
        for v in voters.iter().step_by(2) {
            ledger.toggle_vote(p.id, *v, true).await.unwrap();
        }

        let proposal = ledger.get(p.id).await.unwrap();
        assert_eq!(proposal.vote_count, 10);
        assert_eq!(proposal.voters.len(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_casts_one_wins() {
        let ledger = Arc::new(ledger());
        let p = ledger.create("Playground".into(), "Swings".into()).await.unwrap();
        let u = Uuid::new_v4();

        // Same user, same believed state, concurrently (a double-click race).
        // Exactly one cast lands; the loser re-reads, sees the mismatch and
        // no-ops with the post-state count.
        let a = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.toggle_vote(p.id, u, false).await })
        };
        let b = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.toggle_vote(p.id, u, false).await })
        };

        let (ra, rb) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(ra, 1);
        assert_eq!(rb, 1);

        let proposal = ledger.get(p.id).await.unwrap();
        assert_eq!(proposal.vote_count, 1);
        assert_eq!(proposal.voters.len(), 1);
        assert!(proposal.voters.contains(&u));
    }

    #[tokio::test]
    async fn test_distinct_proposals_are_independent() {
        let ledger = Arc::new(ledger());
        let p1 = ledger.create("Well".into(), "Borewell".into()).await.unwrap();
        let p2 = ledger.create("Ramp".into(), "Accessibility ramp".into()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            {
                let ledger = Arc::clone(&ledger);
                handles.push(tokio::spawn(async move {
                    ledger.toggle_vote(p1.id, Uuid::new_v4(), false).await
                }));
            }
            {
                let ledger = Arc::clone(&ledger);
                handles.push(tokio::spawn(async move {
                    ledger.toggle_vote(p2.id, Uuid::new_v4(), false).await
                }));
            }
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        for id in [p1.id, p2.id] {
            let proposal = ledger.get(id).await.unwrap();
            assert_eq!(proposal.vote_count, 10);
            assert_eq!(proposal.voters.len(), 10);
        }
    }

    #[tokio::test]
    async fn test_ballot_marks_viewer_votes() {
        let ledger = ledger();
        let p1 = ledger.create("A".into(), "a".into()).await.unwrap();
        let _p2 = ledger.create("B".into(), "b".into()).await.unwrap();
        let u = Uuid::new_v4();
        ledger.toggle_vote(p1.id, u, false).await.unwrap();

        let ballot = ledger.ballot(Some(u)).await.unwrap();
        assert_eq!(ballot.len(), 2);
        for entry in &ballot {
            assert_eq!(entry.has_voted, entry.id == p1.id);
        }

        // Anonymous viewers never see a vote marked
        let anon = ledger.ballot(None).await.unwrap();
        assert!(anon.iter().all(|e| !e.has_voted));
    }

    /// Store whose commits always lose the swap, to drive the retry cap
    struct AlwaysConflicting(MemoryBudgetStore);

    impl BudgetStore for AlwaysConflicting {
        async fn create(&self, p: BudgetProposal) -> Result<BudgetProposal, AppError> {
            self.0.create(p).await
        }
        async fn fetch(&self, id: Uuid) -> Result<Option<BudgetSnapshot>, AppError> {
            self.0.fetch(id).await
        }
        async fn list(&self) -> Result<Vec<BudgetSnapshot>, AppError> {
            self.0.list().await
        }
        async fn commit_vote(
            &self,
            _id: Uuid,
            _expected_version: i64,
            _voter: Uuid,
            _op: VoteOp,
            _new_count: i64,
        ) -> Result<bool, AppError> {
            Ok(false)
        }
        async fn close(&self, id: Uuid) -> Result<bool, AppError> {
            self.0.close(id).await
        }
        async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_contention() {
        let ledger = VoteLedger::new(AlwaysConflicting(MemoryBudgetStore::new()));
        let p = ledger.create("Hot".into(), "Popular proposal".into()).await.unwrap();

        let err = ledger
            .toggle_vote(p.id, Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Contention(_)));
    }

    #[tokio::test]
    async fn test_delete_then_toggle_is_not_found() {
        let ledger = ledger();
        let p = ledger.create("Gone".into(), "To be removed".into()).await.unwrap();
        ledger.delete(p.id).await.unwrap();

        let err = ledger
            .toggle_vote(p.id, Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(ledger.close(p.id).await.unwrap_err(), AppError::NotFound(_)));
    }
}
