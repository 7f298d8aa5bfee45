use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::claim::ClaimDraft;
use crate::network::NetworkId;

/// Which side of a claim the stake backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeSide {
    For,
    Against,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InFlight,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// A persisted unit of publish work. Created on enqueue, mutated only by the
/// queue processor, removed only after reaching a terminal status and being
/// dismissed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueJob {
    pub id: Uuid,
    /// Network the job targets. Fixed at enqueue time; a later network switch
    /// never relabels queued jobs.
    pub network: NetworkId,
    pub draft: ClaimDraft,
    /// Stake amount in the asset's smallest unit.
    pub stake: u128,
    pub side: StakeSide,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub tx_id: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    /// Backoff gate — the processor skips the job until this instant.
    pub not_before: Option<DateTime<Utc>>,
}

impl QueueJob {
    pub fn new(network: NetworkId, draft: ClaimDraft, stake: u128, side: StakeSide) -> Self {
        Self {
            id: Uuid::new_v4(),
            network,
            draft,
            stake,
            side,
            status: JobStatus::Queued,
            attempts: 0,
            last_error: None,
            tx_id: None,
            enqueued_at: Utc::now(),
            not_before: None,
        }
    }

    /// Logical identity of the submission: claim terms + stake + side. Two
    /// jobs with equal fingerprints would duplicate on-chain, so the queue
    /// rejects the second while the first is still live.
    pub fn fingerprint(&self) -> String {
        let term = |slot: &Option<crate::models::claim::AtomReference>| {
            slot.as_ref().map(|r| r.term_key()).unwrap_or_default()
        };
        format!(
            "{}|{}|{}|{}|{:?}",
            term(&self.draft.subject),
            term(&self.draft.predicate),
            term(&self.draft.object),
            self.stake,
            self.side
        )
    }

    /// Whether the processor may pick the job up now.
    pub fn is_ready(&self, active: &NetworkId, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Queued
            && self.network == *active
            && self.not_before.map_or(true, |t| t <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::claim::AtomReference;

    fn draft(subject: &str, predicate: &str, object: &str) -> ClaimDraft {
        let mut draft = ClaimDraft::new(format!("{} {} {}", subject, predicate, object));
        draft.set_subject(Some(AtomReference::new_label(subject)));
        draft.set_predicate(Some(AtomReference::new_label(predicate)));
        draft.set_object(Some(AtomReference::new_label(object)));
        draft
    }

    #[test]
    fn test_fingerprint_matches_for_same_claim_stake_side() {
        let network = NetworkId::new("testnet");
        let a = QueueJob::new(network.clone(), draft("a", "is", "b"), 100, StakeSide::For);
        let b = QueueJob::new(network, draft("a", "is", "b"), 100, StakeSide::For);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_differs_on_side_and_stake() {
        let network = NetworkId::new("testnet");
        let base = QueueJob::new(
            network.clone(),
            draft("a", "is", "b"),
            100,
            StakeSide::For,
        );
        let other_side = QueueJob::new(
            network.clone(),
            draft("a", "is", "b"),
            100,
            StakeSide::Against,
        );
        let other_stake =
            QueueJob::new(network, draft("a", "is", "b"), 200, StakeSide::For);
        assert_ne!(base.fingerprint(), other_side.fingerprint());
        assert_ne!(base.fingerprint(), other_stake.fingerprint());
    }

    #[test]
    fn test_ready_respects_network_and_backoff_gate() {
        let testnet = NetworkId::new("testnet");
        let mainnet = NetworkId::new("mainnet");
        let mut job = QueueJob::new(testnet.clone(), draft("a", "is", "b"), 1, StakeSide::For);
        let now = Utc::now();

        assert!(job.is_ready(&testnet, now));
        assert!(!job.is_ready(&mainnet, now));

        job.not_before = Some(now + chrono::Duration::seconds(10));
        assert!(!job.is_ready(&testnet, now));

        job.not_before = Some(now - chrono::Duration::seconds(1));
        assert!(job.is_ready(&testnet, now));
    }
}
