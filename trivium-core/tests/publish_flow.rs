//! End-to-end publish flow: validate a draft, enqueue it, and let the
//! background processor drive it to a terminal state, including recovery
//! from a simulated restart.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use trivium_core::chain::{ChainClient, Receipt, SignedTx, TxId, TxIntent, Wallet};
use trivium_core::models::{
    Atom, AtomReference, AtomType, ClaimDraft, ClaimStatus, JobStatus, QueueJob, StakeSide, Triple,
    Vault,
};
use trivium_core::network::NetworkId;
use trivium_core::remote::{RemoteGraph, ScoredAtom};
use trivium_core::store::MemoryJobStore;
use trivium_core::{SyncClient, SyncConfig, SyncError};

// ============================================================================
// FIXTURES
// ============================================================================

fn atom(id: &str, label: &str) -> Atom {
    Atom {
        id: id.to_string(),
        vault_id: format!("vault-{}", id),
        label: label.to_string(),
        emoji: None,
        image: None,
        atom_type: AtomType::Thing,
        creator: "0xabc".to_string(),
        created_at: Utc::now(),
    }
}

/// Graph surface serving a fixed set of atoms and no existing triples.
struct FixtureRemote {
    atoms: Vec<Atom>,
}

#[async_trait]
impl RemoteGraph for FixtureRemote {
    async fn fetch_atom(&self, _network: &NetworkId, id: &str) -> Result<Option<Atom>, SyncError> {
        Ok(self.atoms.iter().find(|a| a.id == id).cloned())
    }

    async fn fetch_triple(
        &self,
        _network: &NetworkId,
        _id: &str,
    ) -> Result<Option<Triple>, SyncError> {
        Ok(None)
    }

    async fn fetch_vault(
        &self,
        _network: &NetworkId,
        _id: &str,
    ) -> Result<Option<Vault>, SyncError> {
        Ok(None)
    }

    async fn search_atoms_by_label(
        &self,
        _network: &NetworkId,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError> {
        Ok(self
            .atoms
            .iter()
            .filter(|a| a.label.to_lowercase().contains(&query.to_lowercase()))
            .map(|a| ScoredAtom {
                atom: a.clone(),
                score: 0.9,
            })
            .collect())
    }

    async fn search_atoms_semantic(
        &self,
        _network: &NetworkId,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError> {
        Ok(Vec::new())
    }

    async fn find_triple(
        &self,
        _network: &NetworkId,
        _subject_id: &str,
        _predicate_id: &str,
        _object_id: &str,
    ) -> Result<Option<Triple>, SyncError> {
        Ok(None)
    }
}

struct StubWallet;

#[async_trait]
impl Wallet for StubWallet {
    async fn sign(&self, _intent: &TxIntent) -> Result<SignedTx, SyncError> {
        Ok(SignedTx {
            payload: vec![0x01],
        })
    }
}

/// Chain that confirms every submission and counts them.
#[derive(Default)]
struct CountingChain {
    submissions: AtomicU32,
}

#[async_trait]
impl ChainClient for CountingChain {
    async fn submit(&self, _tx: &SignedTx) -> Result<TxId, SyncError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(TxId(format!("0x{:04x}", n)))
    }

    async fn await_confirmation(&self, tx_id: &TxId) -> Result<Receipt, SyncError> {
        Ok(Receipt {
            tx_id: tx_id.clone(),
            success: true,
            block: 100,
        })
    }
}

fn fast_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.queue.poll_interval_ms = 5;
    config.queue.backoff_base_ms = 1;
    config.queue.backoff_max_ms = 4;
    config
}

fn client_with(store: Arc<MemoryJobStore>, chain: Arc<CountingChain>) -> SyncClient {
    let remote = Arc::new(FixtureRemote {
        atoms: vec![atom("1", "Ethereum"), atom("2", "Blockchain")],
    });
    SyncClient::new(fast_config(), remote, Arc::new(StubWallet), chain, store).unwrap()
}

fn validated_draft(text: &str) -> ClaimDraft {
    let mut draft = ClaimDraft::new(text);
    draft.set_subject(Some(AtomReference::new_label(format!("{} subject", text))));
    draft.set_predicate(Some(AtomReference::new_label("is a")));
    draft.set_object(Some(AtomReference::new_label(format!("{} object", text))));
    draft
}

async fn wait_for_terminal(client: &SyncClient, id: Uuid) -> QueueJob {
    for _ in 0..400 {
        if let Some(job) = client.job(id).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never reached a terminal state", id);
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_validate_then_publish_end_to_end() {
    let store = Arc::new(MemoryJobStore::new());
    let chain = Arc::new(CountingChain::default());
    let client = client_with(store.clone(), chain.clone());
    let (handle, shutdown) = client.spawn_processor();

    // Resolve the subject through search, leave predicate and object as
    // to-be-created atoms.
    let results = client.search("ethereum", 5).await;
    assert!(!results.partial);
    let subject = results.hits.into_iter().next().expect("search hit");
    assert_eq!(subject.existing_id(), Some("1"));

    let mut draft = ClaimDraft::new("Ethereum is a blockchain");
    draft.set_subject(Some(subject));
    draft.set_predicate(Some(AtomReference::new_label("is a")));
    draft.set_object(Some(AtomReference::new_label("Blockchain")));

    let status = client.validate(&mut draft).await.unwrap();
    assert_eq!(status, ClaimStatus::New);

    let id = client.publish(&draft, 1_000, StakeSide::For).await.unwrap();
    let job = wait_for_terminal(&client, id).await;

    assert_eq!(job.status, JobStatus::Succeeded);
    assert!(job.tx_id.is_some());
    assert_eq!(chain.submissions.load(Ordering::SeqCst), 1);

    // Terminal job survives in the durable store until dismissed.
    let persisted = trivium_core::store::JobStore::load(store.as_ref())
        .await
        .unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status, JobStatus::Succeeded);

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_unvalidated_draft_is_rejected_at_publish() {
    let client = client_with(
        Arc::new(MemoryJobStore::new()),
        Arc::new(CountingChain::default()),
    );

    let draft = validated_draft("a"); // complete but never validated
    let result = client.publish(&draft, 10, StakeSide::For).await;
    assert!(matches!(result, Err(SyncError::Validation(_))));
    assert!(client.jobs().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_publish_rejected_while_first_is_live() {
    let store = Arc::new(MemoryJobStore::new());
    let client = client_with(store, Arc::new(CountingChain::default()));

    let mut draft = validated_draft("a");
    client.validate(&mut draft).await.unwrap();

    // No processor running, so the first job stays queued.
    let first = client.publish(&draft, 10, StakeSide::For).await.unwrap();
    let second = client.publish(&draft, 10, StakeSide::For).await;

    match second {
        Err(SyncError::Validation(message)) => {
            assert!(message.contains(&first.to_string()));
        }
        other => panic!("expected duplicate rejection, got {:?}", other),
    }
    assert_eq!(client.jobs().await.len(), 1);
}

#[tokio::test]
async fn test_restart_resumes_queued_and_in_flight_jobs() {
    let store = Arc::new(MemoryJobStore::new());
    let chain = Arc::new(CountingChain::default());

    // First client session: enqueue two jobs, then "crash" with one of them
    // mid-flight (simulated by editing the persisted snapshot directly).
    let first_ids = {
        let client = client_with(store.clone(), chain.clone());
        let mut a = validated_draft("a");
        client.validate(&mut a).await.unwrap();
        let mut b = validated_draft("b");
        client.validate(&mut b).await.unwrap();

        let id_a = client.publish(&a, 10, StakeSide::For).await.unwrap();
        let id_b = client.publish(&b, 10, StakeSide::For).await.unwrap();
        (id_a, id_b)
    };

    {
        use trivium_core::store::JobStore;
        let mut jobs = store.load().await.unwrap();
        jobs[0].status = JobStatus::InFlight;
        store.persist(&jobs).await.unwrap();
    }

    // Second session against the same store.
    let client = client_with(store, chain.clone());
    let restored = client.restore().await.unwrap();
    assert_eq!(restored, 2);
    assert!(client
        .jobs()
        .await
        .iter()
        .all(|j| j.status == JobStatus::Queued));

    let (handle, shutdown) = client.spawn_processor();
    let job_a = wait_for_terminal(&client, first_ids.0).await;
    let job_b = wait_for_terminal(&client, first_ids.1).await;

    assert_eq!(job_a.status, JobStatus::Succeeded);
    assert_eq!(job_b.status, JobStatus::Succeeded);
    // No job lost, none submitted twice.
    assert_eq!(chain.submissions.load(Ordering::SeqCst), 2);

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_network_switch_partitions_reads_and_parks_jobs() {
    let store = Arc::new(MemoryJobStore::new());
    let chain = Arc::new(CountingChain::default());
    let client = client_with(store, chain.clone());

    let mut draft = validated_draft("a");
    client.validate(&mut draft).await.unwrap();
    let id = client.publish(&draft, 10, StakeSide::For).await.unwrap();

    // Job targets mainnet; with testnet active the processor must not
    // touch it.
    client.set_network(NetworkId::new("testnet")).unwrap();
    let (handle, shutdown) = client.spawn_processor();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.job(id).await.unwrap().status, JobStatus::Queued);
    assert_eq!(chain.submissions.load(Ordering::SeqCst), 0);

    // Switching back releases it.
    client.set_network(NetworkId::new("mainnet")).unwrap();
    let job = wait_for_terminal(&client, id).await;
    assert_eq!(job.status, JobStatus::Succeeded);

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}
