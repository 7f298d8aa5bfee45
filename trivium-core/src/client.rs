//! Composition root. Wires the network context, cache, read path, search,
//! validation, and publish queue into one handle the host embeds.
//!
//! The host supplies the external capabilities (remote graph surface, wallet,
//! chain client, durable store); everything else is constructed here from
//! configuration.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cache::QueryCache;
use crate::chain::{ChainClient, Wallet};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::graph::CachedGraph;
use crate::models::{ClaimDraft, ClaimStatus, QueueJob, StakeSide};
use crate::network::{NetworkContext, NetworkId};
use crate::queue::PublishQueue;
use crate::remote::RemoteGraph;
use crate::search::{SearchAggregator, SearchResults};
use crate::store::JobStore;
use crate::validator::ClaimValidator;

pub struct SyncClient {
    network: Arc<NetworkContext>,
    cache: Arc<QueryCache>,
    graph: Arc<CachedGraph>,
    search: SearchAggregator,
    validator: ClaimValidator,
    queue: Arc<PublishQueue>,
}

impl SyncClient {
    pub fn new(
        config: SyncConfig,
        remote: Arc<dyn RemoteGraph>,
        wallet: Arc<dyn Wallet>,
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn JobStore>,
    ) -> Result<Self, SyncError> {
        let network = Arc::new(NetworkContext::new(&config)?);
        let cache = Arc::new(QueryCache::new(config.cache.max_entries));
        let graph = Arc::new(CachedGraph::new(
            remote,
            cache.clone(),
            network.clone(),
            config.cache.ttls(),
        ));
        let search = SearchAggregator::new(graph.clone(), config.search.clone());
        let validator = ClaimValidator::new(graph.clone());
        let queue = Arc::new(PublishQueue::new(
            store,
            wallet,
            chain,
            network.clone(),
            config.queue.clone(),
        ));

        Ok(Self {
            network,
            cache,
            graph,
            search,
            validator,
            queue,
        })
    }

    /// Reload persisted queue state. Call once at startup, before
    /// [`spawn_processor`](Self::spawn_processor).
    pub async fn restore(&self) -> Result<usize, SyncError> {
        self.queue.restore().await
    }

    /// Start the single queue processor task. Send on the returned channel
    /// (or drop it) to stop the processor.
    pub fn spawn_processor(&self) -> (JoinHandle<()>, broadcast::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let queue = self.queue.clone();
        let handle = tokio::spawn(async move {
            queue.run(shutdown_rx).await;
        });
        (handle, shutdown_tx)
    }

    /// Switch the active network. Reads issued after this call resolve
    /// against the new network's cache partition and endpoint.
    pub fn set_network(&self, id: NetworkId) -> Result<bool, SyncError> {
        self.network.set_network(id)
    }

    pub fn current_network(&self) -> NetworkId {
        self.network.current()
    }

    pub fn known_networks(&self) -> Vec<NetworkId> {
        self.network.known_networks()
    }

    /// Dual-strategy atom search, merged and ranked.
    pub async fn search(&self, query: &str, limit: usize) -> SearchResults {
        self.search.search(query, limit).await
    }

    /// Validate a draft in place and return its resulting status.
    pub async fn validate(&self, draft: &mut ClaimDraft) -> Result<ClaimStatus, SyncError> {
        self.validator.validate(draft).await
    }

    /// Hand a validated draft to the publish queue.
    pub async fn publish(
        &self,
        draft: &ClaimDraft,
        stake: u128,
        side: StakeSide,
    ) -> Result<Uuid, SyncError> {
        self.queue.enqueue(draft, stake, side).await
    }

    pub async fn jobs(&self) -> Vec<QueueJob> {
        self.queue.jobs().await
    }

    pub async fn job(&self, id: Uuid) -> Option<QueueJob> {
        self.queue.job(id).await
    }

    pub async fn retry_job(&self, id: Uuid) -> Result<(), SyncError> {
        self.queue.retry(id).await
    }

    pub async fn dismiss_job(&self, id: Uuid) -> Result<(), SyncError> {
        self.queue.dismiss(id).await
    }

    /// Cached read path, for hosts that fetch atoms/triples/vaults directly.
    pub fn graph(&self) -> &Arc<CachedGraph> {
        &self.graph
    }

    /// Drop every cached entry across all network partitions.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
