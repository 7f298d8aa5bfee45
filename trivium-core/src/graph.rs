//! Cached read path over the remote graph.
//!
//! `CachedGraph` routes every remote query through the `QueryCache` under a
//! key derived from the network that was active when the call started. A
//! network switch mid-flight therefore writes the late result into the old
//! partition, which the active context no longer reads.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{QueryCache, QueryKey};
use crate::config::CacheTtls;
use crate::error::SyncError;
use crate::models::{Atom, ConsensusData, Triple, Vault};
use crate::network::NetworkContext;
use crate::remote::{RemoteGraph, ScoredAtom};

pub struct CachedGraph {
    remote: Arc<dyn RemoteGraph>,
    cache: Arc<QueryCache>,
    network: Arc<NetworkContext>,
    ttls: CacheTtls,
}

impl CachedGraph {
    pub fn new(
        remote: Arc<dyn RemoteGraph>,
        cache: Arc<QueryCache>,
        network: Arc<NetworkContext>,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            remote,
            cache,
            network,
            ttls,
        }
    }

    pub fn network(&self) -> &Arc<NetworkContext> {
        &self.network
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn atom(&self, id: &str) -> Result<Option<Atom>, SyncError> {
        let network = self.network.current();
        let key = QueryKey::new(network.clone(), "atom", id);
        self.read_through(key, self.ttls.atom, || {
            let remote = self.remote.clone();
            let id = id.to_string();
            async move { remote.fetch_atom(&network, &id).await }
        })
        .await
    }

    pub async fn triple(&self, id: &str) -> Result<Option<Triple>, SyncError> {
        let network = self.network.current();
        let key = QueryKey::new(network.clone(), "triple", id);
        self.read_through(key, self.ttls.atom, || {
            let remote = self.remote.clone();
            let id = id.to_string();
            async move { remote.fetch_triple(&network, &id).await }
        })
        .await
    }

    pub async fn vault(&self, id: &str) -> Result<Option<Vault>, SyncError> {
        let network = self.network.current();
        let key = QueryKey::new(network.clone(), "vault", id);
        self.read_through(key, self.ttls.vault, || {
            let remote = self.remote.clone();
            let id = id.to_string();
            async move { remote.fetch_vault(&network, &id).await }
        })
        .await
    }

    pub async fn search_label(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError> {
        let network = self.network.current();
        let key = QueryKey::new(network.clone(), "search_label", (query, limit));
        self.read_through(key, self.ttls.search, || {
            let remote = self.remote.clone();
            let query = query.to_string();
            async move { remote.search_atoms_by_label(&network, &query, limit).await }
        })
        .await
    }

    pub async fn search_semantic(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError> {
        let network = self.network.current();
        let key = QueryKey::new(network.clone(), "search_semantic", (query, limit));
        self.read_through(key, self.ttls.search, || {
            let remote = self.remote.clone();
            let query = query.to_string();
            async move { remote.search_atoms_semantic(&network, &query, limit).await }
        })
        .await
    }

    pub async fn find_triple(
        &self,
        subject_id: &str,
        predicate_id: &str,
        object_id: &str,
    ) -> Result<Option<Triple>, SyncError> {
        let network = self.network.current();
        let key = QueryKey::new(
            network.clone(),
            "find_triple",
            (subject_id, predicate_id, object_id),
        );
        self.read_through(key, self.ttls.search, || {
            let remote = self.remote.clone();
            let (s, p, o) = (
                subject_id.to_string(),
                predicate_id.to_string(),
                object_id.to_string(),
            );
            async move { remote.find_triple(&network, &s, &p, &o).await }
        })
        .await
    }

    /// For/against consensus for a triple, recomputed from (cached) vault
    /// state on every call.
    pub async fn consensus(&self, triple: &Triple) -> Result<ConsensusData, SyncError> {
        let for_vault = self.vault(&triple.vault_id).await?.ok_or_else(|| {
            SyncError::Validation(format!(
                "vault '{}' for triple '{}' not found",
                triple.vault_id, triple.id
            ))
        })?;

        let against_vault = match &triple.counter_vault_id {
            Some(id) => self.vault(id).await?,
            None => None,
        };

        Ok(ConsensusData::from_vaults(for_vault, against_vault))
    }

    async fn read_through<T, F, Fut>(
        &self,
        key: QueryKey,
        ttl: Duration,
        fetch: F,
    ) -> Result<T, SyncError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        if let Some(hit) = self.cache.get::<T>(&key) {
            tracing::debug!(operation = key.operation, network = %key.network, "Cache hit");
            return Ok(hit);
        }
        let value = fetch().await?;
        self.cache.insert(key, value.clone(), ttl);
        Ok(value)
    }
}
