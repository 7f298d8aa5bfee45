//! Remote graph surface — the structured query protocol the sync layer
//! consumes.
//!
//! `RemoteGraph` is the trait seam; `HttpGraphClient` is the JSON-over-HTTP
//! implementation against the graph API. Every operation is an idempotent,
//! side-effect-free read. Wire shapes are validated and converted to internal
//! types at this boundary, so everything entering the cache is well-typed
//! regardless of wire format drift. The client never retries — the publish
//! queue is the only retrying component.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{Atom, AtomType, Triple, Vault};
use crate::network::NetworkId;

/// An atom candidate with the confidence the producing strategy assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAtom {
    pub atom: Atom,
    pub score: f32,
}

#[async_trait]
pub trait RemoteGraph: Send + Sync {
    async fn fetch_atom(&self, network: &NetworkId, id: &str)
        -> Result<Option<Atom>, SyncError>;

    async fn fetch_triple(
        &self,
        network: &NetworkId,
        id: &str,
    ) -> Result<Option<Triple>, SyncError>;

    async fn fetch_vault(
        &self,
        network: &NetworkId,
        id: &str,
    ) -> Result<Option<Vault>, SyncError>;

    /// Literal/partial label match with per-hit confidence.
    async fn search_atoms_by_label(
        &self,
        network: &NetworkId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError>;

    /// Semantic similarity over atom embeddings with per-hit confidence.
    async fn search_atoms_semantic(
        &self,
        network: &NetworkId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError>;

    /// Look up a triple by its exact (subject, predicate, object) id tuple.
    async fn find_triple(
        &self,
        network: &NetworkId,
        subject_id: &str,
        predicate_id: &str,
        object_id: &str,
    ) -> Result<Option<Triple>, SyncError>;
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct AtomWire {
    id: String,
    vault_id: String,
    label: String,
    emoji: Option<String>,
    image: Option<String>,
    atom_type: AtomType,
    creator: String,
    created_at: DateTime<Utc>,
}

impl AtomWire {
    fn into_atom(self) -> Result<Atom, SyncError> {
        if self.id.is_empty() {
            return Err(SyncError::Validation(
                "remote returned an atom with an empty id".to_string(),
            ));
        }
        Ok(Atom {
            id: self.id,
            vault_id: self.vault_id,
            label: self.label,
            emoji: self.emoji,
            image: self.image,
            atom_type: self.atom_type,
            creator: self.creator,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TripleWire {
    id: String,
    subject_id: String,
    subject_label: String,
    predicate_id: String,
    predicate_label: String,
    object_id: String,
    object_label: String,
    vault_id: String,
    counter_vault_id: Option<String>,
    creator: String,
    created_at: DateTime<Utc>,
}

impl TripleWire {
    fn into_triple(self) -> Result<Triple, SyncError> {
        if self.id.is_empty() || self.subject_id.is_empty() {
            return Err(SyncError::Validation(
                "remote returned a malformed triple".to_string(),
            ));
        }
        Ok(Triple {
            id: self.id,
            subject_id: self.subject_id,
            subject_label: self.subject_label,
            predicate_id: self.predicate_id,
            predicate_label: self.predicate_label,
            object_id: self.object_id,
            object_label: self.object_label,
            vault_id: self.vault_id,
            counter_vault_id: self.counter_vault_id,
            creator: self.creator,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VaultWire {
    id: String,
    total_shares: f64,
    share_price: f64,
    position_count: u32,
}

impl VaultWire {
    fn into_vault(self) -> Result<Vault, SyncError> {
        if self.total_shares < 0.0 || self.share_price < 0.0 {
            return Err(SyncError::Validation(
                "remote returned a vault with negative economics".to_string(),
            ));
        }
        Ok(Vault {
            id: self.id,
            total_shares: self.total_shares,
            share_price: self.share_price,
            position_count: self.position_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchHitWire {
    atom: AtomWire,
    score: f32,
}

#[derive(Debug, Deserialize)]
struct SearchResponseWire {
    results: Vec<SearchHitWire>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: String,
    message: String,
}

// ============================================================================
// HttpGraphClient
// ============================================================================

/// JSON HTTP client for the graph API, one base URL per network.
#[derive(Debug, Clone)]
pub struct HttpGraphClient {
    client: Client,
    endpoints: HashMap<NetworkId, String>,
}

impl HttpGraphClient {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let endpoints = config
            .networks
            .iter()
            .map(|(id, settings)| (NetworkId::new(id.clone()), settings.endpoint.clone()))
            .collect();
        Self::with_endpoints(
            endpoints,
            Duration::from_secs(config.queue.request_timeout_secs),
        )
    }

    /// Build a client over explicit endpoints (used by tests to point a
    /// network at a mock server).
    pub fn with_endpoints(
        endpoints: HashMap<NetworkId, String>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self { client, endpoints })
    }

    fn endpoint(&self, network: &NetworkId) -> Result<&str, SyncError> {
        self.endpoints
            .get(network)
            .map(String::as_str)
            .ok_or_else(|| {
                SyncError::Validation(format!("no endpoint configured for network '{}'", network))
            })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        params: &[(&str, &str)],
    ) -> Result<Option<T>, SyncError> {
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let payload = response
            .json::<T>()
            .await
            .map_err(|e| SyncError::Validation(format!("malformed response body: {}", e)))?;
        Ok(Some(payload))
    }
}

/// Map a transport-level failure. Timeouts are indistinguishable from network
/// failures for retry purposes.
fn map_transport_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Network("request timed out".to_string())
    } else {
        SyncError::Network(e.to_string())
    }
}

/// Convert a non-success HTTP status into the matching taxonomy class.
async fn check_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_ms = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs * 1000);
        return Err(SyncError::RateLimit { retry_after_ms });
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .and_then(|e| e.error);

    let message = detail
        .as_ref()
        .map(|d| format!("{}: {}", d.code, d.message))
        .unwrap_or_else(|| format!("HTTP {}", status));

    if status.is_client_error() {
        tracing::warn!(status = %status, message = %message, "Graph API rejected request");
        Err(SyncError::Validation(message))
    } else {
        tracing::warn!(status = %status, message = %message, "Graph API server error");
        Err(SyncError::Network(message))
    }
}

#[async_trait]
impl RemoteGraph for HttpGraphClient {
    async fn fetch_atom(
        &self,
        network: &NetworkId,
        id: &str,
    ) -> Result<Option<Atom>, SyncError> {
        let url = format!("{}/atoms/{}", self.endpoint(network)?, id);
        match self.get_json::<AtomWire>(url, &[]).await? {
            Some(wire) => Ok(Some(wire.into_atom()?)),
            None => Ok(None),
        }
    }

    async fn fetch_triple(
        &self,
        network: &NetworkId,
        id: &str,
    ) -> Result<Option<Triple>, SyncError> {
        let url = format!("{}/triples/{}", self.endpoint(network)?, id);
        match self.get_json::<TripleWire>(url, &[]).await? {
            Some(wire) => Ok(Some(wire.into_triple()?)),
            None => Ok(None),
        }
    }

    async fn fetch_vault(
        &self,
        network: &NetworkId,
        id: &str,
    ) -> Result<Option<Vault>, SyncError> {
        let url = format!("{}/vaults/{}", self.endpoint(network)?, id);
        match self.get_json::<VaultWire>(url, &[]).await? {
            Some(wire) => Ok(Some(wire.into_vault()?)),
            None => Ok(None),
        }
    }

    async fn search_atoms_by_label(
        &self,
        network: &NetworkId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError> {
        self.search(network, query, limit, "label").await
    }

    async fn search_atoms_semantic(
        &self,
        network: &NetworkId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredAtom>, SyncError> {
        self.search(network, query, limit, "semantic").await
    }

    async fn find_triple(
        &self,
        network: &NetworkId,
        subject_id: &str,
        predicate_id: &str,
        object_id: &str,
    ) -> Result<Option<Triple>, SyncError> {
        let url = format!("{}/triples/lookup", self.endpoint(network)?);
        let params = [
            ("subject_id", subject_id),
            ("predicate_id", predicate_id),
            ("object_id", object_id),
        ];
        match self.get_json::<TripleWire>(url, &params).await? {
            Some(wire) => Ok(Some(wire.into_triple()?)),
            None => Ok(None),
        }
    }
}

impl HttpGraphClient {
    async fn search(
        &self,
        network: &NetworkId,
        query: &str,
        limit: usize,
        mode: &str,
    ) -> Result<Vec<ScoredAtom>, SyncError> {
        let url = format!("{}/search/atoms", self.endpoint(network)?);
        let limit = limit.to_string();
        let params = [("q", query), ("limit", limit.as_str()), ("mode", mode)];

        let response = self
            .get_json::<SearchResponseWire>(url, &params)
            .await?
            .unwrap_or(SearchResponseWire { results: vec![] });

        let mut hits = Vec::with_capacity(response.results.len());
        for hit in response.results {
            hits.push(ScoredAtom {
                atom: hit.atom.into_atom()?,
                // Confidence is defined on [0, 1]; clamp drifting backends.
                score: hit.score.clamp(0.0, 1.0),
            });
        }
        Ok(hits)
    }
}

// ============================================================================
// TESTS
// ============================================================================
