use std::collections::HashMap;
use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_network_id")]
    pub default_network: String,
    #[serde(default = "default_networks")]
    pub networks: HashMap<String, NetworkSettings>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Endpoint and contract addressing for one network.
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkSettings {
    pub endpoint: String,
    pub multivault_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Atoms and triples are immutable once created — long TTL.
    pub atom_ttl_secs: u64,
    /// Vault/position data mutates on-chain — short TTL.
    pub vault_ttl_secs: u64,
    /// Search results — medium TTL.
    pub search_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            atom_ttl_secs: 3600,
            vault_ttl_secs: 30,
            search_ttl_secs: 300,
        }
    }
}

/// TTLs by entity class, owned by the read path rather than the cache itself.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub atom: Duration,
    pub vault: Duration,
    pub search: Duration,
}

impl CacheConfig {
    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            atom: Duration::from_secs(self.atom_ttl_secs),
            vault: Duration::from_secs(self.vault_ttl_secs),
            search: Duration::from_secs(self.search_ttl_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Queries shorter than this return empty without a remote call.
    pub min_query_len: usize,
    /// Candidate pool fetched per strategy before merging.
    pub branch_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            branch_limit: 25,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Timeout for sign and submit calls.
    pub request_timeout_secs: u64,
    /// Timeout for waiting on chain confirmation.
    pub confirmation_timeout_secs: u64,
    /// Processor idle poll interval (backoff gates and inactive networks).
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            request_timeout_secs: 30,
            confirmation_timeout_secs: 120,
            poll_interval_ms: 200,
        }
    }
}

fn default_network_id() -> String {
    "mainnet".to_string()
}

fn default_networks() -> HashMap<String, NetworkSettings> {
    let mut networks = HashMap::new();
    networks.insert(
        "mainnet".to_string(),
        NetworkSettings {
            endpoint: "https://api.trivium.network/v1".to_string(),
            multivault_address: "0x430BbF52503Bd4801E51182f4cB9f8F534225DE5".to_string(),
        },
    );
    networks.insert(
        "testnet".to_string(),
        NetworkSettings {
            endpoint: "https://api.testnet.trivium.network/v1".to_string(),
            multivault_address: "0x1A6950807E33d5bC9975067e6D6b5Ea4cD661665".to_string(),
        },
    );
    networks
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_network: default_network_id(),
            networks: default_networks(),
            cache: CacheConfig::default(),
            search: SearchConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}
