pub mod cache;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod network;
pub mod queue;
pub mod remote;
pub mod search;
pub mod store;
pub mod validator;

pub use cache::{QueryCache, QueryKey};
pub use chain::{ChainClient, Receipt, SignedTx, TermSpec, TxId, TxIntent, Wallet};
pub use client::SyncClient;
pub use config::SyncConfig;
pub use error::SyncError;
pub use graph::CachedGraph;
pub use network::{NetworkContext, NetworkId};
pub use queue::PublishQueue;
pub use remote::{HttpGraphClient, RemoteGraph, ScoredAtom};
pub use search::{SearchAggregator, SearchResults};
pub use store::{JobStore, MemoryJobStore};
pub use validator::ClaimValidator;
