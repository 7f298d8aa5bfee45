//! Network context — single source of truth for which network the client
//! targets.
//!
//! Switching networks commits the new identifier first, then notifies
//! subscribers synchronously, so a subscriber that immediately issues a query
//! already reads the new partition. Cache entries written under the previous
//! network are partitioned away, not deleted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::{NetworkSettings, SyncConfig};
use crate::error::SyncError;

/// Identifier of a target network (e.g. `mainnet`, `testnet`). Validated
/// against the configured set before a switch is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type NetworkListener = Arc<dyn Fn(&NetworkId) + Send + Sync>;

pub struct NetworkContext {
    current: RwLock<NetworkId>,
    networks: HashMap<NetworkId, NetworkSettings>,
    listeners: Mutex<Vec<NetworkListener>>,
}

impl NetworkContext {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let networks: HashMap<NetworkId, NetworkSettings> = config
            .networks
            .iter()
            .map(|(id, settings)| (NetworkId::new(id.clone()), settings.clone()))
            .collect();

        let default = NetworkId::new(config.default_network.clone());
        if !networks.contains_key(&default) {
            return Err(SyncError::Validation(format!(
                "default network '{}' is not configured",
                default
            )));
        }

        Ok(Self {
            current: RwLock::new(default),
            networks,
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// The active network id.
    pub fn current(&self) -> NetworkId {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn settings(&self, id: &NetworkId) -> Option<&NetworkSettings> {
        self.networks.get(id)
    }

    pub fn is_known(&self, id: &NetworkId) -> bool {
        self.networks.contains_key(id)
    }

    pub fn known_networks(&self) -> Vec<NetworkId> {
        self.networks.keys().cloned().collect()
    }

    /// Switch the active network. Returns `Ok(false)` when `id` is already
    /// active (no-op, no notification). An unrecognized id fails validation
    /// and leaves state unchanged. Listeners run synchronously after the
    /// switch is committed.
    pub fn set_network(&self, id: NetworkId) -> Result<bool, SyncError> {
        if !self.networks.contains_key(&id) {
            return Err(SyncError::Validation(format!(
                "unrecognized network '{}'",
                id
            )));
        }

        {
            let mut current = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if *current == id {
                return Ok(false);
            }
            tracing::info!(from = %current, to = %id, "Switching network context");
            *current = id.clone();
        }

        // Commit before notify: the write lock is released, so a listener
        // observing a query already sees the new network. Listeners run on a
        // snapshot of the list, with the mutex released, so one may call
        // `subscribe` re-entrantly.
        let snapshot: Vec<NetworkListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in &snapshot {
            listener(&id);
        }

        Ok(true)
    }

    pub fn subscribe(&self, listener: impl Fn(&NetworkId) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(listener));
    }
}

impl fmt::Debug for NetworkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkContext")
            .field("current", &self.current())
            .field("networks", &self.networks.keys().collect::<Vec<_>>())
            .finish()
    }
}
