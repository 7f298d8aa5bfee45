use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subject–predicate–object claim linking three atoms. Immutable once
/// fetched. `counter_vault_id` points at the against-side staking pool when
/// one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub id: String,
    pub subject_id: String,
    pub subject_label: String,
    pub predicate_id: String,
    pub predicate_label: String,
    pub object_id: String,
    pub object_label: String,
    pub vault_id: String,
    pub counter_vault_id: Option<String>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}
