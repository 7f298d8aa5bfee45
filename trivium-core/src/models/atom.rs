use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named entity in the knowledge graph. Immutable once fetched — the cache
/// only ever replaces an atom wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: String,
    pub vault_id: String,
    pub label: String,
    pub emoji: Option<String>,
    pub image: Option<String>,
    pub atom_type: AtomType,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

/// Semantic type of an atom. Types the remote surface grows later land on
/// `Unknown` instead of failing boundary conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomType {
    Account,
    Thing,
    Person,
    Organization,
    Book,
    #[serde(other)]
    Unknown,
}
