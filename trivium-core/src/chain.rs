//! Wallet and chain-submission capabilities.
//!
//! Both are external collaborators: the wallet signs a structured transaction
//! intent without ever exposing key material to this crate, and the chain
//! client turns a signed payload into a confirmed transaction. The queue
//! consumes them behind trait seams so hosts and tests supply their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::models::{QueueJob, ReferenceKind, StakeSide};
use crate::network::NetworkId;

/// One term of the claim as the chain sees it: an existing term id, or a
/// label for an atom the transaction creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TermSpec {
    Existing { id: String },
    Create { label: String },
}

/// A structured publish operation, ready for signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxIntent {
    pub network: NetworkId,
    pub subject: TermSpec,
    pub predicate: TermSpec,
    pub object: TermSpec,
    pub stake: u128,
    pub side: StakeSide,
}

impl TxIntent {
    /// Build the intent from a queue job. Fails validation when the draft is
    /// missing a slot — the queue only accepts complete drafts, so this
    /// guards against corrupted persisted state.
    pub fn from_job(job: &QueueJob) -> Result<Self, SyncError> {
        let term = |slot: &Option<crate::models::AtomReference>,
                    name: &str|
         -> Result<TermSpec, SyncError> {
            let reference = slot.as_ref().ok_or_else(|| {
                SyncError::Validation(format!("job {} draft is missing its {}", job.id, name))
            })?;
            Ok(match &reference.kind {
                ReferenceKind::Existing { id, .. } => TermSpec::Existing { id: id.clone() },
                ReferenceKind::New { label } => TermSpec::Create {
                    label: label.clone(),
                },
            })
        };

        Ok(Self {
            network: job.network.clone(),
            subject: term(&job.draft.subject, "subject")?,
            predicate: term(&job.draft.predicate, "predicate")?,
            object: term(&job.draft.object, "object")?,
            stake: job.stake,
            side: job.side,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTx {
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_id: TxId,
    pub success: bool,
    pub block: u64,
}

/// Signing capability. Never exposes the private key; fails with
/// `SyncError::Wallet` when locked, absent, or the password is wrong.
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn sign(&self, intent: &TxIntent) -> Result<SignedTx, SyncError>;
}

/// Chain submission capability.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn submit(&self, tx: &SignedTx) -> Result<TxId, SyncError>;
    async fn await_confirmation(&self, tx_id: &TxId) -> Result<Receipt, SyncError>;
}
