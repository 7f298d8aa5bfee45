//! Claim draft state machine: `draft → validating → {exists, new, invalid}`.
//!
//! Structural problems become accumulated draft errors, never program errors.
//! Remote failures during the existence check propagate to the caller and
//! return the draft to `Draft` so it can be re-validated.

use std::sync::Arc;

use crate::error::SyncError;
use crate::graph::CachedGraph;
use crate::models::{AtomReference, ClaimDraft, ClaimStatus, ReferenceKind};
use crate::network::NetworkId;

pub struct ClaimValidator {
    graph: Arc<CachedGraph>,
}

impl ClaimValidator {
    pub fn new(graph: Arc<CachedGraph>) -> Self {
        Self { graph }
    }

    /// Run the draft through validation and return its resulting status.
    ///
    /// A partially filled draft stays in `Draft` untouched. A draft whose
    /// validation completes after a network switch is reset to `Draft`
    /// rather than carrying data resolved against the inactive network.
    /// A remote failure also resets to `Draft` before the error propagates,
    /// so the draft never parks in `Validating`.
    pub async fn validate(&self, draft: &mut ClaimDraft) -> Result<ClaimStatus, SyncError> {
        if !draft.is_complete() {
            return Ok(draft.status);
        }

        let started_on = self.graph.network().current();
        draft.reset();
        draft.status = ClaimStatus::Validating;

        match self.run_checks(draft, &started_on).await {
            Ok(status) => Ok(status),
            Err(e) => {
                draft.reset();
                Err(e)
            }
        }
    }

    async fn run_checks(
        &self,
        draft: &mut ClaimDraft,
        started_on: &NetworkId,
    ) -> Result<ClaimStatus, SyncError> {
        let mut errors = Vec::new();
        if draft.original_text.trim().is_empty() {
            errors.push("claim has no original text".to_string());
        }

        for (slot, reference) in [
            ("subject", &draft.subject),
            ("predicate", &draft.predicate),
            ("object", &draft.object),
        ] {
            if let Some(reference) = reference {
                if let Some(error) = self.check_reference(slot, reference).await? {
                    errors.push(error);
                }
            }
        }

        if self.graph.network().current() != *started_on {
            tracing::info!(network = %started_on, "Discarding claim validation after network switch");
            draft.reset();
            return Ok(draft.status);
        }

        if !errors.is_empty() {
            draft.status = ClaimStatus::Invalid;
            draft.errors = errors;
            return Ok(draft.status);
        }

        // All three slots resolve to existing atoms: the triple may already
        // be on the graph. Any "new" slot means the triple cannot exist yet.
        let ids = [
            draft.subject.as_ref().and_then(AtomReference::existing_id),
            draft.predicate.as_ref().and_then(AtomReference::existing_id),
            draft.object.as_ref().and_then(AtomReference::existing_id),
        ];

        let status = match ids {
            [Some(subject), Some(predicate), Some(object)] => {
                match self.graph.find_triple(subject, predicate, object).await? {
                    Some(triple) => {
                        let consensus = self.graph.consensus(&triple).await?;
                        draft.resolved_triple = Some(triple);
                        draft.consensus = Some(consensus);
                        ClaimStatus::Exists
                    }
                    None => ClaimStatus::New,
                }
            }
            _ => ClaimStatus::New,
        };

        if self.graph.network().current() != *started_on {
            tracing::info!(network = %started_on, "Discarding claim validation after network switch");
            draft.reset();
            return Ok(draft.status);
        }

        draft.status = status;
        Ok(draft.status)
    }

    /// Structural check for one slot. Returns a human-readable error when the
    /// reference is malformed or no longer resolves to an atom.
    async fn check_reference(
        &self,
        slot: &str,
        reference: &AtomReference,
    ) -> Result<Option<String>, SyncError> {
        match &reference.kind {
            ReferenceKind::New { label } => {
                if label.trim().is_empty() {
                    return Ok(Some(format!("{} label is empty", slot)));
                }
            }
            ReferenceKind::Existing { id, .. } => {
                if id.is_empty() {
                    return Ok(Some(format!("{} references an empty atom id", slot)));
                }
                if self.graph.atom(id).await?.is_none() {
                    return Ok(Some(format!(
                        "{} atom '{}' no longer resolves on the graph",
                        slot, id
                    )));
                }
            }
        }
        Ok(None)
    }
}
