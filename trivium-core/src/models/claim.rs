use serde::{Deserialize, Serialize};

use crate::models::atom::Atom;
use crate::models::triple::Triple;
use crate::models::vault::ConsensusData;

/// Which search strategy produced a candidate reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Label,
    Semantic,
    /// Found by both strategies; ranked with the higher of the two scores.
    Both,
}

/// A candidate term for one slot of a claim: either an atom that already
/// exists on the graph, or a label for one that would be created on publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceKind {
    Existing {
        id: String,
        /// Full atom when the reference has been resolved.
        atom: Option<Atom>,
    },
    New {
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomReference {
    #[serde(flatten)]
    pub kind: ReferenceKind,
    /// Confidence in [0, 1] from whichever strategy produced this candidate.
    pub confidence: f32,
    pub source: MatchSource,
}

impl AtomReference {
    pub fn existing(atom: Atom, confidence: f32, source: MatchSource) -> Self {
        Self {
            kind: ReferenceKind::Existing {
                id: atom.id.clone(),
                atom: Some(atom),
            },
            confidence,
            source,
        }
    }

    pub fn new_label(label: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::New {
                label: label.into(),
            },
            confidence: 1.0,
            source: MatchSource::Label,
        }
    }

    pub fn existing_id(&self) -> Option<&str> {
        match &self.kind {
            ReferenceKind::Existing { id, .. } => Some(id),
            ReferenceKind::New { .. } => None,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self.kind, ReferenceKind::New { .. })
    }

    pub fn label(&self) -> &str {
        match &self.kind {
            ReferenceKind::Existing { atom, id } => {
                atom.as_ref().map(|a| a.label.as_str()).unwrap_or(id)
            }
            ReferenceKind::New { label } => label,
        }
    }

    /// Stable identity of the term for fingerprinting. Existing atoms key on
    /// their graph id; new atoms key on their normalized label.
    pub fn term_key(&self) -> String {
        match &self.kind {
            ReferenceKind::Existing { id, .. } => format!("id:{}", id),
            ReferenceKind::New { label } => format!("new:{}", label.trim().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Draft,
    Validating,
    /// A matching triple already exists on the graph.
    Exists,
    /// Publishable; missing atoms and the triple are created on submission.
    New,
    /// Structurally broken — not publishable until the caller corrects input.
    Invalid,
}

/// A candidate claim being structured for publication. Mutated only by the
/// validator; slot edits reset it to `Draft` and clear stale validation
/// output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimDraft {
    pub original_text: String,
    pub subject: Option<AtomReference>,
    pub predicate: Option<AtomReference>,
    pub object: Option<AtomReference>,
    pub status: ClaimStatus,
    pub resolved_triple: Option<Triple>,
    pub consensus: Option<ConsensusData>,
    pub errors: Vec<String>,
}

impl ClaimDraft {
    pub fn new(original_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            subject: None,
            predicate: None,
            object: None,
            status: ClaimStatus::Draft,
            resolved_triple: None,
            consensus: None,
            errors: Vec::new(),
        }
    }

    pub fn set_subject(&mut self, reference: Option<AtomReference>) {
        self.subject = reference;
        self.reset();
    }

    pub fn set_predicate(&mut self, reference: Option<AtomReference>) {
        self.predicate = reference;
        self.reset();
    }

    pub fn set_object(&mut self, reference: Option<AtomReference>) {
        self.object = reference;
        self.reset();
    }

    /// All three slots filled — eligible to enter validation.
    pub fn is_complete(&self) -> bool {
        self.subject.is_some() && self.predicate.is_some() && self.object.is_some()
    }

    /// `Exists` and `New` drafts may be handed to the publish queue.
    pub fn is_publishable(&self) -> bool {
        matches!(self.status, ClaimStatus::Exists | ClaimStatus::New)
    }

    /// Corrected input restarts the machine at `Draft`.
    pub fn reset(&mut self) {
        self.status = ClaimStatus::Draft;
        self.resolved_triple = None;
        self.consensus = None;
        self.errors.clear();
    }
}
