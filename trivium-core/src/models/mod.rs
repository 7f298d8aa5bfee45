pub mod atom;
pub mod claim;
pub mod job;
pub mod triple;
pub mod vault;

pub use atom::{Atom, AtomType};
pub use claim::{AtomReference, ClaimDraft, ClaimStatus, MatchSource, ReferenceKind};
pub use job::{JobStatus, QueueJob, StakeSide};
pub use triple::Triple;
pub use vault::{ConsensusData, Vault};
