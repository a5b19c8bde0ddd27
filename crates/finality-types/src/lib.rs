//! Shared foundation types for the governance ledger and finality engine.
//!
//! Everything that more than one component needs to agree on byte-for-byte
//! lives here:
//!
//! - [`ContentHash`]: BLAKE3 digest with hex serde, used for ledger links,
//!   proof chains, Merkle leaves and final hashes.
//! - [`hash_canonical`]: the one canonical serialization + hashing path,
//!   keyed by a [`HashDomain`].
//! - Identifier newtypes ([`ActorId`], [`ArtifactId`], [`PdoId`], [`OpdoId`])
//!   and the injected [`AuthorityIdentity`].
//! - The closed [`Violation`] taxonomy with stable codes and severities.
//!
//! Invariants:
//! - Hashing never depends on the iteration order of an unordered container.
//! - Every violation kind belongs to exactly one [`ViolationFamily`].

pub mod error;
pub mod hash;
pub mod ids;
pub mod violation;

pub use error::{CanonicalError, ContentHashError};
pub use hash::{canonical_bytes, hash_canonical, ContentHash, HashDomain};
pub use ids::{ActorId, ArtifactId, AuthorityIdentity, OpdoId, PdoId};
pub use violation::{
    BoundaryViolation, CryptographicViolation, SequencingViolation, Severity,
    StateMachineViolation, StructuralViolation, Violation, ViolationFamily,
};
