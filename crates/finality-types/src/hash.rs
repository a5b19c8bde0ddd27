use crate::error::{CanonicalError, ContentHashError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-addressed hash (BLAKE3, 32 bytes).
///
/// Ordering is bytewise, which matches the lexicographic order of the hex
/// form. Merkle leaf sorting relies on that.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

/// Hashing domains. Each one keys BLAKE3 with its own derive-key context,
/// so a digest produced in one domain never verifies in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashDomain {
    LedgerEntry,
    ProofLink,
    PdoContent,
    ChildLeaf,
    MerkleLeaf,
    MerkleNode,
    FinalHash,
    ReportFingerprint,
}

impl HashDomain {
    pub const ALL: [HashDomain; 8] = [
        HashDomain::LedgerEntry,
        HashDomain::ProofLink,
        HashDomain::PdoContent,
        HashDomain::ChildLeaf,
        HashDomain::MerkleLeaf,
        HashDomain::MerkleNode,
        HashDomain::FinalHash,
        HashDomain::ReportFingerprint,
    ];

    /// Derive-key context string. Changing one invalidates every stored
    /// digest of that domain.
    pub const fn context(self) -> &'static str {
        match self {
            HashDomain::LedgerEntry => "finality ledger entry v1",
            HashDomain::ProofLink => "finality proof link v1",
            HashDomain::PdoContent => "finality pdo content v1",
            HashDomain::ChildLeaf => "finality opdo child v1",
            HashDomain::MerkleLeaf => "finality merkle leaf v1",
            HashDomain::MerkleNode => "finality merkle node v1",
            HashDomain::FinalHash => "finality opdo final v1",
            HashDomain::ReportFingerprint => "finality integrity report v1",
        }
    }
}

impl ContentHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Plain BLAKE3 of arbitrary data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Keyed BLAKE3 over `parts` in `domain`. Parts are fed in order with no
    /// separators, so callers pass fixed-width inputs.
    pub fn derive(domain: HashDomain, parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(domain.context());
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Zero hash, used as the genesis link.
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Leading 12 hex digits, enough to tell records apart in logs.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }

    /// Parse exactly 64 hex digits. Signs, whitespace and any other
    /// non-hex byte are rejected with their offset.
    pub fn from_hex(hex: &str) -> Result<Self, ContentHashError> {
        if hex.len() != 64 {
            return Err(ContentHashError::InvalidLength(hex.len()));
        }
        if let Some(offset) = hex.bytes().position(|b| !b.is_ascii_hexdigit()) {
            return Err(ContentHashError::InvalidHex(offset));
        }
        blake3::Hash::from_hex(hex)
            .map(|h| Self(*h.as_bytes()))
            .map_err(|_| ContentHashError::InvalidHex(0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex: std::borrow::Cow<'de, str> = Deserialize::deserialize(deserializer)?;
        ContentHash::from_hex(&hex).map_err(|err| {
            serde::de::Error::custom(format_args!("content hash {:?}: {}", hex, err))
        })
    }
}

/// Canonical byte form of a value.
///
/// Callers must only feed types whose serialized field order is fixed
/// (structs, enums, `BTreeMap`); `HashMap` is never used in hashed data.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    Ok(serde_json::to_vec(value)?)
}

/// Hash the canonical form of `value` in `domain`.
pub fn hash_canonical<T: Serialize + ?Sized>(
    domain: HashDomain,
    value: &T,
) -> Result<ContentHash, CanonicalError> {
    let bytes = canonical_bytes(value)?;
    Ok(ContentHash::derive(domain, &[&bytes]))
}
