use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Empty or whitespace-only identifiers are structurally invalid.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identity of whoever produced a ledger entry (agent, reviewer, component).
    ActorId
);
string_id!(
    /// Identifier of any governed artifact.
    ArtifactId
);
string_id!(PdoId);
string_id!(OpdoId);

impl PdoId {
    pub fn generate() -> Self {
        Self(format!("PDO-{}", Uuid::new_v4().simple()))
    }
}

impl OpdoId {
    pub fn generate() -> Self {
        Self(format!("OPDO-{}", Uuid::new_v4().simple()))
    }
}

impl From<&PdoId> for ArtifactId {
    fn from(id: &PdoId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&OpdoId> for ArtifactId {
    fn from(id: &OpdoId) -> Self {
        Self(id.0.clone())
    }
}

/// The single identity allowed to grant authority.
///
/// Injected from configuration and compared by equality; nothing in the
/// engine hardcodes who the authority is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorityIdentity(ActorId);

impl AuthorityIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(ActorId::new(id))
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.0
    }

    /// True only for an exact match; no prefix or case folding.
    pub fn is(&self, claimed: &ActorId) -> bool {
        &self.0 == claimed
    }
}

impl fmt::Display for AuthorityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = PdoId::generate();
        let b = PdoId::generate();
        assert!(a.as_str().starts_with("PDO-"));
        assert_ne!(a, b);
        assert!(OpdoId::generate().as_str().starts_with("OPDO-"));
    }

    #[test]
    fn blank_detection() {
        assert!(ArtifactId::new("  ").is_blank());
        assert!(!ArtifactId::new("PAC-001").is_blank());
    }

    #[test]
    fn authority_matches_exactly() {
        let authority = AuthorityIdentity::new("authority:cfo");
        assert!(authority.is(&ActorId::new("authority:cfo")));
        assert!(!authority.is(&ActorId::new("authority:CFO")));
        assert!(!authority.is(&ActorId::new("authority:cfo ")));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ActorId::new("agent-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"agent-7\"");
        let authority = AuthorityIdentity::new("root");
        assert_eq!(serde_json::to_string(&authority).unwrap(), "\"root\"");
    }
}
