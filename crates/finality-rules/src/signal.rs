use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == normalized)
                    .ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }
    };
}

named_enum!(
    /// Classification of an incoming signal.
    Signal {
        Informational => "INFORMATIONAL",
        Advisory => "ADVISORY",
        Failure => "FAILURE",
        HumanApproved => "HUMAN_APPROVED",
        Authoritative => "AUTHORITATIVE",
    }
);

named_enum!(
    /// Where a signal is trying to go.
    Destination {
        Logging => "LOGGING",
        Monitoring => "MONITORING",
        ReviewQueue => "REVIEW_QUEUE",
        Escalation => "ESCALATION",
        AuthorityGrant => "AUTHORITY_GRANT",
        Settlement => "SETTLEMENT",
        Release => "RELEASE",
        Closure => "CLOSURE",
    }
);

named_enum!(
    /// System layers a signal may cross between.
    Layer {
        Telemetry => "TELEMETRY",
        Advisory => "ADVISORY",
        Governance => "GOVERNANCE",
        Execution => "EXECUTION",
        Settlement => "SETTLEMENT",
    }
);

/// Authority carried by a signal. Ordered: combining signals can only move
/// down this scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    Observational,
    Advisory,
    HumanApproved,
    Authoritative,
}

impl Signal {
    pub fn authority(self) -> AuthorityLevel {
        match self {
            Self::Informational => AuthorityLevel::Observational,
            // A failure can stop things but never grant anything.
            Self::Advisory | Self::Failure => AuthorityLevel::Advisory,
            Self::HumanApproved => AuthorityLevel::HumanApproved,
            Self::Authoritative => AuthorityLevel::Authoritative,
        }
    }
}

impl Destination {
    /// Destinations that grant authority or move value.
    pub fn grants_authority(self) -> bool {
        matches!(
            self,
            Self::AuthorityGrant | Self::Settlement | Self::Release | Self::Closure
        )
    }
}

impl Layer {
    pub fn is_authority_layer(self) -> bool {
        matches!(self, Self::Execution | Self::Settlement)
    }
}
