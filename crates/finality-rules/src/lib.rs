//! Boundary/lock rule engine.
//!
//! A pure function family over fixed, versioned tables:
//! - [`check_transition`]: may a signal reach a destination?
//! - [`check_boundary`]: may a signal cross from one layer to another?
//!
//! Invariants:
//! - Unknown pairs are blocked (fail-closed), never allowed by default.
//! - An advisory signal never reaches an authority-granting, settlement,
//!   release or closure destination.
//! - Combining signals yields at most the weakest input's authority
//!   ([`combine`]); advisory input can only lower the result.
//! - No state, no side effects, no logging.

pub mod engine;
pub mod signal;
pub mod table;

pub use engine::{check_boundary, check_combined, check_transition, combine, RuleEngine, Verdict};
pub use signal::{AuthorityLevel, Destination, Layer, Signal};
pub use table::RULE_TABLE_VERSION;
