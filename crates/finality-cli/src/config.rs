//! Configuration for the `finality` binary

use finality_pdo::DEFAULT_MINIMUM_REVIEW_LATENCY_MS;
use serde::{Deserialize, Serialize};

/// Main CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalityConfig {
    /// Ledger location and open policy
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Identities stamped on records
    #[serde(default)]
    pub authority: AuthorityConfig,

    /// Human review gate
    #[serde(default)]
    pub review: ReviewConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-lines ledger file
    #[serde(default = "default_ledger_path")]
    pub path: String,

    /// Refuse to open a ledger whose chain does not verify
    #[serde(default = "default_true")]
    pub verify_on_open: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            verify_on_open: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// The only identity allowed to record settlement/release decisions
    #[serde(default = "default_decision_authority")]
    pub decision_authority: String,

    /// Orchestrating authority for O-PDO composition
    #[serde(default = "default_orchestrator")]
    pub orchestrator: String,

    /// Actor stamped on rejections recorded from the command line
    #[serde(default = "default_recorder_actor")]
    pub recorder_actor: String,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            decision_authority: default_decision_authority(),
            orchestrator: default_orchestrator(),
            recorder_actor: default_recorder_actor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Minimum time between review submission and approval
    #[serde(default = "default_minimum_latency_ms")]
    pub minimum_latency_ms: i64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            minimum_latency_ms: default_minimum_latency_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ledger_path() -> String {
    "finality-ledger.jsonl".to_string()
}

fn default_decision_authority() -> String {
    "settlement-authority".to_string()
}

fn default_orchestrator() -> String {
    "settlement-orchestrator".to_string()
}

fn default_recorder_actor() -> String {
    "finality-cli".to_string()
}

fn default_minimum_latency_ms() -> i64 {
    DEFAULT_MINIMUM_REVIEW_LATENCY_MS
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl FinalityConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `FINALITY_<SECTION>__<KEY>` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&FinalityConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FINALITY")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
