//! Process configuration.
//!
//! # Responsibility
//! - Collect every externally tunable value into one explicit structure,
//!   read from the environment once at startup.
//!
//! # Invariants
//! - Logic code never reads environment variables ad hoc; it receives a
//!   `Config` (or fields of it) by parameter.
//! - Defaults are encoded here and nowhere else.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Candidates below this confidence are dropped before the merge engine.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.70;
/// Webhook timestamps older or newer than this many seconds are rejected.
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: u64 = 300;
const DEFAULT_LISTEN_PORT: u16 = 9100;
const DEFAULT_API_USERNAME: &str = "directory-bot";

/// Error surface of configuration loading.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    Invalid { name: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "required environment variable {name} is not set"),
            Self::Invalid { name, value } => {
                write!(f, "environment variable {name} has invalid value `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Service configuration, loaded once from the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the forum, without trailing slash.
    pub forum_url: String,
    /// Forum API key.
    pub forum_api_key: String,
    /// Forum API username the service acts as.
    pub forum_api_username: String,
    /// Shared webhook signing secret. Empty disables verification.
    pub webhook_secret: String,
    /// Post id of the wiki post holding the directory document.
    pub wiki_post_id: u64,
    /// Topic id of the directory topic (changelog replies go here).
    pub wiki_topic_id: u64,
    /// Loopback port the webhook listener binds.
    pub listen_port: u16,
    /// Extraction model API key.
    pub extraction_api_key: String,
    /// Admission threshold for extracted candidates.
    pub confidence_threshold: f64,
    /// Webhook timestamp freshness window in seconds.
    pub signature_tolerance_secs: u64,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// Required: `FORUM_URL`, `FORUM_API_KEY`, `EXTRACTION_API_KEY`,
    /// `WIKI_POST_ID`, `WIKI_TOPIC_ID`. Everything else has a default.
    pub fn from_env() -> Result<Config, ConfigError> {
        Ok(Config {
            forum_url: required("FORUM_URL")?.trim_end_matches('/').to_string(),
            forum_api_key: required("FORUM_API_KEY")?,
            forum_api_username: optional("FORUM_API_USERNAME")
                .unwrap_or_else(|| DEFAULT_API_USERNAME.to_string()),
            webhook_secret: optional("WEBHOOK_SECRET").unwrap_or_default(),
            wiki_post_id: parsed("WIKI_POST_ID", required("WIKI_POST_ID")?)?,
            wiki_topic_id: parsed("WIKI_TOPIC_ID", required("WIKI_TOPIC_ID")?)?,
            listen_port: match optional("LISTEN_PORT") {
                Some(value) => parsed("LISTEN_PORT", value)?,
                None => DEFAULT_LISTEN_PORT,
            },
            extraction_api_key: required("EXTRACTION_API_KEY")?,
            confidence_threshold: match optional("CONFIDENCE_THRESHOLD") {
                Some(value) => parsed("CONFIDENCE_THRESHOLD", value)?,
                None => DEFAULT_CONFIDENCE_THRESHOLD,
            },
            signature_tolerance_secs: match optional("SIGNATURE_TOLERANCE_SECS") {
                Some(value) => parsed("SIGNATURE_TOLERANCE_SECS", value)?,
                None => DEFAULT_SIGNATURE_TOLERANCE_SECS,
            },
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
