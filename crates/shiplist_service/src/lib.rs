//! External plumbing around the reconciliation engine: forum API client,
//! LLM extraction collaborator, webhook listener and backfill pipeline.

pub mod backfill;
pub mod config;
pub mod discourse;
pub mod extract;
pub mod signature;
pub mod webhook;

pub use backfill::{run_backfill, BackfillError, BackfillOptions, BackfillReport};
pub use config::{Config, ConfigError};
pub use discourse::{DiscourseClient, DiscourseError, WikiDirectoryStore};
pub use extract::{ExtractError, ExtractionClient, MemberPost};
pub use webhook::{run_webhook_listener, ServeError};
