//! Directory reconciliation engine for the community project directory.
//! This crate is the single source of truth for merge invariants.

pub mod doc;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod service;
pub mod store;

pub use doc::parse::parse_directory;
pub use doc::render::{render_directory, render_directory_at};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{
    canonical_member, member_key, normalize_name, sanitize_field, CandidateRecord, Directory,
    ProjectEntry, Tier,
};
pub use reconcile::matcher::candidate_matches_entry;
pub use reconcile::merge::{merge_candidates, AddedProject, MergeOutcome};
pub use service::reconcile::{ReconcileError, ReconcileOutcome, ReconcileService};
pub use store::{DirectoryStore, StoreError, StoreResult};
