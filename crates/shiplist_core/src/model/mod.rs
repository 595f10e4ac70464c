//! Domain model for the community project directory.
//!
//! # Responsibility
//! - Define the canonical record shapes shared by parser, merge and renderer.
//! - Own name normalization and document-safe field sanitization.
//!
//! # Invariants
//! - A (member, normalized-name) pair identifies at most one entry across
//!   the whole directory; the merge engine enforces this.
//! - Fields stored on a `ProjectEntry` are always sanitized for the
//!   pipe-delimited document form.

pub mod record;
