//! Candidate reconciliation: identity matching and merge.
//!
//! # Responsibility
//! - Decide whether a candidate denotes an already-listed project.
//! - Fold candidate batches into the directory under the merge rules.
//!
//! # Invariants
//! - Matching is tier-agnostic; a match is honored wherever it is found.
//! - Merging the same batch with the same source reference twice leaves
//!   the directory unchanged the second time.

pub mod matcher;
pub mod merge;
