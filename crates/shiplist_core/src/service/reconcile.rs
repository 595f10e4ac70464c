//! Reconciliation cycle service.
//!
//! # Responsibility
//! - Run one read -> parse -> merge -> render -> write cycle over the
//!   durable directory document.
//!
//! # Invariants
//! - The cycle is synchronous and completes in time bounded by input size.
//! - The store write happens only when the merge changed the directory,
//!   so duplicate delivery of the same source reference performs no write.
//! - Callers must serialize cycles against the same document; the
//!   read-modify-write here is not safe under concurrent invocation.

use crate::doc::parse::parse_directory;
use crate::doc::render::render_directory;
use crate::reconcile::merge::{merge_candidates, AddedProject};
use crate::store::{DirectoryStore, StoreError};
use crate::model::record::CandidateRecord;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error surface of one reconciliation cycle.
#[derive(Debug)]
pub enum ReconcileError {
    Store(StoreError),
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for ReconcileError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Result envelope of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Entries created by this cycle, used for changelog replies.
    pub added: Vec<AddedProject>,
    /// Existing entries modified in place.
    pub updated_entries: usize,
    /// Whether a new document revision was written to the store.
    pub wrote: bool,
}

/// Reconciliation service over a directory store implementation.
pub struct ReconcileService<S: DirectoryStore> {
    store: S,
}

impl<S: DirectoryStore> ReconcileService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Runs one reconciliation cycle for an admissible candidate batch.
    ///
    /// # Contract
    /// - An empty batch is a no-op: no store read, no write.
    /// - Candidates below the confidence threshold must have been dropped
    ///   upstream.
    pub fn reconcile(
        &self,
        candidates: &[CandidateRecord],
        source_ref: Option<&str>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if candidates.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        let current = self.store.read()?;
        let mut directory = parse_directory(&current);
        let merge = merge_candidates(&mut directory, candidates, source_ref);

        let wrote = if merge.changed() {
            self.store.write(&render_directory(&directory))?;
            true
        } else {
            false
        };

        info!(
            "event=reconcile_cycle module=service status=ok candidates={} added={} updated={} wrote={}",
            candidates.len(),
            merge.added.len(),
            merge.updated_entries,
            wrote
        );

        Ok(ReconcileOutcome {
            added: merge.added,
            updated_entries: merge.updated_entries,
            wrote,
        })
    }
}
