//! Use-case services over the reconciliation engine.
//!
//! # Responsibility
//! - Provide the parse -> merge -> render cycle as one stable entry point.
//!
//! # Invariants
//! - Services never bypass the store contract for document access.

pub mod reconcile;
