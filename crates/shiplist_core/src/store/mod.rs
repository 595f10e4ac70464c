//! Directory store contract.
//!
//! # Responsibility
//! - Define the narrow seam to the externally owned durable document.
//!
//! # Invariants
//! - The engine holds no persistent state; the store is the single source
//!   of truth between reconciliation cycles.
//! - Implementations address one stable external document.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surface of a directory store implementation.
#[derive(Debug)]
pub enum StoreError {
    /// Transport failure: the backing service could not be reached.
    Unavailable(String),
    /// The backing service answered, but outside the expected protocol.
    Protocol(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "directory store unavailable: {message}"),
            Self::Protocol(message) => write!(f, "directory store protocol error: {message}"),
        }
    }
}

impl Error for StoreError {}

/// Read/write access to the serialized directory document.
pub trait DirectoryStore {
    /// Reads the full current document text.
    fn read(&self) -> StoreResult<String>;
    /// Replaces the full document text.
    fn write(&self, text: &str) -> StoreResult<()>;
}

impl<S: DirectoryStore + ?Sized> DirectoryStore for &S {
    fn read(&self) -> StoreResult<String> {
        (**self).read()
    }

    fn write(&self, text: &str) -> StoreResult<()> {
        (**self).write(text)
    }
}
