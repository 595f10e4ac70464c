//! Canonical directory document grammar.
//!
//! # Responsibility
//! - Parse the serialized directory text into the record model.
//! - Render the record model back into byte-stable canonical text.
//!
//! # Invariants
//! - Everything the parser recognizes round-trips losslessly through the
//!   renderer.
//! - The table header/separator literals below are the wire contract
//!   between both sides.

pub mod parse;
pub mod render;

/// Literal table header row shared by parser and renderer.
pub(crate) const TABLE_HEADER_ROW: &str = "| Project | Member | Description | Links |";
/// Literal table separator row shared by parser and renderer.
pub(crate) const TABLE_SEPARATOR_ROW: &str = "|---------|--------|-------------|-------|";
