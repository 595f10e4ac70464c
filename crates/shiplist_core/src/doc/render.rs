//! Directory document renderer.
//!
//! # Responsibility
//! - Emit the canonical markdown document for a `Directory` value.
//!
//! # Invariants
//! - Tier sections render in fixed order; entries sort case-insensitively
//!   by name at render time.
//! - Output is byte-stable for a given directory value and timestamp.
//! - The trailing timestamp line records render time only; the parser
//!   ignores it, so it is excluded from round-trip identity.

use crate::doc::{TABLE_HEADER_ROW, TABLE_SEPARATOR_ROW};
use crate::model::record::{Directory, ProjectEntry, Tier};
use chrono::{DateTime, Utc};

const DOC_TITLE: &str = "# Community Project Directory";
const DOC_INTRO: &str = "A living list of what community members are building. \
This post is a wiki: edit it directly to add or update your projects. \
The list is also updated automatically when you mention projects in your posts.";

/// Renders the canonical document, stamped with the current time.
pub fn render_directory(directory: &Directory) -> String {
    render_directory_at(directory, Utc::now())
}

/// Renders the canonical document with an explicit render timestamp.
///
/// Deterministic: the only varying output for a given directory value is
/// the timestamp trailer.
pub fn render_directory_at(directory: &Directory, rendered_at: DateTime<Utc>) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(DOC_TITLE.to_string());
    lines.push(String::new());
    lines.push(DOC_INTRO.to_string());
    lines.push(String::new());

    for tier in Tier::ALL {
        lines.push(tier.heading().to_string());
        lines.push(tier.blurb().to_string());
        lines.push(String::new());
        lines.push(TABLE_HEADER_ROW.to_string());
        lines.push(TABLE_SEPARATOR_ROW.to_string());
        for entry in sorted_entries(directory.entries(tier)) {
            lines.push(render_row(&entry));
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(format!(
        "*Last automated update: {}*",
        rendered_at.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.push(String::new());

    lines.join("\n")
}

/// Entries sorted by case-insensitively folded name.
///
/// The sort is stable, so equally named entries keep their storage order.
fn sorted_entries(entries: &[ProjectEntry]) -> Vec<ProjectEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|entry| entry.name.to_lowercase());
    sorted
}

fn render_row(entry: &ProjectEntry) -> String {
    format!(
        "| {} | {} | {} | {} |",
        render_name_cell(entry),
        entry.member,
        entry.description,
        entry.links
    )
}

/// Name cell form: markdown link only when the entry has a url.
fn render_name_cell(entry: &ProjectEntry) -> String {
    if entry.url.is_empty() {
        entry.name.clone()
    } else {
        format!("[{}]({})", entry.name, entry.url)
    }
}
