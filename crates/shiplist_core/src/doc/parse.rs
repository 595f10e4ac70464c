//! Directory document parser.
//!
//! # Responsibility
//! - Recover a `Directory` from the canonical markdown document.
//! - Stay lossy-tolerant: the document is human-editable, so content the
//!   grammar does not understand is skipped, never an error.
//!
//! # Invariants
//! - Exactly the three fixed tier headings open a tier section; any other
//!   heading resets the section context, so stray content is never
//!   attributed to a tier.
//! - Rows with a cell count other than four are skipped.
//! - The name cell is the single place project URL state is recovered.

use crate::model::record::{Directory, ProjectEntry, Tier};
use once_cell::sync::Lazy;
use regex::Regex;

static PROJECT_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\(([^)]+)\)$").expect("valid project link regex"));

/// Header literals that mark the first cell of a non-data row.
const HEADER_CELL_LITERALS: [&str; 2] = ["Project", "[Project]"];

/// One classified document line.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    /// Opens one of the three recognized tier sections.
    TierHeading(Tier),
    /// Any other `#`/`##` heading; resets the current section.
    OtherHeading,
    /// A pipe-delimited row with exactly four cells.
    Row([&'a str; 4]),
    /// Everything else: prose, blurbs, decoration, the timestamp trailer.
    Other,
}

/// Parses the full canonical directory text into a `Directory`.
///
/// Never fails: empty or entirely unrecognized input yields an empty
/// directory.
pub fn parse_directory(text: &str) -> Directory {
    let mut directory = Directory::default();
    let mut current_tier: Option<Tier> = None;

    for raw_line in text.lines() {
        match classify_line(raw_line.trim()) {
            Line::TierHeading(tier) => current_tier = Some(tier),
            Line::OtherHeading => current_tier = None,
            Line::Row(cells) => {
                if let Some(tier) = current_tier {
                    if let Some(entry) = entry_from_cells(cells) {
                        directory.entries_mut(tier).push(entry);
                    }
                }
            }
            Line::Other => {}
        }
    }

    directory
}

fn classify_line(line: &str) -> Line<'_> {
    if let Some(tier) = Tier::from_heading(line) {
        return Line::TierHeading(tier);
    }
    if line.starts_with("# ") || line.starts_with("## ") {
        return Line::OtherHeading;
    }
    match tokenize_row(line) {
        Some(cells) => Line::Row(cells),
        None => Line::Other,
    }
}

/// Splits a `| a | b | c | d |` line into its four cells.
///
/// Returns `None` for anything that is not a well-formed four-cell row;
/// sanitized fields cannot contain `|`, so splitting on it is exact.
fn tokenize_row(line: &str) -> Option<[&str; 4]> {
    let interior = line.strip_prefix('|')?.strip_suffix('|')?;
    let mut cells = interior.split('|').map(str::trim);
    let row = [cells.next()?, cells.next()?, cells.next()?, cells.next()?];
    if cells.next().is_some() {
        return None;
    }
    Some(row)
}

/// Builds an entry from a data row, or `None` for header/separator rows
/// and rows missing a name or member.
fn entry_from_cells(cells: [&str; 4]) -> Option<ProjectEntry> {
    let [name_cell, member, description, links] = cells;
    if is_table_decoration(name_cell) || name_cell.is_empty() || member.is_empty() {
        return None;
    }

    let (name, url) = parse_name_cell(name_cell);
    Some(ProjectEntry {
        name,
        url,
        member: member.to_string(),
        description: description.to_string(),
        links: links.to_string(),
    })
}

/// Whether a first cell belongs to the table header or separator row.
fn is_table_decoration(name_cell: &str) -> bool {
    HEADER_CELL_LITERALS.contains(&name_cell)
        || (!name_cell.is_empty() && name_cell.chars().all(|c| c == '-' || c == ':'))
}

/// Splits a name cell into `(name, url)`.
///
/// A markdown-style `[display](url)` link yields both parts; plain text
/// yields an empty url.
fn parse_name_cell(cell: &str) -> (String, String) {
    match PROJECT_LINK_RE.captures(cell) {
        Some(caps) => (caps[1].trim().to_string(), caps[2].trim().to_string()),
        None => (cell.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_directory() {
        assert!(parse_directory("").is_empty());
        assert!(parse_directory("just prose\nno structure").is_empty());
    }

    #[test]
    fn rows_land_in_their_tier_section() {
        let text = "\
# Community Project Directory

## Products & Tools
Projects that are shipped, named, and available for use.

| Project | Member | Description | Links |
|---------|--------|-------------|-------|
| [Foo](https://foo.example) | @alice | A tool | [Post](https://x/t/1/1) |

## Explorations
Early-stage ideas and one-off experiments.

| Project | Member | Description | Links |
|---------|--------|-------------|-------|
| Bar | @bob | An idea |  |
";
        let directory = parse_directory(text);
        assert_eq!(directory.products_and_tools.len(), 1);
        assert_eq!(directory.active_experiments.len(), 0);
        assert_eq!(directory.explorations.len(), 1);

        let foo = &directory.products_and_tools[0];
        assert_eq!(foo.name, "Foo");
        assert_eq!(foo.url, "https://foo.example");
        assert_eq!(foo.member, "@alice");
        assert_eq!(foo.links, "[Post](https://x/t/1/1)");

        let bar = &directory.explorations[0];
        assert_eq!(bar.name, "Bar");
        assert_eq!(bar.url, "");
        assert_eq!(bar.links, "");
    }

    #[test]
    fn unrecognized_heading_resets_section_context() {
        let text = "\
## Explorations

| Project | Member | Description | Links |
|---------|--------|-------------|-------|
| Kept | @alice | Inside the section |  |

## Hall of Fame

| Lost | @alice | After a foreign heading |  |
";
        let directory = parse_directory(text);
        assert_eq!(directory.explorations.len(), 1);
        assert_eq!(directory.explorations[0].name, "Kept");
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn content_before_first_recognized_heading_is_ignored() {
        let text = "\
| Orphan | @alice | No section yet |  |

## Explorations
| Adopted | @alice | Has a section |  |
";
        let directory = parse_directory(text);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.explorations[0].name, "Adopted");
    }

    #[test]
    fn malformed_rows_are_skipped_silently() {
        let text = "\
## Explorations
| Only | three | cells |
| One cell |
| Fine | @alice | Four cells here |  |
| Too | many | cells | in | this |
";
        let directory = parse_directory(text);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.explorations[0].name, "Fine");
    }

    #[test]
    fn rows_without_a_name_or_member_are_skipped() {
        let text = "\
## Explorations
|  |  |  |  |
|  | @alice | Name cell missing |  |
| Nameless Member | | Member cell missing |  |
| Fine | @alice | Complete row |  |
";
        let directory = parse_directory(text);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.explorations[0].name, "Fine");
    }

    #[test]
    fn header_and_separator_rows_are_not_entries() {
        assert!(is_table_decoration("Project"));
        assert!(is_table_decoration("[Project]"));
        assert!(is_table_decoration("---------"));
        assert!(is_table_decoration(":---:"));
        assert!(!is_table_decoration("Dash-Named-App"));
    }

    #[test]
    fn name_cell_distinguishes_plain_and_linked_forms() {
        assert_eq!(
            parse_name_cell("[My App](https://a.example)"),
            ("My App".to_string(), "https://a.example".to_string())
        );
        assert_eq!(parse_name_cell("My App"), ("My App".to_string(), String::new()));
    }
}
