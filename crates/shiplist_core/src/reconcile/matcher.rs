//! Identity matcher.
//!
//! # Responsibility
//! - Decide whether an existing entry and a candidate denote the same
//!   project by the same member.
//!
//! # Invariants
//! - Name identity uses `normalize_name` on both sides.
//! - Member identity strips the leading `@` marker on both sides and is
//!   otherwise case-sensitive.
//! - Tier plays no part: a promoted or demoted entry still matches.

use crate::model::record::{member_key, normalize_name, CandidateRecord, ProjectEntry};

/// True iff `entry` and `candidate` denote the same project by the same
/// member.
pub fn candidate_matches_entry(entry: &ProjectEntry, candidate: &CandidateRecord) -> bool {
    normalize_name(&entry.name) == normalize_name(&candidate.name)
        && member_key(&entry.member) == member_key(&candidate.member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::Tier;

    fn entry(name: &str, member: &str) -> ProjectEntry {
        ProjectEntry {
            name: name.to_string(),
            member: member.to_string(),
            ..ProjectEntry::default()
        }
    }

    fn candidate(name: &str, member: &str) -> CandidateRecord {
        CandidateRecord {
            name: name.to_string(),
            description: String::new(),
            tier: Tier::Explorations,
            confidence: 0.9,
            url: None,
            member: member.to_string(),
            source_refs: Vec::new(),
        }
    }

    #[test]
    fn matches_across_punctuation_and_case_differences() {
        assert!(candidate_matches_entry(
            &entry("my app", "@alice"),
            &candidate("My App!", "alice")
        ));
    }

    #[test]
    fn does_not_match_a_different_member() {
        assert!(!candidate_matches_entry(
            &entry("my app", "@alice"),
            &candidate("My App!", "bob")
        ));
    }

    #[test]
    fn member_handle_comparison_is_case_sensitive() {
        assert!(!candidate_matches_entry(
            &entry("my app", "@Alice"),
            &candidate("my app", "alice")
        ));
    }

    #[test]
    fn marker_presence_does_not_affect_member_identity() {
        assert!(candidate_matches_entry(
            &entry("my app", "alice"),
            &candidate("my app", "@alice")
        ));
    }
}
