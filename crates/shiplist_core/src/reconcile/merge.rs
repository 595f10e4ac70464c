//! Merge engine.
//!
//! # Responsibility
//! - Fold a batch of admissible candidates into an existing directory.
//! - Report which candidates created genuinely new entries.
//!
//! # Invariants
//! - Confidence admission (>= 0.70) is an upstream precondition; the
//!   engine does not re-check it.
//! - An existing entry's tier is never changed by a merge.
//! - A (member, normalized-name) pair resolves to at most one entry
//!   across all tiers; the suggested tier is scanned first, the rest
//!   afterwards, so coverage is total.
//! - Each candidate is processed independently; one candidate cannot
//!   prevent the rest of the batch from merging.

use crate::model::record::{sanitize_field, CandidateRecord, Directory, ProjectEntry, Tier};
use crate::reconcile::matcher::candidate_matches_entry;
use log::debug;

/// A newly created directory entry, reported for changelog purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedProject {
    pub tier: Tier,
    /// Sanitized display name as stored in the directory.
    pub name: String,
    /// Canonical `@handle` member identity.
    pub member: String,
}

/// Result envelope of one merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entries created by this pass, in candidate input order.
    pub added: Vec<AddedProject>,
    /// Number of existing entries modified in place.
    pub updated_entries: usize,
}

impl MergeOutcome {
    /// Whether the pass changed the directory at all.
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || self.updated_entries > 0
    }
}

/// Merges a candidate batch into the directory.
///
/// For each candidate, in input order: find a matching entry anywhere in
/// the directory and update it in place (longer description wins, url
/// backfill, link append), or create a new entry in the candidate's
/// suggested tier. `source_ref` is the delivery-level back-reference
/// appended to `links` alongside the candidate's own source references.
///
/// An empty batch is a no-op returning an unchanged outcome.
pub fn merge_candidates(
    directory: &mut Directory,
    candidates: &[CandidateRecord],
    source_ref: Option<&str>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for candidate in candidates {
        match find_entry(directory, candidate) {
            Some((tier, index)) => {
                let entry = &mut directory.entries_mut(tier)[index];
                if update_in_place(entry, candidate, source_ref) {
                    outcome.updated_entries += 1;
                    debug!(
                        "event=entry_updated module=merge name={} member={} tier={}",
                        entry.name,
                        entry.member,
                        tier.key()
                    );
                }
            }
            None => {
                let entry = ProjectEntry::from_candidate(candidate, source_ref);
                outcome.added.push(AddedProject {
                    tier: candidate.tier,
                    name: entry.name.clone(),
                    member: entry.member.clone(),
                });
                debug!(
                    "event=entry_added module=merge name={} member={} tier={}",
                    entry.name,
                    entry.member,
                    candidate.tier.key()
                );
                directory.entries_mut(candidate.tier).push(entry);
            }
        }
    }

    outcome
}

/// Locates the entry matching a candidate, suggested tier first.
fn find_entry(directory: &Directory, candidate: &CandidateRecord) -> Option<(Tier, usize)> {
    for tier in scan_order(candidate.tier) {
        if let Some(index) = directory
            .entries(tier)
            .iter()
            .position(|entry| candidate_matches_entry(entry, candidate))
        {
            return Some((tier, index));
        }
    }
    None
}

fn scan_order(suggested: Tier) -> impl Iterator<Item = Tier> {
    std::iter::once(suggested).chain(Tier::ALL.into_iter().filter(move |tier| *tier != suggested))
}

/// Applies the in-place update rules to a matched entry.
///
/// - description: replaced only when the candidate's sanitized description
///   is strictly longer in characters.
/// - url: backfilled only when the entry has none and the candidate
///   supplies one.
/// - links: candidate source references and `source_ref` appended unless
///   already referenced.
/// - tier: never touched here; reclassification is a member decision.
///
/// Returns `true` when anything changed.
fn update_in_place(
    entry: &mut ProjectEntry,
    candidate: &CandidateRecord,
    source_ref: Option<&str>,
) -> bool {
    let mut changed = false;

    let description = sanitize_field(&candidate.description);
    if description.chars().count() > entry.description.chars().count() {
        entry.description = description;
        changed = true;
    }

    if entry.url.is_empty() {
        if let Some(url) = candidate.url.as_deref() {
            let url = sanitize_field(url);
            if !url.is_empty() {
                entry.url = url;
                changed = true;
            }
        }
    }

    for reference in candidate
        .source_refs
        .iter()
        .map(String::as_str)
        .chain(source_ref)
    {
        if entry.append_link(reference) {
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, member: &str, tier: Tier, description: &str) -> CandidateRecord {
        CandidateRecord {
            name: name.to_string(),
            description: description.to_string(),
            tier,
            confidence: 0.9,
            url: None,
            member: member.to_string(),
            source_refs: Vec::new(),
        }
    }

    #[test]
    fn new_candidate_creates_entry_in_suggested_tier() {
        let mut directory = Directory::default();
        let batch = [candidate("Foo", "alice", Tier::Explorations, "A tool")];

        let outcome = merge_candidates(&mut directory, &batch, Some("https://x/t/1/1"));

        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.added[0].tier, Tier::Explorations);
        assert_eq!(outcome.added[0].member, "@alice");
        let entry = &directory.explorations[0];
        assert_eq!(entry.name, "Foo");
        assert_eq!(entry.description, "A tool");
        assert_eq!(entry.links, "[Post](https://x/t/1/1)");
    }

    #[test]
    fn duplicate_delivery_is_idempotent() {
        let mut directory = Directory::default();
        let batch = [candidate("Foo", "alice", Tier::Explorations, "A tool")];

        let first = merge_candidates(&mut directory, &batch, Some("https://x/t/1/1"));
        let after_first = directory.clone();
        let second = merge_candidates(&mut directory, &batch, Some("https://x/t/1/1"));

        assert_eq!(first.added.len(), 1);
        assert!(second.added.is_empty());
        assert!(!second.changed());
        assert_eq!(directory, after_first);
        assert_eq!(directory.explorations[0].links, "[Post](https://x/t/1/1)");
    }

    #[test]
    fn rediscovery_in_another_tier_does_not_move_the_entry() {
        let mut directory = Directory::default();
        merge_candidates(
            &mut directory,
            &[candidate("Foo", "alice", Tier::ActiveExperiments, "A tool")],
            None,
        );

        let promoted = [candidate("foo!", "alice", Tier::ProductsAndTools, "A tool")];
        let outcome = merge_candidates(&mut directory, &promoted, None);

        assert!(outcome.added.is_empty());
        assert_eq!(directory.active_experiments.len(), 1);
        assert!(directory.products_and_tools.is_empty());
    }

    #[test]
    fn longer_description_wins_shorter_does_not() {
        let mut directory = Directory::default();
        merge_candidates(
            &mut directory,
            &[candidate("Foo", "alice", Tier::Explorations, "A tool")],
            None,
        );

        let longer = [candidate(
            "Foo",
            "alice",
            Tier::Explorations,
            "A much more detailed tool summary",
        )];
        let outcome = merge_candidates(&mut directory, &longer, None);
        assert_eq!(outcome.updated_entries, 1);
        assert_eq!(
            directory.explorations[0].description,
            "A much more detailed tool summary"
        );

        let shorter = [candidate("Foo", "alice", Tier::Explorations, "short")];
        let outcome = merge_candidates(&mut directory, &shorter, None);
        assert!(!outcome.changed());
        assert_eq!(
            directory.explorations[0].description,
            "A much more detailed tool summary"
        );
    }

    #[test]
    fn url_backfills_once_and_never_overwrites() {
        let mut directory = Directory::default();
        merge_candidates(
            &mut directory,
            &[candidate("Foo", "alice", Tier::Explorations, "A tool")],
            None,
        );
        assert_eq!(directory.explorations[0].url, "");

        let mut with_url = candidate("Foo", "alice", Tier::Explorations, "A tool");
        with_url.url = Some("https://foo.example".to_string());
        let outcome = merge_candidates(&mut directory, &[with_url], None);
        assert_eq!(outcome.updated_entries, 1);
        assert_eq!(directory.explorations[0].url, "https://foo.example");

        let mut other_url = candidate("Foo", "alice", Tier::Explorations, "A tool");
        other_url.url = Some("https://other.example".to_string());
        let outcome = merge_candidates(&mut directory, &[other_url], None);
        assert!(!outcome.changed());
        assert_eq!(directory.explorations[0].url, "https://foo.example");
    }

    #[test]
    fn same_name_different_members_stay_separate() {
        let mut directory = Directory::default();
        let batch = [
            candidate("Foo", "alice", Tier::Explorations, "Alice's take"),
            candidate("Foo", "bob", Tier::Explorations, "Bob's take"),
        ];

        let outcome = merge_candidates(&mut directory, &batch, None);
        assert_eq!(outcome.added.len(), 2);
        assert_eq!(directory.explorations.len(), 2);
    }

    #[test]
    fn link_accumulates_across_distinct_sources() {
        let mut directory = Directory::default();
        let batch = [candidate("Foo", "alice", Tier::Explorations, "A tool")];

        merge_candidates(&mut directory, &batch, Some("https://x/t/1/1"));
        let outcome = merge_candidates(&mut directory, &batch, Some("https://x/t/2/5"));

        assert_eq!(outcome.updated_entries, 1);
        assert_eq!(
            directory.explorations[0].links,
            "[Post](https://x/t/1/1), [Post](https://x/t/2/5)"
        );
    }

    #[test]
    fn candidate_source_refs_merge_like_the_delivery_reference() {
        let mut directory = Directory::default();
        merge_candidates(
            &mut directory,
            &[candidate("Foo", "alice", Tier::Explorations, "A tool")],
            Some("https://x/t/1/1"),
        );

        let mut with_refs = candidate("Foo", "alice", Tier::Explorations, "A tool");
        with_refs.source_refs = vec![
            "https://x/t/1/1".to_string(),
            "https://x/t/3/2".to_string(),
        ];
        let outcome = merge_candidates(&mut directory, &[with_refs], None);

        assert_eq!(outcome.updated_entries, 1);
        assert_eq!(
            directory.explorations[0].links,
            "[Post](https://x/t/1/1), [Post](https://x/t/3/2)"
        );
    }

    #[test]
    fn new_entry_links_stay_deduplicated_under_repeated_references() {
        let mut directory = Directory::default();
        let mut repeated = candidate("Foo", "alice", Tier::Explorations, "A tool");
        repeated.source_refs = vec![
            "https://x/t/1/1".to_string(),
            "https://x/t/1/1".to_string(),
        ];

        merge_candidates(&mut directory, &[repeated], Some("https://x/t/1/1"));

        assert_eq!(directory.explorations[0].links, "[Post](https://x/t/1/1)");
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut directory = Directory::default();
        directory
            .explorations
            .push(ProjectEntry::from_candidate(
                &candidate("Foo", "alice", Tier::Explorations, "A tool"),
                None,
            ));
        let before = directory.clone();

        let outcome = merge_candidates(&mut directory, &[], Some("https://x/t/1/1"));
        assert!(!outcome.changed());
        assert_eq!(directory, before);
    }
}
