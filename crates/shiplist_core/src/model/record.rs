//! Directory record model.
//!
//! # Responsibility
//! - Define `Tier`, `ProjectEntry`, `Directory` and `CandidateRecord`.
//! - Provide the normalization key used for identity matching.
//! - Sanitize free-text fields at the candidate-acceptance boundary.
//!
//! # Invariants
//! - `ProjectEntry.member` always carries the leading `@` marker.
//! - `normalize_name` is the sole basis of name identity: lower-cased,
//!   ASCII letters and digits only.
//! - Sanitized fields never contain a literal `|` character.

use serde::{Deserialize, Serialize};

/// Maturity classification for a directory entry.
///
/// Tier is a manual-override field: once an entry exists, automated merges
/// never move it between tiers, even when a later mention suggests a
/// different classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Shipped, named, available for use.
    ProductsAndTools,
    /// Actively being built or prototyped.
    ActiveExperiments,
    /// Early-stage ideas and one-off experiments.
    Explorations,
}

impl Tier {
    /// Fixed render order of the three tiers.
    pub const ALL: [Tier; 3] = [
        Tier::ProductsAndTools,
        Tier::ActiveExperiments,
        Tier::Explorations,
    ];

    /// Section title as it appears in tier headings and changelogs.
    pub fn title(self) -> &'static str {
        match self {
            Tier::ProductsAndTools => "Products & Tools",
            Tier::ActiveExperiments => "Active Experiments",
            Tier::Explorations => "Explorations",
        }
    }

    /// One-line section description rendered under the heading.
    pub fn blurb(self) -> &'static str {
        match self {
            Tier::ProductsAndTools => "Projects that are shipped, named, and available for use.",
            Tier::ActiveExperiments => "Things actively being built or prototyped.",
            Tier::Explorations => "Early-stage ideas and one-off experiments.",
        }
    }

    /// Exact markdown heading line that opens this tier's section.
    pub fn heading(self) -> &'static str {
        match self {
            Tier::ProductsAndTools => "## Products & Tools",
            Tier::ActiveExperiments => "## Active Experiments",
            Tier::Explorations => "## Explorations",
        }
    }

    /// Stable machine-readable key (`products_and_tools`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Tier::ProductsAndTools => "products_and_tools",
            Tier::ActiveExperiments => "active_experiments",
            Tier::Explorations => "explorations",
        }
    }

    /// Parses the machine-readable key back into a tier.
    pub fn from_key(key: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|tier| tier.key() == key)
    }

    /// Recognizes a tier section heading in its exact textual form.
    pub fn from_heading(line: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|tier| tier.heading() == line)
    }
}

/// One row of the directory document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    /// Display name. Sanitized: never contains `|`.
    pub name: String,
    /// Canonical link to the project itself. Empty means no link.
    pub url: String,
    /// Owning identity, always `@handle` form.
    pub member: String,
    /// One-sentence summary. Longer descriptions supersede shorter ones.
    pub description: String,
    /// Comma-joined, append-only back-references to source posts.
    pub links: String,
}

impl ProjectEntry {
    /// Accepts a candidate into the directory as a fresh entry.
    ///
    /// This is the single boundary where candidate fields are sanitized
    /// and the member marker is canonicalized. `links` is seeded from the
    /// candidate's own source references plus the per-delivery
    /// `source_ref`, in that order, deduplicated per reference.
    pub fn from_candidate(candidate: &CandidateRecord, source_ref: Option<&str>) -> Self {
        let mut entry = ProjectEntry {
            name: sanitize_field(&candidate.name),
            url: candidate
                .url
                .as_deref()
                .map(sanitize_field)
                .unwrap_or_default(),
            member: canonical_member(&candidate.member),
            description: sanitize_field(&candidate.description),
            links: String::new(),
        };
        for reference in candidate
            .source_refs
            .iter()
            .map(String::as_str)
            .chain(source_ref)
        {
            entry.append_link(reference);
        }
        entry
    }

    /// Appends one source link if `links` does not already reference it.
    ///
    /// The containment check is textual, mirroring the document's comma
    /// joined link representation; it is what makes reconciliation
    /// idempotent under duplicate delivery of the same source reference.
    ///
    /// Returns `true` when the link was appended.
    pub fn append_link(&mut self, source_ref: &str) -> bool {
        let source_ref = source_ref.trim();
        if source_ref.is_empty() || self.links.contains(source_ref) {
            return false;
        }
        if self.links.is_empty() {
            self.links = format_source_link(source_ref);
        } else {
            self.links.push_str(", ");
            self.links.push_str(&format_source_link(source_ref));
        }
        true
    }
}

/// The directory aggregate: one ordered entry sequence per tier.
///
/// Storage order is not identity-bearing; entries are sorted at render
/// time only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub products_and_tools: Vec<ProjectEntry>,
    pub active_experiments: Vec<ProjectEntry>,
    pub explorations: Vec<ProjectEntry>,
}

impl Directory {
    /// Entries of one tier, in storage order.
    pub fn entries(&self, tier: Tier) -> &[ProjectEntry] {
        match tier {
            Tier::ProductsAndTools => &self.products_and_tools,
            Tier::ActiveExperiments => &self.active_experiments,
            Tier::Explorations => &self.explorations,
        }
    }

    /// Mutable entries of one tier.
    pub fn entries_mut(&mut self, tier: Tier) -> &mut Vec<ProjectEntry> {
        match tier {
            Tier::ProductsAndTools => &mut self.products_and_tools,
            Tier::ActiveExperiments => &mut self.active_experiments,
            Tier::Explorations => &mut self.explorations,
        }
    }

    /// Total number of entries across all tiers.
    pub fn len(&self) -> usize {
        Tier::ALL
            .into_iter()
            .map(|tier| self.entries(tier).len())
            .sum()
    }

    /// Whether the directory holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An unreconciled extraction result awaiting merge.
///
/// Created by the extraction collaborator, consumed exactly once by the
/// merge engine, then discarded. `confidence` admission (>= threshold) is
/// a precondition enforced upstream, not re-checked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub description: String,
    /// Suggested tier. Binding only when the candidate creates a new entry.
    pub tier: Tier,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// Canonical project link, when one was found.
    #[serde(default)]
    pub url: Option<String>,
    /// Author identity, with or without the `@` marker.
    pub member: String,
    /// Raw source post URLs used to build `links` entries.
    #[serde(default)]
    pub source_refs: Vec<String>,
}

/// Normalizes a project name into its identity key.
///
/// Lower-cases, then keeps ASCII letters and digits only, so that
/// "My-App!" and "my app" collapse to the same key.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Sanitizes a free-text field for the pipe-delimited document form.
///
/// Literal `|` would corrupt the table grammar; it is replaced with `-`
/// and surrounding whitespace is trimmed.
pub fn sanitize_field(value: &str) -> String {
    value.replace('|', "-").trim().to_string()
}

/// Canonical `@handle` form of a member identity.
pub fn canonical_member(member: &str) -> String {
    let sanitized = sanitize_field(member);
    if sanitized.starts_with('@') {
        sanitized
    } else {
        format!("@{sanitized}")
    }
}

/// Member identity with any leading `@` markers stripped, for comparison.
pub fn member_key(member: &str) -> &str {
    member.trim_start_matches('@')
}

fn format_source_link(source_ref: &str) -> String {
    format!("[Post]({})", source_ref.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_collapses_case_spacing_and_punctuation() {
        assert_eq!(normalize_name("My-App!"), "myapp");
        assert_eq!(normalize_name("my app"), "myapp");
        assert_eq!(normalize_name("My App 2.0"), "myapp20");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn sanitize_field_replaces_pipes_and_trims() {
        assert_eq!(sanitize_field("  a | b  "), "a - b");
        assert_eq!(sanitize_field("clean"), "clean");
    }

    #[test]
    fn canonical_member_adds_marker_once() {
        assert_eq!(canonical_member("alice"), "@alice");
        assert_eq!(canonical_member("@alice"), "@alice");
        assert_eq!(member_key("@alice"), "alice");
        assert_eq!(member_key("alice"), "alice");
    }

    #[test]
    fn from_candidate_sanitizes_and_seeds_links() {
        let candidate = CandidateRecord {
            name: " Foo|Bar ".to_string(),
            description: "A | tool".to_string(),
            tier: Tier::Explorations,
            confidence: 0.9,
            url: Some("https://foo.example".to_string()),
            member: "alice".to_string(),
            source_refs: vec!["https://x/t/9/2".to_string()],
        };

        let entry = ProjectEntry::from_candidate(&candidate, Some("https://x/t/1/1"));
        assert_eq!(entry.name, "Foo-Bar");
        assert_eq!(entry.description, "A - tool");
        assert_eq!(entry.member, "@alice");
        assert_eq!(entry.url, "https://foo.example");
        assert_eq!(
            entry.links,
            "[Post](https://x/t/9/2), [Post](https://x/t/1/1)"
        );
    }

    #[test]
    fn from_candidate_deduplicates_repeated_references() {
        let candidate = CandidateRecord {
            name: "Foo".to_string(),
            description: "A tool".to_string(),
            tier: Tier::Explorations,
            confidence: 0.9,
            url: None,
            member: "alice".to_string(),
            source_refs: vec![
                "https://x/t/1/1".to_string(),
                "https://x/t/1/1".to_string(),
            ],
        };

        let entry = ProjectEntry::from_candidate(&candidate, Some("https://x/t/1/1"));
        assert_eq!(entry.links, "[Post](https://x/t/1/1)");
    }

    #[test]
    fn append_link_is_idempotent_per_reference() {
        let mut entry = ProjectEntry {
            links: String::new(),
            ..ProjectEntry::default()
        };

        assert!(entry.append_link("https://x/t/1/1"));
        assert_eq!(entry.links, "[Post](https://x/t/1/1)");
        assert!(!entry.append_link("https://x/t/1/1"));
        assert!(entry.append_link("https://x/t/2/1"));
        assert_eq!(
            entry.links,
            "[Post](https://x/t/1/1), [Post](https://x/t/2/1)"
        );
    }

    #[test]
    fn tier_keys_and_headings_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_key(tier.key()), Some(tier));
            assert_eq!(Tier::from_heading(tier.heading()), Some(tier));
        }
        assert_eq!(Tier::from_key("shipped"), None);
        assert_eq!(Tier::from_heading("## Archive"), None);
    }

    #[test]
    fn tier_serializes_as_snake_case_key() {
        let json = serde_json::to_value(Tier::ProductsAndTools).unwrap();
        assert_eq!(json, "products_and_tools");
        let decoded: Tier = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, Tier::ProductsAndTools);
    }
}
