//! One-shot directory backfill from historical posts.
//!
//! # Responsibility
//! - Crawl configured categories, group posts per member, run batch
//!   extraction and build a directory document from scratch.
//!
//! # Invariants
//! - Members are processed in name order, so two runs over the same
//!   post set produce the same document.
//! - A topic or member that fails to fetch or extract is skipped with a
//!   warning; the backfill never aborts halfway through a crawl.

use crate::config::Config;
use crate::discourse::{DiscourseClient, DiscourseError, ForumPost};
use crate::extract::{ExtractError, ExtractionClient, MemberPost};
use crate::webhook::MIN_POST_CHARS;
use log::{info, warn};
use shiplist_core::{merge_candidates, render_directory, AddedProject, Directory, Tier};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BackfillResult<T> = Result<T, BackfillError>;

/// Error surface of the backfill pipeline. Only setup and final
/// publication fail hard; crawl and extraction errors are skipped.
#[derive(Debug)]
pub enum BackfillError {
    Forum(DiscourseError),
    Extract(ExtractError),
}

impl Display for BackfillError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forum(err) => write!(f, "backfill forum call failed: {err}"),
            Self::Extract(err) => write!(f, "backfill extraction setup failed: {err}"),
        }
    }
}

impl Error for BackfillError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forum(err) => Some(err),
            Self::Extract(err) => Some(err),
        }
    }
}

impl From<DiscourseError> for BackfillError {
    fn from(value: DiscourseError) -> Self {
        Self::Forum(value)
    }
}

impl From<ExtractError> for BackfillError {
    fn from(value: ExtractError) -> Self {
        Self::Extract(value)
    }
}

/// What to crawl and whether to publish the result.
#[derive(Debug, Clone, Default)]
pub struct BackfillOptions {
    /// Category ids whose topics are crawled.
    pub categories: Vec<u64>,
    /// When set, the rendered document is published as a new pinned wiki
    /// topic in this category.
    pub create_topic_in: Option<u64>,
}

/// Outcome of one backfill run.
#[derive(Debug)]
pub struct BackfillReport {
    /// The directory built from the crawl.
    pub directory: Directory,
    /// Rendered document text.
    pub rendered: String,
    /// Number of members whose posts were extracted.
    pub members: usize,
    /// Entries added across all members.
    pub added: Vec<AddedProject>,
    /// `(topic_id, post_id)` of the published wiki topic, when created.
    pub created: Option<(u64, u64)>,
}

/// Crawls the configured categories and builds a fresh directory.
pub fn run_backfill(config: &Config, options: &BackfillOptions) -> BackfillResult<BackfillReport> {
    let client = DiscourseClient::new(config)?;
    let extractor = ExtractionClient::new(config)?;

    let posts = crawl_categories(&client, &options.categories, config.wiki_topic_id);
    let batches = member_batches(posts, &config.forum_api_username);
    info!(
        "event=backfill_crawled module=backfill members={} categories={}",
        batches.len(),
        options.categories.len()
    );

    let mut directory = Directory::default();
    let mut added = Vec::new();
    let members = batches.len();
    for (member, member_posts) in &batches {
        let candidates = match extractor.extract_batch(member, member_posts, client.base_url()) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!("event=member_skipped module=backfill member={member} error={err}");
                continue;
            }
        };
        let outcome = merge_candidates(&mut directory, &candidates, None);
        added.extend(outcome.added);
    }

    let rendered = render_directory(&directory);
    let created = match options.create_topic_in {
        Some(category_id) => {
            let ids = client.create_wiki_topic(DIRECTORY_TOPIC_TITLE, &rendered, category_id)?;
            info!(
                "event=directory_published module=backfill topic_id={} post_id={}",
                ids.0, ids.1
            );
            Some(ids)
        }
        None => None,
    };

    for tier in Tier::ALL {
        info!(
            "event=backfill_tier module=backfill tier={} entries={}",
            tier.key(),
            directory.entries(tier).len()
        );
    }

    Ok(BackfillReport {
        directory,
        rendered,
        members,
        added,
        created,
    })
}

const DIRECTORY_TOPIC_TITLE: &str = "Community Project Directory";

/// Fetches every post in every topic of the given categories. Fetch
/// failures skip the topic or page rather than aborting the crawl.
fn crawl_categories(
    client: &DiscourseClient,
    categories: &[u64],
    wiki_topic_id: u64,
) -> Vec<ForumPost> {
    let mut posts = Vec::new();
    for &category_id in categories {
        let mut page = 0;
        loop {
            let topic_ids = match client.category_topic_ids(category_id, page) {
                Ok(ids) => ids,
                Err(err) => {
                    warn!(
                        "event=category_page_skipped module=backfill category_id={category_id} page={page} error={err}"
                    );
                    break;
                }
            };
            if topic_ids.is_empty() {
                break;
            }
            for topic_id in topic_ids {
                if topic_id == wiki_topic_id {
                    continue;
                }
                match client.topic_posts(topic_id) {
                    Ok(topic_posts) => posts.extend(topic_posts),
                    Err(err) => warn!(
                        "event=topic_skipped module=backfill topic_id={topic_id} error={err}"
                    ),
                }
            }
            page += 1;
        }
    }
    posts
}

/// Groups crawlable posts per member, ordered by member name. System and
/// service-account posts, and posts too short to carry signal, are
/// dropped here.
fn member_batches(posts: Vec<ForumPost>, bot_username: &str) -> BTreeMap<String, Vec<MemberPost>> {
    let mut batches: BTreeMap<String, Vec<MemberPost>> = BTreeMap::new();
    for post in posts {
        if post.username.is_empty() || post.username == "system" || post.username == bot_username {
            continue;
        }
        if post.body().chars().count() < MIN_POST_CHARS {
            continue;
        }
        batches.entry(post.username.clone()).or_default().push(MemberPost {
            topic_id: post.topic_id,
            post_number: post.post_number,
            topic_title: post.topic_title.clone(),
            content: post.body().to_string(),
        });
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(username: &str, topic_id: u64, post_number: u64, raw: &str) -> ForumPost {
        ForumPost {
            id: topic_id * 100 + post_number,
            topic_id,
            post_number,
            username: username.to_string(),
            raw: raw.to_string(),
            cooked: String::new(),
            topic_title: "What are you building?".to_string(),
        }
    }

    #[test]
    fn batches_group_by_member_in_name_order() {
        let posts = vec![
            post("carol", 7, 2, "Shipped my budgeting app this week, finally."),
            post("alice", 3, 1, "Working on a static site generator in the evenings."),
            post("alice", 9, 4, "The generator now supports incremental builds."),
        ];
        let batches = member_batches(posts, "directory-bot");
        let members: Vec<&String> = batches.keys().collect();
        assert_eq!(members, vec!["alice", "carol"]);
        assert_eq!(batches["alice"].len(), 2);
        assert_eq!(batches["alice"][1].topic_id, 9);
    }

    #[test]
    fn system_bot_and_short_posts_are_dropped() {
        let posts = vec![
            post("system", 1, 1, "This topic was closed automatically by the system."),
            post("directory-bot", 2, 1, "**Auto-update:** directory changed, see the wiki."),
            post("alice", 3, 1, "thanks!"),
            post("bob", 4, 1, "Prototyping a CLI that renames photos by capture date."),
        ];
        let batches = member_batches(posts, "directory-bot");
        assert_eq!(batches.len(), 1);
        assert!(batches.contains_key("bob"));
    }

    #[test]
    fn batch_content_prefers_raw_and_carries_topic_title() {
        let mut cooked_only = post("dana", 5, 2, "");
        cooked_only.cooked = "<p>Building a recipe scaler for batch cooking sessions.</p>".to_string();
        let batches = member_batches(vec![cooked_only], "directory-bot");
        let entry = &batches["dana"][0];
        assert!(entry.content.contains("recipe scaler"));
        assert_eq!(entry.topic_title, "What are you building?");
    }
}
