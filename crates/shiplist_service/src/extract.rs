//! LLM-backed project mention extraction.
//!
//! # Responsibility
//! - Turn free-form post text into admissible `CandidateRecord` batches.
//! - Enforce the confidence threshold so the merge engine never sees
//!   inadmissible candidates.
//!
//! # Invariants
//! - An undecodable model response yields an empty batch with a warning,
//!   never an error: extraction failures must not break delivery handling.
//! - Unknown tier labels are dropped with a warning.

use crate::config::Config;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use shiplist_core::{CandidateRecord, Tier};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MODEL: &str = "claude-haiku-4-5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const SINGLE_MAX_TOKENS: u32 = 1024;
const BATCH_MAX_TOKENS: u32 = 2048;
/// Per-post excerpt cap for batch prompts.
const BATCH_POST_EXCERPT_CHARS: usize = 2000;

/// Model responses may wrap the JSON object in a fenced block.
static JSON_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid fence regex"));

const EXTRACTION_PROMPT: &str = "\
You are analyzing a community forum post to extract project mentions.
The community is a small, private group of builders sharing what they make.

A \"project\" is something the POST AUTHOR is building, has built, or is
experimenting with. It must be their own work, not a tool they're merely
using or reviewing, and not another member's project.

Classify each project into one of three tiers:
- products_and_tools: Shipped, named, has users or a URL. Signals: \"launched\",
  \"shipped\", \"users are using\", \"available at\".
- active_experiments: Actively being built or prototyped. Signals: \"building\",
  \"working on\", \"prototype\", \"automating\".
- explorations: Early-stage ideas, one-off tries. Signals: \"playing with\",
  \"thinking about\", \"tried\", \"noodling on\".

If the post includes a URL for the project (website, repository, app store
link), include it in the \"url\" field. Only include URLs that belong to the
project itself. Prefer the primary/canonical URL.

Return a JSON object with this exact structure:
{
  \"projects\": [
    {
      \"name\": \"ProjectName\",
      \"description\": \"One-sentence description of what it does\",
      \"tier\": \"products_and_tools|active_experiments|explorations\",
      \"confidence\": 0.0-1.0,
      \"url\": \"https://example.com or null if no URL found\"
    }
  ]
}

If there are no project mentions, return: {\"projects\": []}

Only include projects with confidence >= 0.7. Be conservative: a casual
mention of \"I tried X\" with no detail is low confidence.
";

const BATCH_EXTRACTION_PROMPT: &str = "\
You are analyzing multiple community forum posts by the same member to
extract project mentions. The community is a small, private group of
builders sharing what they make.

A \"project\" is something the member is building, has built, or is
experimenting with. It must be their own work, not a tool they're merely
using or reviewing, and not another member's project.

When the same project is mentioned across multiple posts, combine them
into a single entry with the most detailed description available.

Classify each project into one of three tiers:
- products_and_tools: Shipped, named, has users or a URL.
- active_experiments: Actively being built or prototyped.
- explorations: Early-stage ideas, one-off tries.

If the posts include a URL for the project, include it in the \"url\"
field. Only include URLs that belong to the project itself. Prefer the
primary/canonical URL.

Return a JSON object:
{
  \"projects\": [
    {
      \"name\": \"ProjectName\",
      \"description\": \"One-sentence description\",
      \"tier\": \"products_and_tools|active_experiments|explorations\",
      \"confidence\": 0.0-1.0,
      \"url\": \"https://example.com or null if no URL found\",
      \"source_posts\": [1, 3]
    }
  ]
}

If no projects found, return: {\"projects\": []}
Only include projects with confidence >= 0.7.
";

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Error surface of the extraction API call.
#[derive(Debug)]
pub enum ExtractError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    /// The response body was not valid JSON.
    Decode(String),
    /// Response decoded, but carried no text content block.
    EmptyResponse,
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "extraction request failed: {err}"),
            Self::Status { status, body } => {
                write!(f, "extraction API returned HTTP {status}: {body}")
            }
            Self::Decode(message) => write!(f, "undecodable extraction response: {message}"),
            Self::EmptyResponse => write!(f, "extraction response had no text content"),
        }
    }
}

impl Error for ExtractError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// One post in a per-member batch extraction.
#[derive(Debug, Clone)]
pub struct MemberPost {
    pub topic_id: u64,
    pub post_number: u64,
    pub topic_title: String,
    pub content: String,
}

/// Wire shape of one extracted project.
#[derive(Debug, Deserialize)]
struct RawProject {
    name: String,
    description: String,
    tier: String,
    confidence: f64,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source_posts: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProjects {
    #[serde(default)]
    projects: Vec<RawProject>,
}

/// Extraction collaborator over the model HTTP API.
pub struct ExtractionClient {
    http: reqwest::blocking::Client,
    api_key: String,
    confidence_threshold: f64,
}

impl ExtractionClient {
    pub fn new(config: &Config) -> ExtractResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: config.extraction_api_key.clone(),
            confidence_threshold: config.confidence_threshold,
        })
    }

    /// Extracts admissible candidates from one post.
    pub fn extract(&self, post_text: &str, member: &str) -> ExtractResult<Vec<CandidateRecord>> {
        let user_message = format!(
            "Post by @{member}:\n\n{post_text}\n\nExtract any project mentions from this post."
        );
        let text = self.complete(EXTRACTION_PROMPT, &user_message, SINGLE_MAX_TOKENS)?;
        Ok(candidates_from_response(
            &text,
            member,
            self.confidence_threshold,
            &[],
        ))
    }

    /// Extracts admissible candidates from all posts by one member.
    ///
    /// `source_posts` indices returned by the model resolve to the given
    /// posts' canonical URLs (`{base_url}/t/{topic}/{number}`) and become
    /// the candidates' `source_refs`.
    pub fn extract_batch(
        &self,
        member: &str,
        posts: &[MemberPost],
        base_url: &str,
    ) -> ExtractResult<Vec<CandidateRecord>> {
        let mut numbered = Vec::with_capacity(posts.len());
        for (index, post) in posts.iter().enumerate() {
            let topic_info = if post.topic_title.is_empty() {
                String::new()
            } else {
                format!(" (topic: {})", post.topic_title)
            };
            let excerpt: String = post.content.chars().take(BATCH_POST_EXCERPT_CHARS).collect();
            numbered.push(format!("--- Post {index}{topic_info} ---\n{excerpt}"));
        }
        let user_message = format!(
            "All posts by @{member} ({} total):\n\n{}\n\nExtract all project mentions from these posts.",
            posts.len(),
            numbered.join("\n\n")
        );

        let text = self.complete(BATCH_EXTRACTION_PROMPT, &user_message, BATCH_MAX_TOKENS)?;
        let post_urls: Vec<String> = posts
            .iter()
            .map(|post| format!("{base_url}/t/{}/{}", post.topic_id, post.post_number))
            .collect();
        Ok(candidates_from_response(
            &text,
            member,
            self.confidence_threshold,
            &post_urls,
        ))
    }

    fn complete(&self, system: &str, user: &str, max_tokens: u32) -> ExtractResult<String> {
        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": MODEL,
                "max_tokens": max_tokens,
                "system": system,
                "messages": [{ "role": "user", "content": user }],
            }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let value: serde_json::Value = response
            .json()
            .map_err(|err| ExtractError::Decode(err.to_string()))?;
        value["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(ExtractError::EmptyResponse)
    }
}

/// Decodes a model response into admissible candidates.
///
/// Strips an optional fenced block, decodes the `projects` object, then
/// applies admission: confidence threshold, known tier, `"null"` url
/// sentinel, member attachment and source reference resolution.
fn candidates_from_response(
    text: &str,
    member: &str,
    confidence_threshold: f64,
    post_urls: &[String],
) -> Vec<CandidateRecord> {
    let body = match JSON_FENCE_RE.captures(text) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(text),
        None => text,
    };

    let decoded: RawProjects = match serde_json::from_str(body) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(
                "event=extract_decode_failed module=extract member={member} error={err} head={}",
                text.chars().take(200).collect::<String>()
            );
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    for project in decoded.projects {
        if project.confidence < confidence_threshold {
            continue;
        }
        let Some(tier) = Tier::from_key(project.tier.trim()) else {
            warn!(
                "event=unknown_tier_dropped module=extract member={member} name={} tier={}",
                project.name, project.tier
            );
            continue;
        };
        let url = project
            .url
            .filter(|value| !value.is_empty() && value != "null");
        let source_refs: Vec<String> = project
            .source_posts
            .iter()
            .filter_map(|index| post_urls.get(*index).cloned())
            .collect();

        candidates.push(CandidateRecord {
            name: project.name,
            description: project.description,
            tier,
            confidence: project.confidence,
            url,
            member: member.to_string(),
            source_refs,
        });
    }
    candidates
}
