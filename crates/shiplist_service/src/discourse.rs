//! Forum REST client and directory store adapter.
//!
//! # Responsibility
//! - Read and update the wiki post holding the directory document.
//! - Post changelog replies and crawl topics/posts for the backfill.
//!
//! # Invariants
//! - All requests carry the `Api-Key`/`Api-Username` headers and a 30s
//!   timeout.
//! - Non-2xx responses surface as `DiscourseError::Status`, never panics.

use crate::config::Config;
use log::warn;
use serde::Deserialize;
use serde_json::{json, Value};
use shiplist_core::store::{DirectoryStore, StoreError, StoreResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Post ids missing from the initial topic response are fetched in chunks.
const POST_ID_CHUNK: usize = 20;

pub type DiscourseResult<T> = Result<T, DiscourseError>;

/// Error surface of forum API calls.
#[derive(Debug)]
pub enum DiscourseError {
    /// Transport-level failure (connect, timeout, TLS).
    Http(reqwest::Error),
    /// The forum answered with a non-success status.
    Status { status: u16, body: String },
    /// The response decoded, but not into the expected shape.
    Decode(String),
}

impl Display for DiscourseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "forum request failed: {err}"),
            Self::Status { status, body } => {
                write!(f, "forum returned HTTP {status}: {body}")
            }
            Self::Decode(message) => write!(f, "unexpected forum response: {message}"),
        }
    }
}

impl Error for DiscourseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DiscourseError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// One post as needed by extraction and backfill.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForumPost {
    pub id: u64,
    pub topic_id: u64,
    pub post_number: u64,
    #[serde(default)]
    pub username: String,
    /// Raw markdown when available, cooked HTML fallback otherwise.
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub cooked: String,
    #[serde(default)]
    pub topic_title: String,
}

impl ForumPost {
    /// Best available body text for extraction.
    pub fn body(&self) -> &str {
        if self.raw.is_empty() {
            &self.cooked
        } else {
            &self.raw
        }
    }
}

/// Synchronous forum API client.
pub struct DiscourseClient {
    base_url: String,
    api_key: String,
    api_username: String,
    http: reqwest::blocking::Client,
}

impl DiscourseClient {
    /// Builds a client from service configuration.
    pub fn new(config: &Config) -> DiscourseResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: config.forum_url.clone(),
            api_key: config.forum_api_key.clone(),
            api_username: config.forum_api_username.clone(),
            http,
        })
    }

    /// Base URL used to build canonical post links.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Canonical URL of one post, usable as a `sourceRef`.
    pub fn post_url(&self, topic_id: u64, post_number: u64) -> String {
        format!("{}/t/{topic_id}/{post_number}", self.base_url)
    }

    /// Reads the raw markdown body of one post.
    pub fn post_raw(&self, post_id: u64) -> DiscourseResult<String> {
        let value = self.get_json(&format!("/posts/{post_id}.json"))?;
        value["raw"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DiscourseError::Decode(format!("post {post_id} has no raw body")))
    }

    /// Replaces the raw markdown body of one post.
    pub fn set_post_raw(&self, post_id: u64, raw: &str) -> DiscourseResult<()> {
        self.put_json(
            &format!("/posts/{post_id}.json"),
            &json!({ "post": { "raw": raw } }),
        )?;
        Ok(())
    }

    /// Creates a reply in an existing topic.
    pub fn create_reply(&self, topic_id: u64, raw: &str) -> DiscourseResult<()> {
        self.post_json("/posts.json", &json!({ "topic_id": topic_id, "raw": raw }))?;
        Ok(())
    }

    /// Lists one page of topic ids in a category. Empty when exhausted.
    pub fn category_topic_ids(&self, category_id: u64, page: u32) -> DiscourseResult<Vec<u64>> {
        let value = self.get_json(&format!("/c/{category_id}.json?page={page}"))?;
        let topics = value["topic_list"]["topics"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(topics
            .iter()
            .filter_map(|topic| topic["id"].as_u64())
            .collect())
    }

    /// Fetches every post in a topic, following the post stream for ids
    /// not present in the initial response.
    pub fn topic_posts(&self, topic_id: u64) -> DiscourseResult<Vec<ForumPost>> {
        let value = self.get_json(&format!("/t/{topic_id}.json"))?;
        let title = value["title"].as_str().unwrap_or_default().to_string();

        let mut posts = decode_posts(&value["post_stream"]["posts"], topic_id, &title);
        let loaded: Vec<u64> = posts.iter().map(|post| post.id).collect();
        let missing: Vec<u64> = value["post_stream"]["stream"]
            .as_array()
            .map(|stream| {
                stream
                    .iter()
                    .filter_map(Value::as_u64)
                    .filter(|id| !loaded.contains(id))
                    .collect()
            })
            .unwrap_or_default();

        for chunk in missing.chunks(POST_ID_CHUNK) {
            let params: Vec<String> = chunk.iter().map(|id| format!("post_ids[]={id}")).collect();
            let path = format!("/t/{topic_id}/posts.json?{}", params.join("&"));
            match self.get_json(&path) {
                Ok(extra) => {
                    posts.extend(decode_posts(&extra["post_stream"]["posts"], topic_id, &title))
                }
                Err(err) => warn!(
                    "event=post_chunk_skipped module=discourse topic_id={topic_id} error={err}"
                ),
            }
        }

        Ok(posts)
    }

    /// Creates the pinned directory wiki topic. Returns (topic_id, post_id).
    pub fn create_wiki_topic(
        &self,
        title: &str,
        raw: &str,
        category_id: u64,
    ) -> DiscourseResult<(u64, u64)> {
        let created = self.post_json(
            "/posts.json",
            &json!({ "title": title, "raw": raw, "category": category_id }),
        )?;
        let topic_id = created["topic_id"]
            .as_u64()
            .ok_or_else(|| DiscourseError::Decode("created post has no topic_id".to_string()))?;
        let post_id = created["id"]
            .as_u64()
            .ok_or_else(|| DiscourseError::Decode("created post has no id".to_string()))?;

        self.put_json(&format!("/posts/{post_id}/wiki"), &json!({ "wiki": true }))?;
        self.put_json(
            &format!("/t/{topic_id}/status"),
            &json!({ "status": "pinned", "enabled": true }),
        )?;

        Ok((topic_id, post_id))
    }

    fn get_json(&self, path: &str) -> DiscourseResult<Value> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .header("Api-Username", &self.api_username)
            .send()?;
        decode_response(response)
    }

    fn put_json(&self, path: &str, body: &Value) -> DiscourseResult<Value> {
        let response = self
            .http
            .put(format!("{}{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .header("Api-Username", &self.api_username)
            .json(body)
            .send()?;
        decode_response(response)
    }

    fn post_json(&self, path: &str, body: &Value) -> DiscourseResult<Value> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .header("Api-Username", &self.api_username)
            .json(body)
            .send()?;
        decode_response(response)
    }
}

fn decode_response(response: reqwest::blocking::Response) -> DiscourseResult<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(DiscourseError::Status {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        });
    }
    response
        .json()
        .map_err(|err| DiscourseError::Decode(err.to_string()))
}

fn decode_posts(value: &Value, topic_id: u64, topic_title: &str) -> Vec<ForumPost> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<ForumPost>(item.clone()).ok())
        .map(|mut post| {
            post.topic_id = topic_id;
            post.topic_title = topic_title.to_string();
            post
        })
        .collect()
}

/// `DirectoryStore` over the wiki post holding the directory document.
#[derive(Clone)]
pub struct WikiDirectoryStore {
    client: Arc<DiscourseClient>,
    post_id: u64,
}

impl WikiDirectoryStore {
    pub fn new(client: Arc<DiscourseClient>, post_id: u64) -> Self {
        Self { client, post_id }
    }
}

impl DirectoryStore for WikiDirectoryStore {
    fn read(&self) -> StoreResult<String> {
        self.client
            .post_raw(self.post_id)
            .map_err(store_error)
    }

    fn write(&self, text: &str) -> StoreResult<()> {
        self.client
            .set_post_raw(self.post_id, text)
            .map_err(store_error)
    }
}

fn store_error(err: DiscourseError) -> StoreError {
    match err {
        DiscourseError::Http(inner) => StoreError::Unavailable(inner.to_string()),
        other => StoreError::Protocol(other.to_string()),
    }
}
