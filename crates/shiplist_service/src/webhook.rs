//! Inbound webhook listener.
//!
//! # Responsibility
//! - Receive content created/edited deliveries, authenticate them, and
//!   drive one reconciliation cycle per accepted post.
//!
//! # Invariants
//! - Deliveries are acknowledged before processing so at-least-once
//!   senders do not retry; idempotence is the merge engine's job.
//! - The sequential accept loop serializes reconciliation cycles, which
//!   is the mutual exclusion the read-modify-write cycle requires.
//! - A failing delivery never takes the listener down.

use crate::config::Config;
use crate::discourse::{DiscourseClient, WikiDirectoryStore};
use crate::extract::ExtractionClient;
use crate::signature::{
    unix_now_secs, verify_delivery, SignatureCheck, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use log::{debug, info, warn};
use serde::Deserialize;
use shiplist_core::{AddedProject, ReconcileService};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::sync::Arc;
use tiny_http::{Method, Response, Server};

/// Header carrying the delivery event type.
pub const EVENT_HEADER: &str = "X-Shiplist-Event";
const HANDLED_EVENTS: [&str; 2] = ["post_created", "post_edited"];
/// Posts shorter than this carry no extractable signal.
pub(crate) const MIN_POST_CHARS: usize = 20;

pub type ServeResult<T> = Result<T, ServeError>;

/// Error surface of listener startup. Per-delivery failures are logged,
/// not returned.
#[derive(Debug)]
pub enum ServeError {
    /// Collaborator client construction failed.
    Init(String),
    /// The listen socket could not be bound.
    Bind(String),
}

impl Display for ServeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init(message) => write!(f, "listener init failed: {message}"),
            Self::Bind(message) => write!(f, "listener bind failed: {message}"),
        }
    }
}

impl Error for ServeError {}

/// Wire shape of a content created/edited delivery.
#[derive(Debug, Deserialize)]
struct DeliveryPayload {
    post: Option<PostPayload>,
}

#[derive(Debug, Deserialize)]
struct PostPayload {
    id: u64,
    topic_id: u64,
    post_number: u64,
    #[serde(default)]
    username: String,
    #[serde(default)]
    raw: String,
    #[serde(default)]
    cooked: String,
}

impl PostPayload {
    fn body(&self) -> &str {
        if self.raw.is_empty() {
            &self.cooked
        } else {
            &self.raw
        }
    }
}

/// Runs the webhook listener until the process is stopped.
///
/// Binds the loopback only; exposure is a reverse-proxy concern.
pub fn run_webhook_listener(config: &Config) -> ServeResult<()> {
    if config.webhook_secret.is_empty() {
        warn!("event=signature_disabled module=webhook status=warn detail=no_secret_configured");
    }

    let client = Arc::new(
        DiscourseClient::new(config).map_err(|err| ServeError::Init(err.to_string()))?,
    );
    let store = WikiDirectoryStore::new(Arc::clone(&client), config.wiki_post_id);
    let reconciler = ReconcileService::new(store);
    let extractor =
        ExtractionClient::new(config).map_err(|err| ServeError::Init(err.to_string()))?;

    let server = Server::http(("127.0.0.1", config.listen_port))
        .map_err(|err| ServeError::Bind(err.to_string()))?;
    info!(
        "event=listener_started module=webhook status=ok port={}",
        config.listen_port
    );

    for request in server.incoming_requests() {
        handle_request(request, config, &client, &reconciler, &extractor);
    }

    Ok(())
}

fn handle_request(
    mut request: tiny_http::Request,
    config: &Config,
    client: &DiscourseClient,
    reconciler: &ReconcileService<WikiDirectoryStore>,
    extractor: &ExtractionClient,
) {
    if request.method() == &Method::Get && request.url() == "/" {
        let _ = request.respond(Response::from_string("shiplist listener is running"));
        return;
    }
    if request.method() != &Method::Post || request.url() != "/webhook" {
        let _ = request.respond(Response::empty(404));
        return;
    }

    let mut body = Vec::new();
    if request.as_reader().read_to_end(&mut body).is_err() {
        let _ = request.respond(Response::empty(400));
        return;
    }

    let timestamp = header_value(&request, TIMESTAMP_HEADER);
    let signature = header_value(&request, SIGNATURE_HEADER);
    let check = verify_delivery(
        &config.webhook_secret,
        &body,
        timestamp.as_deref(),
        signature.as_deref(),
        unix_now_secs(),
        config.signature_tolerance_secs,
    );
    if check != SignatureCheck::Valid {
        warn!("event=delivery_rejected module=webhook status=denied reason={check:?}");
        let _ = request.respond(Response::empty(401));
        return;
    }

    let event = header_value(&request, EVENT_HEADER).unwrap_or_default();
    // Acknowledge before processing; the sender must not retry while the
    // reconciliation cycle runs.
    let _ = request.respond(Response::empty(200));

    if !HANDLED_EVENTS.contains(&event.as_str()) {
        debug!("event=delivery_ignored module=webhook event_type={event}");
        return;
    }

    let payload: DeliveryPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("event=delivery_undecodable module=webhook error={err}");
            return;
        }
    };
    let Some(post) = payload.post else {
        warn!("event=delivery_without_post module=webhook event_type={event}");
        return;
    };

    process_post(&post, config, client, reconciler, extractor);
}

/// Runs extraction and one reconciliation cycle for an accepted post.
fn process_post(
    post: &PostPayload,
    config: &Config,
    client: &DiscourseClient,
    reconciler: &ReconcileService<WikiDirectoryStore>,
    extractor: &ExtractionClient,
) {
    if post.username == "system" || post.username == config.forum_api_username {
        debug!("event=post_skipped module=webhook reason=author post_id={}", post.id);
        return;
    }
    if post.topic_id == config.wiki_topic_id {
        debug!("event=post_skipped module=webhook reason=directory_topic post_id={}", post.id);
        return;
    }
    if post.body().chars().count() < MIN_POST_CHARS {
        debug!("event=post_skipped module=webhook reason=too_short post_id={}", post.id);
        return;
    }

    info!(
        "event=post_received module=webhook post_id={} member={} topic_id={}",
        post.id, post.username, post.topic_id
    );

    let candidates = match extractor.extract(post.body(), &post.username) {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!("event=extract_failed module=webhook post_id={} error={err}", post.id);
            return;
        }
    };
    if candidates.is_empty() {
        info!("event=no_mentions module=webhook post_id={}", post.id);
        return;
    }

    let post_url = client.post_url(post.topic_id, post.post_number);
    match reconciler.reconcile(&candidates, Some(&post_url)) {
        Ok(outcome) => {
            if !outcome.added.is_empty() {
                let reply = build_update_reply(&outcome.added, &post_url);
                if let Err(err) = client.create_reply(config.wiki_topic_id, &reply) {
                    warn!("event=changelog_failed module=webhook error={err}");
                }
            }
        }
        Err(err) => {
            warn!("event=reconcile_failed module=webhook post_id={} error={err}", post.id);
        }
    }
}

/// Human-readable changelog reply for newly added entries.
fn build_update_reply(added: &[AddedProject], post_url: &str) -> String {
    let mut lines = vec!["**Auto-update:**".to_string()];
    for entry in added {
        lines.push(format!(
            "- Added **{}** by {} to {} ([source]({post_url}))",
            entry.name,
            entry.member,
            entry.tier.title()
        ));
    }
    lines.join("\n")
}

fn header_value(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_string())
}
