//! Webhook signature verification.
//!
//! # Responsibility
//! - Authenticate inbound deliveries with a keyed HMAC before any payload
//!   is trusted.
//!
//! # Invariants
//! - The MAC input is `"{timestamp}.{body}"`, so the freshness value is
//!   covered by the key and cannot be swapped on a replayed capture.
//! - Timestamps outside the tolerance window fail before MAC work.
//! - MAC comparison is constant-time (`Mac::verify_slice`).
//! - An empty secret disables verification; the listener warns at startup.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header carrying the hex signature, `sha256=<hex>` form.
pub const SIGNATURE_HEADER: &str = "X-Shiplist-Signature";
/// Header carrying the delivery unix timestamp in seconds.
pub const TIMESTAMP_HEADER: &str = "X-Shiplist-Timestamp";
const SIGNATURE_PREFIX: &str = "sha256=";

/// Outcome of verifying one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Signature and freshness both hold (or verification is disabled).
    Valid,
    /// Timestamp missing, unparseable, or outside the tolerance window.
    Stale,
    /// Signature header missing, malformed, or MAC mismatch.
    Invalid,
}

/// Verifies one delivery against the shared secret.
///
/// `timestamp_header` and `signature_header` are the raw header values;
/// `now_secs` is the receiver clock. Empty `secret` accepts everything.
pub fn verify_delivery(
    secret: &str,
    body: &[u8],
    timestamp_header: Option<&str>,
    signature_header: Option<&str>,
    now_secs: i64,
    tolerance_secs: u64,
) -> SignatureCheck {
    if secret.is_empty() {
        return SignatureCheck::Valid;
    }

    let Some(timestamp) = timestamp_header.and_then(|value| value.trim().parse::<i64>().ok())
    else {
        return SignatureCheck::Stale;
    };
    if (now_secs - timestamp).unsigned_abs() > tolerance_secs {
        return SignatureCheck::Stale;
    }

    let Some(signature) = signature_header
        .and_then(|value| value.trim().strip_prefix(SIGNATURE_PREFIX))
        .and_then(decode_hex)
    else {
        return SignatureCheck::Invalid;
    };

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body);
    if mac.verify_slice(&signature).is_ok() {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Invalid
    }
}

/// Current unix time in seconds for freshness checks.
pub fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

/// Computes the `sha256=<hex>` signature for a delivery. Used by senders
/// and by tests.
pub fn sign_delivery(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("{SIGNATURE_PREFIX}{hex}")
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    if value.len() % 2 != 0 {
        return None;
    }
    (0..value.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(&value[index..index + 2], 16).ok())
        .collect()
}
