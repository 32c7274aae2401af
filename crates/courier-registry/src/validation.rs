//! Request validation and secret generation.

use std::collections::BTreeSet;

use courier_types::{SubscriptionSecret, ValidationError, SECRET_BYTES};
use rand::rngs::OsRng;
use rand::RngCore;
use url::Url;

/// Checks a subscribe request and normalises its event list.
///
/// The URL must parse as an absolute `http` or `https` URL with a host.
/// Event names are trimmed; the list must be non-empty, must not contain
/// blank names, and collapses to a set.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered.
pub fn validate_request(
    url: &str,
    events: &[String],
) -> Result<(String, BTreeSet<String>), ValidationError> {
    let url = url.trim();
    let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::MissingHost(url.to_string()));
    }

    if events.is_empty() {
        return Err(ValidationError::NoEvents);
    }

    let mut set = BTreeSet::new();
    for event in events {
        let event = event.trim();
        if event.is_empty() {
            return Err(ValidationError::BlankEvent);
        }
        set.insert(event.to_string());
    }

    Ok((url.to_string(), set))
}

/// Generates a fresh signing secret from the operating system's CSPRNG.
pub fn generate_secret() -> SubscriptionSecret {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SubscriptionSecret::new(hex::encode(bytes))
}
