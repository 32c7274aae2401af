//! HMAC-SHA256 request signing.
//!
//! The tag covers the exact request body bytes and is keyed with the ASCII
//! bytes of the subscriber's hex secret, so a receiver can recompute it with
//! nothing more than the secret it was handed at subscription time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix identifying the MAC algorithm in the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

fn mac_for(secret: &str, body: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(body);
    mac
}

/// Computes the signature header value for `body`: `sha256=<64 lowercase hex>`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let tag = mac_for(secret, body).finalize().into_bytes();
    format!("{SIGNATURE_PREFIX}{}", hex::encode(tag))
}

/// Checks a received signature header value against `body`.
///
/// Accepts the tag with or without the `sha256=` prefix. The comparison is
/// constant-time; malformed values (bad hex, wrong length) fail verification.
pub fn verify(secret: &str, body: &[u8], signature: &str) -> bool {
    let hex_tag = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);
    let Ok(tag) = hex::decode(hex_tag) else {
        return false;
    };
    mac_for(secret, body).verify_slice(&tag).is_ok()
}
