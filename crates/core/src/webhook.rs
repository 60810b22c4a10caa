//! Shared-secret check for the illustration webhook.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute an HMAC-SHA256 tag of `payload` keyed with `secret`.
fn webhook_mac(secret: &str, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(mac)
}

/// Whether `provided` equals the configured webhook `secret`.
///
/// Both values are tagged with the secret and the tags are compared with
/// [`Mac::verify_slice`], which runs in constant time.
pub fn secret_matches(secret: &str, provided: &str) -> bool {
    let Some(expected) = webhook_mac(secret, secret.as_bytes()) else {
        return false;
    };
    let expected = expected.finalize().into_bytes();
    webhook_mac(secret, provided.as_bytes())
        .is_some_and(|mac| mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_secret_matches() {
        assert!(secret_matches("s3cret", "s3cret"));
    }

    #[test]
    fn other_values_do_not_match() {
        assert!(!secret_matches("s3cret", "s3creT"));
        assert!(!secret_matches("s3cret", "s3cret-longer"));
        assert!(!secret_matches("s3cret", ""));
    }

    #[test]
    fn empty_secret_only_matches_empty_value() {
        assert!(secret_matches("", ""));
        assert!(!secret_matches("", "anything"));
    }
}
