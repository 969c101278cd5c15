//! HMAC-SHA256 signing for provider callbacks.
//!
//! When a webhook secret is configured, the provider (or a relay in front of
//! it) sends the lowercase-hex HMAC of the raw request body in a header. The
//! receiver recomputes it with [`verify_webhook_signature`].

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the callback signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Compute the hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn compute_webhook_hmac(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex signature against `payload` in constant time.
///
/// Malformed hex is treated as a mismatch.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Some(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string; `None` on odd length or non-hex characters.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
            .collect()
    }
}
