/// HMAC-SHA256 webhook signatures
///
/// Both platforms sign the raw request body:
///
/// - Meta sends `X-Hub-Signature-256: sha256=<hex>`
/// - Shopify sends `X-Shopify-Hmac-Sha256: <base64>`
///
/// Comparison goes through `Mac::verify_slice`, which is constant time.
///
/// # Example
///
/// ```
/// use tallybook_shared::webhooks::signature::{sign_hex, verify_meta};
///
/// let body = br#"{"object":"ad_account"}"#;
/// let header = format!("sha256={}", sign_hex("app-secret", body));
/// assert!(verify_meta("app-secret", &header, body));
/// assert!(!verify_meta("other-secret", &header, body));
/// ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const META_PREFIX: &str = "sha256=";

fn mac(secret: &str, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(mac)
}

/// Hex HMAC of `payload`
pub fn sign_hex(secret: &str, payload: &[u8]) -> String {
    mac(secret, payload)
        .map(|m| hex::encode(m.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Base64 HMAC of `payload`
pub fn sign_base64(secret: &str, payload: &[u8]) -> String {
    mac(secret, payload)
        .map(|m| STANDARD.encode(m.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Verifies a Meta `sha256=<hex>` header
pub fn verify_meta(secret: &str, header: &str, payload: &[u8]) -> bool {
    let Some(hex_digest) = header.trim().strip_prefix(META_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    mac(secret, payload).is_some_and(|m| m.verify_slice(&expected).is_ok())
}

/// Verifies a Shopify base64 header
pub fn verify_shopify(secret: &str, header: &str, payload: &[u8]) -> bool {
    let Ok(expected) = STANDARD.decode(header.trim()) else {
        return false;
    };

    mac(secret, payload).is_some_and(|m| m.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"order":{"total_price":"10.00"}}"#;

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign_hex("Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_meta_signature() {
        let header = format!("sha256={}", sign_hex("s3cret", BODY));
        assert!(verify_meta("s3cret", &header, BODY));
        assert!(!verify_meta("s3cret", &header, b"tampered"));
        assert!(!verify_meta("s3cret", &sign_hex("s3cret", BODY), BODY));
        assert!(!verify_meta("s3cret", "sha256=not-hex", BODY));
    }

    #[test]
    fn test_shopify_signature() {
        let header = sign_base64("shpss", BODY);
        assert!(verify_shopify("shpss", &header, BODY));
        assert!(!verify_shopify("wrong", &header, BODY));
        assert!(!verify_shopify("shpss", "%%%", BODY));
    }
}
