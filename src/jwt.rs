//! Compact JWT decoding and signature verification.
//!
//! License tokens arrive as three base64url segments joined by dots. The
//! codec splits and decodes them without trusting anything inside: the
//! digest is computed over the exact encoded segments (not re-serialized
//! JSON), and verification pins the signature algorithm to the type of the
//! configured public key. The token's `alg` header is never consulted, so
//! an attacker cannot downgrade an RSA deployment to HMAC by editing the
//! header.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A decoded, not-yet-trusted license token.
#[derive(Debug, Clone)]
pub struct Jwt {
    /// Decoded header object.
    pub header: Value,
    /// Decoded claims object.
    pub body: Value,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// SHA-256 over `header_b64 + "." + body_b64`, bound to the encoded
    /// input rather than any re-serialization of it.
    pub digest: [u8; 32],
    signing_input: String,
    signature_b64: String,
}

/// Split and decode a compact token. Any malformation yields `None`.
pub fn decode(encoded: &str) -> Option<Jwt> {
    let parts: Vec<&str> = encoded.trim().split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).ok()?).ok()?;
    let body: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).ok()?).ok()?;
    let signature = URL_SAFE_NO_PAD.decode(parts[2]).ok()?;

    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let digest: [u8; 32] = Sha256::digest(signing_input.as_bytes()).into();

    Some(Jwt {
        header,
        body,
        signature,
        digest,
        signing_input,
        signature_b64: parts[2].to_string(),
    })
}

/// Verify the token signature against the licensing authority's key.
///
/// The algorithm is pinned by key type: an RSA PEM verifies as RS256, an
/// EC PEM as ES256. Returns `true` only on strict success.
pub fn verify_signature(public_key_pem: &str, jwt: &Jwt) -> bool {
    let pem = public_key_pem.as_bytes();
    let (key, algorithm) = if let Ok(key) = DecodingKey::from_rsa_pem(pem) {
        (key, Algorithm::RS256)
    } else if let Ok(key) = DecodingKey::from_ec_pem(pem) {
        (key, Algorithm::ES256)
    } else {
        return false;
    };

    jsonwebtoken::crypto::verify(
        &jwt.signature_b64,
        jwt.signing_input.as_bytes(),
        &key,
        algorithm,
    )
    .unwrap_or(false)
}

/// How the license was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ActivationMethod {
    Online,
    Offline,
}

/// Interpreted view of the token body.
///
/// `sig`, `p:id`, `method`, and `trial` are required on every token;
/// `exp` and `validated` are demanded by the engine only when the license
/// is a trial / online respectively.
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseClaims {
    /// Device signature the license was bound to at issue time.
    pub sig: String,
    #[serde(rename = "p:id")]
    pub product_id: String,
    pub method: ActivationMethod,
    pub trial: bool,
    /// Trial expiration, Unix seconds.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Last server-side validation, Unix seconds.
    #[serde(default)]
    pub validated: Option<i64>,
}

impl LicenseClaims {
    pub fn from_body(body: &Value) -> Option<Self> {
        serde_json::from_value(body.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an (unsigned) compact token from raw JSON strings.
    fn encode_parts(header: &str, body: &str, signature: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(body),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    #[test]
    fn decode_roundtrips_segments() {
        let token = encode_parts(
            r#"{"alg":"ES256","typ":"JWT"}"#,
            r#"{"trial":false,"method":"Online"}"#,
            b"sigbytes",
        );
        let jwt = decode(&token).expect("well-formed token must decode");
        assert_eq!(jwt.header["alg"], "ES256");
        assert_eq!(jwt.body["method"], "Online");
        assert_eq!(jwt.signature, b"sigbytes");
    }

    #[test]
    fn digest_binds_to_encoded_input() {
        let token = encode_parts(r#"{"alg":"ES256"}"#, r#"{"a":1}"#, b"s");
        let jwt = decode(&token).unwrap();
        let dot = token.rfind('.').unwrap();
        let expected: [u8; 32] = Sha256::digest(token[..dot].as_bytes()).into();
        assert_eq!(jwt.digest, expected);
    }

    #[test]
    fn wrong_part_count_is_rejected() {
        assert!(decode("onlyonepart").is_none());
        assert!(decode("two.parts").is_none());
        assert!(decode("a.b.c.d").is_none());
        assert!(decode("").is_none());
    }

    #[test]
    fn non_json_segments_are_rejected() {
        let bad_header = format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode("not json"),
            URL_SAFE_NO_PAD.encode(r#"{"a":1}"#),
            URL_SAFE_NO_PAD.encode("s")
        );
        assert!(decode(&bad_header).is_none());

        let bad_base64 = "!!!.###.$$$";
        assert!(decode(bad_base64).is_none());
    }

    #[test]
    fn verify_rejects_garbage_pem() {
        let token = encode_parts(r#"{"alg":"ES256"}"#, r#"{"a":1}"#, b"s");
        let jwt = decode(&token).unwrap();
        assert!(!verify_signature("not a pem", &jwt));
        assert!(!verify_signature("", &jwt));
    }

    #[test]
    fn claims_parse_with_optional_fields_absent() {
        let body: Value = serde_json::from_str(
            r#"{"sig":"QQ==","p:id":"my-plugin","method":"Offline","trial":false}"#,
        )
        .unwrap();
        let claims = LicenseClaims::from_body(&body).unwrap();
        assert_eq!(claims.method, ActivationMethod::Offline);
        assert_eq!(claims.product_id, "my-plugin");
        assert!(claims.exp.is_none());
        assert!(claims.validated.is_none());
    }

    #[test]
    fn claims_require_core_fields() {
        let missing_sig: Value =
            serde_json::from_str(r#"{"p:id":"x","method":"Online","trial":false}"#).unwrap();
        assert!(LicenseClaims::from_body(&missing_sig).is_none());

        let bad_method: Value = serde_json::from_str(
            r#"{"sig":"QQ==","p:id":"x","method":"Carrier-Pigeon","trial":false}"#,
        )
        .unwrap();
        assert!(LicenseClaims::from_body(&bad_method).is_none());
    }
}
