//! Signature verification against tokens minted by a real keypair.

mod common;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::{online_claims, Authority};
use portcullis::jwt;
use sha2::Digest;

#[test]
fn authority_signed_token_verifies() {
    let authority = Authority::generate();
    let token = authority.issue(&online_claims("QQ==", "my-plugin", 0));

    let decoded = jwt::decode(&token).expect("minted token must decode");
    assert!(jwt::verify_signature(&authority.public_key_pem, &decoded));
}

#[test]
fn token_from_another_authority_is_rejected() {
    let issuer = Authority::generate();
    let verifier = Authority::generate();
    let token = issuer.issue(&online_claims("QQ==", "my-plugin", 0));

    let decoded = jwt::decode(&token).unwrap();
    assert!(!jwt::verify_signature(&verifier.public_key_pem, &decoded));
}

#[test]
fn tampered_body_is_rejected() {
    let authority = Authority::generate();
    let token = authority.issue(&online_claims("QQ==", "my-plugin", 0));

    // swap the body segment for a re-encoded, edited copy
    let parts: Vec<&str> = token.split('.').collect();
    let tampered_body = URL_SAFE_NO_PAD.encode(
        online_claims("QQ==", "someone-elses-plugin", 0).to_string(),
    );
    let tampered = format!("{}.{}.{}", parts[0], tampered_body, parts[2]);

    let decoded = jwt::decode(&tampered).expect("still structurally valid");
    assert!(!jwt::verify_signature(&authority.public_key_pem, &decoded));
}

#[test]
fn tampered_signature_is_rejected() {
    let authority = Authority::generate();
    let token = authority.issue(&online_claims("QQ==", "my-plugin", 0));

    let parts: Vec<&str> = token.split('.').collect();
    let mut sig = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
    sig[0] ^= 0x01;
    let tampered = format!("{}.{}.{}", parts[0], parts[1], URL_SAFE_NO_PAD.encode(sig));

    let decoded = jwt::decode(&tampered).unwrap();
    assert!(!jwt::verify_signature(&authority.public_key_pem, &decoded));
}

#[test]
fn hmac_signed_token_cannot_impersonate_the_authority() {
    // Classic algorithm-confusion attempt: declare HS256 and "sign" with
    // the public key as the HMAC secret. The verifier pins ES256 from the
    // key type, so this must fail no matter what the header claims.
    let authority = Authority::generate();
    let header = r#"{"alg":"HS256","typ":"JWT"}"#;
    let body = online_claims("QQ==", "my-plugin", 0).to_string();
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(&body)
    );
    let mac = jsonwebtoken::crypto::sign(
        signing_input.as_bytes(),
        &jsonwebtoken::EncodingKey::from_secret(authority.public_key_pem.as_bytes()),
        jsonwebtoken::Algorithm::HS256,
    )
    .unwrap();
    let forged = format!("{signing_input}.{mac}");

    let decoded = jwt::decode(&forged).expect("forgery is structurally a JWT");
    assert!(!jwt::verify_signature(&authority.public_key_pem, &decoded));
}

#[test]
fn declared_alg_header_is_not_consulted() {
    // A genuinely ES256-signed token still verifies even if its header
    // lies about the algorithm; the key, not the token, decides.
    let authority = Authority::generate();
    let token = authority.sign_token(
        r#"{"alg":"RS256","typ":"JWT"}"#,
        &online_claims("QQ==", "my-plugin", 0).to_string(),
    );

    let decoded = jwt::decode(&token).unwrap();
    assert!(jwt::verify_signature(&authority.public_key_pem, &decoded));
}

#[test]
fn signature_bytes_and_digest_are_exposed() {
    let authority = Authority::generate();
    let token = authority.issue(&online_claims("QQ==", "my-plugin", 0));
    let decoded = jwt::decode(&token).unwrap();

    // ES256 signatures are a fixed 64-byte r||s pair
    assert_eq!(decoded.signature.len(), 64);
    // digest is SHA-256, bound to the encoded segments
    let dot = token.rfind('.').unwrap();
    let expected: [u8; 32] = sha2::Sha256::digest(token[..dot].as_bytes()).into();
    assert_eq!(decoded.digest, expected);
}
