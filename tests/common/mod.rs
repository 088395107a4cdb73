//! Shared test helpers: a throwaway licensing authority that mints signed
//! ES256 tokens the way the real service does.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use serde_json::{json, Value};

/// A fresh EC P-256 keypair playing the licensing authority.
pub struct Authority {
    signing_key: SigningKey,
    pub public_key_pem: String,
}

impl Authority {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let public_key_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("SPKI encoding of a fresh key cannot fail");
        Self {
            signing_key,
            public_key_pem,
        }
    }

    /// Compact-serialize and sign `header`/`body` JSON strings.
    pub fn sign_token(&self, header: &str, body: &str) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(body)
        );
        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }

    /// Issue a token over the given claims with a standard ES256 header.
    pub fn issue(&self, claims: &Value) -> String {
        self.sign_token(r#"{"alg":"ES256","typ":"JWT"}"#, &claims.to_string())
    }
}

pub fn online_claims(sig: &str, product: &str, validated: i64) -> Value {
    json!({
        "sig": sig,
        "p:id": product,
        "method": "Online",
        "trial": false,
        "validated": validated,
    })
}

pub fn trial_claims(sig: &str, product: &str, exp: i64, validated: i64) -> Value {
    json!({
        "sig": sig,
        "p:id": product,
        "method": "Online",
        "trial": true,
        "exp": exp,
        "validated": validated,
    })
}

pub fn offline_claims(sig: &str, product: &str) -> Value {
    json!({
        "sig": sig,
        "p:id": product,
        "method": "Offline",
        "trial": false,
    })
}
