//! Bearer-token verification for the socket handshake.
//!
//! Tokens are minted by the REST tier at login and carried by the client
//! into the WebSocket handshake. Format: `base64url(claims) . base64url(
//! hmac-sha256(claims, secret))` with claims `{id, email, role, exp}`.
//! Verification is stateless; any failure (bad shape, bad signature,
//! unparseable claims, past expiry) yields `None` and the handshake is
//! refused before any room join.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use trackwire_sdk::types::{Identity, Role};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: i64,
    email: String,
    role: Role,
    /// Unix seconds.
    exp: i64,
}

/// Verifies an opaque bearer credential into an [`Identity`].
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Option<Identity>;
}

/// Shared-secret HMAC verifier. The gateway and the REST tier hold the same
/// secret; no key distribution beyond that.
pub struct HmacTokenVerifier {
    secret: String,
}

impl HmacTokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenVerifier for HmacTokenVerifier {
    fn verify(&self, credential: &str) -> Option<Identity> {
        let (claims_b64, sig_b64) = credential.split_once('.')?;
        if sign(&self.secret, claims_b64) != sig_b64 {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(claims_b64).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        if claims.exp < Utc::now().timestamp() {
            return None;
        }
        Some(Identity {
            id: claims.id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Mint a token for an identity. Lives here (not only in the REST tier) so
/// the dev issuer binary and the integration tests can produce credentials
/// the gateway accepts.
pub fn mint_token(secret: &str, identity: &Identity, ttl: chrono::Duration) -> String {
    let claims = Claims {
        id: identity.id,
        email: identity.email.clone(),
        role: identity.role,
        exp: (Utc::now() + ttl).timestamp(),
    };
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("claims serialize"));
    let sig = sign(secret, &claims_b64);
    format!("{claims_b64}.{sig}")
}

fn sign(secret: &str, claims_b64: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(claims_b64.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}
